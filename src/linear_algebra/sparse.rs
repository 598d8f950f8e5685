use faer::{
    linalg::solvers::{Solve, SolveLstsq},
    sparse::linalg::solvers as sparse_solvers,
    Side,
};
use fixedbitset::FixedBitSet;
use nalgebra as na;
use nalgebra_sparse as nas;

use super::{
    registry::{Slot, Tracked},
    Complex, DenseMatrix, Scalar,
};
use crate::error::{Error, FactorizationKind, Result};

/// A list of `(value, row, column)` entries for building a [`SparseMatrix`].
///
/// Entries at the same position are summed when the matrix is built.
pub struct Triplet<T: Scalar> {
    pub(super) slot: Slot<nas::CooMatrix<T>>,
}

/// Triplet of complex entries.
pub type ComplexTriplet = Triplet<Complex>;

impl<T: Scalar> Tracked for Triplet<T> {
    fn registry_id(&self) -> u64 {
        self.slot.id()
    }

    fn is_released(&self) -> bool {
        self.slot.is_released()
    }
}

impl<T: Scalar> Triplet<T> {
    /// An empty triplet for a `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            slot: Slot::new(nas::CooMatrix::new(rows, cols)),
        }
    }

    /// Add `value` at `(row, col)`.
    pub fn add_entry(&mut self, value: T, row: usize, col: usize) -> Result<()> {
        self.slot.with_mut(|coo| {
            let shape = (coo.nrows(), coo.ncols());
            if row >= shape.0 || col >= shape.1 {
                return Err(Error::IndexOutOfBounds { row, col, shape });
            }
            coo.push(row, col, value);
            Ok(())
        })?
    }

    /// Shape of the matrix being built.
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.slot.with(|coo| (coo.nrows(), coo.ncols()))
    }

    /// Number of entries added so far, counting duplicates.
    pub fn len(&self) -> Result<usize> {
        self.slot.with(|coo| coo.nnz())
    }

    /// Whether no entries have been added.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// A factorization tagged with the matrix generation it was computed from.
struct Cached<F> {
    generation: u64,
    factor: F,
}

/// Storage of a sparse matrix together with its cached factorizations.
pub(super) struct SparseData<T: Scalar> {
    csr: nas::CsrMatrix<T>,
    /// bumped by every in-place mutation;
    /// a cached factor is valid only while its generation matches
    generation: u64,
    cholesky: Option<Cached<sparse_solvers::Llt<usize, T>>>,
    lu: Option<Cached<sparse_solvers::Lu<usize, T>>>,
    qr: Option<Cached<sparse_solvers::Qr<usize, T>>>,
}

impl<T: Scalar> SparseData<T> {
    fn new(csr: nas::CsrMatrix<T>) -> Self {
        Self {
            csr,
            generation: 0,
            cholesky: None,
            lu: None,
            qr: None,
        }
    }

    fn shape(&self) -> (usize, usize) {
        (self.csr.nrows(), self.csr.ncols())
    }

    /// Replace the matrix values, invalidating every cached factorization.
    fn mutate(&mut self, f: impl FnOnce(&nas::CsrMatrix<T>) -> nas::CsrMatrix<T>) {
        self.csr = f(&self.csr);
        self.generation += 1;
        self.cholesky = None;
        self.lu = None;
        self.qr = None;
    }

    fn is_factored(&self, kind: FactorizationKind) -> bool {
        let generation = match kind {
            FactorizationKind::Cholesky => self.cholesky.as_ref().map(|c| c.generation),
            FactorizationKind::Lu => self.lu.as_ref().map(|c| c.generation),
            FactorizationKind::Qr => self.qr.as_ref().map(|c| c.generation),
        };
        generation == Some(self.generation)
    }

    fn check_square(&self, op: &'static str) -> Result<()> {
        let shape = self.shape();
        if shape.0 != shape.1 {
            return Err(Error::DimensionMismatch {
                op,
                left: shape,
                right: (shape.1, shape.0),
            });
        }
        Ok(())
    }

    fn check_rhs(&self, op: &'static str, rhs: &na::DMatrix<T>) -> Result<()> {
        if rhs.nrows() != self.csr.nrows() {
            return Err(Error::DimensionMismatch {
                op,
                left: self.shape(),
                right: rhs.shape(),
            });
        }
        Ok(())
    }

    /// Reject matrices that are singular by their sparsity pattern alone.
    /// Cholesky and LU need an entry in every row and column,
    /// QR only in every column.
    fn check_structure(&self, kind: FactorizationKind) -> Result<()> {
        let mut columns = FixedBitSet::with_capacity(self.csr.ncols());
        columns.extend(self.csr.col_indices().iter().copied());
        let empty_column = columns.count_ones(..) < self.csr.ncols();
        let empty_row = self.csr.row_offsets().windows(2).any(|w| w[0] == w[1]);
        let empty_row = empty_row && kind != FactorizationKind::Qr;
        if empty_column || empty_row || self.csr.ncols() == 0 {
            tracing::debug!(%kind, empty_row, empty_column, "structurally singular matrix");
            return Err(Error::Factorization { kind });
        }
        Ok(())
    }

    /// The matrix in the compressed column layout `faer` factors.
    fn to_faer(&self, kind: FactorizationKind) -> Result<faer::sparse::SparseColMat<usize, T>> {
        let triplets: Vec<faer::sparse::Triplet<usize, usize, T>> = self
            .csr
            .triplet_iter()
            .map(|(row, col, &val)| faer::sparse::Triplet { row, col, val })
            .collect();
        faer::sparse::SparseColMat::try_new_from_triplets(
            self.csr.nrows(),
            self.csr.ncols(),
            &triplets,
        )
        .map_err(failed(kind))
    }

    fn solve_cholesky(&mut self, rhs: &na::DMatrix<T>) -> Result<na::DMatrix<T>> {
        self.check_square("solve_positive_definite")?;
        self.check_rhs("solve_positive_definite", rhs)?;
        let kind = FactorizationKind::Cholesky;
        if !self.is_factored(kind) {
            self.check_structure(kind)?;
            log_factorization(kind, self.shape());
            let a = self.to_faer(kind)?;
            // only the upper triangle is read
            let symbolic =
                sparse_solvers::SymbolicLlt::try_new(a.symbolic().as_ref(), Side::Upper)
                    .map_err(failed(kind))?;
            let factor =
                sparse_solvers::Llt::try_new_with_symbolic(symbolic, a.as_ref(), Side::Upper)
                    .map_err(failed(kind))?;
            self.cholesky = Some(Cached {
                generation: self.generation,
                factor,
            });
        }
        match &self.cholesky {
            Some(cached) => {
                let x = cached.factor.solve(&to_faer_dense(rhs));
                from_faer_dense(kind, &x, rhs.nrows())
            }
            None => Err(Error::Factorization { kind }),
        }
    }

    fn solve_lu(&mut self, rhs: &na::DMatrix<T>) -> Result<na::DMatrix<T>> {
        self.check_square("solve_square")?;
        self.check_rhs("solve_square", rhs)?;
        let kind = FactorizationKind::Lu;
        if !self.is_factored(kind) {
            self.check_structure(kind)?;
            log_factorization(kind, self.shape());
            let a = self.to_faer(kind)?;
            let symbolic =
                sparse_solvers::SymbolicLu::try_new(a.symbolic().as_ref()).map_err(failed(kind))?;
            let factor = sparse_solvers::Lu::try_new_with_symbolic(symbolic, a.as_ref())
                .map_err(failed(kind))?;
            self.lu = Some(Cached {
                generation: self.generation,
                factor,
            });
        }
        match &self.lu {
            Some(cached) => {
                let x = cached.factor.solve(&to_faer_dense(rhs));
                from_faer_dense(kind, &x, rhs.nrows())
            }
            None => Err(Error::Factorization { kind }),
        }
    }

    /// Least squares solution through `A = QR`, `x = R⁻¹ Qᴴ b`.
    fn solve_qr(&mut self, rhs: &na::DMatrix<T>) -> Result<na::DMatrix<T>> {
        self.check_rhs("solve", rhs)?;
        let kind = FactorizationKind::Qr;
        let (rows, cols) = self.shape();
        if rows < cols {
            return Err(Error::Factorization { kind });
        }
        if !self.is_factored(kind) {
            self.check_structure(kind)?;
            log_factorization(kind, self.shape());
            let a = self.to_faer(kind)?;
            let symbolic =
                sparse_solvers::SymbolicQr::try_new(a.symbolic().as_ref()).map_err(failed(kind))?;
            let factor = sparse_solvers::Qr::try_new_with_symbolic(symbolic, a.as_ref())
                .map_err(failed(kind))?;
            self.qr = Some(Cached {
                generation: self.generation,
                factor,
            });
        }
        match &self.qr {
            Some(cached) => {
                let x = cached.factor.solve_lstsq(&to_faer_dense(rhs));
                from_faer_dense(kind, &x, cols)
            }
            None => Err(Error::Factorization { kind }),
        }
    }
}

fn log_factorization(kind: FactorizationKind, shape: (usize, usize)) {
    tracing::debug!(%kind, rows = shape.0, cols = shape.1, "factoring sparse matrix");
}

fn failed<E: std::fmt::Debug>(kind: FactorizationKind) -> impl FnOnce(E) -> Error {
    move |err| {
        tracing::debug!(%kind, ?err, "sparse factorization failed");
        Error::Factorization { kind }
    }
}

fn to_faer_dense<T: Scalar>(m: &na::DMatrix<T>) -> faer::Mat<T> {
    faer::Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
}

/// The first `rows` rows of a solution.
/// Non-finite entries mean the factored matrix was numerically singular.
fn from_faer_dense<T: Scalar>(
    kind: FactorizationKind,
    x: &faer::Mat<T>,
    rows: usize,
) -> Result<na::DMatrix<T>> {
    let x = na::DMatrix::from_fn(rows, x.ncols(), |i, j| x[(i, j)]);
    if !x.iter().all(|v| v.is_finite()) {
        tracing::debug!(%kind, "non-finite solution");
        return Err(Error::Factorization { kind });
    }
    Ok(x)
}

fn csr_to_dense<T: Scalar>(csr: &nas::CsrMatrix<T>) -> na::DMatrix<T> {
    let mut dense = na::DMatrix::zeros(csr.nrows(), csr.ncols());
    for (i, j, &v) in csr.triplet_iter() {
        dense[(i, j)] += v;
    }
    dense
}

/// A sparse matrix in compressed row storage,
/// tracked by the [registry][super::registry].
///
/// Factorizations obtained with [`chol`][Self::chol], [`lu`][Self::lu]
/// and [`qr`][Self::qr] are computed on the first solve
/// and reused by later solves until the matrix is mutated in place.
pub struct SparseMatrix<T: Scalar> {
    pub(super) slot: Slot<SparseData<T>>,
}

/// A sparse matrix of complex numbers.
pub type ComplexSparseMatrix = SparseMatrix<Complex>;

impl<T: Scalar> Tracked for SparseMatrix<T> {
    fn registry_id(&self) -> u64 {
        self.slot.id()
    }

    fn is_released(&self) -> bool {
        self.slot.is_released()
    }
}

impl<T: Scalar> std::fmt::Debug for SparseMatrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("SparseMatrix");
        s.field("id", &self.slot.id());
        match self.slot.with(|data| (data.shape(), data.csr.nnz())) {
            Ok((shape, nnz)) => s.field("shape", &shape).field("nnz", &nnz),
            Err(_) => s.field("released", &true),
        };
        s.finish()
    }
}

impl<T: Scalar> SparseMatrix<T> {
    /// Wrap an existing nalgebra-sparse matrix.
    pub fn from_csr(csr: nas::CsrMatrix<T>) -> Self {
        Self {
            slot: Slot::new(SparseData::new(csr)),
        }
    }

    /// A copy of the underlying nalgebra-sparse matrix.
    pub fn to_csr(&self) -> Result<nas::CsrMatrix<T>> {
        self.slot.with(|data| data.csr.clone())
    }

    /// Build a matrix from triplet entries, summing duplicates.
    pub fn from_triplet(triplet: &Triplet<T>) -> Result<Self> {
        let csr = triplet.slot.with(|coo| nas::CsrMatrix::from(coo))?;
        Ok(Self::from_csr(csr))
    }

    /// A matrix with ones on the main diagonal.
    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut coo = nas::CooMatrix::new(rows, cols);
        for i in 0..rows.min(cols) {
            coo.push(i, i, T::one());
        }
        Self::from_csr(nas::CsrMatrix::from(&coo))
    }

    /// A square diagonal matrix with the entries of a column vector on the diagonal.
    pub fn diag(d: &DenseMatrix<T>) -> Result<Self> {
        let shape = d.shape()?;
        if shape.1 != 1 {
            return Err(Error::DimensionMismatch {
                op: "diag",
                left: shape,
                right: (shape.0, 1),
            });
        }
        let csr = d.slot.with(|d| {
            // start from an identity to get the sparsity pattern,
            // then replace the entries
            let mut csr = nas::CsrMatrix::identity(d.nrows());
            for (&diag, mat_diag) in d.iter().zip(csr.values_mut()) {
                *mat_diag = diag;
            }
            csr
        })?;
        Ok(Self::from_csr(csr))
    }

    /// Number of rows.
    pub fn n_rows(&self) -> Result<usize> {
        self.slot.with(|data| data.csr.nrows())
    }

    /// Number of columns.
    pub fn n_cols(&self) -> Result<usize> {
        self.slot.with(|data| data.csr.ncols())
    }

    /// Number of rows and columns.
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.slot.with(SparseData::shape)
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> Result<usize> {
        self.slot.with(|data| data.csr.nnz())
    }

    /// The transpose, without conjugation.
    pub fn transpose(&self) -> Result<Self> {
        self.map(|csr| csr.transpose())
    }

    /// The entrywise complex conjugate (a copy for real matrices).
    pub fn conjugate(&self) -> Result<Self> {
        self.map(|csr| map_values(csr, |x| x.conjugate()))
    }

    /// Replace every stored diagonal entry with its reciprocal.
    /// Meant for diagonal matrices such as Hodge stars.
    pub fn invert_diagonal(&self) -> Result<Self> {
        self.map(|csr| {
            let mut inv = csr.clone();
            let values: Vec<T> = csr
                .triplet_iter()
                .map(|(i, j, &v)| if i == j { v.recip() } else { v })
                .collect();
            inv.values_mut().copy_from_slice(&values);
            inv
        })
    }

    /// Square root of the sum of squared entry moduli.
    pub fn frobenius_norm(&self) -> Result<f64> {
        self.slot.with(|data| {
            data.csr
                .values()
                .iter()
                .map(|x| x.modulus_squared())
                .sum::<f64>()
                .sqrt()
        })
    }

    /// The block of rows `r0..r1` and columns `c0..c1`.
    pub fn sub_matrix(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> Result<Self> {
        let shape = self.shape()?;
        if r0 > r1 || c0 > c1 || r1 > shape.0 || c1 > shape.1 {
            return Err(Error::IndexOutOfBounds {
                row: r1,
                col: c1,
                shape,
            });
        }
        self.map(|csr| {
            let mut coo = nas::CooMatrix::new(r1 - r0, c1 - c0);
            for (i, j, &v) in csr.triplet_iter() {
                if (r0..r1).contains(&i) && (c0..c1).contains(&j) {
                    coo.push(i - r0, j - c0, v);
                }
            }
            nas::CsrMatrix::from(&coo)
        })
    }

    /// Cholesky factorization, for Hermitian positive definite matrices.
    pub fn chol(&self) -> Cholesky<'_, T> {
        Cholesky { matrix: self }
    }

    /// LU factorization, for square invertible matrices.
    pub fn lu(&self) -> Lu<'_, T> {
        Lu { matrix: self }
    }

    /// QR factorization, for least squares problems.
    pub fn qr(&self) -> Qr<'_, T> {
        Qr { matrix: self }
    }

    /// A dense copy of the matrix.
    pub fn to_dense(&self) -> Result<DenseMatrix<T>> {
        let dense = self.slot.with(|data| csr_to_dense(&data.csr))?;
        Ok(DenseMatrix::from_nalgebra(dense))
    }

    /// Add another matrix to this one in place.
    /// Cached factorizations are invalidated.
    pub fn increment_by(&mut self, other: &Self) -> Result<()> {
        self.check_same_shape("increment_by", other)?;
        other
            .slot
            .with(|b| self.slot.with_mut(|a| a.mutate(|csr| csr + &b.csr)))?
    }

    /// Subtract another matrix from this one in place.
    /// Cached factorizations are invalidated.
    pub fn decrement_by(&mut self, other: &Self) -> Result<()> {
        self.check_same_shape("decrement_by", other)?;
        other
            .slot
            .with(|b| self.slot.with_mut(|a| a.mutate(|csr| csr - &b.csr)))?
    }

    /// Multiply every entry by `s` in place.
    /// Cached factorizations are invalidated.
    pub fn scale_by(&mut self, s: T) -> Result<()> {
        self.slot
            .with_mut(|data| data.mutate(|csr| map_values(csr, |x| x * s)))
    }

    /// Entrywise sum, `self + other`.
    pub fn plus(&self, other: &Self) -> Result<Self> {
        self.check_same_shape("plus", other)?;
        self.zip(other, |a, b| a + b)
    }

    /// Entrywise difference, `self - other`.
    pub fn minus(&self, other: &Self) -> Result<Self> {
        self.check_same_shape("minus", other)?;
        self.zip(other, |a, b| a - b)
    }

    /// Every entry multiplied by `s`.
    pub fn times_scalar(&self, s: T) -> Result<Self> {
        self.map(|csr| map_values(csr, |x| x * s))
    }

    /// Matrix product with a dense matrix, `self * other`.
    pub fn times_dense(&self, other: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left.1 != right.0 {
            return Err(Error::DimensionMismatch {
                op: "times_dense",
                left,
                right,
            });
        }
        let product = self
            .slot
            .with(|a| other.slot.with(|b| &a.csr * b))??;
        Ok(DenseMatrix::from_nalgebra(product))
    }

    /// Matrix product with another sparse matrix, `self * other`.
    pub fn times_sparse(&self, other: &Self) -> Result<Self> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left.1 != right.0 {
            return Err(Error::DimensionMismatch {
                op: "times_sparse",
                left,
                right,
            });
        }
        self.zip(other, |a, b| a * b)
    }

    /// Every entry negated.
    pub fn negated(&self) -> Result<Self> {
        self.map(|csr| map_values(csr, |x| -x))
    }

    /// The entry at `(row, col)`, zero if it isn't stored.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let entry = self
            .slot
            .with(|data| data.csr.get_entry(row, col).map(|e| e.into_value()))?;
        match entry {
            Some(value) => Ok(value),
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                shape: self.shape()?,
            }),
        }
    }

    //
    // helpers
    //

    fn map(&self, f: impl FnOnce(&nas::CsrMatrix<T>) -> nas::CsrMatrix<T>) -> Result<Self> {
        Ok(Self::from_csr(self.slot.with(|data| f(&data.csr))?))
    }

    fn zip(
        &self,
        other: &Self,
        f: impl FnOnce(&nas::CsrMatrix<T>, &nas::CsrMatrix<T>) -> nas::CsrMatrix<T>,
    ) -> Result<Self> {
        let csr = self
            .slot
            .with(|a| other.slot.with(|b| f(&a.csr, &b.csr)))??;
        Ok(Self::from_csr(csr))
    }

    fn check_same_shape(&self, op: &'static str, other: &Self) -> Result<()> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left != right {
            return Err(Error::DimensionMismatch { op, left, right });
        }
        Ok(())
    }
}

fn map_values<T: Scalar>(csr: &nas::CsrMatrix<T>, f: impl Fn(T) -> T) -> nas::CsrMatrix<T> {
    let mut out = csr.clone();
    out.values_mut().iter_mut().for_each(|x| *x = f(*x));
    out
}

/// Cholesky factorization of a [`SparseMatrix`], see [`SparseMatrix::chol`].
pub struct Cholesky<'a, T: Scalar> {
    matrix: &'a SparseMatrix<T>,
}

impl<'a, T: Scalar> Cholesky<'a, T> {
    /// Solve `A x = b` for Hermitian positive definite `A`.
    pub fn solve_positive_definite(&self, b: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        let rhs = b.to_nalgebra()?;
        let x = self.matrix.slot.with_mut(|data| data.solve_cholesky(&rhs))??;
        Ok(DenseMatrix::from_nalgebra(x))
    }

    /// Whether a factorization of the current matrix values is cached.
    pub fn is_factored(&self) -> Result<bool> {
        self.matrix
            .slot
            .with(|data| data.is_factored(FactorizationKind::Cholesky))
    }
}

/// LU factorization of a [`SparseMatrix`], see [`SparseMatrix::lu`].
pub struct Lu<'a, T: Scalar> {
    matrix: &'a SparseMatrix<T>,
}

impl<'a, T: Scalar> Lu<'a, T> {
    /// Solve `A x = b` for square invertible `A`.
    pub fn solve_square(&self, b: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        let rhs = b.to_nalgebra()?;
        let x = self.matrix.slot.with_mut(|data| data.solve_lu(&rhs))??;
        Ok(DenseMatrix::from_nalgebra(x))
    }

    /// Whether a factorization of the current matrix values is cached.
    pub fn is_factored(&self) -> Result<bool> {
        self.matrix
            .slot
            .with(|data| data.is_factored(FactorizationKind::Lu))
    }
}

/// QR factorization of a [`SparseMatrix`], see [`SparseMatrix::qr`].
pub struct Qr<'a, T: Scalar> {
    matrix: &'a SparseMatrix<T>,
}

impl<'a, T: Scalar> Qr<'a, T> {
    /// Find the `x` minimizing `|A x - b|`.
    /// `A` must have at least as many rows as columns and full column rank.
    pub fn solve(&self, b: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        let rhs = b.to_nalgebra()?;
        let x = self.matrix.slot.with_mut(|data| data.solve_qr(&rhs))??;
        Ok(DenseMatrix::from_nalgebra(x))
    }

    /// Whether a factorization of the current matrix values is cached.
    pub fn is_factored(&self) -> Result<bool> {
        self.matrix
            .slot
            .with(|data| data.is_factored(FactorizationKind::Qr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::abs_diff_eq;
    use itertools::{iproduct, izip};
    use na::ComplexField;

    /// The 1D Laplacian `tridiag(-1, 2, -1)` plus `shift` on the diagonal.
    fn laplacian_1d(n: usize, shift: f64) -> SparseMatrix<f64> {
        let mut t = Triplet::new(n, n);
        for i in 0..n {
            t.add_entry(2.0 + shift, i, i).unwrap();
            if i + 1 < n {
                t.add_entry(-1.0, i, i + 1).unwrap();
                t.add_entry(-1.0, i + 1, i).unwrap();
            }
        }
        SparseMatrix::from_triplet(&t).unwrap()
    }

    fn assert_solves(a: &SparseMatrix<f64>, x: &DenseMatrix<f64>, b: &DenseMatrix<f64>) {
        let ax = a.times_dense(x).unwrap().to_nalgebra().unwrap();
        let b = b.to_nalgebra().unwrap();
        let all_approx_eq =
            izip!(ax.iter(), b.iter()).all(|(l, r)| abs_diff_eq!(l, r, epsilon = 1e-9));
        assert!(all_approx_eq, "expected {b}, got {ax}");
    }

    #[test]
    fn triplets_sum_duplicates() {
        let mut t = Triplet::new(2, 3);
        t.add_entry(1.0, 0, 2).unwrap();
        t.add_entry(2.5, 0, 2).unwrap();
        t.add_entry(-1.0, 1, 0).unwrap();
        assert_eq!(t.len(), Ok(3));
        assert_eq!(
            t.add_entry(1.0, 2, 0),
            Err(Error::IndexOutOfBounds {
                row: 2,
                col: 0,
                shape: (2, 3)
            })
        );

        let m = SparseMatrix::from_triplet(&t).unwrap();
        assert_eq!(m.shape(), Ok((2, 3)));
        assert_eq!(m.nnz(), Ok(2));
        assert_eq!(m.get(0, 2), Ok(3.5));
        assert_eq!(m.get(1, 1), Ok(0.0));
        assert!(m.get(2, 2).is_err());

        let t = m.transpose().unwrap();
        assert_eq!(t.get(2, 0), Ok(3.5));
        assert_eq!(t.to_dense().unwrap().shape(), Ok((3, 2)));
    }

    #[test]
    fn arithmetic_matches_dense_arithmetic() {
        let a = laplacian_1d(4, 0.0);
        let i = SparseMatrix::identity(4, 4);
        let sum = a.plus(&i).unwrap();
        assert_eq!(sum.get(0, 0), Ok(3.0));
        assert_eq!(a.minus(&i).unwrap().get(1, 1), Ok(1.0));
        assert_eq!(a.negated().unwrap().get(0, 1), Ok(1.0));
        assert_eq!(a.times_scalar(2.0).unwrap().get(2, 3), Ok(-2.0));

        let squared = a.times_sparse(&a).unwrap();
        let dense_a = a.to_dense().unwrap();
        let squared_dense = dense_a.times_dense(&dense_a).unwrap();
        for (r, c) in [(0, 0), (0, 2), (1, 3), (3, 3)] {
            assert_eq!(squared.get(r, c), squared_dense.get(r, c));
        }

        assert!(abs_diff_eq!(
            a.frobenius_norm().unwrap(),
            (4.0 * 4.0 + 6.0f64).sqrt()
        ));
        let block = a.sub_matrix(1, 3, 1, 4).unwrap();
        assert_eq!(block.shape(), Ok((2, 3)));
        assert_eq!(block.get(0, 0), Ok(2.0));
        assert_eq!(block.get(1, 2), Ok(-1.0));

        let wide = SparseMatrix::<f64>::identity(4, 3);
        assert!(a.plus(&wide).is_err());
        assert!(a.times_sparse(&wide).is_ok());
        assert!(wide.times_sparse(&a).is_err());
    }

    #[test]
    fn diagonal_matrices_invert() {
        let d = SparseMatrix::diag(&DenseMatrix::from_column(&[2.0, 4.0, 0.5])).unwrap();
        assert_eq!(d.nnz(), Ok(3));
        let inv = d.invert_diagonal().unwrap();
        assert_eq!(inv.get(0, 0), Ok(0.5));
        assert_eq!(inv.get(1, 1), Ok(0.25));
        assert_eq!(inv.get(2, 2), Ok(2.0));
        assert!(SparseMatrix::diag(&DenseMatrix::<f64>::ones(2, 2)).is_err());
    }

    #[test]
    fn factorizations_solve_linear_systems() {
        let a = laplacian_1d(5, 0.1);
        let b = DenseMatrix::from_column(&[1.0, 0.0, 2.0, -1.0, 0.5]);

        let x = a.chol().solve_positive_definite(&b).unwrap();
        assert_solves(&a, &x, &b);
        let x = a.lu().solve_square(&b).unwrap();
        assert_solves(&a, &x, &b);
        let x = a.qr().solve(&b).unwrap();
        assert_solves(&a, &x, &b);

        // overdetermined but consistent
        let mut t = Triplet::new(3, 2);
        t.add_entry(1.0, 0, 0).unwrap();
        t.add_entry(1.0, 1, 1).unwrap();
        t.add_entry(1.0, 2, 0).unwrap();
        t.add_entry(1.0, 2, 1).unwrap();
        let tall = SparseMatrix::from_triplet(&t).unwrap();
        let x = tall.qr().solve(&DenseMatrix::from_column(&[1.0, 2.0, 3.0])).unwrap();
        assert!(abs_diff_eq!(x.get(0, 0).unwrap(), 1.0, epsilon = 1e-9));
        assert!(abs_diff_eq!(x.get(1, 0).unwrap(), 2.0, epsilon = 1e-9));
    }

    #[test]
    fn factorization_failures_are_reported() {
        // indefinite
        let a = laplacian_1d(3, 0.0).negated().unwrap();
        let b = DenseMatrix::ones(3, 1);
        assert_eq!(
            a.chol().solve_positive_definite(&b).unwrap_err(),
            Error::Factorization {
                kind: FactorizationKind::Cholesky
            }
        );

        let singular = SparseMatrix::from_triplet(&Triplet::new(3, 3)).unwrap();
        assert_eq!(
            singular.lu().solve_square(&b).unwrap_err(),
            Error::Factorization {
                kind: FactorizationKind::Lu
            }
        );

        let wide = SparseMatrix::<f64>::identity(2, 3);
        assert!(wide.qr().solve(&DenseMatrix::ones(2, 1)).is_err());
        assert!(wide.lu().solve_square(&DenseMatrix::ones(2, 1)).is_err());
        // wrong right-hand side length
        assert!(a.lu().solve_square(&DenseMatrix::ones(2, 1)).is_err());
    }

    #[test]
    fn cached_factors_are_reused_until_mutation() {
        let mut a = laplacian_1d(4, 0.0);
        let b = DenseMatrix::from_column(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.chol().is_factored(), Ok(false));

        let x1 = a.chol().solve_positive_definite(&b).unwrap();
        assert_eq!(a.chol().is_factored(), Ok(true));
        assert_eq!(a.lu().is_factored(), Ok(false));
        let x2 = a.chol().solve_positive_definite(&b).unwrap();
        assert_eq!(x1.to_nalgebra(), x2.to_nalgebra());

        // doubling A must halve the solution, not reuse the stale factor
        a.scale_by(2.0).unwrap();
        assert_eq!(a.chol().is_factored(), Ok(false));
        let x3 = a.chol().solve_positive_definite(&b).unwrap();
        let halved = x1.times_scalar(0.5).unwrap();
        assert_solves(&a, &halved, &b);
        assert!(abs_diff_eq!(
            x3.get(0, 0).unwrap(),
            halved.get(0, 0).unwrap(),
            epsilon = 1e-12
        ));

        a.lu().solve_square(&b).unwrap();
        a.increment_by(&SparseMatrix::identity(4, 4)).unwrap();
        assert_eq!(a.lu().is_factored(), Ok(false));
        assert_eq!(a.get(0, 0), Ok(5.0));
        a.decrement_by(&SparseMatrix::identity(4, 4)).unwrap();
        assert_eq!(a.get(0, 0), Ok(4.0));
    }

    #[test]
    fn least_squares_factors_are_invalidated_too() {
        let mut a = laplacian_1d(3, 1.0);
        let b = DenseMatrix::from_column(&[1.0, -2.0, 0.5]);
        assert_eq!(a.qr().is_factored(), Ok(false));
        let x1 = a.qr().solve(&b).unwrap();
        assert_eq!(a.qr().is_factored(), Ok(true));
        assert_eq!(a.chol().is_factored(), Ok(false));

        a.increment_by(&SparseMatrix::identity(3, 3)).unwrap();
        assert_eq!(a.qr().is_factored(), Ok(false));
        let x2 = a.qr().solve(&b).unwrap();
        assert_eq!(a.qr().is_factored(), Ok(true));
        assert_solves(&a, &x2, &b);
        assert_ne!(x1.to_nalgebra(), x2.to_nalgebra());
    }

    #[test]
    fn grid_laplacians_factor_sparsely() {
        // 5-point Laplacian of a 40x40 grid, shifted to be positive definite
        let side = 40;
        let n = side * side;
        let index = |i: usize, j: usize| j * side + i;
        let mut t = Triplet::new(n, n);
        for (j, i) in iproduct!(0..side, 0..side) {
            t.add_entry(4.01, index(i, j), index(i, j)).unwrap();
            if i + 1 < side {
                t.add_entry(-1.0, index(i, j), index(i + 1, j)).unwrap();
                t.add_entry(-1.0, index(i + 1, j), index(i, j)).unwrap();
            }
            if j + 1 < side {
                t.add_entry(-1.0, index(i, j), index(i, j + 1)).unwrap();
                t.add_entry(-1.0, index(i, j + 1), index(i, j)).unwrap();
            }
        }
        let a = SparseMatrix::from_triplet(&t).unwrap();
        assert_eq!(a.nnz(), Ok(5 * n - 4 * side));

        let b = DenseMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { (i % 7) as f64 });
        let x = a.chol().solve_positive_definite(&b).unwrap();
        assert_eq!(x.shape(), Ok((n, 2)));
        assert_solves(&a, &x, &b);
        let x = a.lu().solve_square(&b).unwrap();
        assert_solves(&a, &x, &b);
    }

    #[test]
    fn complex_systems_solve() {
        let mut t = ComplexTriplet::new(2, 2);
        t.add_entry(Complex::new(2.0, 0.0), 0, 0).unwrap();
        t.add_entry(Complex::new(0.0, 1.0), 0, 1).unwrap();
        t.add_entry(Complex::new(0.0, -1.0), 1, 0).unwrap();
        t.add_entry(Complex::new(2.0, 0.0), 1, 1).unwrap();
        let a = ComplexSparseMatrix::from_triplet(&t).unwrap();
        let b = DenseMatrix::from_column(&[Complex::new(1.0, 0.0), Complex::new(0.0, 1.0)]);

        let x = a.chol().solve_positive_definite(&b).unwrap();
        let ax = a.times_dense(&x).unwrap();
        for i in 0..2 {
            let diff = ax.get(i, 0).unwrap() - b.get(i, 0).unwrap();
            assert!(diff.modulus() < 1e-9);
        }

        let conj = a.conjugate().unwrap();
        assert_eq!(conj.get(0, 1), Ok(Complex::new(0.0, -1.0)));
    }
}
