use nalgebra as na;
use rand::Rng;

use super::{
    registry::{Slot, Tracked},
    Complex, Scalar,
};
use crate::error::{Error, Result};

/// Entrywise norms for [`DenseMatrix::norm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenseNorm {
    /// Largest entry modulus.
    LInfinity,
    /// Sum of entry moduli.
    L1,
    /// Square root of the sum of squared entry moduli (Frobenius norm).
    L2,
}

/// A dense matrix whose storage is tracked by the [registry][super::registry].
///
/// Column vectors are represented as `n x 1` matrices.
pub struct DenseMatrix<T: Scalar> {
    pub(super) slot: Slot<na::DMatrix<T>>,
}

/// A dense matrix of complex numbers.
pub type ComplexDenseMatrix = DenseMatrix<Complex>;

impl<T: Scalar> Tracked for DenseMatrix<T> {
    fn registry_id(&self) -> u64 {
        self.slot.id()
    }

    fn is_released(&self) -> bool {
        self.slot.is_released()
    }
}

impl<T: Scalar> std::fmt::Debug for DenseMatrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("DenseMatrix");
        s.field("id", &self.slot.id());
        match self.slot.with(|m| m.shape()) {
            Ok(shape) => s.field("shape", &shape),
            Err(_) => s.field("released", &true),
        };
        s.finish()
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Wrap an existing nalgebra matrix.
    pub fn from_nalgebra(matrix: na::DMatrix<T>) -> Self {
        Self {
            slot: Slot::new(matrix),
        }
    }

    /// A copy of the underlying nalgebra matrix.
    pub fn to_nalgebra(&self) -> Result<na::DMatrix<T>> {
        self.slot.with(|m| m.clone())
    }

    /// A matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_nalgebra(na::DMatrix::zeros(rows, cols))
    }

    /// A matrix with ones on the main diagonal and zeros elsewhere.
    pub fn identity(rows: usize, cols: usize) -> Self {
        Self::from_nalgebra(na::DMatrix::identity(rows, cols))
    }

    /// A matrix of ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::constant(T::one(), rows, cols)
    }

    /// A matrix with every entry equal to `value`.
    pub fn constant(value: T, rows: usize, cols: usize) -> Self {
        Self::from_nalgebra(na::DMatrix::from_element(rows, cols, value))
    }

    /// A matrix with entries computed from their row and column.
    pub fn from_fn(rows: usize, cols: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        Self::from_nalgebra(na::DMatrix::from_fn(rows, cols, f))
    }

    /// A column vector.
    pub fn from_column(values: &[T]) -> Self {
        Self::from_nalgebra(na::DMatrix::from_column_slice(values.len(), 1, values))
    }

    /// Number of rows.
    pub fn n_rows(&self) -> Result<usize> {
        self.slot.with(|m| m.nrows())
    }

    /// Number of columns.
    pub fn n_cols(&self) -> Result<usize> {
        self.slot.with(|m| m.ncols())
    }

    /// Number of rows and columns.
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.slot.with(|m| m.shape())
    }

    /// The transpose, without conjugation.
    pub fn transpose(&self) -> Result<Self> {
        self.map(|m| m.transpose())
    }

    /// The entrywise complex conjugate (a copy for real matrices).
    pub fn conjugate(&self) -> Result<Self> {
        self.map(|m| m.map(|x| x.conjugate()))
    }

    /// The chosen norm of the entries.
    pub fn norm(&self, norm: DenseNorm) -> Result<f64> {
        self.slot.with(|m| match norm {
            DenseNorm::LInfinity => m.iter().map(|x| x.modulus()).fold(0.0, f64::max),
            DenseNorm::L1 => m.iter().map(|x| x.modulus()).sum(),
            DenseNorm::L2 => m.iter().map(|x| x.modulus_squared()).sum::<f64>().sqrt(),
        })
    }

    /// Numerical rank, counting singular values above a small tolerance.
    pub fn rank(&self) -> Result<usize> {
        self.slot.with(|m| m.rank(1e-10))
    }

    /// Sum of all entries.
    pub fn sum(&self) -> Result<T> {
        self.slot.with(|m| m.iter().fold(T::zero(), |acc, &x| acc + x))
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
        self.map(|m| m.view((r0, c0), (r1 - r0, c1 - c0)).into_owned())
    }

    /// Add another matrix to this one in place.
    pub fn increment_by(&mut self, other: &Self) -> Result<()> {
        self.check_same_shape("increment_by", other)?;
        other.slot.with(|b| self.slot.with_mut(|a| *a += b))?
    }

    /// Subtract another matrix from this one in place.
    pub fn decrement_by(&mut self, other: &Self) -> Result<()> {
        self.check_same_shape("decrement_by", other)?;
        other.slot.with(|b| self.slot.with_mut(|a| *a -= b))?
    }

    /// Multiply every entry by `s` in place.
    pub fn scale_by(&mut self, s: T) -> Result<()> {
        self.slot.with_mut(|a| a.iter_mut().for_each(|x| *x *= s))
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
        self.map(|m| m.map(|x| x * s))
    }

    /// Matrix product `self * other`.
    pub fn times_dense(&self, other: &Self) -> Result<Self> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left.1 != right.0 {
            return Err(Error::DimensionMismatch {
                op: "times_dense",
                left,
                right,
            });
        }
        self.zip(other, |a, b| a * b)
    }

    /// Every entry negated.
    pub fn negated(&self) -> Result<Self> {
        self.map(|m| -m)
    }

    /// The entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.slot.with(|m| m.get((row, col)).copied())?.ok_or(Error::IndexOutOfBounds {
            row,
            col,
            shape: self.shape()?,
        })
    }

    /// Overwrite the entry at `(row, col)`.
    pub fn set(&mut self, value: T, row: usize, col: usize) -> Result<()> {
        let shape = self.shape()?;
        let entry = self.slot.with_mut(|m| m.get_mut((row, col)).map(|x| *x = value))?;
        entry.ok_or(Error::IndexOutOfBounds { row, col, shape })
    }

    /// Concatenate horizontally: `[self other]`.
    pub fn hcat(&self, other: &Self) -> Result<Self> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left.0 != right.0 {
            return Err(Error::DimensionMismatch {
                op: "hcat",
                left,
                right,
            });
        }
        self.zip(other, |a, b| {
            na::DMatrix::from_fn(left.0, left.1 + right.1, |i, j| {
                if j < left.1 {
                    a[(i, j)]
                } else {
                    b[(i, j - left.1)]
                }
            })
        })
    }

    /// Concatenate vertically: `[self; other]`.
    pub fn vcat(&self, other: &Self) -> Result<Self> {
        let (top, bottom) = (self.shape()?, other.shape()?);
        if top.1 != bottom.1 {
            return Err(Error::DimensionMismatch {
                op: "vcat",
                left: top,
                right: bottom,
            });
        }
        self.zip(other, |a, b| {
            na::DMatrix::from_fn(top.0 + bottom.0, top.1, |i, j| {
                if i < top.0 {
                    a[(i, j)]
                } else {
                    b[(i - top.0, j)]
                }
            })
        })
    }

    //
    // helpers
    //

    fn map(&self, f: impl FnOnce(&na::DMatrix<T>) -> na::DMatrix<T>) -> Result<Self> {
        Ok(Self::from_nalgebra(self.slot.with(f)?))
    }

    fn zip(
        &self,
        other: &Self,
        f: impl FnOnce(&na::DMatrix<T>, &na::DMatrix<T>) -> na::DMatrix<T>,
    ) -> Result<Self> {
        let result = self.slot.with(|a| other.slot.with(|b| f(a, b)))??;
        Ok(Self::from_nalgebra(result))
    }

    fn check_same_shape(&self, op: &'static str, other: &Self) -> Result<()> {
        let (left, right) = (self.shape()?, other.shape()?);
        if left != right {
            return Err(Error::DimensionMismatch { op, left, right });
        }
        Ok(())
    }
}

impl DenseMatrix<f64> {
    /// A matrix with entries drawn uniformly from `[0, 1)`.
    pub fn random(rows: usize, cols: usize) -> Self {
        let mut rng = rand::thread_rng();
        Self::from_fn(rows, cols, |_, _| rng.gen::<f64>())
    }
}

impl DenseMatrix<Complex> {
    /// A matrix with real and imaginary parts drawn uniformly from `[0, 1)`.
    pub fn random(rows: usize, cols: usize) -> Self {
        let mut rng = rand::thread_rng();
        Self::from_fn(rows, cols, |_, _| Complex::new(rng.gen(), rng.gen()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn factories_have_the_requested_shape() {
        let z = DenseMatrix::<f64>::zeros(2, 3);
        assert_eq!(z.shape(), Ok((2, 3)));
        assert_eq!(z.sum(), Ok(0.0));

        let i = DenseMatrix::<f64>::identity(3, 3);
        assert_eq!(i.sum(), Ok(3.0));
        assert_eq!(i.rank(), Ok(3));

        let c = DenseMatrix::constant(2.5, 2, 2);
        assert_eq!(c.sum(), Ok(10.0));
        assert_eq!(c.rank(), Ok(1));

        let r = DenseMatrix::<f64>::random(4, 2);
        assert_eq!(r.shape(), Ok((4, 2)));
        let max = r.norm(DenseNorm::LInfinity).unwrap();
        assert!((0.0..1.0).contains(&max));
    }

    #[test]
    fn arithmetic_matches_hand_computation() {
        let a = DenseMatrix::from_fn(2, 2, |i, j| [[1.0, 2.0], [3.0, 4.0]][i][j]);
        let b = DenseMatrix::<f64>::identity(2, 2);

        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.get(0, 0), Ok(2.0));
        assert_eq!(sum.get(0, 1), Ok(2.0));
        assert_eq!(a.minus(&b).unwrap().get(1, 1), Ok(3.0));
        assert_eq!(a.negated().unwrap().get(1, 0), Ok(-3.0));
        assert_eq!(a.transpose().unwrap().get(0, 1), Ok(3.0));

        let product = a.times_dense(&a).unwrap();
        // [[7, 10], [15, 22]]
        assert_eq!(product.get(1, 0), Ok(15.0));
        assert_eq!(product.get(1, 1), Ok(22.0));

        let mut c = a.times_scalar(2.0).unwrap();
        c.decrement_by(&a).unwrap();
        c.increment_by(&b).unwrap();
        c.scale_by(0.5).unwrap();
        assert_eq!(c.get(0, 0), Ok(1.0));
        c.set(9.0, 0, 1).unwrap();
        assert_eq!(c.get(0, 1), Ok(9.0));

        assert_eq!(a.norm(DenseNorm::L1), Ok(10.0));
        assert_eq!(a.norm(DenseNorm::LInfinity), Ok(4.0));
        assert!(relative_eq!(a.norm(DenseNorm::L2).unwrap(), 30f64.sqrt()));
    }

    #[test]
    fn blocks_and_concatenation() {
        let a = DenseMatrix::from_fn(3, 3, |i, j| (3 * i + j) as f64);
        let block = a.sub_matrix(1, 3, 0, 2).unwrap();
        assert_eq!(block.shape(), Ok((2, 2)));
        assert_eq!(block.get(0, 0), Ok(3.0));
        assert_eq!(block.get(1, 1), Ok(7.0));

        let wide = a.hcat(&DenseMatrix::ones(3, 1)).unwrap();
        assert_eq!(wide.shape(), Ok((3, 4)));
        assert_eq!(wide.get(2, 3), Ok(1.0));
        let tall = a.vcat(&DenseMatrix::zeros(2, 3)).unwrap();
        assert_eq!(tall.shape(), Ok((5, 3)));
        assert_eq!(tall.get(2, 2), Ok(8.0));
        assert_eq!(tall.get(4, 2), Ok(0.0));
    }

    #[test]
    fn complex_matrices_conjugate() {
        let a = ComplexDenseMatrix::constant(Complex::new(1.0, 2.0), 2, 1);
        let conj = a.conjugate().unwrap();
        assert_eq!(conj.get(1, 0), Ok(Complex::new(1.0, -2.0)));
        assert!(relative_eq!(
            a.norm(DenseNorm::L2).unwrap(),
            10f64.sqrt()
        ));
        let r = ComplexDenseMatrix::random(2, 2);
        assert_eq!(r.shape(), Ok((2, 2)));
    }

    #[test]
    fn shape_errors_are_reported() {
        let a = DenseMatrix::<f64>::zeros(2, 2);
        let b = DenseMatrix::<f64>::zeros(3, 2);
        assert_eq!(
            a.plus(&b).unwrap_err(),
            Error::DimensionMismatch {
                op: "plus",
                left: (2, 2),
                right: (3, 2)
            }
        );
        assert!(a.times_dense(&b).is_err());
        assert!(b.times_dense(&a).is_ok());
        assert!(a.vcat(&b).is_ok());
        assert!(a.hcat(&b).is_err());
        assert_eq!(
            a.get(2, 0),
            Err(Error::IndexOutOfBounds {
                row: 2,
                col: 0,
                shape: (2, 2)
            })
        );
        assert!(a.sub_matrix(0, 3, 0, 1).is_err());
    }
}
