//! Vectors, complex numbers and matrices.
//!
//! [`Vector`] and [`Complex`] are plain `nalgebra` values.
//! Matrices wrap `nalgebra` (dense) and `nalgebra-sparse` (sparse) storage
//! that is tracked by the [`registry`] so it can be released in bulk at checkpoints.
//! Sparse matrices are factored with `faer`'s sparse solvers.
//! Every operation producing a matrix allocates a new tracked object.
//!
//! Matrices are generic over the scalar type, which is either `f64` or [`Complex`].

pub mod registry;
pub use registry::{Checkpoint, Tracked};

mod dense;
pub use dense::{ComplexDenseMatrix, DenseMatrix, DenseNorm};

mod sparse;
pub use sparse::{
    Cholesky, ComplexSparseMatrix, ComplexTriplet, Lu, Qr, SparseMatrix, Triplet,
};

use nalgebra as na;

/// A 3-component vector.
pub type Vector = na::Vector3<f64>;

/// A complex number.
pub type Complex = na::Complex<f64>;

/// Construct a complex number from its modulus and argument.
#[inline]
pub fn polar(r: f64, theta: f64) -> Complex {
    Complex::new(r * theta.cos(), r * theta.sin())
}

/// Scalar types matrices can hold.
///
/// Both `nalgebra` and `faer` arithmetic must be available,
/// the latter for sparse factorizations.
pub trait Scalar:
    na::ComplexField<RealField = f64> + faer::traits::ComplexField + Copy + 'static
{
}

impl Scalar for f64 {}
impl Scalar for Complex {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;
    use na::ComplexField;

    #[test]
    fn vectors_are_plain_values() {
        let a = Vector::new(1.0, 0.0, 0.0);
        let b = Vector::new(0.0, 2.0, 0.0);
        let mut c = a + b;
        c -= a;
        assert_eq!(c, b);
        assert_eq!(a.cross(&b), Vector::new(0.0, 0.0, 2.0));
        assert_eq!(a.dot(&b), 0.0);
        assert!(relative_eq!((a + b).norm_squared(), 5.0));
        assert!(relative_eq!(b.normalize().norm(), 1.0));
    }

    #[test]
    fn complex_numbers_convert_from_polar() {
        let z = polar(2.0, std::f64::consts::FRAC_PI_2);
        assert!(relative_eq!(z.re, 0.0, epsilon = 1e-12));
        assert!(relative_eq!(z.im, 2.0));
        assert!(relative_eq!(z.argument(), std::f64::consts::FRAC_PI_2));
        assert!(relative_eq!(z.modulus(), 2.0));
        assert_eq!(polar(0.0, 1.0), Complex::new(0.0, 0.0));
        assert!(relative_eq!((z * z.inv()).re, 1.0));
        assert_eq!(z.conj().im, -z.im);
    }
}
