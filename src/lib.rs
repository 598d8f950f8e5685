//! Discrete differential geometry on halfedge meshes.
//!
//! A [`Mesh`] holds the connectivity of a polygon mesh,
//! a [`Geometry`] attaches vertex positions to it and computes
//! lengths, areas, angles, normals and curvatures,
//! and the [`dec`] module assembles discrete exterior calculus operators
//! as sparse matrices from the [`linear_algebra`] module.
//!
//! ```
//! use ddg::{Geometry, Mesh, NormalMethod, Vec3};
//!
//! // a regular tetrahedron
//! let mesh = Mesh::from_triangles(4, &[[0, 1, 2], [1, 0, 3], [2, 1, 3], [0, 2, 3]]).unwrap();
//! let positions = vec![
//!     Vec3::new(1.0, 1.0, 1.0),
//!     Vec3::new(1.0, -1.0, -1.0),
//!     Vec3::new(-1.0, 1.0, -1.0),
//!     Vec3::new(-1.0, -1.0, 1.0),
//! ];
//! let geometry = Geometry::new(&mesh, positions).unwrap();
//!
//! // Gauss-Bonnet: total curvature is 2π times the Euler characteristic
//! let total = geometry.total_angle_defect().unwrap();
//! let chi = mesh.euler_characteristic() as f64;
//! assert!((total - 2.0 * std::f64::consts::PI * chi).abs() < 1e-10);
//!
//! for v in mesh.vertex_ids() {
//!     let n = geometry.vertex_normal(v, NormalMethod::AngleWeighted).unwrap();
//!     assert!(n.dot(&geometry.position(v)) > 0.0);
//! }
//!
//! let laplace = geometry.laplace_matrix(&mesh.vertex_index()).unwrap();
//! assert_eq!(laplace.shape().unwrap(), (4, 4));
//! ```

#![warn(missing_docs)]

pub mod error;
#[doc(inline)]
pub use error::{Error, Result};

pub mod mesh;
#[doc(inline)]
pub use mesh::{CornerId, EdgeId, ElementIndex, FaceId, HalfedgeId, Mesh, VertexId};

pub mod geometry;
#[doc(inline)]
pub use geometry::{Geometry, GeometryOptions, NormalMethod};

pub mod dec;

pub mod linear_algebra;
#[doc(inline)]
pub use linear_algebra::{
    Complex, ComplexDenseMatrix, ComplexSparseMatrix, DenseMatrix, SparseMatrix, Triplet,
};

pub mod attributes;

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;
/// Type alias for a 3D `nalgebra` unit vector.
pub type UnitVec3 = na::Unit<Vec3>;
