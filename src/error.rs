//! Errors produced by mesh traversal, geometry and the linear algebra façade.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of mesh element an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// A vertex.
    Vertex,
    /// An edge.
    Edge,
    /// A face or boundary loop.
    Face,
    /// A halfedge.
    Halfedge,
    /// A corner of a face.
    Corner,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
            ElementKind::Face => "face",
            ElementKind::Halfedge => "halfedge",
            ElementKind::Corner => "corner",
        };
        f.write_str(name)
    }
}

/// The factorization a [`Error::Factorization`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactorizationKind {
    /// LLᵀ (or LLᴴ for complex matrices).
    Cholesky,
    /// LU with partial pivoting.
    Lu,
    /// QR, used for least squares.
    Qr,
}

impl std::fmt::Display for FactorizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FactorizationKind::Cholesky => "Cholesky",
            FactorizationKind::Lu => "LU",
            FactorizationKind::Qr => "QR",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A connectivity link needed for traversal is missing.
    /// This means the mesh is malformed or non-manifold.
    #[error("{element} {index} has no {missing}")]
    Connectivity {
        /// Kind of the element whose link is missing.
        element: ElementKind,
        /// Index of that element.
        index: usize,
        /// Name of the missing link, e.g. `"twin"`.
        missing: &'static str,
    },

    /// The polygon soup has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references a vertex that doesn't exist.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index in the polygon soup.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three distinct vertices.
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// The face index in the polygon soup.
        face: usize,
    },

    /// An edge is shared by more than two faces
    /// or two faces traverse it in the same direction.
    #[error("edge ({v0}, {v1}) is non-manifold or inconsistently oriented")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// The faces around a vertex don't form a single fan.
    #[error("vertex {vertex} is non-manifold")]
    NonManifoldVertex {
        /// The vertex index.
        vertex: usize,
    },

    /// The number of positions doesn't match the number of vertices.
    #[error("expected {expected} vertex positions, got {actual}")]
    PositionCount {
        /// Number of vertices in the mesh.
        expected: usize,
        /// Number of positions given.
        actual: usize,
    },

    /// An element has no entry in an index map given to a matrix builder.
    #[error("{element} {index} is missing from the index map")]
    MissingIndex {
        /// Kind of the element.
        element: ElementKind,
        /// Index of the element in the mesh.
        index: usize,
    },

    /// Matrix shapes are incompatible for an operation.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        /// Name of the operation.
        op: &'static str,
        /// Shape of the left operand.
        left: (usize, usize),
        /// Shape of the right operand.
        right: (usize, usize),
    },

    /// An entry lies outside a matrix.
    #[error("entry ({row}, {col}) is outside a {}x{} matrix", .shape.0, .shape.1)]
    IndexOutOfBounds {
        /// Row of the entry.
        row: usize,
        /// Column of the entry.
        col: usize,
        /// Shape of the matrix.
        shape: (usize, usize),
    },

    /// The backend storage of a matrix was released by the registry.
    #[error("matrix {id} was used after being released")]
    Released {
        /// Registry id of the released object.
        id: u64,
    },

    /// The backend failed to factor a matrix.
    #[error("{kind} factorization failed")]
    Factorization {
        /// Which factorization failed.
        kind: FactorizationKind,
    },

    /// A vertex index doesn't fit in a 32-bit index buffer.
    #[error("vertex index {index} doesn't fit in 32 bits")]
    IndexOverflow {
        /// The vertex index.
        index: usize,
    },
}

impl Error {
    /// Create a connectivity error for a missing link.
    pub(crate) fn missing(element: ElementKind, index: usize, missing: &'static str) -> Self {
        Error::Connectivity {
            element,
            index,
            missing,
        }
    }

    /// Whether this error signals malformed mesh connectivity.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connectivity { .. })
    }
}
