//! Element records stored in the mesh arenas.

use super::{CornerId, EdgeId, FaceId, HalfedgeId, VertexId};

/// Whether a face is a real polygon or a boundary loop filling a hole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FaceKind {
    /// A face given in the polygon soup.
    #[default]
    Regular,
    /// A loop of boundary halfedges around a hole in the surface.
    BoundaryLoop,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct VertexRecord {
    /// an outgoing halfedge, `None` for isolated vertices
    pub halfedge: Option<HalfedgeId>,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EdgeRecord {
    /// the halfedge created first for this edge, never a boundary halfedge
    pub halfedge: Option<HalfedgeId>,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FaceRecord {
    pub halfedge: Option<HalfedgeId>,
    pub kind: FaceKind,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct HalfedgeRecord {
    /// the vertex this halfedge starts from
    pub vertex: Option<VertexId>,
    pub edge: Option<EdgeId>,
    pub face: Option<FaceId>,
    pub corner: Option<CornerId>,
    pub twin: Option<HalfedgeId>,
    pub next: Option<HalfedgeId>,
    pub prev: Option<HalfedgeId>,
    pub on_boundary: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CornerRecord {
    /// the halfedge opposite this corner
    pub halfedge: Option<HalfedgeId>,
}
