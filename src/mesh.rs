//! The halfedge mesh: connectivity of vertices, edges, faces, halfedges and corners.
//!
//! Elements live in flat arenas, one per element kind,
//! and refer to each other by typed integer ids.
//! Connectivity is fixed once the mesh has been built;
//! only vertex positions (owned by [`Geometry`][crate::Geometry]) change afterwards.
//!
//! Every accessor that follows a connectivity link returns a [`Result`],
//! failing with [`Error::Connectivity`] if the link is missing.
//! A mesh built with [`Mesh::from_polygon_soup`] always has complete links,
//! so these errors only arise from malformed meshes.

/// Low-level mesh construction and corresponding tests.
mod mesh_construction;
#[cfg(test)]
pub(crate) use mesh_construction::test_meshes;

mod elements;
pub use elements::FaceKind;
pub(crate) use elements::{CornerRecord, EdgeRecord, FaceRecord, HalfedgeRecord, VertexRecord};

mod views;
pub use views::{Circulator, CornerView, EdgeView, FaceView, HalfedgeView, VertexView};

use std::collections::HashMap;

use crate::error::{ElementKind, Error, Result};

/// Common interface of the typed element ids.
pub trait ElementId: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    /// The kind of element this id refers to.
    const KIND: ElementKind;

    /// Position of the element in its arena.
    fn index(self) -> usize;
}

macro_rules! element_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Position of the element in its arena (a contiguous zero-based index).
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl ElementId for $name {
            const KIND: ElementKind = $kind;

            #[inline]
            fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

element_id!(
    /// Identifies a vertex.
    VertexId,
    ElementKind::Vertex
);
element_id!(
    /// Identifies an (undirected) edge.
    EdgeId,
    ElementKind::Edge
);
element_id!(
    /// Identifies a face or a boundary loop.
    FaceId,
    ElementKind::Face
);
element_id!(
    /// Identifies a halfedge.
    HalfedgeId,
    ElementKind::Halfedge
);
element_id!(
    /// Identifies a corner, i.e. the angle at a vertex inside a face.
    CornerId,
    ElementKind::Corner
);

/// A halfedge mesh.
///
/// Regular faces occupy the face ids `0..num_faces()`,
/// and the boundary loops (one per hole) follow them.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub(crate) vertices: Vec<VertexRecord>,
    pub(crate) edges: Vec<EdgeRecord>,
    /// regular faces first, boundary loops after
    pub(crate) faces: Vec<FaceRecord>,
    pub(crate) halfedges: Vec<HalfedgeRecord>,
    pub(crate) corners: Vec<CornerRecord>,
    pub(crate) regular_face_count: usize,
}

impl Mesh {
    /// Build a mesh from a polygon soup.
    ///
    /// `faces` lists the vertex indices of each polygon in counterclockwise order.
    /// Vertices not referenced by any face become isolated vertices.
    #[inline]
    pub fn from_polygon_soup<F: AsRef<[usize]>>(vertex_count: usize, faces: &[F]) -> Result<Self> {
        mesh_construction::build_mesh(vertex_count, faces)
    }

    /// Build a mesh from triangles.
    #[inline]
    pub fn from_triangles(vertex_count: usize, triangles: &[[usize; 3]]) -> Result<Self> {
        mesh_construction::build_mesh(vertex_count, triangles)
    }

    //
    // element counts
    //

    /// Number of vertices, including isolated ones.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of regular faces (boundary loops are not counted).
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.regular_face_count
    }

    /// Number of boundary loops, i.e. holes in the surface.
    #[inline]
    pub fn num_boundary_loops(&self) -> usize {
        self.faces.len() - self.regular_face_count
    }

    /// Number of halfedges, including the ones on boundary loops.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of corners, three per triangle.
    #[inline]
    pub fn num_corners(&self) -> usize {
        self.corners.len()
    }

    /// Euler characteristic `V - E + F` of the mesh.
    pub fn euler_characteristic(&self) -> isize {
        self.num_vertices() as isize - self.num_edges() as isize + self.num_faces() as isize
    }

    /// Whether the mesh has at least one boundary loop.
    #[inline]
    pub fn has_boundary(&self) -> bool {
        self.num_boundary_loops() > 0
    }

    /// Whether any vertex has no incident edges.
    pub fn has_isolated_vertices(&self) -> bool {
        self.vertices.iter().any(|v| v.halfedge.is_none())
    }

    /// Whether every regular face is a triangle.
    pub fn is_triangulated(&self) -> Result<bool> {
        for f in self.faces() {
            if f.degree()? != 3 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    //
    // element iteration
    //

    /// Iterate over the ids of all vertices.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId)
    }

    /// Iterate over the ids of all edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    /// Iterate over the ids of all regular faces.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.regular_face_count).map(FaceId)
    }

    /// Iterate over the ids of all boundary loops.
    pub fn boundary_loop_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (self.regular_face_count..self.faces.len()).map(FaceId)
    }

    /// Iterate over the ids of all halfedges.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfedgeId> + '_ {
        (0..self.halfedges.len()).map(HalfedgeId)
    }

    /// Iterate over the ids of all corners.
    pub fn corner_ids(&self) -> impl Iterator<Item = CornerId> + '_ {
        (0..self.corners.len()).map(CornerId)
    }

    /// Iterate over views of all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = VertexView<'_>> + '_ {
        self.vertex_ids().map(|id| self.vertex(id))
    }

    /// Iterate over views of all edges.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.edge_ids().map(|id| self.edge(id))
    }

    /// Iterate over views of all regular faces.
    pub fn faces(&self) -> impl Iterator<Item = FaceView<'_>> + '_ {
        self.face_ids().map(|id| self.face(id))
    }

    /// Iterate over views of all boundary loops.
    pub fn boundary_loops(&self) -> impl Iterator<Item = FaceView<'_>> + '_ {
        self.boundary_loop_ids().map(|id| self.face(id))
    }

    /// Iterate over views of all corners.
    pub fn corners(&self) -> impl Iterator<Item = CornerView<'_>> + '_ {
        self.corner_ids().map(|id| self.corner(id))
    }

    //
    // views
    //

    /// A view of a vertex.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> VertexView<'_> {
        VertexView { mesh: self, id }
    }

    /// A view of an edge.
    #[inline]
    pub fn edge(&self, id: EdgeId) -> EdgeView<'_> {
        EdgeView { mesh: self, id }
    }

    /// A view of a face or boundary loop.
    #[inline]
    pub fn face(&self, id: FaceId) -> FaceView<'_> {
        FaceView { mesh: self, id }
    }

    /// A view of a halfedge.
    #[inline]
    pub fn halfedge(&self, id: HalfedgeId) -> HalfedgeView<'_> {
        HalfedgeView { mesh: self, id }
    }

    /// A view of a corner.
    #[inline]
    pub fn corner(&self, id: CornerId) -> CornerView<'_> {
        CornerView { mesh: self, id }
    }

    //
    // connectivity accessors
    //

    /// The oppositely directed halfedge on the same edge.
    #[inline]
    pub fn twin(&self, h: HalfedgeId) -> Result<HalfedgeId> {
        self.halfedges[h.0]
            .twin
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "twin"))
    }

    /// The next halfedge around the same face.
    #[inline]
    pub fn next(&self, h: HalfedgeId) -> Result<HalfedgeId> {
        self.halfedges[h.0]
            .next
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "next"))
    }

    /// The previous halfedge around the same face.
    #[inline]
    pub fn prev(&self, h: HalfedgeId) -> Result<HalfedgeId> {
        self.halfedges[h.0]
            .prev
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "prev"))
    }

    /// The vertex a halfedge starts from.
    #[inline]
    pub fn origin(&self, h: HalfedgeId) -> Result<VertexId> {
        self.halfedges[h.0]
            .vertex
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "vertex"))
    }

    /// The vertex a halfedge points to, i.e. the origin of its next halfedge.
    #[inline]
    pub fn tip(&self, h: HalfedgeId) -> Result<VertexId> {
        self.origin(self.next(h)?)
    }

    /// The edge a halfedge lies on.
    #[inline]
    pub fn halfedge_edge(&self, h: HalfedgeId) -> Result<EdgeId> {
        self.halfedges[h.0]
            .edge
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "edge"))
    }

    /// The face (or boundary loop) a halfedge belongs to.
    #[inline]
    pub fn halfedge_face(&self, h: HalfedgeId) -> Result<FaceId> {
        self.halfedges[h.0]
            .face
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "face"))
    }

    /// The corner opposite a halfedge.
    /// Boundary halfedges have no corner.
    #[inline]
    pub fn halfedge_corner(&self, h: HalfedgeId) -> Result<CornerId> {
        self.halfedges[h.0]
            .corner
            .ok_or_else(|| Error::missing(ElementKind::Halfedge, h.0, "corner"))
    }

    /// Whether a halfedge belongs to a boundary loop.
    #[inline]
    pub fn on_boundary(&self, h: HalfedgeId) -> bool {
        self.halfedges[h.0].on_boundary
    }

    /// One outgoing halfedge of a vertex.
    #[inline]
    pub fn vertex_halfedge(&self, v: VertexId) -> Result<HalfedgeId> {
        self.vertices[v.0]
            .halfedge
            .ok_or_else(|| Error::missing(ElementKind::Vertex, v.0, "halfedge"))
    }

    /// The canonical halfedge of an edge.
    #[inline]
    pub fn edge_halfedge(&self, e: EdgeId) -> Result<HalfedgeId> {
        self.edges[e.0]
            .halfedge
            .ok_or_else(|| Error::missing(ElementKind::Edge, e.0, "halfedge"))
    }

    /// One halfedge on the boundary of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId) -> Result<HalfedgeId> {
        self.faces[f.0]
            .halfedge
            .ok_or_else(|| Error::missing(ElementKind::Face, f.0, "halfedge"))
    }

    /// Whether a face id refers to a boundary loop.
    #[inline]
    pub fn is_boundary_loop(&self, f: FaceId) -> bool {
        self.faces[f.0].kind == FaceKind::BoundaryLoop
    }

    /// The halfedge opposite a corner.
    #[inline]
    pub fn corner_halfedge(&self, c: CornerId) -> Result<HalfedgeId> {
        self.corners[c.0]
            .halfedge
            .ok_or_else(|| Error::missing(ElementKind::Corner, c.0, "halfedge"))
    }

    /// The vertex at a corner.
    #[inline]
    pub fn corner_vertex(&self, c: CornerId) -> Result<VertexId> {
        self.origin(self.prev(self.corner_halfedge(c)?)?)
    }

    /// The face containing a corner.
    #[inline]
    pub fn corner_face(&self, c: CornerId) -> Result<FaceId> {
        self.halfedge_face(self.corner_halfedge(c)?)
    }

    /// The next corner counterclockwise in the same face.
    #[inline]
    pub fn corner_next(&self, c: CornerId) -> Result<CornerId> {
        self.halfedge_corner(self.next(self.corner_halfedge(c)?)?)
    }

    /// The previous corner in the same face.
    #[inline]
    pub fn corner_prev(&self, c: CornerId) -> Result<CornerId> {
        self.halfedge_corner(self.prev(self.corner_halfedge(c)?)?)
    }

    //
    // index maps
    //

    /// Map each vertex to its position in the vertex arena.
    pub fn vertex_index(&self) -> ElementIndex<VertexId> {
        ElementIndex::from_ids(self.vertex_ids())
    }

    /// Map each edge to its position in the edge arena.
    pub fn edge_index(&self) -> ElementIndex<EdgeId> {
        ElementIndex::from_ids(self.edge_ids())
    }

    /// Map each regular face to its position in the face arena.
    pub fn face_index(&self) -> ElementIndex<FaceId> {
        ElementIndex::from_ids(self.face_ids())
    }
}

/// A map from mesh elements to matrix rows or columns.
///
/// The identity ordering is available from
/// [`Mesh::vertex_index`], [`Mesh::edge_index`] and [`Mesh::face_index`],
/// but any ordering can be collected from `(id, index)` pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementIndex<Id: ElementId> {
    map: HashMap<Id, usize>,
}

impl<Id: ElementId> ElementIndex<Id> {
    /// Number consecutive ids in the order they're given.
    pub fn from_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        ids.into_iter().enumerate().map(|(i, id)| (id, i)).collect()
    }

    /// Look up the index of an element.
    #[inline]
    pub fn get(&self, id: Id) -> Result<usize> {
        self.map.get(&id).copied().ok_or(Error::MissingIndex {
            element: Id::KIND,
            index: id.index(),
        })
    }

    /// Number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<Id: ElementId> FromIterator<(Id, usize)> for ElementIndex<Id> {
    fn from_iter<I: IntoIterator<Item = (Id, usize)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

//
// tests
//
