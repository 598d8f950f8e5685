//! Views into single mesh elements and the circulators walking around them.

use super::{CornerId, EdgeId, FaceId, FaceKind, HalfedgeId, Mesh, VertexId};
use crate::error::{Error, Result};

/// A view into a single vertex.
#[derive(Clone, Copy, Debug)]
pub struct VertexView<'a> {
    pub(super) mesh: &'a Mesh,
    pub(super) id: VertexId,
}

impl<'a> PartialEq for VertexView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'a> Eq for VertexView<'a> {}

impl<'a> VertexView<'a> {
    /// The id of the viewed vertex.
    #[inline]
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Get the index of this vertex in the vertex arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0
    }

    /// Get one outgoing halfedge of this vertex.
    #[inline]
    pub fn halfedge(&self) -> Result<HalfedgeId> {
        self.mesh.vertex_halfedge(self.id)
    }

    /// Whether this vertex has no incident edges.
    #[inline]
    pub fn is_isolated(&self) -> bool {
        self.mesh.vertices[self.id.0].halfedge.is_none()
    }

    /// Number of edges incident to this vertex.
    pub fn degree(&self) -> Result<usize> {
        count(self.adjacent_halfedges(true))
    }

    /// Whether this vertex lies on a boundary loop.
    pub fn on_boundary(&self) -> Result<bool> {
        for h in self.adjacent_halfedges(true) {
            if self.mesh.on_boundary(h?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Iterate over the neighboring vertices.
    pub fn adjacent_vertices(&self, ccw: bool) -> Circulator<'a, VertexId> {
        self.circulate(ccw, None, |mesh, h| mesh.origin(mesh.twin(h)?))
    }

    /// Iterate over the incident edges.
    pub fn adjacent_edges(&self, ccw: bool) -> Circulator<'a, EdgeId> {
        self.circulate(ccw, None, Mesh::halfedge_edge)
    }

    /// Iterate over the incident regular faces, skipping boundary loops.
    pub fn adjacent_faces(&self, ccw: bool) -> Circulator<'a, FaceId> {
        self.circulate(ccw, Some(skip_boundary), Mesh::halfedge_face)
    }

    /// Iterate over the outgoing halfedges.
    pub fn adjacent_halfedges(&self, ccw: bool) -> Circulator<'a, HalfedgeId> {
        self.circulate(ccw, None, |_, h| Ok(h))
    }

    /// Iterate over the corners at this vertex, one per incident regular face.
    pub fn adjacent_corners(&self, ccw: bool) -> Circulator<'a, CornerId> {
        self.circulate(ccw, Some(skip_boundary), |mesh, h| {
            mesh.halfedge_corner(mesh.next(h)?)
        })
    }

    fn circulate<T>(
        &self,
        ccw: bool,
        skip: Option<SkipFn>,
        project: ProjectFn<T>,
    ) -> Circulator<'a, T> {
        let start = self.mesh.vertices[self.id.0].halfedge;
        Circulator::new(self.mesh, start, Pivot::Vertex, ccw, skip, project)
    }
}

/// A view into a single edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeView<'a> {
    pub(super) mesh: &'a Mesh,
    pub(super) id: EdgeId,
}

impl<'a> PartialEq for EdgeView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'a> Eq for EdgeView<'a> {}

impl<'a> EdgeView<'a> {
    /// The id of the viewed edge.
    #[inline]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Get the index of this edge in the edge arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0
    }

    /// Get the canonical halfedge of this edge.
    /// It always belongs to a regular face.
    #[inline]
    pub fn halfedge(&self) -> Result<HalfedgeId> {
        self.mesh.edge_halfedge(self.id)
    }

    /// The endpoints of this edge,
    /// starting from the origin of the canonical halfedge.
    pub fn vertices(&self) -> Result<[VertexId; 2]> {
        let h = self.halfedge()?;
        Ok([self.mesh.origin(h)?, self.mesh.origin(self.mesh.twin(h)?)?])
    }

    /// Whether either side of this edge is a boundary loop.
    pub fn on_boundary(&self) -> Result<bool> {
        let h = self.halfedge()?;
        Ok(self.mesh.on_boundary(h) || self.mesh.on_boundary(self.mesh.twin(h)?))
    }
}

/// A view into a single face or boundary loop.
#[derive(Clone, Copy, Debug)]
pub struct FaceView<'a> {
    pub(super) mesh: &'a Mesh,
    pub(super) id: FaceId,
}

impl<'a> PartialEq for FaceView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'a> Eq for FaceView<'a> {}

impl<'a> FaceView<'a> {
    /// The id of the viewed face.
    #[inline]
    pub fn id(&self) -> FaceId {
        self.id
    }

    /// Get the index of this face in the face arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0
    }

    /// Whether this is a regular face or a boundary loop.
    #[inline]
    pub fn kind(&self) -> FaceKind {
        self.mesh.faces[self.id.0].kind
    }

    /// Whether this face is a boundary loop.
    #[inline]
    pub fn is_boundary_loop(&self) -> bool {
        self.kind() == FaceKind::BoundaryLoop
    }

    /// Get one halfedge of this face.
    #[inline]
    pub fn halfedge(&self) -> Result<HalfedgeId> {
        self.mesh.face_halfedge(self.id)
    }

    /// Number of sides of this face.
    pub fn degree(&self) -> Result<usize> {
        count(self.adjacent_halfedges(true))
    }

    /// Iterate over the vertices of this face.
    pub fn adjacent_vertices(&self, ccw: bool) -> Circulator<'a, VertexId> {
        self.circulate(ccw, None, Mesh::origin)
    }

    /// Iterate over the edges of this face.
    pub fn adjacent_edges(&self, ccw: bool) -> Circulator<'a, EdgeId> {
        self.circulate(ccw, None, Mesh::halfedge_edge)
    }

    /// Iterate over the regular faces sharing an edge with this face.
    pub fn adjacent_faces(&self, ccw: bool) -> Circulator<'a, FaceId> {
        self.circulate(ccw, Some(skip_boundary_twin), |mesh, h| {
            mesh.halfedge_face(mesh.twin(h)?)
        })
    }

    /// Iterate over the halfedges of this face.
    pub fn adjacent_halfedges(&self, ccw: bool) -> Circulator<'a, HalfedgeId> {
        self.circulate(ccw, None, |_, h| Ok(h))
    }

    /// Iterate over the corners of this face.
    ///
    /// Boundary loops have no corners,
    /// so this yields a connectivity error for them.
    pub fn adjacent_corners(&self, ccw: bool) -> Circulator<'a, CornerId> {
        self.circulate(ccw, None, Mesh::halfedge_corner)
    }

    fn circulate<T>(
        &self,
        ccw: bool,
        skip: Option<SkipFn>,
        project: ProjectFn<T>,
    ) -> Circulator<'a, T> {
        let start = self.mesh.faces[self.id.0].halfedge;
        Circulator::new(self.mesh, start, Pivot::Face, ccw, skip, project)
    }
}

/// A view into a single corner.
#[derive(Clone, Copy, Debug)]
pub struct CornerView<'a> {
    pub(super) mesh: &'a Mesh,
    pub(super) id: CornerId,
}

impl<'a> PartialEq for CornerView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'a> Eq for CornerView<'a> {}

impl<'a> CornerView<'a> {
    /// The id of the viewed corner.
    #[inline]
    pub fn id(&self) -> CornerId {
        self.id
    }

    /// Get the index of this corner in the corner arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0
    }

    /// The halfedge opposite this corner.
    #[inline]
    pub fn halfedge(&self) -> Result<HalfedgeId> {
        self.mesh.corner_halfedge(self.id)
    }

    /// The vertex this corner sits at.
    #[inline]
    pub fn vertex(&self) -> Result<VertexId> {
        self.mesh.corner_vertex(self.id)
    }

    /// The face this corner belongs to.
    #[inline]
    pub fn face(&self) -> Result<FaceId> {
        self.mesh.corner_face(self.id)
    }

    /// The next corner counterclockwise in the same face.
    #[inline]
    pub fn next(&self) -> Result<CornerId> {
        self.mesh.corner_next(self.id)
    }

    /// The previous corner of the same face.
    #[inline]
    pub fn prev(&self) -> Result<CornerId> {
        self.mesh.corner_prev(self.id)
    }
}

/// A view into a single halfedge.
///
/// The same links are available as [`Mesh`] methods taking a [`HalfedgeId`];
/// this type bundles them for chained traversal, e.g.
/// `mesh.halfedge(h).twin()?.next()?.vertex()`.
#[derive(Clone, Copy, Debug)]
pub struct HalfedgeView<'a> {
    pub(super) mesh: &'a Mesh,
    pub(super) id: HalfedgeId,
}

impl<'a> PartialEq for HalfedgeView<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<'a> Eq for HalfedgeView<'a> {}

impl<'a> HalfedgeView<'a> {
    /// The id of the viewed halfedge.
    #[inline]
    pub fn id(&self) -> HalfedgeId {
        self.id
    }

    /// Position of the halfedge in the mesh arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0
    }

    /// The oppositely oriented halfedge on the same edge.
    #[inline]
    pub fn twin(&self) -> Result<HalfedgeView<'a>> {
        Ok(self.mesh.halfedge(self.mesh.twin(self.id)?))
    }

    /// The following halfedge around the same face.
    #[inline]
    pub fn next(&self) -> Result<HalfedgeView<'a>> {
        Ok(self.mesh.halfedge(self.mesh.next(self.id)?))
    }

    /// The preceding halfedge around the same face.
    #[inline]
    pub fn prev(&self) -> Result<HalfedgeView<'a>> {
        Ok(self.mesh.halfedge(self.mesh.prev(self.id)?))
    }

    /// The vertex this halfedge starts from.
    #[inline]
    pub fn vertex(&self) -> Result<VertexId> {
        self.mesh.origin(self.id)
    }

    /// The edge this halfedge lies on.
    #[inline]
    pub fn edge(&self) -> Result<EdgeId> {
        self.mesh.halfedge_edge(self.id)
    }

    /// The face or boundary loop to the left of this halfedge.
    #[inline]
    pub fn face(&self) -> Result<FaceId> {
        self.mesh.halfedge_face(self.id)
    }

    /// The corner opposite this halfedge, an error on boundary loops.
    #[inline]
    pub fn corner(&self) -> Result<CornerId> {
        self.mesh.halfedge_corner(self.id)
    }

    /// Whether this halfedge belongs to a boundary loop.
    #[inline]
    pub fn on_boundary(&self) -> bool {
        self.mesh.on_boundary(self.id)
    }
}

//
// circulators
//

type SkipFn = fn(&Mesh, HalfedgeId) -> Result<bool>;
type ProjectFn<T> = fn(&Mesh, HalfedgeId) -> Result<T>;

fn skip_boundary(mesh: &Mesh, h: HalfedgeId) -> Result<bool> {
    Ok(mesh.on_boundary(h))
}

fn skip_boundary_twin(mesh: &Mesh, h: HalfedgeId) -> Result<bool> {
    Ok(mesh.on_boundary(mesh.twin(h)?))
}

fn count<T>(iter: impl Iterator<Item = Result<T>>) -> Result<usize> {
    iter.into_iter().try_fold(0, |n, item| item.map(|_| n + 1))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pivot {
    Vertex,
    Face,
}

#[derive(Clone, Debug)]
enum State {
    Walking {
        start: HalfedgeId,
        current: HalfedgeId,
        started: bool,
    },
    Failed(Error),
    Done,
}

/// An iterator walking the halfedges around a vertex or a face,
/// obtained from the `adjacent_*` methods of [`VertexView`] and [`FaceView`].
///
/// Around a vertex, counterclockwise steps go to `twin.next`
/// and clockwise steps to `prev.twin`.
/// Around a face they go to `next` and `prev` respectively.
/// The walk ends on returning to the first yielded halfedge.
///
/// A missing connectivity link is yielded as an error once,
/// after which the iterator is exhausted.
/// Calling the `adjacent_*` method again starts a fresh walk.
#[derive(Clone)]
pub struct Circulator<'a, T> {
    mesh: &'a Mesh,
    pivot: Pivot,
    ccw: bool,
    skip: Option<SkipFn>,
    project: ProjectFn<T>,
    state: State,
}

impl<'a, T> std::fmt::Debug for Circulator<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circulator")
            .field("pivot", &self.pivot)
            .field("ccw", &self.ccw)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, T> Circulator<'a, T> {
    fn new(
        mesh: &'a Mesh,
        start: Option<HalfedgeId>,
        pivot: Pivot,
        ccw: bool,
        skip: Option<SkipFn>,
        project: ProjectFn<T>,
    ) -> Self {
        let mut circ = Self {
            mesh,
            pivot,
            ccw,
            skip,
            project,
            state: State::Done,
        };
        if let Some(start) = start {
            circ.state = match circ.first_unskipped(start) {
                Ok(Some(first)) => State::Walking {
                    start: first,
                    current: first,
                    started: false,
                },
                Ok(None) => State::Done,
                Err(e) => State::Failed(e),
            };
        }
        circ
    }

    fn step(&self, h: HalfedgeId) -> Result<HalfedgeId> {
        match (self.pivot, self.ccw) {
            (Pivot::Vertex, true) => self.mesh.next(self.mesh.twin(h)?),
            (Pivot::Vertex, false) => self.mesh.twin(self.mesh.prev(h)?),
            (Pivot::Face, true) => self.mesh.next(h),
            (Pivot::Face, false) => self.mesh.prev(h),
        }
    }

    /// First halfedge from `start` that isn't skipped,
    /// or `None` if the whole ring is skipped.
    fn first_unskipped(&self, start: HalfedgeId) -> Result<Option<HalfedgeId>> {
        let Some(skip) = self.skip else {
            return Ok(Some(start));
        };
        let mut h = start;
        while skip(self.mesh, h)? {
            h = self.step(h)?;
            if h == start {
                return Ok(None);
            }
        }
        Ok(Some(h))
    }
}

impl<'a, T> Iterator for Circulator<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, mut current, started) = match std::mem::replace(&mut self.state, State::Done)
        {
            State::Walking {
                start,
                current,
                started,
            } => (start, current, started),
            State::Failed(e) => return Some(Err(e)),
            State::Done => return None,
        };

        // the start halfedge is never skipped, so this stops there at the latest
        if let Some(skip) = self.skip {
            loop {
                match skip(self.mesh, current) {
                    Ok(true) => match self.step(current) {
                        Ok(h) => current = h,
                        Err(e) => return Some(Err(e)),
                    },
                    Ok(false) => break,
                    Err(e) => return Some(Err(e)),
                }
            }
        }
        if started && current == start {
            return None;
        }

        let value = match (self.project)(self.mesh, current) {
            Ok(value) => value,
            Err(e) => return Some(Err(e)),
        };
        match self.step(current) {
            Ok(next) => {
                self.state = State::Walking {
                    start,
                    current: next,
                    started: true,
                };
                Some(Ok(value))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'a, T> std::iter::FusedIterator for Circulator<'a, T> {}
