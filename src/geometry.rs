//! Vertex positions on a mesh and the operators computed from them:
//! lengths, areas, angles, normals, curvatures and the Laplacian.
//!
//! All operators are pure functions of the current positions.
//! Degenerate geometry (zero-area faces, zero-length edges) is not guarded against;
//! NaN and infinite values propagate to the results.

mod normals;
pub use normals::{NormalMethod, UnknownNormalMethod};

use std::f64::consts::PI;

use crate::{
    error::{ElementKind, Error, Result},
    linear_algebra::{Complex, ComplexSparseMatrix, ComplexTriplet, Scalar, SparseMatrix, Triplet},
    mesh::{CornerId, EdgeId, ElementIndex, FaceId, HalfedgeId, Mesh, VertexId},
    Vec3,
};

/// Shift added to the diagonal of the Laplacian to make it positive definite.
pub const LAPLACE_SHIFT: f64 = 1e-8;

/// Options for constructing a [`Geometry`].
///
/// # Example
///
/// ```
/// use ddg::GeometryOptions;
///
/// // center at the origin and scale to unit radius
/// let options = GeometryOptions::default();
/// assert!(options.normalize && options.rescale);
///
/// // keep positions as given
/// let raw = GeometryOptions::raw();
/// assert!(!raw.normalize);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryOptions {
    /// Translate positions so their centroid lies at the origin.
    pub normalize: bool,
    /// After centering, divide positions by the largest distance from the origin.
    /// Only takes effect if `normalize` is set.
    pub rescale: bool,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            rescale: true,
        }
    }
}

impl GeometryOptions {
    /// Options that leave positions untouched.
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            normalize: false,
            rescale: false,
        }
    }
}

/// Center positions about their centroid and optionally scale them to unit radius.
///
/// Returns the radius (largest distance from the centroid) before rescaling.
pub fn normalize(positions: &mut [Vec3], rescale: bool) -> f64 {
    let centroid = positions.iter().sum::<Vec3>() / positions.len() as f64;
    let mut radius: f64 = -1.0;
    for p in positions.iter_mut() {
        *p -= centroid;
        radius = radius.max(p.norm());
    }
    if rescale {
        for p in positions.iter_mut() {
            *p /= radius;
        }
    }
    tracing::debug!(
        centroid = ?(centroid.x, centroid.y, centroid.z),
        radius,
        rescale,
        "normalized vertex positions"
    );
    radius
}

/// The geometry of a mesh, given by a position for each vertex.
#[derive(Clone, Debug)]
pub struct Geometry<'m> {
    mesh: &'m Mesh,
    positions: Vec<Vec3>,
}

impl<'m> Geometry<'m> {
    /// Attach positions to a mesh, centering and rescaling them to unit radius.
    ///
    /// `positions` are indexed like the mesh vertices.
    pub fn new(mesh: &'m Mesh, positions: Vec<Vec3>) -> Result<Self> {
        Self::with_options(mesh, positions, GeometryOptions::default())
    }

    /// Attach positions to a mesh with explicit normalization options.
    pub fn with_options(
        mesh: &'m Mesh,
        mut positions: Vec<Vec3>,
        options: GeometryOptions,
    ) -> Result<Self> {
        if positions.len() != mesh.num_vertices() {
            return Err(Error::PositionCount {
                expected: mesh.num_vertices(),
                actual: positions.len(),
            });
        }
        if options.normalize {
            normalize(&mut positions, options.rescale);
        }
        Ok(Self { mesh, positions })
    }

    /// The mesh these positions belong to.
    #[inline]
    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> Vec3 {
        self.positions[v.index()]
    }

    /// Move a vertex. Connectivity is unaffected.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, p: Vec3) {
        self.positions[v.index()] = p;
    }

    /// All positions, indexed like the mesh vertices.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    //
    // lengths and areas
    //

    /// Displacement along a halfedge, from its origin to its tip.
    pub fn vector(&self, h: HalfedgeId) -> Result<Vec3> {
        let a = self.position(self.mesh.origin(h)?);
        let b = self.position(self.mesh.tip(h)?);
        Ok(b - a)
    }

    /// Length of an edge.
    pub fn length(&self, e: EdgeId) -> Result<f64> {
        Ok(self.vector(self.mesh.edge_halfedge(e)?)?.norm())
    }

    /// Midpoint of an edge.
    pub fn midpoint(&self, e: EdgeId) -> Result<Vec3> {
        let h = self.mesh.edge_halfedge(e)?;
        let a = self.position(self.mesh.origin(h)?);
        let b = self.position(self.mesh.origin(self.mesh.twin(h)?)?);
        Ok((a + b) / 2.0)
    }

    /// Average length of all edges.
    pub fn mean_edge_length(&self) -> Result<f64> {
        let mut sum = 0.0;
        for e in self.mesh.edge_ids() {
            sum += self.length(e)?;
        }
        Ok(sum / self.mesh.num_edges() as f64)
    }

    /// Area of a triangle, zero for boundary loops.
    pub fn area(&self, f: FaceId) -> Result<f64> {
        if self.mesh.is_boundary_loop(f) {
            return Ok(0.0);
        }
        let (u, v) = self.face_edge_vectors(f)?;
        Ok(0.5 * u.cross(&v).norm())
    }

    /// Sum of the areas of all faces.
    pub fn total_area(&self) -> Result<f64> {
        let mut sum = 0.0;
        for f in self.mesh.face_ids() {
            sum += self.area(f)?;
        }
        Ok(sum)
    }

    /// Unit normal of a triangle.
    /// Boundary loops have no normal and give a connectivity error.
    pub fn face_normal(&self, f: FaceId) -> Result<Vec3> {
        if self.mesh.is_boundary_loop(f) {
            return Err(Error::missing(ElementKind::Face, f.index(), "normal"));
        }
        let (u, v) = self.face_edge_vectors(f)?;
        Ok(u.cross(&v).normalize())
    }

    /// The two edge vectors leaving the origin of a face's halfedge.
    fn face_edge_vectors(&self, f: FaceId) -> Result<(Vec3, Vec3)> {
        let h = self.mesh.face_halfedge(f)?;
        let u = self.vector(h)?;
        let v = -self.vector(self.mesh.prev(h)?)?;
        Ok((u, v))
    }

    /// The first three vertex positions of a face,
    /// starting from the origin of its halfedge, then its tip and the previous origin.
    fn face_points(&self, f: FaceId) -> Result<[Vec3; 3]> {
        let h = self.mesh.face_halfedge(f)?;
        Ok([
            self.position(self.mesh.origin(h)?),
            self.position(self.mesh.tip(h)?),
            self.position(self.mesh.origin(self.mesh.prev(h)?)?),
        ])
    }

    /// Barycenter of a triangle.
    /// For boundary loops, the midpoint of the loop's first edge.
    pub fn centroid(&self, f: FaceId) -> Result<Vec3> {
        let [a, b, c] = self.face_points(f)?;
        if self.mesh.is_boundary_loop(f) {
            return Ok((a + b) / 2.0);
        }
        Ok((a + b + c) / 3.0)
    }

    /// Circumcenter of a triangle.
    /// For boundary loops, the midpoint of the loop's first edge.
    pub fn circumcenter(&self, f: FaceId) -> Result<Vec3> {
        let [a, b, c] = self.face_points(f)?;
        if self.mesh.is_boundary_loop(f) {
            return Ok((a + b) / 2.0);
        }
        let ac = c - a;
        let ab = b - a;
        let w = ab.cross(&ac);
        let u = w.cross(&ab) * ac.norm_squared();
        let v = ac.cross(&w) * ab.norm_squared();
        Ok((u + v) / (2.0 * w.norm_squared()) + a)
    }

    /// An orthonormal basis of the plane of a triangle,
    /// with the first vector along the face's halfedge.
    /// Like [`face_normal`][Self::face_normal], an error on boundary loops.
    pub fn orthonormal_bases(&self, f: FaceId) -> Result<[Vec3; 2]> {
        let e1 = self.vector(self.mesh.face_halfedge(f)?)?.normalize();
        let e2 = self.face_normal(f)?.cross(&e1);
        Ok([e1, e2])
    }

    //
    // angles
    //

    /// Interior angle at a corner.
    pub fn angle(&self, c: CornerId) -> Result<f64> {
        let h = self.mesh.corner_halfedge(c)?;
        let u = self.vector(self.mesh.prev(h)?)?.normalize();
        let v = -self.vector(self.mesh.next(h)?)?.normalize();
        Ok(u.dot(&v).clamp(-1.0, 1.0).acos())
    }

    /// Cotangent of the angle opposite a halfedge, zero on the boundary.
    pub fn cotan(&self, h: HalfedgeId) -> Result<f64> {
        if self.mesh.on_boundary(h) {
            return Ok(0.0);
        }
        let u = self.vector(self.mesh.prev(h)?)?;
        let v = -self.vector(self.mesh.next(h)?)?;
        Ok(u.dot(&v) / u.cross(&v).norm())
    }

    /// Signed angle between the normals of the faces on either side of a halfedge,
    /// positive where the surface is convex and zero on the boundary.
    pub fn dihedral_angle(&self, h: HalfedgeId) -> Result<f64> {
        let twin = self.mesh.twin(h)?;
        if self.mesh.on_boundary(h) || self.mesh.on_boundary(twin) {
            return Ok(0.0);
        }
        let n1 = self.face_normal(self.mesh.halfedge_face(h)?)?;
        let n2 = self.face_normal(self.mesh.halfedge_face(twin)?)?;
        let w = self.vector(h)?.normalize();

        let cos_theta = n1.dot(&n2);
        let sin_theta = n1.cross(&n2).dot(&w);
        Ok(sin_theta.atan2(cos_theta))
    }

    //
    // dual areas
    //

    /// One third of the area of each face around a vertex.
    pub fn barycentric_dual_area(&self, v: VertexId) -> Result<f64> {
        let mut area = 0.0;
        for f in self.mesh.vertex(v).adjacent_faces(true) {
            area += self.area(f?)? / 3.0;
        }
        Ok(area)
    }

    /// Area of the circumcentric (Voronoi) dual cell of a vertex.
    pub fn circumcentric_dual_area(&self, v: VertexId) -> Result<f64> {
        let mut area = 0.0;
        for h in self.mesh.vertex(v).adjacent_halfedges(true) {
            let h = h?;
            let prev = self.mesh.prev(h)?;
            let u2 = self.vector(prev)?.norm_squared();
            let v2 = self.vector(h)?.norm_squared();
            let cot_alpha = self.cotan(prev)?;
            let cot_beta = self.cotan(h)?;
            area += (u2 * cot_alpha + v2 * cot_beta) / 8.0;
        }
        Ok(area)
    }

    //
    // curvatures
    //

    /// Discrete Gaussian curvature:
    /// `2π` (`π` on the boundary) minus the sum of corner angles at the vertex.
    pub fn angle_defect(&self, v: VertexId) -> Result<f64> {
        let mut angle_sum = 0.0;
        for c in self.mesh.vertex(v).adjacent_corners(true) {
            angle_sum += self.angle(c?)?;
        }
        let full = if self.mesh.vertex(v).on_boundary()? {
            PI
        } else {
            2.0 * PI
        };
        Ok(full - angle_sum)
    }

    /// Same as [`angle_defect`][Self::angle_defect].
    #[inline]
    pub fn scalar_gauss_curvature(&self, v: VertexId) -> Result<f64> {
        self.angle_defect(v)
    }

    /// Integrated mean curvature at a vertex,
    /// half the sum of edge lengths times dihedral angles.
    pub fn scalar_mean_curvature(&self, v: VertexId) -> Result<f64> {
        let mut sum = 0.0;
        for h in self.mesh.vertex(v).adjacent_halfedges(true) {
            let h = h?;
            let length = self.length(self.mesh.halfedge_edge(h)?)?;
            sum += 0.5 * length * self.dihedral_angle(h)?;
        }
        Ok(sum)
    }

    /// Sum of the angle defects of all vertices.
    /// For a closed surface this is `2π χ` by the Gauss-Bonnet theorem.
    pub fn total_angle_defect(&self) -> Result<f64> {
        let mut total = 0.0;
        for v in self.mesh.vertex_ids() {
            total += self.angle_defect(v)?;
        }
        Ok(total)
    }

    /// Minimum and maximum principal curvature at a vertex, in that order.
    pub fn principal_curvatures(&self, v: VertexId) -> Result<[f64; 2]> {
        let area = self.circumcentric_dual_area(v)?;
        let h = self.scalar_mean_curvature(v)? / area;
        let k = self.angle_defect(v)? / area;

        let discriminant = (h * h - k).max(0.0).sqrt();
        Ok([h - discriminant, h + discriminant])
    }

    //
    // matrices
    //

    /// The cotangent Laplacian, shifted by [`LAPLACE_SHIFT`] on the diagonal
    /// to make it positive definite.
    pub fn laplace_matrix(
        &self,
        vertex_index: &ElementIndex<VertexId>,
    ) -> Result<SparseMatrix<f64>> {
        let t = self.laplace_triplet(vertex_index, |w| w)?;
        let matrix = SparseMatrix::from_triplet(&t)?;
        let nnz = matrix.nnz()?;
        tracing::debug!(
            vertices = self.mesh.num_vertices(),
            nnz,
            "assembled cotangent Laplacian"
        );
        Ok(matrix)
    }

    /// The cotangent Laplacian with complex entries.
    pub fn complex_laplace_matrix(
        &self,
        vertex_index: &ElementIndex<VertexId>,
    ) -> Result<ComplexSparseMatrix> {
        let t: ComplexTriplet = self.laplace_triplet(vertex_index, |w| Complex::new(w, 0.0))?;
        let matrix = SparseMatrix::from_triplet(&t)?;
        let nnz = matrix.nnz()?;
        tracing::debug!(
            vertices = self.mesh.num_vertices(),
            nnz,
            "assembled complex cotangent Laplacian"
        );
        Ok(matrix)
    }

    fn laplace_triplet<T: Scalar>(
        &self,
        vertex_index: &ElementIndex<VertexId>,
        scalar: impl Fn(f64) -> T,
    ) -> Result<Triplet<T>> {
        let n = self.mesh.num_vertices();
        let mut t = Triplet::new(n, n);
        for v in self.mesh.vertex_ids() {
            let i = vertex_index.get(v)?;
            let mut sum = LAPLACE_SHIFT;
            for h in self.mesh.vertex(v).adjacent_halfedges(true) {
                let h = h?;
                let twin = self.mesh.twin(h)?;
                let j = vertex_index.get(self.mesh.origin(twin)?)?;
                let weight = (self.cotan(h)? + self.cotan(twin)?) / 2.0;
                sum += weight;
                t.add_entry(scalar(-weight), i, j)?;
            }
            t.add_entry(scalar(sum), i, i)?;
        }
        Ok(t)
    }

    /// Diagonal matrix of barycentric dual areas.
    pub fn mass_matrix(&self, vertex_index: &ElementIndex<VertexId>) -> Result<SparseMatrix<f64>> {
        let n = self.mesh.num_vertices();
        let mut t = Triplet::new(n, n);
        for v in self.mesh.vertex_ids() {
            let i = vertex_index.get(v)?;
            t.add_entry(self.barycentric_dual_area(v)?, i, i)?;
        }
        SparseMatrix::from_triplet(&t)
    }
}
