//! Discrete exterior calculus operators as sparse matrices.
//!
//! Primal k-forms are stored as column vectors with one row per k-cell
//! (vertices, edges, faces), ordered by the given [`ElementIndex`] maps.
//! The orientation of an edge is that of its canonical halfedge
//! and the orientation of a face is that of its halfedge cycle.
//!
//! ```
//! use ddg::{dec, Geometry, Mesh, Vec3};
//!
//! let mesh = Mesh::from_triangles(4, &[[0, 1, 2], [1, 0, 3], [2, 1, 3], [0, 2, 3]]).unwrap();
//! let positions = vec![
//!     Vec3::new(1.0, 1.0, 1.0),
//!     Vec3::new(1.0, -1.0, -1.0),
//!     Vec3::new(-1.0, 1.0, -1.0),
//!     Vec3::new(-1.0, -1.0, 1.0),
//! ];
//! let geometry = Geometry::new(&mesh, positions).unwrap();
//! let (v, e, f) = (mesh.vertex_index(), mesh.edge_index(), mesh.face_index());
//!
//! let d0 = dec::build_exterior_derivative_0_form(&geometry, &e, &v).unwrap();
//! let d1 = dec::build_exterior_derivative_1_form(&geometry, &f, &e).unwrap();
//! // the boundary of a boundary is empty
//! let dd = d1.times_sparse(&d0).unwrap();
//! assert_eq!(dd.frobenius_norm().unwrap(), 0.0);
//! ```

use crate::{
    error::Result,
    geometry::Geometry,
    linear_algebra::{SparseMatrix, Triplet},
    mesh::{EdgeId, ElementIndex, FaceId, VertexId},
};

/// Diagonal Hodge star on primal 0-forms:
/// the barycentric dual area of each vertex.
pub fn build_hodge_star_0_form(
    geometry: &Geometry,
    vertex_index: &ElementIndex<VertexId>,
) -> Result<SparseMatrix<f64>> {
    let mesh = geometry.mesh();
    let n = mesh.num_vertices();
    let mut t = Triplet::new(n, n);
    for v in mesh.vertex_ids() {
        let i = vertex_index.get(v)?;
        t.add_entry(geometry.barycentric_dual_area(v)?, i, i)?;
    }
    assemble(t, "star0")
}

/// Diagonal Hodge star on primal 1-forms:
/// the ratio of dual to primal edge length,
/// which is the average cotangent of the angles opposite the edge.
pub fn build_hodge_star_1_form(
    geometry: &Geometry,
    edge_index: &ElementIndex<EdgeId>,
) -> Result<SparseMatrix<f64>> {
    let mesh = geometry.mesh();
    let n = mesh.num_edges();
    let mut t = Triplet::new(n, n);
    for e in mesh.edge_ids() {
        let i = edge_index.get(e)?;
        let h = mesh.edge_halfedge(e)?;
        let w = (geometry.cotan(h)? + geometry.cotan(mesh.twin(h)?)?) / 2.0;
        t.add_entry(w, i, i)?;
    }
    assemble(t, "star1")
}

/// Diagonal Hodge star on primal 2-forms:
/// the reciprocal of each face's area.
pub fn build_hodge_star_2_form(
    geometry: &Geometry,
    face_index: &ElementIndex<FaceId>,
) -> Result<SparseMatrix<f64>> {
    let mesh = geometry.mesh();
    let n = mesh.num_faces();
    let mut t = Triplet::new(n, n);
    for f in mesh.face_ids() {
        let i = face_index.get(f)?;
        t.add_entry(1.0 / geometry.area(f)?, i, i)?;
    }
    assemble(t, "star2")
}

/// Exterior derivative on 0-forms, an edge-by-vertex incidence matrix.
///
/// Each edge row has `+1` in the column of its canonical halfedge's origin
/// and `-1` in the column of the opposite vertex.
pub fn build_exterior_derivative_0_form(
    geometry: &Geometry,
    edge_index: &ElementIndex<EdgeId>,
    vertex_index: &ElementIndex<VertexId>,
) -> Result<SparseMatrix<f64>> {
    let mesh = geometry.mesh();
    let mut t = Triplet::new(mesh.num_edges(), mesh.num_vertices());
    for e in mesh.edge_ids() {
        let i = edge_index.get(e)?;
        let h = mesh.edge_halfedge(e)?;
        let j = vertex_index.get(mesh.origin(h)?)?;
        let k = vertex_index.get(mesh.origin(mesh.twin(h)?)?)?;
        t.add_entry(1.0, i, j)?;
        t.add_entry(-1.0, i, k)?;
    }
    assemble(t, "d0")
}

/// Exterior derivative on 1-forms, a face-by-edge incidence matrix.
///
/// Each face row has `+1` for every edge whose canonical halfedge
/// lies on the face's cycle and `-1` for every edge traversed against it.
pub fn build_exterior_derivative_1_form(
    geometry: &Geometry,
    face_index: &ElementIndex<FaceId>,
    edge_index: &ElementIndex<EdgeId>,
) -> Result<SparseMatrix<f64>> {
    let mesh = geometry.mesh();
    let mut t = Triplet::new(mesh.num_faces(), mesh.num_edges());
    for f in mesh.faces() {
        let i = face_index.get(f.id())?;
        for h in f.adjacent_halfedges(true) {
            let h = h?;
            let e = mesh.halfedge_edge(h)?;
            let sign = if mesh.edge_halfedge(e)? == h { 1.0 } else { -1.0 };
            t.add_entry(sign, i, edge_index.get(e)?)?;
        }
    }
    assemble(t, "d1")
}

fn assemble(t: Triplet<f64>, operator: &'static str) -> Result<SparseMatrix<f64>> {
    let matrix = SparseMatrix::from_triplet(&t)?;
    let (rows, cols) = matrix.shape()?;
    let nnz = matrix.nnz()?;
    tracing::debug!(operator, rows, cols, nnz, "assembled DEC operator");
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::GeometryOptions, mesh::test_meshes::*, mesh::Mesh, Vec3};
    use approx::relative_eq;
    use itertools::iproduct;

    fn operators(mesh: &Mesh, positions: Vec<Vec3>) -> [SparseMatrix<f64>; 5] {
        let geom = Geometry::new(mesh, positions).unwrap();
        let (v, e, f) = (mesh.vertex_index(), mesh.edge_index(), mesh.face_index());
        [
            build_hodge_star_0_form(&geom, &v).unwrap(),
            build_hodge_star_1_form(&geom, &e).unwrap(),
            build_hodge_star_2_form(&geom, &f).unwrap(),
            build_exterior_derivative_0_form(&geom, &e, &v).unwrap(),
            build_exterior_derivative_1_form(&geom, &f, &e).unwrap(),
        ]
    }

    #[test]
    fn exterior_derivative_squares_to_zero() {
        for (mesh, positions) in [tetrahedron(), octahedron()] {
            let [_, _, _, d0, d1] = operators(&mesh, positions);
            assert_eq!(d0.shape(), Ok((mesh.num_edges(), mesh.num_vertices())));
            assert_eq!(d1.shape(), Ok((mesh.num_faces(), mesh.num_edges())));

            let dd = d1.times_sparse(&d0).unwrap();
            assert_eq!(dd.shape(), Ok((mesh.num_faces(), mesh.num_vertices())));
            for (i, j) in iproduct!(0..mesh.num_faces(), 0..mesh.num_vertices()) {
                assert_eq!(dd.get(i, j), Ok(0.0));
            }
        }
    }

    #[test]
    fn incidence_matrices_have_unit_entries() {
        let (mesh, positions) = open_grid();
        let [_, _, _, d0, d1] = operators(&mesh, positions);
        assert_eq!(d0.nnz(), Ok(2 * mesh.num_edges()));
        assert_eq!(d1.nnz(), Ok(3 * mesh.num_faces()));

        for i in 0..mesh.num_edges() {
            let mut row: Vec<f64> = (0..mesh.num_vertices())
                .map(|j| d0.get(i, j).unwrap())
                .filter(|x| *x != 0.0)
                .collect();
            row.sort_by(f64::total_cmp);
            assert_eq!(row, vec![-1.0, 1.0]);
        }
        // interior edges appear with opposite signs in their two faces
        for j in 0..mesh.num_edges() {
            let column_sum: f64 = (0..mesh.num_faces()).map(|i| d1.get(i, j).unwrap()).sum();
            let e = mesh.edge_ids().nth(j).unwrap();
            if mesh.edge(e).on_boundary().unwrap() {
                assert_eq!(column_sum.abs(), 1.0);
            } else {
                assert_eq!(column_sum, 0.0);
            }
        }
    }

    #[test]
    fn hodge_stars_are_diagonal_measures() {
        let (mesh, positions) = octahedron();
        let geom =
            Geometry::with_options(&mesh, positions.clone(), GeometryOptions::raw()).unwrap();
        let [star0, star1, star2, _, _] = operators(&mesh, positions);
        assert_eq!(star0.nnz(), Ok(mesh.num_vertices()));
        assert_eq!(star1.nnz(), Ok(mesh.num_edges()));
        assert_eq!(star2.nnz(), Ok(mesh.num_faces()));

        // equilateral faces with side √2
        let face_area = 3f64.sqrt() / 2.0;
        for i in 0..mesh.num_vertices() {
            assert!(relative_eq!(
                star0.get(i, i).unwrap(),
                4.0 * face_area / 3.0,
                epsilon = 1e-12
            ));
        }
        for i in 0..mesh.num_edges() {
            assert!(relative_eq!(
                star1.get(i, i).unwrap(),
                1.0 / 3f64.sqrt(),
                epsilon = 1e-12
            ));
        }
        for (i, f) in mesh.face_ids().enumerate() {
            let star = star2.get(i, i).unwrap();
            assert!(relative_eq!(star, 1.0 / face_area, epsilon = 1e-12));
            assert!(relative_eq!(star * geom.area(f).unwrap(), 1.0, epsilon = 1e-12));
        }
    }

    #[test]
    fn laplacian_factors_through_the_operators() {
        // d0ᵀ ⋆1 d0 is the cotangent Laplacian without its diagonal shift
        let (mesh, positions) = octahedron();
        let geom = Geometry::new(&mesh, positions.clone()).unwrap();
        let [_, star1, _, d0, _] = operators(&mesh, positions);
        let laplace = geom.laplace_matrix(&mesh.vertex_index()).unwrap();
        let composed = d0
            .transpose()
            .unwrap()
            .times_sparse(&star1.times_sparse(&d0).unwrap())
            .unwrap();
        let n = mesh.num_vertices();
        for (i, j) in iproduct!(0..n, 0..n) {
            let shift = if i == j { crate::geometry::LAPLACE_SHIFT } else { 0.0 };
            assert!(relative_eq!(
                composed.get(i, j).unwrap() + shift,
                laplace.get(i, j).unwrap(),
                epsilon = 1e-12
            ));
        }
    }

    #[test]
    fn builders_use_the_given_ordering() {
        let (mesh, positions) = tetrahedron();
        let geom = Geometry::new(&mesh, positions).unwrap();
        let reversed: ElementIndex<EdgeId> = mesh
            .edge_ids()
            .map(|e| (e, mesh.num_edges() - 1 - e.index()))
            .collect();
        let vertices = mesh.vertex_index();
        let d0 = build_exterior_derivative_0_form(&geom, &mesh.edge_index(), &vertices).unwrap();
        let d0_rev = build_exterior_derivative_0_form(&geom, &reversed, &vertices).unwrap();
        for (i, j) in iproduct!(0..mesh.num_edges(), 0..mesh.num_vertices()) {
            assert_eq!(d0.get(i, j), d0_rev.get(mesh.num_edges() - 1 - i, j));
        }

        let missing = ElementIndex::from_ids(mesh.face_ids().skip(1));
        assert!(build_hodge_star_2_form(&geom, &missing).is_err());
    }
}
