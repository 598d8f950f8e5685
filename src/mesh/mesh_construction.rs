use fixedbitset::FixedBitSet;
use itertools::Itertools;
use std::collections::HashMap;

use super::{
    CornerId, CornerRecord, EdgeId, EdgeRecord, FaceId, FaceKind, FaceRecord, HalfedgeId,
    HalfedgeRecord, Mesh, VertexId, VertexRecord,
};
use crate::error::{Error, Result};

/// Construct a halfedge mesh from a polygon soup.
///
/// Each face lists its vertex indices in counterclockwise order.
/// Edges missing a second face get a boundary halfedge,
/// and the boundary halfedges around each hole are linked into a boundary loop.
pub(super) fn build_mesh<F: AsRef<[usize]>>(vertex_count: usize, faces: &[F]) -> Result<Mesh> {
    if faces.is_empty() {
        return Err(Error::EmptyMesh);
    }
    for (face_idx, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        if let Some(&vertex) = face.iter().find(|&&v| v >= vertex_count) {
            return Err(Error::InvalidVertexIndex {
                face: face_idx,
                vertex,
            });
        }
        if face.len() < 3 || !face.iter().all_unique() {
            return Err(Error::DegenerateFace { face: face_idx });
        }
    }

    let interior_count: usize = faces.iter().map(|f| f.as_ref().len()).sum();
    let mut mesh = Mesh {
        vertices: vec![VertexRecord::default(); vertex_count],
        edges: Vec::new(),
        faces: Vec::with_capacity(faces.len()),
        halfedges: Vec::with_capacity(2 * interior_count),
        corners: Vec::with_capacity(interior_count),
        regular_face_count: faces.len(),
    };

    //
    // interior halfedges, edges and corners
    //

    // directed (from, to) vertex pairs, used to find twins
    // and to reject edges traversed twice in the same direction
    let mut halfedge_map: HashMap<(usize, usize), HalfedgeId> =
        HashMap::with_capacity(interior_count);

    for (face_idx, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        let sides = face.len();
        let first = mesh.halfedges.len();
        mesh.faces.push(FaceRecord {
            halfedge: Some(HalfedgeId(first)),
            kind: FaceKind::Regular,
        });

        for (i, (&from, &to)) in face.iter().circular_tuple_windows().enumerate() {
            let h = HalfedgeId(first + i);
            if halfedge_map.insert((from, to), h).is_some() {
                return Err(Error::NonManifoldEdge { v0: from, v1: to });
            }

            let corner = CornerId(mesh.corners.len());
            mesh.corners.push(CornerRecord { halfedge: Some(h) });

            let mut record = HalfedgeRecord {
                vertex: Some(VertexId(from)),
                face: Some(FaceId(face_idx)),
                corner: Some(corner),
                next: Some(HalfedgeId(first + (i + 1) % sides)),
                prev: Some(HalfedgeId(first + (i + sides - 1) % sides)),
                ..Default::default()
            };
            // each directed pair is unique,
            // so an undirected edge can't end up with more than two halfedges
            match halfedge_map.get(&(to, from)) {
                Some(&twin) => {
                    record.edge = mesh.halfedges[twin.0].edge;
                    record.twin = Some(twin);
                    mesh.halfedges[twin.0].twin = Some(h);
                }
                None => {
                    let edge = EdgeId(mesh.edges.len());
                    mesh.edges.push(EdgeRecord { halfedge: Some(h) });
                    record.edge = Some(edge);
                }
            }
            mesh.halfedges.push(record);
            mesh.vertices[from].halfedge = Some(h);
        }
    }

    //
    // boundary halfedges and loops
    //

    // boundary halfedge leaving each boundary vertex.
    // a vertex with two of these is where two fans touch
    let mut boundary_from: HashMap<usize, HalfedgeId> = HashMap::new();
    for h_idx in 0..interior_count {
        if mesh.halfedges[h_idx].twin.is_some() {
            continue;
        }
        // interior halfedge a -> b gets a boundary twin b -> a
        let next = mesh.next(HalfedgeId(h_idx))?;
        let b = mesh.origin(next)?;
        let boundary = HalfedgeId(mesh.halfedges.len());
        if boundary_from.insert(b.0, boundary).is_some() {
            return Err(Error::NonManifoldVertex { vertex: b.0 });
        }
        mesh.halfedges.push(HalfedgeRecord {
            vertex: Some(b),
            edge: mesh.halfedges[h_idx].edge,
            twin: Some(HalfedgeId(h_idx)),
            on_boundary: true,
            ..Default::default()
        });
        mesh.halfedges[h_idx].twin = Some(boundary);
    }

    for b_idx in interior_count..mesh.halfedges.len() {
        let boundary = HalfedgeId(b_idx);
        // b -> a continues from a
        let a = mesh.origin(mesh.twin(boundary)?)?;
        let Some(&next) = boundary_from.get(&a.0) else {
            return Err(Error::NonManifoldVertex { vertex: a.0 });
        };
        mesh.halfedges[b_idx].next = Some(next);
        mesh.halfedges[next.0].prev = Some(boundary);
    }

    let boundary_count = mesh.halfedges.len() - interior_count;
    let mut in_loop = FixedBitSet::with_capacity(boundary_count);
    for b_idx in interior_count..mesh.halfedges.len() {
        if in_loop.contains(b_idx - interior_count) {
            continue;
        }
        let loop_face = FaceId(mesh.faces.len());
        mesh.faces.push(FaceRecord {
            halfedge: Some(HalfedgeId(b_idx)),
            kind: FaceKind::BoundaryLoop,
        });
        let start = HalfedgeId(b_idx);
        let mut h = start;
        loop {
            in_loop.insert(h.0 - interior_count);
            mesh.halfedges[h.0].face = Some(loop_face);
            h = mesh.next(h)?;
            if h == start {
                break;
            }
        }
    }

    //
    // vertex manifoldness:
    // the one-ring walk from a vertex's halfedge must reach every outgoing halfedge
    //

    let mut reached = FixedBitSet::with_capacity(mesh.halfedges.len());
    for v in mesh.vertex_ids() {
        let Some(start) = mesh.vertices[v.0].halfedge else {
            continue;
        };
        let mut h = start;
        loop {
            reached.insert(h.0);
            h = mesh.next(mesh.twin(h)?)?;
            if h == start {
                break;
            }
        }
    }
    if let Some(h_idx) = (0..reached.len()).find(|&i| !reached.contains(i)) {
        let vertex = mesh.origin(HalfedgeId(h_idx))?;
        return Err(Error::NonManifoldVertex { vertex: vertex.0 });
    }

    let isolated = mesh.vertices.iter().filter(|v| v.halfedge.is_none()).count();
    if isolated > 0 {
        tracing::debug!(isolated, "mesh has isolated vertices");
    }
    tracing::debug!(
        vertices = mesh.num_vertices(),
        edges = mesh.num_edges(),
        faces = mesh.num_faces(),
        boundary_loops = mesh.num_boundary_loops(),
        "built halfedge mesh"
    );

    Ok(mesh)
}

//
// tests
//

/// Small meshes with vertex positions for testing.
#[cfg(test)]
pub(crate) mod test_meshes {
    use super::Mesh;
    use crate::Vec3;

    /// A regular tetrahedron inscribed in the cube `[-1, 1]^3`,
    /// oriented with outward normals.
    pub(crate) fn tetrahedron() -> (Mesh, Vec<Vec3>) {
        let positions = vec![
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ];
        #[rustfmt::skip]
        let faces = [
            [0, 1, 2],
            [1, 0, 3],
            [2, 1, 3],
            [0, 2, 3],
        ];
        (Mesh::from_triangles(4, &faces).unwrap(), positions)
    }

    /// A unit octahedron with vertices on the coordinate axes
    /// in the order +x, -x, +y, -y, +z, -z.
    pub(crate) fn octahedron() -> (Mesh, Vec<Vec3>) {
        let positions = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        #[rustfmt::skip]
        let faces = [
            [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
            [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
        ];
        (Mesh::from_triangles(6, &faces).unwrap(), positions)
    }

    /// A flat regular hexagon in the xy plane
    /// split into six triangles around a center vertex 0.
    ///    ____
    ///   /\  /\
    ///  /__\/__\
    ///  \  /\  /
    ///   \/__\/
    pub(crate) fn hexagon_fan() -> (Mesh, Vec<Vec3>) {
        let mut positions = vec![Vec3::zeros()];
        positions.extend((0..6).map(|k| {
            let angle = k as f64 * std::f64::consts::FRAC_PI_3;
            Vec3::new(angle.cos(), angle.sin(), 0.0)
        }));
        let faces: Vec<[usize; 3]> = (0..6).map(|k| [0, k + 1, (k + 1) % 6 + 1]).collect();
        (Mesh::from_triangles(7, &faces).unwrap(), positions)
    }

    /// A single unit square face.
    pub(crate) fn single_quad() -> (Mesh, Vec<Vec3>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        (Mesh::from_polygon_soup(4, &[[0, 1, 2, 3]]).unwrap(), positions)
    }

    /// A 3x3 grid of vertices on `[0, 2]^2` split into eight triangles,
    /// with the middle vertex lifted to make a bump.
    pub(crate) fn open_grid() -> (Mesh, Vec<Vec3>) {
        let positions: Vec<Vec3> = (0..3)
            .flat_map(|j| (0..3).map(move |i| (i, j)))
            .map(|(i, j)| {
                let z = if (i, j) == (1, 1) { 0.5 } else { 0.0 };
                Vec3::new(i as f64, j as f64, z)
            })
            .collect();
        let mut faces = Vec::new();
        for j in 0..2 {
            for i in 0..2 {
                let v00 = j * 3 + i;
                let (v10, v01, v11) = (v00 + 1, v00 + 3, v00 + 4);
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        (Mesh::from_triangles(9, &faces).unwrap(), positions)
    }

    /// A torus with radii 2 and 1 around the z axis,
    /// sampled on a 4x4 grid of vertices that wraps around in both directions.
    pub(crate) fn torus() -> (Mesh, Vec<Vec3>) {
        let n = 4;
        let step = std::f64::consts::TAU / n as f64;
        let positions: Vec<Vec3> = (0..n)
            .flat_map(|j| (0..n).map(move |i| (i, j)))
            .map(|(i, j)| {
                let (u, v) = (i as f64 * step, j as f64 * step);
                let ring = 2.0 + v.cos();
                Vec3::new(ring * u.cos(), ring * u.sin(), v.sin())
            })
            .collect();
        let vertex = |i: usize, j: usize| (j % n) * n + i % n;
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let (v00, v10) = (vertex(i, j), vertex(i + 1, j));
                let (v01, v11) = (vertex(i, j + 1), vertex(i + 1, j + 1));
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        (Mesh::from_triangles(n * n, &faces).unwrap(), positions)
    }
}
