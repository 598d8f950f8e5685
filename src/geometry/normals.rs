//! Vertex normals by the different weighting schemes.

use super::Geometry;
use crate::{error::Result, mesh::VertexId, Vec3};

/// The ways of averaging face information into a vertex normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NormalMethod {
    /// Plain sum of adjacent face normals.
    EquallyWeighted,
    /// Face normals weighted by face area.
    AreaWeighted,
    /// Face normals weighted by the corner angle at the vertex.
    AngleWeighted,
    /// Normal of the sphere through the vertex and its neighbors.
    SphereInscribed,
    /// Direction of the discrete mean curvature vector.
    MeanCurvature,
    /// Direction of the discrete Gaussian curvature vector.
    GaussCurvature,
}

impl NormalMethod {
    /// Every method, in a fixed order.
    pub const ALL: [Self; 6] = [
        Self::EquallyWeighted,
        Self::AreaWeighted,
        Self::AngleWeighted,
        Self::SphereInscribed,
        Self::MeanCurvature,
        Self::GaussCurvature,
    ];

    /// The human-readable name of the method.
    pub fn name(self) -> &'static str {
        match self {
            Self::EquallyWeighted => "equally weighted",
            Self::AreaWeighted => "area weighted",
            Self::AngleWeighted => "angle weighted",
            Self::SphereInscribed => "sphere inscribed",
            Self::MeanCurvature => "mean curvature",
            Self::GaussCurvature => "gauss curvature",
        }
    }
}

impl std::fmt::Display for NormalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a [`NormalMethod`] from a name it doesn't have.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("unknown vertex normal method {0:?}")]
pub struct UnknownNormalMethod(pub String);

impl std::str::FromStr for NormalMethod {
    type Err = UnknownNormalMethod;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| UnknownNormalMethod(s.to_string()))
    }
}

/// Normalize an accumulated normal,
/// returning it as is if it has no length.
fn unit_or_degenerate(v: VertexId, method: NormalMethod, n: Vec3) -> Vec3 {
    match n.try_normalize(0.0) {
        Some(unit) => unit,
        None => {
            tracing::warn!(vertex = v.index(), %method, "degenerate vertex normal");
            n
        }
    }
}

impl<'m> Geometry<'m> {
    /// The normal at a vertex computed with the given method.
    pub fn vertex_normal(&self, v: VertexId, method: NormalMethod) -> Result<Vec3> {
        match method {
            NormalMethod::EquallyWeighted => self.vertex_normal_equally_weighted(v),
            NormalMethod::AreaWeighted => self.vertex_normal_area_weighted(v),
            NormalMethod::AngleWeighted => self.vertex_normal_angle_weighted(v),
            NormalMethod::SphereInscribed => self.vertex_normal_sphere_inscribed(v),
            NormalMethod::MeanCurvature => self.vertex_normal_mean_curvature(v),
            NormalMethod::GaussCurvature => self.vertex_normal_gauss_curvature(v),
        }
    }

    /// Sum of the adjacent face normals.
    pub fn vertex_normal_equally_weighted(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for f in self.mesh.vertex(v).adjacent_faces(true) {
            n += self.face_normal(f?)?;
        }
        Ok(unit_or_degenerate(v, NormalMethod::EquallyWeighted, n))
    }

    /// Sum of the adjacent face normals weighted by face area.
    pub fn vertex_normal_area_weighted(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for f in self.mesh.vertex(v).adjacent_faces(true) {
            let f = f?;
            n += self.face_normal(f)? * self.area(f)?;
        }
        Ok(unit_or_degenerate(v, NormalMethod::AreaWeighted, n))
    }

    /// Sum of the adjacent face normals weighted by the corner angle at the vertex.
    pub fn vertex_normal_angle_weighted(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for c in self.mesh.vertex(v).adjacent_corners(true) {
            let c = c?;
            let face = self.mesh.corner_face(c)?;
            n += self.face_normal(face)? * self.angle(c)?;
        }
        Ok(unit_or_degenerate(v, NormalMethod::AngleWeighted, n))
    }

    /// Sum over corners of the cross products of the two corner edges,
    /// each divided by both squared edge lengths.
    pub fn vertex_normal_sphere_inscribed(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for c in self.mesh.vertex(v).adjacent_corners(true) {
            let h = self.mesh.corner_halfedge(c?)?;
            let a = self.vector(self.mesh.prev(h)?)?;
            let b = -self.vector(self.mesh.next(h)?)?;
            n += a.cross(&b) / (a.norm_squared() * b.norm_squared());
        }
        Ok(unit_or_degenerate(v, NormalMethod::SphereInscribed, n))
    }

    /// Edge vectors weighted by the cotangents of their opposite angles.
    pub fn vertex_normal_mean_curvature(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for h in self.mesh.vertex(v).adjacent_halfedges(true) {
            let h = h?;
            let weight = 0.5 * (self.cotan(h)? + self.cotan(self.mesh.twin(h)?)?);
            n -= self.vector(h)? * weight;
        }
        Ok(unit_or_degenerate(v, NormalMethod::MeanCurvature, n))
    }

    /// Edge directions weighted by their dihedral angles.
    pub fn vertex_normal_gauss_curvature(&self, v: VertexId) -> Result<Vec3> {
        let mut n = Vec3::zeros();
        for h in self.mesh.vertex(v).adjacent_halfedges(true) {
            let h = h?;
            let weight = 0.5 * self.dihedral_angle(h)? / self.length(self.mesh.halfedge_edge(h)?)?;
            n -= self.vector(h)? * weight;
        }
        Ok(unit_or_degenerate(v, NormalMethod::GaussCurvature, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::*;
    use approx::{abs_diff_eq, relative_eq};

    #[test]
    fn method_names_round_trip() {
        for method in NormalMethod::ALL {
            assert_eq!(method.to_string().parse::<NormalMethod>(), Ok(method));
        }
        assert_eq!(
            "area weighted".parse::<NormalMethod>(),
            Ok(NormalMethod::AreaWeighted)
        );
        assert_eq!(
            "Area Weighted".parse::<NormalMethod>(),
            Err(UnknownNormalMethod("Area Weighted".to_string()))
        );
    }

    #[test]
    fn octahedron_normals_point_along_the_axes() {
        let (mesh, positions) = octahedron();
        let geom = Geometry::new(&mesh, positions.clone()).unwrap();
        for v in mesh.vertex_ids() {
            let outward = positions[v.index()];
            for method in NormalMethod::ALL {
                let n = geom.vertex_normal(v, method).unwrap();
                assert!(
                    relative_eq!(n, outward, epsilon = 1e-12),
                    "{method} normal at {v} was {n:?}"
                );
            }
        }
    }

    #[test]
    fn closed_surface_normals_point_outward() {
        let (mesh, positions) = tetrahedron();
        let geom = Geometry::new(&mesh, positions).unwrap();
        for v in mesh.vertex_ids() {
            let p = geom.position(v);
            for method in NormalMethod::ALL {
                let n = geom.vertex_normal(v, method).unwrap();
                assert!(relative_eq!(n.norm(), 1.0, epsilon = 1e-12));
                assert!(n.dot(&p) > 0.0, "{method} normal at {v} points inward");
            }
        }
    }

    #[test]
    fn flat_vertices_have_vertical_normals() {
        let (mesh, positions) = hexagon_fan();
        let geom = Geometry::new(&mesh, positions).unwrap();
        let center = VertexId(0);
        let up = Vec3::new(0.0, 0.0, 1.0);
        for method in [
            NormalMethod::EquallyWeighted,
            NormalMethod::AreaWeighted,
            NormalMethod::AngleWeighted,
            NormalMethod::SphereInscribed,
        ] {
            let n = geom.vertex_normal(center, method).unwrap();
            assert!(relative_eq!(n, up, epsilon = 1e-12));
        }

        // no dihedral angles anywhere, so the curvature normal vanishes
        let n = geom.vertex_normal(center, NormalMethod::GaussCurvature).unwrap();
        assert!(n.iter().all(|x| x.is_finite()));
        assert!(abs_diff_eq!(n.norm(), 0.0));
    }
}
