//! Per-vertex and per-face arrays for a renderer's attribute buffers.
//!
//! Everything here is indexed like the mesh vertices (or faces)
//! and flattened to the `f32`/`u32` layouts GPU buffers expect.
//! No rendering API is touched.

use std::f64::consts::PI;

use enterpolation::{linear::ConstEquidistantLinear, Curve, Generator};
use palette::LinSrgb;

use crate::{
    error::{Error, Result},
    geometry::{Geometry, NormalMethod},
    mesh::{Mesh, VertexId},
};

/// Largest magnitude distinguished by [`color_map_scalars`];
/// values beyond it saturate.
pub const SCALAR_COLOR_RANGE: f64 = PI / 8.0;

/// Scalar quantities that can be plotted per vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexScalar {
    /// Angle defect.
    GaussCurvature,
    /// Integrated mean curvature.
    MeanCurvature,
    /// Minimum principal curvature, integrated over the barycentric dual cell.
    MinPrincipal,
    /// Maximum principal curvature, integrated over the barycentric dual cell.
    MaxPrincipal,
    /// Area of the barycentric dual cell.
    BarycentricDualArea,
    /// Area of the circumcentric dual cell.
    CircumcentricDualArea,
}

impl VertexScalar {
    /// Evaluate the quantity at a vertex.
    pub fn eval(self, geometry: &Geometry, v: VertexId) -> Result<f64> {
        match self {
            Self::GaussCurvature => geometry.scalar_gauss_curvature(v),
            Self::MeanCurvature => geometry.scalar_mean_curvature(v),
            Self::MinPrincipal => {
                Ok(geometry.principal_curvatures(v)?[0] * geometry.barycentric_dual_area(v)?)
            }
            Self::MaxPrincipal => {
                Ok(geometry.principal_curvatures(v)?[1] * geometry.barycentric_dual_area(v)?)
            }
            Self::BarycentricDualArea => geometry.barycentric_dual_area(v),
            Self::CircumcentricDualArea => geometry.circumcentric_dual_area(v),
        }
    }
}

/// Vertex positions in single precision.
pub fn vertex_positions(geometry: &Geometry) -> Vec<[f32; 3]> {
    geometry.positions().iter().map(|p| to_f32(*p)).collect()
}

/// Vertex normals computed with the given method, in single precision.
pub fn vertex_normals(geometry: &Geometry, method: NormalMethod) -> Result<Vec<[f32; 3]>> {
    geometry
        .mesh()
        .vertex_ids()
        .map(|v| Ok(to_f32(geometry.vertex_normal(v, method)?)))
        .collect()
}

/// A scalar quantity at every vertex.
pub fn vertex_scalars(geometry: &Geometry, scalar: VertexScalar) -> Result<Vec<f64>> {
    geometry
        .mesh()
        .vertex_ids()
        .map(|v| scalar.eval(geometry, v))
        .collect()
}

/// Triangle indices of every face, three per face.
///
/// Faces with more than three sides are split into a fan
/// around their first vertex.
pub fn face_indices(mesh: &Mesh) -> Result<Vec<u32>> {
    let mut indices = Vec::with_capacity(3 * mesh.num_faces());
    for f in mesh.faces() {
        let vertices = f
            .adjacent_vertices(true)
            .map(|v| buffer_index(v?))
            .collect::<Result<Vec<u32>>>()?;
        if let [first, rest @ ..] = vertices.as_slice() {
            for pair in rest.windows(2) {
                indices.extend([*first, pair[0], pair[1]]);
            }
        }
    }
    Ok(indices)
}

fn buffer_index(v: VertexId) -> Result<u32> {
    u32::try_from(v.index()).map_err(|_| Error::IndexOverflow { index: v.index() })
}

/// Map vectors to colors channel by channel.
///
/// All components of all vectors share one range, from the smallest to the largest,
/// and each channel is the component's position in that range, doubled.
pub fn color_map_vectors(vectors: &[[f64; 3]]) -> Vec<[f32; 3]> {
    let (min, max) = vectors
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let range = max - min;
    vectors
        .iter()
        .map(|vector| {
            vector.map(|x| {
                let t = if range > 0.0 { (x - min) / range } else { 0.0 };
                (t * 2.0) as f32
            })
        })
        .collect()
}

/// The diverging blue-white-red ramp as a curve over `[0, 1]`,
/// through evenly spaced colors interpolated in linear RGB.
fn seismic() -> impl Curve<f32, Output = LinSrgb> {
    ConstEquidistantLinear::<f32, _, 5>::equidistant_unchecked([
        LinSrgb::new(0.0, 0.0, 0.3),
        LinSrgb::new(0.0, 0.0, 1.0),
        LinSrgb::new(1.0, 1.0, 1.0),
        LinSrgb::new(1.0, 0.0, 0.0),
        LinSrgb::new(0.5, 0.0, 0.0),
    ])
}

/// Map scalars to colors on a diverging blue-to-red ramp.
///
/// The ramp is symmetric about zero, which maps to white,
/// and spans the largest magnitude among the values,
/// capped at [`SCALAR_COLOR_RANGE`].
pub fn color_map_scalars(values: &[f64]) -> Vec<[f32; 3]> {
    let max = values
        .iter()
        .fold(0.0f64, |m, x| m.max(x.abs()))
        .min(SCALAR_COLOR_RANGE);
    let ramp = seismic();
    values
        .iter()
        .map(|&x| {
            let t = if max > 0.0 {
                ((x + max) / (2.0 * max)).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let color = ramp.gen(t as f32);
            [color.red, color.green, color.blue]
        })
        .collect()
}

#[inline]
fn to_f32(v: crate::Vec3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}
