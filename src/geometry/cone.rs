use cgmath::{InnerSpace, Vector3, Zero};

use crate::geometry::meshlet::{Meshlet, MeshletError, MAX_MESHLET_TRIANGLES};
use crate::geometry::vertex::Vertex;
use crate::geometry::Mesh;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshletCone {
    pub axis: Vector3<f32>,
    pub cutoff: f32,
    /// The triangle normals cancel out, so the axis is an arbitrary fallback.
    pub is_degenerate: bool,
}

impl MeshletCone {
    pub fn to_array(&self) -> [f32; 4] {
        [self.axis.x, self.axis.y, self.axis.z, self.cutoff]
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConeBuildSummary {
    pub meshlet_count: usize,
    pub degenerate_count: usize,
}

pub fn compute_meshlet_cone(
    meshlet: &Meshlet,
    vertices: &[Vertex],
) -> Result<MeshletCone, MeshletError> {
    let mut normals = [Vector3::zero(); MAX_MESHLET_TRIANGLES];
    let triangle_count = usize::from(meshlet.triangle_count);

    for (normal, triangle) in normals.iter_mut().zip(meshlet.global_triangles()) {
        let [p0, p1, p2] = [
            decode_position(vertices, triangle[0])?,
            decode_position(vertices, triangle[1])?,
            decode_position(vertices, triangle[2])?,
        ];

        let cross = (p1 - p0).cross(p2 - p0);
        let area = cross.magnitude();
        let inverse_area = if area == 0.0 { 0.0 } else { 1.0 / area };

        *normal = cross * inverse_area;
    }

    let normals = &normals[..triangle_count];
    let sum = normals
        .iter()
        .fold(Vector3::zero(), |sum: Vector3<f32>, normal| sum + *normal);
    let length = sum.magnitude();

    let (axis, is_degenerate) = if length == 0.0 {
        (Vector3::new(1.0, 1.0, 1.0).normalize(), true)
    } else {
        (sum / length, false)
    };

    let min_dot = normals
        .iter()
        .map(|normal| normal.dot(axis))
        .fold(1.0f32, f32::min);

    // Rounding can push min_dot marginally above 1.
    let cutoff = if min_dot <= 0.0 {
        1.0
    } else {
        (1.0 - min_dot * min_dot).max(0.0).sqrt()
    };

    Ok(MeshletCone {
        axis,
        cutoff,
        is_degenerate,
    })
}

/// Fills the cone of every non-empty meshlet of the mesh.
pub fn build_meshlet_cones(mesh: &mut Mesh) -> Result<ConeBuildSummary, MeshletError> {
    let mut summary = ConeBuildSummary::default();

    for meshlet in mesh.meshlets.iter_mut().filter(|meshlet| !meshlet.is_empty()) {
        let cone = compute_meshlet_cone(meshlet, &mesh.vertices)?;

        meshlet.cone = cone.to_array();
        summary.meshlet_count += 1;

        if cone.is_degenerate {
            summary.degenerate_count += 1;
        }
    }

    Ok(summary)
}

fn decode_position(vertices: &[Vertex], vertex: u32) -> Result<Vector3<f32>, MeshletError> {
    let decoded = vertices
        .get(vertex as usize)
        .and_then(|vertex| vertex.decode_position());

    decoded.ok_or(MeshletError::NonFinitePosition { vertex })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::meshlet::{build_meshlets, DEFAULT_MESHLET_GROUP_SIZE};

    fn mesh_from_positions(positions: &[[f32; 3]], indices: Vec<u32>) -> Mesh {
        let vertices = positions
            .iter()
            .map(|&position| Vertex::from_attributes(position, [0.0; 3], [0.0; 2]))
            .collect();

        let mut mesh = Mesh {
            vertices,
            indices,
            meshlets: Vec::new(),
        };
        build_meshlets(&mut mesh, DEFAULT_MESHLET_GROUP_SIZE).unwrap();
        mesh
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_triangle_has_tight_cone() {
        let mut mesh = mesh_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        );

        let summary = build_meshlet_cones(&mut mesh).unwrap();

        assert_eq!(summary.meshlet_count, 1);
        assert_eq!(summary.degenerate_count, 0);
        assert_eq!(mesh.meshlets[0].cone, [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn perpendicular_triangles_share_a_diagonal_axis() {
        let mut mesh = mesh_from_positions(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            // Normals +z and +y.
            vec![0, 1, 2, 0, 3, 1],
        );

        build_meshlet_cones(&mut mesh).unwrap();

        let [x, y, z, cutoff] = mesh.meshlets[0].cone;
        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        assert_close(x, 0.0);
        assert_close(y, diagonal);
        assert_close(z, diagonal);
        assert_close(cutoff, diagonal);
    }

    #[test]
    fn opposing_triangles_fall_back_to_degenerate_cone() {
        let mut mesh = mesh_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2, 0, 2, 1],
        );

        let summary = build_meshlet_cones(&mut mesh).unwrap();

        assert_eq!(summary.degenerate_count, 1);
        let [x, y, z, cutoff] = mesh.meshlets[0].cone;
        let component = 1.0 / 3f32.sqrt();
        assert_close(x, component);
        assert_close(y, component);
        assert_close(z, component);
        assert_eq!(cutoff, 1.0);
    }

    #[test]
    fn zero_area_triangles_never_produce_nan() {
        let mut mesh = mesh_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
            vec![0, 1, 2, 0, 0, 0],
        );

        let summary = build_meshlet_cones(&mut mesh).unwrap();

        assert_eq!(summary.degenerate_count, 1);
        assert!(mesh.meshlets[0].cone.iter().all(|value| value.is_finite()));
        assert_eq!(mesh.meshlets[0].cone[3], 1.0);
    }

    #[test]
    fn padding_meshlets_keep_zero_cone() {
        let mut mesh = mesh_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        );

        let summary = build_meshlet_cones(&mut mesh).unwrap();

        assert_eq!(summary.meshlet_count, 1);
        assert!(mesh.meshlets[1..].iter().all(|m| m.cone == [0.0; 4]));
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let mut mesh = mesh_from_positions(
            &[[0.0, 0.0, 0.0], [1.0e6, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        );

        assert_eq!(
            build_meshlet_cones(&mut mesh),
            Err(MeshletError::NonFinitePosition { vertex: 1 })
        );
    }
}
