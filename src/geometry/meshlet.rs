use std::num::NonZeroU32;

use crate::geometry::Mesh;

pub const MAX_MESHLET_VERTICES: usize = 64;
pub const MAX_MESHLET_TRIANGLES: usize = 126;

pub const DEFAULT_MESHLET_GROUP_SIZE: NonZeroU32 = match NonZeroU32::new(32) {
    Some(group_size) => group_size,
    None => panic!("meshlet group size must be non-zero"),
};

const UNUSED_LOCAL_SLOT: u8 = 0xff;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum MeshletError {
    #[error("index buffer length {0} is not a multiple of 3")]
    IncompleteTriangle(usize),
    #[error("index {index} references a vertex outside the {vertex_count} vertices of the mesh")]
    VertexOutOfRange { index: u32, vertex_count: usize },
    #[error("vertex {vertex} has a non-finite position")]
    NonFinitePosition { vertex: u32 },
}

/// GPU-visible cluster of at most 64 vertices and 126 triangles.
///
/// The layout is shared with the `Meshlet` struct in `shaders/common/meshlet.wgsl`:
/// the two count bytes land in the upper half of the last packed index word.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Meshlet {
    pub cone: [f32; 4],
    pub vertices: [u32; MAX_MESHLET_VERTICES],
    pub indices: [u8; MAX_MESHLET_TRIANGLES * 3],
    pub triangle_count: u8,
    pub vertex_count: u8,
    _padding: [u8; 4],
}

impl Default for Meshlet {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl Meshlet {
    pub fn is_empty(&self) -> bool {
        self.triangle_count == 0
    }

    pub fn global_vertices(&self) -> &[u32] {
        &self.vertices[..usize::from(self.vertex_count)]
    }

    pub fn local_triangles(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.indices[..usize::from(self.triangle_count) * 3]
            .chunks_exact(3)
            .map(|corners| [corners[0], corners[1], corners[2]])
    }

    /// Local triangles resolved back to indices into the mesh vertex buffer.
    pub fn global_triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.local_triangles()
            .map(|triangle| triangle.map(|corner| self.vertices[usize::from(corner)]))
    }

    fn push_triangle(&mut self, corners: [u8; 3]) {
        let offset = usize::from(self.triangle_count) * 3;
        self.indices[offset..offset + 3].copy_from_slice(&corners);
        self.triangle_count += 1;
    }
}

/// Partitions the mesh triangles into meshlets, replacing any existing ones.
///
/// Triangles are consumed in index buffer order and a meshlet is closed as
/// soon as the next triangle would overflow either limit. The result is padded
/// with empty meshlets up to a multiple of `group_size`. Returns the number of
/// non-empty meshlets.
pub fn build_meshlets(mesh: &mut Mesh, group_size: NonZeroU32) -> Result<usize, MeshletError> {
    if mesh.indices.len() % 3 != 0 {
        return Err(MeshletError::IncompleteTriangle(mesh.indices.len()));
    }

    let vertex_count = mesh.vertices.len();

    if let Some(&index) = mesh
        .indices
        .iter()
        .find(|&&index| index as usize >= vertex_count)
    {
        return Err(MeshletError::VertexOutOfRange {
            index,
            vertex_count,
        });
    }

    let mut meshlets = Vec::new();
    let mut meshlet = Meshlet::default();
    let mut local_slots = vec![UNUSED_LOCAL_SLOT; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let missing = triangle
            .iter()
            .enumerate()
            .filter(|&(corner, &vertex)| {
                local_slots[vertex as usize] == UNUSED_LOCAL_SLOT
                    && !triangle[..corner].contains(&vertex)
            })
            .count();

        if usize::from(meshlet.vertex_count) + missing > MAX_MESHLET_VERTICES
            || usize::from(meshlet.triangle_count) == MAX_MESHLET_TRIANGLES
        {
            for &vertex in meshlet.global_vertices() {
                local_slots[vertex as usize] = UNUSED_LOCAL_SLOT;
            }

            meshlets.push(meshlet);
            meshlet = Meshlet::default();
        }

        let mut corners = [0u8; 3];

        for (corner, &vertex) in corners.iter_mut().zip(triangle) {
            let slot = &mut local_slots[vertex as usize];

            if *slot == UNUSED_LOCAL_SLOT {
                *slot = meshlet.vertex_count;
                meshlet.vertices[usize::from(meshlet.vertex_count)] = vertex;
                meshlet.vertex_count += 1;
            }

            *corner = *slot;
        }

        meshlet.push_triangle(corners);
    }

    if !meshlet.is_empty() {
        meshlets.push(meshlet);
    }

    let filled_count = meshlets.len();
    let group_size = group_size.get() as usize;
    meshlets.resize(filled_count.next_multiple_of(group_size), Meshlet::default());

    mesh.meshlets = meshlets;

    Ok(filled_count)
}
