use crate::geometry::Mesh;
use crate::render::buffer::DeviceBuffer;

/// Vertex and index buffers of the loaded mesh, shared by both render paths.
pub struct MeshBuffers {
    pub vertex_buffer: DeviceBuffer,
    pub index_buffer: DeviceBuffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn from_mesh(mesh: &Mesh, device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let vertex_buffer = DeviceBuffer::from_data(
            "MESH_VERTEX_BUFFER",
            device,
            queue,
            wgpu::BufferUsages::STORAGE,
            bytemuck::cast_slice(&mesh.vertices),
        );

        let index_buffer = DeviceBuffer::from_data(
            "MESH_INDEX_BUFFER",
            device,
            queue,
            wgpu::BufferUsages::INDEX,
            bytemuck::cast_slice(&mesh.indices),
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}
