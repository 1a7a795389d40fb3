use anyhow::Result;

use crate::render::descriptor::DescriptorInfo;
use crate::render::mesh::MeshBuffers;
use crate::render::pipeline::RenderPipeline;
use crate::render::shader::Shader;
use crate::render::state::RenderSystemState;
use crate::render::timer::{GpuTimer, PassTimestamps};

/// Classic path: one indexed draw pulling vertices from a storage buffer.
pub struct IndexedMeshRenderer {
    pipeline: RenderPipeline,
}

impl IndexedMeshRenderer {
    pub fn from_shaders(
        device: &wgpu::Device,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        Ok(Self {
            pipeline: RenderPipeline::from_shaders(
                "INDEXED_MESH",
                device,
                vertex_shader,
                fragment_shader,
                format,
            )?,
        })
    }

    pub fn encode(
        &self,
        state: &RenderSystemState,
        mesh_buffers: &MeshBuffers,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        gpu_timer: Option<&GpuTimer>,
    ) -> Result<()> {
        let bind_group = self.pipeline.bindings.create_bind_group(
            &state.device,
            &[DescriptorInfo::buffer(&mesh_buffers.vertex_buffer.gpu_buffer)],
        )?;

        let mut render_pass = state.begin_render_pass(
            "INDEXED_MESH_RENDER_PASS",
            encoder,
            color_view,
            gpu_timer.map(|gpu_timer| gpu_timer.render_pass_writes(PassTimestamps::WholeFrame)),
        );

        render_pass.set_pipeline(&self.pipeline.gpu_pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.set_index_buffer(
            mesh_buffers.index_buffer.gpu_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        render_pass.draw_indexed(0..mesh_buffers.index_count, 0, 0..1);

        Ok(())
    }
}
