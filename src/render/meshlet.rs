use std::num::NonZeroU32;

use anyhow::Result;
use wgpu::util::DrawIndirectArgs;

use crate::geometry::meshlet::{Meshlet, MAX_MESHLET_TRIANGLES};
use crate::render::buffer::DeviceBuffer;
use crate::render::descriptor::DescriptorInfo;
use crate::render::mesh::MeshBuffers;
use crate::render::pipeline::{ComputePipeline, RenderPipeline};
use crate::render::shader::Shader;
use crate::render::state::RenderSystemState;
use crate::render::timer::{GpuTimer, PassTimestamps};

pub struct MeshletShaders<'a> {
    pub task: &'a Shader,
    pub mesh: &'a Shader,
    pub fragment: &'a Shader,
}

/// Meshlet path: a compute pass culls meshlets by cone and appends the
/// survivors to an indirect draw, then one instance is drawn per survivor.
pub struct MeshletRenderer {
    task_pipeline: ComputePipeline,
    mesh_pipeline: RenderPipeline,
    meshlet_buffer: DeviceBuffer,
    visible_meshlet_buffer: DeviceBuffer,
    draw_args_buffer: DeviceBuffer,
    workgroup_count: u32,
}

impl MeshletRenderer {
    pub fn from_meshlets(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        meshlets: &[Meshlet],
        group_size: NonZeroU32,
        shaders: MeshletShaders,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let task_pipeline = ComputePipeline::from_shader("MESHLET_TASK", device, shaders.task)?;
        let mesh_pipeline = RenderPipeline::from_shaders(
            "MESHLET_MESH",
            device,
            shaders.mesh,
            shaders.fragment,
            format,
        )?;

        let meshlet_buffer = DeviceBuffer::from_data(
            "MESHLET_BUFFER",
            device,
            queue,
            wgpu::BufferUsages::STORAGE,
            bytemuck::cast_slice(meshlets),
        );

        let visible_meshlet_buffer = DeviceBuffer::zeroed(
            "VISIBLE_MESHLET_BUFFER",
            device,
            wgpu::BufferUsages::STORAGE,
            meshlets.len() * std::mem::size_of::<u32>(),
        );

        let draw_args_buffer = DeviceBuffer::zeroed(
            "MESHLET_DRAW_ARGS_BUFFER",
            device,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            std::mem::size_of::<DrawIndirectArgs>(),
        );

        Ok(Self {
            task_pipeline,
            mesh_pipeline,
            meshlet_buffer,
            visible_meshlet_buffer,
            draw_args_buffer,
            workgroup_count: task_workgroup_count(meshlets.len(), group_size),
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
        state.queue.write_buffer(
            &self.draw_args_buffer.gpu_buffer,
            0,
            meshlet_draw_args().as_bytes(),
        );

        let task_bind_group = self.task_pipeline.bindings.create_bind_group(
            &state.device,
            &[
                DescriptorInfo::buffer(&self.meshlet_buffer.gpu_buffer),
                DescriptorInfo::buffer(&self.draw_args_buffer.gpu_buffer),
                DescriptorInfo::buffer(&self.visible_meshlet_buffer.gpu_buffer),
            ],
        )?;

        let mesh_bind_group = self.mesh_pipeline.bindings.create_bind_group(
            &state.device,
            &[
                DescriptorInfo::buffer(&mesh_buffers.vertex_buffer.gpu_buffer),
                DescriptorInfo::buffer(&self.meshlet_buffer.gpu_buffer),
                DescriptorInfo::buffer(&self.visible_meshlet_buffer.gpu_buffer),
            ],
        )?;

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("MESHLET_TASK_COMPUTE_PASS"),
                timestamp_writes: gpu_timer
                    .map(|gpu_timer| gpu_timer.compute_pass_writes(PassTimestamps::FrameStart)),
            });

            compute_pass.set_pipeline(&self.task_pipeline.gpu_pipeline);
            compute_pass.set_bind_group(0, &task_bind_group, &[]);
            compute_pass.dispatch_workgroups(self.workgroup_count, 1, 1);
        }

        let mut render_pass = state.begin_render_pass(
            "MESHLET_MESH_RENDER_PASS",
            encoder,
            color_view,
            gpu_timer.map(|gpu_timer| gpu_timer.render_pass_writes(PassTimestamps::FrameEnd)),
        );

        render_pass.set_pipeline(&self.mesh_pipeline.gpu_pipeline);
        render_pass.set_bind_group(0, &mesh_bind_group, &[]);
        render_pass.draw_indirect(&self.draw_args_buffer.gpu_buffer, 0);

        Ok(())
    }
}

/// Draw arguments before culling: one triangle-list of the largest meshlet,
/// with the instance count accumulated by the task pass.
fn meshlet_draw_args() -> DrawIndirectArgs {
    DrawIndirectArgs {
        vertex_count: (MAX_MESHLET_TRIANGLES * 3) as u32,
        instance_count: 0,
        first_vertex: 0,
        first_instance: 0,
    }
}

fn task_workgroup_count(meshlet_count: usize, group_size: NonZeroU32) -> u32 {
    (meshlet_count as u32).div_ceil(group_size.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_meshlet_gets_an_invocation() {
        let group_size = NonZeroU32::new(32).unwrap();

        assert_eq!(task_workgroup_count(0, group_size), 0);
        assert_eq!(task_workgroup_count(64, group_size), 2);
        assert_eq!(task_workgroup_count(65, group_size), 3);
    }

    #[test]
    fn draw_covers_every_triangle_slot() {
        let args = meshlet_draw_args();

        assert_eq!(args.vertex_count, 378);
        assert_eq!(args.instance_count, 0);
    }
}
