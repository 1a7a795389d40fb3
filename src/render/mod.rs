use std::num::NonZeroU32;

use anyhow::Result;

use crate::error::Error;
use crate::geometry::Mesh;
use crate::render::indexed::IndexedMeshRenderer;
use crate::render::mesh::MeshBuffers;
use crate::render::meshlet::{MeshletRenderer, MeshletShaders};
use crate::render::mode::RenderMode;
use crate::render::shader::Shader;
use crate::render::state::RenderSystemState;
use crate::render::timer::GpuTimer;
use crate::resource::shader::ShaderBinaryLoader;
use crate::spirv::ShaderStage;

mod buffer;
mod descriptor;
mod indexed;
mod mesh;
mod meshlet;
pub mod mode;
mod pipeline;
mod shader;
mod state;
mod texture;
mod timer;

const MESH_VERTEX_SHADER: &str = "mesh.vert";
const MESH_FRAGMENT_SHADER: &str = "mesh.frag";
const MESHLET_TASK_SHADER: &str = "meshlet.task";
const MESHLET_MESH_SHADER: &str = "meshlet.mesh";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTiming {
    pub gpu_time_ms: Option<f64>,
}

pub struct RenderSystem {
    state: RenderSystemState,
    #[allow(dead_code)]
    shaders: Vec<Shader>,
    mesh_buffers: MeshBuffers,
    indexed_renderer: IndexedMeshRenderer,
    meshlet_renderer: Option<MeshletRenderer>,
    gpu_timer: Option<GpuTimer>,
}

impl RenderSystem {
    pub async fn from_window(
        window: std::sync::Arc<winit::window::Window>,
        mesh: &Mesh,
        shader_loader: &dyn ShaderBinaryLoader,
        meshlet_group_size: NonZeroU32,
    ) -> Result<Self> {
        let state = RenderSystemState::from_window(window).await?;
        let format = state.surface_config.format;

        let mesh_vertex_shader = Shader::load(
            MESH_VERTEX_SHADER,
            ShaderStage::Vertex,
            &state.device,
            shader_loader,
        )?;
        let mesh_fragment_shader = Shader::load(
            MESH_FRAGMENT_SHADER,
            ShaderStage::Fragment,
            &state.device,
            shader_loader,
        )?;

        let mesh_buffers = MeshBuffers::from_mesh(mesh, &state.device, &state.queue);

        let indexed_renderer = IndexedMeshRenderer::from_shaders(
            &state.device,
            &mesh_vertex_shader,
            &mesh_fragment_shader,
            format,
        )?;

        let mut shaders = vec![mesh_vertex_shader, mesh_fragment_shader];

        let meshlet_renderer = if state.capabilities.meshlets {
            let task_shader = Shader::load(
                MESHLET_TASK_SHADER,
                ShaderStage::Compute,
                &state.device,
                shader_loader,
            )?;
            let mesh_shader = Shader::load(
                MESHLET_MESH_SHADER,
                ShaderStage::Vertex,
                &state.device,
                shader_loader,
            )?;

            let meshlet_renderer = MeshletRenderer::from_meshlets(
                &state.device,
                &state.queue,
                &mesh.meshlets,
                meshlet_group_size,
                MeshletShaders {
                    task: &task_shader,
                    mesh: &mesh_shader,
                    fragment: &shaders[1],
                },
                format,
            )?;

            shaders.push(task_shader);
            shaders.push(mesh_shader);

            Some(meshlet_renderer)
        } else {
            log::info!("Meshlet rendering is unavailable: the adapter lacks compute or indirect draws");
            None
        };

        let gpu_timer = state.create_gpu_timer();

        Ok(Self {
            state,
            shaders,
            mesh_buffers,
            indexed_renderer,
            meshlet_renderer,
            gpu_timer,
        })
    }

    pub fn supports_meshlets(&self) -> bool {
        self.meshlet_renderer.is_some()
    }

    pub fn sync_view_dimensions(&mut self) {
        self.set_view_dimensions(self.state.view_dimensions);
    }

    pub fn set_view_dimensions(&mut self, view_dimensions: winit::dpi::PhysicalSize<u32>) {
        if view_dimensions.width == 0 || view_dimensions.height == 0 {
            return;
        }

        self.state.set_view_dimensions(view_dimensions);
    }

    /// Records, submits and waits for one frame of `mode`.
    pub fn render(&mut self, mode: RenderMode) -> Result<FrameTiming> {
        let output = self.state.surface.get_current_texture()?;

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.state
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("RENDER_SYSTEM_COMMAND_ENCODER"),
                });

        match mode {
            RenderMode::Indexed => self.indexed_renderer.encode(
                &self.state,
                &self.mesh_buffers,
                &mut encoder,
                &view,
                self.gpu_timer.as_ref(),
            )?,
            RenderMode::Meshlet => match &self.meshlet_renderer {
                Some(meshlet_renderer) => meshlet_renderer.encode(
                    &self.state,
                    &self.mesh_buffers,
                    &mut encoder,
                    &view,
                    self.gpu_timer.as_ref(),
                )?,
                None => {
                    return Err(Error::new(
                        "Meshlet rendering was requested but is not supported by the adapter",
                    )
                    .into())
                }
            },
        }

        if let Some(gpu_timer) = &self.gpu_timer {
            gpu_timer.resolve(&mut encoder);
        }

        self.state.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.state.wait_idle();

        let gpu_time_ms = match &self.gpu_timer {
            Some(gpu_timer) => Some(gpu_timer.read_elapsed_ms(&self.state.device)?),
            None => None,
        };

        Ok(FrameTiming { gpu_time_ms })
    }

    pub fn wait_idle(&self) {
        self.state.wait_idle();
    }
}
