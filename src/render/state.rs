use anyhow::Result;

use crate::error::Error;
use crate::render::texture::DepthTexture2DPackage;
use crate::render::timer::GpuTimer;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 48.0 / 255.0,
    g: 10.0 / 255.0,
    b: 36.0 / 255.0,
    a: 1.0,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdapterCandidate {
    pub device_type: wgpu::DeviceType,
    pub supports_surface: bool,
}

/// Prefers a discrete GPU among the adapters that can present to the surface.
pub fn pick_adapter(candidates: &[AdapterCandidate]) -> Option<usize> {
    let presentable = || {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.supports_surface)
    };

    presentable()
        .find(|(_, candidate)| candidate.device_type == wgpu::DeviceType::DiscreteGpu)
        .or_else(|| presentable().next())
        .map(|(index, _)| index)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderCapabilities {
    pub meshlets: bool,
    pub timestamps: bool,
}

impl RenderCapabilities {
    fn from_adapter(adapter: &wgpu::Adapter) -> Result<Self> {
        let downlevel_flags = adapter.get_downlevel_capabilities().flags;

        if !downlevel_flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
            return Err(
                Error::new("The adapter cannot read storage buffers from vertex shaders").into(),
            );
        }

        Ok(Self {
            meshlets: downlevel_flags.contains(
                wgpu::DownlevelFlags::COMPUTE_SHADERS | wgpu::DownlevelFlags::INDIRECT_EXECUTION,
            ),
            timestamps: adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY),
        })
    }
}

pub struct RenderSystemState {
    #[allow(dead_code)]
    pub instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    #[allow(dead_code)]
    pub adapter: wgpu::Adapter,
    pub device: std::rc::Rc<wgpu::Device>,
    pub queue: std::rc::Rc<wgpu::Queue>,
    pub depth_texture: DepthTexture2DPackage,
    pub capabilities: RenderCapabilities,
    pub view_dimensions: winit::dpi::PhysicalSize<u32>,
}

impl RenderSystemState {
    pub async fn from_window(window: std::sync::Arc<winit::window::Window>) -> Result<Self> {
        let view_dimensions = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;
        let adapter = RenderSystemState::select_adapter(&instance, &surface)?;
        let capabilities = RenderCapabilities::from_adapter(&adapter)?;

        log::info!("Render capabilities: {capabilities:?}");

        let required_features = if capabilities.timestamps {
            wgpu::Features::TIMESTAMP_QUERY
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    label: Some("RENDER_SYSTEM_DEVICE"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let device = std::rc::Rc::new(device);
        let queue = std::rc::Rc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);

        let surface_format = match surface_caps.formats.iter().find(|f| f.is_srgb()) {
            Some(format) => *format,
            None => match surface_caps.formats.first() {
                Some(format) => *format,
                None => {
                    return Err(
                        Error::new("The surface reports no supported texture formats").into(),
                    )
                }
            },
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: view_dimensions.width.max(1),
            height: view_dimensions.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let depth_texture = DepthTexture2DPackage::from_device(&device, view_dimensions);

        Ok(Self {
            instance,
            surface,
            surface_config,
            adapter,
            device,
            queue,
            depth_texture,
            capabilities,
            view_dimensions,
        })
    }

    fn select_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface) -> Result<wgpu::Adapter> {
        let adapters = instance.enumerate_adapters(wgpu::Backends::PRIMARY);

        let candidates: Vec<AdapterCandidate> = adapters
            .iter()
            .map(|adapter| AdapterCandidate {
                device_type: adapter.get_info().device_type,
                supports_surface: adapter.is_surface_supported(surface),
            })
            .collect();

        let adapter = match pick_adapter(&candidates).and_then(|index| adapters.into_iter().nth(index)) {
            Some(adapter) => adapter,
            None => {
                return Err(
                    Error::new("No adapter can present to the window surface.").into(),
                )
            }
        };

        let info = adapter.get_info();
        log::info!(
            "Selected adapter {} ({:?}, {:?})",
            info.name,
            info.device_type,
            info.backend
        );

        Ok(adapter)
    }

    pub fn set_view_dimensions(&mut self, view_dimensions: winit::dpi::PhysicalSize<u32>) {
        self.view_dimensions = view_dimensions;
        self.surface_config.width = view_dimensions.width;
        self.surface_config.height = view_dimensions.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = DepthTexture2DPackage::from_device(&self.device, view_dimensions);
    }

    /// Begins a cleared color and depth pass with the viewport and scissor
    /// covering the whole surface.
    pub fn begin_render_pass<'encoder>(
        &self,
        label: &str,
        encoder: &'encoder mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        timestamp_writes: Option<wgpu::RenderPassTimestampWrites<'_>>,
    ) -> wgpu::RenderPass<'encoder> {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.gpu_texture_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes,
        });

        let width = self.surface_config.width;
        let height = self.surface_config.height;
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        render_pass.set_scissor_rect(0, 0, width, height);

        render_pass
    }

    pub fn create_gpu_timer(&self) -> Option<GpuTimer> {
        self.capabilities
            .timestamps
            .then(|| GpuTimer::from_device(&self.device, &self.queue))
    }

    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(device_type: wgpu::DeviceType, supports_surface: bool) -> AdapterCandidate {
        AdapterCandidate {
            device_type,
            supports_surface,
        }
    }

    #[test]
    fn discrete_gpu_is_preferred() {
        let candidates = [
            candidate(wgpu::DeviceType::IntegratedGpu, true),
            candidate(wgpu::DeviceType::DiscreteGpu, true),
        ];

        assert_eq!(pick_adapter(&candidates), Some(1));
    }

    #[test]
    fn adapters_that_cannot_present_are_skipped() {
        let candidates = [
            candidate(wgpu::DeviceType::DiscreteGpu, false),
            candidate(wgpu::DeviceType::Cpu, false),
            candidate(wgpu::DeviceType::IntegratedGpu, true),
        ];

        assert_eq!(pick_adapter(&candidates), Some(2));
    }

    #[test]
    fn first_presentable_adapter_is_the_fallback() {
        let candidates = [
            candidate(wgpu::DeviceType::VirtualGpu, true),
            candidate(wgpu::DeviceType::IntegratedGpu, true),
        ];

        assert_eq!(pick_adapter(&candidates), Some(0));
        assert_eq!(pick_adapter(&[]), None);
    }
}
