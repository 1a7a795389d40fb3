use std::num::NonZeroU32;

use anyhow::Result;

use crate::geometry::Mesh;
use crate::render::mode::RenderMode;
use crate::render::RenderSystem;
use crate::resource::shader::ShaderBinaryLoader;

pub struct ViewSystem {
    pub window: std::sync::Arc<winit::window::Window>,
    pub render_system: RenderSystem,
    triangle_count: usize,
    meshlet_count: usize,
}

impl ViewSystem {
    pub async fn from_window(
        window: winit::window::Window,
        mesh: &Mesh,
        shader_loader: &dyn ShaderBinaryLoader,
        meshlet_group_size: NonZeroU32,
    ) -> Result<Self> {
        let window = std::sync::Arc::new(window);

        let render_system =
            RenderSystem::from_window(window.clone(), mesh, shader_loader, meshlet_group_size)
                .await?;

        Ok(Self {
            window,
            render_system,
            triangle_count: mesh.triangle_count(),
            meshlet_count: mesh.meshlets.len(),
        })
    }

    pub fn update_view(&mut self, mode: RenderMode) -> Result<()> {
        let frame_start = std::time::Instant::now();

        let frame_timing = self.render_system.render(mode)?;

        let statistics = FrameStatistics {
            cpu_time_ms: frame_start.elapsed().as_secs_f64() * 1000.0,
            gpu_time_ms: frame_timing.gpu_time_ms,
            triangle_count: self.triangle_count,
            meshlet_count: self.meshlet_count,
            mode,
        };

        self.window.set_title(&statistics.to_string());

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStatistics {
    pub cpu_time_ms: f64,
    pub gpu_time_ms: Option<f64>,
    pub triangle_count: usize,
    pub meshlet_count: usize,
    pub mode: RenderMode,
}

impl std::fmt::Display for FrameStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cpu {:.1} ms; gpu ", self.cpu_time_ms)?;

        match self.gpu_time_ms {
            Some(gpu_time_ms) => write!(f, "{gpu_time_ms:.3} ms")?,
            None => write!(f, "n/a")?,
        }

        write!(
            f,
            "; triangles {}; meshlets {}; mode {}",
            self.triangle_count, self.meshlet_count, self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_reports_frame_statistics() {
        let statistics = FrameStatistics {
            cpu_time_ms: 1.24,
            gpu_time_ms: Some(0.5),
            triangle_count: 12,
            meshlet_count: 32,
            mode: RenderMode::Meshlet,
        };

        assert_eq!(
            statistics.to_string(),
            "cpu 1.2 ms; gpu 0.500 ms; triangles 12; meshlets 32; mode meshlet"
        );
    }

    #[test]
    fn missing_gpu_time_is_not_available() {
        let statistics = FrameStatistics {
            cpu_time_ms: 16.0,
            gpu_time_ms: None,
            triangle_count: 0,
            meshlet_count: 0,
            mode: RenderMode::Indexed,
        };

        assert_eq!(
            statistics.to_string(),
            "cpu 16.0 ms; gpu n/a; triangles 0; meshlets 0; mode indexed"
        );
    }
}
