use anyhow::Result;

use crate::error::Error;
use crate::render::descriptor::{DescriptorInfo, DescriptorUpdateTemplate};
use crate::render::shader::{shader_stages, Shader};
use crate::spirv::{ShaderReflection, ShaderStage, MAX_STORAGE_BUFFER_BINDINGS};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StorageBufferBinding {
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
    pub read_only: bool,
}

/// Storage buffer bindings shared by every shader of one pipeline.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShaderResourceLayout {
    pub storage_buffers: Vec<StorageBufferBinding>,
}

impl ShaderResourceLayout {
    pub fn from_reflections(reflections: &[&ShaderReflection]) -> Result<Self> {
        let mut storage_buffers = Vec::new();

        for binding in 0..MAX_STORAGE_BUFFER_BINDINGS {
            let bit = 1u32 << binding;
            let mut visibility = wgpu::ShaderStages::NONE;
            let mut read_only = true;

            for reflection in reflections
                .iter()
                .filter(|reflection| reflection.storage_buffer_mask & bit != 0)
            {
                visibility |= shader_stages(reflection.stage)?;
                read_only &= reflection.writable_storage_buffer_mask & bit == 0;
            }

            if visibility.is_empty() {
                continue;
            }

            storage_buffers.push(StorageBufferBinding {
                binding,
                visibility,
                read_only,
            });
        }

        Ok(Self { storage_buffers })
    }

    pub fn binding_mask(&self) -> u32 {
        self.storage_buffers
            .iter()
            .fold(0, |mask, storage_buffer| mask | 1 << storage_buffer.binding)
    }

    pub fn bind_group_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.storage_buffers
            .iter()
            .map(|storage_buffer| wgpu::BindGroupLayoutEntry {
                binding: storage_buffer.binding,
                visibility: storage_buffer.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: storage_buffer.read_only,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect()
    }
}

/// Bind group layout and update template derived from a pipeline's shaders.
pub struct PipelineBindings {
    name: String,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub update_template: DescriptorUpdateTemplate,
}

impl PipelineBindings {
    pub fn from_shaders(name: &str, device: &wgpu::Device, shaders: &[&Shader]) -> Result<Self> {
        let reflections: Vec<&ShaderReflection> =
            shaders.iter().map(|shader| &shader.reflection).collect();
        let resource_layout = ShaderResourceLayout::from_reflections(&reflections)?;

        log::debug!("Creating bind group layout {name}: {resource_layout:?}");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{name}_BIND_GROUP_LAYOUT")),
            entries: &resource_layout.bind_group_layout_entries(),
        });

        let update_template = DescriptorUpdateTemplate::from_binding_mask(resource_layout.binding_mask());

        Ok(Self {
            name: String::from(name),
            bind_group_layout,
            update_template,
        })
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        descriptors: &[DescriptorInfo],
    ) -> Result<wgpu::BindGroup> {
        self.update_template.create_bind_group(
            &format!("{}_BIND_GROUP", self.name),
            device,
            &self.bind_group_layout,
            descriptors,
        )
    }

    fn create_pipeline_layout(&self, device: &wgpu::Device) -> wgpu::PipelineLayout {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_PIPELINE_LAYOUT", self.name)),
            bind_group_layouts: &[&self.bind_group_layout],
            push_constant_ranges: &[],
        })
    }
}

fn expect_stage(shader: &Shader, stage: ShaderStage) -> Result<()> {
    if shader.reflection.stage != stage {
        return Err(Error::new(format!(
            "Shader {} is a {:?} shader, expected {stage:?}",
            shader.name, shader.reflection.stage
        ))
        .into());
    }

    Ok(())
}

pub struct RenderPipeline {
    pub bindings: PipelineBindings,
    pub gpu_pipeline: wgpu::RenderPipeline,
}

impl RenderPipeline {
    pub fn from_shaders(
        name: &str,
        device: &wgpu::Device,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        expect_stage(vertex_shader, ShaderStage::Vertex)?;
        expect_stage(fragment_shader, ShaderStage::Fragment)?;

        let bindings = PipelineBindings::from_shaders(name, device, &[vertex_shader, fragment_shader])?;
        let pipeline_layout = bindings.create_pipeline_layout(device);

        let gpu_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{name}_RENDER_PIPELINE")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_shader.module,
                entry_point: &vertex_shader.reflection.entry_point,
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_shader.module,
                entry_point: &fragment_shader.reflection.entry_point,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent::REPLACE,
                        alpha: wgpu::BlendComponent::REPLACE,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Ok(Self {
            bindings,
            gpu_pipeline,
        })
    }
}

pub struct ComputePipeline {
    pub bindings: PipelineBindings,
    pub gpu_pipeline: wgpu::ComputePipeline,
}

impl ComputePipeline {
    pub fn from_shader(name: &str, device: &wgpu::Device, compute_shader: &Shader) -> Result<Self> {
        expect_stage(compute_shader, ShaderStage::Compute)?;

        let bindings = PipelineBindings::from_shaders(name, device, &[compute_shader])?;
        let pipeline_layout = bindings.create_pipeline_layout(device);

        let gpu_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{name}_COMPUTE_PIPELINE")),
            layout: Some(&pipeline_layout),
            module: &compute_shader.module,
            entry_point: &compute_shader.reflection.entry_point,
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            bindings,
            gpu_pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflection(stage: ShaderStage, storage: u32, writable: u32) -> ShaderReflection {
        ShaderReflection {
            stage,
            entry_point: String::from("main"),
            storage_buffer_mask: storage,
            writable_storage_buffer_mask: writable,
        }
    }

    #[test]
    fn layout_merges_visibility_and_access_across_stages() {
        let vertex = reflection(ShaderStage::Vertex, 0b011, 0);
        let fragment = reflection(ShaderStage::Fragment, 0b110, 0b100);

        let layout = ShaderResourceLayout::from_reflections(&[&vertex, &fragment]).unwrap();

        assert_eq!(
            layout.storage_buffers,
            vec![
                StorageBufferBinding {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    read_only: true,
                },
                StorageBufferBinding {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    read_only: true,
                },
                StorageBufferBinding {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    read_only: false,
                },
            ]
        );
        assert_eq!(layout.binding_mask(), 0b111);
    }

    #[test]
    fn any_writer_makes_binding_writable() {
        let reader = reflection(ShaderStage::Compute, 0b1, 0);
        let writer = reflection(ShaderStage::Compute, 0b1, 0b1);

        let layout = ShaderResourceLayout::from_reflections(&[&reader, &writer]).unwrap();

        assert!(!layout.storage_buffers[0].read_only);
    }

    #[test]
    fn layout_entries_follow_bindings() {
        let compute = reflection(ShaderStage::Compute, 0b101, 0b100);
        let layout = ShaderResourceLayout::from_reflections(&[&compute]).unwrap();

        let entries = layout.bind_group_layout_entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].binding, 2);
        assert_eq!(
            entries[1].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            }
        );
    }

    #[test]
    fn mesh_shading_stages_cannot_bind_resources() {
        let task = reflection(ShaderStage::Task, 0b1, 0);

        assert!(ShaderResourceLayout::from_reflections(&[&task]).is_err());
    }

    #[test]
    fn shaders_without_storage_buffers_yield_empty_layout() {
        let fragment = reflection(ShaderStage::Fragment, 0, 0);
        let layout = ShaderResourceLayout::from_reflections(&[&fragment]).unwrap();

        assert!(layout.storage_buffers.is_empty());
        assert_eq!(layout.binding_mask(), 0);
    }
}
