use anyhow::Result;

use crate::error::Error;
use crate::resource::shader::ShaderBinaryLoader;
use crate::spirv::{ShaderReflection, ShaderStage};

pub struct Shader {
    pub name: String,
    pub module: wgpu::ShaderModule,
    pub reflection: ShaderReflection,
}

impl Shader {
    /// Loads and reflects a shader, failing when it does not declare `expected_stage`.
    pub fn load(
        name: &str,
        expected_stage: ShaderStage,
        device: &wgpu::Device,
        loader: &dyn ShaderBinaryLoader,
    ) -> Result<Self> {
        let binary = loader.load_shader_binary(name)?;
        let reflection = ShaderReflection::from_words(&binary.words)?;

        if reflection.stage != expected_stage {
            return Err(Error::new(format!(
                "Shader {name} declares a {:?} entry point but is used as a {expected_stage:?} shader",
                reflection.stage
            ))
            .into());
        }

        let source = match binary.wgsl_source {
            Some(source) => wgpu::ShaderSource::Wgsl(source.into()),
            None => wgpu::ShaderSource::SpirV(binary.words.into()),
        };

        log::debug!("Creating shader module {name}: {reflection:?}");

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_SHADER_MODULE", name.to_uppercase())),
            source,
        });

        Ok(Self {
            name: String::from(name),
            module,
            reflection,
        })
    }
}

pub fn shader_stages(stage: ShaderStage) -> Result<wgpu::ShaderStages> {
    match stage {
        ShaderStage::Vertex => Ok(wgpu::ShaderStages::VERTEX),
        ShaderStage::Fragment => Ok(wgpu::ShaderStages::FRAGMENT),
        ShaderStage::Compute => Ok(wgpu::ShaderStages::COMPUTE),
        ShaderStage::Task | ShaderStage::Mesh => Err(Error::new(format!(
            "{stage:?} shaders are not supported by the wgpu backend"
        ))
        .into()),
    }
}
