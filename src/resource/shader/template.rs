use anyhow::Result;

use crate::error::Error;
use crate::geometry::meshlet::{MAX_MESHLET_TRIANGLES, MAX_MESHLET_VERTICES};
use crate::resource::shader::{ShaderBinary, ShaderBinaryLoader};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize)]
pub struct ShaderTemplateConfiguration {
    pub max_meshlet_vertices: u32,
    pub max_meshlet_triangles: u32,
    /// Index bytes plus the two count bytes, packed into 32-bit words.
    pub meshlet_index_words: u32,
    pub meshlet_group_size: u32,
}

impl ShaderTemplateConfiguration {
    pub fn new(meshlet_group_size: std::num::NonZeroU32) -> Self {
        Self {
            max_meshlet_vertices: MAX_MESHLET_VERTICES as u32,
            max_meshlet_triangles: MAX_MESHLET_TRIANGLES as u32,
            meshlet_index_words: ((MAX_MESHLET_TRIANGLES * 3 + 2) / 4) as u32,
            meshlet_group_size: meshlet_group_size.get(),
        }
    }
}

/// Renders `<name>.wgsl` templates and compiles them to SPIR-V for reflection.
pub struct WgslTemplateShaderLoader {
    tera: tera::Tera,
    context: tera::Context,
}

impl WgslTemplateShaderLoader {
    pub fn from_directory(glob: &str, config: &ShaderTemplateConfiguration) -> Result<Self> {
        Self::from_tera(tera::Tera::new(glob)?, config)
    }

    pub fn from_tera(tera: tera::Tera, config: &ShaderTemplateConfiguration) -> Result<Self> {
        log::debug!("Creating shader template loader from config: {config:?}");

        Ok(Self {
            tera,
            context: tera::Context::from_serialize(config)?,
        })
    }
}

impl ShaderBinaryLoader for WgslTemplateShaderLoader {
    fn load_shader_binary(&self, name: &str) -> Result<ShaderBinary> {
        let source = self.tera.render(&format!("{name}.wgsl"), &self.context)?;
        let words = compile_wgsl(name, &source)?;

        Ok(ShaderBinary {
            words,
            wgsl_source: Some(source),
        })
    }
}

/// Compiles a single-entry-point WGSL module to SPIR-V words.
pub fn compile_wgsl(name: &str, source: &str) -> Result<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(source).map_err(|error| {
        Error::new(format!(
            "Failed to parse shader {name}:\n{}",
            error.emit_to_string(source)
        ))
    })?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|error| {
        Error::new(format!("Failed to validate shader {name}: {error}"))
    })?;

    let entry_point = match module.entry_points.as_slice() {
        [entry_point] => entry_point,
        entry_points => {
            return Err(Error::new(format!(
                "Shader {name} must declare exactly one entry point, found {}",
                entry_points.len()
            ))
            .into())
        }
    };

    let options = naga::back::spv::Options {
        lang_version: (1, 3),
        ..Default::default()
    };
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: entry_point.stage,
        entry_point: entry_point.name.clone(),
    };

    naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options)).map_err(
        |error| Error::new(format!("Failed to write SPIR-V for shader {name}: {error}")).into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spirv::{ShaderReflection, ShaderStage};

    #[test]
    fn template_variables_reach_the_compiled_shader() {
        let mut tera = tera::Tera::default();
        tera.add_raw_template(
            "sample.task.wgsl",
            "@group(0) @binding(0) var<storage, read_write> counts: array<u32>;\n\
             @compute @workgroup_size({{ meshlet_group_size }})\n\
             fn main(@builtin(global_invocation_id) id: vec3<u32>) {\n\
                 counts[id.x] = {{ max_meshlet_vertices }}u;\n\
             }\n",
        )
        .unwrap();

        let config = ShaderTemplateConfiguration::new(std::num::NonZeroU32::new(16).unwrap());
        let loader = WgslTemplateShaderLoader::from_tera(tera, &config).unwrap();
        let binary = loader.load_shader_binary("sample.task").unwrap();

        let source = binary.wgsl_source.unwrap();
        assert!(source.contains("@workgroup_size(16)"));
        assert!(source.contains("counts[id.x] = 64u;"));

        let reflection = ShaderReflection::from_words(&binary.words).unwrap();
        assert_eq!(reflection.stage, ShaderStage::Compute);
        assert_eq!(reflection.writable_storage_buffer_mask, 1);
    }

    #[test]
    fn meshlet_layout_constants_match_rust_struct() {
        let config = ShaderTemplateConfiguration::new(std::num::NonZeroU32::new(32).unwrap());

        let meshlet_words = 4 + config.max_meshlet_vertices + config.meshlet_index_words + 1;
        assert_eq!(
            meshlet_words as usize * 4,
            std::mem::size_of::<crate::geometry::meshlet::Meshlet>()
        );
    }

    #[test]
    fn invalid_wgsl_reports_shader_name() {
        let error = compile_wgsl("broken.vert", "fn main( {").unwrap_err();

        assert!(error.to_string().contains("broken.vert"));
    }

    #[test]
    fn multiple_entry_points_are_rejected() {
        let source = "@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }\n\
                      @fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }\n";

        assert!(compile_wgsl("pair", source).is_err());
    }
}
