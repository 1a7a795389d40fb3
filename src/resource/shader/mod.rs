use anyhow::Result;

pub mod file;
pub mod template;

/// SPIR-V words of one shader, plus the WGSL it was compiled from when the
/// device should build its module from source instead.
pub struct ShaderBinary {
    pub words: Vec<u32>,
    pub wgsl_source: Option<String>,
}

pub trait ShaderBinaryLoader {
    fn load_shader_binary(&self, name: &str) -> Result<ShaderBinary>;
}
