use std::path::PathBuf;

use anyhow::Result;

use crate::resource::shader::{ShaderBinary, ShaderBinaryLoader};
use crate::spirv::reader::words_from_bytes;

/// Loads precompiled `<name>.spv` files from a directory.
pub struct FileSystemSpirvLoader {
    pub directory: PathBuf,
}

impl ShaderBinaryLoader for FileSystemSpirvLoader {
    fn load_shader_binary(&self, name: &str) -> Result<ShaderBinary> {
        let path = self.directory.join(format!("{name}.spv"));

        log::debug!("Loading shader binary {}", path.display());

        let bytes = std::fs::read(&path)?;

        Ok(ShaderBinary {
            words: words_from_bytes(&bytes)?,
            wgsl_source: None,
        })
    }
}
