use anyhow::Result;

use crate::resource::obj::{load_options, ObjAsset};

/// OBJ asset parsed from in-memory text. Material libraries are never resolved.
pub struct SourceObjAsset {
    models: Vec<tobj::Model>,
    name: String,
}

impl SourceObjAsset {
    pub fn from_source(name: &str, source: &str) -> Result<Self> {
        let mut reader = std::io::BufReader::new(source.as_bytes());

        let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })?;

        Ok(Self {
            models,
            name: String::from(name),
        })
    }
}

impl ObjAsset for SourceObjAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[tobj::Model] {
        &self.models
    }
}
