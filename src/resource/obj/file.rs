use std::path::Path;

use anyhow::Result;

use crate::resource::obj::{load_options, ObjAsset};

pub struct FileSystemObjAsset {
    models: Vec<tobj::Model>,
    name: String,
}

impl FileSystemObjAsset {
    pub fn from_path(obj_path: &Path) -> Result<Self> {
        let absolute_path = obj_path.canonicalize()?;

        if !absolute_path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("The given path is not a file: {}", obj_path.display()),
            )
            .into());
        }

        // Materials are not rendered, so a missing .mtl file is not an error.
        let (models, _materials) = tobj::load_obj(&absolute_path, &load_options())?;

        Ok(Self {
            models,
            name: obj_path.display().to_string(),
        })
    }
}

impl ObjAsset for FileSystemObjAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[tobj::Model] {
        &self.models
    }
}
