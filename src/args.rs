use std::num::NonZeroU32;
use std::path::PathBuf;

pub use crate::render::mode::RenderMode;

pub struct Args {
    pub mesh: PathBuf,
    pub meshlet_group_size: NonZeroU32,
    pub spirv_dir: Option<PathBuf>,
    pub initial_mode: Option<RenderMode>,
}
