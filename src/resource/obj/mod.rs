pub mod file;
pub mod source;

pub trait ObjAsset {
    fn name(&self) -> &str;
    fn models(&self) -> &[tobj::Model];
}

pub fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}
