use anyhow::Result;

use crate::app::App;
use crate::args::Args;
use crate::resource::obj::file::FileSystemObjAsset;
use crate::resource::shader::file::FileSystemSpirvLoader;
use crate::resource::shader::template::{ShaderTemplateConfiguration, WgslTemplateShaderLoader};
use crate::resource::shader::ShaderBinaryLoader;

mod app;
pub mod args;
mod error;
pub mod geometry;
mod render;
pub mod resource;
pub mod spirv;
mod view;

const SHADER_TEMPLATE_GLOB: &str = "shaders/**/*";

pub fn run(args: Args) -> Result<()> {
    env_logger::init();

    let asset = FileSystemObjAsset::from_path(&args.mesh)?;
    let mesh = geometry::prepare_mesh(&asset, args.meshlet_group_size)?;

    let shader_loader: Box<dyn ShaderBinaryLoader> = match &args.spirv_dir {
        Some(directory) => Box::new(FileSystemSpirvLoader {
            directory: directory.clone(),
        }),
        None => Box::new(WgslTemplateShaderLoader::from_directory(
            SHADER_TEMPLATE_GLOB,
            &ShaderTemplateConfiguration::new(args.meshlet_group_size),
        )?),
    };

    let event_loop = App::create_event_loop()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = App::new(
        &event_loop,
        mesh,
        shader_loader,
        args.meshlet_group_size,
        args.initial_mode,
    );

    event_loop.run_app(&mut app)?;

    app.into_result()
}
