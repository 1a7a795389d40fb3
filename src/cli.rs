use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use meshlet_viewer::args::RenderMode;
use meshlet_viewer::geometry::meshlet::DEFAULT_MESHLET_GROUP_SIZE;

const MAX_MESHLET_GROUP_SIZE: u32 = 256;

/// Renders a Wavefront OBJ mesh either with indexed draws or as GPU-culled meshlets
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the .obj file of the mesh that will be displayed by the viewer
    pub mesh: PathBuf,

    /// Number of meshlets culled per task workgroup; the meshlet list is padded to a multiple of it
    #[arg(long, default_value_t = DEFAULT_MESHLET_GROUP_SIZE, value_parser = parse_meshlet_group_size)]
    pub meshlet_group_size: NonZeroU32,

    /// Directory with precompiled mesh.vert.spv, mesh.frag.spv, meshlet.task.spv and meshlet.mesh.spv
    #[arg(long)]
    pub spirv_dir: Option<PathBuf>,

    /// Render mode used for the first frame; press R to toggle
    #[arg(long, value_enum)]
    pub mode: Option<CliRenderMode>,
}

fn parse_meshlet_group_size(value: &str) -> Result<NonZeroU32, String> {
    let group_size: u32 = value.parse::<u32>().map_err(|error| error.to_string())?;

    match NonZeroU32::new(group_size) {
        Some(group_size) if group_size.get() <= MAX_MESHLET_GROUP_SIZE => Ok(group_size),
        _ => Err(format!("{group_size} is not in 1..={MAX_MESHLET_GROUP_SIZE}")),
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CliRenderMode {
    Indexed,
    Meshlet,
}

impl From<CliRenderMode> for RenderMode {
    fn from(value: CliRenderMode) -> Self {
        match value {
            CliRenderMode::Indexed => RenderMode::Indexed,
            CliRenderMode::Meshlet => RenderMode::Meshlet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_size_defaults_to_32() {
        let cli = Cli::try_parse_from(["meshlet_viewer", "bunny.obj"]).unwrap();

        assert_eq!(cli.meshlet_group_size.get(), 32);
        assert!(cli.mode.is_none());
    }

    #[test]
    fn group_size_outside_range_is_a_usage_error() {
        for value in ["0", "257", "-1", "many"] {
            let result =
                Cli::try_parse_from(["meshlet_viewer", "bunny.obj", "--meshlet-group-size", value]);

            assert!(result.is_err(), "{value}");
        }

        let cli = Cli::try_parse_from(["meshlet_viewer", "bunny.obj", "--meshlet-group-size", "256"])
            .unwrap();
        assert_eq!(cli.meshlet_group_size.get(), 256);
    }

    #[test]
    fn missing_mesh_is_a_usage_error() {
        assert!(Cli::try_parse_from(["meshlet_viewer"]).is_err());
    }
}
