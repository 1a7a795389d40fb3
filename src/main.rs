use clap::Parser;

use crate::cli::Cli;
use meshlet_viewer::args::Args;
use meshlet_viewer::run;

mod cli;

fn main() {
    let cli = Cli::parse();

    let result = run(Args {
        mesh: cli.mesh,
        meshlet_group_size: cli.meshlet_group_size,
        spirv_dir: cli.spirv_dir,
        initial_mode: cli.mode.map(|mode| mode.into()),
    });

    if let Err(error) = result {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}
