use std::num::NonZeroU32;

use anyhow::Result;

use crate::geometry::cone::build_meshlet_cones;
use crate::geometry::loader::load_mesh;
use crate::geometry::meshlet::{build_meshlets, Meshlet};
use crate::geometry::vertex::Vertex;
use crate::resource::obj::ObjAsset;

pub mod cone;
pub mod loader;
pub mod meshlet;
pub mod vertex;

#[derive(Debug, Default, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub meshlets: Vec<Meshlet>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Loads an OBJ asset and partitions it into cone-annotated meshlets.
pub fn prepare_mesh(asset: &impl ObjAsset, meshlet_group_size: NonZeroU32) -> Result<Mesh> {
    let mut mesh = load_mesh(asset)?;

    let filled_meshlet_count = build_meshlets(&mut mesh, meshlet_group_size)?;

    log::info!(
        "Built {filled_meshlet_count} meshlets ({} after padding to groups of {meshlet_group_size})",
        mesh.meshlets.len()
    );

    let cone_summary = build_meshlet_cones(&mut mesh)?;

    if cone_summary.degenerate_count > 0 {
        log::warn!(
            "{} of {} meshlets have a degenerate normal cone",
            cone_summary.degenerate_count,
            cone_summary.meshlet_count
        );
    }

    Ok(mesh)
}
