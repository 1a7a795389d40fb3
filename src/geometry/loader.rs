use anyhow::Result;

use crate::error::Error;
use crate::geometry::vertex::Vertex;
use crate::geometry::Mesh;
use crate::resource::obj::ObjAsset;

/// Builds a deduplicated, cache-optimized triangle mesh from every model of the asset.
pub fn load_mesh(asset: &impl ObjAsset) -> Result<Mesh> {
    let corners = triangulate_models(asset.models())?;

    if corners.is_empty() {
        return Err(Error::new(format!("The mesh {} contains no triangles", asset.name())).into());
    }

    let (vertex_count, remap) = meshopt::generate_vertex_remap(&corners, None);
    let vertices = meshopt::remap_vertex_buffer(&corners, vertex_count, &remap);

    // The corner stream is unindexed, so the remap table is the index buffer.
    let mut indices = remap;

    meshopt::optimize_vertex_cache_in_place(&mut indices, vertex_count);
    let vertices = meshopt::optimize_vertex_fetch(&mut indices, &vertices);

    log::info!(
        "Loaded mesh {}: {} vertices, {} triangles",
        asset.name(),
        vertices.len(),
        indices.len() / 3
    );

    Ok(Mesh {
        vertices,
        indices,
        meshlets: Vec::new(),
    })
}

/// Expands every face into quantized triangle corners, fanning polygons
/// around their first corner.
pub fn triangulate_models(models: &[tobj::Model]) -> Result<Vec<Vertex>> {
    let mut corners = Vec::new();

    for model in models {
        let mesh = &model.mesh;

        let face_arities = if mesh.face_arities.is_empty() {
            if mesh.indices.len() % 3 != 0 {
                return Err(Error::new(format!(
                    "The model {} has {} indices, which is not a whole number of triangles",
                    model.name,
                    mesh.indices.len()
                ))
                .into());
            }

            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.clone()
        };

        let mut offset = 0;

        for (face, &arity) in face_arities.iter().enumerate() {
            let arity = arity as usize;

            if arity < 3 {
                return Err(Error::new(format!(
                    "Face {face} of model {} has only {arity} corners",
                    model.name
                ))
                .into());
            }

            let first = corner_vertex(model, offset)?;
            let mut previous = corner_vertex(model, offset + 1)?;

            for corner in 2..arity {
                let current = corner_vertex(model, offset + corner)?;
                corners.extend([first, previous, current]);
                previous = current;
            }

            offset += arity;
        }
    }

    Ok(corners)
}

fn corner_vertex(model: &tobj::Model, corner: usize) -> Result<Vertex> {
    let mesh = &model.mesh;

    let position_index = match mesh.indices.get(corner) {
        Some(&index) => index as usize,
        None => {
            return Err(Error::new(format!(
                "The faces of model {} reference more corners than its index buffer holds",
                model.name
            ))
            .into())
        }
    };

    let position = match mesh.positions.get(position_index * 3..position_index * 3 + 3) {
        Some(position) => [position[0], position[1], position[2]],
        None => {
            return Err(Error::new(format!(
                "Model {} references missing position {position_index}",
                model.name
            ))
            .into())
        }
    };

    let normal = mesh
        .normal_indices
        .get(corner)
        .and_then(|&index| mesh.normals.get(index as usize * 3..index as usize * 3 + 3))
        .map_or([0.0; 3], |normal| [normal[0], normal[1], normal[2]]);

    let tex_coord = mesh
        .texcoord_indices
        .get(corner)
        .and_then(|&index| mesh.texcoords.get(index as usize * 2..index as usize * 2 + 2))
        .map_or([0.0; 2], |tex_coord| [tex_coord[0], tex_coord[1]]);

    Ok(Vertex::from_attributes(position, normal, tex_coord))
}
