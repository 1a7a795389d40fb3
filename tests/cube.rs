use std::num::NonZeroU32;

use meshlet_viewer::geometry::meshlet::DEFAULT_MESHLET_GROUP_SIZE;
use meshlet_viewer::geometry::prepare_mesh;
use meshlet_viewer::resource::obj::source::SourceObjAsset;

const CUBE_OBJ: &str = "\
v -1.0 -1.0 -1.0
v 1.0 -1.0 -1.0
v 1.0 1.0 -1.0
v -1.0 1.0 -1.0
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 1.0 1.0 1.0
v -1.0 1.0 1.0
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 4 8 7 3
f 1 5 8 4
f 2 3 7 6
";

#[test]
fn cube_becomes_one_meshlet_padded_to_a_group() {
    let asset = SourceObjAsset::from_source("cube.obj", CUBE_OBJ).unwrap();
    let mesh = prepare_mesh(&asset, DEFAULT_MESHLET_GROUP_SIZE).unwrap();

    assert_eq!(mesh.vertices.len(), 8);
    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.meshlets.len(), 32);

    let filled: Vec<_> = mesh
        .meshlets
        .iter()
        .filter(|meshlet| !meshlet.is_empty())
        .collect();

    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0].triangle_count, 12);
    assert_eq!(filled[0].vertex_count, 8);
    assert!(mesh.meshlets[1..].iter().all(|meshlet| meshlet.is_empty()));
}

#[test]
fn cube_meshlet_resolves_to_the_index_buffer() {
    let asset = SourceObjAsset::from_source("cube.obj", CUBE_OBJ).unwrap();
    let mesh = prepare_mesh(&asset, DEFAULT_MESHLET_GROUP_SIZE).unwrap();

    let resolved: Vec<u32> = mesh.meshlets[0].global_triangles().flatten().collect();

    assert_eq!(resolved, mesh.indices);
}

#[test]
fn closed_cube_has_a_wide_open_cone() {
    let asset = SourceObjAsset::from_source("cube.obj", CUBE_OBJ).unwrap();
    let mesh = prepare_mesh(&asset, DEFAULT_MESHLET_GROUP_SIZE).unwrap();

    let cone = mesh.meshlets[0].cone;

    assert!(cone.iter().all(|value| value.is_finite()));
    assert_eq!(cone[3], 1.0);
    assert!(mesh.meshlets[1..].iter().all(|meshlet| meshlet.cone == [0.0; 4]));
}

#[test]
fn group_size_controls_padding() {
    let asset = SourceObjAsset::from_source("cube.obj", CUBE_OBJ).unwrap();

    let mesh = prepare_mesh(&asset, NonZeroU32::new(1).unwrap()).unwrap();
    assert_eq!(mesh.meshlets.len(), 1);

    let mesh = prepare_mesh(&asset, NonZeroU32::new(5).unwrap()).unwrap();
    assert_eq!(mesh.meshlets.len(), 5);
}

#[test]
fn file_without_faces_is_rejected() {
    let asset = SourceObjAsset::from_source("points.obj", "v 0 0 0\nv 1 0 0\n").unwrap();

    assert!(prepare_mesh(&asset, DEFAULT_MESHLET_GROUP_SIZE).is_err());
}
