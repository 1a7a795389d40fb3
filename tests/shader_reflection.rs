use std::num::NonZeroU32;

use meshlet_viewer::geometry::meshlet::DEFAULT_MESHLET_GROUP_SIZE;
use meshlet_viewer::resource::shader::template::{
    compile_wgsl, ShaderTemplateConfiguration, WgslTemplateShaderLoader,
};
use meshlet_viewer::resource::shader::ShaderBinaryLoader;
use meshlet_viewer::spirv::{ShaderReflection, ShaderStage};

fn shipped_shader_loader(group_size: NonZeroU32) -> WgslTemplateShaderLoader {
    let tera = tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/**/*")).unwrap();

    WgslTemplateShaderLoader::from_tera(tera, &ShaderTemplateConfiguration::new(group_size))
        .unwrap()
}

fn reflect(loader: &WgslTemplateShaderLoader, name: &str) -> ShaderReflection {
    let binary = loader.load_shader_binary(name).unwrap();

    ShaderReflection::from_words(&binary.words).unwrap()
}

#[test]
fn shipped_shaders_reflect_their_bindings() {
    let loader = shipped_shader_loader(DEFAULT_MESHLET_GROUP_SIZE);

    let cases = [
        ("mesh.vert", ShaderStage::Vertex, 0b001, 0b000),
        ("mesh.frag", ShaderStage::Fragment, 0b000, 0b000),
        ("meshlet.task", ShaderStage::Compute, 0b111, 0b110),
        ("meshlet.mesh", ShaderStage::Vertex, 0b111, 0b000),
    ];

    for (name, stage, storage_buffer_mask, writable_storage_buffer_mask) in cases {
        let reflection = reflect(&loader, name);

        assert_eq!(reflection.stage, stage, "{name}");
        assert_eq!(reflection.entry_point, "main", "{name}");
        assert_eq!(reflection.storage_buffer_mask, storage_buffer_mask, "{name}");
        assert_eq!(
            reflection.writable_storage_buffer_mask, writable_storage_buffer_mask,
            "{name}"
        );
    }
}

#[test]
fn task_shader_compiles_for_any_group_size() {
    let loader = shipped_shader_loader(NonZeroU32::new(64).unwrap());
    let binary = loader.load_shader_binary("meshlet.task").unwrap();

    assert!(binary
        .wgsl_source
        .unwrap()
        .contains("@workgroup_size(64)"));
}

#[test]
fn reflection_is_deterministic() {
    let loader = shipped_shader_loader(DEFAULT_MESHLET_GROUP_SIZE);

    assert_eq!(
        reflect(&loader, "meshlet.mesh"),
        reflect(&loader, "meshlet.mesh")
    );
}

#[test]
fn sparse_bindings_are_reflected_by_index() {
    let source = r"
        @group(0) @binding(3)
        var<storage, read> input: array<f32>;

        @group(0) @binding(17)
        var<storage, read_write> output: array<f32>;

        @compute @workgroup_size(1)
        fn scale(@builtin(global_invocation_id) id: vec3<u32>) {
            output[id.x] = input[id.x] * 2.0;
        }
    ";

    let words = compile_wgsl("scale", source).unwrap();
    let reflection = ShaderReflection::from_words(&words).unwrap();

    assert_eq!(reflection.stage, ShaderStage::Compute);
    assert_eq!(reflection.entry_point, "scale");
    assert_eq!(reflection.storage_buffer_mask, 1 << 3 | 1 << 17);
    assert_eq!(reflection.writable_storage_buffer_mask, 1 << 17);
}

#[test]
fn byte_stream_matches_word_stream() {
    let loader = shipped_shader_loader(DEFAULT_MESHLET_GROUP_SIZE);
    let binary = loader.load_shader_binary("mesh.vert").unwrap();
    let bytes: Vec<u8> = binary.words.iter().flat_map(|word| word.to_le_bytes()).collect();

    assert_eq!(
        ShaderReflection::from_bytes(&bytes).unwrap(),
        ShaderReflection::from_words(&binary.words).unwrap()
    );
}
