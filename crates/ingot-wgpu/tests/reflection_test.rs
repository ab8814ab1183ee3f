//! Reflection tests on naga IR. These run without a GPU.

mod common;

use common::{BLUR_WGSL, SCALE_WGSL, load_library, names_of};
use ingot_core::{BindingKind, Error};
use ingot_wgpu::{Library, LibraryOptions, ReflectionMode, RuntimeError};

fn layout_type(entries: &[wgpu::BindGroupLayoutEntry], binding: u32) -> wgpu::BindingType {
    entries
        .iter()
        .find(|e| e.binding == binding)
        .map(|e| e.ty)
        .unwrap_or_else(|| panic!("no layout entry for binding {binding}"))
}

// ================================================================================
// Library loading
// ================================================================================

#[test]
fn test_library_entry_points() {
    let library = load_library(BLUR_WGSL, "blur.wgsl");

    let entry_points: Vec<&str> = library.entry_points().collect();
    assert_eq!(entry_points, vec!["blur", "clear_histogram"]);
    assert_eq!(library.label(), "blur.wgsl");
}

#[test]
fn test_library_defines() {
    let source = r#"
@group(0) @binding(0) var<storage, read_write> data: array<f32>;
#ifdef WITH_BIAS
@group(0) @binding(1) var<storage, read> bias: array<f32>;
#endif

@compute @workgroup_size(#{GROUP_SIZE})
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    var value = data[id.x];
#ifdef WITH_BIAS
    value += bias[id.x];
#endif
    data[id.x] = value;
}
"#;

    let plain = Library::from_source(
        source,
        &LibraryOptions::new("bias.wgsl").define("GROUP_SIZE", "128"),
    )
    .unwrap();
    let reflection = plain.reflect("main", ReflectionMode::EntryPointUsage).unwrap();
    assert_eq!(reflection.workgroup_size, [128, 1, 1]);
    assert_eq!(
        names_of(&reflection.bindings, BindingKind::Buffer),
        vec![("data".to_string(), 0)]
    );

    let biased = Library::from_source(
        source,
        &LibraryOptions::new("bias.wgsl")
            .define("GROUP_SIZE", "32")
            .define("WITH_BIAS", "true"),
    )
    .unwrap();
    let reflection = biased.reflect("main", ReflectionMode::EntryPointUsage).unwrap();
    assert_eq!(reflection.workgroup_size, [32, 1, 1]);
    assert_eq!(
        names_of(&reflection.bindings, BindingKind::Buffer),
        vec![("bias".to_string(), 1), ("data".to_string(), 0)]
    );
}

#[test]
fn test_library_rejects_invalid_define() {
    let result = Library::from_source(
        SCALE_WGSL,
        &LibraryOptions::new("scale.wgsl").define("MODE", "fast"),
    );
    assert!(matches!(result, Err(RuntimeError::LibraryError(_))));
}

#[test]
fn test_library_rejects_invalid_shader() {
    let source = r#"
@group(0) @binding(0) var<storage, read> data: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = 1.0;
}
"#;
    let result = Library::from_source(source, &LibraryOptions::new("readonly.wgsl"));
    match result {
        Err(RuntimeError::LibraryError(message)) => {
            assert!(message.contains("readonly.wgsl"), "{message}");
        }
        other => panic!("expected a library error, got {other:?}"),
    }
}

// ================================================================================
// Binding partitioning
// ================================================================================

#[test]
fn test_reflect_scale() {
    let library = load_library(SCALE_WGSL, "scale.wgsl");
    let reflection = library
        .reflect("scale", ReflectionMode::EntryPointUsage)
        .unwrap();

    assert_eq!(reflection.entry_point, "scale");
    assert_eq!(reflection.workgroup_size, [64, 1, 1]);
    assert_eq!(
        names_of(&reflection.bindings, BindingKind::Buffer),
        vec![("input".to_string(), 0), ("output".to_string(), 1)]
    );
    assert!(reflection.shared_memory_sizes.is_empty());

    assert_eq!(
        layout_type(&reflection.layout_entries, 0),
        wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        }
    );
    assert_eq!(
        layout_type(&reflection.layout_entries, 1),
        wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        }
    );
}

#[test]
fn test_reflect_blur_entry_point_usage() {
    let library = load_library(BLUR_WGSL, "blur.wgsl");
    let reflection = library
        .reflect("blur", ReflectionMode::EntryPointUsage)
        .unwrap();
    let bindings = &reflection.bindings;

    assert_eq!(reflection.workgroup_size, [16, 16, 1]);
    assert_eq!(
        names_of(bindings, BindingKind::Texture),
        vec![("destination".to_string(), 1), ("source".to_string(), 0)]
    );
    assert_eq!(
        names_of(bindings, BindingKind::Sampler),
        vec![("bilinear".to_string(), 2)]
    );
    // histogram belongs to clear_histogram only
    assert_eq!(
        names_of(bindings, BindingKind::Buffer),
        vec![("params".to_string(), 4), ("weights".to_string(), 3)]
    );
    assert_eq!(
        names_of(bindings, BindingKind::SharedMemory),
        vec![("tile".to_string(), 0)]
    );

    assert_eq!(reflection.shared_memory_sizes.get(&0), Some(&4096));
    assert_eq!(reflection.layout_entries.len(), 5);
    let bindings: Vec<u32> = reflection.layout_entries.iter().map(|e| e.binding).collect();
    assert_eq!(bindings, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_reflect_blur_layout_types() {
    let library = load_library(BLUR_WGSL, "blur.wgsl");
    let entries = library
        .reflect("blur", ReflectionMode::EntryPointUsage)
        .unwrap()
        .layout_entries;

    assert_eq!(
        layout_type(&entries, 0),
        wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        }
    );
    assert_eq!(
        layout_type(&entries, 1),
        wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: wgpu::TextureFormat::Rgba8Unorm,
            view_dimension: wgpu::TextureViewDimension::D2,
        }
    );
    assert_eq!(
        layout_type(&entries, 2),
        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
    );
    assert_eq!(
        layout_type(&entries, 4),
        wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        }
    );
}

#[test]
fn test_reflect_second_entry_point_shared_memory_index() {
    let library = load_library(BLUR_WGSL, "blur.wgsl");
    let reflection = library
        .reflect("clear_histogram", ReflectionMode::EntryPointUsage)
        .unwrap();

    assert_eq!(
        names_of(&reflection.bindings, BindingKind::Buffer),
        vec![("histogram".to_string(), 5)]
    );
    // Indices follow declaration order across the module, so scratch keeps
    // index 1 even though tile is not used here.
    assert_eq!(
        names_of(&reflection.bindings, BindingKind::SharedMemory),
        vec![("scratch".to_string(), 1)]
    );
    assert_eq!(reflection.shared_memory_sizes.get(&1), Some(&256));
    assert!(names_of(&reflection.bindings, BindingKind::Texture).is_empty());
}

#[test]
fn test_reflect_module_globals() {
    let library = load_library(BLUR_WGSL, "blur.wgsl");
    let reflection = library
        .reflect("clear_histogram", ReflectionMode::ModuleGlobals)
        .unwrap();
    let bindings = &reflection.bindings;

    assert_eq!(names_of(bindings, BindingKind::Texture).len(), 2);
    assert_eq!(names_of(bindings, BindingKind::Sampler).len(), 1);
    assert_eq!(
        names_of(bindings, BindingKind::Buffer),
        vec![
            ("histogram".to_string(), 5),
            ("params".to_string(), 4),
            ("weights".to_string(), 3),
        ]
    );
    assert_eq!(
        names_of(bindings, BindingKind::SharedMemory),
        vec![("scratch".to_string(), 1), ("tile".to_string(), 0)]
    );
    assert_eq!(reflection.layout_entries.len(), 6);
}

// ================================================================================
// Texture and sampler classification
// ================================================================================

#[test]
fn test_reflect_unfilterable_without_sampler() {
    let source = r#"
@group(0) @binding(0) var image: texture_2d<f32>;
@group(0) @binding(1) var<storage, read_write> sums: array<f32>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let texel = textureLoad(image, vec2<i32>(id.xy), 0);
    sums[id.x] = texel.r;
}
"#;
    let library = load_library(source, "load.wgsl");
    let entries = library
        .reflect("main", ReflectionMode::EntryPointUsage)
        .unwrap()
        .layout_entries;

    assert_eq!(
        layout_type(&entries, 0),
        wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        }
    );
}

#[test]
fn test_reflect_depth_and_comparison_sampler() {
    let source = r#"
@group(0) @binding(0) var shadow_map: texture_depth_2d;
@group(0) @binding(1) var shadow_sampler: sampler_comparison;
@group(0) @binding(2) var<storage, read_write> visibility: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let uv = vec2<f32>(f32(id.x) / 64.0, 0.5);
    visibility[id.x] = textureSampleCompareLevel(shadow_map, shadow_sampler, uv, 0.5);
}
"#;
    let library = load_library(source, "shadow.wgsl");
    let reflection = library
        .reflect("main", ReflectionMode::EntryPointUsage)
        .unwrap();

    assert_eq!(
        names_of(&reflection.bindings, BindingKind::Texture),
        vec![("shadow_map".to_string(), 0)]
    );
    assert_eq!(
        layout_type(&reflection.layout_entries, 0),
        wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        }
    );
    assert_eq!(
        layout_type(&reflection.layout_entries, 1),
        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
    );
}

// ================================================================================
// Errors
// ================================================================================

#[test]
fn test_reflect_unknown_entry_point() {
    let library = load_library(SCALE_WGSL, "scale.wgsl");
    let result = library.reflect("shrink", ReflectionMode::EntryPointUsage);

    match result {
        Err(Error::ProgramResolution { name, .. }) => assert_eq!(name, "shrink"),
        other => panic!("expected a resolution error, got {other:?}"),
    }
}

#[test]
fn test_reflect_rejects_other_bind_groups() {
    let source = r#"
@group(1) @binding(0) var<storage, read_write> data: array<u32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = id.x;
}
"#;
    let library = load_library(source, "group1.wgsl");
    let result = library.reflect("main", ReflectionMode::EntryPointUsage);

    match result {
        Err(Error::PipelineCreation(message)) => {
            assert!(message.contains("data"), "{message}");
            assert!(message.contains("group 1"), "{message}");
        }
        other => panic!("expected a pipeline creation error, got {other:?}"),
    }
}

#[test]
fn test_reflect_ignores_unused_other_groups() {
    let source = r#"
@group(0) @binding(0) var<storage, read_write> data: array<u32>;
@group(2) @binding(0) var<storage, read> unused: array<u32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = id.x;
}
"#;
    let library = load_library(source, "unused.wgsl");

    assert!(library.reflect("main", ReflectionMode::EntryPointUsage).is_ok());
    assert!(matches!(
        library.reflect("main", ReflectionMode::ModuleGlobals),
        Err(Error::PipelineCreation(_))
    ));
}
