//! Binding reflection from naga IR.
//!
//! Produces both the platform-independent binding descriptors the binder
//! consumes and the bind group layout entries wgpu needs for an explicit
//! pipeline layout.
//!
//! Resource classification:
//! - `var<uniform>` and `var<storage>` → `Buffer`
//! - sampled, depth and storage textures → `Texture`
//! - `sampler` / `sampler_comparison` → `Sampler`
//! - `var<workgroup>` → `SharedMemory`, indexed in declaration order
//! - `var<immediate>` and binding arrays → `Other`
//!
//! Only bind group 0 is supported.

use crate::config::ReflectionMode;
use ingot_core::{BindingDescriptor, BindingKind, Error, PipelineReflection, Result};
use naga::{AddressSpace, Handle, ImageClass, ImageDimension, ScalarKind, StorageAccess, TypeInner};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Everything known about one compute entry point's interface.
#[derive(Debug, Clone)]
pub struct EntryPointReflection {
    pub entry_point: String,

    /// `@workgroup_size` of the entry point.
    pub workgroup_size: [u32; 3],

    pub bindings: PipelineReflection,

    /// Layout entries for every reflected bind group 0 resource, sorted by
    /// binding number.
    pub layout_entries: Vec<wgpu::BindGroupLayoutEntry>,

    /// Declared byte size of each shared-memory binding, by index.
    pub shared_memory_sizes: BTreeMap<u32, u64>,
}

/// Reflect the compute entry point `entry_point` of `module`.
///
/// # Errors
/// - `Error::ProgramResolution` if there is no such compute entry point
/// - `Error::PipelineCreation` for resources the platform cannot bind
pub fn reflect(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    entry_point: &str,
    mode: ReflectionMode,
) -> Result<EntryPointReflection> {
    let (ep_index, ep) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| Error::ProgramResolution {
            name: entry_point.to_string(),
            reason: "no compute entry point with this name".to_string(),
        })?;

    let function_info = info.get_entry_point(ep_index);
    let included = |handle: Handle<naga::GlobalVariable>| match mode {
        ReflectionMode::EntryPointUsage => !function_info[handle].is_empty(),
        ReflectionMode::ModuleGlobals => true,
    };

    let mut layouter = naga::proc::Layouter::default();
    layouter
        .update(module.to_ctx())
        .map_err(|e| Error::Library(format!("Type layout failed: {e}")))?;

    // Float textures are filterable only when a filtering sampler is bound
    // alongside them; otherwise unfilterable formats such as r32float work.
    let filtering = module.global_variables.iter().any(|(handle, var)| {
        included(handle)
            && var.binding.is_some()
            && matches!(
                module.types[var.ty].inner,
                TypeInner::Sampler { comparison: false }
            )
    });

    let mut bindings = Vec::new();
    let mut layout_entries = Vec::new();
    let mut shared_memory_sizes = BTreeMap::new();
    let mut shared_memory_index = 0u32;

    for (handle, var) in module.global_variables.iter() {
        let name = var
            .name
            .clone()
            .unwrap_or_else(|| format!("global{}", handle.index()));

        match var.space {
            AddressSpace::WorkGroup => {
                let index = shared_memory_index;
                shared_memory_index += 1;
                if included(handle) {
                    shared_memory_sizes.insert(index, u64::from(layouter[var.ty].size));
                    bindings.push(BindingDescriptor::new(name, index, BindingKind::SharedMemory));
                }
                continue;
            }
            AddressSpace::Immediate => {
                if included(handle) {
                    bindings.push(BindingDescriptor::new(name, 0, BindingKind::Other));
                }
                continue;
            }
            _ => {}
        }

        let Some(binding) = var.binding.as_ref() else {
            continue;
        };
        if !included(handle) {
            continue;
        }
        if binding.group != 0 {
            return Err(Error::PipelineCreation(format!(
                "'{name}' is in bind group {}, only group 0 is supported",
                binding.group
            )));
        }

        let Some((kind, ty)) = classify(module, var, filtering).map_err(|reason| {
            Error::PipelineCreation(format!("Cannot bind '{name}': {reason}"))
        })?
        else {
            warn!("'{name}' has no supported binding type, reported as other");
            bindings.push(BindingDescriptor::new(name, binding.binding, BindingKind::Other));
            continue;
        };

        bindings.push(BindingDescriptor::new(name, binding.binding, kind));
        layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding: binding.binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty,
            count: None,
        });
    }

    layout_entries.sort_by_key(|e| e.binding);

    debug!(
        entry_point,
        ?mode,
        bindings = bindings.len(),
        layout_entries = layout_entries.len(),
        "Reflected entry point"
    );

    Ok(EntryPointReflection {
        entry_point: entry_point.to_string(),
        workgroup_size: ep.workgroup_size,
        bindings: PipelineReflection::new(bindings),
        layout_entries,
        shared_memory_sizes,
    })
}

/// Binding kind and layout type of a bound global. `Ok(None)` means the
/// global is bound but not managed by the binder.
fn classify(
    module: &naga::Module,
    var: &naga::GlobalVariable,
    filtering: bool,
) -> std::result::Result<Option<(BindingKind, wgpu::BindingType)>, String> {
    let buffer = |ty| {
        Ok(Some((
            BindingKind::Buffer,
            wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        )))
    };

    match var.space {
        AddressSpace::Uniform => buffer(wgpu::BufferBindingType::Uniform),
        AddressSpace::Storage { access } => buffer(wgpu::BufferBindingType::Storage {
            read_only: !access.contains(StorageAccess::STORE),
        }),
        AddressSpace::Handle => match &module.types[var.ty].inner {
            TypeInner::Sampler { comparison } => {
                let ty = if *comparison {
                    wgpu::SamplerBindingType::Comparison
                } else {
                    wgpu::SamplerBindingType::Filtering
                };
                Ok(Some((BindingKind::Sampler, wgpu::BindingType::Sampler(ty))))
            }
            TypeInner::Image {
                dim,
                arrayed,
                class,
            } => {
                let view_dimension = view_dimension(*dim, *arrayed);
                let ty = match *class {
                    ImageClass::Sampled { kind, multi } => wgpu::BindingType::Texture {
                        sample_type: sample_type(kind, filtering)?,
                        view_dimension,
                        multisampled: multi,
                    },
                    ImageClass::Depth { multi } => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension,
                        multisampled: multi,
                    },
                    ImageClass::Storage { format, access } => wgpu::BindingType::StorageTexture {
                        access: storage_access(access),
                        format: storage_format(format),
                        view_dimension,
                    },
                    ImageClass::External => {
                        return Err("external textures are not supported".to_string());
                    }
                };
                Ok(Some((BindingKind::Texture, ty)))
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn view_dimension(dim: ImageDimension, arrayed: bool) -> wgpu::TextureViewDimension {
    match (dim, arrayed) {
        (ImageDimension::D1, _) => wgpu::TextureViewDimension::D1,
        (ImageDimension::D2, false) => wgpu::TextureViewDimension::D2,
        (ImageDimension::D2, true) => wgpu::TextureViewDimension::D2Array,
        (ImageDimension::D3, _) => wgpu::TextureViewDimension::D3,
        (ImageDimension::Cube, false) => wgpu::TextureViewDimension::Cube,
        (ImageDimension::Cube, true) => wgpu::TextureViewDimension::CubeArray,
    }
}

fn sample_type(
    kind: ScalarKind,
    filtering: bool,
) -> std::result::Result<wgpu::TextureSampleType, String> {
    match kind {
        ScalarKind::Float => Ok(wgpu::TextureSampleType::Float {
            filterable: filtering,
        }),
        ScalarKind::Sint => Ok(wgpu::TextureSampleType::Sint),
        ScalarKind::Uint => Ok(wgpu::TextureSampleType::Uint),
        other => Err(format!("unsupported texel kind {other:?}")),
    }
}

fn storage_access(access: StorageAccess) -> wgpu::StorageTextureAccess {
    let load = access.contains(StorageAccess::LOAD);
    let store = access.contains(StorageAccess::STORE);
    match (load, store) {
        (true, false) => wgpu::StorageTextureAccess::ReadOnly,
        (false, true) => wgpu::StorageTextureAccess::WriteOnly,
        _ => wgpu::StorageTextureAccess::ReadWrite,
    }
}

fn storage_format(format: naga::StorageFormat) -> wgpu::TextureFormat {
    use naga::StorageFormat as Sf;
    use wgpu::TextureFormat as Tf;

    match format {
        Sf::R8Unorm => Tf::R8Unorm,
        Sf::R8Snorm => Tf::R8Snorm,
        Sf::R8Uint => Tf::R8Uint,
        Sf::R8Sint => Tf::R8Sint,
        Sf::R16Uint => Tf::R16Uint,
        Sf::R16Sint => Tf::R16Sint,
        Sf::R16Float => Tf::R16Float,
        Sf::Rg8Unorm => Tf::Rg8Unorm,
        Sf::Rg8Snorm => Tf::Rg8Snorm,
        Sf::Rg8Uint => Tf::Rg8Uint,
        Sf::Rg8Sint => Tf::Rg8Sint,
        Sf::R32Uint => Tf::R32Uint,
        Sf::R32Sint => Tf::R32Sint,
        Sf::R32Float => Tf::R32Float,
        Sf::Rg16Uint => Tf::Rg16Uint,
        Sf::Rg16Sint => Tf::Rg16Sint,
        Sf::Rg16Float => Tf::Rg16Float,
        Sf::Rgba8Unorm => Tf::Rgba8Unorm,
        Sf::Rgba8Snorm => Tf::Rgba8Snorm,
        Sf::Rgba8Uint => Tf::Rgba8Uint,
        Sf::Rgba8Sint => Tf::Rgba8Sint,
        Sf::Bgra8Unorm => Tf::Bgra8Unorm,
        Sf::Rgb10a2Uint => Tf::Rgb10a2Uint,
        Sf::Rgb10a2Unorm => Tf::Rgb10a2Unorm,
        Sf::Rg11b10Ufloat => Tf::Rg11b10Ufloat,
        Sf::R64Uint => Tf::R64Uint,
        Sf::Rg32Uint => Tf::Rg32Uint,
        Sf::Rg32Sint => Tf::Rg32Sint,
        Sf::Rg32Float => Tf::Rg32Float,
        Sf::Rgba16Uint => Tf::Rgba16Uint,
        Sf::Rgba16Sint => Tf::Rgba16Sint,
        Sf::Rgba16Float => Tf::Rgba16Float,
        Sf::Rgba32Uint => Tf::Rgba32Uint,
        Sf::Rgba32Sint => Tf::Rgba32Sint,
        Sf::Rgba32Float => Tf::Rgba32Float,
        Sf::R16Unorm => Tf::R16Unorm,
        Sf::R16Snorm => Tf::R16Snorm,
        Sf::Rg16Unorm => Tf::Rg16Unorm,
        Sf::Rg16Snorm => Tf::Rg16Snorm,
        Sf::Rgba16Unorm => Tf::Rgba16Unorm,
        Sf::Rgba16Snorm => Tf::Rgba16Snorm,
    }
}
