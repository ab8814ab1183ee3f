//! GPU context setup and device reporting.

use anyhow::{Context as _, Result};
use ingot_core::GridSize;
use ingot_wgpu::{Context, ContextConfig};
use std::path::Path;

/// Read a context configuration from a JSON file, or use the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ContextConfig> {
    let Some(path) = path else {
        return Ok(ContextConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config from {}", path.display()))
}

/// Create a context, blocking on device initialization.
pub fn create_context(config: &ContextConfig) -> Result<Context> {
    pollster::block_on(Context::new(config)).context("Failed to initialize GPU context")
}

pub fn cmd_device(config: &ContextConfig) -> Result<()> {
    let context = create_context(config)?;
    let info = context.adapter_info();

    println!("Device: {}", context.device_name());
    println!("  Backend: {:?}", info.backend);
    println!("  Type: {:?}", info.device_type);
    println!("  Driver: {} {}", info.driver, info.driver_info);
    println!("  Reflection: {:?}", context.reflection_mode());
    println!();

    let threads = context.max_threads_per_workgroup();
    println!("Compute limits:");
    println!("  Max workgroup size: {threads}");
    println!(
        "  Max invocations per workgroup: {}",
        context.max_invocations_per_workgroup()
    );
    println!(
        "  Max workgroups per dimension: {}",
        context.max_workgroups_per_dimension()
    );
    println!(
        "  Workgroup storage: {} bytes",
        context.max_workgroup_storage_size()
    );
    println!("  Max buffer size: {} bytes", context.max_buffer_size());
    println!(
        "  Storage offset alignment: {}",
        context.min_storage_buffer_offset_alignment()
    );
    println!(
        "  Uniform offset alignment: {}",
        context.min_uniform_buffer_offset_alignment()
    );

    let max_side = context.limits().max_texture_dimension_2d;
    println!(
        "  Max 2-D texture: {}",
        context.max_texture_size(GridSize::planar(max_side, max_side))
    );

    Ok(())
}
