//! Shader reflection reports.

use crate::device::create_context;
use anyhow::{Context as _, Result, bail};
use ingot_core::BindingKind;
use ingot_wgpu::{ContextConfig, EntryPointReflection, Library, LibraryOptions};
use std::path::Path;

/// Parse `NAME=VALUE` preprocessor definitions. A bare `NAME` means `true`.
pub fn parse_defines(defines: &[String]) -> Result<Vec<(String, String)>> {
    defines
        .iter()
        .map(|define| {
            let (name, value) = define.split_once('=').unwrap_or((define.as_str(), "true"));
            let name = name.trim();
            if name.is_empty() {
                bail!("Invalid define '{define}': missing name");
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn cmd_reflect(
    shader: &Path,
    entry: Option<&str>,
    defines: &[String],
    config: &ContextConfig,
    compile: bool,
) -> Result<()> {
    let source = std::fs::read_to_string(shader)
        .with_context(|| format!("Failed to read shader from {}", shader.display()))?;

    let mut options = LibraryOptions::new(shader.display().to_string());
    for (name, value) in parse_defines(defines)? {
        options = options.define(name, value);
    }
    let library = Library::from_source(&source, &options)
        .with_context(|| format!("Failed to load {}", shader.display()))?;

    let entry_points: Vec<String> = match entry {
        Some(name) => vec![name.to_string()],
        None => library.entry_points().map(str::to_string).collect(),
    };
    if entry_points.is_empty() {
        bail!("{} has no compute entry points", shader.display());
    }

    for name in &entry_points {
        let reflection = library
            .reflect(name, config.reflection)
            .with_context(|| format!("Failed to reflect '{name}'"))?;
        print_reflection(&reflection);
        println!();
    }

    if compile {
        let context = create_context(config)?;
        for name in &entry_points {
            let command = context
                .compute_command(&library, name, None)
                .with_context(|| format!("Failed to create pipeline for '{name}'"))?;
            let missing = command.missing_arguments();
            println!(
                "Pipeline '{name}' created on {} ({} required arguments)",
                context.device_name(),
                missing.len()
            );
        }
    }

    Ok(())
}

fn print_reflection(reflection: &EntryPointReflection) {
    let [x, y, z] = reflection.workgroup_size;
    println!(
        "Entry point: {} (@workgroup_size({x}, {y}, {z}))",
        reflection.entry_point
    );

    if reflection.bindings.bindings.is_empty() {
        println!("  Bindings: (none)");
        return;
    }

    for kind in [
        BindingKind::Texture,
        BindingKind::Sampler,
        BindingKind::Buffer,
        BindingKind::SharedMemory,
        BindingKind::Other,
    ] {
        let mut bindings: Vec<_> = reflection.bindings.of_kind(kind).collect();
        if bindings.is_empty() {
            continue;
        }
        bindings.sort_by_key(|b| b.index);

        println!("  {kind}:");
        for binding in bindings {
            match (kind, reflection.shared_memory_sizes.get(&binding.index)) {
                (BindingKind::SharedMemory, Some(size)) => {
                    println!("    [{}] {} ({size} bytes)", binding.index, binding.name);
                }
                _ => println!("    [{}] {}", binding.index, binding.name),
            }
        }
    }
}
