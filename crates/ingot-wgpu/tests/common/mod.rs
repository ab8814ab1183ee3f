//! Common test utilities for the wgpu platform tests.
//!
//! Provides the shader sources under `tests/shaders` and a context builder
//! for the GPU tests.

#![allow(dead_code)]

use ingot_core::{BindingKind, PipelineReflection};
use ingot_wgpu::{Context, ContextConfig, Library, LibraryOptions, ReflectionMode};

pub const SCALE_WGSL: &str = include_str!("../shaders/scale.wgsl");
pub const BLUR_WGSL: &str = include_str!("../shaders/blur.wgsl");

/// Compose one of the test shaders, panicking with the composer's message on
/// failure.
pub fn load_library(source: &str, file_path: &str) -> Library {
    Library::from_source(source, &LibraryOptions::new(file_path))
        .unwrap_or_else(|e| panic!("Failed to load {file_path}: {e}"))
}

/// Names of the reflected bindings of one kind, with their indices, sorted by
/// name.
pub fn names_of(reflection: &PipelineReflection, kind: BindingKind) -> Vec<(String, u32)> {
    let mut names: Vec<(String, u32)> = reflection
        .of_kind(kind)
        .map(|b| (b.name.clone(), b.index))
        .collect();
    names.sort();
    names
}

/// Create a GPU context with the given reflection mode.
pub async fn gpu_context(reflection: ReflectionMode) -> Context {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ingot_wgpu=debug")
        .with_test_writer()
        .try_init();

    Context::new(&ContextConfig {
        reflection,
        ..Default::default()
    })
    .await
    .expect("Failed to create GPU context")
}
