//! WGSL shader libraries composed with naga_oil.

use crate::config::ReflectionMode;
use crate::error::{Result, RuntimeError};
use crate::reflection::{self, EntryPointReflection};
use naga_oil::compose::{Composer, NagaModuleDescriptor, ShaderDefValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for composing a library.
#[derive(Debug, Clone)]
pub struct LibraryOptions {
    /// Path reported in diagnostics. Does not need to exist.
    pub file_path: String,

    /// Preprocessor definitions for `#ifdef` / `#{NAME}` substitution.
    /// Values are parsed as integers, then as booleans.
    pub defines: HashMap<String, String>,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            file_path: "library.wgsl".to_string(),
            defines: HashMap::new(),
        }
    }
}

impl LibraryOptions {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Add a preprocessor definition.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }
}

fn shader_def(name: &str, value: &str) -> Result<ShaderDefValue> {
    if let Ok(int_val) = value.parse::<i32>() {
        return Ok(ShaderDefValue::Int(int_val));
    }
    if let Ok(uint_val) = value.parse::<u32>() {
        return Ok(ShaderDefValue::UInt(uint_val));
    }
    match value {
        "true" => Ok(ShaderDefValue::Bool(true)),
        "false" => Ok(ShaderDefValue::Bool(false)),
        _ => Err(RuntimeError::LibraryError(format!(
            "Define '{name}' has unsupported value '{value}'"
        ))),
    }
}

/// A validated shader module containing one or more compute entry points.
///
/// Libraries are device independent; cloning is cheap.
#[derive(Debug, Clone)]
pub struct Library {
    label: String,
    module: Arc<naga::Module>,
    info: Arc<naga::valid::ModuleInfo>,
}

impl Library {
    /// Compose and validate WGSL source.
    ///
    /// # Errors
    /// `RuntimeError::LibraryError` if preprocessing, parsing or validation
    /// fails.
    #[tracing::instrument(skip_all, fields(file_path = %options.file_path))]
    pub fn from_source(source: &str, options: &LibraryOptions) -> Result<Self> {
        let shader_defs = options
            .defines
            .iter()
            .map(|(name, value)| Ok((name.clone(), shader_def(name, value)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let mut composer = Composer::default();
        let module = composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path: &options.file_path,
                shader_defs,
                ..Default::default()
            })
            .map_err(|e| {
                RuntimeError::LibraryError(format!(
                    "Shader compilation failed for '{}': {e}",
                    options.file_path
                ))
            })?;

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| {
            RuntimeError::LibraryError(format!(
                "Shader validation failed for '{}': {e}",
                options.file_path
            ))
        })?;

        debug!(
            entry_points = module.entry_points.len(),
            globals = module.global_variables.len(),
            "Loaded library"
        );

        Ok(Self {
            label: options.file_path.clone(),
            module: Arc::new(module),
            info: Arc::new(info),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    pub fn info(&self) -> &naga::valid::ModuleInfo {
        &self.info
    }

    /// Names of the compute entry points, in declaration order.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.module
            .entry_points
            .iter()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| ep.name.as_str())
    }

    /// Names (or numeric ids) of pipeline-overridable constants.
    pub fn overrides(&self) -> impl Iterator<Item = String> + '_ {
        self.module
            .overrides
            .iter()
            .filter_map(|(_, o)| o.name.clone().or_else(|| o.id.map(|id| id.to_string())))
    }

    /// Reflect the bindings of `entry_point` without touching a GPU.
    pub fn reflect(
        &self,
        entry_point: &str,
        mode: ReflectionMode,
    ) -> ingot_core::Result<EntryPointReflection> {
        reflection::reflect(&self.module, &self.info, entry_point, mode)
    }
}
