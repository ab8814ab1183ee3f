//! Context configuration.

use serde::{Deserialize, Serialize};

/// Which graphics backends the instance may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendSelection {
    #[default]
    All,
    /// Vulkan, Metal, DX12 and WebGPU.
    Primary,
    Metal,
    Vulkan,
    Dx12,
    Gl,
}

impl BackendSelection {
    pub fn to_wgpu(self) -> wgpu::Backends {
        match self {
            BackendSelection::All => wgpu::Backends::all(),
            BackendSelection::Primary => wgpu::Backends::PRIMARY,
            BackendSelection::Metal => wgpu::Backends::METAL,
            BackendSelection::Vulkan => wgpu::Backends::VULKAN,
            BackendSelection::Dx12 => wgpu::Backends::DX12,
            BackendSelection::Gl => wgpu::Backends::GL,
        }
    }
}

/// Adapter selection preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl PowerPreference {
    pub fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

/// How pipeline bindings are discovered from a shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReflectionMode {
    /// Only resources the entry point actually uses, per the validator's
    /// usage analysis.
    #[default]
    EntryPointUsage,

    /// Every bound resource declared in the module, used or not.
    ModuleGlobals,
}

/// Settings applied once when a [`Context`](crate::Context) is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub backends: BackendSelection,
    pub power_preference: PowerPreference,
    /// Prefer a software adapter.
    pub force_fallback_adapter: bool,
    pub reflection: ReflectionMode,
    /// Device label, shown in graphics debuggers.
    pub label: Option<String>,
}
