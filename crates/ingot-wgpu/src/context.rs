//! GPU context: device initialization and capability queries.

use crate::config::{ContextConfig, ReflectionMode};
use crate::error::{Result, RuntimeError};
use crate::library::{Library, LibraryOptions};
use ingot_core::GridSize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Owns the wgpu device and queue, and acts as the [`ComputePlatform`]
/// for [`ComputeCommand`].
///
/// # Example
/// ```no_run
/// # use ingot_wgpu::{Context, ContextConfig};
/// #[pollster::main]
/// async fn main() -> anyhow::Result<()> {
///     let context = Context::new(&ContextConfig::default()).await?;
///     println!("GPU: {}", context.device_name());
///     Ok(())
/// }
/// ```
///
/// [`ComputePlatform`]: ingot_core::ComputePlatform
/// [`ComputeCommand`]: ingot_core::ComputeCommand
pub struct Context {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    reflection: ReflectionMode,
}

impl Context {
    /// Initialize a context on the adapter selected by `config`.
    ///
    /// # Errors
    /// Returns an error if no suitable GPU is found or initialization fails.
    pub async fn new(config: &ContextConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends.to_wgpu(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference.to_wgpu(),
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await
            .map_err(|e| {
                RuntimeError::InitError(format!("Failed to find suitable GPU adapter: {e}"))
            })?;

        Self::with_adapter(&adapter, config).await
    }

    /// Initialize a context on a specific adapter.
    ///
    /// The device is created with the adapter's full limits so capability
    /// queries report what the hardware supports.
    pub async fn with_adapter(adapter: &wgpu::Adapter, config: &ContextConfig) -> Result<Self> {
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: config.label.as_deref(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| RuntimeError::InitError(format!("Failed to create device: {e}")))?;

        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            reflection = ?config.reflection,
            "Created GPU context"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            reflection: config.reflection,
        })
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Reflection strategy used for every pipeline this context creates.
    pub fn reflection_mode(&self) -> ReflectionMode {
        self.reflection
    }

    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    pub fn features(&self) -> wgpu::Features {
        self.device.features()
    }

    pub fn supports_features(&self, features: wgpu::Features) -> bool {
        self.device.features().contains(features)
    }

    /// Largest total size of workgroup memory a pipeline may declare.
    pub fn max_workgroup_storage_size(&self) -> u32 {
        self.device.limits().max_compute_workgroup_storage_size
    }

    pub fn max_buffer_size(&self) -> u64 {
        self.device.limits().max_buffer_size
    }

    /// Per-axis maximum of `@workgroup_size`.
    pub fn max_threads_per_workgroup(&self) -> GridSize {
        let limits = self.device.limits();
        GridSize::new(
            limits.max_compute_workgroup_size_x,
            limits.max_compute_workgroup_size_y,
            limits.max_compute_workgroup_size_z,
        )
    }

    /// Maximum product of the `@workgroup_size` components.
    pub fn max_invocations_per_workgroup(&self) -> u32 {
        self.device.limits().max_compute_invocations_per_workgroup
    }

    pub fn max_workgroups_per_dimension(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    pub fn min_storage_buffer_offset_alignment(&self) -> u32 {
        self.device.limits().min_storage_buffer_offset_alignment
    }

    pub fn min_uniform_buffer_offset_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }

    /// Largest 2-D texture size with the aspect ratio of `desired` that the
    /// device supports.
    pub fn max_texture_size(&self, desired: GridSize) -> GridSize {
        fit_texture_size(desired, self.device.limits().max_texture_dimension_2d)
    }

    /// Compose and validate a WGSL library.
    pub fn library(&self, source: &str, options: &LibraryOptions) -> Result<Library> {
        Library::from_source(source, options)
    }

    /// Read and compose a WGSL library from disk. The file path is used for
    /// diagnostics unless `options` sets one.
    pub fn library_from_file(
        &self,
        path: impl AsRef<Path>,
        options: Option<LibraryOptions>,
    ) -> Result<Library> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let options =
            options.unwrap_or_else(|| LibraryOptions::new(path.display().to_string()));
        Library::from_source(&source, &options)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field("reflection", &self.reflection)
            .finish_non_exhaustive()
    }
}

/// Clamp `desired` so neither side exceeds `max_side`, keeping its aspect
/// ratio. Empty sizes map to zero.
pub(crate) fn fit_texture_size(desired: GridSize, max_side: u32) -> GridSize {
    if desired.width == 0 || desired.height == 0 {
        return GridSize::new(0, 0, 1);
    }

    let aspect_ratio = desired.width as f64 / desired.height as f64;
    if aspect_ratio > 1.0 {
        let width = desired.width.min(max_side);
        let height = (width as f64 / aspect_ratio).round() as u32;
        GridSize::new(width, height.max(1), 1)
    } else {
        let height = desired.height.min(max_side);
        let width = (height as f64 * aspect_ratio).round() as u32;
        GridSize::new(width.max(1), height, 1)
    }
}
