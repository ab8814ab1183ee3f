//! wgpu platform for ingot compute commands.
//!
//! This crate implements `ingot_core::ComputePlatform` for WGSL shaders:
//! - `Library` composes WGSL with naga_oil and validates it with naga
//! - Pipeline reflection reads bindings from naga IR, either per entry
//!   point or for the whole module (`ReflectionMode`)
//! - `Context` owns the device, answers capability queries, allocates
//!   resources and encodes commands into compute passes
//!
//! # Example
//!
//! ```no_run
//! use ingot_core::{Dispatch, GridSize};
//! use ingot_wgpu::{Context, ContextConfig, LibraryOptions};
//!
//! # async fn run() -> ingot_wgpu::Result<()> {
//! let context = Context::new(&ContextConfig::default()).await?;
//! let library = context.library(
//!     include_str!("../tests/shaders/scale.wgsl"),
//!     &LibraryOptions::new("scale.wgsl"),
//! )?;
//!
//! let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC;
//! let input = context.buffer_with_values(&[1.0f32, 2.0, 3.0, 4.0], usage)?;
//! let output = context.buffer_for::<f32>(4, usage)?;
//!
//! let mut command = context.compute_command(&library, "scale", None)?;
//! command.set_buffer("input", input);
//! command.set_buffer("output", output.clone());
//!
//! let mut encoder = context.command_encoder(Some("scale"));
//! context.encode(
//!     &mut encoder,
//!     &command,
//!     Dispatch::threads(GridSize::linear(4), GridSize::linear(64)),
//! )?;
//! context.submit_and_wait(encoder)?;
//!
//! let values: Vec<f32> = context.read_buffer(&output)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod encoder;
pub mod error;
pub mod library;
pub mod platform;
pub mod reflection;
mod resources;

pub use config::{BackendSelection, ContextConfig, PowerPreference, ReflectionMode};
pub use context::Context;
pub use encoder::ComputePassEncoder;
pub use error::{Result, RuntimeError};
pub use library::{Library, LibraryOptions};
pub use platform::{Function, Pipeline};
pub use reflection::EntryPointReflection;
