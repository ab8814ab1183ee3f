//! Reflection-driven argument binding for GPU compute pipelines.
//!
//! This crate holds the platform-independent half of ingot:
//! - Capability traits describing what a GPU platform must provide
//!   (`ComputePlatform`, `ComputeEncoder`)
//! - The reflection data contract (`BindingDescriptor`, `PipelineReflection`)
//! - Dispatch geometry (`GridSize`, `Dispatch`)
//! - `ComputeCommand`, which maps parameter names to binding slots and
//!   materializes assigned values onto an encoder before a dispatch
//!
//! Concrete platforms live in their own crates (see `ingot-wgpu`).
//!
//! # Example
//!
//! ```ignore
//! use ingot_core::{ComputeCommand, Dispatch, GridSize};
//!
//! let mut command = ComputeCommand::new(&platform, &library, "scale", None)?;
//! command.set_buffer("input", input_buffer);
//! command.set_buffer("output", output_buffer);
//! command.set_int("inputOffset", 256);
//!
//! command.encode(
//!     &mut encoder,
//!     Dispatch::threads(GridSize::linear(1024), GridSize::linear(64)),
//! )?;
//! ```

pub mod command;
pub mod error;
pub mod platform;
pub mod types;

pub use command::{BindingTable, ComputeCommand};
pub use error::{EncodeError, Error, Result};
pub use platform::{ComputeEncoder, ComputePlatform};
pub use types::{
    BindingDescriptor, BindingKind, Dispatch, FunctionConstants, GridSize, PipelineReflection,
};
