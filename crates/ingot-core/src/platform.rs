//! Capability traits a GPU platform implements for `ComputeCommand`.
//!
//! A platform is responsible for everything below the binder: loading
//! programs, compiling pipelines, producing reflection metadata and turning
//! bound resources into actual GPU work.

use crate::error::{EncodeError, Result};
use crate::types::{Dispatch, FunctionConstants, PipelineReflection};

/// Program resolution and pipeline creation.
pub trait ComputePlatform {
    /// A loaded program containing one or more entry points.
    type Library;

    /// A resolved entry point, specialized with constants.
    type Function;

    /// An executable compute pipeline.
    type Pipeline;

    /// Buffer handle. Cloning shares the underlying GPU resource.
    type Buffer: Clone;

    /// Texture handle. Cloning shares the underlying GPU resource.
    type Texture: Clone;

    /// Sampler handle. Cloning shares the underlying GPU resource.
    type Sampler: Clone;

    /// Look up `name` in `library`, applying specialization constants.
    ///
    /// Returns `Error::ProgramResolution` if the entry point does not exist.
    fn resolve_entry_point(
        &self,
        library: &Self::Library,
        name: &str,
        constants: Option<&FunctionConstants>,
    ) -> Result<Self::Function>;

    /// Compile `function` into a pipeline and return its reflection data.
    ///
    /// Returns `Error::PipelineCreation` if the driver rejects the pipeline.
    fn create_pipeline(
        &self,
        function: Self::Function,
    ) -> Result<(Self::Pipeline, PipelineReflection)>;
}

/// A command-encoding context for one compute dispatch.
pub trait ComputeEncoder<P: ComputePlatform + ?Sized> {
    fn set_pipeline(&mut self, pipeline: &P::Pipeline);

    fn set_texture(&mut self, texture: &P::Texture, index: u32);

    fn set_sampler(&mut self, sampler: &P::Sampler, index: u32);

    fn set_buffer(&mut self, buffer: &P::Buffer, offset: u64, index: u32);

    fn set_shared_memory_length(&mut self, length: u64, index: u32);

    /// Issue the dispatch with the state set so far.
    fn dispatch(&mut self, dispatch: Dispatch) -> std::result::Result<(), EncodeError>;
}
