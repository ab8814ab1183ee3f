//! By-name argument binding for a compiled compute pipeline.
//!
//! A `ComputeCommand` owns a pipeline and the binding table reflected from
//! it. Callers assign resources by parameter name in any order; `encode`
//! then attaches every assigned value to its binding slot and dispatches.
//!
//! Integer assignments are routed by suffix:
//! - `<buffer>Offset` sets the byte offset of buffer `<buffer>`
//! - `<name>MemoryLength` sets the byte length of shared memory `<name>`

use crate::error::{EncodeError, Result};
use crate::platform::{ComputeEncoder, ComputePlatform};
use crate::types::{BindingKind, Dispatch, FunctionConstants, PipelineReflection};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

const BUFFER_OFFSET_SUFFIX: &str = "Offset";
const SHARED_MEMORY_LENGTH_SUFFIX: &str = "MemoryLength";

/// Parameter name to binding slot, partitioned by resource kind.
///
/// Built once from reflection and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    buffers: BTreeMap<String, u32>,
    textures: BTreeMap<String, u32>,
    samplers: BTreeMap<String, u32>,
    shared_memory: BTreeMap<String, u32>,
}

impl BindingTable {
    /// Partition reflected bindings by kind. `Other` bindings are dropped.
    pub fn from_reflection(reflection: &PipelineReflection) -> Self {
        let mut table = Self::default();
        for binding in &reflection.bindings {
            let slots = match binding.kind {
                BindingKind::Buffer => &mut table.buffers,
                BindingKind::Texture => &mut table.textures,
                BindingKind::Sampler => &mut table.samplers,
                BindingKind::SharedMemory => &mut table.shared_memory,
                BindingKind::Other => continue,
            };
            slots.insert(binding.name.clone(), binding.index);
        }
        table
    }

    fn slots(&self, kind: BindingKind) -> Option<&BTreeMap<String, u32>> {
        match kind {
            BindingKind::Buffer => Some(&self.buffers),
            BindingKind::Texture => Some(&self.textures),
            BindingKind::Sampler => Some(&self.samplers),
            BindingKind::SharedMemory => Some(&self.shared_memory),
            BindingKind::Other => None,
        }
    }

    /// Binding slot of `name` among bindings of `kind`.
    pub fn index(&self, kind: BindingKind, name: &str) -> Option<u32> {
        self.slots(kind).and_then(|slots| slots.get(name).copied())
    }

    pub fn contains(&self, kind: BindingKind, name: &str) -> bool {
        self.index(kind, name).is_some()
    }

    /// Iterate `(name, slot)` pairs of one kind, ordered by name.
    pub fn iter(&self, kind: BindingKind) -> impl Iterator<Item = (&str, u32)> {
        self.slots(kind)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|(name, index)| (name.as_str(), *index)))
    }

    /// Total number of managed bindings.
    pub fn len(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.samplers.len() + self.shared_memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Base name of `name` with `suffix` removed, if something remains.
fn strip_suffix<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    name.strip_suffix(suffix).filter(|base| !base.is_empty())
}

/// A compute pipeline with late, by-name argument assignment.
///
/// Setters take `&mut self`, so assignment is single-writer by construction.
/// Resource handles are shared clones; the command never allocates or frees
/// GPU memory.
pub struct ComputeCommand<P: ComputePlatform> {
    pipeline: P::Pipeline,
    bindings: BindingTable,

    buffers: HashMap<String, P::Buffer>,
    buffer_offsets: HashMap<String, u64>,
    textures: HashMap<String, P::Texture>,
    samplers: HashMap<String, P::Sampler>,
    shared_memory_lengths: HashMap<String, i64>,
}

impl<P: ComputePlatform> ComputeCommand<P> {
    /// Resolve `name` in `library`, create its pipeline and build the
    /// binding table from the pipeline's reflection.
    ///
    /// # Errors
    /// - `Error::ProgramResolution` if the entry point does not exist
    /// - `Error::PipelineCreation` if the platform rejects the pipeline
    #[tracing::instrument(skip_all, fields(entry_point = name))]
    pub fn new(
        platform: &P,
        library: &P::Library,
        name: &str,
        constants: Option<&FunctionConstants>,
    ) -> Result<Self> {
        let function = platform.resolve_entry_point(library, name, constants)?;
        let (pipeline, reflection) = platform.create_pipeline(function)?;
        Ok(Self::from_parts(pipeline, &reflection))
    }

    /// Build a command around an already created pipeline.
    pub fn from_parts(pipeline: P::Pipeline, reflection: &PipelineReflection) -> Self {
        let bindings = BindingTable::from_reflection(reflection);
        debug!(
            buffers = bindings.buffers.len(),
            textures = bindings.textures.len(),
            samplers = bindings.samplers.len(),
            shared_memory = bindings.shared_memory.len(),
            "Built binding table"
        );

        Self {
            pipeline,
            bindings,
            buffers: HashMap::new(),
            buffer_offsets: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            shared_memory_lengths: HashMap::new(),
        }
    }

    pub fn pipeline(&self) -> &P::Pipeline {
        &self.pipeline
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Assign a buffer. Unknown names are ignored with a warning.
    pub fn set_buffer(&mut self, name: &str, buffer: P::Buffer) {
        if self.bindings.contains(BindingKind::Buffer, name) {
            self.buffers.insert(name.to_string(), buffer);
        } else {
            warn!("No buffer argument named '{name}', assignment ignored");
        }
    }

    /// Assign a texture. Unknown names are ignored with a warning.
    pub fn set_texture(&mut self, name: &str, texture: P::Texture) {
        if self.bindings.contains(BindingKind::Texture, name) {
            self.textures.insert(name.to_string(), texture);
        } else {
            warn!("No texture argument named '{name}', assignment ignored");
        }
    }

    /// Assign a sampler. Unknown names are ignored with a warning.
    pub fn set_sampler(&mut self, name: &str, sampler: P::Sampler) {
        if self.bindings.contains(BindingKind::Sampler, name) {
            self.samplers.insert(name.to_string(), sampler);
        } else {
            warn!("No sampler argument named '{name}', assignment ignored");
        }
    }

    /// Assign an integer argument.
    ///
    /// `<buffer>Offset` records a byte offset for a known buffer and
    /// `<name>MemoryLength` records a byte length for a known shared-memory
    /// binding. Anything else is ignored with a warning.
    pub fn set_int(&mut self, name: &str, value: i64) {
        if let Some(buffer) = strip_suffix(name, BUFFER_OFFSET_SUFFIX)
            && self.bindings.contains(BindingKind::Buffer, buffer)
        {
            match u64::try_from(value) {
                Ok(offset) => {
                    self.buffer_offsets.insert(buffer.to_string(), offset);
                }
                Err(_) => warn!("Negative offset {value} for buffer '{buffer}' ignored"),
            }
            return;
        }

        if let Some(memory) = strip_suffix(name, SHARED_MEMORY_LENGTH_SUFFIX)
            && self.bindings.contains(BindingKind::SharedMemory, memory)
        {
            self.shared_memory_lengths.insert(memory.to_string(), value);
            return;
        }

        warn!("Integer assignment failed, no argument matches '{name}'");
    }

    /// Remove whatever value is recorded under `name`.
    ///
    /// Suffixed names clear the offset or length of their base binding.
    pub fn unset(&mut self, name: &str) {
        if let Some(buffer) = strip_suffix(name, BUFFER_OFFSET_SUFFIX)
            && self.buffer_offsets.remove(buffer).is_some()
        {
            return;
        }
        if let Some(memory) = strip_suffix(name, SHARED_MEMORY_LENGTH_SUFFIX)
            && self.shared_memory_lengths.remove(memory).is_some()
        {
            return;
        }
        self.buffers.remove(name);
        self.textures.remove(name);
        self.samplers.remove(name);
    }

    pub fn buffer(&self, name: &str) -> Option<&P::Buffer> {
        self.buffers.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<&P::Texture> {
        self.textures.get(name)
    }

    pub fn sampler(&self, name: &str) -> Option<&P::Sampler> {
        self.samplers.get(name)
    }

    /// Recorded byte offset of buffer `name`, if explicitly set.
    pub fn buffer_offset(&self, name: &str) -> Option<u64> {
        self.buffer_offsets.get(name).copied()
    }

    /// Recorded byte length of shared memory `name`, if set.
    pub fn shared_memory_length(&self, name: &str) -> Option<i64> {
        self.shared_memory_lengths.get(name).copied()
    }

    /// Read back an integer argument using the same suffix routing as
    /// [`set_int`](Self::set_int).
    pub fn int(&self, name: &str) -> Option<i64> {
        if let Some(offset) = strip_suffix(name, BUFFER_OFFSET_SUFFIX)
            .and_then(|buffer| self.buffer_offset(buffer))
        {
            return i64::try_from(offset).ok();
        }
        strip_suffix(name, SHARED_MEMORY_LENGTH_SUFFIX)
            .and_then(|memory| self.shared_memory_length(memory))
    }

    /// Required bindings that have no value yet, in encode order.
    pub fn missing_arguments(&self) -> Vec<(BindingKind, &str)> {
        let textures = self
            .bindings
            .iter(BindingKind::Texture)
            .filter(|(name, _)| !self.textures.contains_key(*name))
            .map(|(name, _)| (BindingKind::Texture, name));
        let samplers = self
            .bindings
            .iter(BindingKind::Sampler)
            .filter(|(name, _)| !self.samplers.contains_key(*name))
            .map(|(name, _)| (BindingKind::Sampler, name));
        let buffers = self
            .bindings
            .iter(BindingKind::Buffer)
            .filter(|(name, _)| !self.buffers.contains_key(*name))
            .map(|(name, _)| (BindingKind::Buffer, name));

        textures.chain(samplers).chain(buffers).collect()
    }

    /// Attach every assigned value to its slot on `encoder` and dispatch.
    ///
    /// All textures, samplers and buffers are required; the first missing
    /// one fails the encode before anything reaches the encoder. Buffer
    /// offsets default to zero. Shared memory without a positive length is
    /// skipped with a warning.
    pub fn encode<E>(&self, encoder: &mut E, dispatch: Dispatch) -> std::result::Result<(), EncodeError>
    where
        E: ComputeEncoder<P> + ?Sized,
    {
        if let Some((kind, name)) = self.missing_arguments().into_iter().next() {
            return Err(EncodeError::MissingArgument {
                kind,
                name: name.to_string(),
            });
        }

        encoder.set_pipeline(&self.pipeline);

        for (name, index) in self.bindings.iter(BindingKind::Texture) {
            if let Some(texture) = self.textures.get(name) {
                encoder.set_texture(texture, index);
            }
        }

        for (name, index) in self.bindings.iter(BindingKind::Sampler) {
            if let Some(sampler) = self.samplers.get(name) {
                encoder.set_sampler(sampler, index);
            }
        }

        for (name, index) in self.bindings.iter(BindingKind::Buffer) {
            if let Some(buffer) = self.buffers.get(name) {
                let offset = self.buffer_offsets.get(name).copied().unwrap_or(0);
                encoder.set_buffer(buffer, offset, index);
            }
        }

        for (name, index) in self.bindings.iter(BindingKind::SharedMemory) {
            let length = self.shared_memory_lengths.get(name).copied().unwrap_or(0);
            if length <= 0 {
                warn!("Shared memory '{name}' has no usable length ({length}), skipping");
                continue;
            }
            encoder.set_shared_memory_length(length as u64, index);
        }

        encoder.dispatch(dispatch)
    }
}

impl<P: ComputePlatform> fmt::Debug for ComputeCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeCommand")
            .field("bindings", &self.bindings)
            .field("buffers", &self.buffers.keys().collect::<Vec<_>>())
            .field("buffer_offsets", &self.buffer_offsets)
            .field("textures", &self.textures.keys().collect::<Vec<_>>())
            .field("samplers", &self.samplers.keys().collect::<Vec<_>>())
            .field("shared_memory_lengths", &self.shared_memory_lengths)
            .finish_non_exhaustive()
    }
}
