//! Common test utilities for binder tests.
//!
//! Provides an in-memory platform whose encoder records every call, so
//! tests can assert exactly what `ComputeCommand::encode` emitted.

use ingot_core::{
    BindingDescriptor, BindingKind, ComputeEncoder, ComputePlatform, Dispatch, EncodeError, Error,
    FunctionConstants, PipelineReflection, Result,
};
use std::collections::HashMap;

/// A labelled stand-in for a GPU resource handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle(pub String);

impl Handle {
    pub fn new(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// An entry point in a mock library.
#[derive(Debug, Clone)]
pub struct MockEntryPoint {
    pub bindings: Vec<BindingDescriptor>,
    /// When set, pipeline creation fails with this message.
    pub compile_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockLibrary {
    pub entry_points: HashMap<String, MockEntryPoint>,
}

impl MockLibrary {
    pub fn with_entry_point(mut self, name: &str, bindings: Vec<BindingDescriptor>) -> Self {
        self.entry_points.insert(
            name.to_string(),
            MockEntryPoint {
                bindings,
                compile_error: None,
            },
        );
        self
    }

    pub fn with_broken_entry_point(mut self, name: &str, message: &str) -> Self {
        self.entry_points.insert(
            name.to_string(),
            MockEntryPoint {
                bindings: Vec::new(),
                compile_error: Some(message.to_string()),
            },
        );
        self
    }
}

#[derive(Debug)]
pub struct MockFunction {
    pub name: String,
    pub entry_point: MockEntryPoint,
    pub constants: FunctionConstants,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPipeline {
    pub name: String,
    pub constants: FunctionConstants,
}

pub struct MockPlatform;

impl ComputePlatform for MockPlatform {
    type Library = MockLibrary;
    type Function = MockFunction;
    type Pipeline = MockPipeline;
    type Buffer = Handle;
    type Texture = Handle;
    type Sampler = Handle;

    fn resolve_entry_point(
        &self,
        library: &MockLibrary,
        name: &str,
        constants: Option<&FunctionConstants>,
    ) -> Result<MockFunction> {
        let entry_point =
            library
                .entry_points
                .get(name)
                .cloned()
                .ok_or_else(|| Error::ProgramResolution {
                    name: name.to_string(),
                    reason: "no such function".to_string(),
                })?;

        Ok(MockFunction {
            name: name.to_string(),
            entry_point,
            constants: constants.cloned().unwrap_or_default(),
        })
    }

    fn create_pipeline(&self, function: MockFunction) -> Result<(MockPipeline, PipelineReflection)> {
        if let Some(message) = function.entry_point.compile_error {
            return Err(Error::PipelineCreation(message));
        }

        Ok((
            MockPipeline {
                name: function.name,
                constants: function.constants,
            },
            PipelineReflection::new(function.entry_point.bindings),
        ))
    }
}

/// One call received by the recording encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetPipeline(String),
    SetTexture(String, u32),
    SetSampler(String, u32),
    SetBuffer(String, u64, u32),
    SetSharedMemoryLength(u64, u32),
    Dispatch(Dispatch),
}

#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub calls: Vec<Call>,
}

impl ComputeEncoder<MockPlatform> for RecordingEncoder {
    fn set_pipeline(&mut self, pipeline: &MockPipeline) {
        self.calls.push(Call::SetPipeline(pipeline.name.clone()));
    }

    fn set_texture(&mut self, texture: &Handle, index: u32) {
        self.calls.push(Call::SetTexture(texture.0.clone(), index));
    }

    fn set_sampler(&mut self, sampler: &Handle, index: u32) {
        self.calls.push(Call::SetSampler(sampler.0.clone(), index));
    }

    fn set_buffer(&mut self, buffer: &Handle, offset: u64, index: u32) {
        self.calls.push(Call::SetBuffer(buffer.0.clone(), offset, index));
    }

    fn set_shared_memory_length(&mut self, length: u64, index: u32) {
        self.calls.push(Call::SetSharedMemoryLength(length, index));
    }

    fn dispatch(&mut self, dispatch: Dispatch) -> std::result::Result<(), EncodeError> {
        self.calls.push(Call::Dispatch(dispatch));
        Ok(())
    }
}

/// Bindings of a typical image-processing kernel.
pub fn blur_bindings() -> Vec<BindingDescriptor> {
    vec![
        BindingDescriptor::new("source", 0, BindingKind::Texture),
        BindingDescriptor::new("destination", 1, BindingKind::Texture),
        BindingDescriptor::new("linear", 0, BindingKind::Sampler),
        BindingDescriptor::new("weights", 0, BindingKind::Buffer),
        BindingDescriptor::new("params", 1, BindingKind::Buffer),
        BindingDescriptor::new("tile", 0, BindingKind::SharedMemory),
        BindingDescriptor::new("immediates", 7, BindingKind::Other),
    ]
}

pub fn blur_library() -> MockLibrary {
    MockLibrary::default()
        .with_entry_point("blur", blur_bindings())
        .with_broken_entry_point("broken", "unresolved identifier `frobnicate`")
}

/// Assign every required argument of the blur kernel.
pub fn configure_blur(command: &mut ingot_core::ComputeCommand<MockPlatform>) {
    command.set_texture("source", Handle::new("src"));
    command.set_texture("destination", Handle::new("dst"));
    command.set_sampler("linear", Handle::new("bilinear"));
    command.set_buffer("weights", Handle::new("w"));
    command.set_buffer("params", Handle::new("p"));
}
