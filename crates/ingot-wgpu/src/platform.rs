//! `ComputePlatform` implementation on top of wgpu.

use crate::context::Context;
use crate::encoder::ComputePassEncoder;
use crate::library::Library;
use ingot_core::{
    ComputeCommand, ComputePlatform, Dispatch, EncodeError, Error, FunctionConstants,
    PipelineReflection, Result,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

/// A resolved compute entry point with its override values.
#[derive(Debug, Clone)]
pub struct Function {
    library: Library,
    entry_point: String,
    constants: Vec<(String, f64)>,
}

impl Function {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// A compute pipeline and the layout its bind group must match.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) label: String,
    pub(crate) pipeline: wgpu::ComputePipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) layout_entries: Vec<wgpu::BindGroupLayoutEntry>,
    pub(crate) workgroup_size: [u32; 3],
    pub(crate) shared_memory_sizes: BTreeMap<u32, u64>,
}

impl Pipeline {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn compute_pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    /// `@workgroup_size` declared by the entry point.
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    /// Declared byte size of a shared-memory binding.
    pub fn shared_memory_size(&self, index: u32) -> Option<u64> {
        self.shared_memory_sizes.get(&index).copied()
    }

    /// Buffer binding type of slot `binding`, if it is a buffer.
    pub(crate) fn buffer_binding_type(&self, binding: u32) -> Option<wgpu::BufferBindingType> {
        self.layout_entries
            .iter()
            .find(|entry| entry.binding == binding)
            .and_then(|entry| match entry.ty {
                wgpu::BindingType::Buffer { ty, .. } => Some(ty),
                _ => None,
            })
    }
}

impl ComputePlatform for Context {
    type Library = Library;
    type Function = Function;
    type Pipeline = Pipeline;
    type Buffer = wgpu::Buffer;
    type Texture = wgpu::TextureView;
    type Sampler = wgpu::Sampler;

    fn resolve_entry_point(
        &self,
        library: &Library,
        name: &str,
        constants: Option<&FunctionConstants>,
    ) -> Result<Function> {
        if !library.entry_points().any(|ep| ep == name) {
            return Err(Error::ProgramResolution {
                name: name.to_string(),
                reason: format!("no compute entry point in '{}'", library.label()),
            });
        }

        let overrides: Vec<String> = library.overrides().collect();
        let constants = constants
            .map(|constants| {
                constants
                    .iter()
                    .map(|(constant, value)| {
                        if overrides.iter().any(|o| o == constant) {
                            Ok((constant.to_string(), value))
                        } else {
                            Err(Error::ProgramResolution {
                                name: name.to_string(),
                                reason: format!("no override named '{constant}'"),
                            })
                        }
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Function {
            library: library.clone(),
            entry_point: name.to_string(),
            constants,
        })
    }

    #[tracing::instrument(skip_all, fields(entry_point = %function.entry_point))]
    fn create_pipeline(&self, function: Function) -> Result<(Pipeline, PipelineReflection)> {
        let reflection = function
            .library
            .reflect(&function.entry_point, self.reflection_mode())?;
        let label = format!("{}::{}", function.library.label(), function.entry_point);

        let device = self.device();
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(function.library.module().clone())),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("Bind Group Layout: {label}")),
            entries: &reflection.layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("Pipeline Layout: {label}")),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let constants: Vec<(&str, f64)> = function
            .constants
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("Pipeline: {label}")),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some(&function.entry_point),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
            cache: None,
        });

        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(Error::PipelineCreation(error.to_string()));
        }

        debug!(
            bindings = reflection.bindings.bindings.len(),
            workgroup_size = ?reflection.workgroup_size,
            "Created compute pipeline"
        );

        Ok((
            Pipeline {
                label,
                pipeline,
                bind_group_layout,
                layout_entries: reflection.layout_entries,
                workgroup_size: reflection.workgroup_size,
                shared_memory_sizes: reflection.shared_memory_sizes,
            },
            reflection.bindings,
        ))
    }
}

impl Context {
    /// Create a command for `name` in `library`.
    pub fn compute_command(
        &self,
        library: &Library,
        name: &str,
        constants: Option<&FunctionConstants>,
    ) -> Result<ComputeCommand<Context>> {
        ComputeCommand::new(self, library, name, constants)
    }

    /// Encode `command` as one compute pass on `encoder`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        command: &ComputeCommand<Context>,
        dispatch: Dispatch,
    ) -> std::result::Result<(), EncodeError> {
        let mut pass = ComputePassEncoder::new(self, encoder);
        command.encode(&mut pass, dispatch)
    }
}
