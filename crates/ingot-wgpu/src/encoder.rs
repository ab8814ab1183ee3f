//! Compute pass encoding for [`ComputeCommand`](ingot_core::ComputeCommand).

use crate::context::Context;
use crate::platform::Pipeline;
use ingot_core::{ComputeEncoder, Dispatch, EncodeError};
use tracing::{debug, warn};

/// Collects the state a command binds and records it as one compute pass
/// when dispatched.
///
/// All resources share bind group 0; each slot index is the WGSL
/// `@binding` number.
pub struct ComputePassEncoder<'a> {
    context: &'a Context,
    encoder: &'a mut wgpu::CommandEncoder,

    pipeline: Option<Pipeline>,
    textures: Vec<(u32, wgpu::TextureView)>,
    samplers: Vec<(u32, wgpu::Sampler)>,
    buffers: Vec<(u32, wgpu::Buffer, u64)>,
    shared_memory: Vec<(u32, u64)>,
}

impl<'a> ComputePassEncoder<'a> {
    pub fn new(context: &'a Context, encoder: &'a mut wgpu::CommandEncoder) -> Self {
        Self {
            context,
            encoder,
            pipeline: None,
            textures: Vec::new(),
            samplers: Vec::new(),
            buffers: Vec::new(),
            shared_memory: Vec::new(),
        }
    }

    fn check_buffers(&self, pipeline: &Pipeline) -> Result<(), EncodeError> {
        for (index, buffer, offset) in &self.buffers {
            if *offset >= buffer.size() {
                return Err(EncodeError::Backend(format!(
                    "Offset {offset} of buffer {index} is past its end ({} bytes)",
                    buffer.size()
                )));
            }

            let alignment = match pipeline.buffer_binding_type(*index) {
                Some(wgpu::BufferBindingType::Uniform) => {
                    self.context.min_uniform_buffer_offset_alignment()
                }
                _ => self.context.min_storage_buffer_offset_alignment(),
            };
            if *offset % u64::from(alignment) != 0 {
                return Err(EncodeError::Backend(format!(
                    "Offset {offset} of buffer {index} is not a multiple of {alignment}"
                )));
            }
        }
        Ok(())
    }

    fn check_shared_memory(&self, pipeline: &Pipeline) -> Result<(), EncodeError> {
        let limit = u64::from(self.context.max_workgroup_storage_size());
        for (index, length) in &self.shared_memory {
            if *length > limit {
                return Err(EncodeError::Backend(format!(
                    "Shared memory {index} length {length} exceeds device limit {limit}"
                )));
            }
            // WGSL sizes workgroup memory statically
            if let Some(declared) = pipeline.shared_memory_size(*index)
                && declared != *length
            {
                debug!(index, length, declared, "Shared memory length differs from declaration");
            }
        }
        Ok(())
    }

    fn check_dispatch(&self, pipeline: &Pipeline, dispatch: &Dispatch) -> Result<(), EncodeError> {
        let group_size: [u32; 3] = dispatch.group_size().into();
        if group_size != pipeline.workgroup_size {
            warn!(
                requested = %dispatch.group_size(),
                declared = ?pipeline.workgroup_size,
                "Dispatch group size does not match @workgroup_size"
            );
        }

        let limit = self.context.max_workgroups_per_dimension();
        let count = dispatch.group_count();
        if count.width > limit || count.height > limit || count.depth > limit {
            return Err(EncodeError::Backend(format!(
                "Workgroup count {count} exceeds device limit {limit} per dimension"
            )));
        }
        Ok(())
    }
}

impl ComputeEncoder<Context> for ComputePassEncoder<'_> {
    fn set_pipeline(&mut self, pipeline: &Pipeline) {
        self.pipeline = Some(pipeline.clone());
    }

    fn set_texture(&mut self, texture: &wgpu::TextureView, index: u32) {
        self.textures.push((index, texture.clone()));
    }

    fn set_sampler(&mut self, sampler: &wgpu::Sampler, index: u32) {
        self.samplers.push((index, sampler.clone()));
    }

    fn set_buffer(&mut self, buffer: &wgpu::Buffer, offset: u64, index: u32) {
        self.buffers.push((index, buffer.clone(), offset));
    }

    fn set_shared_memory_length(&mut self, length: u64, index: u32) {
        self.shared_memory.push((index, length));
    }

    fn dispatch(&mut self, dispatch: Dispatch) -> Result<(), EncodeError> {
        let pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| EncodeError::Backend("No pipeline set before dispatch".to_string()))?;

        self.check_buffers(&pipeline)?;
        self.check_shared_memory(&pipeline)?;
        self.check_dispatch(&pipeline, &dispatch)?;

        let mut entries = Vec::new();
        for (index, view) in &self.textures {
            entries.push(wgpu::BindGroupEntry {
                binding: *index,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        for (index, sampler) in &self.samplers {
            entries.push(wgpu::BindGroupEntry {
                binding: *index,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        for (index, buffer, offset) in &self.buffers {
            entries.push(wgpu::BindGroupEntry {
                binding: *index,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: *offset,
                    size: None,
                }),
            });
        }

        let bind_group = self
            .context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Bind Group: {}", pipeline.label)),
                layout: &pipeline.bind_group_layout,
                entries: &entries,
            });
        drop(entries);

        let count = dispatch.group_count();
        {
            let mut compute_pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&pipeline.label),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&pipeline.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(count.width, count.height, count.depth);
        }

        debug!(pipeline = %pipeline.label, groups = %count, "Dispatched compute pass");

        self.textures.clear();
        self.samplers.clear();
        self.buffers.clear();
        self.shared_memory.clear();
        Ok(())
    }
}
