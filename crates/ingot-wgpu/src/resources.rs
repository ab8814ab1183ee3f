//! Resource factories, submission and readback.

use crate::context::Context;
use crate::error::{Result, RuntimeError};
use wgpu::util::DeviceExt;

/// Size in bytes of `count` values of `T`.
fn byte_length<T>(count: usize) -> Result<u64> {
    std::mem::size_of::<T>()
        .checked_mul(count)
        .and_then(|length| u64::try_from(length).ok())
        .ok_or_else(|| {
            RuntimeError::AllocationError(format!(
                "{count} values of {} overflow a buffer size",
                std::any::type_name::<T>()
            ))
        })
}

impl Context {
    fn check_buffer_size(&self, size: u64) -> Result<()> {
        let max = self.max_buffer_size();
        if size > max {
            return Err(RuntimeError::AllocationError(format!(
                "Buffer size {size} exceeds device limit {max}"
            )));
        }
        Ok(())
    }

    fn check_texture_size(&self, width: u32, height: u32) -> Result<()> {
        let max = self.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RuntimeError::AllocationError(format!(
                "Texture size {width}x{height} is outside 1..={max}"
            )));
        }
        Ok(())
    }

    /// Allocate an uninitialized buffer of `length` bytes.
    pub fn buffer(&self, length: u64, usage: wgpu::BufferUsages) -> Result<wgpu::Buffer> {
        self.check_buffer_size(length)?;
        Ok(self.device().create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: length,
            usage,
            mapped_at_creation: false,
        }))
    }

    /// Allocate a buffer sized for `count` values of `T`.
    pub fn buffer_for<T: bytemuck::Pod>(
        &self,
        count: usize,
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        self.buffer(byte_length::<T>(count)?, usage)
    }

    /// Allocate a buffer holding a single value.
    pub fn buffer_with_value<T: bytemuck::Pod>(
        &self,
        value: &T,
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        self.buffer_with_values(std::slice::from_ref(value), usage)
    }

    /// Allocate a buffer initialized with `values`.
    pub fn buffer_with_values<T: bytemuck::Pod>(
        &self,
        values: &[T],
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        let contents: &[u8] = bytemuck::cast_slice(values);
        self.check_buffer_size(contents.len() as u64)?;
        Ok(self
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents,
                usage,
            }))
    }

    /// Allocate a 2-D texture with a single mip level.
    pub fn texture(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Result<wgpu::Texture> {
        self.texture_with_descriptor(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
    }

    pub fn texture_with_descriptor(
        &self,
        descriptor: &wgpu::TextureDescriptor<'_>,
    ) -> Result<wgpu::Texture> {
        self.check_texture_size(descriptor.size.width, descriptor.size.height)?;
        Ok(self.device().create_texture(descriptor))
    }

    /// Allocate a `Depth32Float` texture usable as a binding.
    pub fn depth_buffer(&self, width: u32, height: u32) -> Result<wgpu::Texture> {
        self.texture(
            width,
            height,
            wgpu::TextureFormat::Depth32Float,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
    }

    pub fn sampler(&self, descriptor: &wgpu::SamplerDescriptor<'_>) -> wgpu::Sampler {
        self.device().create_sampler(descriptor)
    }

    pub fn command_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }

    /// Submit `encoder` and block until the GPU has finished it.
    pub fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) -> Result<()> {
        let index = self.queue().submit(Some(encoder.finish()));
        self.device()
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            })
            .map_err(|e| RuntimeError::ExecutionError(format!("GPU poll failed: {e:?}")))?;
        Ok(())
    }

    /// Copy `buffer` back to the CPU. The buffer needs `COPY_SRC` usage.
    pub fn read_buffer<T: bytemuck::Pod>(&self, buffer: &wgpu::Buffer) -> Result<Vec<T>> {
        let size = buffer.size();

        // Create staging buffer for readback
        let staging_buffer = self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.command_encoder(Some("Readback Encoder"));
        encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size);
        self.submit_and_wait(encoder)?;

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });

        // Poll the device to trigger the map callback
        self.device()
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| {
                RuntimeError::ExecutionError(format!("GPU poll failed during mapping: {e:?}"))
            })?;

        pollster::block_on(rx)
            .map_err(|_| RuntimeError::ExecutionError("Failed to receive map result".to_string()))?
            .map_err(|e| RuntimeError::ExecutionError(format!("Map failed: {e:?}")))?;

        let data = buffer_slice.get_mapped_range();
        let values = bytemuck::try_cast_slice::<u8, T>(&data)
            .map(|values| values.to_vec())
            .map_err(|e| {
                RuntimeError::ExecutionError(format!(
                    "Buffer of {size} bytes cannot be read as {}: {e}",
                    std::any::type_name::<T>()
                ))
            });
        drop(data);
        staging_buffer.unmap();

        values
    }
}
