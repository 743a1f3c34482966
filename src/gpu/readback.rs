//! Copy storage buffers back to the host.
//!
//! Only used for diagnostics, export and tests; stepping never reads back.

use crate::error::GpuError;
use crate::gpu::GpuContext;

/// Download the first `size` bytes of `buffer`.
///
/// `buffer` must have `COPY_SRC` usage. Blocks until the copy completes.
pub fn read_bytes(ctx: &GpuContext, buffer: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, GpuError> {
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let data = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(data)
}

pub fn read_f32(ctx: &GpuContext, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<f32>, GpuError> {
    let bytes = read_bytes(ctx, buffer, (len * 4) as u64)?;
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

pub fn read_i32(ctx: &GpuContext, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<i32>, GpuError> {
    let bytes = read_bytes(ctx, buffer, (len * 4) as u64)?;
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

pub fn read_u32(ctx: &GpuContext, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<u32>, GpuError> {
    let bytes = read_bytes(ctx, buffer, (len * 4) as u64)?;
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}
