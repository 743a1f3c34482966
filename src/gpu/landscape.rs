//! One-shot landscape generation on the GPU.

use wgpu::util::DeviceExt;

use crate::error::{GpuError, PhysarumError};
use crate::gpu::{
    buffer_bind_group, create_compute_pipeline, readback, storage_entry, tile_dispatch,
    uniform_entry, GpuContext, TrigTable,
};
use crate::landscape::LandscapePattern;

/// The static landscape field. Written once by [`Landscape::generate`],
/// read-only afterwards.
pub struct Landscape {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    kind: &'static str,
}

impl Landscape {
    /// Build the field for `pattern` over a `width x height` domain.
    ///
    /// Generating twice with the same inputs yields bit-identical fields.
    pub fn generate(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        pattern: &LandscapePattern,
        border: bool,
        trig: &TrigTable,
    ) -> Result<Self, PhysarumError> {
        pattern.validate()?;
        let (aux, aux_len) = pattern.aux_data(width, height)?;
        let uniforms = pattern.to_uniforms(width, height, border, aux_len);
        let device = &ctx.device;

        let buffer = ctx.checked("landscape", || {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Landscape Params"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let aux_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Landscape Aux Buffer"),
                contents: bytemuck::cast_slice(&aux),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Landscape Field"),
                size: (width as u64) * (height as u64) * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Landscape Bind Group Layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, false),
                ],
            });
            let pipeline = create_compute_pipeline(
                device,
                &format!("Landscape Pipeline ({})", pattern.kind()),
                &pattern.kernel_source(),
                &[&layout],
            );
            let bind_group = buffer_bind_group(
                device,
                "Landscape Bind Group",
                &layout,
                &[&params_buffer, &aux_buffer, &trig.buffer, &buffer],
            );

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Landscape Encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Landscape Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                let (x, y) = tile_dispatch(width, height);
                pass.dispatch_workgroups(x, y, 1);
            }
            ctx.queue.submit(std::iter::once(encoder.finish()));
            buffer
        })?;

        tracing::info!(kind = pattern.kind(), border, width, height, "landscape generated");

        Ok(Self {
            buffer,
            width,
            height,
            kind: pattern.kind(),
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Download the field, row 0 first.
    pub fn read(&self, ctx: &GpuContext) -> Result<Vec<f32>, GpuError> {
        readback::read_f32(ctx, &self.buffer, (self.width * self.height) as usize)
    }
}
