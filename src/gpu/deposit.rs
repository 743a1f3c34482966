//! Depositor: splats agent positions into the shared density field.
//!
//! The field holds four `i32` slots per texel (one per layer, the last one
//! unused) in fixed point with [`DEPOSIT_SCALE`]. Contributions are summed
//! with `atomicAdd`, so the result does not depend on the order in which
//! agents are scheduled.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{GpuError, PhysarumError};
use crate::gpu::agents::AgentLayer;
use crate::gpu::{
    buffer_bind_group, create_compute_pipeline, readback, storage_entry, tile_dispatch,
    uniform_entry, GpuContext, WORKGROUP_SIZE,
};
use crate::MAX_LAYERS;

/// Fixed-point scale of the deposit field.
pub const DEPOSIT_SCALE: f32 = 1024.0;
/// Slots per texel in the deposit field.
pub(crate) const DEPOSIT_CHANNELS: u64 = 4;

/// Per-layer splat parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DepositParamsGpu {
    pub dims: [u32; 2],
    pub num_agents: u32,
    pub channel: u32,
    /// Per-agent contribution in fixed point. Amounts below 1/2048 round to
    /// zero; configuration validation rejects them.
    pub amount: i32,
    pub point_size: f32,
    pub _pad: [u32; 2],
}

impl DepositParamsGpu {
    pub fn new(
        width: u32,
        height: u32,
        num_agents: u32,
        channel: u32,
        amount: f32,
        point_size: f32,
    ) -> Self {
        Self {
            dims: [width, height],
            num_agents,
            channel,
            amount: (amount * DEPOSIT_SCALE).round() as i32,
            point_size,
            _pad: [0; 2],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ClearParamsGpu {
    dims: [u32; 2],
    _pad: [u32; 2],
}

pub const CLEAR_WGSL: &str = r#"
struct ClearParams {
    dims: vec2<u32>,
    _pad: vec2<u32>,
};

@group(0) @binding(0) var<uniform> params: ClearParams;
@group(0) @binding(1) var<storage, read_write> deposit: array<atomic<i32>>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.dims.x || id.y >= params.dims.y) {
        return;
    }
    let base = (id.y * params.dims.x + id.x) * 4u;
    atomicStore(&deposit[base], 0);
    atomicStore(&deposit[base + 1u], 0);
    atomicStore(&deposit[base + 2u], 0);
    atomicStore(&deposit[base + 3u], 0);
}
"#;

pub const SPLAT_WGSL: &str = r#"
struct DepositParams {
    dims: vec2<u32>,
    num_agents: u32,
    channel: u32,
    amount: i32,
    point_size: f32,
    _pad: vec2<u32>,
};

@group(0) @binding(0) var<uniform> params: DepositParams;
@group(0) @binding(1) var<storage, read> agents: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> deposit: array<atomic<i32>>;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= params.num_agents) {
        return;
    }

    // Square point rasterization: a point of side s centered on a texel
    // center covers ceil(c - 0.5 - s/2) up to, not including, ceil(c - 0.5 + s/2).
    let center = floor(agents[i].xy) + 0.5;
    let half_size = params.point_size * 0.5;
    let lo = ceil(center - 0.5 - half_size);
    let hi = ceil(center - 0.5 + half_size);

    let dims = vec2<i32>(params.dims);
    let x0 = max(i32(lo.x), 0);
    let y0 = max(i32(lo.y), 0);
    let x1 = min(i32(hi.x), dims.x);
    let y1 = min(i32(hi.y), dims.y);

    for (var y = y0; y < y1; y = y + 1) {
        for (var x = x0; x < x1; x = x + 1) {
            let texel = u32(y) * params.dims.x + u32(x);
            atomicAdd(&deposit[texel * 4u + params.channel], params.amount);
        }
    }
}
"#;

/// Owner of the deposit field and its clear/splat pipelines.
pub struct Depositor {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    clear_pipeline: wgpu::ComputePipeline,
    clear_bind_group: wgpu::BindGroup,
    splat_pipeline: wgpu::ComputePipeline,
    splat_layout: wgpu::BindGroupLayout,
}

impl Depositor {
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        layer_count: usize,
    ) -> Result<Self, PhysarumError> {
        if layer_count > MAX_LAYERS {
            return Err(PhysarumError::TooManyLayers(layer_count));
        }
        let device = &ctx.device;

        let depositor = ctx.checked("depositor", || {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Deposit Field"),
                size: width as u64 * height as u64 * DEPOSIT_CHANNELS * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });

            let clear_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Deposit Clear Params"),
                contents: bytemuck::bytes_of(&ClearParamsGpu {
                    dims: [width, height],
                    _pad: [0; 2],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let clear_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Deposit Clear Layout"),
                entries: &[uniform_entry(0), storage_entry(1, false)],
            });
            let clear_pipeline =
                create_compute_pipeline(device, "Deposit Clear Pipeline", CLEAR_WGSL, &[&clear_layout]);
            let clear_bind_group = buffer_bind_group(
                device,
                "Deposit Clear Bind Group",
                &clear_layout,
                &[&clear_params, &buffer],
            );

            let splat_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Deposit Splat Layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, false),
                ],
            });
            let splat_pipeline =
                create_compute_pipeline(device, "Deposit Splat Pipeline", SPLAT_WGSL, &[&splat_layout]);

            Self {
                buffer,
                width,
                height,
                clear_pipeline,
                clear_bind_group,
                splat_pipeline,
                splat_layout,
            }
        })?;

        tracing::info!(width, height, layer_count, "depositor ready");
        Ok(depositor)
    }

    /// Record a pass zeroing every slot of the field.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Deposit Clear Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.clear_pipeline);
        pass.set_bind_group(0, &self.clear_bind_group, &[]);
        let (x, y) = tile_dispatch(self.width, self.height);
        pass.dispatch_workgroups(x, y, 1);
    }

    /// Record a pass adding `layer`'s current positions into its channel.
    pub fn apply_agent_layer(&self, encoder: &mut wgpu::CommandEncoder, layer: &AgentLayer) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Deposit Splat Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.splat_pipeline);
        pass.set_bind_group(0, layer.deposit_bind_group(), &[]);
        pass.dispatch_workgroups((layer.num_agents() as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
    }

    /// Bind group feeding one layer's state buffer and parameters to the
    /// splat pipeline.
    pub(crate) fn splat_bind_group(
        &self,
        device: &wgpu::Device,
        params: &wgpu::Buffer,
        agents: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        buffer_bind_group(
            device,
            "Deposit Splat Bind Group",
            &self.splat_layout,
            &[params, agents, &self.buffer],
        )
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Raw fixed-point field, four slots per texel.
    pub fn read_raw(&self, ctx: &GpuContext) -> Result<Vec<i32>, GpuError> {
        let len = self.width as usize * self.height as usize * DEPOSIT_CHANNELS as usize;
        readback::read_i32(ctx, &self.buffer, len)
    }

    /// Field converted back to per-layer amounts.
    pub fn read_deposit(&self, ctx: &GpuContext) -> Result<Vec<[f32; 3]>, GpuError> {
        let raw = self.read_raw(ctx)?;
        Ok(raw
            .chunks_exact(DEPOSIT_CHANNELS as usize)
            .map(|t| {
                [
                    t[0] as f32 / DEPOSIT_SCALE,
                    t[1] as f32 / DEPOSIT_SCALE,
                    t[2] as f32 / DEPOSIT_SCALE,
                ]
            })
            .collect())
    }
}
