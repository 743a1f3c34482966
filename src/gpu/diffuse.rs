//! Diffuser: folds the frame's deposit into the persistent trail field.
//!
//! The trail is double buffered. Each update reads the current buffer plus
//! the deposit field and writes the other buffer, then the two swap roles.
//! Sums are taken in a scaled integer domain; a running sum that would
//! decrease is held at its previous value, which slightly under-decays very
//! dense regions. That behavior is part of the expected output.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::gpu::{
    buffer_bind_group, create_compute_pipeline, readback, storage_entry, tile_dispatch,
    uniform_entry, GpuContext,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DiffuseParamsGpu {
    pub dims: [u32; 2],
    /// Fraction of the trail kept each frame, `1 - decay`.
    pub keep: f32,
    /// Non-zero to spread into neighbors.
    pub diffuse: u32,
}

pub const DIFFUSE_WGSL: &str = r#"
struct DiffuseParams {
    dims: vec2<u32>,
    keep: f32,
    diffuse: u32,
};

const SCALE: f32 = 1024.0;

@group(0) @binding(0) var<uniform> params: DiffuseParams;
@group(0) @binding(1) var<storage, read> trail_in: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> trail_out: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> deposit: array<i32>;
@group(0) @binding(4) var<storage, read> landscape: array<f32>;

fn current(texel: u32) -> vec3<i32> {
    let base = texel * 4u;
    let dep = vec3<f32>(f32(deposit[base]), f32(deposit[base + 1u]), f32(deposit[base + 2u])) / SCALE;
    return vec3<i32>((trail_in[texel].xyz + dep) * SCALE);
}

fn kernel_weight(dx: i32, dy: i32) -> i32 {
    if (dx == 0 && dy == 0) {
        return 10;
    }
    if (dx == 0 || dy == 0) {
        return 3;
    }
    return 1;
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.dims.x || id.y >= params.dims.y) {
        return;
    }
    let texel = id.y * params.dims.x + id.x;
    var result = current(texel);

    if (params.diffuse != 0u) {
        let dims = vec2<i32>(params.dims);
        let p = vec2<i32>(id.xy);
        var sum = vec3<i32>(0);
        var weights = 0;
        for (var dy = -1; dy <= 1; dy = dy + 1) {
            for (var dx = -1; dx <= 1; dx = dx + 1) {
                let n = p + vec2<i32>(dx, dy);
                if (n.x < 0 || n.y < 0 || n.x >= dims.x || n.y >= dims.y) {
                    continue;
                }
                let neighbor = u32(n.y) * params.dims.x + u32(n.x);
                let land = i32(SCALE * (1.0 - landscape[neighbor]));
                let w = kernel_weight(dx, dy) * land;
                sum = max(sum, sum + current(neighbor) * w);
                weights = max(weights, weights + w);
            }
        }
        if (weights != 0) {
            result = sum / vec3<i32>(weights);
        }
    }

    trail_out[texel] = vec4<f32>(vec3<f32>(result) * params.keep / SCALE, 1.0);
}
"#;

/// The persistent trail field and its update pipeline.
pub struct Diffuser {
    buffers: [wgpu::Buffer; 2],
    /// Index of the buffer holding the latest trail.
    current: usize,
    width: u32,
    height: u32,
    pipeline: wgpu::ComputePipeline,
    /// `bind_groups[i]` reads buffer `i` and writes the other one.
    bind_groups: [wgpu::BindGroup; 2],
}

impl Diffuser {
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        decay: f32,
        diffuse: bool,
        deposit: &wgpu::Buffer,
        landscape: &wgpu::Buffer,
    ) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let params = DiffuseParamsGpu {
            dims: [width, height],
            keep: 1.0 - decay,
            diffuse: diffuse as u32,
        };

        let diffuser = ctx.checked("diffuser", || {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Diffuse Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let size = width as u64 * height as u64 * 16;
            let make_trail = |label: &str| {
                // Zero-initialized by wgpu.
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                })
            };
            let buffers = [make_trail("Trail Field A"), make_trail("Trail Field B")];

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Diffuse Layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, false),
                    storage_entry(3, true),
                    storage_entry(4, true),
                ],
            });
            let pipeline = create_compute_pipeline(device, "Diffuse Pipeline", DIFFUSE_WGSL, &[&layout]);
            let bind_groups = [
                buffer_bind_group(
                    device,
                    "Diffuse Bind Group A->B",
                    &layout,
                    &[&params_buffer, &buffers[0], &buffers[1], deposit, landscape],
                ),
                buffer_bind_group(
                    device,
                    "Diffuse Bind Group B->A",
                    &layout,
                    &[&params_buffer, &buffers[1], &buffers[0], deposit, landscape],
                ),
            ];

            Self {
                buffers,
                current: 0,
                width,
                height,
                pipeline,
                bind_groups,
            }
        })?;

        tracing::info!(decay, diffuse, "diffuser ready");
        Ok(diffuser)
    }

    /// Record one trail update and swap buffers.
    pub fn update(&mut self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Diffuse Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[self.current], &[]);
            let (x, y) = tile_dispatch(self.width, self.height);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.current = 1 - self.current;
    }

    /// Buffer holding the latest trail.
    pub fn trail(&self) -> &wgpu::Buffer {
        &self.buffers[self.current]
    }

    /// Both trail buffers, for building bind groups keyed by parity.
    pub(crate) fn trail_buffers(&self) -> &[wgpu::Buffer; 2] {
        &self.buffers
    }

    /// Which of [`Self::trail_buffers`] is current.
    pub(crate) fn parity(&self) -> usize {
        self.current
    }

    /// Latest trail, one `[r, g, b]` triple per texel.
    pub fn read_trail(&self, ctx: &GpuContext) -> Result<Vec<[f32; 3]>, GpuError> {
        let raw = self.read_raw(ctx)?;
        Ok(raw.chunks_exact(4).map(|t| [t[0], t[1], t[2]]).collect())
    }

    /// Latest trail including the unused fourth component.
    pub fn read_raw(&self, ctx: &GpuContext) -> Result<Vec<f32>, GpuError> {
        let len = self.width as usize * self.height as usize * 4;
        readback::read_f32(ctx, self.trail(), len)
    }
}
