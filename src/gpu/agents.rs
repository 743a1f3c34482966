//! Agent layers: one species of agents, steered by the trail and landscape.
//!
//! Each layer keeps its agents in a pair of storage buffers of
//! `(x, y, heading, 0)` records. An update reads one buffer, writes the other
//! and swaps, so every agent sees the state of the previous step only.

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wgpu::util::DeviceExt;

use crate::config::{Agent, AgentLayerConfig};
use crate::diagnostics::derive_seed;
use crate::error::{GpuError, PhysarumError};
use crate::gpu::deposit::{DepositParamsGpu, Depositor};
use crate::gpu::diffuse::Diffuser;
use crate::gpu::{
    buffer_bind_group, create_compute_pipeline, readback, storage_entry, uniform_entry,
    GpuContext, TrigTable, WORKGROUP_SIZE,
};
use crate::shader_utils::DETERMINISM_WGSL;
use crate::MAX_LAYERS;

/// Steering constants plus the per-frame coin flip, uploaded every update.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AgentParamsGpu {
    pub dims: [f32; 2],
    pub sensor_offset: f32,
    pub step_size: f32,
    pub sensor_angle: f32,
    pub rotation_amount: f32,
    pub land_scale: f32,
    /// `+1` or `-1`, shared by every agent of the layer for one step.
    pub rand_dir: f32,
    pub tex_scale: [f32; 3],
    pub num_agents: u32,
}

impl AgentParamsGpu {
    pub fn new(config: &AgentLayerConfig, width: u32, height: u32) -> Self {
        Self {
            dims: [width as f32, height as f32],
            sensor_offset: config.sensor_offset,
            step_size: config.step_size,
            sensor_angle: config.sensor_angle,
            rotation_amount: config.rotation_amount,
            land_scale: config.land_scale,
            rand_dir: 1.0,
            tex_scale: config.tex_scale,
            num_agents: config.num_agents() as u32,
        }
    }
}

const AGENT_BODY_WGSL: &str = r#"
struct AgentParams {
    dims: vec2<f32>,
    sensor_offset: f32,
    step_size: f32,
    sensor_angle: f32,
    rotation_amount: f32,
    land_scale: f32,
    rand_dir: f32,
    tex_scale: vec3<f32>,
    num_agents: u32,
};

@group(0) @binding(0) var<uniform> params: AgentParams;
@group(0) @binding(1) var<storage, read> agents_in: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> agents_out: array<vec4<f32>>;

@group(1) @binding(0) var<storage, read> trail: array<vec4<f32>>;
@group(1) @binding(1) var<storage, read> landscape: array<f32>;
@group(1) @binding(2) var<storage, read> trig_table: array<vec2<f32>>;

// Nearest-texel sample of the weighted trail plus landscape. Zero outside.
fn attraction(p: vec2<f32>) -> f32 {
    let uv = p / params.dims;
    if (uv.x < 0.0 || uv.y < 0.0 || uv.x >= 1.0 || uv.y >= 1.0) {
        return 0.0;
    }
    let size = vec2<u32>(params.dims);
    let texel = min(vec2<u32>(floor(uv * params.dims)), size - 1u);
    let i = texel.y * size.x + texel.x;
    let t = trail[i].xyz * params.tex_scale;
    return t.x + t.y + t.z + params.land_scale * landscape[i];
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= params.num_agents) {
        return;
    }

    let agent = agents_in[i];
    let pos = agent.xy;
    let angle = agent.z;

    let left = attraction(polarize(pos, angle - params.sensor_angle, params.sensor_offset));
    let center = attraction(polarize(pos, angle, params.sensor_offset));
    let right = attraction(polarize(pos, angle + params.sensor_angle, params.sensor_offset));

    var next_angle = angle;
    if (center >= left && center >= right) {
        // keep heading
    } else if (center <= left && center <= right) {
        next_angle = next_angle + params.rotation_amount * params.rand_dir;
    } else if (left < right) {
        next_angle = next_angle + params.rotation_amount;
    } else if (right < left) {
        next_angle = next_angle - params.rotation_amount;
    }
    next_angle = wrap_angle(next_angle);

    var next_pos = polarize(pos, next_angle, params.step_size);
    if (next_pos.x < 0.0 || next_pos.y < 0.0
        || next_pos.x >= params.dims.x || next_pos.y >= params.dims.y) {
        next_pos = pos;
        next_angle = wrap_angle(next_angle + PI);
    }

    agents_out[i] = vec4<f32>(next_pos, next_angle, 0.0);
}
"#;

/// Full WGSL source of the agent update kernel.
pub fn agent_kernel_source() -> String {
    format!("{}\n{}", DETERMINISM_WGSL, AGENT_BODY_WGSL)
}

/// Pack agents into `cols * rows` state records, zero padded.
pub fn pack_agents(agents: &[Agent], cols: u32, rows: u32) -> Vec<[f32; 4]> {
    let mut records = vec![[0.0f32; 4]; (cols * rows) as usize];
    for (record, agent) in records.iter_mut().zip(agents) {
        *record = [
            agent.position.x,
            agent.position.y,
            agent.heading.rem_euclid(std::f32::consts::TAU),
            0.0,
        ];
    }
    records
}

/// Everything an agent layer binds besides its own state.
pub(crate) struct SharedFields<'a> {
    pub depositor: &'a Depositor,
    pub diffuser: &'a Diffuser,
    pub landscape: &'a wgpu::Buffer,
    pub trig: &'a TrigTable,
}

/// One species of agents and its update pipeline.
pub struct AgentLayer {
    index: usize,
    num_agents: usize,
    state_dims: (u32, u32),
    width: u32,
    height: u32,
    states: [wgpu::Buffer; 2],
    /// Index of the state buffer holding the latest positions.
    current: usize,
    params: AgentParamsGpu,
    params_buffer: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    /// `state_bind_groups[i]` reads state `i` and writes the other one.
    state_bind_groups: [wgpu::BindGroup; 2],
    /// Keyed by the diffuser's trail parity.
    sensing_bind_groups: [wgpu::BindGroup; 2],
    /// Keyed by state parity; splats the current state.
    deposit_bind_groups: [wgpu::BindGroup; 2],
    rng: ChaCha8Rng,
}

impl AgentLayer {
    pub(crate) fn new(
        ctx: &GpuContext,
        index: usize,
        config: &AgentLayerConfig,
        width: u32,
        height: u32,
        seed: &str,
        shared: &SharedFields<'_>,
    ) -> Result<Self, PhysarumError> {
        if index >= MAX_LAYERS {
            return Err(PhysarumError::TooManyLayers(index + 1));
        }
        config.validate(index)?;

        let num_agents = config.num_agents();
        let state_dims = config.state_dims();
        let records = pack_agents(&config.agents, state_dims.0, state_dims.1);
        let params = AgentParamsGpu::new(config, width, height);
        let deposit_params = DepositParamsGpu::new(
            width,
            height,
            num_agents as u32,
            index as u32,
            config.deposit,
            config.point_size,
        );
        let device = &ctx.device;

        let (
            states,
            params_buffer,
            pipeline,
            state_bind_groups,
            sensing_bind_groups,
            deposit_bind_groups,
        ) = ctx.checked("agent layer", || {
            let make_state = |label: String| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: bytemuck::cast_slice(&records),
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                })
            };
            let states = [
                make_state(format!("Layer {} State A", index)),
                make_state(format!("Layer {} State B", index)),
            ];

            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Layer {} Params", index)),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let deposit_params_buffer =
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Layer {} Deposit Params", index)),
                    contents: bytemuck::bytes_of(&deposit_params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });

            let state_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Agent State Layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, false),
                ],
            });
            let sensing_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Agent Sensing Layout"),
                entries: &[
                    storage_entry(0, true),
                    storage_entry(1, true),
                    storage_entry(2, true),
                ],
            });
            let pipeline = create_compute_pipeline(
                device,
                &format!("Layer {} Update Pipeline", index),
                &agent_kernel_source(),
                &[&state_layout, &sensing_layout],
            );

            let state_bind_groups = [
                buffer_bind_group(
                    device,
                    "Agent State Bind Group A->B",
                    &state_layout,
                    &[&params_buffer, &states[0], &states[1]],
                ),
                buffer_bind_group(
                    device,
                    "Agent State Bind Group B->A",
                    &state_layout,
                    &[&params_buffer, &states[1], &states[0]],
                ),
            ];

            let trails = shared.diffuser.trail_buffers();
            let sensing_bind_groups = [
                buffer_bind_group(
                    device,
                    "Agent Sensing Bind Group A",
                    &sensing_layout,
                    &[&trails[0], shared.landscape, &shared.trig.buffer],
                ),
                buffer_bind_group(
                    device,
                    "Agent Sensing Bind Group B",
                    &sensing_layout,
                    &[&trails[1], shared.landscape, &shared.trig.buffer],
                ),
            ];

            let deposit_bind_groups = [
                shared
                    .depositor
                    .splat_bind_group(device, &deposit_params_buffer, &states[0]),
                shared
                    .depositor
                    .splat_bind_group(device, &deposit_params_buffer, &states[1]),
            ];

            (
                states,
                params_buffer,
                pipeline,
                state_bind_groups,
                sensing_bind_groups,
                deposit_bind_groups,
            )
        })?;

        tracing::info!(
            layer = index,
            agents = num_agents,
            cols = state_dims.0,
            rows = state_dims.1,
            "agent layer ready"
        );

        Ok(Self {
            index,
            num_agents,
            state_dims,
            width,
            height,
            states,
            current: 0,
            params,
            params_buffer,
            pipeline,
            state_bind_groups,
            sensing_bind_groups,
            deposit_bind_groups,
            rng: ChaCha8Rng::seed_from_u64(derive_seed(seed, &format!("layer{}", index))),
        })
    }

    /// Record one step of every agent, sensing the diffuser's current trail.
    ///
    /// Draws this step's shared turn direction and uploads it before
    /// recording the pass.
    pub(crate) fn update(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, diffuser: &Diffuser) {
        self.params.rand_dir = if self.rng.gen::<f32>() < 0.5 { 1.0 } else { -1.0 };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Agent Update Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.state_bind_groups[self.current], &[]);
            pass.set_bind_group(1, &self.sensing_bind_groups[diffuser.parity()], &[]);
            pass.dispatch_workgroups((self.num_agents as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        self.current = 1 - self.current;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// `(cols, rows)` of the state field.
    pub fn state_dims(&self) -> (u32, u32) {
        self.state_dims
    }

    /// Domain the layer moves in.
    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Buffer holding the latest state.
    pub fn state(&self) -> &wgpu::Buffer {
        &self.states[self.current]
    }

    pub(crate) fn deposit_bind_group(&self) -> &wgpu::BindGroup {
        &self.deposit_bind_groups[self.current]
    }

    /// Raw state records, padding included.
    pub fn read_state(&self, ctx: &GpuContext) -> Result<Vec<f32>, GpuError> {
        let (cols, rows) = self.state_dims;
        readback::read_f32(ctx, self.state(), (cols * rows) as usize * 4)
    }

    /// Current agents, padding excluded.
    pub fn read_agents(&self, ctx: &GpuContext) -> Result<Vec<Agent>, GpuError> {
        let raw = self.read_state(ctx)?;
        Ok(raw
            .chunks_exact(4)
            .take(self.num_agents)
            .map(|r| Agent::new(r[0], r[1], r[2]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_validates() {
        let source = agent_kernel_source();
        let module = naga::front::wgsl::parse_str(&source).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }

    #[test]
    fn test_stored_heading_is_wrapped() {
        let body = AGENT_BODY_WGSL;
        assert!(body.contains("next_angle = wrap_angle(next_angle);"));
        assert!(body.contains("next_angle = wrap_angle(next_angle + PI);"));
        assert!(!body.contains("modulo(next_angle"));
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<AgentParamsGpu>(), 48);
        assert_eq!(std::mem::offset_of!(AgentParamsGpu, tex_scale), 32);
    }

    #[test]
    fn test_pack_agents_pads_and_wraps_heading() {
        let agents = vec![
            Agent::new(1.0, 2.0, -std::f32::consts::FRAC_PI_2),
            Agent::new(3.0, 4.0, 0.5),
            Agent::new(5.0, 6.0, 7.0),
        ];
        let records = pack_agents(&agents, 2, 2);
        assert_eq!(records.len(), 4);
        assert!((records[0][2] - 3.0 * std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(records[1], [3.0, 4.0, 0.5, 0.0]);
        assert!((records[2][2] - (7.0 - std::f32::consts::TAU)).abs() < 1e-5);
        assert_eq!(records[3], [0.0; 4]);
    }

    #[test]
    fn test_params_from_config() {
        let config = AgentLayerConfig::new(vec![Agent::new(0.0, 0.0, 0.0); 5])
            .with_tex_scale([1.0, -0.5, 0.25])
            .with_land_scale(2.0);
        let params = AgentParamsGpu::new(&config, 64, 32);
        assert_eq!(params.dims, [64.0, 32.0]);
        assert_eq!(params.num_agents, 5);
        assert_eq!(params.tex_scale, [1.0, -0.5, 0.25]);
        assert_eq!(params.land_scale, 2.0);
    }
}
