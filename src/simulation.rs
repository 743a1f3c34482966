//! The simulation driver.
//!
//! [`Physarum`] owns every field and pipeline of a run and sequences a frame:
//! agent layers move, the deposit field is cleared and refilled from the new
//! positions, then the trail absorbs the deposit. Drawing reads the trail
//! independently of stepping.
//!
//! ```ignore
//! let ctx = Arc::new(GpuContext::headless()?);
//! let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled())?;
//! sim.run(500);
//! sim.draw()?.save("out.png")?;
//! ```

use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::diagnostics::{Diagnostics, FieldFingerprint, FieldName};
use crate::error::{GpuError, PhysarumError};
use crate::gpu::agents::{AgentLayer, SharedFields};
use crate::gpu::deposit::Depositor;
use crate::gpu::diffuse::Diffuser;
use crate::gpu::landscape::Landscape;
use crate::gpu::screen::Compositor;
use crate::gpu::{GpuContext, TrigTable};

/// A running simulation.
pub struct Physarum {
    ctx: Arc<GpuContext>,
    width: u32,
    height: u32,
    frame: u64,
    _trig: TrigTable,
    landscape: Landscape,
    depositor: Depositor,
    diffuser: Diffuser,
    layers: Vec<AgentLayer>,
    compositor: Compositor,
    diagnostics: Diagnostics,
}

impl Physarum {
    /// Validate `config` and allocate every device resource for the run.
    ///
    /// The landscape is generated here, once.
    pub fn new(
        ctx: Arc<GpuContext>,
        config: &SimulationConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self, PhysarumError> {
        let palette = config.validate()?;
        let (width, height) = (config.width, config.height);

        let trig = ctx.checked("trig table", || TrigTable::new(&ctx.device))?;
        let landscape =
            Landscape::generate(&ctx, width, height, &config.landscape, config.border, &trig)?;
        let depositor = Depositor::new(&ctx, width, height, config.layers.len())?;
        let diffuser = Diffuser::new(
            &ctx,
            width,
            height,
            config.decay,
            config.diffuse,
            depositor.buffer(),
            landscape.buffer(),
        )?;

        let shared = SharedFields {
            depositor: &depositor,
            diffuser: &diffuser,
            landscape: landscape.buffer(),
            trig: &trig,
        };
        let layers = config
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| AgentLayer::new(&ctx, i, layer, width, height, &config.seed, &shared))
            .collect::<Result<Vec<_>, _>>()?;

        let compositor = Compositor::new(&ctx, width, height, &palette, &diffuser)?;

        tracing::info!(
            seed = %config.seed,
            width,
            height,
            layers = layers.len(),
            agents = layers.iter().map(AgentLayer::num_agents).sum::<usize>(),
            landscape = landscape.kind(),
            "simulation ready"
        );

        Ok(Self {
            ctx,
            width,
            height,
            frame: 0,
            _trig: trig,
            landscape,
            depositor,
            diffuser,
            layers,
            compositor,
            diagnostics,
        })
    }

    /// Advance one frame.
    ///
    /// All passes go into one command buffer and one submission. If the
    /// diagnostics context asks for this frame, fingerprints are captured
    /// afterwards.
    pub fn step(&mut self) {
        self.frame += 1;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Step Encoder"),
            });

        for layer in &mut self.layers {
            layer.update(&self.ctx.queue, &mut encoder, &self.diffuser);
        }
        self.depositor.clear(&mut encoder);
        for layer in &self.layers {
            self.depositor.apply_agent_layer(&mut encoder, layer);
        }
        self.diffuser.update(&mut encoder);

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        tracing::debug!(frame = self.frame, "step");

        if self.diagnostics.should_capture(self.frame) {
            self.capture();
        }
    }

    /// Advance `steps` frames.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    fn capture(&mut self) {
        let fingerprints = match self.fingerprints() {
            Ok(fps) => fps,
            Err(e) => {
                tracing::warn!(frame = self.frame, error = %e, "fingerprint capture failed");
                return;
            }
        };
        for fp in &fingerprints {
            if !fp.is_finite() {
                tracing::warn!(
                    frame = self.frame,
                    field = %fp.field,
                    non_finite = fp.non_finite,
                    "non-finite values in field"
                );
            }
            self.diagnostics.emit(fp, self.frame);
        }
    }

    /// Fingerprint every layer state, the deposit, the trail and the landscape.
    pub fn fingerprints(&self) -> Result<Vec<FieldFingerprint>, GpuError> {
        let mut fps = Vec::with_capacity(self.layers.len() + 3);
        for layer in &self.layers {
            let state = layer.read_state(&self.ctx)?;
            fps.push(FieldFingerprint::of_f32(FieldName::AgentLayer(layer.index()), &state));
        }
        fps.push(FieldFingerprint::of_i32(
            FieldName::Deposit,
            &self.depositor.read_raw(&self.ctx)?,
        ));
        fps.push(FieldFingerprint::of_f32(
            FieldName::Trail,
            &self.diffuser.read_raw(&self.ctx)?,
        ));
        fps.push(FieldFingerprint::of_f32(
            FieldName::Landscape,
            &self.landscape.read(&self.ctx)?,
        ));
        Ok(fps)
    }

    /// Composite the current trail and read it back as an upright image.
    pub fn draw(&self) -> Result<image::RgbaImage, GpuError> {
        tracing::debug!(frame = self.frame, "draw");
        self.compositor.draw(&self.ctx, &self.diffuser)
    }

    /// Prepare drawing to surfaces of `format`.
    pub fn enable_present(&mut self, format: wgpu::TextureFormat) {
        self.compositor.enable_present(&self.ctx.device, format);
    }

    /// Record compositing of the current trail into `view`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> Result<(), GpuError> {
        self.compositor.render(encoder, view, &self.diffuser)
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[AgentLayer] {
        &self.layers
    }

    pub fn read_trail(&self) -> Result<Vec<[f32; 3]>, GpuError> {
        self.diffuser.read_trail(&self.ctx)
    }

    pub fn read_landscape(&self) -> Result<Vec<f32>, GpuError> {
        self.landscape.read(&self.ctx)
    }

    pub fn read_deposit(&self) -> Result<Vec<[f32; 3]>, GpuError> {
        self.depositor.read_deposit(&self.ctx)
    }

    /// Zero the deposit field without stepping.
    pub fn clear_deposit(&mut self) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        self.depositor.clear(&mut encoder);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Run only the deposit and trail phases against the current agents.
    ///
    /// Agents do not move. Used to check the deposit and trail arithmetic in
    /// isolation.
    pub fn deposit_and_diffuse(&mut self) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Deposit Encoder"),
            });
        self.depositor.clear(&mut encoder);
        for layer in &self.layers {
            self.depositor.apply_agent_layer(&mut encoder, layer);
        }
        self.diffuser.update(&mut encoder);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}
