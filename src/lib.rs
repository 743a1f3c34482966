//! # Physarum
//!
//! A deterministic, GPU-resident slime mold simulation with up to three
//! interacting species.
//!
//! Agents sense a trail field through three sensors, turn towards the
//! strongest reading and leave a deposit where they land. The trail decays
//! (and optionally diffuses) every frame. A static landscape biases both
//! sensing and diffusion. Every trigonometric value comes from a shared
//! lookup table and positions are snapped to a fixed grid, so the same seed
//! and configuration give bit-identical fields on any adapter.
//!
//! ## Quick Start
//!
//! ```ignore
//! use physarum::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut spawn = SpawnContext::new(512, 512, 7);
//!     let agents = SpawnShape::Ring { radius: 0.3 }.spawn(&mut spawn, 20_000);
//!
//!     let config = SimulationConfig::new("lichen", 512, 512)
//!         .with_landscape(LandscapePattern::CentralCircle { radius: 0.3, line_width: 0.05 })
//!         .with_layer(AgentLayerConfig::new(agents).with_sensor(9.0, PI / 4.0));
//!
//!     let ctx = Arc::new(GpuContext::headless()?);
//!     let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled())?;
//!     sim.run(300);
//!     sim.draw()?.save("lichen.png")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Frame order
//!
//! Each [`Physarum::step`] records, in one submission:
//!
//! 1. one update per agent layer (sense the previous trail, turn, move)
//! 2. a clear of the deposit field
//! 3. one splat per agent layer into its own deposit channel
//! 4. the trail update (decay, optional diffusion)
//!
//! Compositing to colors is separate from stepping; call [`Physarum::draw`]
//! or [`Physarum::render`] whenever a picture is needed.
//!
//! ## Parity checks
//!
//! Pass a [`Diagnostics`] context at construction to receive a
//! [`FieldFingerprint`] of every field after a chosen frame. Two runs agree
//! when their fingerprints agree.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gpu;
pub mod landscape;
pub mod palette;
pub mod shader_utils;
pub mod simulation;
pub mod spawn;
pub mod textures;

/// Maximum number of agent layers. Each layer owns one channel of the
/// deposit and trail fields.
pub const MAX_LAYERS: usize = 3;

pub use config::{Agent, AgentLayerConfig, SimulationConfig};
pub use diagnostics::{Diagnostics, FieldFingerprint, FieldName};
pub use error::{GpuError, PhysarumError, TextureError};
pub use glam::Vec2;
pub use gpu::GpuContext;
pub use landscape::{GradientDirection, LandscapePattern};
pub use palette::{Palette, Rgb};
pub use simulation::Physarum;
pub use spawn::{SpawnContext, SpawnShape};

/// Common imports for drivers.
pub mod prelude {
    pub use crate::config::{Agent, AgentLayerConfig, SimulationConfig};
    pub use crate::diagnostics::{Diagnostics, FieldFingerprint, FieldName};
    pub use crate::error::PhysarumError;
    pub use crate::gpu::GpuContext;
    pub use crate::landscape::{GradientDirection, LandscapePattern};
    pub use crate::simulation::Physarum;
    pub use crate::spawn::{SpawnContext, SpawnShape};
    pub use crate::Vec2;
    pub use std::f32::consts::PI;
}
