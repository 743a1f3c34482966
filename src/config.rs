//! Run configuration.
//!
//! Everything a simulation needs is fixed at construction: the domain, the
//! landscape, the palette and up to three agent layers with their initial
//! agents and steering constants.
//!
//! ```ignore
//! use physarum::prelude::*;
//!
//! let agents = SpawnShape::Distributed.spawn(&mut SpawnContext::new(512, 512, 1), 5_000);
//! let layer = AgentLayerConfig::new(agents)
//!     .with_sensor(9.0, PI / 4.0)
//!     .with_rotation_amount(PI / 8.0)
//!     .with_tex_scale([1.0, -0.5, 0.0]);
//!
//! let config = SimulationConfig::new("seed", 512, 512)
//!     .with_landscape(LandscapePattern::Checkerboard { num_cells: 8 })
//!     .with_layer(layer);
//! ```
//!
//! All types here derive serde traits so a driver can load a run from JSON.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::PhysarumError;
use crate::gpu::deposit::DEPOSIT_SCALE;
use crate::landscape::LandscapePattern;
use crate::palette::{Palette, PaletteHex};
use crate::MAX_LAYERS;

/// Default per-frame decay of the trail field.
pub const DEFAULT_DECAY: f32 = 4.0 / 128.0;

/// Initial state of one agent in simulation pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec2,
    /// Heading in radians.
    pub heading: f32,
}

impl Agent {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            heading,
        }
    }
}

/// Configuration of one agent species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLayerConfig {
    /// Initial agents. The count stays fixed for the whole run.
    pub agents: Vec<Agent>,
    /// Distance from the agent to each sensor, in pixels.
    pub sensor_offset: f32,
    /// Angle between the center sensor and the side sensors, in radians.
    pub sensor_angle: f32,
    /// Heading change per turn, in radians.
    pub rotation_amount: f32,
    /// Distance moved per step, in pixels.
    pub step_size: f32,
    /// Weight of each trail channel when sensing.
    pub tex_scale: [f32; 3],
    /// Weight of the landscape when sensing.
    pub land_scale: f32,
    /// Amount deposited per agent per frame. Stored in fixed point with
    /// 1/1024 resolution; a nonzero amount that rounds to zero is rejected.
    pub deposit: f32,
    /// Side of the square each agent deposits into, in pixels.
    pub point_size: f32,
}

impl Default for AgentLayerConfig {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            sensor_offset: 9.0,
            sensor_angle: std::f32::consts::FRAC_PI_4,
            rotation_amount: std::f32::consts::PI / 8.0,
            step_size: 1.0,
            tex_scale: [1.0, 0.0, 0.0],
            land_scale: 0.0,
            deposit: 1.0,
            point_size: 1.0,
        }
    }
}

impl AgentLayerConfig {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self {
            agents,
            ..Default::default()
        }
    }

    /// Set sensor distance and sensor angle.
    pub fn with_sensor(mut self, offset: f32, angle: f32) -> Self {
        self.sensor_offset = offset;
        self.sensor_angle = angle;
        self
    }

    pub fn with_rotation_amount(mut self, radians: f32) -> Self {
        self.rotation_amount = radians;
        self
    }

    pub fn with_step_size(mut self, step: f32) -> Self {
        self.step_size = step;
        self
    }

    /// Set per-channel trail weights.
    ///
    /// Negative weights make a species avoid the trail of another.
    pub fn with_tex_scale(mut self, scale: [f32; 3]) -> Self {
        self.tex_scale = scale;
        self
    }

    pub fn with_land_scale(mut self, scale: f32) -> Self {
        self.land_scale = scale;
        self
    }

    pub fn with_deposit(mut self, amount: f32) -> Self {
        self.deposit = amount;
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    /// Number of agents in this layer.
    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    /// Dimensions of the 2D state field holding the agents.
    pub fn state_dims(&self) -> (u32, u32) {
        state_dims(self.agents.len())
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), PhysarumError> {
        if self.agents.is_empty() {
            return Err(PhysarumError::EmptyLayer(index));
        }
        let scalars = [
            ("sensor_offset", self.sensor_offset),
            ("sensor_angle", self.sensor_angle),
            ("rotation_amount", self.rotation_amount),
            ("step_size", self.step_size),
            ("land_scale", self.land_scale),
            ("deposit", self.deposit),
            ("point_size", self.point_size),
        ];
        for (name, value) in scalars.into_iter().chain(
            self.tex_scale
                .iter()
                .map(|&v| ("tex_scale", v)),
        ) {
            if !value.is_finite() {
                return Err(PhysarumError::InvalidParameter(format!(
                    "layer {} {} is not finite",
                    index, name
                )));
            }
        }
        if self.point_size < 1.0 {
            return Err(PhysarumError::InvalidParameter(format!(
                "layer {} point_size must be at least 1",
                index
            )));
        }
        if self.deposit != 0.0 && (self.deposit * DEPOSIT_SCALE).round() == 0.0 {
            return Err(PhysarumError::InvalidParameter(format!(
                "layer {} deposit {} is below the 1/{} resolution",
                index, self.deposit, DEPOSIT_SCALE
            )));
        }
        if let Some(agent) = self
            .agents
            .iter()
            .find(|a| !a.position.is_finite() || !a.heading.is_finite())
        {
            return Err(PhysarumError::InvalidParameter(format!(
                "layer {} has a non-finite agent {:?}",
                index, agent
            )));
        }
        Ok(())
    }
}

/// Layout of `n` agents in a square-ish 2D state field:
/// `ceil(sqrt(n))` columns by `ceil(n / cols)` rows.
pub fn state_dims(n: usize) -> (u32, u32) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = (n as f64).sqrt().ceil() as usize;
    // Guard against sqrt rounding down for perfect squares near the f64 limit.
    while cols * cols < n {
        cols += 1;
    }
    let rows = n.div_ceil(cols);
    (cols as u32, rows as u32)
}

/// Global run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed string.
    pub seed: String,
    pub width: u32,
    pub height: u32,
    /// Fraction of the trail removed every frame.
    pub decay: f32,
    /// Spread the trail into neighbors each frame.
    pub diffuse: bool,
    pub landscape: LandscapePattern,
    /// Fade the landscape to 1 near the edges.
    pub border: bool,
    pub palette: PaletteHex,
    pub layers: Vec<AgentLayerConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: "physarum".to_string(),
            width: 512,
            height: 512,
            decay: DEFAULT_DECAY,
            diffuse: false,
            landscape: LandscapePattern::Flat { value: 0.0 },
            border: false,
            palette: PaletteHex::default(),
            layers: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn new(seed: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            seed: seed.into(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_diffusion(mut self, enabled: bool) -> Self {
        self.diffuse = enabled;
        self
    }

    pub fn with_landscape(mut self, pattern: LandscapePattern) -> Self {
        self.landscape = pattern;
        self
    }

    pub fn with_border(mut self, enabled: bool) -> Self {
        self.border = enabled;
        self
    }

    /// Background followed by one color per layer, as hex strings.
    pub fn with_palette(mut self, colors: [&str; 4]) -> Self {
        self.palette = PaletteHex(colors.map(|c| c.to_string()));
        self
    }

    /// One of the curated [`PRESETS`](crate::palette::PRESETS), wrapping
    /// around the catalog.
    pub fn with_palette_preset(mut self, index: usize) -> Self {
        self.palette = PaletteHex::preset(index);
        self
    }

    pub fn with_layer(mut self, layer: AgentLayerConfig) -> Self {
        self.layers.push(layer);
        self
    }

    /// Parse a JSON run description.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check everything that can be checked without a device.
    ///
    /// Returns the parsed palette on success.
    pub fn validate(&self) -> Result<Palette, PhysarumError> {
        if self.width == 0 || self.height == 0 {
            return Err(PhysarumError::InvalidDimensions(self.width, self.height));
        }
        if self.layers.len() > MAX_LAYERS {
            return Err(PhysarumError::TooManyLayers(self.layers.len()));
        }
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(PhysarumError::InvalidParameter(format!(
                "decay {} outside [0, 1]",
                self.decay
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(i)?;
        }
        self.landscape.validate()?;
        self.palette.parse()
    }
}
