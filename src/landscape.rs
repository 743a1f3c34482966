//! Landscape pattern catalog.
//!
//! A landscape is a static scalar field in `[0, 1]` that biases sensing (via
//! each layer's `land_scale`) and resists diffusion. It is generated once per
//! run on the GPU from a [`LandscapePattern`]: each variant carries its own
//! parameters, which are packed into [`LandscapeUniforms`] at runtime, and
//! selects one WGSL kernel body. Patterns that need host data (noise, random
//! cells, jittered centers, images) upload it through a single auxiliary
//! buffer, see [`LandscapePattern::aux_data`].
//!
//! # Kernel structure
//!
//! Every kernel is [`DETERMINISM_WGSL`](crate::shader_utils::DETERMINISM_WGSL)
//! + [`LANDSCAPE_COMMON_WGSL`] + one body defining `gen_val(uv) -> f32`. The
//! common entry point clamps the value, applies the optional border fade and
//! snaps the result to 1/1024.

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::PhysarumError;
use crate::shader_utils::DETERMINISM_WGSL;
use crate::textures;

/// Width of the border fade as a fraction of the domain.
pub const BORDER_WIDTH: f32 = 4.0 / 128.0;

const FLAG_FLIP_X: u32 = 1;
const FLAG_FLIP_Y: u32 = 2;
const FLAG_HORIZONTAL: u32 = 4;
const FLAG_TOWARDS_CENTER: u32 = 8;

/// Axis a linear gradient runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    #[default]
    Diagonal,
    Vertical,
    Horizontal,
}

/// One landscape pattern and its parameters.
///
/// Lengths and radii are fractions of the domain unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LandscapePattern {
    /// Constant field.
    Flat { value: f32 },
    /// Distance from the center. `towards_center` keeps the raw distance,
    /// otherwise it is inverted so the center is high.
    RadialGradient { towards_center: bool },
    /// Host-generated two-octave gradient noise scaled by `max_noise`.
    Noise { seed: u64, scale: f32, max_noise: f32 },
    /// Stroked circle around the center; `line_width` is the half stroke.
    CentralCircle { radius: f32, line_width: f32 },
    /// Stroked square around the center; `line_width` is the half stroke.
    CentralSquare { radius: f32, line_width: f32 },
    /// Stroked circles around each corner, summed and scaled by `factor`.
    CornerCircles { radius: f32, line_width: f32, factor: f32 },
    /// Evenly spaced lines.
    Lines { num_cells: u32, line_width: f32, horizontal: bool },
    /// Cells of random height, a fraction `skip_pct` of them left empty.
    Grid { cells: [u32; 2], skip_pct: f32, seed: u64 },
    LinearGradient {
        flip_x: bool,
        flip_y: bool,
        direction: GradientDirection,
    },
    /// Cells split along a diagonal into two random-height triangles.
    /// `flip` of -1 never mirrors a cell, 1 always does, 0 mirrors half.
    Triangles { num_cells: u32, flip: f32, seed: u64 },
    /// Soft dots on a grid, centers displaced by gaussian `jitter`.
    /// `radius` is absolute, not relative to the cell.
    GridCircles { num_cells: u32, radius: f32, jitter: f32, seed: u64 },
    /// Lines displaced by a sine wave.
    SinWaves {
        num_cells: u32,
        line_width: f32,
        horizontal: bool,
        frequency: f32,
        amplitude: f32,
    },
    Checkerboard { num_cells: u32 },
    /// Two sides of every checkerboard cell, mirrored on alternate cells.
    Steps { num_cells: u32, line_width: f32, flip_x: bool },
    /// Luminance of an image file resampled to the domain.
    Image { path: String },
}

/// Runtime parameters of the landscape kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LandscapeUniforms {
    pub dims: [f32; 2],
    pub border_width: f32,
    pub flags: u32,
    pub a: [f32; 4],
    pub aux_len: u32,
    pub _pad: [u32; 3],
}

impl LandscapePattern {
    /// Stable snake_case name of the pattern kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LandscapePattern::Flat { .. } => "flat",
            LandscapePattern::RadialGradient { .. } => "radial_gradient",
            LandscapePattern::Noise { .. } => "noise",
            LandscapePattern::CentralCircle { .. } => "central_circle",
            LandscapePattern::CentralSquare { .. } => "central_square",
            LandscapePattern::CornerCircles { .. } => "corner_circles",
            LandscapePattern::Lines { .. } => "lines",
            LandscapePattern::Grid { .. } => "grid",
            LandscapePattern::LinearGradient { .. } => "linear_gradient",
            LandscapePattern::Triangles { .. } => "triangles",
            LandscapePattern::GridCircles { .. } => "grid_circles",
            LandscapePattern::SinWaves { .. } => "sin_waves",
            LandscapePattern::Checkerboard { .. } => "checkerboard",
            LandscapePattern::Steps { .. } => "steps",
            LandscapePattern::Image { .. } => "image",
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PhysarumError> {
        let invalid = |msg: &str| {
            Err(PhysarumError::InvalidParameter(format!(
                "{} landscape: {}",
                self.kind(),
                msg
            )))
        };
        let cells = match self {
            LandscapePattern::Lines { num_cells, .. }
            | LandscapePattern::Triangles { num_cells, .. }
            | LandscapePattern::GridCircles { num_cells, .. }
            | LandscapePattern::SinWaves { num_cells, .. }
            | LandscapePattern::Checkerboard { num_cells }
            | LandscapePattern::Steps { num_cells, .. } => *num_cells,
            LandscapePattern::Grid { cells, .. } => cells[0].min(cells[1]),
            _ => 1,
        };
        if cells == 0 {
            return invalid("cell count must be positive");
        }
        if let LandscapePattern::Image { path } = self {
            if path.is_empty() {
                return invalid("empty image path");
            }
        }
        if !self.to_scalars().iter().all(|v| v.is_finite()) {
            return invalid("parameters must be finite");
        }
        Ok(())
    }

    /// Every float parameter, for validation.
    fn to_scalars(&self) -> Vec<f32> {
        self.to_uniforms(1, 1, false, 0).a.to_vec()
    }

    /// Pack the parameters into the kernel's uniform block.
    pub fn to_uniforms(&self, width: u32, height: u32, border: bool, aux_len: u32) -> LandscapeUniforms {
        let mut u = LandscapeUniforms {
            dims: [width as f32, height as f32],
            border_width: if border { BORDER_WIDTH } else { 0.0 },
            aux_len,
            ..Default::default()
        };
        let flag = |on: bool, bit: u32| if on { bit } else { 0 };
        match self {
            LandscapePattern::Flat { value } => u.a[0] = *value,
            LandscapePattern::RadialGradient { towards_center } => {
                u.flags = flag(*towards_center, FLAG_TOWARDS_CENTER);
            }
            LandscapePattern::Noise {
                scale, max_noise, ..
            } => {
                u.a[0] = *scale;
                u.a[1] = *max_noise;
            }
            LandscapePattern::CentralCircle { radius, line_width }
            | LandscapePattern::CentralSquare { radius, line_width } => {
                u.a[0] = *radius;
                u.a[1] = *line_width;
            }
            LandscapePattern::CornerCircles {
                radius,
                line_width,
                factor,
            } => {
                u.a = [*radius, *line_width, *factor, 0.0];
            }
            LandscapePattern::Lines {
                num_cells,
                line_width,
                horizontal,
            } => {
                u.a[0] = *num_cells as f32;
                u.a[1] = *line_width;
                u.flags = flag(*horizontal, FLAG_HORIZONTAL);
            }
            LandscapePattern::Grid {
                cells, skip_pct, ..
            } => {
                u.a = [cells[0] as f32, cells[1] as f32, *skip_pct, 0.0];
            }
            LandscapePattern::LinearGradient {
                flip_x,
                flip_y,
                direction,
            } => {
                u.flags = flag(*flip_x, FLAG_FLIP_X) | flag(*flip_y, FLAG_FLIP_Y);
                u.a[0] = match direction {
                    GradientDirection::Diagonal => 0.0,
                    GradientDirection::Vertical => 1.0,
                    GradientDirection::Horizontal => 2.0,
                };
            }
            LandscapePattern::Triangles {
                num_cells, flip, ..
            } => {
                u.a[0] = *num_cells as f32;
                u.a[1] = *flip;
            }
            LandscapePattern::GridCircles {
                num_cells,
                radius,
                jitter,
                ..
            } => {
                u.a = [*radius, *num_cells as f32, *jitter, 0.0];
            }
            LandscapePattern::SinWaves {
                num_cells,
                line_width,
                horizontal,
                frequency,
                amplitude,
            } => {
                u.a = [*num_cells as f32, *line_width, *frequency, *amplitude];
                u.flags = flag(*horizontal, FLAG_HORIZONTAL);
            }
            LandscapePattern::Checkerboard { num_cells } => u.a[0] = *num_cells as f32,
            LandscapePattern::Steps {
                num_cells,
                line_width,
                flip_x,
            } => {
                u.a[0] = *num_cells as f32;
                u.a[1] = crate::shader_utils::snap(*line_width, 512.0);
                u.flags = flag(*flip_x, FLAG_FLIP_X);
            }
            LandscapePattern::Image { .. } => {}
        }
        u
    }

    /// Host data the kernel reads through its auxiliary buffer.
    ///
    /// Returns the buffer contents and the logical element count passed as
    /// `aux_len`. Patterns without host data get a single zero so the binding
    /// is never empty.
    pub fn aux_data(&self, width: u32, height: u32) -> Result<(Vec<f32>, u32), PhysarumError> {
        let texels = width * height;
        let data = match self {
            LandscapePattern::Noise {
                seed,
                scale,
                max_noise,
            } => (
                textures::noise_field(width, height, *seed, *scale, *max_noise),
                texels,
            ),
            LandscapePattern::Grid { seed, .. } | LandscapePattern::Triangles { seed, .. } => {
                (textures::random_field(width, height, *seed), texels)
            }
            LandscapePattern::GridCircles {
                num_cells,
                jitter,
                seed,
                ..
            } => {
                let centers = grid_circle_centers(*num_cells, *jitter, *seed);
                let count = (centers.len() / 2) as u32;
                (centers, count)
            }
            LandscapePattern::Image { path } => {
                (textures::load_luminance(path, width, height)?, texels)
            }
            _ => (vec![0.0], 0),
        };
        Ok(data)
    }

    /// Full WGSL source of the kernel for this pattern kind.
    pub fn kernel_source(&self) -> String {
        format!(
            "{}\n{}\n{}",
            DETERMINISM_WGSL,
            LANDSCAPE_COMMON_WGSL,
            self.gen_val_wgsl()
        )
    }

    fn gen_val_wgsl(&self) -> &'static str {
        match self {
            LandscapePattern::Flat { .. } => FLAT_WGSL,
            LandscapePattern::RadialGradient { .. } => RADIAL_GRADIENT_WGSL,
            LandscapePattern::Noise { .. } | LandscapePattern::Image { .. } => SAMPLED_WGSL,
            LandscapePattern::CentralCircle { .. } => CENTRAL_CIRCLE_WGSL,
            LandscapePattern::CentralSquare { .. } => CENTRAL_SQUARE_WGSL,
            LandscapePattern::CornerCircles { .. } => CORNER_CIRCLES_WGSL,
            LandscapePattern::Lines { .. } => LINES_WGSL,
            LandscapePattern::Grid { .. } => GRID_WGSL,
            LandscapePattern::LinearGradient { .. } => LINEAR_GRADIENT_WGSL,
            LandscapePattern::Triangles { .. } => TRIANGLES_WGSL,
            LandscapePattern::GridCircles { .. } => GRID_CIRCLES_WGSL,
            LandscapePattern::SinWaves { .. } => SIN_WAVES_WGSL,
            LandscapePattern::Checkerboard { .. } => CHECKERBOARD_WGSL,
            LandscapePattern::Steps { .. } => STEPS_WGSL,
        }
    }
}

/// Cell centers of a [`LandscapePattern::GridCircles`] landscape as
/// interleaved `x, y` pairs, column-major.
pub fn grid_circle_centers(num_cells: u32, jitter: f32, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let cell = 1.0 / num_cells as f64;
    let jitter = jitter as f64;
    let mut centers = Vec::with_capacity((num_cells * num_cells * 2) as usize);
    for i in 0..num_cells {
        for j in 0..num_cells {
            let x = i as f64 * cell + cell / 2.0 + gauss(&mut rng) * jitter;
            let y = j as f64 * cell + cell / 2.0 + gauss(&mut rng) * jitter;
            centers.push(x as f32);
            centers.push(y as f32);
        }
    }
    centers
}

/// Standard normal sample via Box-Muller.
fn gauss(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-300);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Bindings, shared helpers and the entry point of every landscape kernel.
pub const LANDSCAPE_COMMON_WGSL: &str = r#"
struct LandscapeParams {
    dims: vec2<f32>,
    border_width: f32,
    flags: u32,
    a: vec4<f32>,
    aux_len: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

const FLAG_FLIP_X: u32 = 1u;
const FLAG_FLIP_Y: u32 = 2u;
const FLAG_HORIZONTAL: u32 = 4u;
const FLAG_TOWARDS_CENTER: u32 = 8u;
const UV_GRID: f32 = 4096.0;
const VALUE_GRID: f32 = 1024.0;

@group(0) @binding(0) var<uniform> params: LandscapeParams;
@group(0) @binding(1) var<storage, read> aux: array<f32>;
@group(0) @binding(2) var<storage, read> trig_table: array<vec2<f32>>;
@group(0) @binding(3) var<storage, read_write> landscape: array<f32>;

fn has_flag(bit: u32) -> bool {
    return (params.flags & bit) != 0u;
}

// Map uv into the area inside the border and snap it.
fn inner_uv(uv: vec2<f32>) -> vec2<f32> {
    let bw = params.border_width;
    return snap2((uv - vec2<f32>(bw)) / (1.0 - 2.0 * bw), UV_GRID);
}

fn texel_index(uv: vec2<f32>) -> u32 {
    let t = min(vec2<u32>(floor(uv * params.dims)), vec2<u32>(params.dims) - vec2<u32>(1u));
    return t.y * u32(params.dims.x) + t.x;
}

// Nearest lookup into the host random field, wrapping co into [0, 1).
fn rand(co: vec2<f32>) -> f32 {
    return aux[texel_index(fract(co))];
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let dims = vec2<u32>(params.dims);
    if (id.x >= dims.x || id.y >= dims.y) {
        return;
    }
    let uv = (vec2<f32>(id.xy) + vec2<f32>(0.5)) / params.dims;
    var val = clamp(gen_val(uv), 0.0, 1.0);

    let bw = params.border_width;
    if (bw > 0.0) {
        var uvr = uv;
        if (uv.x + uv.y > 1.0) {
            uvr = vec2<f32>(1.0 - uv.y, 1.0 - uv.x);
        }
        let min_xy = min(uvr.x, uvr.y);
        if (min_xy < bw) {
            val = 1.0 - min(min_xy / bw, 1.0);
        }
    }

    landscape[id.y * dims.x + id.x] = snap(val, VALUE_GRID);
}
"#;

const FLAT_WGSL: &str = r#"
fn gen_val(uv: vec2<f32>) -> f32 {
    return params.a.x;
}
"#;

const RADIAL_GRADIENT_WGSL: &str = r#"
const MAX_DIST: f32 = 0.70703125;

fn gen_val(uv: vec2<f32>) -> f32 {
    let d = snap(distance(vec2<f32>(0.5), uv), VALUE_GRID);
    var val = clamp(d / MAX_DIST, 0.0, 1.0);
    if (!has_flag(FLAG_TOWARDS_CENTER)) {
        val = snap(1.0 - val, VALUE_GRID);
    }
    return val;
}
"#;

const SAMPLED_WGSL: &str = r#"
fn gen_val(uv: vec2<f32>) -> f32 {
    return aux[texel_index(uv)];
}
"#;

const CENTRAL_CIRCLE_WGSL: &str = r#"
fn gen_val(uv: vec2<f32>) -> f32 {
    let radius = params.a.x;
    let lw = params.a.y;
    let d = distance(vec2<f32>(0.5), uv);
    return step(radius - lw, d) * step(d, radius + lw) * 0.5;
}
"#;

const CENTRAL_SQUARE_WGSL: &str = r#"
fn gen_val(uv: vec2<f32>) -> f32 {
    let radius = params.a.x;
    let lw = params.a.y;
    let d = abs(uv - vec2<f32>(0.5));
    let m = max(d.x, d.y);
    return step(radius - lw, m) * step(m, radius + lw) * 0.5;
}
"#;

const CORNER_CIRCLES_WGSL: &str = r#"
fn ring(corner: vec2<f32>, uv: vec2<f32>) -> f32 {
    let radius = params.a.x;
    let lw = params.a.y;
    let d = distance(corner, uv);
    return step(radius - lw, d) * step(d, radius + lw);
}

fn gen_val(uv: vec2<f32>) -> f32 {
    let val = ring(vec2<f32>(0.0, 0.0), uv)
        + ring(vec2<f32>(1.0, 1.0), uv)
        + ring(vec2<f32>(0.0, 1.0), uv)
        + ring(vec2<f32>(1.0, 0.0), uv);
    return val * params.a.z;
}
"#;

const LINES_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    let num_cells = params.a.x;
    let lw = params.a.y;
    var uv = uv_in;
    if (has_flag(FLAG_HORIZONTAL)) {
        uv = uv.yx;
    }
    uv = inner_uv(uv);
    let x = fract(uv.x * num_cells + 0.5);
    let d = distance(x, 0.5);
    let val = step(d, lw / 2.0 * num_cells) * step(distance(uv.x, 0.5) * 2.0, 1.0 - lw);
    return val * 0.5;
}
"#;

const GRID_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    let cells = params.a.xy;
    let skip_pct = params.a.z;
    let uv = inner_uv(uv_in);
    let coord = floor(uv * cells) / cells;
    return rand(coord) * 0.5 * step(skip_pct, rand(fract(coord + vec2<f32>(1.23))));
}
"#;

const LINEAR_GRADIENT_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    var uv = uv_in;
    if (has_flag(FLAG_FLIP_X)) {
        uv.x = 1.0 - uv.x;
    }
    if (has_flag(FLAG_FLIP_Y)) {
        uv.y = 1.0 - uv.y;
    }
    let direction = u32(params.a.x);
    if (direction == 1u) {
        uv.x = uv.y;
    } else if (direction == 2u) {
        uv.y = uv.x;
    }
    return (uv.x + uv.y) / 2.0;
}
"#;

const TRIANGLES_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    let num_cells = params.a.x;
    let flip = params.a.y;
    var uv = inner_uv(uv_in);
    let coord = floor(uv * num_cells) / num_cells;
    uv = fract(uv * num_cells);
    if (rand(coord) < 0.5 + flip) {
        uv.x = 1.0 - uv.x;
    }
    return rand(coord + vec2<f32>(7.77 * step(uv.x, uv.y)));
}
"#;

const GRID_CIRCLES_WGSL: &str = r#"
const CIRCLE_GRID: f32 = 8192.0;

fn gen_val(uv_in: vec2<f32>) -> f32 {
    let radius = params.a.x;
    let uv = inner_uv(uv_in);
    var val = 0.0;
    for (var i = 0u; i < params.aux_len; i = i + 1u) {
        let diff = uv - vec2<f32>(aux[2u * i], aux[2u * i + 1u]);
        // Snapping both the squared distance and its root keeps sqrt
        // differences between drivers out of the result.
        let hypot = snap(diff.x * diff.x + diff.y * diff.y, CIRCLE_GRID);
        let dist = snap(sqrt(hypot), CIRCLE_GRID);
        val += 0.15 * (1.0 - smoothstep(radius * 0.75, radius * 1.5, dist));
    }
    return val;
}
"#;

const SIN_WAVES_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    let num_cells = params.a.x;
    let lw = params.a.y;
    let freq = params.a.z;
    let amp = params.a.w;
    let bw = params.border_width;
    var uv = uv_in;
    if (has_flag(FLAG_HORIZONTAL)) {
        uv = uv.yx;
    }
    uv = (uv - vec2<f32>(bw)) / (1.0 - 2.0 * bw);
    uv.x += sin2(uv.y * TAU * freq) * amp;
    uv = snap2(uv, UV_GRID);

    let x = snap(fract(uv.x * num_cells + 0.5), UV_GRID);
    let d = snap(distance(x, 0.5), UV_GRID);
    let lw_cell = lw / 2.0 * num_cells;
    let sm = smoothstep(lw_cell * 0.75, lw_cell * 1.5, d);
    let val = (1.0 - sm) * step(distance(uv.x, 0.5) * 2.0, 1.0 - lw * 2.0);
    return val * 0.5;
}
"#;

const CHECKERBOARD_WGSL: &str = r#"
fn gen_val(uv_in: vec2<f32>) -> f32 {
    let num_cells = params.a.x;
    let uv = inner_uv(uv_in);
    let coord = floor(uv * num_cells);
    var val = step(modulo(coord.x + coord.y, 2.0), 0.9);
    // soft edge around every cell
    let d = abs(fract(uv * num_cells) - vec2<f32>(0.5));
    val += smoothstep(0.95, 1.0, max(d.x, d.y) * 2.0);
    return clamp(val, 0.0, 1.0) * 0.5;
}
"#;

const STEPS_WGSL: &str = r#"
const STEP_GRID: f32 = 10000000.0;

fn gen_val(uv_in: vec2<f32>) -> f32 {
    let num_cells = params.a.x;
    var uv = uv_in;
    if (has_flag(FLAG_FLIP_X)) {
        uv.x = 1.0 - uv.x;
    }
    uv = inner_uv(uv);

    let coord = floor(uv * num_cells);
    let light_cell = 1.0 - step(modulo(coord.x + coord.y, 2.0), 0.9);
    var cell = fract(uv * num_cells);
    cell = mix(vec2<f32>(1.0) - cell, cell, light_cell);

    let lw = snap(params.a.y * num_cells / 2.0, STEP_GRID);
    let left = snap(1.0 - smoothstep(lw, lw + 0.05, cell.x), STEP_GRID);
    let right = snap(1.0 - smoothstep(lw, lw + 0.05, cell.y), STEP_GRID);
    let corner = snap(1.0 - smoothstep(lw, lw + 0.05, distance(cell, vec2<f32>(1.0))), STEP_GRID);
    return min(1.0, left + right + corner) * 0.5;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;
        Ok(())
    }

    fn catalog() -> Vec<LandscapePattern> {
        vec![
            LandscapePattern::Flat { value: 0.25 },
            LandscapePattern::RadialGradient { towards_center: false },
            LandscapePattern::Noise {
                seed: 1,
                scale: 3.0,
                max_noise: 0.2,
            },
            LandscapePattern::CentralCircle {
                radius: 0.3,
                line_width: 0.02,
            },
            LandscapePattern::CentralSquare {
                radius: 0.3,
                line_width: 0.02,
            },
            LandscapePattern::CornerCircles {
                radius: 0.7,
                line_width: 0.02,
                factor: 0.5,
            },
            LandscapePattern::Lines {
                num_cells: 6,
                line_width: 0.01,
                horizontal: false,
            },
            LandscapePattern::Grid {
                cells: [5, 7],
                skip_pct: 0.6,
                seed: 2,
            },
            LandscapePattern::LinearGradient {
                flip_x: true,
                flip_y: false,
                direction: GradientDirection::Vertical,
            },
            LandscapePattern::Triangles {
                num_cells: 8,
                flip: 0.0,
                seed: 3,
            },
            LandscapePattern::GridCircles {
                num_cells: 10,
                radius: 0.012,
                jitter: 0.01,
                seed: 4,
            },
            LandscapePattern::SinWaves {
                num_cells: 5,
                line_width: 0.005,
                horizontal: true,
                frequency: 3.0,
                amplitude: 0.02,
            },
            LandscapePattern::Checkerboard { num_cells: 8 },
            LandscapePattern::Steps {
                num_cells: 7,
                line_width: 0.003,
                flip_x: true,
            },
            LandscapePattern::Image {
                path: "landscape.png".to_string(),
            },
        ]
    }

    #[test]
    fn test_every_kernel_is_valid_wgsl() {
        for pattern in catalog() {
            if let Err(e) = validate_wgsl(&pattern.kernel_source()) {
                panic!("{} kernel failed validation:\n{}", pattern.kind(), e);
            }
        }
    }

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<LandscapeUniforms>(), 48);
    }

    #[test]
    fn test_border_width_only_when_enabled() {
        let p = LandscapePattern::Checkerboard { num_cells: 8 };
        assert_eq!(p.to_uniforms(64, 64, true, 0).border_width, BORDER_WIDTH);
        assert_eq!(p.to_uniforms(64, 64, false, 0).border_width, 0.0);
    }

    #[test]
    fn test_flags_packed() {
        let p = LandscapePattern::LinearGradient {
            flip_x: true,
            flip_y: true,
            direction: GradientDirection::Horizontal,
        };
        let u = p.to_uniforms(8, 8, false, 0);
        assert_eq!(u.flags, FLAG_FLIP_X | FLAG_FLIP_Y);
        assert_eq!(u.a[0], 2.0);
    }

    #[test]
    fn test_steps_line_width_snapped() {
        let p = LandscapePattern::Steps {
            num_cells: 7,
            line_width: 0.0031,
            flip_x: false,
        };
        assert_eq!(p.to_uniforms(8, 8, false, 0).a[1], 1.0 / 512.0);
    }

    #[test]
    fn test_grid_circle_centers_deterministic() {
        let a = grid_circle_centers(6, 0.02, 99);
        let b = grid_circle_centers(6, 0.02, 99);
        assert_eq!(a, b);
        assert_eq!(a.len(), 6 * 6 * 2);
        assert_ne!(a, grid_circle_centers(6, 0.02, 100));
    }

    #[test]
    fn test_grid_circle_centers_without_jitter() {
        let c = grid_circle_centers(4, 0.0, 1);
        assert_eq!(&c[..4], &[0.125, 0.125, 0.125, 0.375]);
    }

    #[test]
    fn test_aux_data_sizes() {
        let (data, len) = LandscapePattern::Grid {
            cells: [3, 3],
            skip_pct: 0.0,
            seed: 5,
        }
        .aux_data(16, 8)
        .unwrap();
        assert_eq!(data.len(), 128);
        assert_eq!(len, 128);

        let (data, len) = LandscapePattern::Checkerboard { num_cells: 4 }
            .aux_data(16, 8)
            .unwrap();
        assert_eq!(data, vec![0.0]);
        assert_eq!(len, 0);
    }

    #[test]
    fn test_zero_cells_rejected() {
        assert!(LandscapePattern::Checkerboard { num_cells: 0 }.validate().is_err());
        assert!(LandscapePattern::Grid {
            cells: [4, 0],
            skip_pct: 0.0,
            seed: 0
        }
        .validate()
        .is_err());
        assert!(LandscapePattern::Flat { value: f32::NAN }.validate().is_err());
        assert!(LandscapePattern::Checkerboard { num_cells: 3 }.validate().is_ok());
    }

    #[test]
    fn test_tagged_json() {
        let json = r#"{ "kind": "sin_waves", "num_cells": 4, "line_width": 0.005,
                        "horizontal": false, "frequency": 2.0, "amplitude": 0.03 }"#;
        let p: LandscapePattern = serde_json::from_str(json).unwrap();
        assert_eq!(p.kind(), "sin_waves");
    }
}
