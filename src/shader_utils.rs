//! Shared determinism helpers for every kernel.
//!
//! Different GPUs disagree in the last bits of `sin`, `cos` and fused
//! multiply-adds. Left alone those differences compound over hundreds of
//! steps until two machines render different images from the same seed.
//! Every kernel therefore:
//!
//! - reads trigonometry from a fixed 512-entry lookup table instead of
//!   evaluating transcendental functions,
//! - snaps positional and angular intermediates to a coarse grid with
//!   [`snap`] before using them.
//!
//! The table lives in a storage buffer bound as `trig_table` in each kernel;
//! [`DETERMINISM_WGSL`] holds the matching WGSL helpers and is prepended to
//! every kernel source.
//!
//! # Available Functions
//!
//! - `modulo(x, y) -> f32` - floored modulo, always in `[0, y)`
//! - `wrap_angle(a) -> f32` - `modulo(a, TAU)` with rounding at the wrap folded to 0
//! - `snap(v, n) -> f32` / `snap2(v, n) -> vec2<f32>` - `floor(v * n) / n`
//! - `sin2(rad) -> f32`, `cos2(rad) -> f32` - table lookups
//! - `polarize(p, angle, mag) -> vec2<f32>` - step from `p` along `angle`

use std::f64::consts::PI as PI_F64;

/// Number of buckets in the trig lookup table.
pub const TRIG_TABLE_SIZE: usize = 512;

/// Grid used to snap motion vectors.
pub const MOTION_GRID: f32 = 1024.0;

/// Full turn coarse grained to the table resolution.
pub const TAU: f32 = 3216.0 / 512.0;

/// Half turn coarse grained to the table resolution.
pub const PI: f32 = 1608.0 / 512.0;

/// Snap `v` down onto a grid with `n` steps per unit.
#[inline]
pub fn snap(v: f32, n: f32) -> f32 {
    (v * n).floor() / n
}

/// Floored modulo, the result always has the sign of `y`.
#[inline]
pub fn modulo(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// Wrap an angle into `[0, TAU)`.
///
/// `modulo` can round up to exactly `TAU` for inputs a hair below zero.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let r = modulo(a, TAU);
    if r >= TAU || r < 0.0 {
        0.0
    } else {
        r
    }
}

/// Build the `(sin, cos)` lookup table.
///
/// Entry `i` covers the angle `i / 511 * 2π`. Values are evaluated in `f64`
/// and rounded once to `f32` so that the table is identical on every host.
pub fn trig_table() -> Vec<[f32; 2]> {
    let last = (TRIG_TABLE_SIZE - 1) as f64;
    (0..TRIG_TABLE_SIZE)
        .map(|i| {
            let angle = i as f64 / last * 2.0 * PI_F64;
            [angle.sin() as f32, angle.cos() as f32]
        })
        .collect()
}

/// Index into the trig table for an angle in radians.
#[inline]
pub fn trig_index(radians: f32) -> usize {
    let pct = modulo(radians / TAU, 1.0);
    ((pct * TRIG_TABLE_SIZE as f32).floor() as usize).min(TRIG_TABLE_SIZE - 1)
}

/// Host-side `polarize`, identical to the WGSL helper.
pub fn polarize(table: &[[f32; 2]], p: [f32; 2], angle: f32, mag: f32) -> [f32; 2] {
    let [s, c] = table[trig_index(angle)];
    [
        p[0] + snap(c * mag, MOTION_GRID),
        p[1] + snap(s * mag, MOTION_GRID),
    ]
}

/// WGSL helpers shared by every kernel. Expects a module-scope
/// `trig_table: array<vec2<f32>>` binding.
pub const DETERMINISM_WGSL: &str = r#"
const TRIG_SIZE: u32 = 512u;
const TAU: f32 = 6.28125;
const PI: f32 = 3.140625;
const MOTION_GRID: f32 = 1024.0;

fn modulo(x: f32, y: f32) -> f32 {
    return x - y * floor(x / y);
}

fn wrap_angle(a: f32) -> f32 {
    let r = modulo(a, TAU);
    return select(r, 0.0, r >= TAU || r < 0.0);
}

fn snap(v: f32, n: f32) -> f32 {
    return floor(v * n) / n;
}

fn snap2(v: vec2<f32>, n: f32) -> vec2<f32> {
    return floor(v * n) / n;
}

fn trig_index(angle: f32) -> u32 {
    let pct = modulo(angle / TAU, 1.0);
    return min(u32(floor(pct * f32(TRIG_SIZE))), TRIG_SIZE - 1u);
}

fn sin2(angle: f32) -> f32 {
    return trig_table[trig_index(angle)].x;
}

fn cos2(angle: f32) -> f32 {
    return trig_table[trig_index(angle)].y;
}

fn polarize(p: vec2<f32>, angle: f32, mag: f32) -> vec2<f32> {
    let entry = trig_table[trig_index(angle)];
    return p + snap2(vec2<f32>(entry.y, entry.x) * mag, MOTION_GRID);
}
"#;
