//! Seeded helpers for building initial agent layouts.
//!
//! The core takes initial agents as plain data; these helpers are for
//! drivers that want a reproducible layout from a seed:
//!
//! ```ignore
//! let mut ctx = SpawnContext::new(512, 512, seed);
//! let agents = SpawnShape::Ring { radius: 0.3 }.spawn(&mut ctx, 10_000);
//! ```

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::Agent;

/// Seeded RNG plus domain size.
pub struct SpawnContext {
    pub width: f32,
    pub height: f32,
    rng: ChaCha8Rng,
}

impl SpawnContext {
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Center of the domain.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) * 0.5
    }

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.rng.gen_range(min..max)
    }

    /// Random heading in `[0, 2π)`.
    #[inline]
    pub fn random_heading(&mut self) -> f32 {
        self.rng.gen_range(0.0..TAU)
    }

    /// Standard normal sample.
    pub fn gauss(&mut self) -> f32 {
        let u1: f32 = self.rng.gen::<f32>().max(1e-30);
        let u2: f32 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Uniform point in the domain, at least `pad` pixels from each edge.
    pub fn random_in_domain(&mut self, pad: f32) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(pad..(self.width - pad).max(pad + f32::EPSILON)),
            self.rng.gen_range(pad..(self.height - pad).max(pad + f32::EPSILON)),
        )
    }

    /// Uniform point inside a disk.
    pub fn random_in_disk(&mut self, center: Vec2, radius: f32) -> Vec2 {
        let theta = self.random_heading();
        let r = radius * self.rng.gen::<f32>().sqrt();
        self.clamp(center + Vec2::new(theta.cos(), theta.sin()) * r)
    }

    /// Uniform point on a circle.
    pub fn random_on_ring(&mut self, center: Vec2, radius: f32) -> Vec2 {
        let theta = self.random_heading();
        self.clamp(center + Vec2::new(theta.cos(), theta.sin()) * radius)
    }

    /// Gaussian cloud around `center`.
    pub fn gaussian(&mut self, center: Vec2, std_dev: f32) -> Vec2 {
        let offset = Vec2::new(self.gauss(), self.gauss()) * std_dev;
        self.clamp(center + offset)
    }

    /// Keep a point strictly inside `[0, width) x [0, height)`.
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(Vec2::ZERO, Vec2::new(self.width - 1.0, self.height - 1.0))
    }

    /// Build `count` agents with a spawner closure.
    pub fn agents(&mut self, count: usize, mut f: impl FnMut(&mut Self) -> Agent) -> Vec<Agent> {
        (0..count).map(|_| f(self)).collect()
    }
}

/// Ready-made initial layouts. Sizes are fractions of the smaller side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SpawnShape {
    /// Uniform over the whole domain with random headings.
    Distributed,
    /// Uniform inside a central disk, heading away from the center.
    Centered { radius: f32 },
    /// Gaussian cloud around the center with random headings.
    Gaussian { std_dev: f32 },
    /// On a central circle, heading inwards.
    Ring { radius: f32 },
}

impl SpawnShape {
    pub fn spawn(&self, ctx: &mut SpawnContext, count: usize) -> Vec<Agent> {
        let side = ctx.width.min(ctx.height);
        let center = ctx.center();
        match *self {
            SpawnShape::Distributed => ctx.agents(count, |c| {
                let p = c.random_in_domain(0.0);
                Agent {
                    position: p,
                    heading: c.random_heading(),
                }
            }),
            SpawnShape::Centered { radius } => ctx.agents(count, |c| {
                let p = c.random_in_disk(center, radius * side);
                Agent {
                    position: p,
                    heading: heading_between(center, p),
                }
            }),
            SpawnShape::Gaussian { std_dev } => ctx.agents(count, |c| {
                let p = c.gaussian(center, std_dev * side);
                Agent {
                    position: p,
                    heading: c.random_heading(),
                }
            }),
            SpawnShape::Ring { radius } => ctx.agents(count, |c| {
                let p = c.random_on_ring(center, radius * side);
                Agent {
                    position: p,
                    heading: heading_between(p, center),
                }
            }),
        }
    }
}

/// Heading in `[0, 2π)` pointing from `from` to `to`.
fn heading_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    let h = d.y.atan2(d.x).rem_euclid(TAU);
    // rem_euclid can round tiny negative angles up to TAU itself
    if h >= TAU {
        0.0
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_domain(agents: &[Agent], w: f32, h: f32) -> bool {
        agents.iter().all(|a| {
            a.position.x >= 0.0
                && a.position.x < w
                && a.position.y >= 0.0
                && a.position.y < h
                && (0.0..TAU).contains(&a.heading)
        })
    }

    #[test]
    fn test_shapes_stay_in_domain() {
        let shapes = [
            SpawnShape::Distributed,
            SpawnShape::Centered { radius: 0.6 },
            SpawnShape::Gaussian { std_dev: 0.5 },
            SpawnShape::Ring { radius: 0.7 },
        ];
        for shape in shapes {
            let mut ctx = SpawnContext::new(64, 32, 1);
            let agents = shape.spawn(&mut ctx, 500);
            assert_eq!(agents.len(), 500);
            assert!(in_domain(&agents, 64.0, 32.0), "{shape:?} escaped the domain");
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = SpawnShape::Distributed.spawn(&mut SpawnContext::new(64, 64, 9), 100);
        let b = SpawnShape::Distributed.spawn(&mut SpawnContext::new(64, 64, 9), 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ring_points_inwards() {
        let mut ctx = SpawnContext::new(100, 100, 3);
        let center = ctx.center();
        let ring = SpawnShape::Ring { radius: 0.25 }.spawn(&mut ctx, 20);
        for agent in ring {
            let dir = Vec2::new(agent.heading.cos(), agent.heading.sin());
            assert!(dir.dot(center - agent.position) > 0.0);
        }
    }
}
