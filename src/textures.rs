//! Host-generated source fields for landscapes.
//!
//! Some landscape patterns read per-texel data that is produced on the CPU
//! and uploaded once: a seeded random field (grid and triangle cells),
//! two-octave gradient noise, and the luminance of an image file. All of
//! them are laid out row-major with row 0 at the bottom of the domain, the
//! same layout as the landscape itself.

use std::path::Path;

use image::imageops::FilterType;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::TextureError;

/// Uniform random values in `[0, 1)`, one per texel.
pub fn random_field(width: u32, height: u32, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.gen::<f32>()).collect()
}

/// Two-octave gradient noise field used by the noise landscape.
///
/// `scale` is the number of noise cells across the domain at the coarse
/// octave. Values land roughly in `[0, max_noise]`, with a small per-texel
/// jitter on top.
pub fn noise_field(width: u32, height: u32, seed: u64, scale: f32, max_noise: f32) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = GradientNoise::new(rng.gen());
    let offset = rng.gen_range(0..100) as f64;
    let det = scale as f64;

    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x as f64 / width as f64;
            let v = y as f64 / height as f64;
            let coarse = noise.sample(u * det + offset, v * det + offset);
            let fine = noise.sample(u * det * 2.0 + offset, v * det * 2.0 + offset);
            let jitter = rng.gen_range(-1.0..1.0) * 0.03;
            let val = (coarse + 1.0) * 0.5 + (fine + 1.0) * 0.25 + jitter;
            data.push((val * max_noise as f64) as f32);
        }
    }
    data
}

/// Average of the RGB channels of an image, resampled to `width x height`.
///
/// Transparent pixels are composited over black first. Rows are flipped so
/// the top of the picture ends up at the top of the domain.
pub fn load_luminance<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<Vec<f32>, TextureError> {
    let img = image::open(path.as_ref())?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(TextureError::Empty);
    }
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);

    let mut data = Vec::with_capacity((width * height) as usize);
    for y in (0..height).rev() {
        for x in 0..width {
            let [r, g, b, a] = resized.get_pixel(x, y).0;
            let sum = r as f32 + g as f32 + b as f32;
            data.push(sum / 3.0 / 255.0 * (a as f32 / 255.0));
        }
    }
    Ok(data)
}

/// Lattice gradient noise with smoothstep interpolation, output in `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct GradientNoise {
    seed: u32,
}

impl GradientNoise {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64 as u32, y0 as i64 as u32);

        let n00 = self.corner(ix, iy, fx, fy);
        let n10 = self.corner(ix.wrapping_add(1), iy, fx - 1.0, fy);
        let n01 = self.corner(ix, iy.wrapping_add(1), fx, fy - 1.0);
        let n11 = self.corner(ix.wrapping_add(1), iy.wrapping_add(1), fx - 1.0, fy - 1.0);

        let sx = fade(fx);
        let sy = fade(fy);
        let top = lerp(n00, n10, sx);
        let bottom = lerp(n01, n11, sx);
        // Unit gradients put the extremes at +-sqrt(0.5).
        (lerp(top, bottom, sy) * std::f64::consts::SQRT_2).clamp(-1.0, 1.0)
    }

    fn corner(&self, ix: u32, iy: u32, dx: f64, dy: f64) -> f64 {
        let angle = hash(ix, iy, self.seed) as f64 / u32::MAX as f64 * std::f64::consts::TAU;
        angle.cos() * dx + angle.sin() * dy
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Integer lattice hash.
fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut n = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(seed.wrapping_mul(1013904223));
    n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    n ^ (n >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_field_is_seeded() {
        let a = random_field(8, 4, 7);
        assert_eq!(a.len(), 32);
        assert_eq!(a, random_field(8, 4, 7));
        assert_ne!(a, random_field(8, 4, 8));
        assert!(a.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_gradient_noise_zero_on_lattice() {
        let n = GradientNoise::new(3);
        for i in 0..10 {
            assert_eq!(n.sample(i as f64, (i * 2) as f64), 0.0);
        }
    }

    #[test]
    fn test_gradient_noise_bounded() {
        let n = GradientNoise::new(11);
        for i in 0..1000 {
            let v = n.sample(i as f64 * 0.137, i as f64 * 0.071);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_noise_field_range() {
        let data = noise_field(32, 32, 5, 3.0, 0.2);
        assert_eq!(data.len(), 1024);
        assert_eq!(data, noise_field(32, 32, 5, 3.0, 0.2));
        // (n + 1) * 0.5 + (n + 1) * 0.25 spans [0, 1.5], jitter adds 0.03
        assert!(data.iter().all(|v| *v >= -0.03 * 0.2 && *v <= 1.53 * 0.2));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let err = load_luminance("does/not/exist.png", 4, 4).unwrap_err();
        assert!(matches!(err, TextureError::ImageLoad(_) | TextureError::Io(_)));
    }

    #[test]
    fn test_luminance_of_saved_image() {
        let path = std::env::temp_dir().join("physarum_luminance_test.png");
        let mut img = image::RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, image::Rgba([255, 255, 255, 255]));
        img.save(&path).unwrap();

        let data = load_luminance(&path, 2, 2).unwrap();
        // The white row is the top of the picture, so it lands in the last row.
        assert_eq!(data, vec![0.0, 0.0, 1.0, 1.0]);
        let _ = std::fs::remove_file(path);
    }
}
