//! Four-color palettes for the screen compositor.
//!
//! A palette is a background plus one foreground color per agent layer.
//! Colors are written as 6-digit hex strings, with or without a leading `#`.
//! [`PRESETS`] holds a catalog of curated palettes in hyphenated form.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhysarumError;

/// Linear RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    /// Parse `"#aabbcc"` or `"aabbcc"`.
    pub fn from_hex(value: &str) -> Result<Self, PhysarumError> {
        let digits = value.strip_prefix('#').unwrap_or(value);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PhysarumError::InvalidColor(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| PhysarumError::InvalidColor(value.to_string()))
        };
        Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    /// Components as a padded `vec4` for uniform upload.
    pub fn to_vec4(self) -> [f32; 4] {
        [self.0[0], self.0[1], self.0[2], 1.0]
    }

    /// Components quantized to bytes.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.0[0]), q(self.0[1]), q(self.0[2]), 255]
    }
}

/// Background plus three foreground colors, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Rgb,
    pub foreground: [Rgb; 3],
}

impl Palette {
    /// Parse four hex strings: background followed by layer colors 1 to 3.
    pub fn from_hex(colors: &[String; 4]) -> Result<Self, PhysarumError> {
        Ok(Self {
            background: Rgb::from_hex(&colors[0])?,
            foreground: [
                Rgb::from_hex(&colors[1])?,
                Rgb::from_hex(&colors[2])?,
                Rgb::from_hex(&colors[3])?,
            ],
        })
    }
}

impl FromStr for Palette {
    type Err = PhysarumError;

    /// Parse a hyphenated palette such as `"1b9aaa-f8f4e3-ffc43d-ef476f"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<String> = s.split('-').map(|p| p.trim().to_string()).collect();
        let colors: [String; 4] = parts.try_into().map_err(|parts: Vec<String>| {
            PhysarumError::InvalidPalette(format!(
                "expected 4 colors, found {} in {:?}",
                parts.len(),
                s
            ))
        })?;
        Self::from_hex(&colors)
    }
}

/// Curated palettes, background first.
pub const PRESETS: &[&str] = &[
    "000411-552f9d-efcb68-e1efe6",
    "423e3b-ff2e00-fea82f-fffecb",
    "094074-3c6997-5adbff-ffdd4a",
    "000411-d7263d-efcb68-3ab795",
    "042a2b-5eb1bf-cdedf6-ef7b45",
    "606c38-283618-fefae0-dda15e",
    "413620-9c6615-9f7833-ffd791",
    "001427-708d81-f4d58d-bf0603",
    "050505-1b9aaa-dddbcb-f5f1e3",
    "002500-b7245c-929982-edcbb1",
    "3f0d12-f1f0cc-d5bf86-8d775f",
    "14281d-355834-6e633d-c2a878",
    "271f30-6c5a49-c8ad55-d0fcb3",
    "004777-a30000-ff7700-efd28d",
    "353535-3c6e71-f2f8f8-d9d9d9",
    "2e1f27-854d27-dd7230-f4c95d",
    "561643-6c0e23-c42021-f3ffb9",
    "4e598c-ffffff-f9c784-fcaf58",
    "083d77-ebebd3-da4167-f4d35e",
    "0d0a0b-454955-f3eff5-72b01d",
    "ee4266-2a1e5c-0a0f0d-c4cbca",
    "fffcf2-ccc5b9-403d39-252422",
    "da9f93-eef36a-95b8d1-0d1b1e",
    "d5573b-f7dba7-1e2d2f-4281a4",
    "000500-362417-92817a-f1dabf",
    "660000-086788-f0c808-fff1d0",
    "052f5f-06a77d-d5c67a-f1a208",
];

/// Hex form of a palette as it appears in run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteHex(pub [String; 4]);

impl Default for PaletteHex {
    fn default() -> Self {
        Self(
            ["#0d1b2a", "#ffc43d", "#ef476f", "#1b9aaa"]
                .map(|s| s.to_string()),
        )
    }
}

impl PaletteHex {
    /// Preset `index` from [`PRESETS`], wrapping around the catalog.
    pub fn preset(index: usize) -> Self {
        let mut colors = PRESETS[index % PRESETS.len()].split('-').map(|c| c.to_string());
        Self(std::array::from_fn(|_| colors.next().unwrap_or_default()))
    }

    pub fn parse(&self) -> Result<Palette, PhysarumError> {
        Palette::from_hex(&self.0)
    }
}
