//! Blend operations and the CPU reference fold.
//!
//! Channel math is written against `b` (the accumulated result so far) and
//! `t` (the next layer). All values are straight, non-premultiplied f32 in
//! [0, 1]. The GPU blend shader implements the same formulas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ObliqueError, Result};

/// Binary blend operation. The discriminant is the index used by the blend shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum BlendOp {
    Add = 0,
    Average,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Subtract,
    HardLight,
    ColorBurn,
    ColorDodge,
    Hue,
    Color,
    Reflect,
    Glow,
    PinLight,
    Exclusion,
    Negation,
    LinearBurn,
    LinearDodge,
    LinearLight,
    VividLight,
    HardMix,
    Darken,
    Lighten,
    PassthroughTop,
    PassthroughBottom,
    Atop,
}

impl BlendOp {
    /// Every operation in index order
    pub const ALL: [BlendOp; 27] = [
        BlendOp::Add,
        BlendOp::Average,
        BlendOp::Multiply,
        BlendOp::Screen,
        BlendOp::Overlay,
        BlendOp::Difference,
        BlendOp::Subtract,
        BlendOp::HardLight,
        BlendOp::ColorBurn,
        BlendOp::ColorDodge,
        BlendOp::Hue,
        BlendOp::Color,
        BlendOp::Reflect,
        BlendOp::Glow,
        BlendOp::PinLight,
        BlendOp::Exclusion,
        BlendOp::Negation,
        BlendOp::LinearBurn,
        BlendOp::LinearDodge,
        BlendOp::LinearLight,
        BlendOp::VividLight,
        BlendOp::HardMix,
        BlendOp::Darken,
        BlendOp::Lighten,
        BlendOp::PassthroughTop,
        BlendOp::PassthroughBottom,
        BlendOp::Atop,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Patch-file name of the operation
    pub fn name(self) -> &'static str {
        match self {
            BlendOp::Add => "add",
            BlendOp::Average => "average",
            BlendOp::Multiply => "multiply",
            BlendOp::Screen => "screen",
            BlendOp::Overlay => "overlay",
            BlendOp::Difference => "difference",
            BlendOp::Subtract => "subtract",
            BlendOp::HardLight => "hard_light",
            BlendOp::ColorBurn => "color_burn",
            BlendOp::ColorDodge => "color_dodge",
            BlendOp::Hue => "hue",
            BlendOp::Color => "color",
            BlendOp::Reflect => "reflect",
            BlendOp::Glow => "glow",
            BlendOp::PinLight => "pin_light",
            BlendOp::Exclusion => "exclusion",
            BlendOp::Negation => "negation",
            BlendOp::LinearBurn => "linear_burn",
            BlendOp::LinearDodge => "linear_dodge",
            BlendOp::LinearLight => "linear_light",
            BlendOp::VividLight => "vivid_light",
            BlendOp::HardMix => "hard_mix",
            BlendOp::Darken => "darken",
            BlendOp::Lighten => "lighten",
            BlendOp::PassthroughTop => "passthrough_top",
            BlendOp::PassthroughBottom => "passthrough_bottom",
            BlendOp::Atop => "atop",
        }
    }
}

impl fmt::Display for BlendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn overlay(b: f32, t: f32) -> f32 {
    if b < 0.5 {
        2.0 * b * t
    } else {
        1.0 - 2.0 * (1.0 - b) * (1.0 - t)
    }
}

fn color_burn(b: f32, t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        (1.0 - (1.0 - b) / t).max(0.0)
    }
}

fn color_dodge(b: f32, t: f32) -> f32 {
    if t >= 1.0 {
        1.0
    } else {
        (b / (1.0 - t)).min(1.0)
    }
}

fn reflect(b: f32, t: f32) -> f32 {
    if t >= 1.0 {
        1.0
    } else {
        (b * b / (1.0 - t)).min(1.0)
    }
}

fn linear_burn(b: f32, t: f32) -> f32 {
    (b + t - 1.0).max(0.0)
}

fn linear_dodge(b: f32, t: f32) -> f32 {
    (b + t).min(1.0)
}

fn vivid_light(b: f32, t: f32) -> f32 {
    if t < 0.5 {
        color_burn(b, 2.0 * t)
    } else {
        color_dodge(b, 2.0 * (t - 0.5))
    }
}

fn channel(op: BlendOp, b: f32, t: f32) -> f32 {
    match op {
        BlendOp::Add => (b + t).min(1.0),
        BlendOp::Average => (b + t) / 2.0,
        BlendOp::Multiply => b * t,
        BlendOp::Screen => 1.0 - (1.0 - b) * (1.0 - t),
        BlendOp::Overlay => overlay(b, t),
        BlendOp::Difference => (b - t).abs(),
        BlendOp::Subtract => (b - t).max(0.0),
        BlendOp::HardLight => overlay(t, b),
        BlendOp::ColorBurn => color_burn(b, t),
        BlendOp::ColorDodge => color_dodge(b, t),
        BlendOp::Reflect => reflect(b, t),
        BlendOp::Glow => reflect(t, b),
        BlendOp::PinLight => {
            if t < 0.5 {
                b.min(2.0 * t)
            } else {
                b.max(2.0 * (t - 0.5))
            }
        }
        BlendOp::Exclusion => b + t - 2.0 * b * t,
        BlendOp::Negation => 1.0 - (1.0 - b - t).abs(),
        BlendOp::LinearBurn => linear_burn(b, t),
        BlendOp::LinearDodge => linear_dodge(b, t),
        BlendOp::LinearLight => {
            if t < 0.5 {
                linear_burn(b, 2.0 * t)
            } else {
                linear_dodge(b, 2.0 * (t - 0.5))
            }
        }
        BlendOp::VividLight => vivid_light(b, t),
        BlendOp::HardMix => {
            if vivid_light(b, t) < 0.5 {
                0.0
            } else {
                1.0
            }
        }
        BlendOp::Darken => b.min(t),
        BlendOp::Lighten => b.max(t),
        BlendOp::PassthroughTop => t,
        BlendOp::PassthroughBottom => b,
        // whole-pixel operations, handled in blend_pixel
        BlendOp::Hue | BlendOp::Color | BlendOp::Atop => b,
    }
}

pub(crate) fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max <= 0.0 { 0.0 } else { delta / max };
    [hue, saturation, max]
}

pub(crate) fn hsv_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    let lane = |k: f32| {
        let p = (((h + k).fract()) * 6.0 - 3.0).abs();
        let c = (p - 1.0).clamp(0.0, 1.0);
        v * (1.0 + (c - 1.0) * s)
    };
    [lane(1.0), lane(2.0 / 3.0), lane(1.0 / 3.0)]
}

/// Blend one pixel. Output alpha is 1 except for [`BlendOp::Atop`], which keeps the bottom's.
pub fn blend_pixel(op: BlendOp, bottom: [f32; 4], top: [f32; 4]) -> [f32; 4] {
    let b = [bottom[0], bottom[1], bottom[2]];
    let t = [top[0], top[1], top[2]];
    match op {
        BlendOp::Atop => {
            let (ta, ba) = (top[3], bottom[3]);
            [
                t[0] * ba + b[0] * (1.0 - ta),
                t[1] * ba + b[1] * (1.0 - ta),
                t[2] * ba + b[2] * (1.0 - ta),
                ba,
            ]
        }
        BlendOp::Hue | BlendOp::Color => {
            let hb = rgb_to_hsv(b);
            let ht = rgb_to_hsv(t);
            let mixed = if op == BlendOp::Hue {
                [ht[0], hb[1], hb[2]]
            } else {
                [ht[0], ht[1], hb[2]]
            };
            let [r, g, bl] = hsv_to_rgb(mixed);
            [r, g, bl, 1.0]
        }
        _ => [
            channel(op, b[0], t[0]),
            channel(op, b[1], t[1]),
            channel(op, b[2], t[2]),
            1.0,
        ],
    }
}

/// An RGBA frame in f32, row-major from the top-left
#[derive(Debug, Clone, PartialEq)]
pub struct CpuFrame {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuFrame {
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// Opaque black, the seed of every fold
    pub fn black(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0, 0.0, 0.0, 1.0])
    }

    /// Build from tightly packed RGBA8 bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = (width * height * 4) as usize;
        if bytes.len() != expected {
            return Err(ObliqueError::Config(format!(
                "RGBA8 frame of {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                bytes.len()
            )));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| {
                [
                    p[0] as f32 / 255.0,
                    p[1] as f32 / 255.0,
                    p[2] as f32 / 255.0,
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// `self` as bottom, `top` as top
    pub fn blend(&self, top: &CpuFrame, op: BlendOp) -> Result<CpuFrame> {
        if top.size() != self.size() {
            return Err(ObliqueError::FrameSize {
                expected: self.size(),
                actual: top.size(),
            });
        }
        let pixels = self
            .pixels
            .iter()
            .zip(&top.pixels)
            .map(|(&b, &t)| blend_pixel(op, b, t))
            .collect();
        Ok(CpuFrame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

/// Left fold of `layers` over an opaque black frame, in declaration order
pub fn fold_frames(width: u32, height: u32, layers: &[(&CpuFrame, BlendOp)]) -> Result<CpuFrame> {
    layers
        .iter()
        .try_fold(CpuFrame::black(width, height), |acc, (frame, op)| {
            acc.blend(frame, *op)
        })
}
