//! Blend states for the color attachment of a render pipeline.
//!
//! The software rasterizer applies these per pixel to combine a sampled
//! source pixel with the pixel already in the target; the wgpu device maps
//! each onto a fixed-function blend.

use serde::{Deserialize, Serialize};

/// How a draw combines with the existing target contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendState {
    /// Blending disabled: the source overwrites the target.
    #[default]
    Replace,
    /// `dst = src * c + dst * (1 - c)`, with `c` the draw's blend constant.
    ConstantAlpha,
    /// Premultiply-free "over": `dst = src * sa + dst * (1 - sa)`, alpha
    /// `sa + da * (1 - sa)`.
    SourceOver,
}

impl BlendState {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Replace => "Replace",
            Self::ConstantAlpha => "Constant Alpha",
            Self::SourceOver => "Source Over",
        }
    }

    /// Combine one source pixel with one destination pixel.
    #[inline]
    pub fn apply(self, src: [u8; 4], dst: [u8; 4], constant: f32) -> [u8; 4] {
        match self {
            Self::Replace => src,
            Self::ConstantAlpha => {
                let c = constant.clamp(0.0, 1.0);
                let ic = 1.0 - c;
                let mut out = [0u8; 4];
                for ((o, s), d) in out.iter_mut().zip(src).zip(dst) {
                    *o = (s as f32 * c + d as f32 * ic).round() as u8;
                }
                out
            }
            Self::SourceOver => {
                let sa = src[3] as f32 / 255.0;
                let isa = 1.0 - sa;
                let mut out = [0u8; 4];
                for i in 0..3 {
                    out[i] = (src[i] as f32 * sa + dst[i] as f32 * isa).round() as u8;
                }
                out[3] = (src[3] as f32 + dst[3] as f32 * isa).round() as u8;
                out
            }
        }
    }
}
