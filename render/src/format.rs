use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::RenderErr;

/// CIE XYZ to linear sRGB (D65).
const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

/// Linear sRGB (D65) to CIE XYZ.
const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

fn mat_vec(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn mat_t_vec(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
    ]
}

pub fn xyz_to_srgb(xyz: [f32; 3]) -> [f32; 3] {
    mat_vec(&XYZ_TO_SRGB, xyz)
}

pub fn srgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    mat_vec(&SRGB_TO_XYZ, rgb)
}

/// Adjoint of `srgb_to_xyz`: maps a gradient w.r.t. XYZ to one w.r.t. RGB.
pub fn srgb_to_xyz_adjoint(grad_xyz: [f32; 3]) -> [f32; 3] {
    mat_t_vec(&SRGB_TO_XYZ, grad_xyz)
}

/// The channel layout of a developed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Luminance only.
    #[default]
    Y,
    Xyz,
    /// Linear sRGB.
    Rgb,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Y => 1,
            PixelFormat::Xyz | PixelFormat::Rgb => 3,
        }
    }

    /// Converts one XYZ value into this format, writing `channels()` values.
    pub fn convert(self, xyz: [f32; 3], out: &mut [f32]) {
        match self {
            PixelFormat::Y => out[0] = xyz[1],
            PixelFormat::Xyz => out.copy_from_slice(&xyz),
            PixelFormat::Rgb => out.copy_from_slice(&xyz_to_srgb(xyz)),
        }
    }

    /// Adjoint of `convert`: maps a per-channel gradient back to XYZ.
    pub fn convert_adjoint(self, grad: &[f32]) -> [f32; 3] {
        match self {
            PixelFormat::Y => [0., grad[0], 0.],
            PixelFormat::Xyz => [grad[0], grad[1], grad[2]],
            PixelFormat::Rgb => mat_t_vec(&XYZ_TO_SRGB, [grad[0], grad[1], grad[2]]),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = RenderErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "y" => Ok(PixelFormat::Y),
            "xyz" => Ok(PixelFormat::Xyz),
            "rgb" => Ok(PixelFormat::Rgb),
            other => Err(RenderErr::InvalidPixelFormat(other.to_string())),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PixelFormat::Y => "y",
            PixelFormat::Xyz => "xyz",
            PixelFormat::Rgb => "rgb",
        };

        f.write_str(s)
    }
}
