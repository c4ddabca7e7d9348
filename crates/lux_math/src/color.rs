use std::ops::{Add, AddAssign, Mul};

use thiserror::Error;

use crate::Vec3;

/// Errors raised when a color channel is out of range.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ColorError {
    #[error("Color channel {channel} = {value} is outside [0, 1]")]
    OutOfRange { channel: &'static str, value: f32 },
}

/// RGB color.
///
/// Channels are validated to lie in `[0, 1]` when a color is constructed or
/// set. Arithmetic used for light accumulation is unchecked and may leave the
/// range; values are only clamped when quantized for output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
}

fn check(channel: &'static str, value: f32) -> Result<f32, ColorError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ColorError::OutOfRange { channel, value })
    }
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    /// Create a color, rejecting channels outside `[0, 1]` (and NaN).
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self, ColorError> {
        Ok(Self {
            r: check("r", r)?,
            g: check("g", g)?,
            b: check("b", b)?,
        })
    }

    /// Gray with all three channels equal to `v`.
    pub fn gray(v: f32) -> Result<Self, ColorError> {
        Self::new(v, v, v)
    }

    /// Build a color from an accumulated vector without range checks.
    #[inline]
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            r: v.x,
            g: v.y,
            b: v.z,
        }
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    #[inline]
    pub fn r(&self) -> f32 {
        self.r
    }

    #[inline]
    pub fn g(&self) -> f32 {
        self.g
    }

    #[inline]
    pub fn b(&self) -> f32 {
        self.b
    }

    pub fn set_r(&mut self, value: f32) -> Result<(), ColorError> {
        self.r = check("r", value)?;
        Ok(())
    }

    pub fn set_g(&mut self, value: f32) -> Result<(), ColorError> {
        self.g = check("g", value)?;
        Ok(())
    }

    pub fn set_b(&mut self, value: f32) -> Result<(), ColorError> {
        self.b = check("b", value)?;
        Ok(())
    }

    /// Linear blend: `self` at `t = 1`, `other` at `t = 0`.
    pub fn blend(self, other: Color, t: f32) -> Color {
        self * t + other * (1.0 - t)
    }

    /// Rec. 709 relative luminance.
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Copy with every channel clamped to `[0, 1]`.
    pub fn clamped(&self) -> Color {
        Color {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }

    /// 8-bit channels via `round(clamp(c, 0, 1) * 255)`.
    pub fn quantize(&self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
        }
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        Color {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
        }
    }
}

/// Component-wise product.
impl Mul for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Color {
        Color {
            r: self.r * rhs.r,
            g: self.g * rhs.g,
            b: self.b * rhs.b,
        }
    }
}
