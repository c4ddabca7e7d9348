//! Light sources: point and directional, optionally attenuated.

use lux_math::{Color, Vec3};
use thiserror::Error;

/// Errors raised for invalid light parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LightError {
    #[error("Attenuation coefficients ({c1}, {c2}, {c3}) must be non-negative and not all zero")]
    Attenuation { c1: f32, c2: f32, c3: f32 },

    #[error("Directional light needs a non-zero direction")]
    ZeroDirection,
}

/// Distance falloff `1 / (c1 + c2 d + c3 d^2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    c1: f32,
    c2: f32,
    c3: f32,
}

impl Attenuation {
    pub fn new(c1: f32, c2: f32, c3: f32) -> Result<Self, LightError> {
        let valid = [c1, c2, c3].iter().all(|c| *c >= 0.0 && c.is_finite())
            && c1 + c2 + c3 > 0.0;
        if !valid {
            return Err(LightError::Attenuation { c1, c2, c3 });
        }
        Ok(Self { c1, c2, c3 })
    }

    /// Falloff factor at distance `d`.
    pub fn factor(&self, d: f32) -> f32 {
        1.0 / (self.c1 + self.c2 * d + self.c3 * d * d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Point { position: Vec3 },
    /// `direction` is the unit direction the light travels in
    Directional { direction: Vec3 },
}

/// A light source with its color.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    kind: LightKind,
    color: Color,
    attenuation: Option<Attenuation>,
}

impl Light {
    pub fn point(position: Vec3, color: Color) -> Self {
        Self {
            kind: LightKind::Point { position },
            color,
            attenuation: None,
        }
    }

    pub fn directional(direction: Vec3, color: Color) -> Result<Self, LightError> {
        let direction = direction.try_normalize().ok_or(LightError::ZeroDirection)?;
        Ok(Self {
            kind: LightKind::Directional { direction },
            color,
            attenuation: None,
        })
    }

    /// Attach distance attenuation.
    ///
    /// Directional lights have no finite distance to attenuate over, so the
    /// coefficients are dropped for them.
    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        match self.kind {
            LightKind::Point { .. } => self.attenuation = Some(attenuation),
            LightKind::Directional { .. } => {
                log::warn!("Ignoring attenuation on directional light");
            }
        }
        self
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn attenuation(&self) -> Option<Attenuation> {
        self.attenuation
    }

    /// Unit vector from `point` toward the light and the distance to it
    /// (infinite for directional lights).
    ///
    /// Returns `None` when `point` sits exactly on a point light.
    pub fn toward(&self, point: Vec3) -> Option<(Vec3, f32)> {
        match self.kind {
            LightKind::Point { position } => {
                let offset = position - point;
                let distance = offset.length();
                offset.try_normalize().map(|l| (l, distance))
            }
            LightKind::Directional { direction } => Some((-direction, f32::INFINITY)),
        }
    }

    /// Attenuation at `distance`, `1` for unattenuated lights.
    pub fn falloff(&self, distance: f32) -> f32 {
        match self.attenuation {
            Some(att) => att.factor(distance),
            None => 1.0,
        }
    }
}
