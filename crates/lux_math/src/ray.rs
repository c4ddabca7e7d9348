use thiserror::Error;

use crate::Vec3;

/// Errors raised while constructing a ray.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RayError {
    #[error("Ray direction {0:?} cannot be normalized")]
    DegenerateDirection(Vec3),
}

/// A ray in 3D space with an origin and a unit-length direction.
///
/// The direction is normalized once here, so every consumer can rely on
/// `t` being a true distance. The reciprocal of the direction is cached for
/// slab tests against bounding boxes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray, normalizing `direction`.
    ///
    /// Fails when the direction is zero, infinite or NaN.
    pub fn new(origin: Vec3, direction: Vec3) -> Result<Self, RayError> {
        let direction = direction
            .try_normalize()
            .ok_or(RayError::DegenerateDirection(direction))?;

        Ok(Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        })
    }

    /// Create a ray from `origin` through `target`.
    pub fn towards(origin: Vec3, target: Vec3) -> Result<Self, RayError> {
        Self::new(origin, target - origin)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit direction vector.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Component-wise reciprocal of the direction. Zero components map to
    /// signed infinity.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
