// Re-export glam for convenience
pub use glam::*;

// Lux math types
mod aabb;
mod color;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use color::{Color, ColorError};
pub use interval::Interval;
pub use ray::{Ray, RayError};

/// Reflect `v` about the unit normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}
