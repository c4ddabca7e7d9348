//! Pinhole camera and the view-plane frustum derived from it.

use lux_math::Vec3;
use thiserror::Error;

/// Errors that make a camera unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("View direction must be non-zero")]
    ZeroViewDirection,

    #[error("Up direction {0:?} is zero or parallel to the view direction")]
    DegenerateUp(Vec3),

    #[error("Vertical field of view {0} must lie strictly between 0 and 180 degrees")]
    FieldOfView(f32),

    #[error("Image size {width}x{height} must be non-zero")]
    ImageSize { width: u32, height: u32 },
}

/// Distance from the eye to the view plane. Any positive value gives the
/// same image.
const VIEW_DISTANCE: f32 = 1.0;

/// Camera as described by the scene file.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub view_dir: Vec3,
    pub up_dir: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    /// Compute the view-plane corners and per-pixel steps.
    pub fn frustum(&self) -> Result<ViewFrustum, CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::ImageSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(CameraError::FieldOfView(self.vfov));
        }

        let n = self
            .view_dir
            .try_normalize()
            .ok_or(CameraError::ZeroViewDirection)?;
        let u = self
            .view_dir
            .cross(self.up_dir)
            .try_normalize()
            .ok_or(CameraError::DegenerateUp(self.up_dir))?;
        let v = u.cross(n);

        let plane_height = 2.0 * VIEW_DISTANCE * (self.vfov.to_radians() / 2.0).tan();
        let plane_width = plane_height * (self.width as f32 / self.height as f32);

        let center = self.eye + VIEW_DISTANCE * n;
        let half_u = u * (plane_width / 2.0);
        let half_v = v * (plane_height / 2.0);

        let upper_left = center - half_u + half_v;
        let upper_right = center + half_u + half_v;
        let lower_left = center - half_u - half_v;
        let lower_right = center + half_u - half_v;

        Ok(ViewFrustum {
            eye: self.eye,
            upper_left,
            upper_right,
            lower_left,
            lower_right,
            delta_h: (upper_right - upper_left) / self.width as f32,
            delta_v: (lower_left - upper_left) / self.height as f32,
            width: self.width,
            height: self.height,
        })
    }
}

/// World-space view plane: four corners, the eye, and per-pixel steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewFrustum {
    pub eye: Vec3,
    pub upper_left: Vec3,
    pub upper_right: Vec3,
    pub lower_left: Vec3,
    pub lower_right: Vec3,
    /// Step between horizontally adjacent pixels
    pub delta_h: Vec3,
    /// Step between vertically adjacent pixels (downward)
    pub delta_v: Vec3,
    pub width: u32,
    pub height: u32,
}

impl ViewFrustum {
    /// Center of pixel `(x, y)` on the view plane; `(0, 0)` is the top-left.
    #[inline]
    pub fn pixel_position(&self, x: u32, y: u32) -> Vec3 {
        self.upper_left + (x as f32 + 0.5) * self.delta_h + (y as f32 + 0.5) * self.delta_v
    }
}
