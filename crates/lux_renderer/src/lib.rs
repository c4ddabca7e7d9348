//! Lux Renderer - Whitted-style CPU ray tracing
//!
//! Turns a loaded [`lux_core::Scene`] into an image:
//! - SAH-built BVH over spheres and triangles
//! - Blinn-Phong shading with shadow rays, textures and normal maps
//! - Fresnel-weighted reflection and refraction
//! - Row-band parallel rendering on a rayon pool
//! - PPM output

mod bvh;
mod output;
mod primitive;
mod renderer;
mod shading;
mod shadow;
mod world;

pub use bvh::{Bvh, BvhError, BvhNode, BvhResult, BvhStats, INTERSECTION_COST, TRAVERSAL_COST};
pub use output::{save_ppm, write_ppm};
pub use primitive::{Hit, Primitive};
pub use renderer::{
    partition_rows, render, render_pixel, ImageBuffer, RenderConfig, RenderError, RenderResult,
    RowBandMut, DEFAULT_LEAF_SIZE, DEFAULT_MAX_DEPTH,
};
pub use shading::{schlick, Tracer, HIT_EPSILON};
pub use shadow::{illuminates, light_factor, SHADOW_EPSILON};
pub use world::{World, WorldError, WorldResult};

/// Re-export common math types from lux_math
pub use lux_math::{Aabb, Color, Interval, Ray, Vec3};
