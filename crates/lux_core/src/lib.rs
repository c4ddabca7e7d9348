//! Lux Core - Scene description for the Lux ray tracer.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Camera`, `Material`, `Light`, `DepthCue`
//! - **Geometry records**: a vertex arena plus sphere/triangle shape records
//!   that refer into it by index
//! - **Textures**: image-backed color and normal maps
//! - **Parser**: the keyword-per-line scene description format
//!
//! # Example
//!
//! ```ignore
//! use lux_core::load_scene;
//!
//! let scene = load_scene("scenes/spheres.txt")?;
//! println!("Loaded {} shapes, {} lights",
//!     scene.shape_count(),
//!     scene.lights.len());
//! ```

pub mod camera;
pub mod geometry;
pub mod light;
pub mod material;
pub mod parser;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use camera::{Camera, CameraError, ViewFrustum};
pub use geometry::{GeometryError, Shape, ShapeRecord, VertexArena, VertexRef};
pub use light::{Attenuation, Light, LightError, LightKind};
pub use material::{Finish, Material, MaterialError};
pub use parser::{load_scene, parse_scene, SceneError, SceneParser, SceneResult};
pub use scene::{DepthCue, DepthCueError, Scene};
pub use texture::{Texture, TextureCache, TextureError};
