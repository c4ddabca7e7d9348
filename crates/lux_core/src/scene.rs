//! Scene container.
//!
//! A `Scene` owns everything the renderer reads: camera, lights, materials,
//! textures, vertex data and shape records. It is built once by the loader
//! and never mutated while rendering.

use std::sync::Arc;

use lux_math::Color;
use thiserror::Error;

use crate::camera::Camera;
use crate::geometry::{GeometryError, Shape, ShapeRecord, VertexArena};
use crate::light::Light;
use crate::material::Material;
use crate::texture::Texture;

/// Errors raised for invalid depth-cue parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DepthCueError {
    #[error("Depth-cue blend factor {0} is outside [0, 1]")]
    Factor(f32),

    #[error("Depth-cue far distance {far} must exceed near distance {near}")]
    Distances { near: f32, far: f32 },
}

/// Distance-based blending toward a fog color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthCue {
    color: Color,
    a_max: f32,
    a_min: f32,
    dist_max: f32,
    dist_min: f32,
}

impl DepthCue {
    pub fn new(
        color: Color,
        a_max: f32,
        a_min: f32,
        dist_max: f32,
        dist_min: f32,
    ) -> Result<Self, DepthCueError> {
        for a in [a_max, a_min] {
            if !(0.0..=1.0).contains(&a) {
                return Err(DepthCueError::Factor(a));
            }
        }
        if !(dist_max > dist_min) {
            return Err(DepthCueError::Distances {
                near: dist_min,
                far: dist_max,
            });
        }
        Ok(Self {
            color,
            a_max,
            a_min,
            dist_max,
            dist_min,
        })
    }

    /// Weight of the shaded color at `distance`: `a_max` up to the near
    /// distance, `a_min` from the far distance on, linear in between.
    pub fn factor(&self, distance: f32) -> f32 {
        if distance <= self.dist_min {
            self.a_max
        } else if distance >= self.dist_max {
            self.a_min
        } else {
            let t = (self.dist_max - distance) / (self.dist_max - self.dist_min);
            self.a_min + (self.a_max - self.a_min) * t
        }
    }

    /// Blend `color` toward the fog color for a surface at `distance`.
    pub fn apply(&self, color: Color, distance: f32) -> Color {
        color.blend(self.color, self.factor(distance))
    }
}

/// A complete scene ready for rendering.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Scene name (usually from filename)
    pub name: String,

    pub camera: Camera,

    /// Color of rays that hit nothing
    pub background: Color,

    /// Index of refraction of the medium the camera sits in
    pub background_ior: f32,

    pub depth_cue: Option<DepthCue>,

    pub lights: Vec<Light>,

    pub materials: Vec<Material>,

    /// Shared, read-only textures referenced by material index
    pub textures: Vec<Arc<Texture>>,

    pub vertices: VertexArena,

    pub shapes: Vec<ShapeRecord>,
}

impl Scene {
    /// Create an empty scene around a camera.
    pub fn new(name: impl Into<String>, camera: Camera) -> Self {
        Self {
            name: name.into(),
            camera,
            background: Color::BLACK,
            background_ior: 1.0,
            depth_cue: None,
            lights: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            vertices: VertexArena::new(),
            shapes: Vec::new(),
        }
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Add a shape drawn with `material`.
    ///
    /// Triangle vertex references are checked against the vertex arena.
    pub fn add_shape(&mut self, shape: Shape, material: usize) -> Result<(), GeometryError> {
        let record = ShapeRecord { shape, material };
        self.validate_shape(&record)?;
        self.shapes.push(record);
        Ok(())
    }

    /// Check that a record's material and vertex references resolve in
    /// this scene.
    pub fn validate_shape(&self, record: &ShapeRecord) -> Result<(), GeometryError> {
        if record.material >= self.materials.len() {
            return Err(GeometryError::UnknownMaterial(record.material));
        }
        if let Shape::Triangle { vertices } = &record.shape {
            for v in vertices {
                self.vertices.validate(v)?;
            }
        }
        Ok(())
    }

    /// Get a material by ID.
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn texture(&self, id: usize) -> Option<&Texture> {
        self.textures.get(id).map(|t| t.as_ref())
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.shapes
            .iter()
            .filter(|s| matches!(s.shape, Shape::Triangle { .. }))
            .count()
    }
}
