//! The render-time view of a scene: primitives plus their BVH.

use lux_core::{GeometryError, Material, Scene};
use lux_math::{Aabb, Interval, Ray};
use thiserror::Error;

use crate::bvh::{Bvh, BvhError};
use crate::primitive::{Hit, Primitive};

/// Errors that can occur while preparing a scene for rendering.
#[derive(Error, Debug)]
pub enum WorldError {
    #[error("BVH construction failed: {0}")]
    Bvh(#[from] BvhError),

    #[error("Material {material} refers to missing texture {texture}")]
    MissingTexture { material: usize, texture: usize },

    #[error("Shape {shape} is invalid: {source}")]
    InvalidShape {
        shape: usize,
        #[source]
        source: GeometryError,
    },
}

pub type WorldResult<T> = Result<T, WorldError>;

/// Immutable, shareable scene ready for ray queries.
pub struct World {
    scene: Scene,
    primitives: Vec<Primitive>,
    bvh: Bvh,
}

impl World {
    /// Convert the scene's shape records into primitives and build the BVH.
    pub fn build(scene: Scene, max_leaf_size: usize) -> WorldResult<Self> {
        for (id, material) in scene.materials.iter().enumerate() {
            for texture in [material.texture(), material.normal_map()].into_iter().flatten() {
                if texture >= scene.textures.len() {
                    return Err(WorldError::MissingTexture {
                        material: id,
                        texture,
                    });
                }
            }
        }

        for (id, record) in scene.shapes.iter().enumerate() {
            scene
                .validate_shape(record)
                .map_err(|source| WorldError::InvalidShape { shape: id, source })?;
        }

        let primitives: Vec<Primitive> = scene.shapes.iter().map(Primitive::new).collect();
        let boxes: Vec<Aabb> = primitives
            .iter()
            .map(|p| p.bounding_box(&scene.vertices))
            .collect();
        let bvh = Bvh::build(&boxes, max_leaf_size)?;

        Ok(Self {
            scene,
            primitives,
            bvh,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Material of a primitive. Shape records are validated by
    /// [`World::build`], so every primitive's material exists.
    pub fn material(&self, primitive: &Primitive) -> &Material {
        &self.scene.materials[primitive.material()]
    }

    /// Nearest surface along `ray` inside `ray_t`.
    pub fn closest_hit(&self, ray: &Ray, ray_t: Interval) -> Option<(&Primitive, Hit)> {
        let arena = &self.scene.vertices;
        self.bvh
            .closest_hit(ray, ray_t, |i, range| {
                self.primitives[i].intersect(ray, range, arena)
            })
            .map(|(i, hit)| (&self.primitives[i], hit))
    }

    /// True when any primitive blocks `ray` strictly inside `ray_t`.
    pub fn is_occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        let arena = &self.scene.vertices;
        self.bvh.intersected_leaves(ray).into_iter().any(|leaf| {
            leaf.iter()
                .any(|&i| self.primitives[i].intersect(ray, ray_t, arena).is_some())
        })
    }
}
