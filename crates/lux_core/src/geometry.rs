//! Geometry records produced by the scene loader.
//!
//! Triangles do not own their vertex data. They hold stable indices into a
//! [`VertexArena`] owned by the scene, which the renderer resolves when it
//! needs positions, normals or texture coordinates.

use lux_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors raised for malformed geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Sphere radius {0} must be positive")]
    Radius(f32),

    #[error("{kind} index {index} is out of range (have {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Vertex normal {0:?} cannot be normalized")]
    ZeroNormal(Vec3),

    #[error("Material {0} does not exist")]
    UnknownMaterial(usize),
}

/// Shared vertex storage: positions, unit normals and texture coordinates.
#[derive(Clone, Debug, Default)]
pub struct VertexArena {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
}

impl VertexArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position and return its index.
    pub fn push_position(&mut self, p: Vec3) -> usize {
        self.positions.push(p);
        self.positions.len() - 1
    }

    /// Add a normal (normalized here) and return its index.
    pub fn push_normal(&mut self, n: Vec3) -> Result<usize, GeometryError> {
        let n = n.try_normalize().ok_or(GeometryError::ZeroNormal(n))?;
        self.normals.push(n);
        Ok(self.normals.len() - 1)
    }

    /// Add a texture coordinate and return its index.
    pub fn push_texcoord(&mut self, uv: Vec2) -> usize {
        self.texcoords.push(uv);
        self.texcoords.len() - 1
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals[index]
    }

    #[inline]
    pub fn texcoord(&self, index: usize) -> Vec2 {
        self.texcoords[index]
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len()
    }

    pub fn texcoord_count(&self) -> usize {
        self.texcoords.len()
    }

    /// Check that every index of `v` refers to stored data.
    pub fn validate(&self, v: &VertexRef) -> Result<(), GeometryError> {
        check("position", v.position, self.positions.len())?;
        if let Some(n) = v.normal {
            check("normal", n, self.normals.len())?;
        }
        if let Some(t) = v.texcoord {
            check("texcoord", t, self.texcoords.len())?;
        }
        Ok(())
    }
}

fn check(kind: &'static str, index: usize, len: usize) -> Result<(), GeometryError> {
    if index < len {
        Ok(())
    } else {
        Err(GeometryError::IndexOutOfRange { kind, index, len })
    }
}

/// One triangle corner: a position index plus optional normal and
/// texture-coordinate indices (all zero-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexRef {
    pub position: usize,
    pub normal: Option<usize>,
    pub texcoord: Option<usize>,
}

impl VertexRef {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            normal: None,
            texcoord: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Triangle { vertices: [VertexRef; 3] },
}

impl Shape {
    pub fn sphere(center: Vec3, radius: f32) -> Result<Self, GeometryError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::Radius(radius));
        }
        Ok(Shape::Sphere { center, radius })
    }

    /// True for a triangle whose corners are collinear or coincident.
    pub fn is_degenerate(&self, arena: &VertexArena) -> bool {
        match self {
            Shape::Sphere { .. } => false,
            Shape::Triangle { vertices } => {
                let [a, b, c] = vertices.map(|v| arena.position(v.position));
                (b - a).cross(c - a).length_squared() == 0.0
            }
        }
    }
}

/// A shape together with the material it is drawn with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeRecord {
    pub shape: Shape,
    pub material: usize,
}
