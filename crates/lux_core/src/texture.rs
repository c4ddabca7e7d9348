//! Texture loading and caching for materials.
//!
//! Images are decoded once with the `image` crate and stored as float RGB.
//! The cache hands out stable indices so materials can share a texture
//! without owning it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lux_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture is {width}x{height} but has {len} pixels")]
    SizeMismatch { width: u32, height: u32, len: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture with pixel data.
///
/// Pixels are RGB in `[0, 1]`, row-major, first row at the top of the image.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Vec3>,
    /// Source file path (for debugging)
    pub path: String,
}

impl Texture {
    /// Create a texture from pixel data.
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: Vec<Vec3>,
        path: impl Into<String>,
    ) -> TextureResult<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            path: path.into(),
        })
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
            path: "<solid>".to_string(),
        }
    }

    /// Sample the texture at UV coordinates (bilinear filtering).
    ///
    /// UVs wrap; `(0, 0)` is the bottom-left of the image.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        // Flip V for image coordinates
        let x = u * (self.width - 1) as f32;
        let y = (1.0 - v) * (self.height - 1) as f32;

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.pixel(x0, y0).lerp(self.pixel(x1, y0), fx);
        let bottom = self.pixel(x0, y1).lerp(self.pixel(x1, y1), fx);
        top.lerp(bottom, fy)
    }

    /// Sample as a tangent-space normal map, decoding `2c - 1`.
    pub fn sample_normal(&self, uv: Vec2) -> Vec3 {
        (self.sample(uv) * 2.0 - Vec3::ONE).normalize_or_zero()
    }

    fn pixel(&self, x: u32, y: u32) -> Vec3 {
        let idx = (y * self.width + x) as usize;
        self.pixels.get(idx).copied().unwrap_or(Vec3::ZERO)
    }
}

/// Cache for loaded textures.
///
/// Each distinct file is loaded once; repeated loads return the same index.
#[derive(Default)]
pub struct TextureCache {
    textures: Vec<Arc<Texture>>,
    by_path: HashMap<PathBuf, usize>,
    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Self::default()
        }
    }

    /// Load a texture from file, using the cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<usize> {
        let full_path = self.resolve_path(path);
        if let Some(&index) = self.by_path.get(&full_path) {
            return Ok(index);
        }

        let texture = load_texture_file(&full_path)?;
        log::debug!(
            "Loaded texture: {} ({}x{})",
            full_path.display(),
            texture.width,
            texture.height
        );

        Ok(self.insert(full_path, texture))
    }

    /// Register an already decoded texture under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, texture: Texture) -> usize {
        let index = self.textures.len();
        self.textures.push(Arc::new(texture));
        self.by_path.insert(path.into(), index);
        index
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Hand the loaded textures to the scene, indexed as returned by `load`.
    pub fn into_textures(self) -> Vec<Arc<Texture>> {
        self.textures
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Load a texture from a file path.
fn load_texture_file(path: &Path) -> TextureResult<Texture> {
    let img = image::open(path).map_err(|source| TextureError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb
        .pixels()
        .map(|p| Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32) / 255.0)
        .collect();

    Texture::from_pixels(width, height, pixels, path.to_string_lossy())
}
