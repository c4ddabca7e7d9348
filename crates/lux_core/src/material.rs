//! Surface materials for the Blinn-Phong shading model.

use lux_math::Color;
use thiserror::Error;

/// Errors raised for out-of-range material parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("Coefficient {name} = {value} is outside [0, 1]")]
    Coefficient { name: &'static str, value: f32 },

    #[error("Specular exponent {0} must be positive")]
    Shininess(f32),

    #[error("Opacity {0} is outside [0, 1]")]
    Opacity(f32),

    #[error("Index of refraction {0} must be positive")]
    RefractiveIndex(f32),
}

/// How a surface treats secondary rays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Finish {
    /// Local illumination only
    BlinnPhong,
    /// Local illumination plus Fresnel-weighted reflection, and refraction
    /// when `opacity < 1`
    Reflective { opacity: f32, ior: f32 },
}

/// A material definition.
///
/// Texture and normal-map references are indices into the scene's texture
/// table, which outlives every material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    diffuse: Color,
    specular: Color,
    ka: f32,
    kd: f32,
    ks: f32,
    shininess: f32,
    finish: Finish,
    texture: Option<usize>,
    normal_map: Option<usize>,
}

fn coefficient(name: &'static str, value: f32) -> Result<f32, MaterialError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(MaterialError::Coefficient { name, value })
    }
}

impl Material {
    /// Create an opaque Blinn-Phong material.
    ///
    /// - `diffuse`/`specular`: the `Od`/`Os` colors
    /// - `ka`, `kd`, `ks`: ambient, diffuse and specular weights in `[0, 1]`
    /// - `shininess`: specular exponent `n > 0`
    pub fn new(
        diffuse: Color,
        specular: Color,
        ka: f32,
        kd: f32,
        ks: f32,
        shininess: f32,
    ) -> Result<Self, MaterialError> {
        if !(shininess > 0.0 && shininess.is_finite()) {
            return Err(MaterialError::Shininess(shininess));
        }
        Ok(Self {
            diffuse,
            specular,
            ka: coefficient("ka", ka)?,
            kd: coefficient("kd", kd)?,
            ks: coefficient("ks", ks)?,
            shininess,
            finish: Finish::BlinnPhong,
            texture: None,
            normal_map: None,
        })
    }

    /// Make the material reflective with the given opacity and index of
    /// refraction.
    pub fn with_reflection(mut self, opacity: f32, ior: f32) -> Result<Self, MaterialError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MaterialError::Opacity(opacity));
        }
        if !(ior > 0.0 && ior.is_finite()) {
            return Err(MaterialError::RefractiveIndex(ior));
        }
        self.finish = Finish::Reflective { opacity, ior };
        Ok(self)
    }

    /// Attach a diffuse texture (index into the scene's texture table).
    pub fn with_texture(mut self, texture: usize) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Attach a tangent-space normal map.
    pub fn with_normal_map(mut self, normal_map: usize) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    pub fn diffuse(&self) -> Color {
        self.diffuse
    }

    pub fn specular(&self) -> Color {
        self.specular
    }

    pub fn ka(&self) -> f32 {
        self.ka
    }

    pub fn kd(&self) -> f32 {
        self.kd
    }

    pub fn ks(&self) -> f32 {
        self.ks
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn finish(&self) -> Finish {
        self.finish
    }

    pub fn texture(&self) -> Option<usize> {
        self.texture
    }

    pub fn normal_map(&self) -> Option<usize> {
        self.normal_map
    }

    /// Opacity, `1` for opaque finishes.
    pub fn opacity(&self) -> f32 {
        match self.finish {
            Finish::BlinnPhong => 1.0,
            Finish::Reflective { opacity, .. } => opacity,
        }
    }
}
