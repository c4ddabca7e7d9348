//! Scene description parser.
//!
//! The format is one keyword per line followed by whitespace-separated
//! arguments. `#` starts a comment.
//!
//! # Supported Syntax
//!
//! - `eye x y z`, `viewdir x y z`, `updir x y z`
//! - `vfov degrees`, `imsize width height`
//! - `bkgcolor r g b [eta]`
//! - `mtlcolor odr odg odb osr osg osb ka kd ks n [alpha eta]`
//! - `light x y z w r g b` (`w = 1` point, `w = 0` directional)
//! - `attlight x y z w r g b c1 c2 c3`
//! - `depthcueing r g b a_max a_min dist_max dist_min`
//! - `sphere cx cy cz radius`
//! - `v x y z`, `vn x y z`, `vt u v`
//! - `f a b c ...` with corners `v`, `v/vt`, `v//vn` or `v/vt/vn` (1-based)
//! - `texture path`, `bump path`

use std::path::{Path, PathBuf};

use lux_math::{Color, ColorError, Vec2, Vec3};
use thiserror::Error;

use crate::camera::{Camera, CameraError};
use crate::geometry::{GeometryError, Shape, VertexArena, VertexRef};
use crate::light::{Attenuation, Light, LightError};
use crate::material::{Material, MaterialError};
use crate::scene::{DepthCue, DepthCueError, Scene};
use crate::texture::{TextureCache, TextureError};

/// Errors that can occur while loading a scene description.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid value at line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: InvalidValue,
    },

    #[error("Missing required keyword `{0}`")]
    MissingKeyword(&'static str),

    #[error("Invalid camera: {0}")]
    Camera(#[from] CameraError),
}

/// The validation failure behind [`SceneError::Invalid`].
#[derive(Error, Debug)]
pub enum InvalidValue {
    #[error(transparent)]
    Color(#[from] ColorError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Light(#[from] LightError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    DepthCue(#[from] DepthCueError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Result type for scene loading.
pub type SceneResult<T> = Result<T, SceneError>;

/// Load a scene description file. Texture paths resolve relative to the
/// file's directory.
pub fn load_scene<P: AsRef<Path>>(path: P) -> SceneResult<Scene> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");

    let mut parser = SceneParser::new(&content).with_name(name);
    if let Some(dir) = path.parent() {
        parser = parser.with_base_dir(dir);
    }
    let scene = parser.parse()?;

    log::info!(
        "Loaded scene '{}': {} shapes ({} triangles), {} lights, {} materials, {} textures",
        scene.name,
        scene.shape_count(),
        scene.triangle_count(),
        scene.lights.len(),
        scene.materials.len(),
        scene.textures.len()
    );
    log::debug!(
        "Vertex data: {} positions, {} normals, {} texcoords",
        scene.vertices.position_count(),
        scene.vertices.normal_count(),
        scene.vertices.texcoord_count()
    );
    Ok(scene)
}

/// Parse a scene description held in memory.
pub fn parse_scene(content: &str) -> SceneResult<Scene> {
    SceneParser::new(content).parse()
}

/// Scene description parser.
pub struct SceneParser<'a> {
    content: &'a str,
    name: String,
    line: usize,

    eye: Option<Vec3>,
    view_dir: Option<Vec3>,
    up_dir: Option<Vec3>,
    vfov: Option<f32>,
    imsize: Option<(u32, u32)>,

    background: Color,
    background_ior: f32,
    depth_cue: Option<DepthCue>,
    lights: Vec<Light>,
    materials: Vec<Material>,
    current_material: Option<usize>,
    vertices: VertexArena,
    /// Shape, material and the line it was declared on
    shapes: Vec<(Shape, usize, usize)>,
    textures: TextureCache,
}

impl<'a> SceneParser<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            name: "unnamed".to_string(),
            line: 0,
            eye: None,
            view_dir: None,
            up_dir: None,
            vfov: None,
            imsize: None,
            background: Color::BLACK,
            background_ior: 1.0,
            depth_cue: None,
            lights: Vec::new(),
            materials: Vec::new(),
            current_material: None,
            vertices: VertexArena::new(),
            shapes: Vec::new(),
            textures: TextureCache::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Directory that relative texture paths are resolved against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.textures = TextureCache::with_base_dir(dir);
        self
    }

    /// Parse every line and assemble the scene.
    pub fn parse(mut self) -> SceneResult<Scene> {
        let content = self.content;
        for (i, raw) in content.lines().enumerate() {
            self.line = i + 1;
            let text = raw.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }

            let mut tokens = text.split_whitespace();
            let keyword = tokens.next().unwrap_or_default();
            let args: Vec<&str> = tokens.collect();
            self.parse_line(keyword, &args)?;
        }
        self.finish()
    }

    fn parse_line(&mut self, keyword: &str, args: &[&str]) -> SceneResult<()> {
        match keyword {
            "eye" => self.eye = Some(self.vec3(args, 3)?),
            "viewdir" => self.view_dir = Some(self.vec3(args, 3)?),
            "updir" => self.up_dir = Some(self.vec3(args, 3)?),
            "vfov" => self.vfov = Some(self.floats::<1>(args, &[1])?[0]),
            "imsize" => {
                self.arity(args, &[2])?;
                self.imsize = Some((self.uint(args[0])?, self.uint(args[1])?));
            }
            "bkgcolor" => {
                let [r, g, b, eta] = self.floats::<4>(args, &[3, 4])?;
                self.background = self.valid(Color::new(r, g, b))?;
                if args.len() == 4 {
                    if !(eta > 0.0) {
                        return Err(self.error(format!(
                            "background index of refraction {eta} must be positive"
                        )));
                    }
                    self.background_ior = eta;
                }
            }
            "mtlcolor" => self.parse_material(args)?,
            "light" => self.parse_light(args, false)?,
            "attlight" => self.parse_light(args, true)?,
            "depthcueing" => {
                let [r, g, b, a_max, a_min, dist_max, dist_min] = self.floats::<7>(args, &[7])?;
                let color = self.valid(Color::new(r, g, b))?;
                let cue = DepthCue::new(color, a_max, a_min, dist_max, dist_min);
                self.depth_cue = Some(self.valid(cue)?);
            }
            "sphere" => {
                let [x, y, z, radius] = self.floats::<4>(args, &[4])?;
                let shape = self.valid(Shape::sphere(Vec3::new(x, y, z), radius))?;
                let material = self.material()?;
                self.shapes.push((shape, material, self.line));
            }
            "v" => {
                let p = self.vec3(args, 3)?;
                self.vertices.push_position(p);
            }
            "vn" => {
                let n = self.vec3(args, 3)?;
                let pushed = self.vertices.push_normal(n);
                self.valid(pushed)?;
            }
            "vt" => {
                let [u, v] = self.floats::<2>(args, &[2])?;
                self.vertices.push_texcoord(Vec2::new(u, v));
            }
            "f" => self.parse_face(args)?,
            "texture" | "bump" => self.parse_map(keyword, args)?,
            "parallel" => log::warn!(
                "Line {}: parallel projection is not supported, using perspective",
                self.line
            ),
            other => log::warn!("Line {}: skipping unknown keyword `{}`", self.line, other),
        }
        Ok(())
    }

    fn parse_material(&mut self, args: &[&str]) -> SceneResult<()> {
        let v = self.floats::<12>(args, &[10, 12])?;
        let diffuse = self.valid(Color::new(v[0], v[1], v[2]))?;
        let specular = self.valid(Color::new(v[3], v[4], v[5]))?;
        let mut material = self.valid(Material::new(diffuse, specular, v[6], v[7], v[8], v[9]))?;
        if args.len() == 12 {
            material = self.valid(material.with_reflection(v[10], v[11]))?;
        }
        self.materials.push(material);
        self.current_material = Some(self.materials.len() - 1);
        Ok(())
    }

    fn parse_light(&mut self, args: &[&str], attenuated: bool) -> SceneResult<()> {
        let v = if attenuated {
            self.floats::<10>(args, &[10])?
        } else {
            self.floats::<10>(args, &[7])?
        };
        let xyz = Vec3::new(v[0], v[1], v[2]);
        let color = self.valid(Color::new(v[4], v[5], v[6]))?;

        let mut light = match v[3] {
            w if w == 1.0 => Light::point(xyz, color),
            w if w == 0.0 => self.valid(Light::directional(xyz, color))?,
            w => return Err(self.error(format!("light type w = {w} must be 0 or 1"))),
        };
        if attenuated {
            let att = self.valid(Attenuation::new(v[7], v[8], v[9]))?;
            light = light.with_attenuation(att);
        }
        self.lights.push(light);
        Ok(())
    }

    fn parse_face(&mut self, args: &[&str]) -> SceneResult<()> {
        if args.len() < 3 {
            return Err(self.error(format!("face needs at least 3 corners, got {}", args.len())));
        }
        let corners = args
            .iter()
            .map(|a| self.corner(a))
            .collect::<SceneResult<Vec<_>>>()?;
        let material = self.material()?;

        // Polygons are split into a fan around the first corner.
        for i in 1..corners.len() - 1 {
            let shape = Shape::Triangle {
                vertices: [corners[0], corners[i], corners[i + 1]],
            };
            if shape.is_degenerate(&self.vertices) {
                log::warn!("Line {}: skipping degenerate triangle", self.line);
                continue;
            }
            self.shapes.push((shape, material, self.line));
        }
        Ok(())
    }

    /// Parse one face corner and check its indices.
    fn corner(&self, token: &str) -> SceneResult<VertexRef> {
        let parts: Vec<&str> = token.split('/').collect();
        if parts.len() > 3 || parts[0].is_empty() {
            return Err(self.error(format!("malformed face corner `{token}`")));
        }

        let optional = |i: usize| -> SceneResult<Option<usize>> {
            match parts.get(i) {
                Some(s) if !s.is_empty() => self.index(s).map(Some),
                _ => Ok(None),
            }
        };
        let corner = VertexRef {
            position: self.index(parts[0])?,
            texcoord: optional(1)?,
            normal: optional(2)?,
        };
        self.valid(self.vertices.validate(&corner))?;
        Ok(corner)
    }

    fn parse_map(&mut self, keyword: &str, args: &[&str]) -> SceneResult<()> {
        self.arity(args, &[1])?;
        let base = self.material()?;
        let loaded = self.textures.load(args[0]);
        let id = self.valid(loaded)?;

        let material = self.materials[base].clone();
        let material = if keyword == "texture" {
            material.with_texture(id)
        } else {
            material.with_normal_map(id)
        };
        self.materials.push(material);
        self.current_material = Some(self.materials.len() - 1);
        Ok(())
    }

    fn finish(self) -> SceneResult<Scene> {
        let (width, height) = self.imsize.ok_or(SceneError::MissingKeyword("imsize"))?;
        let camera = Camera {
            eye: self.eye.ok_or(SceneError::MissingKeyword("eye"))?,
            view_dir: self.view_dir.ok_or(SceneError::MissingKeyword("viewdir"))?,
            up_dir: self.up_dir.ok_or(SceneError::MissingKeyword("updir"))?,
            vfov: self.vfov.ok_or(SceneError::MissingKeyword("vfov"))?,
            width,
            height,
        };
        // Surface camera faults at load time rather than at render time.
        camera.frustum()?;

        let mut scene = Scene::new(self.name, camera);
        scene.background = self.background;
        scene.background_ior = self.background_ior;
        scene.depth_cue = self.depth_cue;
        scene.lights = self.lights;
        scene.materials = self.materials;
        scene.textures = self.textures.into_textures();
        scene.vertices = self.vertices;

        for (shape, material, line) in self.shapes {
            scene
                .add_shape(shape, material)
                .map_err(|source| SceneError::Invalid {
                    line,
                    source: source.into(),
                })?;
        }
        Ok(scene)
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn error(&self, message: String) -> SceneError {
        SceneError::Parse {
            line: self.line,
            message,
        }
    }

    /// Attach the current line to a validation failure.
    fn valid<T, E: Into<InvalidValue>>(&self, result: Result<T, E>) -> SceneResult<T> {
        result.map_err(|e| SceneError::Invalid {
            line: self.line,
            source: e.into(),
        })
    }

    fn arity(&self, args: &[&str], allowed: &[usize]) -> SceneResult<()> {
        if allowed.contains(&args.len()) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?} arguments, got {}",
                allowed,
                args.len()
            )))
        }
    }

    /// Parse up to `N` floats; missing trailing values are zero.
    fn floats<const N: usize>(&self, args: &[&str], allowed: &[usize]) -> SceneResult<[f32; N]> {
        self.arity(args, allowed)?;
        let mut out = [0.0; N];
        for (slot, arg) in out.iter_mut().zip(args) {
            *slot = arg
                .parse::<f32>()
                .map_err(|_| self.error(format!("invalid number `{arg}`")))?;
        }
        Ok(out)
    }

    fn vec3(&self, args: &[&str], n: usize) -> SceneResult<Vec3> {
        let [x, y, z] = self.floats::<3>(args, &[n])?;
        Ok(Vec3::new(x, y, z))
    }

    fn uint(&self, arg: &str) -> SceneResult<u32> {
        arg.parse::<u32>()
            .map_err(|_| self.error(format!("invalid integer `{arg}`")))
    }

    /// Convert a 1-based file index to a 0-based arena index.
    fn index(&self, arg: &str) -> SceneResult<usize> {
        match arg.parse::<usize>() {
            Ok(i) if i >= 1 => Ok(i - 1),
            _ => Err(self.error(format!("invalid index `{arg}` (indices start at 1)"))),
        }
    }

    fn material(&self) -> SceneResult<usize> {
        self.current_material
            .ok_or_else(|| self.error("shape declared before any mtlcolor".to_string()))
    }
}
