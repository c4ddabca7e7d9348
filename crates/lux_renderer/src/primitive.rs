//! Renderable primitives: spheres and triangles resolved against the scene's
//! vertex arena.
//!
//! Triangles use the Möller-Trumbore algorithm; spheres solve the ray
//! quadratic and report spherical texture coordinates.

use std::f32::consts::PI;

use lux_core::{Shape, ShapeRecord, VertexArena, VertexRef};
use lux_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// Determinant below which a ray counts as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Record of a ray-primitive intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Parameter along the ray (a distance, rays have unit direction)
    pub t: f32,
    pub point: Vec3,
    /// Shading normal, always pointing against the ray
    pub normal: Vec3,
    /// Whether the ray hit the outside of the surface
    pub front_face: bool,
    pub texcoord: Option<Vec2>,
    /// Unit tangent and bitangent along increasing u and v
    pub tangent_frame: Option<(Vec3, Vec3)>,
}

impl Hit {
    fn new(ray: &Ray, t: f32, outward_normal: Vec3) -> Self {
        let front_face = ray.direction().dot(outward_normal) < 0.0;
        Self {
            t,
            point: ray.at(t),
            normal: if front_face { outward_normal } else { -outward_normal },
            front_face,
            texcoord: None,
            tangent_frame: None,
        }
    }
}

/// A shape ready for intersection, plus the material it is drawn with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive {
    shape: Shape,
    material: usize,
}

impl Primitive {
    pub fn new(record: &ShapeRecord) -> Self {
        Self {
            shape: record.shape,
            material: record.material,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn material(&self) -> usize {
        self.material
    }

    pub fn bounding_box(&self, arena: &VertexArena) -> Aabb {
        match self.shape {
            Shape::Sphere { center, radius } => {
                let r = Vec3::splat(radius);
                Aabb::from_points(center - r, center + r)
            }
            Shape::Triangle { vertices } => {
                Aabb::enclosing(vertices.iter().map(|v| arena.position(v.position)))
            }
        }
    }

    /// Nearest intersection strictly inside `ray_t`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval, arena: &VertexArena) -> Option<Hit> {
        match self.shape {
            Shape::Sphere { center, radius } => hit_sphere(center, radius, ray, ray_t),
            Shape::Triangle { vertices } => hit_triangle(&vertices, arena, ray, ray_t),
        }
    }
}

fn hit_sphere(center: Vec3, radius: f32, ray: &Ray, ray_t: Interval) -> Option<Hit> {
    // Unit direction, so the quadratic's `a` term is 1
    let oc = center - ray.origin();
    let h = ray.direction().dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();

    // Find the nearest root in the acceptable range
    let mut root = h - sqrtd;
    if !ray_t.surrounds(root) {
        root = h + sqrtd;
        if !ray_t.surrounds(root) {
            return None;
        }
    }

    let point = ray.at(root);
    let outward = (point - center) / radius;
    let mut hit = Hit::new(ray, root, outward);
    hit.texcoord = Some(sphere_uv(outward));
    hit.tangent_frame = sphere_tangents(outward);
    Some(hit)
}

/// UV coordinates for a point on the unit sphere.
///
/// `u` runs around the Y axis starting at -X, `v` from the bottom pole (0) to
/// the top pole (1).
fn sphere_uv(p: Vec3) -> Vec2 {
    let theta = (-p.y).clamp(-1.0, 1.0).acos();
    let phi = (-p.z).atan2(p.x) + PI;
    Vec2::new(phi / (2.0 * PI), theta / PI)
}

/// Tangent frame matching [`sphere_uv`]. Undefined at the poles.
fn sphere_tangents(n: Vec3) -> Option<(Vec3, Vec3)> {
    let tangent = Vec3::new(n.z, 0.0, -n.x).try_normalize()?;
    Some((tangent, n.cross(tangent)))
}

fn hit_triangle(
    vertices: &[VertexRef; 3],
    arena: &VertexArena,
    ray: &Ray,
    ray_t: Interval,
) -> Option<Hit> {
    let [p0, p1, p2] = vertices.map(|v| arena.position(v.position));
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;

    let h = ray.direction().cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < PARALLEL_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - p0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction().dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.surrounds(t) {
        return None;
    }

    let geometric = edge1.cross(edge2).normalize_or_zero();
    let bary = Vec3::new(1.0 - u - v, u, v);

    // Smooth shading only when every corner carries a normal
    let normals = corner_data(vertices, |vr| vr.normal.map(|i| arena.normal(i)));
    let outward = match normals {
        Some([n0, n1, n2]) => (n0 * bary.x + n1 * bary.y + n2 * bary.z)
            .try_normalize()
            .unwrap_or(geometric),
        None => geometric,
    };

    let front_face = ray.direction().dot(geometric) < 0.0;
    let mut hit = Hit::new(ray, t, outward);
    hit.front_face = front_face;
    hit.normal = if front_face { outward } else { -outward };

    if let Some(uvs) = corner_data(vertices, |vr| vr.texcoord.map(|i| arena.texcoord(i))) {
        hit.texcoord = Some(uvs[0] * bary.x + uvs[1] * bary.y + uvs[2] * bary.z);
        hit.tangent_frame = triangle_tangents(edge1, edge2, uvs, outward);
    }
    Some(hit)
}

/// Per-corner attribute, present only when all three corners have it.
fn corner_data<T, F>(vertices: &[VertexRef; 3], get: F) -> Option<[T; 3]>
where
    F: Fn(&VertexRef) -> Option<T>,
{
    Some([get(&vertices[0])?, get(&vertices[1])?, get(&vertices[2])?])
}

/// Tangent frame from the texture-space edge deltas, orthonormalized
/// against `normal`. `None` when the UV mapping is degenerate.
fn triangle_tangents(edge1: Vec3, edge2: Vec3, uvs: [Vec2; 3], normal: Vec3) -> Option<(Vec3, Vec3)> {
    let duv1 = uvs[1] - uvs[0];
    let duv2 = uvs[2] - uvs[0];
    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
    let bitangent = (edge2 * duv1.x - edge1 * duv2.x) / det;

    let t = (tangent - normal * normal.dot(tangent)).try_normalize()?;
    let b = (bitangent - normal * normal.dot(bitangent) - t * t.dot(bitangent)).try_normalize()?;
    Some((t, b))
}
