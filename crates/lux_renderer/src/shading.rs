//! Blinn-Phong shading with shadow rays and Whitted-style recursion.
//!
//! Reflective finishes spawn a mirror ray weighted by Schlick's Fresnel
//! term and, when partly transparent, a refracted ray. Recursion stops at
//! the configured maximum depth.

use lux_core::{Finish, Material, Scene};
use lux_math::{reflect, Color, Interval, Ray, Vec3};

use crate::primitive::{Hit, Primitive};
use crate::shadow::{light_factor, SHADOW_EPSILON};
use crate::world::World;

/// Minimum ray parameter accepted for camera and secondary rays.
pub const HIT_EPSILON: f32 = 1e-4;

/// Traces rays through a [`World`].
#[derive(Clone, Copy)]
pub struct Tracer<'w> {
    world: &'w World,
    max_depth: u32,
}

impl<'w> Tracer<'w> {
    pub fn new(world: &'w World, max_depth: u32) -> Self {
        Self { world, max_depth }
    }

    /// Color seen along `ray`. `depth` is 0 for camera rays.
    ///
    /// Depth cueing applies to what the camera sees directly, measured from
    /// the eye.
    pub fn trace(&self, ray: &Ray, depth: u32) -> Color {
        let scene = self.world.scene();
        let Some((primitive, hit)) = self.world.closest_hit(ray, Interval::from_min(HIT_EPSILON))
        else {
            return scene.background;
        };

        let color = self.shade(ray, &hit, primitive, depth);
        match (&scene.depth_cue, depth) {
            (Some(cue), 0) => cue.apply(color, hit.t),
            _ => color,
        }
    }

    /// Local illumination plus any reflected and refracted contribution.
    pub fn shade(&self, ray: &Ray, hit: &Hit, primitive: &Primitive, depth: u32) -> Color {
        let scene = self.world.scene();
        let material = self.world.material(primitive);

        let diffuse = surface_color(scene, material, hit);
        let normal = shading_normal(scene, material, hit);
        let view = -ray.direction();

        let mut color = diffuse * material.ka();
        for light in &scene.lights {
            let Some((to_light, _)) = light.toward(hit.point) else {
                continue;
            };
            let n_dot_l = normal.dot(to_light);
            if n_dot_l <= 0.0 {
                continue;
            }
            let factor = light_factor(self.world, light, hit.point, hit.normal);
            if factor == 0.0 {
                continue;
            }

            let r = reflect(-to_light, normal);
            let r_dot_v = r.dot(view).max(0.0);
            let specular = r_dot_v.powf(material.shininess());

            color += light.color()
                * (diffuse * (material.kd() * n_dot_l) + material.specular() * (material.ks() * specular))
                * factor;
        }

        if let Finish::Reflective { opacity, ior } = material.finish() {
            if depth < self.max_depth {
                color += self.transport(ray, hit, normal, opacity, ior, depth);
            }
        }
        color
    }

    /// Fresnel-weighted reflection and refraction at a reflective surface.
    fn transport(
        &self,
        ray: &Ray,
        hit: &Hit,
        normal: Vec3,
        opacity: f32,
        ior: f32,
        depth: u32,
    ) -> Color {
        let background_ior = self.world.scene().background_ior;
        let (eta_i, eta_t) = if hit.front_face {
            (background_ior, ior)
        } else {
            (ior, background_ior)
        };

        let incident = ray.direction();
        let cos_i = (-incident).dot(normal).clamp(0.0, 1.0);
        let ratio = eta_i / eta_t;
        let sin2_t = ratio * ratio * (1.0 - cos_i * cos_i);
        let total_internal = sin2_t > 1.0;
        let fresnel = if total_internal {
            1.0
        } else {
            schlick(cos_i, eta_i, eta_t)
        };

        let mut color = Color::BLACK;
        let reflected = reflect(incident, normal);
        if let Ok(r) = Ray::new(hit.point + hit.normal * SHADOW_EPSILON, reflected) {
            color += self.trace(&r, depth + 1) * fresnel;
        }

        if opacity < 1.0 && !total_internal {
            let cos_t = (1.0 - sin2_t).sqrt();
            let refracted = incident * ratio + normal * (ratio * cos_i - cos_t);
            if let Ok(t) = Ray::new(hit.point - hit.normal * SHADOW_EPSILON, refracted) {
                color += self.trace(&t, depth + 1) * ((1.0 - fresnel) * (1.0 - opacity));
            }
        }
        color
    }
}

/// Schlick's approximation of the Fresnel reflectance.
pub fn schlick(cos_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let r0 = ((eta_i - eta_t) / (eta_i + eta_t)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_i).powi(5)
}

/// Diffuse color at the hit: the texture sample when the material has a
/// texture and the surface has texture coordinates.
fn surface_color(scene: &Scene, material: &Material, hit: &Hit) -> Color {
    match (material.texture().and_then(|id| scene.texture(id)), hit.texcoord) {
        (Some(texture), Some(uv)) => Color::from_vec3(texture.sample(uv)),
        _ => material.diffuse(),
    }
}

/// Hit normal, perturbed by the material's normal map when possible.
fn shading_normal(scene: &Scene, material: &Material, hit: &Hit) -> Vec3 {
    let map = material.normal_map().and_then(|id| scene.texture(id));
    match (map, hit.texcoord, hit.tangent_frame) {
        (Some(map), Some(uv), Some((t, b))) => {
            let n = map.sample_normal(uv);
            (t * n.x + b * n.y + hit.normal * n.z)
                .try_normalize()
                .unwrap_or(hit.normal)
        }
        _ => hit.normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::test_scene;
    use lux_core::{DepthCue, Light, Shape, Texture};
    use lux_math::Vec2;
    use std::sync::Arc;

    fn approx(a: Color, b: Color) -> bool {
        (a.to_vec3() - b.to_vec3()).length() < 1e-4
    }

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray::new(Vec3::new(x, 10.0, z), -Vec3::Y).unwrap()
    }

    /// Unit sphere at the origin lit from directly above.
    fn lit_sphere() -> World {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
        scene.add_light(Light::point(Vec3::new(0.0, 10.0, 0.0), Color::WHITE));
        World::build(scene, 4).unwrap()
    }

    #[test]
    fn test_lit_top_and_ambient_only_underside() {
        let world = lit_sphere();
        let tracer = Tracer::new(&world, 5);
        let material = world.scene().materials[0].clone();
        let ambient = material.diffuse() * material.ka();

        // Top: ambient + full diffuse + full specular (R = V = N = L)
        let top = tracer.trace(&down_ray(0.0, 0.0), 0);
        let expected = ambient + material.diffuse() * material.kd() + material.specular() * material.ks();
        assert!(approx(top, expected), "top = {top:?}");

        // Underside, seen from below: only ambient
        let up = Ray::new(Vec3::new(0.0, -10.0, 0.0), Vec3::Y).unwrap();
        let bottom = tracer.trace(&up, 0);
        assert!(approx(bottom, ambient), "bottom = {bottom:?}");
    }

    #[test]
    fn test_shadowed_point_is_ambient_only() {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
        scene.add_shape(Shape::sphere(Vec3::new(0.0, 5.0, 0.0), 0.5).unwrap(), 0).unwrap();
        scene.add_light(Light::point(Vec3::new(0.0, 10.0, 0.0), Color::WHITE));
        let world = World::build(scene, 1).unwrap();
        let tracer = Tracer::new(&world, 5);

        // Hit the lower sphere from the side, just below the top
        let ray = Ray::new(Vec3::new(0.1, 0.99, 10.0), -Vec3::Z).unwrap();
        let (prim, hit) = world.closest_hit(&ray, Interval::from_min(HIT_EPSILON)).unwrap();
        let material = world.material(prim);
        let color = tracer.shade(&ray, &hit, prim, 0);
        assert!(approx(color, material.diffuse() * material.ka()));
    }

    #[test]
    fn test_occluded_sphere_darker_than_unoccluded() {
        let render = |with_occluder: bool| {
            let mut scene = test_scene();
            scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
            if with_occluder {
                scene.add_shape(Shape::sphere(Vec3::new(0.0, 3.0, 0.0), 1.0).unwrap(), 0).unwrap();
            }
            scene.add_light(Light::directional(-Vec3::Y, Color::WHITE).unwrap());
            let world = World::build(scene, 1).unwrap();

            // Grazes under the upper sphere onto the lower sphere's upper front
            let ray = Ray::new(Vec3::new(0.0, 1.5, 10.0), Vec3::new(0.0, -0.8, -10.0)).unwrap();
            Tracer::new(&world, 5).trace(&ray, 0)
        };

        let lit = render(false);
        let occluded = render(true);
        assert!(
            occluded.luminance() < lit.luminance(),
            "occluded = {occluded:?}, lit = {lit:?}"
        );
    }

    #[test]
    fn test_miss_returns_background() {
        let mut scene = test_scene();
        scene.background = Color::new(0.1, 0.2, 0.3).unwrap();
        let world = World::build(scene, 4).unwrap();
        let color = Tracer::new(&world, 5).trace(&down_ray(0.0, 0.0), 0);
        assert_eq!(color, Color::new(0.1, 0.2, 0.3).unwrap());
    }

    #[test]
    fn test_depth_cue_blends_toward_fog() {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
        let fog = Color::new(0.0, 0.0, 1.0).unwrap();
        // Surface at distance 9, entirely past the far distance
        scene.depth_cue = Some(DepthCue::new(fog, 1.0, 0.0, 5.0, 1.0).unwrap());
        let world = World::build(scene, 4).unwrap();

        let color = Tracer::new(&world, 5).trace(&down_ray(0.0, 0.0), 0);
        assert!(approx(color, fog));
    }

    #[test]
    fn test_texture_replaces_diffuse() {
        let mut scene = test_scene();
        let green = Vec3::new(0.0, 1.0, 0.0);
        scene.textures.push(Arc::new(Texture::solid_color(green)));
        let textured = scene.materials[0].clone().with_texture(0);
        let id = scene.add_material(textured);
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), id).unwrap();
        let world = World::build(scene, 4).unwrap();

        let color = Tracer::new(&world, 5).trace(&down_ray(0.0, 0.0), 0);
        // No lights: ambient only, from the texture color
        assert!(approx(color, Color::from_vec3(green) * 0.2));
    }

    #[test]
    fn test_flat_normal_map_keeps_normal() {
        let mut scene = test_scene();
        scene.textures.push(Arc::new(Texture::solid_color(Vec3::new(0.5, 0.5, 1.0))));
        let bumped = scene.materials[0].clone().with_normal_map(0);
        let id = scene.add_material(bumped);
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), id).unwrap();
        let world = World::build(scene, 4).unwrap();

        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::X).unwrap();
        let (prim, hit) = world.closest_hit(&ray, Interval::from_min(HIT_EPSILON)).unwrap();
        let n = shading_normal(world.scene(), world.material(prim), &hit);
        assert!((n - hit.normal).length() < 1e-3);

        // Tilted map bends the normal toward the tangent
        let mut hit = hit;
        hit.texcoord = Some(Vec2::ZERO);
        let mut scene = world.scene().clone();
        scene.textures[0] = Arc::new(Texture::solid_color(Vec3::new(1.0, 0.5, 0.5)));
        let tilted = shading_normal(&scene, &scene.materials[id], &hit);
        let (t, _) = hit.tangent_frame.unwrap();
        assert!((tilted - t).length() < 1e-3);
    }

    #[test]
    fn test_schlick() {
        // Normal incidence on glass
        assert!((schlick(1.0, 1.0, 1.5) - 0.04).abs() < 1e-6);
        // Grazing incidence reflects everything
        assert!((schlick(0.0, 1.0, 1.5) - 1.0).abs() < 1e-6);
        // Matched media reflect nothing head-on
        assert_eq!(schlick(1.0, 1.3, 1.3), 0.0);
    }

    #[test]
    fn test_mirror_reflects_neighbour() {
        let mut scene = test_scene();
        let mirror = Material::new(Color::BLACK, Color::BLACK, 0.0, 0.0, 0.0, 1.0)
            .unwrap()
            .with_reflection(1.0, 1.5)
            .unwrap();
        let mirror_id = scene.add_material(mirror);
        scene.background = Color::new(0.0, 0.0, 0.5).unwrap();

        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), mirror_id).unwrap();
        let world = World::build(scene, 4).unwrap();

        // Head-on: F = 0.04, the reflected ray goes straight back to background
        let color = Tracer::new(&world, 5).trace(&down_ray(0.0, 0.0), 0);
        assert!(approx(color, Color::new(0.0, 0.0, 0.02).unwrap()));

        // Depth limit: no recursion at max depth 0
        let flat = Tracer::new(&world, 0).trace(&down_ray(0.0, 0.0), 0);
        assert!(approx(flat, Color::BLACK));
    }

    #[test]
    fn test_transparent_sphere_passes_background() {
        let mut scene = test_scene();
        let glass = Material::new(Color::BLACK, Color::BLACK, 0.0, 0.0, 0.0, 1.0)
            .unwrap()
            .with_reflection(0.0, 1.0)
            .unwrap();
        let glass_id = scene.add_material(glass);
        scene.background = Color::new(0.3, 0.6, 0.9).unwrap();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), glass_id).unwrap();
        let world = World::build(scene, 4).unwrap();

        // Index matched with the surroundings: the sphere is invisible
        let color = Tracer::new(&world, 5).trace(&down_ray(0.0, 0.0), 0);
        assert!(approx(color, Color::new(0.3, 0.6, 0.9).unwrap()), "color = {color:?}");
    }
}
