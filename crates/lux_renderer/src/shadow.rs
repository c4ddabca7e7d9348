//! Shadow rays: light visibility from a surface point.

use lux_core::Light;
use lux_math::{Interval, Ray, Vec3};

use crate::world::World;

/// Offset along the surface normal for shadow-ray origins, keeping a
/// surface from shadowing itself.
pub const SHADOW_EPSILON: f32 = 1e-3;

/// True when nothing blocks the path from `point` to `light`.
///
/// `normal` is the surface normal on the side the light is evaluated from.
/// A point sitting exactly on a point light counts as lit.
pub fn illuminates(world: &World, light: &Light, point: Vec3, normal: Vec3) -> bool {
    let Some((to_light, distance)) = light.toward(point) else {
        return true;
    };
    let origin = point + normal * SHADOW_EPSILON;
    let Ok(ray) = Ray::new(origin, to_light) else {
        return true;
    };

    // Directional lights have infinite distance, so any hit occludes
    !world.is_occluded(&ray, Interval::new(0.0, distance))
}

/// Fraction of the light's color reaching `point`: 0 in shadow, otherwise
/// the light's distance falloff.
pub fn light_factor(world: &World, light: &Light, point: Vec3, normal: Vec3) -> f32 {
    if !illuminates(world, light, point, normal) {
        return 0.0;
    }
    match light.toward(point) {
        Some((_, distance)) => light.falloff(distance),
        None => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::test_scene;
    use lux_core::{Attenuation, Shape};
    use lux_math::Color;

    #[test]
    fn test_occluder_blocks_point_light() {
        let light = Light::point(Vec3::new(0.0, 10.0, 0.0), Color::WHITE);
        let point = Vec3::ZERO;

        let open = World::build(test_scene(), 4).unwrap();
        assert!(illuminates(&open, &light, point, Vec3::Y));

        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::new(0.0, 5.0, 0.0), 1.0).unwrap(), 0).unwrap();
        let blocked = World::build(scene, 4).unwrap();
        assert!(!illuminates(&blocked, &light, point, Vec3::Y));
        assert_eq!(light_factor(&blocked, &light, point, Vec3::Y), 0.0);
    }

    #[test]
    fn test_occluder_behind_light_does_not_shadow() {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::new(0.0, 20.0, 0.0), 1.0).unwrap(), 0).unwrap();
        let world = World::build(scene, 4).unwrap();

        let light = Light::point(Vec3::new(0.0, 10.0, 0.0), Color::WHITE);
        assert!(illuminates(&world, &light, Vec3::ZERO, Vec3::Y));
    }

    #[test]
    fn test_surface_does_not_shadow_itself() {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
        let world = World::build(scene, 4).unwrap();

        let light = Light::point(Vec3::new(0.0, 5.0, 0.0), Color::WHITE);
        assert!(illuminates(&world, &light, Vec3::Y, Vec3::Y));
    }

    #[test]
    fn test_two_spheres_directional_light() {
        // Light shines straight down; the upper sphere shadows the lower one.
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::new(0.0, 3.0, 0.0), 1.0).unwrap(), 0).unwrap();
        scene.add_shape(Shape::sphere(Vec3::ZERO, 1.0).unwrap(), 0).unwrap();
        let world = World::build(scene, 1).unwrap();

        let light = Light::directional(-Vec3::Y, Color::WHITE).unwrap();
        let lower_top = Vec3::new(0.0, 1.0, 0.0);
        let upper_top = Vec3::new(0.0, 4.0, 0.0);
        assert!(!illuminates(&world, &light, lower_top, Vec3::Y));
        assert!(illuminates(&world, &light, upper_top, Vec3::Y));

        // Off to the side the lower sphere sees the light again
        let side = Vec3::new(1.0, 0.0, 0.0);
        assert!(illuminates(&world, &light, side, Vec3::X));
    }

    #[test]
    fn test_point_on_light_is_lit() {
        let mut scene = test_scene();
        scene.add_shape(Shape::sphere(Vec3::new(0.0, 2.0, 0.0), 0.5).unwrap(), 0).unwrap();
        let world = World::build(scene, 4).unwrap();

        let light = Light::point(Vec3::ZERO, Color::WHITE);
        assert!(illuminates(&world, &light, Vec3::ZERO, Vec3::Y));
        assert_eq!(light_factor(&world, &light, Vec3::ZERO, Vec3::Y), 1.0);
    }

    #[test]
    fn test_light_factor_attenuation() {
        let world = World::build(test_scene(), 4).unwrap();
        let att = Attenuation::new(1.0, 1.0, 0.0).unwrap();
        let light = Light::point(Vec3::new(0.0, 3.0, 0.0), Color::WHITE).with_attenuation(att);

        // 1 / (1 + 3)
        let factor = light_factor(&world, &light, Vec3::ZERO, Vec3::Y);
        assert!((factor - 0.25).abs() < 1e-6);
    }
}
