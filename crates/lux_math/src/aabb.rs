use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// The empty box has `min = +inf` and `max = -inf` on every axis so that it
/// is the identity of [`Aabb::expand`]. It must never be ray-tested.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Minimum thickness of a box built from points.
const MIN_EXTENT: f32 = 0.0001;

impl Aabb {
    /// Box containing nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create a box from explicit corners without padding.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two corner points.
    ///
    /// Axes thinner than a small minimum are padded symmetrically, so flat
    /// geometry (an axis-aligned triangle) still gets a box with volume.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            min: a.min(b),
            max: a.max(b),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Tightest (padded) box around a set of points.
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        if !aabb.is_empty() {
            aabb.pad_to_minimums();
        }
        aabb
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow this box to the union of itself and `other`.
    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// True when the box contains no point.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Edge lengths along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// `2 (dx dy + dy dz + dz dx)`. Zero for the empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent of the box along axis `n` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, n: usize) -> Interval {
        Interval::new(self.min[n], self.max[n])
    }

    /// True if `p` lies inside the box grown by `epsilon` on every side.
    pub fn contains_point(&self, p: Vec3, epsilon: f32) -> bool {
        let e = Vec3::splat(epsilon);
        p.cmpge(self.min - e).all() && p.cmple(self.max + e).all()
    }

    /// Slab test. Returns the parametric `[t_enter, t_exit]` overlap of the
    /// ray with the box, or `None` when the ray misses it or the box lies
    /// entirely behind the origin.
    pub fn slab(&self, ray: &Ray) -> Option<(f32, f32)> {
        let origin = ray.origin();
        let direction = ray.direction();
        let inv = ray.inv_direction();

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let slab = self.axis(axis);

            // Parallel to this slab: no constraint from inside, a miss from outside.
            if direction[axis] == 0.0 {
                if !slab.contains(o) {
                    return None;
                }
                continue;
            }

            let mut t0 = (slab.min - o) * inv[axis];
            let mut t1 = (slab.max - o) * inv[axis];
            if inv[axis] < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max < t_min {
                return None;
            }
        }

        if t_max <= 0.0 {
            return None;
        }
        Some((t_min, t_max))
    }

    /// Test if a ray intersects this AABB in front of its origin.
    pub fn intersects(&self, ray: &Ray) -> bool {
        self.slab(ray).is_some()
    }

    /// Distance along the ray to the box entry point, `0` when the origin is
    /// inside, and infinity on a miss.
    pub fn distance_along(&self, ray: &Ray) -> f32 {
        match self.slab(ray) {
            Some((t_enter, _)) => t_enter.max(0.0),
            None => f32::INFINITY,
        }
    }

    /// Pad axes to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let half = Vec3::splat(MIN_EXTENT * 0.5);
        let thin = self.extent().cmplt(Vec3::splat(MIN_EXTENT));
        self.min = Vec3::select(thin, self.min - half, self.min);
        self.max = Vec3::select(thin, self.max + half, self.max);
    }
}
