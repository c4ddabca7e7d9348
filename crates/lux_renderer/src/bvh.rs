//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Built top-down with the surface area heuristic over primitive bounding
//! boxes. The tree stores indices into the caller's primitive list, so the
//! same hierarchy serves closest-hit queries and shadow-ray scans.

use lux_math::{Aabb, Interval, Ray, Vec3};
use thiserror::Error;

use crate::primitive::Hit;

/// Cost of descending into a node, relative to one primitive test.
pub const TRAVERSAL_COST: f32 = 1.0;

/// Cost of one exact ray-primitive test.
pub const INTERSECTION_COST: f32 = 1.0;

/// Errors that can occur while building a BVH.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    #[error("Node bounds {0:?} have zero or non-finite surface area")]
    DegenerateBounds(Aabb),

    #[error("Maximum leaf size must be at least 1")]
    InvalidLeafSize,
}

pub type BvhResult<T> = Result<T, BvhError>;

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Debug)]
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node holding primitive indices.
    Leaf { primitives: Vec<usize>, bbox: Aabb },
}

impl BvhNode {
    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => *bbox,
        }
    }
}

/// Shape of a built hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    pub largest_leaf: usize,
}

/// A bounding volume hierarchy over indexed primitives.
#[derive(Debug, Default)]
pub struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    /// Build a hierarchy over `boxes`, where `boxes[i]` bounds primitive `i`.
    ///
    /// An empty slice yields an empty hierarchy whose queries find nothing.
    pub fn build(boxes: &[Aabb], max_leaf_size: usize) -> BvhResult<Self> {
        if max_leaf_size == 0 {
            return Err(BvhError::InvalidLeafSize);
        }
        if boxes.is_empty() {
            return Ok(Self::default());
        }

        let centroids: Vec<Vec3> = boxes.iter().map(Aabb::centroid).collect();
        let builder = Builder {
            boxes,
            centroids: &centroids,
            max_leaf_size,
        };
        let root = builder.build((0..boxes.len()).collect())?;
        let bvh = Self { root: Some(root) };

        let stats = bvh.stats();
        log::info!(
            "BVH: {} primitives, {} nodes, {} leaves, depth {}, largest leaf {}",
            boxes.len(),
            stats.nodes,
            stats.leaves,
            stats.depth,
            stats.largest_leaf
        );
        Ok(bvh)
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Box around everything, [`Aabb::EMPTY`] for an empty hierarchy.
    pub fn bounding_box(&self) -> Aabb {
        self.root
            .as_ref()
            .map_or(Aabb::EMPTY, BvhNode::bounding_box)
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        let mut stack: Vec<(&BvhNode, usize)> = self.root.iter().map(|n| (n, 1)).collect();

        while let Some((node, depth)) = stack.pop() {
            stats.nodes += 1;
            stats.depth = stats.depth.max(depth);
            match node {
                BvhNode::Leaf { primitives, .. } => {
                    stats.leaves += 1;
                    stats.largest_leaf = stats.largest_leaf.max(primitives.len());
                }
                BvhNode::Branch { left, right, .. } => {
                    stack.push((left.as_ref(), depth + 1));
                    stack.push((right.as_ref(), depth + 1));
                }
            }
        }
        stats
    }

    /// Primitive lists of every leaf whose box the ray touches, unordered.
    pub fn intersected_leaves(&self, ray: &Ray) -> Vec<&[usize]> {
        let mut leaves = Vec::new();
        let mut stack: Vec<&BvhNode> = self.root.iter().collect();

        while let Some(node) = stack.pop() {
            if !node.bounding_box().intersects(ray) {
                continue;
            }
            match node {
                BvhNode::Leaf { primitives, .. } => leaves.push(primitives.as_slice()),
                BvhNode::Branch { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    /// Nearest hit over all primitives in `ray_t`.
    ///
    /// `test(index, range)` performs the exact intersection of primitive
    /// `index`. Subtrees whose boxes start beyond the current nearest hit are
    /// skipped, every other touched leaf is tested.
    pub fn closest_hit<F>(&self, ray: &Ray, ray_t: Interval, mut test: F) -> Option<(usize, Hit)>
    where
        F: FnMut(usize, Interval) -> Option<Hit>,
    {
        let mut closest: Option<(usize, Hit)> = None;
        let mut range = ray_t;
        let mut stack: Vec<&BvhNode> = self.root.iter().collect();

        while let Some(node) = stack.pop() {
            match node.bounding_box().slab(ray) {
                Some((t_enter, _)) if t_enter <= range.max => {}
                _ => continue,
            }

            match node {
                BvhNode::Leaf { primitives, .. } => {
                    for &index in primitives {
                        if let Some(hit) = test(index, range) {
                            range = range.with_max(hit.t);
                            closest = Some((index, hit));
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        closest
    }
}

struct Builder<'a> {
    boxes: &'a [Aabb],
    centroids: &'a [Vec3],
    max_leaf_size: usize,
}

/// Best split found so far: cost, axis and the size of the left half.
struct Split {
    cost: f32,
    axis: usize,
    index: usize,
}

impl Builder<'_> {
    /// Recursive SAH construction.
    ///
    /// Splitting stops once the best split costs no less than testing every
    /// primitive in one leaf, `INTERSECTION_COST * n`. The threshold scales
    /// with the node size; it is not one constant for the whole tree.
    fn build(&self, mut indices: Vec<usize>) -> BvhResult<BvhNode> {
        let bbox = self.union(&indices);
        let n = indices.len();

        if n <= self.max_leaf_size {
            return Ok(BvhNode::Leaf {
                primitives: indices,
                bbox,
            });
        }

        let parent_area = bbox.surface_area();
        if !(parent_area > 0.0 && parent_area.is_finite()) {
            return Err(BvhError::DegenerateBounds(bbox));
        }

        let mut best: Option<Split> = None;
        for axis in 0..3 {
            self.sort_along(&mut indices, axis);

            // suffix[i] bounds indices[i..]
            let mut suffix = vec![Aabb::EMPTY; n + 1];
            for i in (0..n).rev() {
                suffix[i] = Aabb::surrounding(&suffix[i + 1], &self.boxes[indices[i]]);
            }

            let mut left = Aabb::EMPTY;
            for i in 1..n {
                left.expand(&self.boxes[indices[i - 1]]);
                let cost = TRAVERSAL_COST
                    + INTERSECTION_COST
                        * (left.surface_area() / parent_area * i as f32
                            + suffix[i].surface_area() / parent_area * (n - i) as f32);

                if best.as_ref().map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        cost,
                        axis,
                        index: i,
                    });
                }
            }
        }

        let leaf_cost = INTERSECTION_COST * n as f32;
        let split = match best {
            Some(split) if split.cost < leaf_cost => split,
            _ => {
                return Ok(BvhNode::Leaf {
                    primitives: indices,
                    bbox,
                })
            }
        };

        self.sort_along(&mut indices, split.axis);
        let right_indices = indices.split_off(split.index);
        let left = self.build(indices)?;
        let right = self.build(right_indices)?;

        Ok(BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox,
        })
    }

    fn union(&self, indices: &[usize]) -> Aabb {
        indices.iter().fold(Aabb::EMPTY, |mut acc, &i| {
            acc.expand(&self.boxes[i]);
            acc
        })
    }

    /// Sort by centroid on `axis`, ties broken by index.
    fn sort_along(&self, indices: &mut [usize], axis: usize) {
        indices.sort_unstable_by(|&a, &b| {
            self.centroids[a][axis]
                .total_cmp(&self.centroids[b][axis])
                .then(a.cmp(&b))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use lux_core::{Shape, ShapeRecord, VertexArena};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_points(center - Vec3::splat(half), center + Vec3::splat(half))
    }

    fn random_spheres(rng: &mut StdRng, count: usize) -> Vec<Primitive> {
        (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let radius = rng.gen_range(0.1..1.5);
                Primitive::new(&ShapeRecord {
                    shape: Shape::sphere(center, radius).unwrap(),
                    material: 0,
                })
            })
            .collect()
    }

    fn leaf_indices(bvh: &Bvh) -> Vec<usize> {
        let mut all = Vec::new();
        let mut stack: Vec<&BvhNode> = bvh.root().into_iter().collect();
        while let Some(node) = stack.pop() {
            match node {
                BvhNode::Leaf { primitives, .. } => all.extend_from_slice(primitives),
                BvhNode::Branch { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        all.sort_unstable();
        all
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[], 4).unwrap();
        assert!(bvh.is_empty());
        assert!(bvh.bounding_box().is_empty());

        let ray = Ray::new(Vec3::ZERO, Vec3::X).unwrap();
        assert!(bvh.intersected_leaves(&ray).is_empty());
        assert!(bvh.closest_hit(&ray, Interval::UNIVERSE, |_, _| None).is_none());
    }

    #[test]
    fn test_bvh_invalid_leaf_size() {
        let boxes = [cube(Vec3::ZERO, 1.0)];
        assert_eq!(Bvh::build(&boxes, 0).unwrap_err(), BvhError::InvalidLeafSize);
    }

    #[test]
    fn test_bvh_degenerate_bounds() {
        let infinite = Aabb::new(Vec3::NEG_INFINITY, Vec3::INFINITY);
        let err = Bvh::build(&[infinite, infinite], 1).unwrap_err();
        assert!(matches!(err, BvhError::DegenerateBounds(_)));
    }

    #[test]
    fn test_bvh_single_leaf() {
        let boxes = [cube(Vec3::ZERO, 1.0), cube(Vec3::X, 1.0)];
        let bvh = Bvh::build(&boxes, 4).unwrap();
        assert!(matches!(bvh.root(), Some(BvhNode::Leaf { .. })));
        assert_eq!(bvh.stats().leaves, 1);
    }

    #[test]
    fn test_bvh_splits_separated_clusters() {
        let boxes = [
            cube(Vec3::ZERO, 0.5),
            cube(Vec3::new(0.2, 0.0, 0.0), 0.5),
            cube(Vec3::new(100.0, 0.0, 0.0), 0.5),
            cube(Vec3::new(100.2, 0.0, 0.0), 0.5),
        ];
        let bvh = Bvh::build(&boxes, 2).unwrap();

        match bvh.root() {
            Some(BvhNode::Branch { left, right, .. }) => {
                assert!(matches!(**left, BvhNode::Leaf { ref primitives, .. } if primitives == &[0, 1]));
                assert!(matches!(**right, BvhNode::Leaf { ref primitives, .. } if primitives == &[2, 3]));
            }
            other => panic!("expected a branch, got {other:?}"),
        }
    }

    #[test]
    fn test_bvh_keeps_leaf_when_split_does_not_pay() {
        // Identical boxes: every split costs more than testing them all
        let boxes = vec![cube(Vec3::ZERO, 1.0); 8];
        let bvh = Bvh::build(&boxes, 1).unwrap();

        let stats = bvh.stats();
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.largest_leaf, 8);
    }

    #[test]
    fn test_bvh_root_box_is_union_regardless_of_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let arena = VertexArena::new();
        let prims = random_spheres(&mut rng, 200);
        let mut boxes: Vec<Aabb> = prims.iter().map(|p| p.bounding_box(&arena)).collect();

        let union = boxes.iter().fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b));
        for _ in 0..3 {
            boxes.shuffle(&mut rng);
            let bvh = Bvh::build(&boxes, 4).unwrap();
            assert_eq!(bvh.bounding_box(), union);
        }
    }

    #[test]
    fn test_bvh_every_primitive_in_exactly_one_leaf() {
        let mut rng = StdRng::seed_from_u64(11);
        let arena = VertexArena::new();
        let prims = random_spheres(&mut rng, 150);
        let boxes: Vec<Aabb> = prims.iter().map(|p| p.bounding_box(&arena)).collect();

        let bvh = Bvh::build(&boxes, 3).unwrap();
        assert_eq!(leaf_indices(&bvh), (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_bvh_node_box_is_union_of_children() {
        let mut rng = StdRng::seed_from_u64(3);
        let arena = VertexArena::new();
        let prims = random_spheres(&mut rng, 100);
        let boxes: Vec<Aabb> = prims.iter().map(|p| p.bounding_box(&arena)).collect();
        let bvh = Bvh::build(&boxes, 2).unwrap();

        let mut stack: Vec<&BvhNode> = bvh.root().into_iter().collect();
        while let Some(node) = stack.pop() {
            match node {
                BvhNode::Leaf { primitives, bbox } => {
                    let union = primitives
                        .iter()
                        .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &boxes[i]));
                    assert_eq!(*bbox, union);
                }
                BvhNode::Branch { left, right, bbox } => {
                    let union = Aabb::surrounding(&left.bounding_box(), &right.bounding_box());
                    assert_eq!(*bbox, union);
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
    }

    #[test]
    fn test_bvh_closest_hit_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let arena = VertexArena::new();
        let prims = random_spheres(&mut rng, 300);
        let boxes: Vec<Aabb> = prims.iter().map(|p| p.bounding_box(&arena)).collect();
        let bvh = Bvh::build(&boxes, 4).unwrap();
        let range = Interval::from_min(0.001);

        for _ in 0..500 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let target = Vec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            let Ok(ray) = Ray::towards(origin, target) else {
                continue;
            };

            let brute = prims
                .iter()
                .filter_map(|p| p.intersect(&ray, range, &arena))
                .map(|h| h.t)
                .fold(f32::INFINITY, f32::min);
            let accelerated = bvh
                .closest_hit(&ray, range, |i, r| prims[i].intersect(&ray, r, &arena))
                .map_or(f32::INFINITY, |(_, h)| h.t);

            assert_eq!(accelerated, brute);
        }
    }

    #[test]
    fn test_bvh_intersected_leaves_cover_every_hit() {
        let mut rng = StdRng::seed_from_u64(5);
        let arena = VertexArena::new();
        let prims = random_spheres(&mut rng, 100);
        let boxes: Vec<Aabb> = prims.iter().map(|p| p.bounding_box(&arena)).collect();
        let bvh = Bvh::build(&boxes, 2).unwrap();

        for _ in 0..200 {
            let origin = Vec3::new(rng.gen_range(-15.0..15.0), 12.0, rng.gen_range(-15.0..15.0));
            let Ok(ray) = Ray::towards(origin, Vec3::ZERO) else {
                continue;
            };
            let candidates: Vec<usize> = bvh
                .intersected_leaves(&ray)
                .into_iter()
                .flatten()
                .copied()
                .collect();

            for (i, prim) in prims.iter().enumerate() {
                if prim.intersect(&ray, Interval::from_min(0.001), &arena).is_some() {
                    assert!(candidates.contains(&i), "primitive {i} hit but not reported");
                }
            }
        }
    }
}
