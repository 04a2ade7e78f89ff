//! Geometric containment queries. Stateless.

use super::NodeId;
use glam::{Affine3A, Vec3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive on every face.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Box around the eight transformed corners.
    pub fn transformed(&self, affine: &Affine3A) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let first = affine.transform_point3(corners[0]);
        let (min, max) = corners[1..]
            .iter()
            .map(|corner| affine.transform_point3(*corner))
            .fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Self { min, max }
    }
}

/// First candidate whose volume contains `point`.
///
/// Candidates are tested in the order given, so callers put the most specific
/// volumes first.
pub fn find_containing(point: Vec3, candidates: &[(NodeId, Aabb)]) -> Option<NodeId> {
    candidates
        .iter()
        .find(|(_, volume)| volume.contains_point(point))
        .map(|(node, _)| *node)
}

#[cfg(test)]
mod tests {
    use super::{find_containing, Aabb};
    use crate::scene::{Payload, Scene};
    use glam::{Affine3A, Quat, Vec3};

    #[test]
    fn containment_is_inclusive() {
        let volume = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(volume.contains_point(Vec3::ZERO));
        assert!(volume.contains_point(Vec3::new(1.0, -1.0, 1.0)));
        assert!(!volume.contains_point(Vec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn new_orders_corners() {
        let volume = Aabb::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0));
        assert_eq!(volume.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(volume.max, Vec3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn rotated_box_grows_to_cover_corners() {
        let volume = Aabb::from_center_size(Vec3::ZERO, Vec3::new(2.0, 2.0, 0.0));
        let rotated = volume.transformed(&Affine3A::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
            Vec3::new(5.0, 0.0, 0.0),
        ));
        let half_diagonal = 2.0_f32.sqrt();
        assert!((rotated.max.x - (5.0 + half_diagonal)).abs() < 1e-5);
        assert!((rotated.center() - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn earlier_candidates_win_overlaps() {
        let mut scene = Scene::new();
        let outer = scene.insert(None, "outer".into(), Payload::Container).unwrap();
        let inner = scene.insert(None, "inner".into(), Payload::Container).unwrap();
        let candidates = [
            (inner, Aabb::from_center_size(Vec3::ZERO, Vec3::ONE)),
            (outer, Aabb::from_center_size(Vec3::ZERO, Vec3::splat(10.0))),
        ];
        assert_eq!(find_containing(Vec3::ZERO, &candidates), Some(inner));
        assert_eq!(find_containing(Vec3::new(3.0, 0.0, 0.0), &candidates), Some(outer));
        assert_eq!(find_containing(Vec3::new(30.0, 0.0, 0.0), &candidates), None);
    }
}
