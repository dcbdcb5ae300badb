//! Axis-aligned box level used by the portal tests.

use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;

use super::world::{CollisionIgnore, RayHit, SpatialQuery, SurfaceKind};
use crate::plugins::physics::*;

#[derive(Debug, Clone)]
pub struct SolidBox {
    pub entity: Entity,
    pub min: Vec3,
    pub max: Vec3,
    pub groups: Group,
    pub kind: SurfaceKind,
}

#[derive(Debug, Default)]
pub struct BoxWorld {
    pub boxes: Vec<SolidBox>,
    next_id: u32,
}

impl BoxWorld {
    pub fn new() -> BoxWorld {
        BoxWorld::default()
    }

    pub fn entity(&mut self) -> Entity {
        self.next_id += 1;
        Entity::from_raw(self.next_id)
    }

    pub fn add(&mut self, min: Vec3, max: Vec3, groups: Group, kind: SurfaceKind) -> Entity {
        let entity = self.entity();
        self.add_with(entity, min, max, groups, kind);
        entity
    }

    pub fn add_with(&mut self, entity: Entity, min: Vec3, max: Vec3, groups: Group, kind: SurfaceKind) {
        self.boxes.push(SolidBox {
            entity,
            min,
            max,
            groups,
            kind,
        });
    }

    pub fn floor(&mut self, min: Vec3, max: Vec3) -> Entity {
        self.add(min, max, GROUND_GROUP, SurfaceKind::Tagged)
    }

    pub fn wall(&mut self, min: Vec3, max: Vec3) -> Entity {
        self.add(min, max, WALLS_GROUP, SurfaceKind::Untagged)
    }

    /// Trigger volume of a placed portal, as the physics engine would see it.
    pub fn portal_collider(&mut self, entity: Entity, pose: &Transform, half_extents: Vec3) {
        let (min, max) = world_aabb(pose.translation, half_extents, pose.rotation);
        self.add_with(entity, min, max, PORTAL_GROUP, SurfaceKind::Portal);
    }

    fn matching(&self, mask: Group) -> impl Iterator<Item = &SolidBox> {
        self.boxes.iter().filter(move |b| b.groups.intersects(mask))
    }
}

fn world_aabb(center: Vec3, half_extents: Vec3, rotation: Quat) -> (Vec3, Vec3) {
    let m = Mat3::from_quat(rotation);
    let extent = Vec3::new(
        m.row(0).abs().dot(half_extents),
        m.row(1).abs().dot(half_extents),
        m.row(2).abs().dot(half_extents),
    );
    (center - extent, center + extent)
}

fn ray_box(origin: Vec3, direction: Vec3, b: &SolidBox) -> Option<(f32, Vec3)> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut normal = Vec3::ZERO;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < b.min[axis] || o > b.max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (b.min[axis] - o) / d;
        let t2 = (b.max[axis] - o) / d;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > t_min {
            t_min = near;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        t_max = t_max.min(far);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0. {
        None
    } else if t_min < 0. {
        // Started inside
        Some((0., Vec3::ZERO))
    } else {
        Some((t_min, normal))
    }
}

impl SpatialQuery for BoxWorld {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: Group,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        self.matching(mask)
            .filter_map(|b| {
                ray_box(origin, direction, b)
                    .filter(|(t, _)| *t <= max_distance)
                    .map(|(t, normal)| RayHit {
                        point: origin + direction * t,
                        normal,
                        distance: t,
                        collider: b.entity,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn check_sphere(&self, center: Vec3, radius: f32, mask: Group) -> bool {
        self.matching(mask)
            .any(|b| center.clamp(b.min, b.max).distance(center) <= radius)
    }

    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: Group,
    ) -> Vec<Entity> {
        let (min, max) = world_aabb(center, half_extents, rotation);
        self.matching(mask)
            .filter(|b| min.cmplt(b.max).all() && max.cmpgt(b.min).all())
            .map(|b| b.entity)
            .collect()
    }

    fn surface_kind(&self, collider: Entity) -> SurfaceKind {
        self.boxes
            .iter()
            .find(|b| b.entity == collider)
            .map(|b| b.kind)
            .unwrap_or(SurfaceKind::Untagged)
    }
}

/// Keeps the collision overrides currently in force.
#[derive(Debug, Default)]
pub struct RecordingIgnores {
    pub active: Vec<(Entity, Entity)>,
}

impl CollisionIgnore for RecordingIgnores {
    fn set_collision_ignored(&mut self, object: Entity, wall: Entity, ignored: bool) {
        if ignored {
            self.active.push((object, wall));
        } else if let Some(index) = self.active.iter().position(|p| *p == (object, wall)) {
            self.active.remove(index);
        }
    }
}

pub fn assert_vec_eq(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1e-3),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}
