//! The seam between the portal logic and the physics engine.
//!
//! Placement, firing and trigger tracking only talk to the world through [`SpatialQuery`] and
//! [`CollisionIgnore`]. [`RapierWorld`] and [`PendingCollisionIgnores`] back them with
//! bevy_rapier, tests use an in-memory box world.

use bevy::{
    prelude::*,
    utils::{HashMap, HashSet},
};
use bevy_rapier3d::prelude::*;

use crate::plugins::physics::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub collider: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// One of the two portals.
    Portal,
    /// Geometry explicitly tagged as accepting portals.
    Tagged,
    Untagged,
}

/// Read-only geometric queries against the level.
pub trait SpatialQuery {
    /// Cast a ray against colliders in `mask`. A ray starting inside a collider hits it at
    /// distance 0.
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: Group)
        -> Option<RayHit>;

    /// Whether a sphere intersects any collider in `mask`.
    fn check_sphere(&self, center: Vec3, radius: f32, mask: Group) -> bool;

    /// Every collider in `mask` intersecting an oriented box.
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, mask: Group)
        -> Vec<Entity>;

    fn surface_kind(&self, collider: Entity) -> SurfaceKind;

    /// Whether the segment from `start` to `end` hits a collider in `mask`.
    fn linecast(&self, start: Vec3, end: Vec3, mask: Group) -> bool {
        let segment = end - start;
        let length = segment.length();
        length > 0. && self.cast_ray(start, segment / length, length, mask).is_some()
    }
}

/// Sink for per-pair collision overrides, letting objects pass through the wall a portal sits on.
pub trait CollisionIgnore {
    fn set_collision_ignored(&mut self, object: Entity, wall: Entity, ignored: bool);
}

/// [`SpatialQuery`] over the rapier context of the current frame.
pub struct RapierWorld<'w> {
    context: &'w RapierContext,
    portal_colliders: [Entity; 2],
    tagged_surfaces: HashSet<Entity>,
}

impl<'w> RapierWorld<'w> {
    pub fn new(
        context: &'w RapierContext,
        portal_colliders: [Entity; 2],
        tagged_surfaces: impl IntoIterator<Item = Entity>,
    ) -> RapierWorld<'w> {
        RapierWorld {
            context,
            portal_colliders,
            tagged_surfaces: tagged_surfaces.into_iter().collect(),
        }
    }

    fn filter(mask: Group) -> QueryFilter<'static> {
        QueryFilter {
            groups: Some(CollisionGroups::new(RAYCAST_GROUP, mask).into()),
            ..default()
        }
    }
}

impl SpatialQuery for RapierWorld<'_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: Group,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let (collider, intersection) = self.context.cast_ray_and_get_normal(
            origin,
            direction,
            max_distance,
            true,
            Self::filter(mask),
        )?;
        Some(RayHit {
            point: intersection.point,
            normal: intersection.normal,
            distance: intersection.toi,
            collider,
        })
    }

    fn check_sphere(&self, center: Vec3, radius: f32, mask: Group) -> bool {
        self.context
            .intersection_with_shape(
                center,
                Quat::IDENTITY,
                &Collider::ball(radius),
                Self::filter(mask),
            )
            .is_some()
    }

    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: Group,
    ) -> Vec<Entity> {
        let mut colliders = Vec::new();
        self.context.intersections_with_shape(
            center,
            rotation,
            &Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Self::filter(mask),
            |entity| {
                colliders.push(entity);
                true
            },
        );
        colliders
    }

    fn surface_kind(&self, collider: Entity) -> SurfaceKind {
        if self.portal_colliders.contains(&collider) {
            SurfaceKind::Portal
        } else if self.tagged_surfaces.contains(&collider) {
            SurfaceKind::Tagged
        } else {
            SurfaceKind::Untagged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreChange {
    pub object: Entity,
    pub wall: Entity,
    pub ignored: bool,
}

/// Walls an object currently passes through, and the filters it had before.
#[derive(Debug, Clone)]
struct PassThrough {
    filters: Group,
    walls: Vec<Entity>,
}

/// Collision overrides requested by the portal pair, applied to the colliders' collision groups
/// by [`apply_collision_ignores`].
#[derive(Debug, Default, Resource)]
pub struct PendingCollisionIgnores {
    changes: Vec<IgnoreChange>,
    active: HashMap<Entity, PassThrough>,
}

impl PendingCollisionIgnores {
    /// Walls `object` currently passes through.
    pub fn ignored_walls(&self, object: Entity) -> &[Entity] {
        self.active
            .get(&object)
            .map(|pass| pass.walls.as_slice())
            .unwrap_or_default()
    }
}

impl CollisionIgnore for PendingCollisionIgnores {
    fn set_collision_ignored(&mut self, object: Entity, wall: Entity, ignored: bool) {
        self.changes.push(IgnoreChange {
            object,
            wall,
            ignored,
        });
    }
}

/// Rapier has no per-pair override, so an object stops filtering for whatever groups the walls it
/// passes through belong to. The filters are rebuilt from every such wall, so leaving one portal
/// doesn't restore a wall group another portal still needs ignored.
pub fn apply_collision_ignores(
    mut pending: ResMut<PendingCollisionIgnores>,
    walls: Query<&CollisionGroups, Without<super::Portalable>>,
    mut objects: Query<&mut CollisionGroups, With<super::Portalable>>,
) {
    let PendingCollisionIgnores { changes, active } = &mut *pending;
    for change in changes.drain(..) {
        let Ok(mut groups) = objects.get_mut(change.object) else {
            active.remove(&change.object);
            continue;
        };
        let pass = active.entry(change.object).or_insert_with(|| PassThrough {
            filters: groups.filters,
            walls: Vec::new(),
        });
        if change.ignored {
            debug!("{:?} now passes through {:?}", change.object, change.wall);
            if !pass.walls.contains(&change.wall) {
                pass.walls.push(change.wall);
            }
        } else {
            debug!("{:?} collides with {:?} again", change.object, change.wall);
            pass.walls.retain(|wall| *wall != change.wall);
        }

        if pass.walls.is_empty() {
            groups.filters = pass.filters;
            active.remove(&change.object);
        } else {
            let ignored = pass.walls.iter().fold(Group::NONE, |acc, wall| {
                acc | walls
                    .get(*wall)
                    .map(|groups| groups.memberships)
                    .unwrap_or(SURFACE_GROUPS)
            });
            groups.filters = pass.filters - ignored;
        }
    }
}
