use bevy::prelude::*;

use super::{
    config::AimPolicy,
    error::FireError,
    geometry::portal_rotation,
    world::{CollisionIgnore, SpatialQuery, SurfaceKind},
    PortalId, PortalPair,
};
use crate::plugins::physics::PORTAL_GROUP;

/// A shot at the level, asking for one of the portals to be placed where it lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireRequest {
    pub portal: PortalId,
    pub origin: Vec3,
    pub direction: Vec3,
    /// Overrides the gun's range for this shot.
    pub max_distance: Option<f32>,
}

impl FireRequest {
    pub fn new(portal: PortalId, origin: Vec3, direction: Vec3) -> FireRequest {
        FireRequest {
            portal,
            origin,
            direction,
            max_distance: None,
        }
    }
}

/// Turns shots into portal placements and keeps count of them.
#[derive(Debug, Clone, Default, Resource)]
pub struct PortalGun {
    pub policy: AimPolicy,
    attempts: u32,
    placed: u32,
}

impl PortalGun {
    pub fn new(policy: AimPolicy) -> PortalGun {
        PortalGun {
            policy,
            attempts: 0,
            placed: 0,
        }
    }

    /// Number of shots fired.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of shots which opened a portal.
    pub fn placed(&self) -> u32 {
        self.placed
    }

    pub fn reset_counters(&mut self) {
        self.attempts = 0;
        self.placed = 0;
    }

    /// Fire at the level. `facing` is the orientation of whoever fires, it decides how the
    /// portal is turned on the surface.
    ///
    /// A failed shot leaves both portals as they were.
    pub fn fire<W: SpatialQuery, I: CollisionIgnore>(
        &mut self,
        pair: &mut PortalPair,
        world: &W,
        ignores: &mut I,
        request: FireRequest,
        facing: Quat,
    ) -> Result<Transform, FireError> {
        self.attempts += 1;
        let result = self.try_fire(pair, world, ignores, request, facing);
        if result.is_ok() {
            self.placed += 1;
        }
        result
    }

    fn try_fire<W: SpatialQuery, I: CollisionIgnore>(
        &self,
        pair: &mut PortalPair,
        world: &W,
        ignores: &mut I,
        request: FireRequest,
        facing: Quat,
    ) -> Result<Transform, FireError> {
        let mask = pair[request.portal].placement_mask | PORTAL_GROUP;
        let max_distance = request.max_distance.unwrap_or(self.policy.max_distance);
        let hit = world
            .cast_ray(request.origin, request.direction, max_distance, mask)
            .ok_or(FireError::NoSurface)?;

        match world.surface_kind(hit.collider) {
            SurfaceKind::Portal => return Err(FireError::HitPortal(hit.collider)),
            SurfaceKind::Untagged if self.policy.require_tagged_surface => {
                return Err(FireError::UntaggedSurface(hit.collider))
            }
            _ => {}
        }
        if self.policy.horizontal_only && hit.normal.y.abs() < self.policy.horizontal_threshold {
            return Err(FireError::NotHorizontal(hit.collider));
        }

        let rotation = portal_rotation(hit.normal, facing);
        Ok(pair.try_place(request.portal, hit.collider, hit.point, rotation, world, ignores)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{
        physics::SURFACE_GROUPS,
        portal::{
            config::PortalConfig,
            error::PlacementError,
            test_world::{assert_vec_eq, BoxWorld, RecordingIgnores},
        },
    };

    struct Range {
        world: BoxWorld,
        pair: PortalPair,
        ignores: RecordingIgnores,
        floor: Entity,
        wall: Entity,
    }

    fn range() -> Range {
        let mut world = BoxWorld::new();
        let floor = world.floor(Vec3::new(-5., -1., -5.), Vec3::new(5., 0., 5.));
        let wall = world.wall(Vec3::new(-5., 0., -6.), Vec3::new(5., 4., -5.));
        let colliders = [world.entity(), world.entity()];
        Range {
            world,
            pair: PortalPair::new(colliders, SURFACE_GROUPS, PortalConfig::default()),
            ignores: RecordingIgnores::default(),
            floor,
            wall,
        }
    }

    fn facing_z() -> Quat {
        Transform::IDENTITY.looking_at(Vec3::Z, Vec3::Y).rotation
    }

    fn down_at(portal: PortalId, x: f32, z: f32) -> FireRequest {
        FireRequest::new(portal, Vec3::new(x, 3., z), Vec3::NEG_Y)
    }

    #[test]
    fn floor_shot_opens_a_portal_facing_down() {
        let mut range = range();
        let mut gun = PortalGun::default();
        let pose = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::A, 0., 0.),
                facing_z(),
            )
            .unwrap();

        assert_vec_eq(pose.forward(), Vec3::NEG_Y);
        // Facing +Z puts our right hand towards -X
        assert_vec_eq(pose.right(), Vec3::NEG_X);
        assert_vec_eq(pose.translation, Vec3::new(0., 0.001, 0.));
        assert_eq!(range.pair[PortalId::A].wall(), Some(range.floor));
        assert_eq!((gun.attempts(), gun.placed()), (1, 1));
    }

    #[test]
    fn right_edge_snaps_to_the_dominant_axis() {
        let mut range = range();
        let mut gun = PortalGun::default();
        // Mostly facing -X, slightly towards +Z
        let facing = Transform::IDENTITY
            .looking_at(Vec3::new(-1., 0., 0.3), Vec3::Y)
            .rotation;
        let pose = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::B, 1., 1.),
                facing,
            )
            .unwrap();
        assert_vec_eq(pose.right(), Vec3::NEG_Z);
    }

    #[test]
    fn missing_everything_is_not_an_error_state() {
        let mut range = range();
        let mut gun = PortalGun::default();
        let request = FireRequest::new(PortalId::A, Vec3::new(0., 2., 0.), Vec3::Y);
        let err = gun
            .fire(&mut range.pair, &range.world, &mut range.ignores, request, facing_z())
            .unwrap_err();
        assert_eq!(err, FireError::NoSurface);
        assert!(!range.pair[PortalId::A].is_placed());
        assert_eq!((gun.attempts(), gun.placed()), (1, 0));
    }

    #[test]
    fn shots_out_of_range_miss() {
        let mut range = range();
        let mut gun = PortalGun::default();
        gun.policy.max_distance = 2.;
        let err = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::A, 0., 0.),
                facing_z(),
            )
            .unwrap_err();
        assert_eq!(err, FireError::NoSurface);
    }

    #[test]
    fn shots_can_override_the_range() {
        let mut range = range();
        let mut gun = PortalGun::default();
        let short = FireRequest {
            max_distance: Some(2.),
            ..down_at(PortalId::A, 0., 0.)
        };
        let err = gun
            .fire(&mut range.pair, &range.world, &mut range.ignores, short, facing_z())
            .unwrap_err();
        assert_eq!(err, FireError::NoSurface);

        gun.policy.max_distance = 2.;
        let long = FireRequest {
            max_distance: Some(10.),
            ..down_at(PortalId::A, 0., 0.)
        };
        assert!(gun
            .fire(&mut range.pair, &range.world, &mut range.ignores, long, facing_z())
            .is_ok());
        assert_eq!((gun.attempts(), gun.placed()), (2, 1));
        gun.reset_counters();
        assert_eq!((gun.attempts(), gun.placed()), (0, 0));
    }

    #[test]
    fn portals_cannot_be_shot_onto_portals() {
        let mut range = range();
        let mut gun = PortalGun::default();
        let pose = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::A, 0., 0.),
                facing_z(),
            )
            .unwrap();
        let collider = range.pair[PortalId::A].collider;
        range
            .world
            .portal_collider(collider, &pose, Vec3::new(0.5, 0.5, 0.3));

        let err = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::B, 0.1, 0.),
                facing_z(),
            )
            .unwrap_err();
        assert_eq!(err, FireError::HitPortal(collider));
        assert!(!range.pair[PortalId::B].is_placed());
    }

    #[test]
    fn policy_can_require_tagged_surfaces() {
        let mut range = range();
        let mut gun = PortalGun::default();
        gun.policy.require_tagged_surface = true;
        let at_wall = FireRequest::new(PortalId::A, Vec3::new(0., 2., 0.), Vec3::NEG_Z);
        let err = gun
            .fire(&mut range.pair, &range.world, &mut range.ignores, at_wall, Quat::IDENTITY)
            .unwrap_err();
        assert_eq!(err, FireError::UntaggedSurface(range.wall));

        // The floor is tagged
        assert!(gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::A, 0., 0.),
                facing_z()
            )
            .is_ok());
    }

    #[test]
    fn policy_can_require_horizontal_surfaces() {
        let mut range = range();
        let mut gun = PortalGun::default();
        let at_wall = FireRequest::new(PortalId::A, Vec3::new(0., 2., 0.), Vec3::NEG_Z);
        assert!(gun
            .fire(&mut range.pair, &range.world, &mut range.ignores, at_wall, Quat::IDENTITY)
            .is_ok());

        gun.policy.horizontal_only = true;
        let err = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                FireRequest {
                    portal: PortalId::B,
                    ..at_wall
                },
                Quat::IDENTITY,
            )
            .unwrap_err();
        assert_eq!(err, FireError::NotHorizontal(range.wall));
    }

    #[test]
    fn rejected_placement_is_reported() {
        let mut range = range();
        let mut gun = PortalGun::default();
        // Crates on the floor, right where we aim
        range.world.wall(Vec3::new(0.2, 0., 0.2), Vec3::new(0.3, 0.2, 0.3));
        range.world.wall(Vec3::new(-0.3, 0., -0.3), Vec3::new(-0.2, 0.2, -0.2));
        let err = gun
            .fire(
                &mut range.pair,
                &range.world,
                &mut range.ignores,
                down_at(PortalId::A, 0., 0.),
                facing_z(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            FireError::Placement(PlacementError::Obstructed { colliders: 2 })
        );
        assert_eq!((gun.attempts(), gun.placed()), (1, 0));
    }
}
