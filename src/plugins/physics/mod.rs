use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionEvent, Group, RapierConfiguration, TimestepMode};

pub const WALLS_GROUP: Group = Group::GROUP_1;
pub const PROPS_GROUP: Group = Group::GROUP_2;
pub const PORTAL_GROUP: Group = Group::GROUP_3;
pub const PLAYER_GROUP: Group = Group::GROUP_4;
pub const RAYCAST_GROUP: Group = Group::GROUP_5;
pub const GROUND_GROUP: Group = Group::GROUP_6;
pub const DOOR_SENSORS_GROUP: Group = Group::GROUP_7;
pub const LEVEL_TRANSITION_SENSORS_GROUP: Group = Group::GROUP_8;
pub const OBSTACLES_GROUP: Group = Group::GROUP_9;
pub const ALL_GROUPS: Group = Group::ALL;

/// Static geometry a portal can be placed against.
pub const SURFACE_GROUPS: Group = WALLS_GROUP.union(GROUND_GROUP);

/// Everything that can travel through a portal.
pub const PORTALABLE_GROUPS: Group = PLAYER_GROUP.union(PROPS_GROUP);

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_startup_system(configure_rapier);
    }
}

fn configure_rapier(mut config: ResMut<RapierConfiguration>) {
    // Extra CCD substeps, objects leave portals with whatever speed they went in
    config.timestep_mode = TimestepMode::Variable {
        max_dt: 1. / 20.,
        time_scale: 1.,
        substeps: 4,
    }
}

/// Both colliders of a collision event, and whether the contact started or stopped.
pub fn contact(event: &CollisionEvent) -> (Entity, Entity, bool) {
    match event {
        CollisionEvent::Started(a, b, _) => (*a, *b, true),
        CollisionEvent::Stopped(a, b, _) => (*a, *b, false),
    }
}

/// If either collider of a contact satisfies `is_sensor`, returns it along with the other one.
pub fn sensor_contact<T>(
    a: Entity,
    b: Entity,
    mut is_sensor: impl FnMut(Entity) -> Option<T>,
) -> Option<(T, Entity)> {
    is_sensor(a)
        .map(|sensor| (sensor, b))
        .or_else(|| is_sensor(b).map(|sensor| (sensor, a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_can_be_on_either_side() {
        let sensor = Entity::from_raw(1);
        let other = Entity::from_raw(2);
        let find = |e: Entity| (e == sensor).then_some("sensor");
        assert_eq!(sensor_contact(sensor, other, find), Some(("sensor", other)));
        assert_eq!(sensor_contact(other, sensor, find), Some(("sensor", other)));
        assert_eq!(sensor_contact(other, other, find), None);
    }

    #[test]
    fn portalable_groups_do_not_include_surfaces() {
        assert!(!PORTALABLE_GROUPS.intersects(SURFACE_GROUPS));
        assert!(SURFACE_GROUPS.contains(WALLS_GROUP | GROUND_GROUP));
    }
}
