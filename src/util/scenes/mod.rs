use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::plugins::{
    camera::FollowCamera,
    doors::{Door, DoorSensor},
    game::EndTrigger,
    physics::*,
    player::{Obstacle, PlayerBundle, PLAYER_HEIGHT, PLAYER_RADIUS},
    portal::{PortalSurface, Portalable},
};

const WALL_THICKNESS: f32 = 1.;
const PLAYER_START: Vec3 = Vec3::new(0., PLAYER_HEIGHT / 2. + 0.1, 4.);

/// Everything [`make_test_arena`] spawns, torn down when the level restarts.
#[derive(Debug, Default, Clone, Copy, Component)]
pub struct ArenaPiece;

/// Setup a test room in a square flat arena format of specified size.
///
/// The arena has a partition with a door halfway through, a ledge in the far corner only
/// reachable through portals with the end of the level on top of it, a hazard strip in front of
/// the ledge and a crate to throw around.
pub fn make_test_arena(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
    length: f32,
    height: f32,
) {
    let walls_materials = [
        materials.add(StandardMaterial::from(Color::RED)),
        materials.add(StandardMaterial::from(Color::GREEN)),
        materials.add(StandardMaterial::from(Color::BLUE)),
        materials.add(StandardMaterial::from(Color::ANTIQUE_WHITE)),
    ];
    let ground_material = materials.add(StandardMaterial::from(Color::DARK_GRAY));

    let half_len = length / 2.;
    let wall_mesh = meshes.add(
        shape::Box {
            min_x: -half_len,
            max_x: half_len,
            min_y: -height / 2.,
            max_y: height / 2.,
            min_z: -WALL_THICKNESS / 2.,
            max_z: WALL_THICKNESS / 2.,
        }
        .into(),
    );

    let ground = block(
        commands,
        meshes,
        ground_material.clone(),
        "Ground",
        Vec3::new(-half_len * 1.1, -WALL_THICKNESS, -half_len * 1.1),
        Vec3::new(half_len * 1.1, 0., half_len * 1.1),
        GROUND_GROUP,
    );
    commands.entity(ground).insert(PortalSurface);

    for (i, mat) in walls_materials.into_iter().enumerate() {
        let mut transform = Transform::from_xyz(0., height / 2., -(half_len + WALL_THICKNESS / 2.));
        transform.rotate_around(
            Vec3::new(0., height / 2., 0.),
            Quat::from_axis_angle(Vec3::Y, i as f32 * FRAC_PI_2),
        );
        commands.spawn((
            PbrBundle {
                mesh: wall_mesh.clone(),
                material: mat,
                transform,
                ..default()
            },
            Name::from(format!("Wall_{}", i)),
            RigidBody::Fixed,
            Collider::cuboid(half_len, height / 2., WALL_THICKNESS / 2.),
            CollisionGroups::new(WALLS_GROUP, ALL_GROUPS - DOOR_SENSORS_GROUP),
            PortalSurface,
            ArenaPiece,
        ));
    }

    // Partition along X = -4 with a doorway in the middle
    let partition_material = materials.add(StandardMaterial::from(Color::GRAY));
    for (name, z_range) in [("Partition_0", (-half_len, -1.)), ("Partition_1", (1., half_len))] {
        block(
            commands,
            meshes,
            partition_material.clone(),
            name,
            Vec3::new(-4.25, 0., z_range.0),
            Vec3::new(-3.75, height, z_range.1),
            WALLS_GROUP,
        );
    }
    spawn_door(commands, meshes, materials, Vec3::new(-4., 0., 0.));

    let ledge = block(
        commands,
        meshes,
        ground_material,
        "Ledge",
        Vec3::new(3., 0., -half_len),
        Vec3::new(half_len, height, -3.),
        GROUND_GROUP,
    );
    commands.entity(ledge).insert(PortalSurface);
    commands.spawn((
        SpatialBundle::from(Transform::from_xyz(7., height + 0.5, -7.)),
        Name::from("EndTrigger"),
        EndTrigger,
        RigidBody::Fixed,
        Collider::cuboid(1., 0.5, 1.),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
        CollisionGroups::new(LEVEL_TRANSITION_SENSORS_GROUP, PLAYER_GROUP),
        ArenaPiece,
    ));

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(shape::Box::new(6., 0.1, 2.).into()),
            material: materials.add(StandardMaterial::from(Color::CRIMSON)),
            transform: Transform::from_xyz(6., 0.05, -1.5),
            ..default()
        },
        Name::from("Hazard"),
        Obstacle {
            respawn: PLAYER_START,
        },
        RigidBody::Fixed,
        Collider::cuboid(3., 0.05, 1.),
        CollisionGroups::new(OBSTACLES_GROUP, ALL_GROUPS - DOOR_SENSORS_GROUP),
        ArenaPiece,
    ));

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(shape::Cube { size: 0.5 }.into()),
            material: materials.add(StandardMaterial::from(Color::ORANGE_RED)),
            transform: Transform::from_xyz(2., 0.5, 2.),
            ..default()
        },
        Name::from("Crate"),
        RigidBody::Dynamic,
        Collider::cuboid(0.25, 0.25, 0.25),
        Velocity::default(),
        Ccd::enabled(),
        CollisionGroups::new(PROPS_GROUP, ALL_GROUPS),
        ActiveEvents::COLLISION_EVENTS,
        Portalable,
        ArenaPiece,
    ));

    commands.spawn((
        PlayerBundle {
            pbr: PbrBundle {
                mesh: meshes.add(
                    shape::Capsule {
                        radius: PLAYER_RADIUS,
                        depth: PLAYER_HEIGHT - 2. * PLAYER_RADIUS,
                        ..default()
                    }
                    .into(),
                ),
                material: materials.add(StandardMaterial::from(Color::WHITE)),
                transform: Transform::from_translation(PLAYER_START),
                ..default()
            },
            ..default()
        },
        ArenaPiece,
    ));

    // Looking down the diagonal, so screen up is world (-1, 0, -1)
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(10., 10., 10.).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        Name::from("Follow camera"),
        FollowCamera::default(),
        ArenaPiece,
    ));
}

/// Spawn a fixed box spanning `min` to `max`.
fn block(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    material: Handle<StandardMaterial>,
    name: &str,
    min: Vec3,
    max: Vec3,
    groups: Group,
) -> Entity {
    let half_extents = (max - min) / 2.;
    commands
        .spawn((
            PbrBundle {
                mesh: meshes.add(shape::Box::new(max.x - min.x, max.y - min.y, max.z - min.z).into()),
                material,
                transform: Transform::from_translation(min + half_extents),
                ..default()
            },
            Name::from(name),
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            CollisionGroups::new(groups, ALL_GROUPS - DOOR_SENSORS_GROUP),
            ArenaPiece,
        ))
        .id()
}

/// A door filling a 2 wide doorway at `base`, opened by standing on either side of it.
fn spawn_door(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
    base: Vec3,
) {
    const DOOR_HEIGHT: f32 = 2.5;

    let door = commands
        .spawn((
            PbrBundle {
                mesh: meshes.add(shape::Box::new(0.4, DOOR_HEIGHT, 2.).into()),
                material: materials.add(StandardMaterial::from(Color::MAROON)),
                transform: Transform::from_translation(base + Vec3::Y * DOOR_HEIGHT / 2.),
                ..default()
            },
            Name::from("Door"),
            Door::default(),
            RigidBody::Fixed,
            Collider::cuboid(0.2, DOOR_HEIGHT / 2., 1.),
            CollisionGroups::new(WALLS_GROUP, ALL_GROUPS - DOOR_SENSORS_GROUP),
            ArenaPiece,
        ))
        .id();

    commands.spawn((
        SpatialBundle::from(Transform::from_translation(base + Vec3::Y)),
        Name::from("Door sensor"),
        DoorSensor {
            door_entities: vec![door],
        },
        RigidBody::Fixed,
        Collider::cuboid(1.5, 1., 1.),
        Sensor,
        CollisionGroups::new(DOOR_SENSORS_GROUP, PLAYER_GROUP | PROPS_GROUP),
        ActiveEvents::COLLISION_EVENTS,
        ArenaPiece,
    ));
}
