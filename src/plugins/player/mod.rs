//! This module contains the isometric player controller.
//!
//! The player walks along the skewed screen axes and turns towards where they are walking, or
//! towards the cursor when standing still. The direction they faced when last spawned or warped is
//! kept as the reference orienting the portals they fire. Running into an [`Obstacle`] kills them.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use euclid::Angle;
use iyes_loopless::prelude::*;
use leafwing_input_manager::prelude::*;

use crate::util::isometric::{movement_input, to_isometric};

use super::{
    game::{GameState, LevelRestarted},
    input::{default_input_map, Actions},
    physics::*,
    portal::{geometry::upright_look_rotation, PortalAim, PortalLabels, Portalable, WarpEvent},
};

#[derive(Debug)]
/// Player controller plugin, turning [`PlayerSpawner`]s into players and driving them.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Deaths>()
            .add_system(spawn_player.label(PlayerLabels::SpawnPlayer))
            .add_system(
                process_movement_inputs
                    .run_in_state(GameState::Playing)
                    .label(PlayerLabels::ProcessInputs)
                    .after(PortalLabels::Aim),
            )
            .add_system(
                hit_obstacles
                    .run_in_state(GameState::Playing)
                    .label(PlayerLabels::HitObstacles)
                    .after(PlayerLabels::ProcessInputs),
            )
            .add_system(reset_deaths)
            .add_system(
                reset_orientation_after_warp
                    .label(PlayerLabels::ResetOrientation)
                    .after(PortalLabels::TeleportEntities),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemLabel)]
pub enum PlayerLabels {
    SpawnPlayer,
    ProcessInputs,
    HitObstacles,
    ResetOrientation,
}

pub const PLAYER_HEIGHT: f32 = 1.8;
pub const PLAYER_RADIUS: f32 = 0.4;

#[derive(Debug, Default, Component)]
pub struct Player;

/// Kills the player on contact, sending them back to `respawn`.
#[derive(Debug, Clone, Copy, Component)]
pub struct Obstacle {
    pub respawn: Vec3,
}

/// Times the player died since the level started.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct Deaths(pub u32);

#[derive(Debug, Clone, Copy, Component)]
pub struct PlayerMovement {
    /// Facing used to orient fired portals.
    pub orientation_reference: Quat,
    pub speed: f32,
    pub rotation_speed: Angle<f32>,
}

impl Default for PlayerMovement {
    fn default() -> Self {
        PlayerMovement {
            orientation_reference: Quat::IDENTITY,
            speed: 3.,
            rotation_speed: Angle::degrees(360.),
        }
    }
}

impl PlayerMovement {
    /// Take the new horizontal facing after a warp. Coming out looking straight up or down keeps
    /// the previous reference.
    pub fn reset_orientation_reference(&mut self, forward: Vec3) {
        if let Some(rotation) = upright_look_rotation(forward) {
            self.orientation_reference = rotation;
        }
    }
}

/// Rotate `current` towards `target` by at most `max_step`.
pub fn turn_towards(current: Quat, target: Quat, max_step: Angle<f32>) -> Quat {
    let angle = current.angle_between(target);
    if angle <= max_step.radians || angle < f32::EPSILON {
        target
    } else {
        current.slerp(target, max_step.radians / angle)
    }
}

/// Rotation the player turns towards: where they walk, else towards the cursor, else their own
/// heading straightened up.
pub fn facing_target(
    walking: Vec3,
    position: Vec3,
    cursor: Option<Vec3>,
    forward: Vec3,
) -> Option<Quat> {
    upright_look_rotation(walking)
        .or_else(|| cursor.and_then(|target| upright_look_rotation(target - position)))
        .or_else(|| upright_look_rotation(forward))
}

#[derive(Debug, Default, Component)]
pub struct PlayerSpawner;

#[derive(Bundle, Default)]
pub struct PlayerBundle {
    #[bundle]
    pub pbr: PbrBundle,
    pub spawner: PlayerSpawner,
}

fn spawn_player(
    mut commands: Commands,
    spawners_query: Query<(&Transform, Entity), With<PlayerSpawner>>,
) {
    for (transform, id) in &spawners_query {
        info!("Spawning player at {}", transform.translation);
        commands
            .entity(id)
            .insert(InputManagerBundle {
                action_state: ActionState::default(),
                input_map: default_input_map(),
            })
            .insert((
                RigidBody::Dynamic,
                Collider::capsule_y(PLAYER_HEIGHT / 2. - PLAYER_RADIUS, PLAYER_RADIUS),
                LockedAxes::ROTATION_LOCKED,
                Velocity::default(),
                Ccd::enabled(),
                Name::from("Player"),
                CollisionGroups::new(PLAYER_GROUP, ALL_GROUPS),
                ActiveEvents::COLLISION_EVENTS,
                Portalable,
                Player,
                PlayerMovement {
                    orientation_reference: transform.rotation,
                    ..default()
                },
            ))
            .remove::<PlayerSpawner>();
    }
}

fn process_movement_inputs(
    time: Res<Time>,
    aim: Res<PortalAim>,
    mut player_query: Query<
        (
            &ActionState<Actions>,
            &PlayerMovement,
            &mut Velocity,
            &mut Transform,
        ),
        With<Player>,
    >,
) {
    for (input_state, movement, mut velocity, mut transform) in &mut player_query {
        let direction = to_isometric(movement_input(
            input_state.pressed(Actions::Forward),
            input_state.pressed(Actions::Back),
            input_state.pressed(Actions::Left),
            input_state.pressed(Actions::Right),
        ));

        // Vertical speed belongs to gravity
        velocity.linvel.x = direction.x * movement.speed;
        velocity.linvel.z = direction.z * movement.speed;

        let target = facing_target(
            direction,
            transform.translation,
            aim.target,
            transform.forward(),
        )
        .unwrap_or(movement.orientation_reference);
        let rotation = turn_towards(
            transform.rotation,
            target,
            movement.rotation_speed * time.delta_seconds(),
        );
        if rotation != transform.rotation {
            transform.rotation = rotation;
        }
    }
}

fn hit_obstacles(
    mut collisions: EventReader<CollisionEvent>,
    obstacles: Query<&Obstacle>,
    mut players: Query<(&mut Transform, &mut Velocity), With<Player>>,
    mut deaths: ResMut<Deaths>,
) {
    for collision in collisions.iter() {
        let (a, b, started) = contact(collision);
        if !started {
            continue;
        }
        let Some((obstacle, other)) = sensor_contact(a, b, |e| obstacles.get(e).ok()) else {
            continue;
        };
        let Ok((mut transform, mut velocity)) = players.get_mut(other) else {
            continue;
        };
        transform.translation = obstacle.respawn;
        *velocity = Velocity::zero();
        deaths.0 += 1;
        info!("Player died, respawning at {} ({} deaths)", obstacle.respawn, deaths.0);
    }
}

fn reset_deaths(mut restarts: EventReader<LevelRestarted>, mut deaths: ResMut<Deaths>) {
    if restarts.iter().count() > 0 {
        deaths.0 = 0;
    }
}

fn reset_orientation_after_warp(
    mut warps: EventReader<WarpEvent>,
    mut player_query: Query<(&Transform, &mut PlayerMovement), With<Player>>,
) {
    for warp in warps.iter() {
        if let Ok((transform, mut movement)) = player_query.get_mut(warp.object) {
            movement.reset_orientation_reference(transform.forward());
            info!(
                "Player went through portal {:?}, now facing {}",
                warp.entry,
                movement.orientation_reference.mul_vec3(Vec3::NEG_Z)
            );
        }
    }
}
