//! Two linked portals, placed on level geometry with the portal gun, moving props and the player
//! from one to the other.
//!
//! The portal logic itself ([`PortalPair`], [`PortalGun`]) is plain data driven from the systems
//! below, the physics engine is only reached through the [`world`] adapters.

use bevy::{prelude::*, render::camera::CameraProjection};
use bevy_rapier3d::prelude::*;
use iyes_loopless::prelude::*;
use leafwing_input_manager::prelude::*;

pub mod aim;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pair;
pub mod placement;
pub mod traveller;
pub mod world;

#[cfg(test)]
mod test_world;

pub use aim::{FireRequest, PortalGun};
pub use pair::{Portal, PortalId, PortalPair, WarpEvent};

use config::{PortalConfig, DEFAULT_CONFIG_PATH};
use traveller::PortalableObject;
use world::{apply_collision_ignores, PendingCollisionIgnores, RapierWorld};

use super::{
    camera::FollowCamera,
    game::{GameState, LevelRestarted},
    input::{cursor_ray, Actions},
    physics::*,
    player::{Player, PlayerMovement},
};

#[derive(Debug)]
pub struct PortalPlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemLabel)]
pub enum PortalLabels {
    Aim,
    FirePortals,
    TrackSensors,
    ApplyCollisionIgnores,
    TeleportEntities,
    SyncPortals,
}

/// Marker for entities which can go through portals.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Portalable;

/// Tags geometry as accepting portals, for aim policies requiring it.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct PortalSurface;

/// The visible quad and trigger volume of one of the portals.
#[derive(Debug, Clone, Copy, Component)]
pub struct PortalSensor(pub PortalId);

/// Where the player is currently aiming, updated every frame.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct PortalAim {
    pub origin: Vec3,
    pub target: Option<Vec3>,
}

const CURSOR_RAY_LENGTH: f32 = 1000.;

impl Plugin for PortalPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WarpEvent>()
            .init_resource::<PendingCollisionIgnores>()
            .init_resource::<PortalAim>()
            .add_startup_system(spawn_portals)
            .add_system(reset_portals.before(PortalLabels::FirePortals))
            .add_system(
                update_aim
                    .run_in_state(GameState::Playing)
                    .label(PortalLabels::Aim),
            )
            .add_system(
                fire_portals
                    .run_in_state(GameState::Playing)
                    .label(PortalLabels::FirePortals)
                    .after(PortalLabels::Aim),
            )
            .add_system(
                track_portal_sensors
                    .label(PortalLabels::TrackSensors)
                    .after(PortalLabels::FirePortals),
            )
            .add_system(
                apply_collision_ignores
                    .label(PortalLabels::ApplyCollisionIgnores)
                    .after(PortalLabels::TrackSensors),
            )
            .add_system(
                teleport_portalables
                    .label(PortalLabels::TeleportEntities)
                    .after(PortalLabels::TrackSensors),
            )
            .add_system(
                sync_portal_entities
                    .label(PortalLabels::SyncPortals)
                    .after(PortalLabels::TeleportEntities),
            );
    }
}

/// Spawn both (closed) portals and the resources driving them.
fn spawn_portals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let config = PortalConfig::load_or_default(DEFAULT_CONFIG_PATH);
    let half_extent = config.placement.frame_half_extent;
    let mesh = meshes.add(
        shape::Quad {
            size: Vec2::splat(half_extent * 2.),
            flip: false,
        }
        .into(),
    );
    let colors = [Color::ORANGE, Color::CYAN];

    let colliders = PortalId::BOTH.map(|id| {
        commands
            .spawn((
                PbrBundle {
                    mesh: mesh.clone(),
                    material: materials.add(StandardMaterial {
                        base_color: colors[id.index()],
                        unlit: true,
                        ..default()
                    }),
                    visibility: Visibility { is_visible: false },
                    ..default()
                },
                Name::from(format!("Portal {:?}", id)),
                PortalSensor(id),
                Collider::cuboid(half_extent, half_extent, config.placement.trigger_depth),
                Sensor,
                ActiveEvents::COLLISION_EVENTS,
                CollisionGroups::new(Group::NONE, Group::NONE),
            ))
            .id()
    });

    info!("Spawned portals {:?}", colliders);
    commands.insert_resource(PortalGun::new(config.aim.clone()));
    commands.insert_resource(PortalPair::new(colliders, SURFACE_GROUPS, config));
}

/// Follow the cursor: the player fires from their own position towards whatever lies under it.
fn update_aim(
    windows: Res<Windows>,
    rapier: Res<RapierContext>,
    mut aim: ResMut<PortalAim>,
    players: Query<&GlobalTransform, With<Player>>,
    cameras: Query<(&Projection, &GlobalTransform), With<FollowCamera>>,
) {
    let (Ok(player), Ok((projection, camera))) = (players.get_single(), cameras.get_single()) else {
        return;
    };
    aim.origin = player.translation();
    aim.target = windows
        .get_primary()
        .and_then(|window| {
            let cursor = window.cursor_position()?;
            let size = Vec2::new(window.width(), window.height());
            cursor_ray(projection.get_projection_matrix(), camera, cursor, size)
        })
        .and_then(|(origin, direction)| {
            rapier.cast_ray(
                origin,
                direction,
                CURSOR_RAY_LENGTH,
                true,
                QueryFilter {
                    groups: Some(CollisionGroups::new(RAYCAST_GROUP, SURFACE_GROUPS).into()),
                    ..default()
                },
            )
            .map(|(_, toi)| origin + direction * toi)
        });
}

/// On the fire actions, shoot the matching portal at the aimed point.
fn fire_portals(
    rapier: Res<RapierContext>,
    aim: Res<PortalAim>,
    mut pair: ResMut<PortalPair>,
    mut gun: ResMut<PortalGun>,
    mut ignores: ResMut<PendingCollisionIgnores>,
    players: Query<(&ActionState<Actions>, &PlayerMovement), With<Player>>,
    surfaces: Query<Entity, With<PortalSurface>>,
) {
    let Ok((actions, movement)) = players.get_single() else {
        return;
    };
    let requested = [
        (Actions::FirePortalA, PortalId::A),
        (Actions::FirePortalB, PortalId::B),
    ]
    .into_iter()
    .find(|(action, _)| actions.just_pressed(*action));
    let Some((_, portal)) = requested else {
        return;
    };
    let Some(target) = aim.target else {
        debug!("Nothing under the cursor to fire portal {:?} at", portal);
        return;
    };

    let world = RapierWorld::new(&rapier, pair.colliders(), surfaces.iter());
    let request = FireRequest::new(portal, aim.origin, target - aim.origin);
    match gun.fire(
        &mut pair,
        &world,
        &mut *ignores,
        request,
        movement.orientation_reference,
    ) {
        Ok(pose) => info!("Opened portal {:?} at {}", portal, pose.translation),
        // A miss leaves both portals alone
        Err(err) => debug!("Portal {:?} not placed: {}", portal, err),
    }
}

/// Close both portals and clear the counters when the level starts over.
fn reset_portals(
    mut restarts: EventReader<LevelRestarted>,
    mut pair: ResMut<PortalPair>,
    mut gun: ResMut<PortalGun>,
    mut ignores: ResMut<PendingCollisionIgnores>,
) {
    if restarts.iter().count() == 0 {
        return;
    }
    pair.reset(&mut *ignores);
    gun.reset_counters();
}

/// Keep the pair's view of which objects are inside which portal up to date.
fn track_portal_sensors(
    mut collisions: EventReader<CollisionEvent>,
    removed: RemovedComponents<Portalable>,
    mut pair: ResMut<PortalPair>,
    mut ignores: ResMut<PendingCollisionIgnores>,
    portalables: Query<(), With<Portalable>>,
) {
    for collision in collisions.iter() {
        let (a, b, started) = contact(collision);
        let Some((portal, object)) = sensor_contact(a, b, |e| pair.portal_for_collider(e)) else {
            continue;
        };
        if !portalables.contains(object) {
            continue;
        }
        if started {
            pair.on_trigger_enter(portal, object, &mut *ignores);
        } else {
            pair.on_trigger_exit(portal, object, &mut *ignores);
        }
    }

    for object in removed.iter() {
        pair.forget(object, &mut *ignores);
    }
}

/// Run the pair's crossing test over every object inside a portal and write warps back to the
/// rigid bodies.
fn teleport_portalables(
    mut pair: ResMut<PortalPair>,
    mut objects: Query<(&mut Transform, &mut Velocity), With<Portalable>>,
    mut warp_events: EventWriter<WarpEvent>,
) {
    let mut tracked: Vec<Entity> = Vec::new();
    for id in PortalId::BOTH {
        for object in pair[id].occupants() {
            if !tracked.contains(&object) {
                tracked.push(object);
            }
        }
    }
    if tracked.is_empty() {
        return;
    }

    let mut snapshots: Vec<PortalableObject> = tracked
        .into_iter()
        .filter_map(|entity| {
            let (transform, velocity) = objects.get(entity).ok()?;
            Some(PortalableObject {
                entity,
                transform: *transform,
                linvel: velocity.linvel,
                angvel: velocity.angvel,
            })
        })
        .collect();

    let warps = pair.tick(&mut snapshots);
    for warp in &warps {
        let Some(snapshot) = snapshots.iter().find(|s| s.entity == warp.object) else {
            continue;
        };
        if let Ok((mut transform, mut velocity)) = objects.get_mut(warp.object) {
            *transform = snapshot.transform;
            velocity.linvel = snapshot.linvel;
            velocity.angvel = snapshot.angvel;
        }
    }
    warp_events.send_batch(warps);
}

/// Collision groups of a portal's trigger volume. A placed portal can be aimed at, it only lets
/// objects in once it leads somewhere.
fn portal_collision_groups(pair: &PortalPair, id: PortalId) -> CollisionGroups {
    if pair.is_visible(id) {
        CollisionGroups::new(PORTAL_GROUP, PORTALABLE_GROUPS | RAYCAST_GROUP)
    } else if pair[id].is_placed() {
        CollisionGroups::new(PORTAL_GROUP, RAYCAST_GROUP)
    } else {
        CollisionGroups::new(Group::NONE, Group::NONE)
    }
}

/// Mirror the pair's state on the portal entities. A portal only shows once it leads somewhere.
fn sync_portal_entities(
    pair: Res<PortalPair>,
    mut portals: Query<(
        &PortalSensor,
        &mut Transform,
        &mut Visibility,
        &mut CollisionGroups,
    )>,
) {
    if !pair.is_changed() {
        return;
    }
    for (sensor, mut transform, mut visibility, mut groups) in &mut portals {
        let portal = &pair[sensor.0];
        if portal.is_placed() {
            *transform = *portal.pose();
        }
        visibility.is_visible = pair.is_visible(sensor.0);
        *groups = portal_collision_groups(&pair, sensor.0);
    }
}
