use std::f32::consts::*;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use iyes_loopless::prelude::*;

use crate::{
    plugins::*,
    util::scenes::{make_test_arena, ArenaPiece},
};

#[derive(Debug)]
/// Main game plugin, responsible for loading the other game plugins and bootstrapping the game.
pub struct GamePlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Playing,
    Finished,
}

/// Reaching this sensor ends the game.
#[derive(Debug, Default, Component)]
pub struct EndTrigger;

/// Sent when the level is torn down and built again.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelRestarted;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            window: WindowDescriptor {
                title: "Holes".to_string(),
                width: 1280.,
                height: 720.,
                ..default()
            },
            ..default()
        }));

        app.add_loopless_state(GameState::Playing);
        app.add_event::<LevelRestarted>();

        app.add_plugin(RapierPhysicsPlugin::<NoUserData>::default());
        app.add_plugin(physics::PhysicsPlugin);
        app.add_plugin(input::InputPlugin);
        app.add_plugin(player::PlayerPlugin);
        app.add_plugin(camera::FollowCameraPlugin);
        app.add_plugin(portal::PortalPlugin);
        app.add_plugin(doors::DoorsPlugin);

        #[cfg(feature = "devel")]
        {
            app.add_plugin(debug::DebugPlugin);
        }

        app.add_startup_system(setup);
        app.add_system(reach_end_trigger.run_in_state(GameState::Playing));
        app.add_enter_system(GameState::Finished, report_results);
        app.add_system(restart_level.run_in_state(GameState::Finished));
    }
}

/// Perform game initialization
fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    make_test_arena(&mut commands, &mut meshes, &mut materials, 20., 3.);

    // Light
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            color: Color::ANTIQUE_WHITE,
            illuminance: 20_000.,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform {
            translation: Vec3::Y * 5.,
            rotation: Quat::from_euler(EulerRot::YXZ, FRAC_PI_4, -FRAC_PI_4, 0.),
            scale: Vec3::ONE,
        },
        ..default()
    });
}

fn reach_end_trigger(
    mut commands: Commands,
    mut collisions: EventReader<CollisionEvent>,
    triggers: Query<(), With<EndTrigger>>,
    players: Query<(), With<player::Player>>,
) {
    for collision in collisions.iter() {
        let (a, b, started) = physics::contact(collision);
        if !started {
            continue;
        }
        let reached = physics::sensor_contact(a, b, |e| triggers.get(e).ok())
            .map_or(false, |(_, other)| players.contains(other));
        if reached {
            info!("Player reached the end of the level");
            commands.insert_resource(NextState(GameState::Finished));
        }
    }
}

fn report_results(
    gun: Res<portal::PortalGun>,
    deaths: Res<player::Deaths>,
    mut players: Query<&mut Velocity, With<player::Player>>,
) {
    for mut velocity in &mut players {
        *velocity = Velocity::zero();
    }
    info!(
        "Game over. Holes placed: {} ({} shots), deaths: {}. Press R to restart",
        gun.placed(),
        gun.attempts(),
        deaths.0
    );
}

/// Build the level again from scratch and go back to playing.
fn restart_level(
    mut commands: Commands,
    keys: Res<Input<KeyCode>>,
    arena: Query<Entity, With<ArenaPiece>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut restarts: EventWriter<LevelRestarted>,
) {
    if !keys.just_pressed(KeyCode::R) {
        return;
    }
    info!("Restarting level");
    for entity in &arena {
        commands.entity(entity).despawn_recursive();
    }
    make_test_arena(&mut commands, &mut meshes, &mut materials, 20., 3.);
    restarts.send(LevelRestarted);
    commands.insert_resource(NextState(GameState::Playing));
}
