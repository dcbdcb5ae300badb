use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::{physics::*, player::Player};

#[derive(Debug)]
pub struct DoorsPlugin;

impl Plugin for DoorsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DoorEvent>()
            .add_system(trigger_doors.label(DoorLabels::TriggerDoors))
            .add_system(apply_door_state.after(DoorLabels::TriggerDoors));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemLabel)]
pub enum DoorLabels {
    TriggerDoors,
}

#[derive(Debug, Default, Component)]
pub struct Door {
    pub open: bool,
}

impl Door {
    /// Returns the event to emit if this changed the door.
    pub fn set_open(&mut self, door: Entity, open: bool) -> Option<DoorEvent> {
        if self.open == open {
            return None;
        }
        self.open = open;
        Some(if open {
            DoorEvent::Opened(door)
        } else {
            DoorEvent::Closed(door)
        })
    }
}

/// Opens its doors while the player stands in it.
#[derive(Debug, Default, Component)]
pub struct DoorSensor {
    pub door_entities: Vec<Entity>,
}

/// For whoever animates the doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEvent {
    Opened(Entity),
    Closed(Entity),
}

fn trigger_doors(
    mut collisions: EventReader<CollisionEvent>,
    sensors: Query<&DoorSensor>,
    players: Query<(), With<Player>>,
    mut doors: Query<&mut Door>,
    mut door_events: EventWriter<DoorEvent>,
) {
    for collision in collisions.iter() {
        let (a, b, started) = contact(collision);
        let Some((sensor, other)) = sensor_contact(a, b, |e| sensors.get(e).ok()) else {
            continue;
        };
        if !players.contains(other) {
            continue;
        }
        for door_entity in &sensor.door_entities {
            match doors.get_mut(*door_entity) {
                Ok(mut door) => {
                    if let Some(event) = door.set_open(*door_entity, started) {
                        debug!("{:?}", event);
                        door_events.send(event);
                    }
                }
                Err(_) => warn!("Door sensor refers to missing door {:?}", door_entity),
            }
        }
    }
}

/// An open door is out of the way: hidden and not colliding.
fn apply_door_state(mut doors: Query<(&Door, &mut Visibility, &mut CollisionGroups), Changed<Door>>) {
    for (door, mut visibility, mut groups) in &mut doors {
        visibility.is_visible = !door.open;
        *groups = if door.open {
            CollisionGroups::new(Group::NONE, Group::NONE)
        } else {
            CollisionGroups::new(WALLS_GROUP, ALL_GROUPS - DOOR_SENSORS_GROUP)
        };
    }
}
