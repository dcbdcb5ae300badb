use std::ops::{Index, IndexMut};

use bevy::{prelude::*, utils::HashSet};
use bevy_rapier3d::prelude::Group;

use super::{
    config::PortalConfig,
    error::PlacementError,
    geometry::crossed_plane,
    traveller::{PortalableObject, PortalableRegistry, Transit},
    world::{CollisionIgnore, SpatialQuery},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortalId {
    A,
    B,
}

impl PortalId {
    pub const BOTH: [PortalId; 2] = [PortalId::A, PortalId::B];

    pub const fn index(self) -> usize {
        match self {
            PortalId::A => 0,
            PortalId::B => 1,
        }
    }

    pub const fn other(self) -> PortalId {
        match self {
            PortalId::A => PortalId::B,
            PortalId::B => PortalId::A,
        }
    }
}

/// Object inside a portal's trigger volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occupant {
    object: Entity,
    /// Already went through this portal, it has to leave the trigger before going through again.
    spent: bool,
}

#[derive(Debug, Clone)]
pub struct Portal {
    pub id: PortalId,
    /// Trigger volume of the portal in the physics world.
    pub collider: Entity,
    /// Geometry the portal can sit on.
    pub placement_mask: Group,
    pose: Transform,
    wall: Option<Entity>,
    occupants: Vec<Occupant>,
}

impl Portal {
    pub fn new(id: PortalId, collider: Entity, placement_mask: Group) -> Portal {
        Portal {
            id,
            collider,
            placement_mask,
            pose: Transform::IDENTITY,
            wall: None,
            occupants: Vec::new(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.wall.is_some()
    }

    pub fn pose(&self) -> &Transform {
        &self.pose
    }

    /// The collider this portal is embedded in, if placed.
    pub fn wall(&self) -> Option<Entity> {
        self.wall
    }

    pub fn contains(&self, object: Entity) -> bool {
        self.occupants.iter().any(|o| o.object == object)
    }

    pub fn occupants(&self) -> impl Iterator<Item = Entity> + '_ {
        self.occupants.iter().map(|o| o.object)
    }
}

/// Emitted for every object sent through a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpEvent {
    pub object: Entity,
    pub entry: PortalId,
    pub exit: PortalId,
}

/// The two linked portals, the objects inside them, and the teleportation logic.
#[derive(Debug, Clone, Resource)]
pub struct PortalPair {
    portals: [Portal; 2],
    travellers: PortalableRegistry,
    config: PortalConfig,
}

impl Index<PortalId> for PortalPair {
    type Output = Portal;

    fn index(&self, id: PortalId) -> &Portal {
        &self.portals[id.index()]
    }
}

impl IndexMut<PortalId> for PortalPair {
    fn index_mut(&mut self, id: PortalId) -> &mut Portal {
        &mut self.portals[id.index()]
    }
}

impl PortalPair {
    pub fn new(colliders: [Entity; 2], placement_mask: Group, config: PortalConfig) -> PortalPair {
        PortalPair {
            portals: [
                Portal::new(PortalId::A, colliders[0], placement_mask),
                Portal::new(PortalId::B, colliders[1], placement_mask),
            ],
            travellers: PortalableRegistry::default(),
            config,
        }
    }

    pub fn colliders(&self) -> [Entity; 2] {
        [self.portals[0].collider, self.portals[1].collider]
    }

    /// Portal owning the given trigger collider.
    pub fn portal_for_collider(&self, collider: Entity) -> Option<PortalId> {
        PortalId::BOTH
            .into_iter()
            .find(|id| self[*id].collider == collider)
    }

    pub fn transit(&self, object: Entity) -> Option<Transit> {
        self.travellers.transit(object)
    }

    /// A portal is only worth showing once there is somewhere to go through it.
    pub fn is_visible(&self, id: PortalId) -> bool {
        self[id].is_placed() && self[id.other()].is_placed()
    }

    /// Place a portal on `wall`, correcting the pose to fit the surface.
    ///
    /// On failure the portal is left as it was, placed or not.
    pub fn try_place<W: SpatialQuery, I: CollisionIgnore>(
        &mut self,
        id: PortalId,
        wall: Entity,
        position: Vec3,
        rotation: Quat,
        world: &W,
        ignores: &mut I,
    ) -> Result<Transform, PlacementError> {
        let pose = self[id].resolve_placement(world, position, rotation, &self.config.placement)?;
        self.remove(id, ignores);

        let portal = &mut self[id];
        portal.pose = pose;
        portal.wall = Some(wall);
        info!("Portal {:?} placed at {} on {:?}", id, pose.translation, wall);
        Ok(pose)
    }

    /// Close a portal. Objects inside it collide with its wall again.
    pub fn remove<I: CollisionIgnore>(&mut self, id: PortalId, ignores: &mut I) {
        let Some(wall) = self[id].wall.take() else {
            return;
        };
        debug!("Removing portal {:?}", id);
        let occupants = std::mem::take(&mut self[id].occupants);
        for occupant in occupants {
            ignores.set_collision_ignored(occupant.object, wall, false);
            let inside_other = self[id.other()].contains(occupant.object);
            self.travellers.leave(occupant.object, id, inside_other);
        }
    }

    /// Close both portals and forget every object, for a fresh start of the level.
    pub fn reset<I: CollisionIgnore>(&mut self, ignores: &mut I) {
        for id in PortalId::BOTH {
            self.remove(id, ignores);
        }
        self.travellers = PortalableRegistry::default();
    }

    /// An object entered the trigger volume of a portal.
    pub fn on_trigger_enter<I: CollisionIgnore>(
        &mut self,
        id: PortalId,
        object: Entity,
        ignores: &mut I,
    ) {
        let Some(wall) = self[id].wall else {
            return;
        };
        if self[id].contains(object) {
            return;
        }
        debug!("{:?} entered portal {:?}", object, id);
        self[id].occupants.push(Occupant {
            object,
            spent: false,
        });
        self.travellers.enter(object, id);
        ignores.set_collision_ignored(object, wall, true);
    }

    /// An object left the trigger volume of a portal.
    pub fn on_trigger_exit<I: CollisionIgnore>(
        &mut self,
        id: PortalId,
        object: Entity,
        ignores: &mut I,
    ) {
        let portal = &mut self[id];
        let Some(index) = portal.occupants.iter().position(|o| o.object == object) else {
            return;
        };
        debug!("{:?} left portal {:?}", object, id);
        portal.occupants.swap_remove(index);
        if let Some(wall) = portal.wall {
            ignores.set_collision_ignored(object, wall, false);
        }
        let inside_other = self[id.other()].contains(object);
        self.travellers.leave(object, id, inside_other);
    }

    /// An object is gone from the world altogether.
    pub fn forget<I: CollisionIgnore>(&mut self, object: Entity, ignores: &mut I) {
        for id in PortalId::BOTH {
            self.on_trigger_exit(id, object, ignores);
        }
        self.travellers.forget(object);
    }

    /// Send every tracked object which crossed a portal plane through to the other portal.
    ///
    /// An object goes through at most one portal per tick, and through a given portal at most
    /// once until it leaves its trigger volume.
    pub fn tick(&mut self, objects: &mut [PortalableObject]) -> Vec<WarpEvent> {
        let mut warps = Vec::new();
        let mut warped = HashSet::new();
        let anchor_offset = self.config.warp_anchor_offset;

        for id in PortalId::BOTH {
            if !self.is_visible(id) {
                continue;
            }
            let entry = self[id].pose;
            let exit = self[id.other()].pose;

            for slot in 0..self[id].occupants.len() {
                let occupant = self[id].occupants[slot];
                if occupant.spent || warped.contains(&occupant.object) {
                    continue;
                }
                if self.travellers.transit(occupant.object).map(|t| t.entry) != Some(id) {
                    continue;
                }
                let Some(object) = objects.iter_mut().find(|o| o.entity == occupant.object) else {
                    continue;
                };
                if !crossed_plane(&entry, object.transform.translation) {
                    continue;
                }

                object.warp(&entry, &exit, anchor_offset);
                let transit = self
                    .travellers
                    .swap(occupant.object)
                    .expect("tracked objects have a transit");
                self[id].occupants[slot].spent = true;
                warped.insert(occupant.object);
                info!("Warped {:?} from portal {:?} to {:?}", occupant.object, id, transit.entry);
                warps.push(WarpEvent {
                    object: occupant.object,
                    entry: id,
                    exit: transit.entry,
                });
            }
        }
        warps
    }
}
