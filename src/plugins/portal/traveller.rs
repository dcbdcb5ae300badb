use bevy::{prelude::*, utils::HashMap};

use super::{geometry::half_turn, PortalId};

/// Which portal an object is going through, and where it will come out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transit {
    pub entry: PortalId,
    pub exit: PortalId,
}

impl Transit {
    pub fn through(entry: PortalId) -> Transit {
        Transit {
            entry,
            exit: entry.other(),
        }
    }

    pub fn swapped(self) -> Transit {
        Transit {
            entry: self.exit,
            exit: self.entry,
        }
    }
}

/// Physics state of an object which can go through portals. The rigid body owns it, this is the
/// snapshot the portal pair works on during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalableObject {
    pub entity: Entity,
    pub transform: Transform,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

impl PortalableObject {
    pub fn new(entity: Entity, transform: Transform, linvel: Vec3) -> PortalableObject {
        PortalableObject {
            entity,
            transform,
            linvel,
            angvel: Vec3::ZERO,
        }
    }

    /// Move the object from the space in front of `entry` to the space in front of `exit`.
    ///
    /// The object is first pulled onto the entry portal's centre, `anchor_offset` up along the
    /// portal, so it comes out on the exit plane and can't immediately cross it again. Velocities
    /// only go through the relative rotation.
    pub fn warp(&mut self, entry: &Transform, exit: &Transform, anchor_offset: f32) {
        let to_entry_local = entry.rotation.inverse();
        let relative_rotation = exit.rotation * half_turn() * to_entry_local;

        let anchor = entry.translation + entry.up() * anchor_offset;
        let relative_pos = half_turn() * (to_entry_local * (anchor - entry.translation));
        self.transform.translation = exit.translation + exit.rotation * relative_pos;

        self.transform.rotation = keep_upright(relative_rotation * self.transform.rotation);

        self.linvel = relative_rotation * self.linvel;
        self.angvel = relative_rotation * self.angvel;
    }
}

/// Objects coming out of a floor portal after going into another floor portal would end up
/// upside down, roll those back around their forward axis.
fn keep_upright(rotation: Quat) -> Quat {
    const INVERTED: f32 = -0.999;
    if rotation.mul_vec3(Vec3::Y).y < INVERTED {
        (rotation * Quat::from_rotation_z(std::f32::consts::PI)).normalize()
    } else {
        rotation
    }
}

/// Tracks which portal every object inside a trigger volume is currently going through.
#[derive(Debug, Default, Clone)]
pub struct PortalableRegistry {
    transits: HashMap<Entity, Transit>,
}

impl PortalableRegistry {
    pub fn transit(&self, object: Entity) -> Option<Transit> {
        self.transits.get(&object).copied()
    }

    pub fn enter(&mut self, object: Entity, portal: PortalId) {
        self.transits.insert(object, Transit::through(portal));
    }

    /// The object left the trigger of `portal`. If it is still inside the other portal's trigger,
    /// it is now going through that one.
    pub fn leave(&mut self, object: Entity, portal: PortalId, inside_other: bool) {
        if let Some(transit) = self.transits.get(&object).copied() {
            if transit.entry != portal {
                return;
            }
            if inside_other {
                self.transits.insert(object, transit.swapped());
            } else {
                self.transits.remove(&object);
            }
        }
    }

    /// Swap entry and exit after a warp, so going back through the exit portal takes the object
    /// back.
    pub fn swap(&mut self, object: Entity) -> Option<Transit> {
        let transit = self.transits.get_mut(&object)?;
        *transit = transit.swapped();
        Some(*transit)
    }

    pub fn forget(&mut self, object: Entity) {
        self.transits.remove(&object);
    }
}
