//! Fitting a portal frame on level geometry.
//!
//! A shot rarely lands where a whole frame fits: the frame may hang over the edge of a ledge or
//! cut into a perpendicular wall. The candidate pose is nudged once by each correction pass, then
//! validated. Nothing is committed here, see [`super::PortalPair::try_place`].

use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;

use super::{config::PlacementConfig, error::PlacementError, world::SpatialQuery, Portal};
use crate::plugins::physics::PORTAL_GROUP;

impl Portal {
    /// Correct and validate a candidate pose for this portal.
    pub fn resolve_placement<W: SpatialQuery>(
        &self,
        world: &W,
        position: Vec3,
        rotation: Quat,
        config: &PlacementConfig,
    ) -> Result<Transform, PlacementError> {
        let mut candidate = Transform::from_translation(position).with_rotation(rotation);
        candidate.translation += candidate.back() * config.surface_offset;

        fix_overhangs(&mut candidate, world, self.placement_mask, config);
        fix_intersections(&mut candidate, world, self.placement_mask, config);
        check_overlap(&candidate, world, self.collider, self.placement_mask, config)?;
        Ok(candidate)
    }
}

/// Pull the frame back onto the surface when one of its edges hangs over nothing.
///
/// Each edge is probed just behind the surface. An unsupported edge casts back towards the frame
/// centre, and the frame moves by however far it had to go to meet the surface boundary. An edge
/// with something standing right in front of it ends the pass, that is for
/// [`fix_intersections`] to sort out.
pub fn fix_overhangs<W: SpatialQuery>(
    candidate: &mut Transform,
    world: &W,
    mask: Group,
    config: &PlacementConfig,
) {
    let start = candidate.translation;
    let normal = candidate.back();
    let edges = [
        candidate.left(),
        candidate.right(),
        candidate.down(),
        candidate.up(),
    ];

    for edge in edges {
        let edge_point = candidate.translation + edge * config.probe_distance;
        if world.check_sphere(
            edge_point + normal * config.probe_depth,
            config.probe_radius,
            mask,
        ) {
            debug!("Portal edge obstructed, skipping overhang correction");
            break;
        }

        let behind = edge_point - normal * config.probe_depth;
        if world.check_sphere(behind, config.probe_radius, mask) {
            continue;
        }
        if let Some(hit) = world.cast_ray(behind, -edge, config.probe_distance, mask) {
            candidate.translation += hit.point - behind;
        }
    }

    let offset = (candidate.translation - start).clamp_length_max(config.probe_distance);
    candidate.translation = start + offset;
}

/// Push the frame out of geometry cutting through it, e.g. a wall meeting the floor.
pub fn fix_intersections<W: SpatialQuery>(
    candidate: &mut Transform,
    world: &W,
    mask: Group,
    config: &PlacementConfig,
) {
    let directions = [
        candidate.right(),
        candidate.left(),
        candidate.up(),
        candidate.down(),
    ];
    for direction in directions {
        let origin = candidate.translation + candidate.back() * config.probe_depth;
        if let Some(hit) = world.cast_ray(origin, direction, config.probe_distance, mask) {
            candidate.translation -= direction * (config.probe_distance - hit.distance);
        }
    }
}

/// The frame must be clear of everything but the portal's own previous placement, and rest on a
/// continuous surface at its centre and corners.
pub fn check_overlap<W: SpatialQuery>(
    candidate: &Transform,
    world: &W,
    own_collider: Entity,
    mask: Group,
    config: &PlacementConfig,
) -> Result<(), PlacementError> {
    let center = candidate.translation + candidate.back() * config.probe_depth;

    let overlapping = world.overlap_box(
        center,
        Vec3::from(config.overlap_half_extents),
        candidate.rotation,
        mask | PORTAL_GROUP,
    );
    match overlapping.as_slice() {
        [] => {}
        [only] if *only == own_collider => {}
        others => {
            return Err(PlacementError::Obstructed {
                colliders: others.len(),
            })
        }
    }

    let c = config.corner_offset;
    let probes = [
        Vec3::ZERO,
        Vec3::new(-c, -c, 0.),
        Vec3::new(-c, c, 0.),
        Vec3::new(c, -c, 0.),
        Vec3::new(c, c, 0.),
    ];
    let through = candidate.forward() * config.probe_depth * 2.;
    for (probe, local) in probes.into_iter().enumerate() {
        let start = center + candidate.rotation * local;
        if !world.linecast(start, start + through, mask) {
            return Err(PlacementError::Unsupported { probe });
        }
    }
    Ok(())
}
