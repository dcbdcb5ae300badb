use std::f32::consts::PI;

use bevy::prelude::*;

/// Linked portals face each other, so going through one means coming out of the other
/// turned around its vertical axis.
pub fn half_turn() -> Quat {
    Quat::from_rotation_y(PI)
}

/// Whether `point` lies past the portal plane, on the side the portal faces into the surface.
pub fn crossed_plane(portal: &Transform, point: Vec3) -> bool {
    (point - portal.translation).dot(portal.forward()) > 0.
}

/// Snap a direction to the dominant horizontal world axis, keeping its sign.
///
/// X wins ties.
pub fn snap_to_dominant_axis(direction: Vec3) -> Vec3 {
    if direction.x.abs() >= direction.z.abs() {
        if direction.x >= 0. {
            Vec3::X
        } else {
            Vec3::NEG_X
        }
    } else if direction.z >= 0. {
        Vec3::Z
    } else {
        Vec3::NEG_Z
    }
}

/// Orientation of a portal placed on a surface with the given normal, fired by someone facing
/// `firer_facing`.
///
/// The portal looks into the surface. Its right edge follows the firer's right vector, snapped to
/// a world axis so portals line up with level geometry.
pub fn portal_rotation(surface_normal: Vec3, firer_facing: Quat) -> Quat {
    const DEGENERATE_EPSILON: f32 = 1e-4;

    let forward = -surface_normal.normalize();
    let right = snap_to_dominant_axis(firer_facing.mul_vec3(Vec3::X));
    // Keep the right edge in the surface plane
    let right = right - forward * right.dot(forward);
    if right.length_squared() < DEGENERATE_EPSILON {
        let up = if forward.y.abs() > 0.999 { Vec3::Z } else { Vec3::Y };
        return Transform::IDENTITY.looking_at(forward, up).rotation;
    }
    let right = right.normalize();
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize()
}

/// Look rotation of `forward` flattened on the horizontal plane, if there is anything left of it.
pub fn upright_look_rotation(forward: Vec3) -> Option<Quat> {
    let flat = Vec3::new(forward.x, 0., forward.z);
    if flat.length() > 0.001 {
        Some(Transform::IDENTITY.looking_at(flat, Vec3::Y).rotation)
    } else {
        None
    }
}
