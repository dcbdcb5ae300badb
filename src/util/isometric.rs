//! The camera looks at the level from a corner, so "up" on the screen is diagonal in the world.

use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;

/// Rotation from screen-aligned directions to world directions.
pub fn isometric_rotation() -> Quat {
    Quat::from_rotation_y(FRAC_PI_4)
}

/// Skew a screen-aligned direction (-Z being up on the screen) to the isometric view.
pub fn to_isometric(direction: Vec3) -> Vec3 {
    isometric_rotation() * direction
}

/// Unit movement direction from the four directional inputs, before skewing. Diagonals are not
/// faster than straight lines.
pub fn movement_input(forward: bool, back: bool, left: bool, right: bool) -> Vec3 {
    let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
    Vec3::new(axis(right, left), 0., axis(back, forward)).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_1_SQRT_2;

    use super::*;

    #[test]
    fn screen_up_is_diagonal() {
        let up = to_isometric(Vec3::NEG_Z);
        assert!(up.abs_diff_eq(Vec3::new(-FRAC_1_SQRT_2, 0., -FRAC_1_SQRT_2), 1e-5));
    }

    #[test]
    fn skew_keeps_length_and_height() {
        let v = Vec3::new(3., 2., -1.);
        let skewed = to_isometric(v);
        assert!((skewed.length() - v.length()).abs() < 1e-5);
        assert!((skewed.y - v.y).abs() < 1e-5);
    }

    #[test]
    fn opposite_inputs_cancel_out() {
        assert_eq!(movement_input(true, true, false, false), Vec3::ZERO);
        assert_eq!(movement_input(false, false, true, true), Vec3::ZERO);
        assert_eq!(movement_input(true, false, false, false), Vec3::NEG_Z);
    }

    #[test]
    fn diagonal_input_is_unit_length() {
        let diagonal = movement_input(true, false, false, true);
        assert!((diagonal.length() - 1.).abs() < 1e-5);
        assert!(diagonal.x > 0. && diagonal.z < 0.);
    }
}
