use bevy::{prelude::*, window::CursorGrabMode};
use leafwing_input_manager::prelude::*;

#[derive(Debug)]
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugin(InputManagerPlugin::<Actions>::default())
            .add_startup_system(confine_on_start)
            .add_system(toggle_cursor_confinement);
    }
}

#[derive(Actionlike, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actions {
    Forward,
    Back,
    Left,
    Right,
    FirePortalA,
    FirePortalB,
}

pub fn default_input_map() -> InputMap<Actions> {
    let mut map = InputMap::default();
    map.insert(KeyCode::W, Actions::Forward)
        .insert(KeyCode::Up, Actions::Forward)
        .insert(KeyCode::S, Actions::Back)
        .insert(KeyCode::Down, Actions::Back)
        .insert(KeyCode::A, Actions::Left)
        .insert(KeyCode::Left, Actions::Left)
        .insert(KeyCode::D, Actions::Right)
        .insert(KeyCode::Right, Actions::Right)
        .insert(MouseButton::Left, Actions::FirePortalA)
        .insert(MouseButton::Right, Actions::FirePortalB);
    map
}

/// The cursor stays visible to aim with, only kept inside the window.
fn confine_on_start(mut windows: ResMut<Windows>) {
    if let Some(window) = windows.get_primary_mut() {
        window.set_cursor_grab_mode(CursorGrabMode::Confined);
    }
}

fn toggle_cursor_confinement(mut windows: ResMut<Windows>, keys: Res<Input<KeyCode>>) {
    if !keys.just_pressed(KeyCode::Tab) {
        return;
    }
    if let Some(window) = windows.get_primary_mut() {
        let mode = match window.cursor_grab_mode() {
            CursorGrabMode::None => CursorGrabMode::Confined,
            _ => CursorGrabMode::None,
        };
        debug!("Cursor grab mode: {:?}", mode);
        window.set_cursor_grab_mode(mode);
    }
}

/// World space ray under a cursor position, as `(origin, direction)`.
///
/// `cursor` is in window coordinates with the origin at the bottom left, the ray starts on the
/// near plane.
pub fn cursor_ray(
    projection: Mat4,
    camera_transform: &GlobalTransform,
    cursor: Vec2,
    window_size: Vec2,
) -> Option<(Vec3, Vec3)> {
    if window_size.x <= 0. || window_size.y <= 0. {
        return None;
    }
    let ndc = (cursor / window_size) * 2. - Vec2::ONE;
    let ndc_to_world = camera_transform.compute_matrix() * projection.inverse();
    // Reversed depth, 1 is the near plane
    let near = ndc_to_world.project_point3(ndc.extend(1.));
    let far = ndc_to_world.project_point3(ndc.extend(f32::EPSILON));
    if !(near.is_finite() && far.is_finite()) {
        return None;
    }
    let direction = (far - near).try_normalize()?;
    Some((near, direction))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use super::*;

    fn projection() -> Mat4 {
        Mat4::perspective_infinite_reverse_rh(FRAC_PI_4, 16. / 9., 0.1)
    }

    #[test]
    fn centre_of_screen_looks_forward() {
        let camera = GlobalTransform::from(
            Transform::from_xyz(1., 2., 3.).looking_at(Vec3::new(1., 2., -10.), Vec3::Y),
        );
        let size = Vec2::new(1280., 720.);
        let (origin, direction) = cursor_ray(projection(), &camera, size / 2., size).unwrap();
        assert!(direction.abs_diff_eq(Vec3::NEG_Z, 1e-3));
        assert!(origin.abs_diff_eq(Vec3::new(1., 2., 2.9), 1e-3));
    }

    #[test]
    fn bottom_left_corner_points_down_and_left() {
        let camera = GlobalTransform::IDENTITY;
        let size = Vec2::new(1280., 720.);
        let (_, direction) = cursor_ray(projection(), &camera, Vec2::ZERO, size).unwrap();
        assert!(direction.x < 0.);
        assert!(direction.y < 0.);
        assert!(direction.z < 0.);
    }

    #[test]
    fn minimised_window_has_no_ray() {
        let camera = GlobalTransform::IDENTITY;
        assert!(cursor_ray(projection(), &camera, Vec2::ZERO, Vec2::ZERO).is_none());
    }
}
