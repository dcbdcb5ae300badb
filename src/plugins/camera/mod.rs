use bevy::prelude::*;

use super::player::{Player, PlayerLabels};

#[derive(Debug)]
pub struct FollowCameraPlugin;

impl Plugin for FollowCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_system(follow_player.after(PlayerLabels::ResetOrientation));
    }
}

/// Camera keeping the same view of the level, only moving up and down with the player.
#[derive(Debug, Clone, Component)]
pub struct FollowCamera {
    pub height_offset: f32,
    /// The camera stays put while the player is outside of `min_height..max_height`, e.g.
    /// falling off the level.
    pub min_height: f32,
    pub max_height: f32,
    /// Time to close most of the gap to the target height, in seconds.
    pub smoothing: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        FollowCamera {
            height_offset: 10.,
            min_height: -10.,
            max_height: 10.,
            smoothing: 0.1,
        }
    }
}

impl FollowCamera {
    pub fn target_height(&self, player_height: f32) -> Option<f32> {
        (self.min_height..self.max_height)
            .contains(&player_height)
            .then(|| player_height + self.height_offset)
    }

    /// Move from `current` towards `target` over a frame lasting `delta_seconds`.
    pub fn approach(&self, current: f32, target: f32, delta_seconds: f32) -> f32 {
        if self.smoothing <= 0. {
            return target;
        }
        let t = (delta_seconds / self.smoothing).min(1.);
        current + (target - current) * t
    }
}

fn follow_player(
    time: Res<Time>,
    players: Query<&Transform, (With<Player>, Without<FollowCamera>)>,
    mut cameras: Query<(&FollowCamera, &mut Transform)>,
) {
    let Ok(player) = players.get_single() else {
        return;
    };
    for (camera, mut transform) in &mut cameras {
        if let Some(target) = camera.target_height(player.translation.y) {
            transform.translation.y =
                camera.approach(transform.translation.y, target, time.delta_seconds());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_only_inside_the_height_band() {
        let camera = FollowCamera::default();
        assert_eq!(camera.target_height(2.), Some(12.));
        assert_eq!(camera.target_height(-10.), Some(0.));
        assert_eq!(camera.target_height(10.), None);
        assert_eq!(camera.target_height(-12.), None);
    }

    #[test]
    fn approach_closes_the_gap_without_overshooting() {
        let camera = FollowCamera::default();
        let halfway = camera.approach(0., 10., 0.05);
        assert!((halfway - 5.).abs() < 1e-5);
        assert_eq!(camera.approach(0., 10., 1.), 10.);
    }

    #[test]
    fn no_smoothing_snaps() {
        let camera = FollowCamera {
            smoothing: 0.,
            ..default()
        };
        assert_eq!(camera.approach(3., 7., 0.001), 7.);
    }
}
