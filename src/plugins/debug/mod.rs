//! Development helpers, only built with the `devel` feature.

use bevy::prelude::*;
use bevy_prototype_debug_lines::{DebugLines, DebugLinesPlugin};

use super::portal::{PortalAim, PortalLabels};

#[derive(Debug)]
pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugin(DebugLinesPlugin::default())
            .add_system(draw_aim_ray.after(PortalLabels::Aim));
    }
}

/// Line from the player to the point a portal would be fired at.
fn draw_aim_ray(aim: Res<PortalAim>, mut lines: ResMut<DebugLines>) {
    if let Some(target) = aim.target {
        lines.line_colored(aim.origin, target, 0., Color::RED);
    }
}
