use std::{fmt, fs, io, path::Path};

use bevy::prelude::*;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "assets/portal_config.json";

/// Tunables of the portal system. Every field can be omitted from the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub placement: PlacementConfig,
    pub aim: AimPolicy,
    /// How far along the entry portal's up axis objects are re-anchored before a warp.
    pub warp_anchor_offset: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            placement: PlacementConfig::default(),
            aim: AimPolicy::default(),
            warp_anchor_offset: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Half size of the portal quad, also used for its trigger volume.
    pub frame_half_extent: f32,
    /// Depth of the trigger volume on each side of the portal plane.
    pub trigger_depth: f32,
    /// Distance of the edge probes from the frame centre, and the length of correction rays.
    pub probe_distance: f32,
    /// How far in front of / behind the surface the probes sit.
    pub probe_depth: f32,
    pub probe_radius: f32,
    /// Offset along the surface normal to prevent Z fighting.
    pub surface_offset: f32,
    pub overlap_half_extents: [f32; 3],
    /// Distance of the corner line traces from the frame centre, on both in-plane axes.
    pub corner_offset: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            frame_half_extent: 0.5,
            trigger_depth: 0.3,
            probe_distance: 0.44,
            probe_depth: 0.1,
            probe_radius: 0.02,
            surface_offset: 0.001,
            overlap_half_extents: [0.36, 0.36, 0.05],
            corner_offset: 0.4,
        }
    }
}

/// Which surfaces the portal gun accepts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AimPolicy {
    pub max_distance: f32,
    /// Only accept surfaces tagged with `PortalSurface`.
    pub require_tagged_surface: bool,
    /// Only accept floors and ceilings.
    pub horizontal_only: bool,
    /// Minimum `|normal.y|` for a surface to count as horizontal.
    pub horizontal_threshold: f32,
}

impl Default for AimPolicy {
    fn default() -> Self {
        AimPolicy {
            max_distance: 100.,
            require_tagged_surface: false,
            horizontal_only: false,
            horizontal_threshold: 0.99,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot read portal config: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid portal config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl PortalConfig {
    pub fn from_json_str(json: &str) -> Result<PortalConfig, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<PortalConfig, ConfigError> {
        let json = fs::read_to_string(path)?;
        PortalConfig::from_json_str(&json)
    }

    /// Load the config file if there is one, falling back to the defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> PortalConfig {
        let path = path.as_ref();
        match PortalConfig::load(path) {
            Ok(config) => {
                info!("Loaded portal config from {}", path.display());
                config
            }
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No portal config at {}, using defaults", path.display());
                PortalConfig::default()
            }
            Err(err) => {
                warn!("{}, using defaults", err);
                PortalConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = PortalConfig::from_json_str(
            r#"{ "aim": { "horizontal_only": true }, "placement": { "probe_distance": 0.3 } }"#,
        )
        .unwrap();
        assert!(config.aim.horizontal_only);
        assert_eq!(config.aim.max_distance, 100.);
        assert_eq!(config.placement.probe_distance, 0.3);
        assert_eq!(config.placement.overlap_half_extents, [0.36, 0.36, 0.05]);
        assert_eq!(config.warp_anchor_offset, 0.01);
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let err = PortalConfig::from_json_str(r#"{ "aim": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = PortalConfig::load_or_default("does/not/exist.json");
        assert_eq!(config, PortalConfig::default());
    }
}
