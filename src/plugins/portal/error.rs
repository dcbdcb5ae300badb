use std::fmt;

use bevy::prelude::Entity;

/// Why a candidate portal pose was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// The frame volume intersects geometry other than the portal itself.
    Obstructed { colliders: usize },
    /// A frame corner (or the centre, index 0) does not rest on a surface.
    Unsupported { probe: usize },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::Obstructed { colliders } => {
                write!(f, "portal frame overlaps {} collider(s)", colliders)
            }
            PlacementError::Unsupported { probe } => {
                write!(f, "portal frame probe {} is not on a surface", probe)
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// Outcome of a fire action which did not produce a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireError {
    /// Nothing was hit within range.
    NoSurface,
    /// The shot landed on a portal.
    HitPortal(Entity),
    /// The surface is not tagged as accepting portals.
    UntaggedSurface(Entity),
    /// Only horizontal surfaces are accepted.
    NotHorizontal(Entity),
    Placement(PlacementError),
}

impl fmt::Display for FireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireError::NoSurface => write!(f, "no surface in range"),
            FireError::HitPortal(entity) => write!(f, "surface {:?} is a portal", entity),
            FireError::UntaggedSurface(entity) => {
                write!(f, "surface {:?} does not accept portals", entity)
            }
            FireError::NotHorizontal(entity) => {
                write!(f, "surface {:?} is not horizontal", entity)
            }
            FireError::Placement(err) => write!(f, "placement rejected: {}", err),
        }
    }
}

impl std::error::Error for FireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FireError::Placement(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlacementError> for FireError {
    fn from(err: PlacementError) -> Self {
        FireError::Placement(err)
    }
}
