#[cfg(feature = "devel")]
pub mod debug;

pub mod camera;
pub mod doors;
pub mod game;
pub mod input;
pub mod physics;
pub mod player;
pub mod portal;
