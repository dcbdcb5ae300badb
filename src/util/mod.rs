pub mod isometric;
pub mod scenes;
