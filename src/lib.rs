//! Rockforge - GPU procedural rock generator
//!
//! A density field is synthesised into a 3D texture, triangulated on the
//! GPU into an append buffer and drawn with an indirect draw. On request the
//! live surface is read back and baked into mesh, material and prefab assets.

pub mod bake;
pub mod core;
pub mod generator;
pub mod render;
