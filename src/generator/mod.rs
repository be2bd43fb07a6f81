//! Procedural rock generation: configuration and the per-frame driver

pub mod config;
pub mod rock_generator;

pub use config::{BakeSettings, FieldParameters, RenderFlags, RockConfig};
pub use rock_generator::{RockGenerator, TriangleSnapshot};
