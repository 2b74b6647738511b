//! The cake: loading, normalization and the triangle surface decorations rest on.

pub mod hierarchy;
pub mod mesh;
pub mod plugin;

pub use plugin::{SurfacePlugin, SurfaceReady};
