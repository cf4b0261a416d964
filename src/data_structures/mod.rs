//! Engine data structures: geometry, meshes, materials, textures and instances.
//!
//! - `geometry` builds vertex/index data for the primitive shapes
//! - `model` holds the vertex layout and GPU meshes
//! - `material` describes surfaces and owns their bind groups
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-mesh transformation data

pub mod geometry;
pub mod instance;
pub mod material;
pub mod model;
pub mod texture;
