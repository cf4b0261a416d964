//! glass-bloom
//!
//! A cross-platform (native and WASM) demo scene on wgpu: two glass bodies in
//! front of a textured backdrop, lit by an HDR environment and drawn through a
//! bloom and tone-mapping chain that a small on-screen panel adjusts live.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controller and uniforms for view/projection
//! - `config`: every constant the scene is built from
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: engine data models (geometry, meshes, materials, instances, textures)
//! - `flow`: high level flow control (scenes / update loops)
//! - `gui`: the debug panel bound to the bloom settings
//! - `pipelines`: the render pipelines meshes and overlays are drawn with
//! - `post`: HDR targets, bloom and tone mapping
//! - `resources`: helpers to load textures and create GPU resources
//! - `render`: render composition and per-stage batching
//! - `scene`: the glass scene itself
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gui;
pub mod pipelines;
pub mod post;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{config::DemoConfig, gui::PanelFlow, scene::GlassScene};

/// Run the glass scene with its debug panel until the window closes.
pub fn run_demo(config: DemoConfig) -> anyhow::Result<()> {
    flow::run::<(), ()>(vec![
        GlassScene::constructor(config),
        PanelFlow::constructor(),
    ])
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run_demo(DemoConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
