//! Scene configuration.
//!
//! Every constant the demo is built from lives in [`DemoConfig`]. The config is
//! handed to the scene constructor explicitly; runtime changes (bloom settings,
//! clear colour) go through `Out::Configure` on the [`Context`](crate::context::Context).

use cgmath::Deg;

use crate::post::BloomSettings;

/// Relative paths (below the asset root) of the files the scene loads.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPaths {
    pub normal_map: String,
    pub background: String,
    pub environment: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            normal_map: "textures/normal.jpg".to_string(),
            background: "textures/color.jpg".to_string(),
            environment: "textures/empty_warehouse_01_4k.hdr".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

/// Limits for the orbit controller.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Largest angle (radians) between the up axis and the camera offset.
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 10.0,
            max_polar_angle: std::f32::consts::FRAC_PI_2,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub colour: u32,
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 5.0, 10.0],
            colour: 0xfff0dd,
            intensity: 1.0,
        }
    }
}

/// Optical parameters shared by the two glass bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct GlassConfig {
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            metalness: 0.0,
            roughness: 0.15,
            transmission: 1.0,
            thickness: 0.5,
            ior: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    pub assets: AssetPaths,
    /// Scene background as a 0xRRGGBB sRGB value.
    pub background_colour: u32,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub light: LightConfig,
    pub glass: GlassConfig,
    pub bloom: BloomSettings,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            background_colour: 0x808080,
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            light: LightConfig::default(),
            glass: GlassConfig::default(),
            bloom: BloomSettings::default(),
        }
    }
}

fn srgb_channel_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

/// Split a 0xRRGGBB value into linear RGB, the space all shading happens in.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_channel_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

/// The clear colour for a 0xRRGGBB background.
pub fn clear_colour(hex: u32) -> wgpu::Color {
    let [r, g, b] = hex_to_linear(hex);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_scene_setup() {
        let config = DemoConfig::default();
        assert_eq!(config.background_colour, 0x808080);
        assert_eq!(config.camera.position, [0.0, 0.0, 3.0]);
        assert_eq!(config.camera.fovy, Deg(75.0));
        assert_eq!(config.light.colour, 0xfff0dd);
        assert_eq!(config.orbit.min_distance, 1.0);
        assert_eq!(config.orbit.max_distance, 10.0);
        assert_eq!(config.assets.environment, "textures/empty_warehouse_01_4k.hdr");
    }

    #[test]
    fn hex_to_linear_handles_extremes() {
        assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
        let white = hex_to_linear(0xffffff);
        for c in white {
            assert!((c - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn mid_grey_is_darker_in_linear_space() {
        let [r, g, b] = hex_to_linear(0x808080);
        assert!((r - 0.2158605).abs() < 1e-4, "got {r}");
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn channels_are_read_in_rgb_order() {
        let [r, g, b] = hex_to_linear(0xff0000);
        assert!(r > 0.99);
        assert_eq!(g, 0.0);
        assert_eq!(b, 0.0);
    }
}
