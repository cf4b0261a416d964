//! Post-processing: the offscreen scene targets, bloom and tone mapping.
//!
//! The [`Composer`] owns everything whose size follows the surface:
//!
//! - `scene`: the HDR colour target all meshes are drawn into
//! - `transmission`: a copy of `scene` taken after the opaque meshes, sampled
//!   by transmissive materials
//! - `depth`: the depth buffer of the scene pass
//! - the bloom chain ([`bloom::BloomPass`]) and the output pass
//!   ([`output::OutputPass`]) that tone-maps `scene` into the surface
//!
//! [`Composer::set_size`] must be called with every surface resize; the
//! composer logs a warning when it is asked to draw into a target of another
//! size.

pub mod bloom;
pub mod output;

use crate::{
    data_structures::texture::{self, Texture},
    resources::texture::environment_layout,
};

/// Number of blurred levels in the bloom chain.
pub const BLOOM_MIPS: usize = 5;
/// Gaussian kernel radius per bloom level, in texels of that level.
pub const KERNEL_RADII: [u32; BLOOM_MIPS] = [3, 5, 7, 9, 11];
/// Base contribution of each bloom level before `radius` is applied.
pub const BLOOM_FACTORS: [f32; BLOOM_MIPS] = [1.0, 0.8, 0.6, 0.4, 0.2];
/// Width of the soft edge of the luminosity high-pass.
pub const SMOOTH_WIDTH: f32 = 0.01;
/// Coefficient slots in the blur uniform (three vec4 rows).
pub const MAX_KERNEL_RADIUS: usize = 12;

/// Tunable parameters of the bloom and output passes.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomSettings {
    /// Skip the bloom pass entirely when false.
    pub enabled: bool,
    /// Tone mapping exposure of the output pass.
    pub exposure: f32,
    pub strength: f32,
    /// Shifts weight from the sharp to the wide bloom levels.
    pub radius: f32,
    /// Luminance above which a pixel starts to glow.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exposure: 1.0,
            strength: 1.5,
            radius: 0.33,
            threshold: 0.9,
        }
    }
}

/// Per-level weights used by the bloom composite.
pub fn composite_weights(settings: &BloomSettings) -> [f32; BLOOM_MIPS] {
    BLOOM_FACTORS.map(|f| settings.strength * lerp(f, 1.2 - f, settings.radius))
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// One-sided Gaussian weights for a blur of the given kernel radius; slot `i`
/// weights the taps `i` texels away from the centre. Unused slots are zero.
pub fn gaussian_coefficients(kernel_radius: u32) -> [f32; MAX_KERNEL_RADIUS] {
    let sigma = kernel_radius as f32;
    let mut coefficients = [0.0; MAX_KERNEL_RADIUS];
    for (i, c) in coefficients
        .iter_mut()
        .enumerate()
        .take(kernel_radius as usize)
    {
        let x = i as f32;
        *c = 0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma;
    }
    coefficients
}

/// Pixel size of each bloom level for a viewport of `width` x `height`.
///
/// Level 0 is half the viewport (rounded), every further level half of the
/// previous one. No level is ever smaller than one pixel.
pub fn mip_sizes(width: u32, height: u32) -> [(u32, u32); BLOOM_MIPS] {
    let half = |v: u32| v.div_ceil(2).max(1);
    let mut size = (half(width), half(height));
    let mut sizes = [(0, 0); BLOOM_MIPS];
    for level in sizes.iter_mut() {
        *level = size;
        size = (half(size.0), half(size.1));
    }
    sizes
}

/// Owner of all size-dependent targets and of the post-processing passes.
#[derive(Debug)]
pub struct Composer {
    width: u32,
    height: u32,
    pub scene: Texture,
    pub transmission: Texture,
    pub depth: Texture,
    environment: Texture,
    environment_layout: wgpu::BindGroupLayout,
    pub environment_bind_group: wgpu::BindGroup,
    pub bloom: bloom::BloomPass,
    pub output: output::OutputPass,
}

impl Composer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let (scene, transmission, depth) = create_targets(device, width, height);
        let environment = Texture::create_default_environment(device, queue);
        let environment_layout = environment_layout(device);
        let environment_bind_group =
            create_environment_bind_group(device, &environment_layout, &environment, &transmission);
        let bloom = bloom::BloomPass::new(device, &scene, width, height);
        let output = output::OutputPass::new(device, surface_format, &scene);
        Self {
            width,
            height,
            scene,
            transmission,
            depth,
            environment,
            environment_layout,
            environment_bind_group,
            bloom,
            output,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize every target to `width` x `height`. Returns false (and does
    /// nothing) for a zero size or the current size.
    pub fn set_size(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        log::debug!("Composer resized to {width}x{height}");
        self.width = width;
        self.height = height;
        let (scene, transmission, depth) = create_targets(device, width, height);
        self.scene = scene;
        self.transmission = transmission;
        self.depth = depth;
        self.environment_bind_group = create_environment_bind_group(
            device,
            &self.environment_layout,
            &self.environment,
            &self.transmission,
        );
        self.bloom.resize(device, &self.scene, width, height);
        self.output.resize(device, &self.scene);
        true
    }

    /// Replace the equirectangular map transmissive and lit meshes reflect.
    pub fn set_environment(&mut self, device: &wgpu::Device, environment: Texture) {
        self.environment = environment;
        self.environment_bind_group = create_environment_bind_group(
            device,
            &self.environment_layout,
            &self.environment,
            &self.transmission,
        );
    }

    /// Begin a pass drawing meshes into the scene target. `clear` clears
    /// colour and depth; `None` continues on top of what is there.
    pub fn scene_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: Option<wgpu::Color>,
        label: &str,
    ) -> wgpu::RenderPass<'e> {
        let (load, depth_load) = match clear {
            Some(colour) => (wgpu::LoadOp::Clear(colour), wgpu::LoadOp::Clear(1.0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.scene.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        })
    }

    /// Snapshot the scene target for transmissive materials.
    pub fn capture_transmission(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_texture(
            self.scene.texture.as_image_copy(),
            self.transmission.texture.as_image_copy(),
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Run bloom (unless disabled) and tone-map the result into `target`.
    pub fn post_process(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &BloomSettings,
        target: &wgpu::TextureView,
        target_size: (u32, u32),
    ) {
        if target_size != (self.width, self.height) {
            log::warn!(
                "Composer is {}x{} but draws into a {}x{} target; was set_size skipped?",
                self.width,
                self.height,
                target_size.0,
                target_size.1
            );
        }
        if settings.enabled {
            self.bloom.render(queue, encoder, settings, &self.scene.view);
        }
        self.output.render(queue, encoder, settings, target);
    }
}

fn create_targets(device: &wgpu::Device, width: u32, height: u32) -> (Texture, Texture, Texture) {
    let scene = Texture::create_render_target(
        device,
        [width, height],
        Texture::HDR_FORMAT,
        wgpu::TextureUsages::COPY_SRC,
        "scene_target",
    );
    let transmission = Texture::create_render_target(
        device,
        [width, height],
        Texture::HDR_FORMAT,
        wgpu::TextureUsages::COPY_DST,
        "transmission_target",
    );
    let depth = Texture::create_depth_texture(device, [width, height], "depth_texture");
    (scene, transmission, depth)
}

fn create_environment_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    environment: &Texture,
    transmission: &Texture,
) -> wgpu::BindGroup {
    let environment_sampler = texture::create_non_filtering_sampler(device);
    let transmission_sampler = texture::create_clamped_sampler(device);
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&environment.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&environment_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&transmission.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&transmission_sampler),
            },
        ],
        label: Some("environment_bind_group"),
    })
}

/// Prepend the shared fullscreen-triangle vertex stage to a pass shader.
pub(crate) fn fullscreen_shader(
    label: &'static str,
    fragment: &str,
) -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(
            format!("{}\n{}", include_str!("fullscreen.wgsl"), fragment).into(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = BloomSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.exposure, 1.0);
        assert_eq!(settings.strength, 1.5);
        assert_eq!(settings.radius, 0.33);
        assert_eq!(settings.threshold, 0.9);
    }

    #[test]
    fn radius_zero_uses_plain_factors() {
        let settings = BloomSettings {
            strength: 1.0,
            radius: 0.0,
            ..Default::default()
        };
        assert_eq!(composite_weights(&settings), BLOOM_FACTORS);
    }

    #[test]
    fn radius_one_mirrors_factors() {
        let settings = BloomSettings {
            strength: 2.0,
            radius: 1.0,
            ..Default::default()
        };
        let weights = composite_weights(&settings);
        for (w, f) in weights.iter().zip(BLOOM_FACTORS) {
            assert!((w - 2.0 * (1.2 - f)).abs() < 1e-6);
        }
        // The widest level now dominates.
        assert!(weights[4] > weights[0]);
    }

    #[test]
    fn zero_strength_disables_glow() {
        let settings = BloomSettings {
            strength: 0.0,
            ..Default::default()
        };
        assert!(composite_weights(&settings).iter().all(|w| *w == 0.0));
    }

    #[test]
    fn gaussian_coefficients_decrease_and_stop_at_radius() {
        let c = gaussian_coefficients(3);
        assert!((c[0] - 0.39894 / 3.0).abs() < 1e-6);
        assert!(c[0] > c[1] && c[1] > c[2] && c[2] > 0.0);
        assert!(c[3..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn widest_kernel_fits_the_uniform() {
        let c = gaussian_coefficients(KERNEL_RADII[BLOOM_MIPS - 1]);
        assert!(c[10] > 0.0);
        assert_eq!(c[11], 0.0);
    }

    #[test]
    fn mip_chain_halves_with_rounding() {
        assert_eq!(
            mip_sizes(1920, 1080),
            [(960, 540), (480, 270), (240, 135), (120, 68), (60, 34)]
        );
        assert_eq!(mip_sizes(801, 601)[0], (401, 301));
    }

    #[test]
    fn tiny_viewports_keep_one_pixel_levels() {
        assert!(mip_sizes(1, 1).iter().all(|s| *s == (1, 1)));
        assert_eq!(mip_sizes(0, 0)[0], (1, 1));
    }
}
