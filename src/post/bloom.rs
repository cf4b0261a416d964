//! Unreal-style bloom.
//!
//! 1. High-pass: pixels above the luminance threshold are copied into a half
//!    resolution target, everything else becomes black.
//! 2. Blur: five levels, each a separable Gaussian (horizontal, then
//!    vertical) on half the resolution of the level before.
//! 3. Composite: the weighted sum of all levels is added onto the scene
//!    target.

use crate::{
    data_structures::texture::{self, Texture},
    pipelines::mk_fullscreen_pipeline,
    post::{
        BLOOM_MIPS, BloomSettings, KERNEL_RADII, SMOOTH_WIDTH, composite_weights,
        fullscreen_shader, gaussian_coefficients, mip_sizes,
    },
    resources::texture::{composite_layout, post_pass_bind_group, post_pass_layout},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HighPassUniform {
    pub threshold: f32,
    pub smooth_width: f32,
    _padding: [f32; 2],
}

impl From<&BloomSettings> for HighPassUniform {
    fn from(settings: &BloomSettings) -> Self {
        Self {
            threshold: settings.threshold,
            smooth_width: SMOOTH_WIDTH,
            _padding: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniform {
    pub inv_size: [f32; 2],
    pub direction: [f32; 2],
    pub kernel_radius: u32,
    _padding: [u32; 3],
    pub coefficients: [[f32; 4]; 3],
}

impl BlurUniform {
    pub fn new(size: (u32, u32), direction: [f32; 2], kernel_radius: u32) -> Self {
        let mut coefficients = [[0.0; 4]; 3];
        for (i, c) in gaussian_coefficients(kernel_radius).into_iter().enumerate() {
            coefficients[i / 4][i % 4] = c;
        }
        Self {
            inv_size: [1.0 / size.0.max(1) as f32, 1.0 / size.1.max(1) as f32],
            direction,
            kernel_radius,
            _padding: [0; 3],
            coefficients,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniform {
    /// Weights of levels 0..=3, then level 4 in the x of the second row.
    pub weights: [[f32; 4]; 2],
}

impl From<&BloomSettings> for CompositeUniform {
    fn from(settings: &BloomSettings) -> Self {
        let w = composite_weights(settings);
        Self {
            weights: [[w[0], w[1], w[2], w[3]], [w[4], 0.0, 0.0, 0.0]],
        }
    }
}

const HORIZONTAL: [f32; 2] = [1.0, 0.0];
const VERTICAL: [f32; 2] = [0.0, 1.0];

/// Uniform buffers of every sub-pass. Their size never changes.
#[derive(Debug)]
struct Uniforms {
    highpass: wgpu::Buffer,
    horizontal: Vec<wgpu::Buffer>,
    vertical: Vec<wgpu::Buffer>,
    composite: wgpu::Buffer,
}

impl Uniforms {
    fn new(device: &wgpu::Device) -> Self {
        let buffer = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let blur_size = std::mem::size_of::<BlurUniform>();
        Self {
            highpass: buffer("bloom_highpass", std::mem::size_of::<HighPassUniform>()),
            horizontal: (0..BLOOM_MIPS)
                .map(|level| buffer(&format!("bloom_blur_h{level}"), blur_size))
                .collect(),
            vertical: (0..BLOOM_MIPS)
                .map(|level| buffer(&format!("bloom_blur_v{level}"), blur_size))
                .collect(),
            composite: buffer("bloom_composite", std::mem::size_of::<CompositeUniform>()),
        }
    }
}

/// The size dependent half of the pass: its targets and their bind groups.
#[derive(Debug)]
struct Chain {
    sizes: [(u32, u32); BLOOM_MIPS],
    bright: Texture,
    horizontal: Vec<Texture>,
    vertical: Vec<Texture>,
    highpass_bind_group: wgpu::BindGroup,
    horizontal_bind_groups: Vec<wgpu::BindGroup>,
    vertical_bind_groups: Vec<wgpu::BindGroup>,
    composite_bind_group: wgpu::BindGroup,
}

impl Chain {
    fn new(
        device: &wgpu::Device,
        layouts: (&wgpu::BindGroupLayout, &wgpu::BindGroupLayout),
        sampler: &wgpu::Sampler,
        uniforms: &Uniforms,
        scene: &Texture,
        (width, height): (u32, u32),
    ) -> Self {
        let (pass_layout, composite_layout) = layouts;
        let sizes = mip_sizes(width, height);
        log::trace!("Bloom levels: {sizes:?}");
        let target = |size: (u32, u32), label: &str| {
            Texture::create_render_target(
                device,
                [size.0, size.1],
                Texture::HDR_FORMAT,
                wgpu::TextureUsages::empty(),
                label,
            )
        };
        let bright = target(sizes[0], "bloom_bright");
        let horizontal: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| target(*size, &format!("bloom_h{i}")))
            .collect();
        let vertical: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| target(*size, &format!("bloom_v{i}")))
            .collect();

        let highpass_bind_group = post_pass_bind_group(
            device,
            pass_layout,
            &uniforms.highpass,
            scene,
            sampler,
            "bloom_highpass_bind_group",
        );
        let horizontal_bind_groups = (0..BLOOM_MIPS)
            .map(|level| {
                // Level 0 blurs the high-pass output, every other level the
                // finished level above it.
                let input = if level == 0 {
                    &bright
                } else {
                    &vertical[level - 1]
                };
                post_pass_bind_group(
                    device,
                    pass_layout,
                    &uniforms.horizontal[level],
                    input,
                    sampler,
                    "bloom_blur_h_bind_group",
                )
            })
            .collect();
        let vertical_bind_groups = (0..BLOOM_MIPS)
            .map(|level| {
                post_pass_bind_group(
                    device,
                    pass_layout,
                    &uniforms.vertical[level],
                    &horizontal[level],
                    sampler,
                    "bloom_blur_v_bind_group",
                )
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.composite.as_entire_binding(),
        }];
        entries.extend(vertical.iter().enumerate().map(|(i, level)| {
            wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(&level.view),
            }
        }));
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + BLOOM_MIPS as u32,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: composite_layout,
            entries: &entries,
            label: Some("bloom_composite_bind_group"),
        });

        Self {
            sizes,
            bright,
            horizontal,
            vertical,
            highpass_bind_group,
            horizontal_bind_groups,
            vertical_bind_groups,
            composite_bind_group,
        }
    }
}

#[derive(Debug)]
pub struct BloomPass {
    highpass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    pass_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: Uniforms,
    chain: Chain,
    /// What the uniform buffers currently hold; `None` forces a rewrite.
    written_settings: Option<BloomSettings>,
    written_sizes: Option<[(u32, u32); BLOOM_MIPS]>,
}

impl BloomPass {
    pub fn new(device: &wgpu::Device, scene: &Texture, width: u32, height: u32) -> Self {
        let pass_layout = post_pass_layout(device, "bloom_pass_bind_group_layout");
        let composite_layout = composite_layout(device, BLOOM_MIPS as u32);

        let highpass_pipeline = mk_fullscreen_pipeline(
            device,
            &pass_layout,
            Texture::HDR_FORMAT,
            Some(wgpu::BlendState::REPLACE),
            fullscreen_shader("Bloom High Pass", include_str!("highpass.wgsl")),
        );
        let blur_pipeline = mk_fullscreen_pipeline(
            device,
            &pass_layout,
            Texture::HDR_FORMAT,
            Some(wgpu::BlendState::REPLACE),
            fullscreen_shader("Bloom Blur", include_str!("blur.wgsl")),
        );
        // Added onto the scene; the scene's alpha stays untouched.
        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        let composite_pipeline = mk_fullscreen_pipeline(
            device,
            &composite_layout,
            Texture::HDR_FORMAT,
            Some(additive),
            fullscreen_shader("Bloom Composite", include_str!("composite.wgsl")),
        );

        let sampler = texture::create_clamped_sampler(device);
        let uniforms = Uniforms::new(device);
        let chain = Chain::new(
            device,
            (&pass_layout, &composite_layout),
            &sampler,
            &uniforms,
            scene,
            (width, height),
        );

        Self {
            highpass_pipeline,
            blur_pipeline,
            composite_pipeline,
            pass_layout,
            composite_layout,
            sampler,
            uniforms,
            chain,
            written_settings: None,
            written_sizes: None,
        }
    }

    /// Rebuild the level targets for a new scene target.
    pub fn resize(&mut self, device: &wgpu::Device, scene: &Texture, width: u32, height: u32) {
        self.chain = Chain::new(
            device,
            (&self.pass_layout, &self.composite_layout),
            &self.sampler,
            &self.uniforms,
            scene,
            (width, height),
        );
    }

    /// Sizes of the five blurred levels.
    pub fn level_sizes(&self) -> [(u32, u32); BLOOM_MIPS] {
        self.chain.sizes
    }

    fn write_uniforms(&mut self, queue: &wgpu::Queue, settings: &BloomSettings) {
        if self.written_sizes != Some(self.chain.sizes) {
            for (level, size) in self.chain.sizes.iter().enumerate() {
                let radius = KERNEL_RADII[level];
                queue.write_buffer(
                    &self.uniforms.horizontal[level],
                    0,
                    bytemuck::cast_slice(&[BlurUniform::new(*size, HORIZONTAL, radius)]),
                );
                queue.write_buffer(
                    &self.uniforms.vertical[level],
                    0,
                    bytemuck::cast_slice(&[BlurUniform::new(*size, VERTICAL, radius)]),
                );
            }
            self.written_sizes = Some(self.chain.sizes);
        }
        if self.written_settings.as_ref() != Some(settings) {
            queue.write_buffer(
                &self.uniforms.highpass,
                0,
                bytemuck::cast_slice(&[HighPassUniform::from(settings)]),
            );
            queue.write_buffer(
                &self.uniforms.composite,
                0,
                bytemuck::cast_slice(&[CompositeUniform::from(settings)]),
            );
            self.written_settings = Some(settings.clone());
        }
    }

    /// Record all bloom passes. Reads the scene target bound at the last
    /// [`resize`](Self::resize) and adds the glow back onto `scene_view`.
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &BloomSettings,
        scene_view: &wgpu::TextureView,
    ) {
        self.write_uniforms(queue, settings);
        let chain = &self.chain;

        run_pass(
            encoder,
            &self.highpass_pipeline,
            &chain.highpass_bind_group,
            &chain.bright.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "bloom_highpass",
        );
        for level in 0..BLOOM_MIPS {
            run_pass(
                encoder,
                &self.blur_pipeline,
                &chain.horizontal_bind_groups[level],
                &chain.horizontal[level].view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "bloom_blur_h",
            );
            run_pass(
                encoder,
                &self.blur_pipeline,
                &chain.vertical_bind_groups[level],
                &chain.vertical[level].view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "bloom_blur_v",
            );
        }
        run_pass(
            encoder,
            &self.composite_pipeline,
            &chain.composite_bind_group,
            scene_view,
            wgpu::LoadOp::Load,
            "bloom_composite",
        );
    }
}

fn run_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    label: &str,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<HighPassUniform>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 80);
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 32);
    }

    #[test]
    fn blur_uniform_packs_coefficients_row_major() {
        let uniform = BlurUniform::new((480, 270), HORIZONTAL, 11);
        let expected = gaussian_coefficients(11);
        assert_eq!(uniform.coefficients[0][0], expected[0]);
        assert_eq!(uniform.coefficients[1][2], expected[6]);
        assert_eq!(uniform.coefficients[2][2], expected[10]);
        assert_eq!(uniform.inv_size, [1.0 / 480.0, 1.0 / 270.0]);
        assert_eq!(uniform.kernel_radius, 11);
    }

    #[test]
    fn composite_uniform_carries_all_five_weights() {
        let settings = BloomSettings::default();
        let uniform = CompositeUniform::from(&settings);
        let weights = composite_weights(&settings);
        assert_eq!(uniform.weights[0], [weights[0], weights[1], weights[2], weights[3]]);
        assert_eq!(uniform.weights[1][0], weights[4]);
    }

    #[test]
    fn highpass_follows_threshold() {
        let settings = BloomSettings {
            threshold: 0.25,
            ..Default::default()
        };
        let uniform = HighPassUniform::from(&settings);
        assert_eq!(uniform.threshold, 0.25);
        assert_eq!(uniform.smooth_width, SMOOTH_WIDTH);
    }
}
