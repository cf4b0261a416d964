//! Final pass: ACES filmic tone mapping of the HDR scene into the surface.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{self, Texture},
    pipelines::mk_fullscreen_pipeline,
    post::{BloomSettings, fullscreen_shader},
    resources::texture::{post_pass_bind_group, post_pass_layout},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OutputUniform {
    pub exposure: f32,
    /// Set when the target format stores raw values, so the shader applies
    /// the sRGB transfer function itself.
    pub encode_srgb: u32,
    _padding: [u32; 2],
}

impl OutputUniform {
    pub fn new(exposure: f32, target_format: wgpu::TextureFormat) -> Self {
        Self {
            exposure,
            encode_srgb: u32::from(!target_format.is_srgb()),
            _padding: [0; 2],
        }
    }
}

#[derive(Debug)]
pub struct OutputPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    target_format: wgpu::TextureFormat,
    uniform: OutputUniform,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl OutputPass {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat, scene: &Texture) -> Self {
        let layout = post_pass_layout(device, "output_bind_group_layout");
        let pipeline = mk_fullscreen_pipeline(
            device,
            &layout,
            target_format,
            Some(wgpu::BlendState::REPLACE),
            fullscreen_shader("Output", include_str!("output.wgsl")),
        );
        let uniform = OutputUniform::new(BloomSettings::default().exposure, target_format);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Output Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = texture::create_clamped_sampler(device);
        let bind_group =
            post_pass_bind_group(device, &layout, &buffer, scene, &sampler, "output_bind_group");
        Self {
            pipeline,
            layout,
            sampler,
            target_format,
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, scene: &Texture) {
        self.bind_group = post_pass_bind_group(
            device,
            &self.layout,
            &self.buffer,
            scene,
            &self.sampler,
            "output_bind_group",
        );
    }

    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &BloomSettings,
        target: &wgpu::TextureView,
    ) {
        let uniform = OutputUniform::new(settings.exposure, self.target_format);
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("output"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_targets_encode_in_hardware() {
        let uniform = OutputUniform::new(1.0, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(uniform.encode_srgb, 0);
        let uniform = OutputUniform::new(1.0, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(uniform.encode_srgb, 1);
    }

    #[test]
    fn uniform_is_one_row() {
        assert_eq!(std::mem::size_of::<OutputUniform>(), 16);
    }
}
