use wgpu::util::DeviceExt;

use crate::{
    config::{LightConfig, hex_to_linear},
    resources::texture::uniform_layout,
};

/// The single directional light of the scene and its GPU binding.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Direction towards the light; the light itself sits infinitely far away.
    pub position: [f32; 3],
    pub intensity: f32,
    pub colour: [f32; 3],
    // Uniforms are laid out in 16 byte rows
    _padding: u32,
}

impl From<&LightConfig> for LightUniform {
    fn from(config: &LightConfig) -> Self {
        Self {
            position: config.position,
            intensity: config.intensity,
            colour: hex_to_linear(config.colour),
            _padding: 0,
        }
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &LightConfig) -> Self {
        let uniform = LightUniform::from(config);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = uniform_layout(device, "light_bind_group_layout");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn set(&mut self, queue: &wgpu::Queue, config: &LightConfig) {
        self.uniform = LightUniform::from(config);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_two_rows() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
    }

    #[test]
    fn warm_white_is_converted_to_linear() {
        let uniform = LightUniform::from(&LightConfig::default());
        assert_eq!(uniform.position, [0.0, 5.0, 10.0]);
        assert_eq!(uniform.intensity, 1.0);
        assert!((uniform.colour[0] - 1.0).abs() < 1e-5);
        assert!(uniform.colour[1] < uniform.colour[0]);
        assert!(uniform.colour[2] < uniform.colour[1]);
    }
}
