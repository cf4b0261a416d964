//! Surface descriptions and their bind groups.
//!
//! A material owns its parameter buffer and a bind group that also references
//! its texture. The bind group always sits in slot 0 of the pipeline that
//! draws it; see [`crate::pipelines`].

use wgpu::util::DeviceExt;

use crate::{
    config::GlassConfig,
    data_structures::texture::Texture,
    resources::texture::{basic_material_layout, physical_material_layout},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BasicMaterialUniform {
    pub colour: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PhysicalMaterialUniform {
    pub colour: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
    pub normal_scale: f32,
    _padding: [f32; 2],
}

impl From<&GlassConfig> for PhysicalMaterialUniform {
    fn from(glass: &GlassConfig) -> Self {
        Self {
            colour: [1.0; 4],
            metalness: glass.metalness,
            roughness: glass.roughness,
            transmission: glass.transmission,
            thickness: glass.thickness,
            ior: glass.ior,
            normal_scale: 1.0,
            _padding: [0.0; 2],
        }
    }
}

fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    texture: &Texture,
    fallback_sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(
                    texture.sampler.as_ref().unwrap_or(fallback_sampler),
                ),
            },
        ],
        label: Some(label),
    })
}

/// Unlit surface showing a colour map, multiplied by a tint.
#[derive(Debug)]
pub struct BasicMaterial {
    pub name: String,
    pub uniform: BasicMaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl BasicMaterial {
    pub fn new(device: &wgpu::Device, name: &str, map: &Texture) -> Self {
        let uniform = BasicMaterialUniform { colour: [1.0; 4] };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = crate::data_structures::texture::create_default_sampler(device);
        let bind_group = material_bind_group(
            device,
            &basic_material_layout(device),
            &buffer,
            map,
            &sampler,
            name,
        );
        Self {
            name: name.to_string(),
            uniform,
            buffer,
            bind_group,
        }
    }
}

/// Physically based surface: a metal/roughness model with a normal map and
/// optional transmission through a volume of the given thickness.
#[derive(Debug)]
pub struct PhysicalMaterial {
    pub name: String,
    pub uniform: PhysicalMaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl PhysicalMaterial {
    pub fn new(device: &wgpu::Device, name: &str, glass: &GlassConfig, normal_map: &Texture) -> Self {
        let uniform = PhysicalMaterialUniform::from(glass);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = crate::data_structures::texture::create_default_sampler(device);
        let bind_group = material_bind_group(
            device,
            &physical_material_layout(device),
            &buffer,
            normal_map,
            &sampler,
            name,
        );
        Self {
            name: name.to_string(),
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Push changed parameters to the GPU.
    pub fn set(&mut self, queue: &wgpu::Queue, glass: &GlassConfig) {
        self.uniform = PhysicalMaterialUniform {
            colour: self.uniform.colour,
            normal_scale: self.uniform.normal_scale,
            ..PhysicalMaterialUniform::from(glass)
        };
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[derive(Debug)]
pub enum Material {
    Basic(BasicMaterial),
    Physical(PhysicalMaterial),
}

impl Material {
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        match self {
            Material::Basic(m) => &m.bind_group,
            Material::Physical(m) => &m.bind_group,
        }
    }

    /// Transmissive surfaces sample what was drawn behind them, so they are
    /// drawn after everything opaque.
    pub fn is_transmissive(&self) -> bool {
        match self {
            Material::Basic(_) => false,
            Material::Physical(m) => m.uniform.transmission > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_uniform_is_three_rows() {
        assert_eq!(std::mem::size_of::<PhysicalMaterialUniform>(), 48);
        assert_eq!(std::mem::size_of::<BasicMaterialUniform>(), 16);
    }

    #[test]
    fn glass_parameters_are_copied() {
        let uniform = PhysicalMaterialUniform::from(&GlassConfig::default());
        assert_eq!(uniform.metalness, 0.0);
        assert_eq!(uniform.roughness, 0.15);
        assert_eq!(uniform.transmission, 1.0);
        assert_eq!(uniform.thickness, 0.5);
        assert_eq!(uniform.ior, 1.5);
        assert_eq!(uniform.colour, [1.0; 4]);
    }
}
