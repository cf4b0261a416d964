use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{DepthSettings, mk_render_pipeline},
    resources::texture::{environment_layout, physical_material_layout},
};

/// Lit pipeline for physical materials.
///
/// Bind groups: 0 material, 1 camera, 2 light, 3 environment (equirectangular
/// map + transmission buffer). Transmissive meshes must be drawn after the
/// opaque ones have been copied into the transmission buffer.
pub fn mk_physical_pipeline(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Physical Pipeline Layout"),
        bind_group_layouts: &[
            &physical_material_layout(device),
            camera_bind_group_layout,
            light_bind_group_layout,
            &environment_layout(device),
        ],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Physical Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("physical.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Texture::HDR_FORMAT,
        Some(wgpu::BlendState::REPLACE),
        Some(DepthSettings {
            format: Texture::DEPTH_FORMAT,
            write: true,
        }),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
