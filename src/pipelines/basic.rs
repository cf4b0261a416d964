use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{DepthSettings, mk_render_pipeline},
    resources::texture::basic_material_layout,
};

/// Unlit pipeline: colour map times tint, no lighting. Renders into the HDR
/// scene target.
pub fn mk_basic_pipeline(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Basic Pipeline Layout"),
        bind_group_layouts: &[&basic_material_layout(device), camera_bind_group_layout],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Basic Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("basic.wgsl").into()),
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
