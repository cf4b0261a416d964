//! The GPU and window context shared by all flows.
//!
//! [`Context`] owns the device, the surface and every engine-wide resource:
//! camera, light, pipelines, the post-processing [`Composer`] and the
//! [`BloomSettings`] it reads. Flows get `&Context` in their hooks and can
//! change it through [`Out::Configure`](crate::flow::Out::Configure).

use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::{CameraResources, OrbitController, PerspectiveCamera},
    config::{DemoConfig, clear_colour},
    data_structures::texture::Texture,
    pipelines::{
        Pipelines, basic::mk_basic_pipeline, gui::mk_gui_pipeline, light::LightResources,
        physical::mk_physical_pipeline,
    },
    post::{BloomSettings, Composer},
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub composer: Composer,
    /// The one set of bloom/output parameters; read by the composer each frame.
    pub bloom: BloomSettings,
    pub clear_colour: wgpu::Color,
    /// Set while an overlay (the debug panel) owns the pointer; the orbit
    /// controller ignores input meanwhile.
    pub pointer_captured: bool,
    /// Number of frames drawn so far.
    pub frames: u64,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let defaults = DemoConfig::default();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
                } else {
                    wgpu::Limits::default().using_resolution(adapter.limits())
                },
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colour and rely on an sRGB surface to encode
        // it; the output pass encodes by hand if none is offered.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no texture formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = CameraResources::new(
            &device,
            PerspectiveCamera::from_config(&defaults.camera, config.width, config.height),
            OrbitController::new(defaults.orbit.clone()),
        );
        let light = LightResources::new(&device, &defaults.light);

        let pipelines = Pipelines {
            basic: mk_basic_pipeline(&device, &camera.bind_group_layout),
            physical: mk_physical_pipeline(
                &device,
                &camera.bind_group_layout,
                &light.bind_group_layout,
            ),
            gui: mk_gui_pipeline(&device, config.format),
        };

        let composer = Composer::new(&device, &queue, config.format, config.width, config.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera,
            light,
            pipelines,
            composer,
            bloom: defaults.bloom,
            clear_colour: clear_colour(defaults.background_colour),
            pointer_captured: false,
            frames: 0,
        })
    }

    /// Adapt camera, surface and composer to a new viewport.
    ///
    /// Zero sizes (a minimised window) and the current size are ignored.
    /// Returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let composer_changed = self.composer.size() != (width, height);
        if (self.config.width, self.config.height) == (width, height) && !composer_changed {
            return false;
        }
        log::debug!("Resizing to {width}x{height}");
        self.config.width = width;
        self.config.height = height;
        self.camera.camera.set_viewport(width, height);
        self.surface.configure(&self.device, &self.config);
        self.composer.set_size(&self.device, width, height);
        true
    }

    /// Configure the surface again, e.g. after it was lost. Sizes are
    /// handled like in [`Context::resize`].
    pub fn reconfigure(&mut self, width: u32, height: u32) {
        if !self.resize(width, height) {
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Apply every engine-wide setting of a scene configuration.
    pub fn apply_config(&mut self, config: &DemoConfig) {
        self.clear_colour = clear_colour(config.background_colour);
        let target = self.camera.camera.target;
        self.camera.camera =
            PerspectiveCamera::from_config(&config.camera, self.config.width, self.config.height);
        self.camera.camera.look_at(target);
        self.camera.controller.set_limits(config.orbit.clone());
        self.light.set(&self.queue, &config.light);
        self.bloom = config.bloom.clone();
    }

    /// Replace the map used for reflections by lit materials.
    pub fn set_environment(&mut self, environment: Texture) {
        self.composer.set_environment(&self.device, environment);
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

/// The parts of the [`Context`] flow constructors may use while loading.
///
/// Device and queue are reference counted handles, so this is cheap to make.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the surface overlays are drawn into.
    pub format: wgpu::TextureFormat,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.config.format,
        }
    }
}
