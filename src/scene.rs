//! The glass scene: two glass bodies in front of a textured backdrop.
//!
//! [`GlassScene`] waits for its textures inside the flow constructor, so the
//! materials are built from finished (or default) textures before the first
//! frame. On init it hands the environment map and the configured background,
//! camera, light and bloom settings to the [`Context`].

use std::pin::Pin;

use cgmath::{Point3, Vector3};
use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    config::DemoConfig,
    context::{Context, InitContext},
    data_structures::{
        geometry,
        instance::Instance,
        material::{BasicMaterial, Material, PhysicalMaterial},
        model::Mesh,
        texture::Texture,
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    render::{Drawable, Render},
    resources::SceneAssets,
};

pub const ICOSAHEDRON_RADIUS: f32 = 0.5;
pub const SPHERE_RADIUS: f32 = 0.5;
pub const SPHERE_SEGMENTS: u32 = 32;
pub const BACKDROP_SIZE: f32 = 5.0;

pub const ICOSAHEDRON_POSITION: [f32; 3] = [0.0, 0.0, 0.0];
pub const SPHERE_POSITION: [f32; 3] = [1.25, 0.0, 0.0];
pub const BACKDROP_POSITION: [f32; 3] = [0.0, 0.0, -1.0];
/// Pivot of the orbit controls: the origin, where the icosahedron sits.
pub const ORBIT_TARGET: [f32; 3] = [0.0, 0.0, 0.0];

/// The point the camera looks at and orbits around.
///
/// The camera starts on the z axis, so looking at the pivot gives the same
/// view as looking at the backdrop behind it.
pub fn camera_target() -> Point3<f32> {
    Point3::from(ORBIT_TARGET)
}

/// One mesh with its surface and transform.
#[derive(Debug)]
struct Body {
    mesh: Mesh,
    material: Material,
    instance: Instance,
    instance_buffer: wgpu::Buffer,
}

impl Body {
    fn new(device: &wgpu::Device, mesh: Mesh, material: Material, instance: Instance) -> Self {
        let instance_buffer = instance.to_buffer(device, &format!("{} Instance Buffer", mesh.name));
        Self {
            mesh,
            material,
            instance,
            instance_buffer,
        }
    }

    fn drawable(&self) -> Drawable<'_> {
        Drawable {
            mesh: &self.mesh,
            material: &self.material,
            instance: &self.instance_buffer,
            amount: 1,
        }
    }
}

#[derive(Debug)]
pub struct GlassScene {
    config: DemoConfig,
    bodies: Vec<Body>,
    /// Handed to the context in `on_init`.
    environment: Option<Texture>,
}

impl GlassScene {
    /// Load the scene's textures and build its meshes and materials.
    pub async fn new(ctx: InitContext, config: DemoConfig) -> Self {
        let assets = SceneAssets::load(&ctx, &config.assets).await;
        Self::from_assets(&ctx.device, config, assets)
    }

    /// A constructor for [`crate::flow::run`].
    pub fn constructor<S: 'static, E: 'static>(config: DemoConfig) -> FlowConsturctor<S, E> {
        Box::new(
            move |ctx: InitContext| -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>> {
                Box::pin(async move {
                    let scene: Box<dyn GraphicsFlow<S, E>> =
                        Box::new(GlassScene::new(ctx, config).await);
                    scene
                })
            },
        )
    }

    fn from_assets(device: &wgpu::Device, config: DemoConfig, assets: SceneAssets) -> Self {
        let icosahedron = Body::new(
            device,
            Mesh::new(device, "Icosahedron", &geometry::icosahedron(ICOSAHEDRON_RADIUS)),
            Material::Physical(PhysicalMaterial::new(
                device,
                "Icosahedron Glass",
                &config.glass,
                &assets.normal_map,
            )),
            Instance::from(Vector3::from(ICOSAHEDRON_POSITION)),
        );
        let sphere = Body::new(
            device,
            Mesh::new(
                device,
                "Sphere",
                &geometry::sphere(SPHERE_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
            ),
            Material::Physical(PhysicalMaterial::new(
                device,
                "Sphere Glass",
                &config.glass,
                &assets.normal_map,
            )),
            Instance::from(Vector3::from(SPHERE_POSITION)),
        );
        let backdrop = Body::new(
            device,
            Mesh::new(device, "Backdrop", &geometry::plane(BACKDROP_SIZE, BACKDROP_SIZE)),
            Material::Basic(BasicMaterial::new(device, "Backdrop", &assets.background)),
            Instance::from(Vector3::from(BACKDROP_POSITION)),
        );
        log::info!("Glass scene built");

        Self {
            config,
            bodies: vec![icosahedron, sphere, backdrop],
            environment: Some(assets.environment),
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    /// Names and positions of the meshes, in draw submission order.
    pub fn layout(&self) -> impl Iterator<Item = (&str, Vector3<f32>)> {
        self.bodies
            .iter()
            .map(|body| (body.mesh.name.as_str(), body.instance.position))
    }
}

impl<S, E> GraphicsFlow<S, E> for GlassScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut S) -> Out<S, E> {
        ctx.apply_config(&self.config);
        ctx.camera.camera.look_at(camera_target());
        if let Some(environment) = self.environment.take() {
            ctx.set_environment(environment);
        }
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut S, _: Duration) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::Meshes(self.bodies.iter().map(Body::drawable).collect())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;
    use crate::{camera::PerspectiveCamera, config::CameraConfig};

    #[test]
    fn glass_bodies_sit_in_front_of_the_backdrop() {
        assert!(ICOSAHEDRON_POSITION[2] > BACKDROP_POSITION[2]);
        assert!(SPHERE_POSITION[2] > BACKDROP_POSITION[2]);
        assert_eq!(SPHERE_POSITION[0] - ICOSAHEDRON_POSITION[0], 1.25);
    }

    #[test]
    fn default_camera_looks_straight_at_the_backdrop() {
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 800, 600);
        camera.look_at(camera_target());
        let forward = (camera.target - camera.position).normalize();
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
        let to_backdrop = (Point3::from(BACKDROP_POSITION) - camera.position).normalize();
        assert!((forward - to_backdrop).magnitude() < 1e-6);
    }

    #[test]
    fn the_camera_orbits_the_icosahedron() {
        assert_eq!(camera_target(), Point3::from(ICOSAHEDRON_POSITION));
    }
}
