//! Perspective camera, its GPU uniform and the orbit controller.
//!
//! The camera keeps its projection matrix cached; anything that changes the
//! projection parameters (most notably a resize) must call
//! [`PerspectiveCamera::update_projection_matrix`] afterwards.
//! [`PerspectiveCamera::set_viewport`] does both.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use wgpu::util::DeviceExt;

use crate::{
    config::{CameraConfig, OrbitConfig},
    resources::texture::uniform_layout,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const POLAR_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new<F: Into<Rad<f32>>>(
        position: Point3<f32>,
        fovy: F,
        aspect: f32,
        znear: f32,
        zfar: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            target: position - Vector3::unit_z(),
            up: Vector3::unit_y(),
            fovy: fovy.into(),
            aspect,
            znear,
            zfar,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self::new(
            config.position.into(),
            config.fovy,
            aspect_ratio(width, height),
            config.znear,
            config.zfar,
        )
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Adapt the aspect ratio to a new viewport and refresh the projection.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view_matrix()
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the engine keeps around to feed the camera into shaders.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: PerspectiveCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: PerspectiveCamera, controller: OrbitController) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = uniform_layout(device, "camera_bind_group_layout");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue) {
        self.uniform.update_view_proj(&self.camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Orbits the camera around its target: left-drag rotates, the wheel zooms.
///
/// Input is accumulated from window events and applied once per frame in
/// [`OrbitController::update`].
#[derive(Debug)]
pub struct OrbitController {
    limits: OrbitConfig,
    rotating: bool,
    cursor: Option<PhysicalPosition<f64>>,
    rotate_delta: (f32, f32),
    zoom_delta: f32,
}

impl OrbitController {
    pub fn new(limits: OrbitConfig) -> Self {
        Self {
            limits,
            rotating: false,
            cursor: None,
            rotate_delta: (0.0, 0.0),
            zoom_delta: 0.0,
        }
    }

    pub fn limits(&self) -> &OrbitConfig {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: OrbitConfig) {
        self.limits = limits;
    }

    /// Feed a window event into the controller. `captured` is true while some
    /// other consumer (the debug panel) owns the pointer.
    pub fn handle_window_events(&mut self, event: &WindowEvent, captured: bool) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed && !captured;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(previous) = self.cursor {
                    if self.rotating && !captured {
                        self.rotate_delta.0 += (position.x - previous.x) as f32;
                        self.rotate_delta.1 += (position.y - previous.y) as f32;
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.rotating = false;
            }
            WindowEvent::MouseWheel { delta, .. } if !captured => {
                self.zoom_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
            }
            _ => (),
        }
    }

    /// Apply accumulated input to `camera`. `viewport_height` turns pixel
    /// deltas into angles: dragging across the full height is one turn.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, viewport_height: u32) {
        let (dx, dy) = std::mem::take(&mut self.rotate_delta);
        let zoom = std::mem::take(&mut self.zoom_delta);
        if dx == 0.0 && dy == 0.0 && zoom == 0.0 {
            return;
        }
        let full_turn = 2.0 * std::f32::consts::PI / viewport_height.max(1) as f32;
        let d_theta = -dx * full_turn * self.limits.rotate_speed;
        let d_phi = -dy * full_turn * self.limits.rotate_speed;
        let scale = 0.95f32.powf(zoom * self.limits.zoom_speed);
        orbit(camera, d_theta, d_phi, scale, &self.limits);
    }
}

/// Rotate `camera` around its target by the given azimuth/polar deltas and
/// scale its distance, respecting the configured limits.
pub fn orbit(
    camera: &mut PerspectiveCamera,
    d_theta: f32,
    d_phi: f32,
    scale: f32,
    limits: &OrbitConfig,
) {
    let offset = camera.position - camera.target;
    let radius = offset.magnitude();
    if radius == 0.0 {
        return;
    }
    let theta = offset.x.atan2(offset.z) + d_theta;
    let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + d_phi)
        .clamp(POLAR_EPSILON, limits.max_polar_angle.min(std::f32::consts::PI - POLAR_EPSILON));
    let radius = (radius * scale).clamp(limits.min_distance, limits.max_distance);

    let offset = Vector3::new(
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
        radius * phi.sin() * theta.cos(),
    );
    camera.position = Point3::from_vec(camera.target.to_vec() + offset);
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, MetricSpace};

    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new((0.0, 0.0, 3.0).into(), Deg(75.0), 1.0, 0.1, 1000.0);
        camera.look_at((0.0, 0.0, 0.0).into());
        camera
    }

    #[test]
    fn set_viewport_updates_aspect_and_projection() {
        let mut cam = camera();
        let before = cam.projection_matrix();
        cam.set_viewport(1920, 1080);
        assert_eq!(cam.aspect, 1920.0 / 1080.0);
        assert_ne!(cam.projection_matrix(), before);
        assert_eq!(
            cam.projection_matrix(),
            cgmath::perspective(Deg(75.0), 1920.0 / 1080.0, 0.1, 1000.0)
        );
    }

    #[test]
    fn set_viewport_is_idempotent() {
        let mut cam = camera();
        cam.set_viewport(800, 600);
        let first = cam.projection_matrix();
        cam.set_viewport(800, 600);
        assert_eq!(cam.projection_matrix(), first);
    }

    #[test]
    fn zero_height_does_not_produce_infinite_aspect() {
        let mut cam = camera();
        cam.set_viewport(640, 0);
        assert!(cam.aspect.is_finite());
    }

    #[test]
    fn orbit_keeps_distance_within_limits() {
        let limits = OrbitConfig::default();
        let mut cam = camera();
        orbit(&mut cam, 0.0, 0.0, 100.0, &limits);
        assert!((cam.position.distance(cam.target) - limits.max_distance).abs() < 1e-4);
        orbit(&mut cam, 0.0, 0.0, 0.0001, &limits);
        assert!((cam.position.distance(cam.target) - limits.min_distance).abs() < 1e-4);
    }

    #[test]
    fn orbit_never_goes_below_the_horizon() {
        let limits = OrbitConfig::default();
        let mut cam = camera();
        orbit(&mut cam, 0.3, 2.0, 1.0, &limits);
        assert!(cam.position.y >= cam.target.y - 1e-4, "{:?}", cam.position);
        orbit(&mut cam, 0.0, -1.0, 1.0, &limits);
        assert!(cam.position.y > cam.target.y);
    }

    #[test]
    fn azimuth_rotation_preserves_distance() {
        let limits = OrbitConfig::default();
        let mut cam = camera();
        let distance = cam.position.distance(cam.target);
        orbit(&mut cam, std::f32::consts::FRAC_PI_2, 0.0, 1.0, &limits);
        assert!((cam.position.distance(cam.target) - distance).abs() < 1e-4);
        assert!(cam.position.distance(Point3::new(3.0, 0.0, 0.0)) < 1e-4, "{:?}", cam.position);
    }

    fn cursor(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: (x, y).into(),
        }
    }

    fn left_button(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn controller_rotates_on_left_drag() {
        let mut controller = OrbitController::new(OrbitConfig::default());
        let mut cam = camera();
        let start = cam.position;
        controller.handle_window_events(&cursor(10.0, 10.0), false);
        controller.handle_window_events(&left_button(ElementState::Pressed), false);
        controller.handle_window_events(&cursor(110.0, 10.0), false);
        controller.update(&mut cam, 600);
        assert_ne!(cam.position, start);
    }

    #[test]
    fn controller_ignores_drag_while_captured() {
        let mut controller = OrbitController::new(OrbitConfig::default());
        let mut cam = camera();
        let start = cam.position;
        controller.handle_window_events(&cursor(10.0, 10.0), true);
        controller.handle_window_events(&left_button(ElementState::Pressed), true);
        controller.handle_window_events(&cursor(200.0, 10.0), true);
        controller.update(&mut cam, 600);
        assert_eq!(cam.position, start);
    }
}
