use std::f32::consts::FRAC_PI_2;

use glass_bloom::{
    camera::{OrbitController, PerspectiveCamera, orbit},
    cgmath::{EuclideanSpace, MetricSpace, Point3},
    config::DemoConfig,
    data_structures::geometry,
    post::{BloomSettings, mip_sizes},
    scene::{ICOSAHEDRON_RADIUS, SPHERE_RADIUS, SPHERE_SEGMENTS, camera_target},
};

#[test]
fn bloom_starts_with_the_documented_parameters() {
    let settings = DemoConfig::default().bloom;
    assert_eq!(settings, BloomSettings::default());
    assert!(settings.enabled);
    assert_eq!(settings.exposure, 1.0);
    assert_eq!(settings.strength, 1.5);
    assert_eq!(settings.radius, 0.33);
    assert_eq!(settings.threshold, 0.9);
}

#[test]
fn resizing_updates_the_camera_aspect() {
    let config = DemoConfig::default();
    let mut camera = PerspectiveCamera::from_config(&config.camera, 800, 600);
    for (w, h) in [(1920, 1080), (300, 900), (1, 1)] {
        camera.set_viewport(w, h);
        assert_eq!(camera.aspect, w as f32 / h as f32);
    }
}

#[test]
fn bloom_mips_halve_down_from_half_resolution() {
    let sizes = mip_sizes(1920, 1080);
    assert_eq!(sizes[0], (960, 540));
    assert_eq!(sizes[4], (60, 34));
    for pair in sizes.windows(2) {
        assert!(pair[1].0 <= pair[0].0 && pair[1].1 <= pair[0].1);
    }
}

#[test]
fn orbiting_keeps_the_configured_distance_range() {
    let config = DemoConfig::default();
    let mut camera = PerspectiveCamera::from_config(&config.camera, 800, 600);
    camera.look_at(camera_target());
    let controller = OrbitController::new(config.orbit.clone());
    let limits = controller.limits();

    orbit(&mut camera, 0.3, 0.2, 100.0, limits);
    assert!((camera.position.distance(camera.target) - limits.max_distance).abs() < 1e-4);
    orbit(&mut camera, -0.3, -0.2, 0.0001, limits);
    assert!((camera.position.distance(camera.target) - limits.min_distance).abs() < 1e-4);
    // Never below the horizon of the target
    orbit(&mut camera, 0.0, 10.0, 1.0, limits);
    assert!(camera.position.y >= camera.target.y - 1e-4);
}

#[test]
fn a_quarter_turn_moves_the_camera_around_the_origin() {
    let config = DemoConfig::default();
    let mut camera = PerspectiveCamera::from_config(&config.camera, 800, 600);
    camera.look_at(camera_target());

    orbit(&mut camera, FRAC_PI_2, 0.0, 1.0, &config.orbit);
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert!(camera.position.distance(Point3::new(3.0, 0.0, 0.0)) < 1e-4, "{:?}", camera.position);
}

#[test]
fn distance_limits_are_measured_from_the_origin() {
    let config = DemoConfig::default();
    let mut camera = PerspectiveCamera::from_config(&config.camera, 800, 600);
    camera.look_at(camera_target());

    orbit(&mut camera, 0.0, 0.0, 100.0, &config.orbit);
    assert!((camera.position.distance(Point3::origin()) - config.orbit.max_distance).abs() < 1e-4);
}

#[test]
fn scene_geometry_has_the_expected_resolution() {
    assert_eq!(geometry::icosahedron(ICOSAHEDRON_RADIUS).triangle_count(), 20);
    let sphere = geometry::sphere(SPHERE_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS);
    assert_eq!(sphere.vertices.len(), 33 * 33);
    assert_eq!(geometry::plane(5.0, 5.0).triangle_count(), 2);
}
