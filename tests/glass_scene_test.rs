#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn scene_and_panel_render_with_default_settings() {
    use glass_bloom::{
        cgmath::Point3,
        config::{DemoConfig, clear_colour},
        context::Context,
        flow::ImageTestResult,
        gui::{DebugPanel, PanelFlow},
        post::BloomSettings,
        scene::GlassScene,
    };

    use crate::common::test_utils::{FrameCounter, TestRender};

    let checker = TestRender::new(
        |_: &mut Context| {},
        |ctx: &Context, state: &mut FrameCounter, image: &mut image::RgbaImage| {
            if state.frame() < 3 {
                return Ok(ImageTestResult::Waiting);
            }
            assert_eq!(ctx.bloom, BloomSettings::default());
            assert_eq!(ctx.clear_colour, clear_colour(0x808080));
            assert_eq!(ctx.camera.camera.target, Point3::new(0.0, 0.0, 0.0));
            assert_eq!(ctx.camera.camera.position, Point3::new(0.0, 0.0, 3.0));
            assert!(!ctx.pointer_captured);

            let (width, height) = (ctx.config.width, ctx.config.height);
            assert_eq!(ctx.composer.size(), (width, height));
            let expected_aspect = width as f32 / height as f32;
            assert!((ctx.camera.camera.aspect - expected_aspect).abs() < 1e-6);

            // The panel covers the top-right corner and darkens what is below it
            let panel = DebugPanel::bloom().bounds((width, height));
            if panel.x > 20.0 {
                let inside = image.get_pixel((panel.x + panel.w - 1.0) as u32, 1);
                let outside = image.get_pixel((panel.x - 10.0) as u32, 1);
                assert!(inside[0] < outside[0], "{inside:?} vs {outside:?}");
            }
            Ok(ImageTestResult::Passed)
        },
    );

    golden_image_test!(
        GlassScene::constructor(DemoConfig::default()),
        PanelFlow::constructor(),
        flow_constructor!(checker),
    );
}
