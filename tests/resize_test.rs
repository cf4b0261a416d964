#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn resize_keeps_surface_camera_and_composer_in_step() {
    use glass_bloom::{context::Context, flow::ImageTestResult, post::mip_sizes};

    use crate::common::test_utils::{FrameCounter, TestRender};

    const WIDTH: u32 = 333;
    const HEIGHT: u32 = 217;

    fn assert_sized(ctx: &Context, (width, height): (u32, u32)) {
        assert_eq!((ctx.config.width, ctx.config.height), (width, height));
        assert_eq!(ctx.composer.size(), (width, height));
        assert_eq!(ctx.composer.bloom.level_sizes(), mip_sizes(width, height));
        let aspect = width as f32 / height as f32;
        assert!((ctx.camera.camera.aspect - aspect).abs() < 1e-6);
    }

    golden_image_test!(flow_constructor!(TestRender::new(
        |ctx: &mut Context| {
            assert!(ctx.resize(WIDTH, HEIGHT));
            assert_sized(ctx, (WIDTH, HEIGHT));

            // Same size again and minimised windows change nothing
            assert!(!ctx.resize(WIDTH, HEIGHT));
            assert!(!ctx.resize(0, HEIGHT));
            assert!(!ctx.resize(WIDTH, 0));
            assert_sized(ctx, (WIDTH, HEIGHT));
        },
        |ctx: &Context, state: &mut FrameCounter, image: &mut image::RgbaImage| {
            if state.frame() < 2 {
                return Ok(ImageTestResult::Waiting);
            }
            // The window may have sent its own size since; either way the
            // three stay in step with the surface
            let size = (ctx.config.width, ctx.config.height);
            assert_sized(ctx, size);
            assert_eq!(image.dimensions(), size);
            Ok(ImageTestResult::Passed)
        },
    )));
}
