#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use glass_bloom::{context::Context, flow::ImageTestResult};
    use wgpu::Color;

    use crate::common::test_utils::{FrameCounter, TestRender};

    golden_image_test!(flow_constructor!(TestRender::new(
        |ctx: &mut Context| {
            ctx.clear_colour = Color::BLACK;
        },
        |ctx: &Context, state: &mut FrameCounter, image: &mut image::RgbaImage| {
            assert!(ctx.frames >= 1 && ctx.frames <= state.frame() as u64);
            if state.frame() < 2 {
                return Ok(ImageTestResult::Waiting);
            }
            assert_eq!(ctx.composer.size(), (ctx.config.width, ctx.config.height));
            assert_eq!(image.dimensions(), (ctx.config.width, ctx.config.height));
            // Black stays black through bloom and tone mapping
            for pixel in image.pixels() {
                assert_eq!(*pixel, image::Rgba([0, 0, 0, 255]));
            }
            Ok(ImageTestResult::Passed)
        },
    )));
}
