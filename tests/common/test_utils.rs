#![allow(dead_code)]

#[cfg(feature = "integration-tests")]
use glass_bloom::flow::ImageTestResult;
use glass_bloom::{
    context::Context,
    flow::{GraphicsFlow, Out},
    render::Render,
};

/// Counts lifecycle hook invocations across frames.
#[derive(Default)]
pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    /// Names pushed by resolved `Out::FutFn` callbacks.
    pub resolved: Vec<&'static str>,
}

impl State {
    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) type Validate =
    Box<dyn Fn(&Context, &mut FrameCounter, &mut image::RgbaImage) -> Result<ImageTestResult, anyhow::Error>>;

/// A flow that renders nothing itself: it configures the context, counts
/// frames and inspects every finished frame.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) setup: Box<dyn Fn(&mut Context)>,
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl TestRender {
    pub(crate) fn new(
        setup: impl Fn(&mut Context) + 'static,
        validate: impl Fn(&Context, &mut FrameCounter, &mut image::RgbaImage) -> Result<ImageTestResult, anyhow::Error>
        + 'static,
    ) -> Self {
        Self {
            setup: Box::new(setup),
            validate: Box::new(validate),
        }
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut FrameCounter,
        _: instant::Duration,
    ) -> Out<FrameCounter, ()> {
        state.progress();
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &glass_bloom::WindowEvent,
    ) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut FrameCounter, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        image: &mut image::RgbaImage,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, image)
    }
}

/// Run the given flow constructors until every flow's `render_to_texture`
/// reports `Passed`.
#[macro_export]
macro_rules! golden_image_test {
    ($($constructor:expr),+ $(,)?) => {{
        use crate::common::test_utils::FrameCounter;
        use glass_bloom::flow::FlowConsturctor;

        let constructors: Vec<FlowConsturctor<FrameCounter, ()>> = vec![$($constructor),+];
        glass_bloom::flow::run(constructors).expect("Failed to run flow for integration test.");
    }};
}

/// Wrap a ready-made flow into a constructor.
#[macro_export]
macro_rules! flow_constructor {
    ($flow:expr) => {{
        use glass_bloom::{context::InitContext, flow::GraphicsFlow};
        let constructor: glass_bloom::flow::FlowConsturctor<_, ()> = Box::new(
            move |_: InitContext| -> std::pin::Pin<
                Box<dyn std::future::Future<Output = Box<dyn GraphicsFlow<_, ()>>>>,
            > {
                Box::pin(async move {
                    let flow: Box<dyn GraphicsFlow<_, ()>> = Box::new($flow);
                    flow
                })
            },
        );
        constructor
    }};
}
