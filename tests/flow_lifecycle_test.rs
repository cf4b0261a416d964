#[cfg(feature = "integration-tests")]
use glass_bloom::flow::ImageTestResult;
use glass_bloom::{
    context::Context,
    flow::{GraphicsFlow, Out},
    post::BloomSettings,
    render::Render,
};

use crate::common::test_utils::State;

mod common;

const LOWERED_THRESHOLD: f32 = 0.5;

enum Event {
    Threshold(f32),
}

/// Edits the bloom settings the way an overlay does: a resolved event is
/// turned into an `Out::Configure` on the next update.
#[derive(Default)]
struct BloomEditor {
    pending: Option<f32>,
}

impl GraphicsFlow<State, Event> for BloomEditor {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
        assert_eq!(ctx.bloom, BloomSettings::default());
        assert_eq!(ctx.frames, 0);
        assert_eq!(state.frame_counter(), 0);
        assert_eq!(state.init_invocations(), 0);
        assert_eq!(state.update_invocations(), 0);

        state.init();
        Out::Configure(Box::new(|ctx: &mut Context| {
            ctx.clear_colour = wgpu::Color::BLACK;
        }))
    }

    fn on_update(&mut self, ctx: &Context, state: &mut State, _: instant::Duration) -> Out<State, Event> {
        assert_eq!(state.frame_counter(), state.update_invocations());
        assert_eq!(state.init_invocations(), 1);
        // At most one draw per redraw
        assert!(ctx.frames <= state.frame_counter() as u64);
        state.frame();
        state.update();

        if let Some(threshold) = self.pending.take() {
            return Out::Configure(Box::new(move |ctx: &mut Context| {
                ctx.bloom.threshold = threshold;
            }));
        }
        match state.frame_counter() {
            3 => Out::FutEvent(vec![Box::new(async move { Event::Threshold(LOWERED_THRESHOLD) })]),
            5 => {
                let mark: Box<dyn FnOnce(&mut State)> =
                    Box::new(|state: &mut State| state.resolved.push("environment"));
                Out::FutFn(vec![Box::new(async move { mark })])
            }
            _ => Out::Empty,
        }
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut State,
        _: &glass_bloom::WindowEvent,
    ) -> Out<State, Event> {
        Out::Empty
    }

    fn on_custom_events(&mut self, ctx: &Context, state: &mut State, event: Event) -> Option<Event> {
        // sent in frame 3
        assert!(state.frame_counter() >= 3);
        let Event::Threshold(threshold) = event;
        assert_eq!(ctx.bloom.threshold, BloomSettings::default().threshold);
        self.pending = Some(threshold);
        None
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut State,
        _: &mut image::RgbaImage,
    ) -> Result<ImageTestResult, anyhow::Error> {
        let applied = ctx.bloom.threshold == LOWERED_THRESHOLD;
        let done = applied && state.resolved == ["environment"] && state.frame_counter() > 8;
        if done {
            // Only the edited field moved
            assert_eq!(
                ctx.bloom,
                BloomSettings {
                    threshold: LOWERED_THRESHOLD,
                    ..Default::default()
                }
            );
            Ok(ImageTestResult::Passed)
        } else if state.frame_counter() > 120 {
            Ok(ImageTestResult::Failed)
        } else {
            Ok(ImageTestResult::Waiting)
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn bloom_edits_arrive_through_events_and_configure() {
    use glass_bloom::flow::FlowConsturctor;

    let constructor: FlowConsturctor<State, Event> = Box::new(|_| {
        Box::pin(async move { Box::new(BloomEditor::default()) as Box<dyn GraphicsFlow<_, _>> })
    });

    if let Err(e) = glass_bloom::flow::run(vec![constructor]) {
        panic!("{}", e);
    }
}
