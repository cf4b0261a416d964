//! On-screen debug panel bound to the bloom settings of the [`Context`].
//!
//! [`PanelFlow`] turns pointer events into edits of `ctx.bloom` and draws the
//! panel as an overlay. Edits are applied through [`Out::Configure`], so the
//! settings have exactly one owner and the composer picks every change up on
//! the next frame. With the `ui` feature the panel also shows each control's
//! name and value.

pub mod panel;
#[cfg(feature = "ui")]
pub mod text;

use std::pin::Pin;

use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{ElementState, MouseButton, WindowEvent};

use crate::{
    context::{Context, InitContext},
    flow::{FlowConsturctor, GraphicsFlow, Out},
    pipelines::gui::PanelVertex,
    post::BloomSettings,
    render::{Flat, Render},
};

pub use panel::{Control, ControlKind, DebugPanel, Label};

pub struct PanelFlow {
    panel: DebugPanel,
    cursor: (f32, f32),
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    /// Settings and viewport the vertex buffer was last built for.
    drawn: Option<(BloomSettings, (u32, u32))>,
    #[cfg(feature = "ui")]
    text: text::PanelText,
}

impl PanelFlow {
    pub fn new(ctx: &InitContext, panel: DebugPanel) -> Self {
        let quads = panel.quad_count();
        let vertex_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Panel Vertex Buffer"),
            size: (4 * quads * std::mem::size_of::<PanelVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = panel::quad_indices(quads);
        let index_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Panel Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            panel,
            cursor: (-1.0, -1.0),
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            drawn: None,
            #[cfg(feature = "ui")]
            text: text::PanelText::new(&ctx.device, &ctx.queue, ctx.format),
        }
    }

    /// A constructor for [`crate::flow::run`] drawing the bloom panel.
    pub fn constructor<S: 'static, E: 'static>() -> FlowConsturctor<S, E> {
        Box::new(
            |ctx: InitContext| -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>> {
                Box::pin(async move {
                    let panel: Box<dyn GraphicsFlow<S, E>> =
                        Box::new(PanelFlow::new(&ctx, DebugPanel::bloom()));
                    panel
                })
            },
        )
    }

    pub fn panel(&self) -> &DebugPanel {
        &self.panel
    }

    /// Push the new settings into the context and tell the camera controller
    /// whether the pointer belongs to the panel.
    fn configure<S, E>(&self, settings: Option<BloomSettings>, was_capturing: bool) -> Out<S, E> {
        let capturing = self.panel.is_capturing();
        if settings.is_none() && capturing == was_capturing {
            return Out::Empty;
        }
        Out::Configure(Box::new(move |ctx: &mut Context| {
            if let Some(settings) = settings {
                ctx.bloom = settings;
            }
            ctx.pointer_captured = capturing;
        }))
    }
}

impl<S, E> GraphicsFlow<S, E> for PanelFlow {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, _: Duration) -> Out<S, E> {
        let viewport = (ctx.config.width, ctx.config.height);
        let current = Some((ctx.bloom.clone(), viewport));
        if self.drawn != current {
            let vertices = self.panel.quads(&ctx.bloom, viewport);
            ctx.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
            self.drawn = current;
        }
        #[cfg(feature = "ui")]
        self.text.prepare(
            &ctx.device,
            &ctx.queue,
            self.panel.labels(&ctx.bloom, viewport),
            viewport,
        );
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut S, event: &WindowEvent) -> Out<S, E> {
        let viewport = (ctx.config.width, ctx.config.height);
        let was_capturing = self.panel.is_capturing();
        let mut settings = ctx.bloom.clone();
        let changed = match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                self.panel
                    .pointer_moved(self.cursor, viewport, &mut settings)
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self
                .panel
                .pointer_down(self.cursor, viewport, &mut settings),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            }
            | WindowEvent::CursorLeft { .. } => {
                self.panel.pointer_up();
                false
            }
            _ => false,
        };
        self.configure(changed.then_some(settings), was_capturing)
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        if self.drawn.is_none() {
            return Render::None;
        }
        let render = Render::Overlay(Flat {
            vertex: &self.vertex_buffer,
            index: &self.index_buffer,
            amount: self.num_indices,
        });
        #[cfg(feature = "ui")]
        let render = Render::Composed(vec![render, Render::Text(&self.text)]);
        render
    }
}
