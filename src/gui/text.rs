//! Panel labels rendered with glyphon.

use glyphon::{
    Attrs, Buffer, Cache, Color, Family, FontSystem, Metrics, Resolution, Shaping, SwashCache,
    TextArea, TextAtlas, TextBounds, TextRenderer, Viewport,
};

use super::panel::Label;

pub const FONT_SIZE: f32 = 11.0;
pub const LINE_HEIGHT: f32 = 14.0;
const TEXT_COLOUR: Color = Color::rgb(238, 238, 238);

pub struct PanelText {
    font_system: FontSystem,
    swash_cache: SwashCache,
    viewport: Viewport,
    atlas: TextAtlas,
    renderer: TextRenderer,
    /// Labels the buffers were shaped for.
    labels: Vec<Label>,
    buffers: Vec<Buffer>,
}

impl std::fmt::Debug for PanelText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelText")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl PanelText {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        let renderer = TextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            viewport,
            atlas,
            renderer,
            labels: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Shape changed labels and upload the glyphs for the next overlay pass.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        labels: Vec<Label>,
        (width, height): (u32, u32),
    ) {
        if self.labels != labels {
            self.buffers = labels
                .iter()
                .map(|label| {
                    let mut buffer =
                        Buffer::new(&mut self.font_system, Metrics::new(FONT_SIZE, LINE_HEIGHT));
                    buffer.set_size(
                        &mut self.font_system,
                        Some(label.rect.w),
                        Some(label.rect.h),
                    );
                    buffer.set_text(
                        &mut self.font_system,
                        &label.text,
                        &Attrs::new().family(Family::SansSerif),
                        Shaping::Basic,
                        None,
                    );
                    buffer.shape_until_scroll(&mut self.font_system, false);
                    buffer
                })
                .collect();
            self.labels = labels;
        }

        self.viewport.update(queue, Resolution { width, height });
        let areas = self
            .labels
            .iter()
            .zip(&self.buffers)
            .map(|(label, buffer)| TextArea {
                buffer,
                left: label.rect.x,
                top: label.rect.y + (label.rect.h - LINE_HEIGHT) / 2.0,
                scale: 1.0,
                bounds: TextBounds {
                    left: label.rect.x as i32,
                    top: label.rect.y as i32,
                    right: (label.rect.x + label.rect.w) as i32,
                    bottom: (label.rect.y + label.rect.h) as i32,
                },
                default_color: TEXT_COLOUR,
                custom_glyphs: &[],
            });
        if let Err(e) = self.renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        ) {
            log::warn!("Could not prepare panel labels: {e}");
        }
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Err(e) = self.renderer.render(&self.atlas, &self.viewport, pass) {
            log::warn!("Could not draw panel labels: {e}");
        }
    }
}
