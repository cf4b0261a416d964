//! Layout and interaction of the debug panel, independent of the GPU.
//!
//! The panel is a column of rows in the top-right corner of the window, one
//! row per [`Control`]. Every control reads and writes one field of
//! [`BloomSettings`] through plain function pointers, so what the panel shows
//! is always derived from the settings it is handed and never cached.

use crate::{pipelines::gui::PanelVertex, post::BloomSettings};

pub const PANEL_WIDTH: f32 = 245.0;
pub const ROW_HEIGHT: f32 = 27.0;
pub const MARGIN_RIGHT: f32 = 15.0;
/// Width of the name column, as in dat.gui.
pub const LABEL_WIDTH: f32 = 0.4 * PANEL_WIDTH;
/// Width of the numeric value shown right of a slider.
pub const VALUE_WIDTH: f32 = 48.0;
const PADDING: f32 = 4.0;
const ACCENT_WIDTH: f32 = 3.0;

const BACKGROUND: [f32; 4] = [0.1, 0.1, 0.1, 0.9];
const TRACK: [f32; 4] = [0.19, 0.19, 0.19, 1.0];
const FILL: [f32; 4] = [0.18, 0.63, 0.84, 1.0];
const TOGGLE_ACCENT: [f32; 4] = [0.5, 0.4, 0.53, 1.0];
const SLIDER_ACCENT: [f32; 4] = [0.18, 0.63, 0.84, 1.0];
const CHECKED: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

#[derive(Clone, Copy, Debug)]
pub enum ControlKind {
    Toggle {
        get: fn(&BloomSettings) -> bool,
        set: fn(&mut BloomSettings, bool),
    },
    Slider {
        min: f32,
        max: f32,
        step: f32,
        get: fn(&BloomSettings) -> f32,
        set: fn(&mut BloomSettings, f32),
    },
}

#[derive(Clone, Copy, Debug)]
pub struct Control {
    pub name: &'static str,
    pub kind: ControlKind,
}

impl Control {
    pub fn toggle(
        name: &'static str,
        get: fn(&BloomSettings) -> bool,
        set: fn(&mut BloomSettings, bool),
    ) -> Self {
        Self {
            name,
            kind: ControlKind::Toggle { get, set },
        }
    }

    pub fn slider(
        name: &'static str,
        (min, max, step): (f32, f32, f32),
        get: fn(&BloomSettings) -> f32,
        set: fn(&mut BloomSettings, f32),
    ) -> Self {
        Self {
            name,
            kind: ControlKind::Slider {
                min,
                max,
                step,
                get,
                set,
            },
        }
    }
}

/// Map a position `t` along a slider track to a value.
///
/// Values snap to multiples of `step` above `min`; positions at or beyond the
/// ends of the track yield exactly `min` or `max`.
pub fn slider_value(min: f32, max: f32, step: f32, t: f32) -> f32 {
    if t <= 0.0 {
        return min;
    }
    if t >= 1.0 {
        return max;
    }
    let raw = t * (max - min);
    let snapped = if step > 0.0 {
        (raw / step).round() * step
    } else {
        raw
    };
    (min + snapped).clamp(min, max)
}

/// Axis aligned rectangle in window pixels (origin top left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn contains(&self, (px, py): (f32, f32)) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    fn inset(&self, by: f32) -> Rect {
        Rect {
            x: self.x + by,
            y: self.y + by,
            w: (self.w - 2.0 * by).max(0.0),
            h: (self.h - 2.0 * by).max(0.0),
        }
    }
}

/// A line of text at a fixed place of the panel.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub rect: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    Idle,
    /// A slider row is being dragged.
    Slider(usize),
    /// The pointer went down on the panel but not on a slider.
    Held,
}

#[derive(Debug)]
pub struct DebugPanel {
    controls: Vec<Control>,
    drag: Drag,
}

impl DebugPanel {
    pub fn new(controls: Vec<Control>) -> Self {
        Self {
            controls,
            drag: Drag::Idle,
        }
    }

    /// The four bloom controls: enabled, strength, radius and threshold.
    pub fn bloom() -> Self {
        Self::new(vec![
            Control::toggle("enabled", |s| s.enabled, |s, v| s.enabled = v),
            Control::slider(
                "strength",
                (0.0, 2.0, 0.001),
                |s| s.strength,
                |s, v| s.strength = v,
            ),
            Control::slider(
                "radius",
                (0.0, 2.0, 0.001),
                |s| s.radius,
                |s, v| s.radius = v,
            ),
            Control::slider(
                "threshold",
                (0.0, 1.0, 0.001),
                |s| s.threshold,
                |s, v| s.threshold = v,
            ),
        ])
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// True while the panel owns the pointer.
    pub fn is_capturing(&self) -> bool {
        self.drag != Drag::Idle
    }

    pub fn bounds(&self, viewport: (u32, u32)) -> Rect {
        Rect {
            x: viewport.0 as f32 - PANEL_WIDTH - MARGIN_RIGHT,
            y: 0.0,
            w: PANEL_WIDTH,
            h: ROW_HEIGHT * self.controls.len() as f32,
        }
    }

    pub fn row(&self, index: usize, viewport: (u32, u32)) -> Rect {
        let bounds = self.bounds(viewport);
        Rect {
            y: bounds.y + ROW_HEIGHT * index as f32,
            h: ROW_HEIGHT,
            ..bounds
        }
    }

    /// Interactive area of a row: the slider track or the toggle box.
    pub fn track(&self, index: usize, viewport: (u32, u32)) -> Rect {
        let row = self.row(index, viewport).inset(PADDING);
        match self.controls[index].kind {
            ControlKind::Toggle { .. } => Rect {
                x: row.x + row.w - row.h,
                w: row.h,
                ..row
            },
            ControlKind::Slider { .. } => Rect {
                x: row.x + LABEL_WIDTH,
                w: row.w - LABEL_WIDTH - VALUE_WIDTH - PADDING,
                ..row
            },
        }
    }

    /// Text drawn on top of [`quads`](Self::quads): every control's name and,
    /// for sliders, its current value.
    pub fn labels(&self, settings: &BloomSettings, viewport: (u32, u32)) -> Vec<Label> {
        let mut labels = Vec::with_capacity(2 * self.controls.len());
        for (index, control) in self.controls.iter().enumerate() {
            let row = self.row(index, viewport);
            let left = row.x + ACCENT_WIDTH + PADDING;
            labels.push(Label {
                text: control.name.to_string(),
                rect: Rect {
                    x: left,
                    w: LABEL_WIDTH - (left - row.x),
                    ..row
                },
            });
            if let ControlKind::Slider { get, .. } = control.kind {
                labels.push(Label {
                    text: format!("{:.3}", get(settings)),
                    rect: Rect {
                        x: row.x + row.w - VALUE_WIDTH,
                        w: VALUE_WIDTH,
                        ..row
                    },
                });
            }
        }
        labels
    }

    pub fn hit(&self, pointer: (f32, f32), viewport: (u32, u32)) -> Option<usize> {
        (0..self.controls.len()).find(|i| self.row(*i, viewport).contains(pointer))
    }

    fn drag_to(
        &self,
        index: usize,
        pointer: (f32, f32),
        viewport: (u32, u32),
        settings: &mut BloomSettings,
    ) -> bool {
        let ControlKind::Slider {
            min,
            max,
            step,
            get,
            set,
        } = self.controls[index].kind
        else {
            return false;
        };
        let track = self.track(index, viewport);
        let t = if track.w > 0.0 {
            (pointer.0 - track.x) / track.w
        } else {
            0.0
        };
        let value = slider_value(min, max, step, t);
        if get(settings) == value {
            return false;
        }
        set(settings, value);
        log::info!("{} = {value:.3}", self.controls[index].name);
        true
    }

    /// Left button pressed at `pointer`. Returns whether `settings` changed.
    pub fn pointer_down(
        &mut self,
        pointer: (f32, f32),
        viewport: (u32, u32),
        settings: &mut BloomSettings,
    ) -> bool {
        let Some(index) = self.hit(pointer, viewport) else {
            return false;
        };
        match self.controls[index].kind {
            ControlKind::Toggle { get, set } => {
                self.drag = Drag::Held;
                let value = !get(settings);
                set(settings, value);
                log::info!("{} = {value}", self.controls[index].name);
                true
            }
            ControlKind::Slider { .. } => {
                self.drag = Drag::Slider(index);
                self.drag_to(index, pointer, viewport, settings)
            }
        }
    }

    /// Pointer moved to `pointer`. Returns whether `settings` changed.
    pub fn pointer_moved(
        &mut self,
        pointer: (f32, f32),
        viewport: (u32, u32),
        settings: &mut BloomSettings,
    ) -> bool {
        match self.drag {
            Drag::Slider(index) => self.drag_to(index, pointer, viewport, settings),
            Drag::Idle | Drag::Held => false,
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = Drag::Idle;
    }

    /// Number of quads [`quads`](Self::quads) emits; constant for a panel.
    pub fn quad_count(&self) -> usize {
        1 + 3 * self.controls.len()
    }

    /// The panel as coloured quads in normalized device coordinates, four
    /// vertices per quad in the order top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn quads(&self, settings: &BloomSettings, viewport: (u32, u32)) -> Vec<PanelVertex> {
        let mut rects = Vec::with_capacity(self.quad_count());
        rects.push((self.bounds(viewport), BACKGROUND));
        for (index, control) in self.controls.iter().enumerate() {
            let row = self.row(index, viewport).inset(1.0);
            let track = self.track(index, viewport);
            let accent = Rect {
                w: ACCENT_WIDTH,
                ..row
            };
            match control.kind {
                ControlKind::Toggle { get, .. } => {
                    rects.push((accent, TOGGLE_ACCENT));
                    rects.push((track, TRACK));
                    let mark = if get(settings) { CHECKED } else { TRACK };
                    rects.push((track.inset(4.0), mark));
                }
                ControlKind::Slider { min, max, get, .. } => {
                    rects.push((accent, SLIDER_ACCENT));
                    rects.push((track, TRACK));
                    let t = if max > min {
                        ((get(settings) - min) / (max - min)).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    rects.push((
                        Rect {
                            w: track.w * t,
                            ..track
                        },
                        FILL,
                    ));
                }
            }
        }
        rects
            .into_iter()
            .flat_map(|(rect, colour)| quad(rect, colour, viewport))
            .collect()
    }
}

/// Index list for `count` quads laid out as in [`DebugPanel::quads`].
pub fn quad_indices(count: usize) -> Vec<u16> {
    (0..count as u16)
        .flat_map(|q| {
            let b = q * 4;
            [b, b + 2, b + 1, b + 1, b + 2, b + 3]
        })
        .collect()
}

fn quad(rect: Rect, colour: [f32; 4], viewport: (u32, u32)) -> [PanelVertex; 4] {
    let (w, h) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
    let ndc = |x: f32, y: f32| [x / w * 2.0 - 1.0, 1.0 - y / h * 2.0];
    let vertex = |x: f32, y: f32| PanelVertex {
        position: ndc(x, y),
        colour,
    };
    [
        vertex(rect.x, rect.y),
        vertex(rect.x + rect.w, rect.y),
        vertex(rect.x, rect.y + rect.h),
        vertex(rect.x + rect.w, rect.y + rect.h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: (u32, u32) = (1280, 720);

    fn centre(rect: Rect) -> (f32, f32) {
        (rect.x + rect.w / 2.0, rect.y + rect.h / 2.0)
    }

    fn index_of(panel: &DebugPanel, name: &str) -> usize {
        panel
            .controls()
            .iter()
            .position(|c| c.name == name)
            .unwrap()
    }

    #[test]
    fn bloom_panel_has_the_four_controls_in_order() {
        let panel = DebugPanel::bloom();
        let names: Vec<_> = panel.controls().iter().map(|c| c.name).collect();
        assert_eq!(names, ["enabled", "strength", "radius", "threshold"]);
    }

    #[test]
    fn slider_ends_are_exact() {
        assert_eq!(slider_value(0.0, 2.0, 0.001, 0.0), 0.0);
        assert_eq!(slider_value(0.0, 2.0, 0.001, 1.0), 2.0);
        assert_eq!(slider_value(0.0, 1.0, 0.001, -3.0), 0.0);
        assert_eq!(slider_value(0.0, 1.0, 0.001, 7.0), 1.0);
    }

    #[test]
    fn slider_snaps_to_step() {
        let v = slider_value(0.0, 2.0, 0.001, 0.123_456);
        assert!((v - 0.247).abs() < 1e-5, "{v}");
        let v = slider_value(0.0, 1.0, 0.25, 0.3);
        assert_eq!(v, 0.25);
    }

    #[test]
    fn dragging_past_either_end_sets_the_bound() {
        for (name, max) in [("strength", 2.0), ("radius", 2.0), ("threshold", 1.0)] {
            let mut panel = DebugPanel::bloom();
            let mut settings = BloomSettings::default();
            let index = index_of(&panel, name);
            let track = panel.track(index, VIEWPORT);
            let ControlKind::Slider { get, .. } = panel.controls()[index].kind else {
                panic!("{name} is not a slider");
            };

            panel.pointer_down(centre(track), VIEWPORT, &mut settings);
            assert!(panel.is_capturing());
            panel.pointer_moved((track.x + track.w + 500.0, track.y), VIEWPORT, &mut settings);
            assert_eq!(get(&settings), max, "{name} max");

            panel.pointer_moved((0.0, track.y), VIEWPORT, &mut settings);
            assert_eq!(get(&settings), 0.0, "{name} min");
            panel.pointer_up();
            assert!(!panel.is_capturing());
        }
    }

    #[test]
    fn clicking_the_toggle_flips_enabled() {
        let mut panel = DebugPanel::bloom();
        let mut settings = BloomSettings::default();
        let row = panel.row(index_of(&panel, "enabled"), VIEWPORT);

        assert!(panel.pointer_down(centre(row), VIEWPORT, &mut settings));
        assert!(!settings.enabled);
        panel.pointer_up();
        assert!(panel.pointer_down(centre(row), VIEWPORT, &mut settings));
        assert!(settings.enabled);
    }

    #[test]
    fn other_settings_are_left_alone() {
        let mut panel = DebugPanel::bloom();
        let mut settings = BloomSettings::default();
        let track = panel.track(index_of(&panel, "radius"), VIEWPORT);
        panel.pointer_down((track.x + track.w, centre(track).1), VIEWPORT, &mut settings);
        assert_eq!(
            settings,
            BloomSettings {
                radius: 2.0,
                ..Default::default()
            }
        );
    }

    #[test]
    fn clicks_outside_are_ignored() {
        let mut panel = DebugPanel::bloom();
        let mut settings = BloomSettings::default();
        assert!(!panel.pointer_down((10.0, 400.0), VIEWPORT, &mut settings));
        assert!(!panel.is_capturing());
        assert_eq!(settings, BloomSettings::default());
    }

    #[test]
    fn panel_sits_in_the_top_right_corner() {
        let panel = DebugPanel::bloom();
        let bounds = panel.bounds(VIEWPORT);
        assert_eq!(bounds.y, 0.0);
        assert_eq!(bounds.x + bounds.w + MARGIN_RIGHT, VIEWPORT.0 as f32);
        assert_eq!(bounds.h, 4.0 * ROW_HEIGHT);
    }

    #[test]
    fn labels_name_every_row_and_show_slider_values() {
        let panel = DebugPanel::bloom();
        let settings = BloomSettings::default();
        let texts: Vec<_> = panel
            .labels(&settings, VIEWPORT)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(
            texts,
            ["enabled", "strength", "1.500", "radius", "0.330", "threshold", "0.900"]
        );
    }

    #[test]
    fn labels_stay_clear_of_the_slider_tracks() {
        let panel = DebugPanel::bloom();
        let labels = panel.labels(&BloomSettings::default(), VIEWPORT);
        for index in 1..panel.controls().len() {
            let track = panel.track(index, VIEWPORT);
            for label in labels.iter().filter(|l| l.rect.y == panel.row(index, VIEWPORT).y) {
                let right = label.rect.x + label.rect.w;
                assert!(
                    right <= track.x || label.rect.x >= track.x + track.w,
                    "{} overlaps the track",
                    label.text
                );
            }
        }
    }

    #[test]
    fn quads_match_the_declared_count() {
        let panel = DebugPanel::bloom();
        let vertices = panel.quads(&BloomSettings::default(), VIEWPORT);
        assert_eq!(vertices.len(), 4 * panel.quad_count());
        assert_eq!(quad_indices(panel.quad_count()).len(), 6 * panel.quad_count());
        for v in vertices {
            assert!(v.position[0] >= -1.0 && v.position[0] <= 1.0);
            assert!(v.position[1] >= -1.0 && v.position[1] <= 1.0);
        }
    }
}
