use glass_bloom::{
    gui::{ControlKind, DebugPanel},
    post::BloomSettings,
};

const VIEWPORT: (u32, u32) = (1280, 720);

fn slider_rows(panel: &DebugPanel) -> Vec<(usize, f32, f32, fn(&BloomSettings) -> f32)> {
    panel
        .controls()
        .iter()
        .enumerate()
        .filter_map(|(i, control)| match control.kind {
            ControlKind::Slider { min, max, get, .. } => Some((i, min, max, get)),
            ControlKind::Toggle { .. } => None,
        })
        .collect()
}

fn mid_row(panel: &DebugPanel, index: usize) -> f32 {
    let row = panel.row(index, VIEWPORT);
    row.y + row.h / 2.0
}

#[test]
fn every_slider_reaches_both_bounds_exactly() {
    let mut panel = DebugPanel::bloom();
    let mut settings = BloomSettings::default();
    let rows = slider_rows(&panel);
    assert_eq!(rows.len(), 3);

    for (index, min, max, get) in rows {
        let track = panel.track(index, VIEWPORT);
        let y = mid_row(&panel, index);

        panel.pointer_down((track.x + track.w / 2.0, y), VIEWPORT, &mut settings);
        assert!(panel.is_capturing());
        // Far outside the panel, but the drag keeps going
        panel.pointer_moved((-1000.0, y), VIEWPORT, &mut settings);
        assert_eq!(get(&settings), min);
        panel.pointer_moved((10_000.0, y), VIEWPORT, &mut settings);
        assert_eq!(get(&settings), max);
        panel.pointer_up();
        assert!(!panel.is_capturing());
    }

    assert_eq!(settings.strength, 2.0);
    assert_eq!(settings.radius, 2.0);
    assert_eq!(settings.threshold, 1.0);
    assert!(settings.enabled);
    assert_eq!(settings.exposure, 1.0);
}

#[test]
fn the_panel_always_shows_the_current_values() {
    let panel = DebugPanel::bloom();
    let mut settings = BloomSettings::default();
    let before = panel.quads(&settings, VIEWPORT);
    settings.strength = 0.0;
    let after = panel.quads(&settings, VIEWPORT);
    assert_eq!(before.len(), after.len());
    assert_ne!(before, after);
}

#[test]
fn toggling_twice_restores_enabled() {
    let mut panel = DebugPanel::bloom();
    let mut settings = BloomSettings::default();
    let toggle = panel.track(0, VIEWPORT);
    let centre = (toggle.x + toggle.w / 2.0, toggle.y + toggle.h / 2.0);

    assert!(panel.pointer_down(centre, VIEWPORT, &mut settings));
    panel.pointer_up();
    assert!(!settings.enabled);
    assert!(panel.pointer_down(centre, VIEWPORT, &mut settings));
    panel.pointer_up();
    assert!(settings.enabled);
}
