use crate::menu::{MenuModel, TOGGLE_LABEL, TrayGlyph};
use crate::model::PlaybackState;

/// Reflect `state` into the menu: tray glyph, the single checked track, the
/// pause/resume entry, the volume control and the tooltip.
pub fn sync(state: &PlaybackState, menu: &mut MenuModel) {
    menu.glyph = if state.is_playing {
        TrayGlyph::Playing
    } else {
        TrayGlyph::Idle
    };

    let mut current_label = None;
    for entry in menu.track_entries_mut() {
        entry.checked = state.current_track.as_ref() == Some(&entry.id);
        if entry.checked {
            current_label = Some(entry.label.clone());
        }
    }

    if let Some(toggle) = menu.toggle_mut() {
        toggle.enabled = state.last_track.is_some();
        toggle.label = String::from(TOGGLE_LABEL);
    }

    if let Some(volume) = menu.volume_mut() {
        volume.value = state.volume;
    }

    menu.tooltip = match (current_label, state.is_playing) {
        (Some(label), true) => format!("{} - {label}", crate::APP_NAME),
        (Some(label), false) => format!("{} - {label} (paused)", crate::APP_NAME),
        (None, _) => String::from(crate::APP_NAME),
    };
}
