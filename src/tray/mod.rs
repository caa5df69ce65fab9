//! Front-ends that render the [`MenuModel`] and turn user actions into [`AppEvent`]s.
//!
//! Linux gets a StatusNotifierItem through ksni, macOS and Windows a menu-bar item
//! through tray-icon. The console front-end is used on request or when neither can
//! start.

mod console;
#[cfg(any(target_os = "macos", target_os = "windows"))]
mod menu_bar;
#[cfg(target_os = "linux")]
mod status_notifier;

pub use console::{ConsoleCommand, ConsoleReply, ConsoleView, parse_command, render_listing, respond};

use crate::app::AppEvent;
use crate::menu::{MenuModel, TrayGlyph};
use anyhow::Result;
use std::sync::mpsc::Sender;
use std::time::Duration;
use tracing::warn;

/// Edge length of the generated tray icons.
pub(crate) const ICON_SIZE: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontEnd {
    /// Native tray where available, console otherwise.
    #[default]
    Auto,
    Console,
}

pub trait TrayView {
    /// Render the latest menu state.
    fn show(&mut self, menu: &MenuModel);

    /// Give a toolkit that lives on the calling thread a turn. Returns how long the
    /// event loop may block before pumping again, or `None` when the toolkit runs on
    /// its own thread.
    fn pump(&mut self) -> Option<Duration> {
        None
    }

    fn close(&mut self) {}
}

pub fn spawn(front_end: FrontEnd, menu: &MenuModel, events: Sender<AppEvent>) -> Box<dyn TrayView> {
    if front_end == FrontEnd::Auto {
        match spawn_native(menu, events.clone()) {
            Ok(view) => return view,
            Err(err) => warn!("tray unavailable, using console: {err:#}"),
        }
    }
    Box::new(ConsoleView::spawn(menu, events))
}

#[cfg(target_os = "linux")]
fn spawn_native(menu: &MenuModel, events: Sender<AppEvent>) -> Result<Box<dyn TrayView>> {
    Ok(Box::new(status_notifier::StatusNotifierView::spawn(
        menu, events,
    )?))
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn spawn_native(menu: &MenuModel, events: Sender<AppEvent>) -> Result<Box<dyn TrayView>> {
    Ok(Box::new(menu_bar::MenuBarView::spawn(menu, events)?))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn spawn_native(_menu: &MenuModel, _events: Sender<AppEvent>) -> Result<Box<dyn TrayView>> {
    anyhow::bail!("no system tray support on this platform")
}

/// RGBA pixels for `glyph`: a filled disc while playing, a ring when idle.
pub(crate) fn glyph_pixels(glyph: TrayGlyph, size: u32) -> Vec<u8> {
    let mut rgba = vec![0u8; (size * size * 4) as usize];
    let center = size as f32 / 2.0 - 0.5;
    let outer = size as f32 / 2.0 - 2.0;
    let inner = match glyph {
        TrayGlyph::Playing => 0.0,
        TrayGlyph::Idle => outer - 2.5,
    };

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < outer && dist >= inner {
                let idx = ((y * size + x) * 4) as usize;
                rgba[idx..idx + 4].copy_from_slice(&[0xd8, 0xd8, 0xd8, 0xff]);
            }
        }
    }
    rgba
}
