//! Menu-bar item for macOS and Windows.
//!
//! tray-icon needs a platform event loop on the main thread. The app's own loop
//! already owns that thread, so winit is pumped from [`TrayView::pump`] instead of
//! taking control with `run_app`.

use super::{ICON_SIZE, TrayView, glyph_pixels};
use crate::app::AppEvent;
use crate::menu::{
    MenuKey, MenuModel, MenuNode, QUIT_LABEL, TrayGlyph, VOLUME_LABEL, VolumeControl,
};
use anyhow::{Context, Result, anyhow};
use muda::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu};
use std::sync::mpsc::Sender;
use std::time::Duration;
use tracing::{debug, warn};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};
use winit::application::ApplicationHandler;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// Native items that change after the menu is built.
struct Widgets {
    tracks: Vec<CheckMenuItem>,
    volume: Option<Submenu>,
    volume_steps: Vec<CheckMenuItem>,
    toggle: Option<MenuItem>,
    glyph: TrayGlyph,
}

struct MenuBar {
    model: MenuModel,
    tray: Option<(TrayIcon, Widgets)>,
    startup_error: Option<anyhow::Error>,
}

impl ApplicationHandler for MenuBar {
    // macOS only accepts status items once the event loop is running.
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if matches!(cause, StartCause::Init) && self.tray.is_none() {
            match build_tray(&self.model) {
                Ok(tray) => self.tray = Some(tray),
                Err(err) => self.startup_error = Some(err),
            }
        }
    }

    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, _event: WindowEvent) {}
}

pub(super) struct MenuBarView {
    event_loop: EventLoop<()>,
    bar: MenuBar,
    events: Sender<AppEvent>,
}

impl MenuBarView {
    pub(super) fn spawn(menu: &MenuModel, events: Sender<AppEvent>) -> Result<Self> {
        let mut view = Self {
            event_loop: build_event_loop()?,
            bar: MenuBar {
                model: menu.clone(),
                tray: None,
                startup_error: None,
            },
            events,
        };

        view.pump_platform();
        if let Some(err) = view.bar.startup_error.take() {
            return Err(err);
        }
        if view.bar.tray.is_none() {
            return Err(anyhow!("menu bar item was not created"));
        }
        Ok(view)
    }

    fn pump_platform(&mut self) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.bar);
        if let PumpStatus::Exit(code) = status {
            debug!(code, "platform event loop exited");
            self.emit(AppEvent::Quit);
        }

        while let Ok(event) = MenuEvent::receiver().try_recv() {
            let Some(key) = MenuKey::parse(&event.id().0) else {
                continue;
            };
            if let Some(action) = self.bar.model.action(key) {
                self.emit(action);
            }
        }
    }

    fn emit(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            warn!("event loop is gone, dropping menu action");
        }
    }
}

impl TrayView for MenuBarView {
    fn show(&mut self, menu: &MenuModel) {
        self.bar.model = menu.clone();
        if let Some((tray, widgets)) = self.bar.tray.as_mut()
            && let Err(err) = apply(tray, widgets, menu)
        {
            warn!("menu bar update failed: {err:#}");
        }
    }

    fn pump(&mut self) -> Option<Duration> {
        self.pump_platform();
        Some(PUMP_INTERVAL)
    }

    fn close(&mut self) {
        self.bar.tray = None;
        self.pump_platform();
    }
}

fn build_event_loop() -> Result<EventLoop<()>> {
    let mut builder = EventLoop::builder();
    #[cfg(target_os = "macos")]
    {
        use winit::platform::macos::{ActivationPolicy, EventLoopBuilderExtMacOS};
        // No dock icon, menu bar only.
        builder.with_activation_policy(ActivationPolicy::Accessory);
    }
    builder
        .build()
        .context("failed to create the platform event loop")
}

fn glyph_icon(glyph: TrayGlyph) -> Result<Icon> {
    Icon::from_rgba(glyph_pixels(glyph, ICON_SIZE), ICON_SIZE, ICON_SIZE)
        .context("failed to build tray icon")
}

fn percent(value: f32) -> u16 {
    (value * 100.0).round() as u16
}

fn volume_label(volume: &VolumeControl) -> String {
    format!("{VOLUME_LABEL}: {}%", percent(volume.value))
}

fn build_tray(model: &MenuModel) -> Result<(TrayIcon, Widgets)> {
    let menu = Menu::new();
    let mut widgets = Widgets {
        tracks: Vec::new(),
        volume: None,
        volume_steps: Vec::new(),
        toggle: None,
        glyph: model.glyph,
    };

    for node in &model.nodes {
        match node {
            MenuNode::Submenu { label, children } => {
                let submenu = Submenu::new(label, true);
                for child in children {
                    let MenuNode::Track(entry) = child else {
                        continue;
                    };
                    let key = MenuKey::Track(widgets.tracks.len());
                    let item = CheckMenuItem::with_id(
                        MenuId::new(key.id()),
                        &entry.label,
                        true,
                        entry.checked,
                        None,
                    );
                    submenu.append(&item).context("failed to add track item")?;
                    widgets.tracks.push(item);
                }
                menu.append(&submenu).context("failed to add category")?;
            }
            MenuNode::Volume(volume) => {
                let submenu = Submenu::new(volume_label(volume), true);
                let current = volume.current_step();
                for step in 0..=volume.step_count() {
                    let item = CheckMenuItem::with_id(
                        MenuId::new(MenuKey::VolumeStep(step).id()),
                        format!("{}%", percent(volume.value_at_step(step))),
                        true,
                        step == current,
                        None,
                    );
                    submenu.append(&item).context("failed to add volume step")?;
                    widgets.volume_steps.push(item);
                }
                menu.append(&submenu).context("failed to add volume menu")?;
                widgets.volume = Some(submenu);
            }
            MenuNode::Toggle(toggle) => {
                let item = MenuItem::with_id(
                    MenuId::new(MenuKey::Toggle.id()),
                    &toggle.label,
                    toggle.enabled,
                    None,
                );
                menu.append(&item).context("failed to add pause item")?;
                widgets.toggle = Some(item);
            }
            MenuNode::Quit => {
                let item =
                    MenuItem::with_id(MenuId::new(MenuKey::Quit.id()), QUIT_LABEL, true, None);
                menu.append(&item).context("failed to add quit item")?;
            }
            MenuNode::Separator => {
                menu.append(&PredefinedMenuItem::separator())
                    .context("failed to add separator")?;
            }
        }
    }

    let builder = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(&model.tooltip)
        .with_icon(glyph_icon(model.glyph)?);
    #[cfg(target_os = "macos")]
    let builder = builder.with_icon_as_template(true);
    let tray = builder.build().context("failed to create tray icon")?;

    Ok((tray, widgets))
}

/// Bring the native items in line with `menu`. muda flips a check item on click, so
/// every checkmark is written back from the model.
fn apply(tray: &TrayIcon, widgets: &mut Widgets, menu: &MenuModel) -> Result<()> {
    for (item, entry) in widgets.tracks.iter().zip(menu.track_entries()) {
        item.set_checked(entry.checked);
    }

    if let Some(volume) = menu.volume() {
        let current = usize::from(volume.current_step());
        for (step, item) in widgets.volume_steps.iter().enumerate() {
            item.set_checked(step == current);
        }
        if let Some(submenu) = &widgets.volume {
            submenu.set_text(volume_label(volume));
        }
    }

    if let (Some(item), Some(toggle)) = (&widgets.toggle, menu.toggle()) {
        item.set_enabled(toggle.enabled);
        item.set_text(&toggle.label);
    }

    if widgets.glyph != menu.glyph {
        tray.set_icon(Some(glyph_icon(menu.glyph)?))
            .context("failed to switch tray icon")?;
        widgets.glyph = menu.glyph;
    }
    tray.set_tooltip(Some(&menu.tooltip))
        .context("failed to set tooltip")?;
    Ok(())
}
