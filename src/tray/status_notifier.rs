use super::{ICON_SIZE, TrayView, glyph_pixels};
use crate::app::AppEvent;
use crate::menu::{MenuKey, MenuModel, MenuNode, QUIT_LABEL, VOLUME_LABEL};
use anyhow::{Context, Result};
use ksni::blocking::{Handle, TrayMethods};
use ksni::menu::{CheckmarkItem, RadioGroup, RadioItem, StandardItem, SubMenu};
use ksni::{Icon, MenuItem, ToolTip, Tray};
use std::sync::mpsc::Sender;
use tracing::warn;

struct SoundTray {
    menu: MenuModel,
    events: Sender<AppEvent>,
}

impl SoundTray {
    fn trigger(&self, key: MenuKey) {
        let Some(event) = self.menu.action(key) else {
            return;
        };
        if self.events.send(event).is_err() {
            warn!("event loop is gone, dropping tray action");
        }
    }
}

impl Tray for SoundTray {
    // NOTE: some hosts misbehave without a stable id.
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").into()
    }

    fn title(&self) -> String {
        crate::APP_NAME.into()
    }

    fn icon_name(&self) -> String {
        self.menu.glyph.icon_name().into()
    }

    /// Used by hosts whose icon theme lacks the named icon.
    fn icon_pixmap(&self) -> Vec<Icon> {
        // StatusNotifierItem wants ARGB32 in network byte order.
        let data = glyph_pixels(self.menu.glyph, ICON_SIZE)
            .chunks_exact(4)
            .flat_map(|px| [px[3], px[0], px[1], px[2]])
            .collect();
        vec![Icon {
            width: ICON_SIZE as i32,
            height: ICON_SIZE as i32,
            data,
        }]
    }

    fn tool_tip(&self) -> ToolTip {
        ToolTip {
            title: self.menu.tooltip.clone(),
            ..Default::default()
        }
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.trigger(MenuKey::Toggle);
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut next_track = 0;
        self.menu
            .nodes
            .iter()
            .map(|node| render_node(node, &mut next_track))
            .collect()
    }
}

fn render_node(node: &MenuNode, next_track: &mut usize) -> MenuItem<SoundTray> {
    match node {
        MenuNode::Submenu { label, children } => SubMenu {
            label: label.clone(),
            submenu: children
                .iter()
                .map(|child| render_node(child, next_track))
                .collect(),
            ..Default::default()
        }
        .into(),
        MenuNode::Track(entry) => {
            let key = MenuKey::Track(*next_track);
            *next_track += 1;
            CheckmarkItem {
                label: entry.label.clone(),
                checked: entry.checked,
                activate: Box::new(move |tray: &mut SoundTray| tray.trigger(key)),
                ..Default::default()
            }
            .into()
        }
        MenuNode::Volume(volume) => {
            let options = (0..=volume.step_count())
                .map(|step| RadioItem {
                    label: format!("{}%", (volume.value_at_step(step) * 100.0).round() as u16),
                    ..Default::default()
                })
                .collect();
            SubMenu {
                label: format!(
                    "{VOLUME_LABEL}: {}%",
                    (volume.value * 100.0).round() as u16
                ),
                submenu: vec![
                    RadioGroup {
                        selected: usize::from(volume.current_step()),
                        select: Box::new(|tray: &mut SoundTray, step: usize| {
                            if let Ok(step) = u8::try_from(step) {
                                tray.trigger(MenuKey::VolumeStep(step));
                            }
                        }),
                        options,
                    }
                    .into(),
                ],
                ..Default::default()
            }
            .into()
        }
        MenuNode::Toggle(toggle) => StandardItem {
            label: toggle.label.clone(),
            enabled: toggle.enabled,
            activate: Box::new(|tray: &mut SoundTray| tray.trigger(MenuKey::Toggle)),
            ..Default::default()
        }
        .into(),
        MenuNode::Quit => StandardItem {
            label: QUIT_LABEL.into(),
            icon_name: "application-exit".into(),
            activate: Box::new(|tray: &mut SoundTray| tray.trigger(MenuKey::Quit)),
            ..Default::default()
        }
        .into(),
        MenuNode::Separator => MenuItem::Separator,
    }
}

pub(super) struct StatusNotifierView {
    handle: Handle<SoundTray>,
}

impl StatusNotifierView {
    pub(super) fn spawn(menu: &MenuModel, events: Sender<AppEvent>) -> Result<Self> {
        let tray = SoundTray {
            menu: menu.clone(),
            events,
        };
        let handle = tray
            .spawn()
            .context("failed to register status notifier item")?;
        Ok(Self { handle })
    }
}

impl TrayView for StatusNotifierView {
    fn show(&mut self, menu: &MenuModel) {
        let menu = menu.clone();
        let _ = self.handle.update(move |tray: &mut SoundTray| tray.menu = menu);
    }

    fn close(&mut self) {
        let _ = self.handle.shutdown();
    }
}
