//! Menu model shown by the tray.
//!
//! The model is plain data: each actionable node knows which [`AppEvent`] it raises.
//! Front-ends tag the items they render with a [`MenuKey`] and resolve clicks through
//! [`MenuModel::action`], so every surface shares one binding.

use crate::app::AppEvent;
use crate::catalog::Catalog;
use crate::model::{TrackId, clamp_volume};

pub const TOGGLE_LABEL: &str = "Pause";
pub const QUIT_LABEL: &str = "Quit";
pub const VOLUME_LABEL: &str = "Volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrayGlyph {
    #[default]
    Idle,
    Playing,
}

impl TrayGlyph {
    /// Freedesktop icon name for status notifier hosts.
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Idle => "audio-volume-muted",
            Self::Playing => "audio-volume-high",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Idle => "[idle]",
            Self::Playing => "[playing]",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    pub id: TrackId,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeControl {
    pub value: f32,
    /// Number of discrete positions above zero that a stepped front-end offers.
    pub steps: u8,
}

impl VolumeControl {
    pub fn step_count(&self) -> u8 {
        self.steps.max(1)
    }

    /// Position of `value` on the stepped scale, rounded to the nearest step.
    pub fn current_step(&self) -> u8 {
        let steps = f32::from(self.step_count());
        (clamp_volume(self.value) * steps).round() as u8
    }

    pub fn value_at_step(&self, step: u8) -> f32 {
        let step = step.min(self.step_count());
        f32::from(step) / f32::from(self.step_count())
    }

    pub fn event_for_step(&self, step: u8) -> AppEvent {
        AppEvent::VolumeChanged(self.value_at_step(step))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleEntry {
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuNode {
    Submenu {
        label: String,
        children: Vec<MenuNode>,
    },
    Track(TrackEntry),
    Volume(VolumeControl),
    Toggle(ToggleEntry),
    Quit,
    Separator,
}

impl MenuNode {
    /// Event raised when this node is activated. The volume control reports through
    /// [`VolumeControl::event_for_step`] instead.
    pub fn action(&self) -> Option<AppEvent> {
        match self {
            Self::Track(entry) => Some(AppEvent::TrackSelected(entry.id.clone())),
            Self::Toggle(toggle) if toggle.enabled => Some(AppEvent::ToggleRequested),
            Self::Quit => Some(AppEvent::Quit),
            Self::Toggle(_) | Self::Submenu { .. } | Self::Volume(_) | Self::Separator => None,
        }
    }
}

/// Stable address of an actionable item, independent of how a front-end draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKey {
    /// Position among all track entries, in menu order.
    Track(usize),
    VolumeStep(u8),
    Toggle,
    Quit,
}

impl MenuKey {
    pub fn id(self) -> String {
        match self {
            Self::Track(index) => format!("track:{index}"),
            Self::VolumeStep(step) => format!("volume:{step}"),
            Self::Toggle => String::from("toggle"),
            Self::Quit => String::from("quit"),
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "toggle" => return Some(Self::Toggle),
            "quit" => return Some(Self::Quit),
            _ => {}
        }
        let (kind, value) = id.split_once(':')?;
        match kind {
            "track" => value.parse().ok().map(Self::Track),
            "volume" => value.parse().ok().map(Self::VolumeStep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuModel {
    pub nodes: Vec<MenuNode>,
    pub glyph: TrayGlyph,
    pub tooltip: String,
}

impl MenuModel {
    pub fn track_entries(&self) -> impl Iterator<Item = &TrackEntry> {
        self.nodes.iter().flat_map(|node| match node {
            MenuNode::Submenu { children, .. } => children
                .iter()
                .filter_map(|child| match child {
                    MenuNode::Track(entry) => Some(entry),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }

    pub fn track_entries_mut(&mut self) -> impl Iterator<Item = &mut TrackEntry> {
        self.nodes.iter_mut().flat_map(|node| match node {
            MenuNode::Submenu { children, .. } => children
                .iter_mut()
                .filter_map(|child| match child {
                    MenuNode::Track(entry) => Some(entry),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }

    /// Event raised by activating `key` in the current state. Disabled or missing
    /// items raise nothing.
    pub fn action(&self, key: MenuKey) -> Option<AppEvent> {
        match key {
            MenuKey::Track(index) => self
                .nodes
                .iter()
                .flat_map(|node| match node {
                    MenuNode::Submenu { children, .. } => children.iter().collect::<Vec<_>>(),
                    _ => Vec::new(),
                })
                .filter(|node| matches!(node, MenuNode::Track(_)))
                .nth(index)
                .and_then(MenuNode::action),
            MenuKey::VolumeStep(step) => self
                .volume()
                .filter(|volume| step <= volume.step_count())
                .map(|volume| volume.event_for_step(step)),
            MenuKey::Toggle => self
                .nodes
                .iter()
                .find(|node| matches!(node, MenuNode::Toggle(_)))
                .and_then(MenuNode::action),
            MenuKey::Quit => self
                .nodes
                .iter()
                .find(|node| matches!(node, MenuNode::Quit))
                .and_then(MenuNode::action),
        }
    }

    pub fn checked_entries(&self) -> Vec<&TrackEntry> {
        self.track_entries().filter(|entry| entry.checked).collect()
    }

    pub fn volume(&self) -> Option<&VolumeControl> {
        self.nodes.iter().find_map(|node| match node {
            MenuNode::Volume(volume) => Some(volume),
            _ => None,
        })
    }

    pub fn volume_mut(&mut self) -> Option<&mut VolumeControl> {
        self.nodes.iter_mut().find_map(|node| match node {
            MenuNode::Volume(volume) => Some(volume),
            _ => None,
        })
    }

    pub fn toggle(&self) -> Option<&ToggleEntry> {
        self.nodes.iter().find_map(|node| match node {
            MenuNode::Toggle(toggle) => Some(toggle),
            _ => None,
        })
    }

    pub fn toggle_mut(&mut self) -> Option<&mut ToggleEntry> {
        self.nodes.iter_mut().find_map(|node| match node {
            MenuNode::Toggle(toggle) => Some(toggle),
            _ => None,
        })
    }
}

/// Build a fresh menu: one submenu per category, then volume, pause/resume and quit.
pub fn build_menu(catalog: &Catalog, volume: f32, volume_steps: u8) -> MenuModel {
    let mut nodes: Vec<MenuNode> = catalog
        .categories()
        .iter()
        .map(|category| MenuNode::Submenu {
            label: category.name.clone(),
            children: category
                .tracks
                .iter()
                .map(|track| {
                    MenuNode::Track(TrackEntry {
                        id: track.id.clone(),
                        label: track.display_name.clone(),
                        checked: false,
                    })
                })
                .collect(),
        })
        .collect();

    nodes.push(MenuNode::Separator);
    nodes.push(MenuNode::Volume(VolumeControl {
        value: clamp_volume(volume),
        steps: volume_steps.max(1),
    }));
    nodes.push(MenuNode::Separator);
    nodes.push(MenuNode::Toggle(ToggleEntry {
        label: String::from(TOGGLE_LABEL),
        enabled: false,
    }));
    nodes.push(MenuNode::Separator);
    nodes.push(MenuNode::Quit);

    MenuModel {
        nodes,
        glyph: TrayGlyph::Idle,
        tooltip: String::from(crate::APP_NAME),
    }
}
