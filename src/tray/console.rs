use super::TrayView;
use crate::app::AppEvent;
use crate::menu::{MenuKey, MenuModel, MenuNode};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Activate(MenuKey),
    SetVolume(f32),
    List,
    Help,
}

const CONSOLE_HELP: &str =
    "Commands: <n> | play <n> | vol <0-100> | p (pause/resume) | list | help | q (quit)";

/// Parse one console line. Tracks are numbered from 1 in menu order.
pub fn parse_command(line: &str, track_count: usize) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();

    let pick = |raw: &str| -> Result<ConsoleCommand, String> {
        let number: usize = raw
            .parse()
            .map_err(|_| format!("not a track number: {raw}"))?;
        match number.checked_sub(1) {
            Some(index) if index < track_count => Ok(ConsoleCommand::Activate(MenuKey::Track(index))),
            _ => Err(format!("no track number {number}")),
        }
    };

    match command.as_str() {
        "p" | "pause" | "resume" | "toggle" => Ok(ConsoleCommand::Activate(MenuKey::Toggle)),
        "q" | "quit" | "exit" => Ok(ConsoleCommand::Activate(MenuKey::Quit)),
        "list" | "ls" => Ok(ConsoleCommand::List),
        "help" | "h" | "?" => Ok(ConsoleCommand::Help),
        "play" => pick(argument.ok_or("usage: play <n>")?),
        "vol" | "volume" => {
            let raw = argument.ok_or("usage: vol <0-100>")?;
            let percent: f32 = raw
                .trim_end_matches('%')
                .parse()
                .map_err(|_| format!("not a volume: {raw}"))?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(format!("volume out of range: {raw}"));
            }
            Ok(ConsoleCommand::SetVolume(percent / 100.0))
        }
        "" => Err(String::from(CONSOLE_HELP)),
        other if other.chars().all(|ch| ch.is_ascii_digit()) => pick(other),
        other => Err(format!("unknown command {other}. {CONSOLE_HELP}")),
    }
}

/// What the console does with a line: post an event or print something back.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleReply {
    Send(AppEvent),
    Print(String),
}

/// Resolve `line` against the menu as it is shown right now, so a disabled item does
/// nothing here either.
pub fn respond(line: &str, menu: &MenuModel) -> ConsoleReply {
    let command = match parse_command(line, menu.track_entries().count()) {
        Ok(command) => command,
        Err(message) => return ConsoleReply::Print(message),
    };
    match command {
        ConsoleCommand::Activate(key) => match menu.action(key) {
            Some(event) => ConsoleReply::Send(event),
            None => ConsoleReply::Print(String::from("nothing to pause or resume yet")),
        },
        ConsoleCommand::SetVolume(volume) => ConsoleReply::Send(AppEvent::VolumeChanged(volume)),
        ConsoleCommand::List => ConsoleReply::Print(render_listing(menu)),
        ConsoleCommand::Help => ConsoleReply::Print(String::from(CONSOLE_HELP)),
    }
}

/// Numbered menu listing for the console.
pub fn render_listing(menu: &MenuModel) -> String {
    let mut out = String::new();
    let mut number = 0;
    for node in &menu.nodes {
        match node {
            MenuNode::Submenu { label, children } => {
                out.push_str(&format!("{label}\n"));
                for child in children {
                    if let MenuNode::Track(entry) = child {
                        number += 1;
                        let mark = if entry.checked { '*' } else { ' ' };
                        out.push_str(&format!("  {mark} {number:>2}. {}\n", entry.label));
                    }
                }
            }
            MenuNode::Volume(volume) => {
                out.push_str(&format!(
                    "Volume: {}%\n",
                    (volume.value * 100.0).round() as u16
                ));
            }
            MenuNode::Toggle(toggle) => {
                let state = if toggle.enabled { "" } else { " (disabled)" };
                out.push_str(&format!("{}{state}\n", toggle.label));
            }
            MenuNode::Quit => out.push_str("Quit\n"),
            MenuNode::Track(_) | MenuNode::Separator => {}
        }
    }
    out
}

fn status_line(menu: &MenuModel) -> String {
    let volume = menu
        .volume()
        .map(|volume| (volume.value * 100.0).round() as u16)
        .unwrap_or(100);
    format!("{} {} | volume {volume}%", menu.glyph.symbol(), menu.tooltip)
}

/// Line-oriented front-end on stdin/stdout.
pub struct ConsoleView {
    shown: Arc<Mutex<MenuModel>>,
    last_status: Option<String>,
}

impl ConsoleView {
    pub fn spawn(menu: &MenuModel, events: Sender<AppEvent>) -> Self {
        let shown = Arc::new(Mutex::new(menu.clone()));
        let reader_menu = Arc::clone(&shown);

        let spawned = thread::Builder::new()
            .name(String::from("lull-console"))
            .spawn(move || read_commands(&reader_menu, &events));
        if let Err(err) = spawned {
            warn!("failed to start console reader: {err}");
        }

        println!("{}", render_listing(menu));
        println!("{CONSOLE_HELP}");
        Self {
            shown,
            last_status: None,
        }
    }
}

impl TrayView for ConsoleView {
    fn show(&mut self, menu: &MenuModel) {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner) = menu.clone();

        let status = status_line(menu);
        if self.last_status.as_deref() == Some(status.as_str()) {
            return;
        }
        println!("{status}");
        let _ = io::stdout().flush();
        self.last_status = Some(status);
    }
}

fn read_commands(shown: &Mutex<MenuModel>, events: &Sender<AppEvent>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let reply = respond(&line, &shown.lock().unwrap_or_else(PoisonError::into_inner));
        match reply {
            ConsoleReply::Send(event) => {
                let quitting = event == AppEvent::Quit;
                if events.send(event).is_err() || quitting {
                    return;
                }
            }
            ConsoleReply::Print(message) => println!("{message}"),
        }
    }
    let _ = events.send(AppEvent::Quit);
}
