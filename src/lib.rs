pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod indicator;
pub mod logging;
pub mod menu;
pub mod model;
pub mod naming;
pub mod tray;

/// Name shown in the tray title and tooltip.
pub const APP_NAME: &str = "lull";
