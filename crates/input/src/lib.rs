//! Windowing and input boundary.
//!
//! The scene never talks to a platform window directly. It consumes the
//! [`WindowSystem`] trait, which the desktop app implements over winit and
//! [`HeadlessWindow`] implements for tests and the headless CLI.
//!
//! # Invariants
//! - Input state only changes inside [`WindowSystem::poll_events`].
//! - The resize callback fires from `poll_events`, once per framebuffer resize,
//!   after the new size is visible through [`WindowSystem::framebuffer_size`].
//! - The first mouse sample yields a zero offset.

pub mod action;
pub mod headless;

pub use action::{Action, KeyBindings, MouseTracker};
pub use headless::HeadlessWindow;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Keyboard keys the renderer can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    LeftShift,
    LeftControl,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Parameters for creating the window and its rendering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    /// Requested graphics API version, `(major, minor)`.
    pub api_version: (u32, u32),
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "ink".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            api_version: (4, 4),
        }
    }
}

/// Called with the new framebuffer width and height.
pub type ResizeCallback = Box<dyn FnMut(u32, u32)>;

/// A window with an attached rendering surface and input state.
pub trait WindowSystem {
    /// Seconds since the window was created.
    fn time(&self) -> f64;

    /// Process pending platform events, updating input state and firing the
    /// resize callback.
    fn poll_events(&mut self);

    fn is_key_pressed(&self, key: Key) -> bool;

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool;

    fn cursor_position(&self) -> DVec2;

    /// Current framebuffer size in pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    fn should_close(&self) -> bool;

    fn set_should_close(&mut self, value: bool);

    /// Replace the framebuffer resize callback.
    fn set_framebuffer_resize_callback(&mut self, callback: ResizeCallback);
}

pub fn crate_info() -> &'static str {
    "ink-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }

    #[test]
    fn window_config_fills_missing_fields() {
        let cfg: WindowConfig = serde_yaml::from_str("title: demo\nwidth: 640\n").unwrap();
        assert_eq!(cfg.title, "demo");
        assert_eq!(cfg.width, 640);
        assert_eq!(cfg.height, WindowConfig::default().height);
        assert!(cfg.resizable);
    }

    #[test]
    fn key_names_are_snake_case() {
        let key: Key = serde_yaml::from_str("left_shift").unwrap();
        assert_eq!(key, Key::LeftShift);
    }
}
