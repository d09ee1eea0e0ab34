use crate::{Key, MouseButton, WindowSystem};
use glam::DVec2;
use ink_common::Direction;
use serde::{Deserialize, Serialize};

/// A high-level action produced from raw input.
///
/// The scene consumes actions, never raw key codes, so rebinding keys never
/// touches frame logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Request that the window close at the next frame boundary.
    Quit,
    /// Move the camera one step (scaled by delta time) in a direction.
    MoveCamera(Direction),
    /// Place the light at the camera position.
    MoveLightToCamera,
}

/// Maps keys and mouse buttons to [`Action`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub quit: Key,
    pub forward: Key,
    pub backward: Key,
    pub left: Key,
    pub right: Key,
    pub up: Key,
    pub down: Key,
    pub light_to_camera: MouseButton,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: Key::Escape,
            forward: Key::W,
            backward: Key::S,
            left: Key::A,
            right: Key::D,
            up: Key::Space,
            down: Key::LeftShift,
            light_to_camera: MouseButton::Left,
        }
    }
}

impl KeyBindings {
    /// Every action whose trigger is currently held, in a stable order:
    /// quit, camera movement, then mouse actions.
    pub fn active_actions<W: WindowSystem + ?Sized>(&self, window: &W) -> Vec<Action> {
        let mut actions = Vec::new();
        if window.is_key_pressed(self.quit) {
            actions.push(Action::Quit);
        }
        let movement = [
            (self.forward, Direction::Forward),
            (self.backward, Direction::Backward),
            (self.left, Direction::Left),
            (self.right, Direction::Right),
            (self.down, Direction::Down),
            (self.up, Direction::Up),
        ];
        for (key, direction) in movement {
            if window.is_key_pressed(key) {
                actions.push(Action::MoveCamera(direction));
            }
        }
        if window.is_mouse_button_pressed(self.light_to_camera) {
            actions.push(Action::MoveLightToCamera);
        }
        actions
    }
}

/// Turns absolute cursor positions into per-frame offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseTracker {
    last: Option<DVec2>,
}

impl MouseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset from the previous sample. The first sample only records the
    /// position and returns zero.
    pub fn sample(&mut self, position: DVec2) -> DVec2 {
        let last = self.last.replace(position).unwrap_or(position);
        position - last
    }

    /// Forget the last position; the next sample yields zero again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
