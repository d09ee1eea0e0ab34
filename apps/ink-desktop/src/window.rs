use glam::DVec2;
use ink_input::{Key, MouseButton, ResizeCallback, WindowSystem};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window};

enum Pending {
    Key(Key, bool),
    Button(MouseButton, bool),
    Motion(DVec2),
    Resized(u32, u32),
    Close,
}

/// [`WindowSystem`] over a winit window.
///
/// The event loop pushes events in as they arrive; they take effect at the
/// next `poll_events`. The cursor is grabbed and hidden, and its position is
/// a virtual one accumulated from raw mouse motion so mouse look never hits
/// the screen edge.
pub struct WinitWindow {
    window: Arc<Window>,
    start: Instant,
    pending: VecDeque<Pending>,
    keys: HashSet<Key>,
    buttons: HashSet<MouseButton>,
    cursor: DVec2,
    size: (u32, u32),
    should_close: bool,
    on_resize: Option<ResizeCallback>,
}

impl WinitWindow {
    pub fn new(window: Arc<Window>) -> Self {
        let grab = window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
        if let Err(err) = grab {
            tracing::warn!(%err, "cursor grab unavailable");
        }
        window.set_cursor_visible(false);

        let size = window.inner_size();
        Self {
            window,
            start: Instant::now(),
            pending: VecDeque::new(),
            keys: HashSet::new(),
            buttons: HashSet::new(),
            cursor: DVec2::ZERO,
            size: (size.width, size.height),
            should_close: false,
            on_resize: None,
        }
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.pending.push_back(Pending::Close),
            WindowEvent::Resized(size) => {
                self.pending
                    .push_back(Pending::Resized(size.width, size.height));
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(key) = map_key(*code) {
                    self.pending
                        .push_back(Pending::Key(key, *state == ElementState::Pressed));
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = map_button(*button) {
                    self.pending
                        .push_back(Pending::Button(button, *state == ElementState::Pressed));
                }
            }
            _ => {}
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.pending
                .push_back(Pending::Motion(DVec2::new(delta.0, delta.1)));
        }
    }
}

impl WindowSystem for WinitWindow {
    fn time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn poll_events(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            match event {
                Pending::Key(key, true) => {
                    self.keys.insert(key);
                }
                Pending::Key(key, false) => {
                    self.keys.remove(&key);
                }
                Pending::Button(button, true) => {
                    self.buttons.insert(button);
                }
                Pending::Button(button, false) => {
                    self.buttons.remove(&button);
                }
                Pending::Motion(delta) => self.cursor += delta,
                Pending::Resized(width, height) => {
                    self.size = (width, height);
                    if let Some(callback) = self.on_resize.as_mut() {
                        callback(width, height);
                    }
                }
                Pending::Close => self.should_close = true,
            }
        }
    }

    fn is_key_pressed(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_position(&self) -> DVec2 {
        self.cursor
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_should_close(&mut self, value: bool) {
        self.should_close = value;
    }

    fn set_framebuffer_resize_callback(&mut self, callback: ResizeCallback) {
        self.on_resize = Some(callback);
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::Space => Key::Space,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::ControlLeft => Key::LeftControl,
        KeyCode::Escape => Key::Escape,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    })
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ShiftLeft), Some(Key::LeftShift));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::F5), None);
    }

    #[test]
    fn buttons_map() {
        assert_eq!(
            map_button(winit::event::MouseButton::Left),
            Some(MouseButton::Left)
        );
        assert_eq!(map_button(winit::event::MouseButton::Back), None);
    }
}
