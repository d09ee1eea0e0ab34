use crate::{Key, MouseButton, ResizeCallback, WindowConfig, WindowSystem};
use glam::DVec2;
use std::collections::{HashSet, VecDeque};

/// Scripted window with no platform backing.
///
/// Input edits (`press_key`, `set_cursor`, `resize`, ...) are staged and only
/// become visible at the next [`WindowSystem::poll_events`], mirroring how a
/// real event loop delivers them.
pub struct HeadlessWindow {
    config: WindowConfig,
    time: f64,
    fixed_step: Option<f64>,
    keys: HashSet<Key>,
    staged_keys: HashSet<Key>,
    buttons: HashSet<MouseButton>,
    staged_buttons: HashSet<MouseButton>,
    cursor: DVec2,
    staged_cursor: DVec2,
    size: (u32, u32),
    staged_resizes: VecDeque<(u32, u32)>,
    close_requested: bool,
    should_close: bool,
    on_resize: Option<ResizeCallback>,
    polls: u64,
}

impl HeadlessWindow {
    pub fn new(config: WindowConfig) -> Self {
        tracing::debug!(
            title = %config.title,
            width = config.width,
            height = config.height,
            "headless window created"
        );
        let size = (config.width, config.height);
        Self {
            config,
            time: 0.0,
            fixed_step: None,
            keys: HashSet::new(),
            staged_keys: HashSet::new(),
            buttons: HashSet::new(),
            staged_buttons: HashSet::new(),
            cursor: DVec2::ZERO,
            staged_cursor: DVec2::ZERO,
            size,
            staged_resizes: VecDeque::new(),
            close_requested: false,
            should_close: false,
            on_resize: None,
            polls: 0,
        }
    }

    /// Advance the clock by `step` seconds on every poll.
    pub fn with_fixed_step(mut self, step: f64) -> Self {
        self.fixed_step = Some(step);
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn press_key(&mut self, key: Key) {
        self.staged_keys.insert(key);
    }

    pub fn release_key(&mut self, key: Key) {
        self.staged_keys.remove(&key);
    }

    pub fn press_mouse_button(&mut self, button: MouseButton) {
        self.staged_buttons.insert(button);
    }

    pub fn release_mouse_button(&mut self, button: MouseButton) {
        self.staged_buttons.remove(&button);
    }

    pub fn set_cursor(&mut self, position: DVec2) {
        self.staged_cursor = position;
    }

    /// Queue a framebuffer resize. Several queued resizes are delivered in
    /// order during one poll.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.staged_resizes.push_back((width, height));
    }

    /// Simulate the user closing the window.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn advance_time(&mut self, seconds: f64) {
        self.time += seconds;
    }

    /// Number of `poll_events` calls so far.
    pub fn poll_count(&self) -> u64 {
        self.polls
    }
}

impl WindowSystem for HeadlessWindow {
    fn time(&self) -> f64 {
        self.time
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        if let Some(step) = self.fixed_step {
            self.time += step;
        }
        self.keys.clone_from(&self.staged_keys);
        self.buttons.clone_from(&self.staged_buttons);
        self.cursor = self.staged_cursor;
        if self.close_requested {
            self.should_close = true;
        }
        while let Some((width, height)) = self.staged_resizes.pop_front() {
            self.size = (width, height);
            tracing::trace!(width, height, "headless framebuffer resized");
            if let Some(callback) = self.on_resize.as_mut() {
                callback(width, height);
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
        self.close_requested = value;
    }

    fn set_framebuffer_resize_callback(&mut self, callback: ResizeCallback) {
        self.on_resize = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn window() -> HeadlessWindow {
        HeadlessWindow::new(WindowConfig {
            width: 800,
            height: 600,
            ..WindowConfig::default()
        })
    }

    #[test]
    fn input_is_visible_only_after_poll() {
        let mut w = window();
        w.press_key(Key::W);
        w.set_cursor(DVec2::new(4.0, 2.0));
        assert!(!w.is_key_pressed(Key::W));
        assert_eq!(w.cursor_position(), DVec2::ZERO);
        w.poll_events();
        assert!(w.is_key_pressed(Key::W));
        assert_eq!(w.cursor_position(), DVec2::new(4.0, 2.0));
        w.release_key(Key::W);
        w.poll_events();
        assert!(!w.is_key_pressed(Key::W));
    }

    #[test]
    fn resizes_fire_callback_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut w = window();
        let sink = Rc::clone(&seen);
        w.set_framebuffer_resize_callback(Box::new(move |x, y| sink.borrow_mut().push((x, y))));

        w.resize(1024, 768);
        w.resize(300, 100);
        assert_eq!(w.framebuffer_size(), (800, 600));
        w.poll_events();
        assert_eq!(w.framebuffer_size(), (300, 100));
        assert_eq!(*seen.borrow(), vec![(1024, 768), (300, 100)]);
    }

    #[test]
    fn fixed_step_advances_clock_per_poll() {
        let mut w = window().with_fixed_step(0.25);
        w.poll_events();
        w.poll_events();
        assert!((w.time() - 0.5).abs() < 1e-12);
        w.advance_time(1.0);
        assert!((w.time() - 1.5).abs() < 1e-12);
        assert_eq!(w.poll_count(), 2);
    }

    #[test]
    fn close_request_lands_on_poll() {
        let mut w = window();
        w.request_close();
        assert!(!w.should_close());
        w.poll_events();
        assert!(w.should_close());
        w.set_should_close(false);
        w.poll_events();
        assert!(!w.should_close());
    }
}
