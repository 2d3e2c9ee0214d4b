//! Input handling

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Input state manager
#[derive(Debug, Default)]
pub struct Input {
    /// Currently pressed keys
    pressed_keys: FxHashSet<KeyCode>,
    /// Keys that were just pressed this frame
    just_pressed_keys: FxHashSet<KeyCode>,
    /// Keys that were just released this frame
    just_released_keys: FxHashSet<KeyCode>,
    /// Currently pressed mouse buttons
    pressed_mouse_buttons: FxHashSet<MouseButton>,
    /// Mouse buttons just pressed this frame
    just_pressed_mouse_buttons: FxHashSet<MouseButton>,
    /// Mouse buttons just released this frame
    just_released_mouse_buttons: FxHashSet<MouseButton>,
    /// Last known cursor position, `None` until the first cursor event
    mouse_position: Option<Vec2>,
    /// Cursor movement in window pixels this frame
    cursor_delta: Vec2,
    /// Raw device motion this frame (unaffected by cursor grabbing)
    mouse_delta: Vec2,
    /// Scroll wheel delta this frame
    scroll_delta: Vec2,
}

impl Input {
    /// Create a new input manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to clear per-frame state
    pub fn update(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
        self.just_pressed_mouse_buttons.clear();
        self.just_released_mouse_buttons.clear();
        self.cursor_delta = Vec2::ZERO;
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    /// Process a keyboard event
    pub fn process_keyboard(&mut self, key_code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed_keys.insert(key_code) {
                    self.just_pressed_keys.insert(key_code);
                }
            }
            ElementState::Released => {
                self.pressed_keys.remove(&key_code);
                self.just_released_keys.insert(key_code);
            }
        }
    }

    /// Process a mouse button event
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed_mouse_buttons.insert(button) {
                    self.just_pressed_mouse_buttons.insert(button);
                }
            }
            ElementState::Released => {
                self.pressed_mouse_buttons.remove(&button);
                self.just_released_mouse_buttons.insert(button);
            }
        }
    }

    /// Process a cursor position event.
    ///
    /// The first event only records the position so the cursor entering the
    /// window does not register as a jump.
    pub fn process_mouse_motion(&mut self, position: Vec2) {
        if let Some(last) = self.mouse_position {
            self.cursor_delta += position - last;
        }
        self.mouse_position = Some(position);
    }

    /// Process raw mouse delta (for first-person camera)
    pub fn process_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    /// Process scroll wheel
    pub fn process_scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    /// Check if a key is currently pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key was just pressed this frame
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Check if a key was just released this frame
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// Check if a mouse button is currently pressed
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_mouse_buttons.contains(&button)
    }

    /// Check if a mouse button was just pressed this frame
    pub fn is_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_mouse_buttons.contains(&button)
    }

    /// Check if a mouse button was just released this frame
    pub fn is_mouse_button_just_released(&self, button: MouseButton) -> bool {
        self.just_released_mouse_buttons.contains(&button)
    }

    /// Get current cursor position
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position.unwrap_or(Vec2::ZERO)
    }

    /// Get cursor movement in window pixels this frame
    pub fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    /// Get raw mouse movement this frame
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Get scroll wheel delta this frame
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_and_release() {
        let mut input = Input::new();

        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        input.update();
        // Key repeat does not re-trigger just-pressed
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));

        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_released(KeyCode::KeyW));
    }

    #[test]
    fn test_first_cursor_event_has_no_delta() {
        let mut input = Input::new();

        input.process_mouse_motion(Vec2::new(400.0, 300.0));
        assert_eq!(input.cursor_delta(), Vec2::ZERO);

        input.process_mouse_motion(Vec2::new(410.0, 295.0));
        assert_eq!(input.cursor_delta(), Vec2::new(10.0, -5.0));
        assert_eq!(input.mouse_position(), Vec2::new(410.0, 295.0));
    }

    #[test]
    fn test_deltas_accumulate_and_reset() {
        let mut input = Input::new();

        input.process_mouse_delta(Vec2::new(1.0, 2.0));
        input.process_mouse_delta(Vec2::new(3.0, -1.0));
        input.process_scroll(Vec2::new(0.0, 1.0));
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, 1.0));
        assert_eq!(input.scroll_delta(), Vec2::new(0.0, 1.0));

        input.update();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.scroll_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_mouse_buttons() {
        let mut input = Input::new();

        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.is_mouse_button_pressed(MouseButton::Left));
        assert!(input.is_mouse_button_just_pressed(MouseButton::Left));

        input.update();
        input.process_mouse_button(MouseButton::Left, ElementState::Released);
        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
        assert!(input.is_mouse_button_just_released(MouseButton::Left));
    }
}
