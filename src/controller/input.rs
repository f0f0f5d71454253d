/// Platform-agnostic input handling
use crate::controller::camera_controller::Step;
use crate::host::EntityId;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    Wheel { delta_y: f32 },
    MouseDown { button: MouseButton, x: f32, y: f32 },
    MouseMove { x: f32, y: f32 },
    MouseUp { button: MouseButton, x: f32, y: f32 },

    // Touch events, one per changed touch point
    TouchStart { id: u64, x: f32, y: f32 },
    TouchMove { id: u64, x: f32, y: f32 },
    TouchEnd { id: u64, x: f32, y: f32 },

    /// A clickable entity was pressed (resolved by the overlay)
    Click(EntityId),

    // Window events
    FocusLost,
}

impl InputEvent {
    /// Presses, clicks and touches count as a user gesture for media autoplay
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            InputEvent::KeyDown(_)
                | InputEvent::MouseDown { .. }
                | InputEvent::TouchStart { .. }
                | InputEvent::Click(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Which pointer owns a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch(u64),
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub next: Vec<String>,
    pub previous: Vec<String>,
    pub toggle_console: String,
    pub toggle_debug: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            next: vec!["ArrowDown".to_string(), "PageDown".to_string()],
            previous: vec!["ArrowUp".to_string(), "PageUp".to_string()],
            toggle_console: "`".to_string(),
            toggle_debug: "F3".to_string(),
        }
    }
}

/// Maps raw keys and wheel deltas to waypoint steps
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn step_for_key(&self, key: &str) -> Option<Step> {
        if self.bindings.next.iter().any(|k| k == key) {
            Some(Step::Next)
        } else if self.bindings.previous.iter().any(|k| k == key) {
            Some(Step::Previous)
        } else {
            None
        }
    }

    /// Positive deltas scroll forward; a zero delta is no input at all
    pub fn step_for_wheel(&self, delta_y: f32) -> Option<Step> {
        if delta_y > 0.0 {
            Some(Step::Next)
        } else if delta_y < 0.0 {
            Some(Step::Previous)
        } else {
            None
        }
    }

    pub fn wants_to_toggle_console(&self, key: &str) -> bool {
        key == self.bindings.toggle_console
    }

    pub fn wants_to_toggle_debug(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.bindings.toggle_debug)
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent, TouchEvent, WheelEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_down_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseDown {
            button: MouseButton::from_web_button(e.button()),
            x: e.client_x() as f32,
            y: e.client_y() as f32,
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove { x: e.client_x() as f32, y: e.client_y() as f32 }
    }

    pub fn mouse_up_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseUp {
            button: MouseButton::from_web_button(e.button()),
            x: e.client_x() as f32,
            y: e.client_y() as f32,
        }
    }

    pub fn wheel_to_input(e: &WheelEvent) -> Option<InputEvent> {
        let delta_y = e.delta_y() as f32;
        (delta_y != 0.0).then_some(InputEvent::Wheel { delta_y })
    }

    #[derive(Debug, Clone, Copy)]
    pub enum TouchPhase {
        Start,
        Move,
        End,
    }

    /// One event per changed touch point
    pub fn touch_to_inputs(e: &TouchEvent, phase: TouchPhase) -> Vec<InputEvent> {
        let touches = e.changed_touches();
        (0..touches.length())
            .filter_map(|i| touches.get(i))
            .map(|t| {
                let (id, x, y) = (t.identifier() as u64, t.client_x() as f32, t.client_y() as f32);
                match phase {
                    TouchPhase::Start => InputEvent::TouchStart { id, x, y },
                    TouchPhase::Move => InputEvent::TouchMove { id, x, y },
                    TouchPhase::End => InputEvent::TouchEnd { id, x, y },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings_map_to_steps() {
        let input = InputProcessor::default();
        assert_eq!(input.step_for_key("ArrowDown"), Some(Step::Next));
        assert_eq!(input.step_for_key("PageUp"), Some(Step::Previous));
        assert_eq!(input.step_for_key("a"), None);
    }

    #[test]
    fn test_zero_wheel_delta_is_ignored() {
        let input = InputProcessor::default();
        assert_eq!(input.step_for_wheel(0.0), None);
        assert_eq!(input.step_for_wheel(120.0), Some(Step::Next));
        assert_eq!(input.step_for_wheel(-3.0), Some(Step::Previous));
    }

    #[test]
    fn test_gestures() {
        assert!(InputEvent::Click(EntityId(0)).is_gesture());
        assert!(InputEvent::TouchStart { id: 1, x: 0.0, y: 0.0 }.is_gesture());
        assert!(!InputEvent::MouseMove { x: 0.0, y: 0.0 }.is_gesture());
        assert!(!InputEvent::Wheel { delta_y: 1.0 }.is_gesture());
    }
}
