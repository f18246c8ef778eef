/// Platform-agnostic input handling system
use std::collections::HashSet;

use crate::config::KeyBindings;

/// Logical movement actions the keyboard drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Forward,
        Action::Back,
        Action::Left,
        Action::Right,
        Action::Up,
        Action::Down,
    ];
}

/// Where keyboard focus was when a key event arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Scene,
    /// An input, textarea or contenteditable element; keys belong to the form.
    TextEntry,
}

impl FocusTarget {
    /// A captured pointer owns the keyboard even if a form field kept focus.
    pub fn resolve(pointer_captured: bool, text_entry_focused: bool) -> Self {
        if text_entry_focused && !pointer_captured {
            FocusTarget::TextEntry
        } else {
            FocusTarget::Scene
        }
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

/// Platform-independent input events
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyDown { key: String, focus: FocusTarget },
    KeyUp { key: String, focus: FocusTarget },

    PointerMove { dx: f32, dy: f32 },
    PointerDown { button: MouseButton },

    FocusLost,
    VisibilityChanged { visible: bool },
    CaptureChanged { active: bool },
}

/// Result of feeding a capture-changed notification into [`InputState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureChange {
    Acquired,
    /// Capture ended; `cleared` actions were force-released.
    Released { cleared: usize },
    Unchanged,
}

/// What [`InputState::process_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Ignored,
    Updated,
    Capture(CaptureChange),
}

/// Pressed actions, capture flag and pending mouse-look.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<Action>,
    captured: bool,
    look_delta: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, action: Action) {
        self.pressed.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.pressed.remove(&action);
    }

    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn any_pressed(&self) -> bool {
        !self.pressed.is_empty()
    }

    /// Force-release everything. Returns how many actions were held.
    pub fn clear_keys(&mut self) -> usize {
        let cleared = self.pressed.len();
        self.pressed.clear();
        cleared
    }

    /// Releasing capture always clears held keys, so a key whose keyup went
    /// to another surface cannot stay stuck.
    pub fn on_capture_change(&mut self, active: bool) -> CaptureChange {
        if active {
            if self.captured {
                return CaptureChange::Unchanged;
            }
            self.captured = true;
            tracing::info!("capture acquired");
            return CaptureChange::Acquired;
        }

        let was_captured = std::mem::replace(&mut self.captured, false);
        self.look_delta = (0.0, 0.0);
        let cleared = self.clear_keys();
        if !was_captured {
            // A refused lock: keys still go, but nothing was released.
            tracing::debug!(cleared, "capture already inactive, keys cleared");
            return CaptureChange::Unchanged;
        }
        tracing::info!(cleared, "capture released, state cleared");
        CaptureChange::Released { cleared }
    }

    pub fn accumulate_look(&mut self, dx: f32, dy: f32) {
        if self.captured {
            self.look_delta.0 += dx;
            self.look_delta.1 += dy;
        }
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent, processor: &InputProcessor) -> InputOutcome {
        match event {
            InputEvent::KeyDown { key, focus } | InputEvent::KeyUp { key, focus } => {
                if *focus == FocusTarget::TextEntry {
                    return InputOutcome::Ignored;
                }
                let Some(action) = processor.action_for(key) else {
                    return InputOutcome::Ignored;
                };
                if matches!(event, InputEvent::KeyDown { .. }) {
                    self.press(action);
                } else {
                    self.release(action);
                }
                InputOutcome::Updated
            }
            InputEvent::PointerMove { dx, dy } => {
                if !self.captured {
                    return InputOutcome::Ignored;
                }
                self.accumulate_look(*dx, *dy);
                InputOutcome::Updated
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                self.clear_keys();
                InputOutcome::Updated
            }
            InputEvent::CaptureChanged { active } => InputOutcome::Capture(self.on_capture_change(*active)),
            InputEvent::PointerDown { .. } => InputOutcome::Ignored,
        }
    }
}

/// Maps raw key names onto [`Action`]s.
#[derive(Debug, Clone)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        let matches = |keys: &[String]| keys.iter().any(|k| k.eq_ignore_ascii_case(key));
        Action::ALL.into_iter().find(|action| {
            let keys = match action {
                Action::Forward => &self.bindings.forward,
                Action::Back => &self.bindings.back,
                Action::Left => &self.bindings.left,
                Action::Right => &self.bindings.right,
                Action::Up => &self.bindings.up,
                Action::Down => &self.bindings.down,
            };
            matches(keys)
        })
    }

    pub fn is_escape(&self, key: &str) -> bool {
        key == self.bindings.escape
    }

    /// Keys the page should not scroll or type with while the scene has focus.
    pub fn is_navigation_key(&self, key: &str) -> bool {
        self.action_for(key).is_some()
    }
}
