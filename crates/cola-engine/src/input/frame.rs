use std::collections::HashSet;

use super::types::{InputEvent, Key};

/// Per-tick input deltas.
///
/// `InputState` holds what is currently down; `InputFrame` holds what changed
/// since the last tick. The runtime clears it after every tick.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    /// Keys that went down this tick.
    pub keys_pressed: HashSet<Key>,

    /// Keys that went up this tick.
    pub keys_released: HashSet<Key>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}
