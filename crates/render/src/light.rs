use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Point light. Only its position is animated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
}

impl Light {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
    }
}
