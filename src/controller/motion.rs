use glam::Vec3;

use crate::config::EngineConfig;
use crate::controller::input::{Action, InputState};
use crate::view::CaptureControls;

/// What a motion tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionOutcome {
    /// Capture inactive: nothing computed, no primitive called.
    Skipped,
    Applied { velocity: Vec3 },
}

impl MotionOutcome {
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionOutcome::Applied { velocity } if *velocity != Vec3::ZERO)
    }
}

/// Handles viewpoint movement and orientation
#[derive(Debug, Clone)]
pub struct MotionController {
    pub move_speed: f32,
    pub vertical_speed: f32,
    pub min_height: f32,
    pub mouse_sensitivity: f32,
}

impl MotionController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            vertical_speed: config.vertical_speed,
            min_height: config.min_height,
            mouse_sensitivity: config.mouse_sensitivity,
        }
    }

    /// Velocity for this tick; x is strafe, y vertical, z backwards.
    pub fn velocity(&self, input: &InputState, delta: f32) -> Vec3 {
        let axis = |pos: Action, neg: Action| {
            (input.is_pressed(pos) as i8 - input.is_pressed(neg) as i8) as f32
        };
        let forward = axis(Action::Back, Action::Forward);
        let strafe = axis(Action::Right, Action::Left);
        let vertical = axis(Action::Up, Action::Down);

        Vec3::new(
            strafe * self.move_speed * delta,
            vertical * self.vertical_speed * delta,
            forward * self.move_speed * delta,
        )
    }

    /// Move the viewpoint for one tick. Lateral motion goes through the
    /// capture controller; height is clamped to the eye-height floor.
    pub fn tick(&self, delta: f32, input: &mut InputState, controls: &mut dyn CaptureControls) -> MotionOutcome {
        if !input.is_captured() {
            return MotionOutcome::Skipped;
        }

        let (dx, dy) = input.consume_look();
        if dx != 0.0 || dy != 0.0 {
            controls.look(dx * self.mouse_sensitivity, -dy * self.mouse_sensitivity);
        }

        let velocity = self.velocity(input, delta);
        if velocity.x != 0.0 {
            controls.move_right(velocity.x);
        }
        if velocity.z != 0.0 {
            controls.move_forward(-velocity.z);
        }

        let mut position = controls.position();
        let height = (position.y + velocity.y).max(self.min_height);
        if height != position.y {
            position.y = height;
            controls.set_position(position);
        }

        MotionOutcome::Applied { velocity }
    }
}
