// CONTROLLER: Input, motion, probes, collision, selection and the frame loop
pub mod collision;
pub mod engine;
pub mod input;
pub mod motion;
pub mod projectile;
pub mod selection;

pub use collision::CollisionDetector;
pub use engine::{EngineEvent, InteractionEngine, TickReport};
pub use input::{Action, CaptureChange, FocusTarget, InputEvent, InputProcessor, InputState, MouseButton};
pub use motion::{MotionController, MotionOutcome};
pub use projectile::{AdvanceOutcome, ProbeHit, ProjectileStats, ProjectileSystem};
pub use selection::{SelectionChange, SelectionCoordinator};
