// MODEL: Items, probes and the viewpoint
pub mod item;
pub mod layout;
pub mod probe;
pub mod viewpoint;

pub use item::{Item, ItemId, ItemRegistry, Record, VisualHandle};
pub use probe::{Probe, ProbeId, RetireReason};
pub use viewpoint::Viewpoint;
