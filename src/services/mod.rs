//! Service layer for dashboard state.
//!
//! This module contains the trap registry and state store, the detection
//! trigger, the shared detection status slot, and the session that ties
//! them together.

pub mod detection_status;
pub mod registry;
pub mod session;
pub mod store;
pub mod trigger;

// Re-export commonly used types and functions
pub use detection_status::DetectionStatusSlot;
pub use registry::TrapRegistry;
pub use session::DashboardSession;
pub use store::{StoreSnapshot, TrapStateStore, TrapView};
pub use trigger::{interpret, DetectionTrigger, TriggerSnapshot, TriggerSource};
