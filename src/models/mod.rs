//! Data models for the trap dashboard.

pub mod detection;
pub mod status;
pub mod trap;

pub use detection::{DetectionResult, DetectionStatus, DetectionStatusPatch};
pub use status::{TransitionScheme, TrapStatus};
pub use trap::{Position, Trap};
