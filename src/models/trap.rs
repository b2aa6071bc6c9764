//! Trap identity records.

use serde::{Deserialize, Serialize};

/// Overlay position on the floor plan, as a percentage of the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset (0-100).
    pub x: f32,
    /// Vertical offset (0-100).
    pub y: f32,
}

impl Position {
    /// Creates a position without validation.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates lie within 0-100.
    pub fn in_range(&self) -> bool {
        (0.0..=100.0).contains(&self.x) && (0.0..=100.0).contains(&self.y)
    }
}

/// A monitored location.
///
/// Traps are defined once at session start and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trap {
    /// Stable key, unique within the registry (e.g., "kitchen").
    pub id: String,
    /// Human-readable label (e.g., "Kitchen").
    pub display_name: String,
    /// Where the trap marker is drawn.
    pub position: Position,
}

impl Trap {
    /// Creates a new trap record.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            position,
        }
    }
}
