//! Fixed, ordered set of traps known to the dashboard.

use std::collections::HashMap;

use crate::error::TrapError;
use crate::models::Trap;

/// Ordered trap list with O(1) lookup by id.
///
/// Built once at session start; there are no mutation operations.
#[derive(Debug, Clone)]
pub struct TrapRegistry {
    traps: Vec<Trap>,
    index: HashMap<String, usize>,
}

impl TrapRegistry {
    /// Builds a registry from `traps`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`TrapError::InvalidRegistry`] if the list is empty, an id is
    /// empty or repeated, or a position lies outside 0-100.
    pub fn new(traps: Vec<Trap>) -> Result<Self, TrapError> {
        if traps.is_empty() {
            return Err(TrapError::InvalidRegistry(
                "at least one trap is required".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(traps.len());
        for (idx, trap) in traps.iter().enumerate() {
            if trap.id.trim().is_empty() {
                return Err(TrapError::InvalidRegistry(
                    "trap ids cannot be empty".to_string(),
                ));
            }
            if !trap.position.in_range() {
                return Err(TrapError::InvalidRegistry(format!(
                    "trap '{}' is positioned outside the floor plan",
                    trap.id
                )));
            }
            if index.insert(trap.id.clone(), idx).is_some() {
                return Err(TrapError::InvalidRegistry(format!(
                    "duplicate trap id '{}'",
                    trap.id
                )));
            }
        }

        Ok(Self { traps, index })
    }

    /// Looks up a trap by id.
    pub fn get(&self, id: &str) -> Option<&Trap> {
        self.index.get(id).map(|&idx| &self.traps[idx])
    }

    /// Looks up a trap by id, failing for unregistered ids.
    pub fn require(&self, id: &str) -> Result<&Trap, TrapError> {
        self.get(id)
            .ok_or_else(|| TrapError::UnknownTrap(id.to_string()))
    }

    /// Whether `id` names a registered trap.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Traps in configuration order.
    pub fn traps(&self) -> &[Trap] {
        &self.traps
    }

    /// Iterates over trap ids in configuration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.traps.iter().map(|t| t.id.as_str())
    }

    /// Number of registered traps.
    pub fn len(&self) -> usize {
        self.traps.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    fn trap(id: &str) -> Trap {
        Trap::new(id, id.to_uppercase(), Position::new(50.0, 50.0))
    }

    #[test]
    fn test_registry_keeps_order_and_indexes() {
        let registry = TrapRegistry::new(vec![trap("kitchen"), trap("bedroom")]).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["kitchen", "bedroom"]);
        assert_eq!(registry.get("bedroom").unwrap().display_name, "BEDROOM");
        assert!(registry.get("attic").is_none());
    }

    #[test]
    fn test_registry_require_unknown() {
        let registry = TrapRegistry::new(vec![trap("kitchen")]).unwrap();
        assert_eq!(
            registry.require("attic").unwrap_err(),
            TrapError::UnknownTrap("attic".to_string())
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = TrapRegistry::new(vec![trap("kitchen"), trap("kitchen")]);
        assert!(matches!(result, Err(TrapError::InvalidRegistry(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_registry_rejects_empty() {
        assert!(TrapRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn test_registry_rejects_out_of_range_position() {
        let off_plan = Trap::new("porch", "Porch", Position::new(-5.0, 20.0));
        assert!(TrapRegistry::new(vec![off_plan]).is_err());
    }
}
