//! In-process type registry backing the oracle.
//!
//! Cohort members register type definitions as they join; the registry is
//! therefore mutable for the lifetime of the gateway and safe to share
//! across tasks.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TypeOracle;

/// Upper bound on supertype-chain walks. A well-formed type graph is shallow;
/// anything deeper indicates a cycle introduced by conflicting registrations.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// A single type definition in the federated type graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    /// Direct supertype, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<String>,
}

/// Registry of type definitions, updated as cohort members register types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load definitions from a JSON array document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let defs: Vec<TypeDef> = serde_json::from_str(json)?;
        let registry = Self::new();
        for def in defs {
            registry.register(def);
        }
        Ok(registry)
    }

    /// Register or replace a type definition.
    pub fn register(&self, def: TypeDef) {
        debug!(type_name = %def.name, super_type = ?def.super_type, "Type registered");
        self.types.insert(def.name.clone(), def);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeOracle for TypeRegistry {
    fn is_subtype_of(
        &self,
        source_name: &str,
        instance_type_name: &str,
        reference_type_name: &str,
    ) -> bool {
        let mut current = instance_type_name.to_string();
        let mut hops = 0usize;

        loop {
            if current == reference_type_name {
                return true;
            }

            let parent = match self.types.get(&current) {
                Some(def) => def.super_type.clone(),
                None => {
                    debug!(
                        source = source_name,
                        type_name = %current,
                        "Type not in registry"
                    );
                    return false;
                }
            };

            match parent {
                Some(parent) => current = parent,
                None => return false,
            }

            hops += 1;
            if hops > MAX_HIERARCHY_DEPTH {
                warn!(
                    source = source_name,
                    type_name = instance_type_name,
                    "Supertype chain exceeds maximum depth, assuming cycle"
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_chain() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry.register(TypeDef {
            name: "Referenceable".to_string(),
            super_type: None,
        });
        registry.register(TypeDef {
            name: "Asset".to_string(),
            super_type: Some("Referenceable".to_string()),
        });
        registry.register(TypeDef {
            name: "Database".to_string(),
            super_type: Some("Asset".to_string()),
        });
        registry
    }

    #[test]
    fn test_subtype_chain() {
        let registry = registry_with_chain();
        assert!(registry.is_subtype_of("test", "Database", "Asset"));
        assert!(registry.is_subtype_of("test", "Database", "Referenceable"));
        assert!(registry.is_subtype_of("test", "Asset", "Asset"));
        assert!(!registry.is_subtype_of("test", "Referenceable", "Asset"));
        assert!(!registry.is_subtype_of("test", "Unknown", "Asset"));
    }

    #[test]
    fn test_late_registration_participates() {
        let registry = registry_with_chain();
        assert!(!registry.is_subtype_of("test", "RelationalTable", "Asset"));

        registry.register(TypeDef {
            name: "RelationalTable".to_string(),
            super_type: Some("Asset".to_string()),
        });
        assert!(registry.is_subtype_of("test", "RelationalTable", "Asset"));
    }

    #[test]
    fn test_cycle_is_bounded() {
        let registry = TypeRegistry::new();
        registry.register(TypeDef {
            name: "A".to_string(),
            super_type: Some("B".to_string()),
        });
        registry.register(TypeDef {
            name: "B".to_string(),
            super_type: Some("A".to_string()),
        });

        assert!(!registry.is_subtype_of("test", "A", "C"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"name": "Referenceable"},
            {"name": "Community", "super_type": "Referenceable"}
        ]"#;

        let registry = TypeRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_subtype_of("test", "Community", "Referenceable"));
    }
}
