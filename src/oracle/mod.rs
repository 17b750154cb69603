//! Federated type system oracle
//!
//! Answers subtype-membership questions against the cohort's evolving type
//! graph. The allow-list of watched domain types is configuration, not code:
//! the oracle only knows how to walk the hierarchy.

mod registry;

pub use registry::{TypeDef, TypeRegistry};

/// Subtype check against the cohort's type graph.
pub trait TypeOracle: Send + Sync {
    /// Returns true when `instance_type_name` equals `reference_type_name` or
    /// inherits from it, as known to `source_name`'s view of the type graph.
    fn is_subtype_of(
        &self,
        source_name: &str,
        instance_type_name: &str,
        reference_type_name: &str,
    ) -> bool;
}
