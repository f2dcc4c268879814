//! Accessor strategy contracts.
//!
//! One factory per mapping strategy decides applicability against a field
//! descriptor and constructs the accessor that governs reads and writes of
//! that field. Factories are consulted in registration order by the
//! [`AccessorRegistry`](crate::registry::AccessorRegistry); the first
//! acceptance wins.

pub mod endpoint;
pub mod property;
pub mod related;

use std::sync::Arc;

use crate::element::{BackingInstance, ElementRef, NodeId, RelationshipId};
use crate::errors::{AccessError, AccessResult};
use crate::types::{FieldDescriptor, FieldValue};

/// Result of a field read.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOutcome {
    /// The accessor computed a value from the store.
    Computed(FieldValue),
    /// The mapped source exists but holds no value (absent endpoint or
    /// missing property). A normal outcome, not an error.
    Absent,
    /// The accessor declines the read; the caller falls through to its
    /// default handling.
    Unhandled,
}

impl ValueOutcome {
    pub fn into_value(self) -> Option<FieldValue> {
        match self {
            ValueOutcome::Computed(value) => Some(value),
            ValueOutcome::Absent | ValueOutcome::Unhandled => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ValueOutcome::Absent)
    }
}

/// Strategy object bound to one field of one entity type.
///
/// Accessors are stateless after construction and shared across all
/// instances of the entity type.
pub trait FieldAccessor: Send + Sync {
    fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome>;

    fn set(&self, instance: &dyn BackingInstance, value: &FieldValue) -> AccessResult<()>;

    fn is_writeable(&self, _instance: &dyn BackingInstance) -> bool {
        true
    }

    fn default_value(&self) -> Option<FieldValue> {
        None
    }
}

impl std::fmt::Debug for dyn FieldAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn FieldAccessor")
    }
}

/// Decides applicability of one mapping strategy and constructs it.
pub trait FieldAccessorFactory: Send + Sync {
    fn accepts(&self, field: &FieldDescriptor) -> bool;

    /// May return `None` even after accepting (late veto, e.g. a required
    /// counterpart marker or type is missing); the registry then treats
    /// the field as unmapped. Must not touch the store.
    fn create(&self, field: &FieldDescriptor) -> Option<Arc<dyn FieldAccessor>>;
}

pub(crate) fn require_relationship(
    field: &FieldDescriptor,
    instance: &dyn BackingInstance,
) -> AccessResult<RelationshipId> {
    match instance.underlying_element() {
        Some(ElementRef::Relationship(rel)) => Ok(rel),
        _ => Err(AccessError::NotBacked {
            field: field.name.clone(),
            required: "relationship",
        }),
    }
}

pub(crate) fn require_node(
    field: &FieldDescriptor,
    instance: &dyn BackingInstance,
) -> AccessResult<NodeId> {
    match instance.underlying_element() {
        Some(ElementRef::Node(node)) => Ok(node),
        _ => Err(AccessError::NotBacked {
            field: field.name.clone(),
            required: "node",
        }),
    }
}

pub(crate) fn require_element(
    field: &FieldDescriptor,
    instance: &dyn BackingInstance,
) -> AccessResult<ElementRef> {
    instance.underlying_element().ok_or_else(|| AccessError::NotBacked {
        field: field.name.clone(),
        required: "graph",
    })
}
