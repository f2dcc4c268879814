use std::borrow::Cow;

use thiserror::Error;

/// Errors surfaced by field accessors at get/set time.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Write attempted through a read-only strategy.
    #[error("cannot mutate read-only field '{field}': {reason}")]
    UnsupportedMutation { field: String, reason: Cow<'static, str> },

    /// Stored or supplied value cannot be coerced to the declared field type.
    #[error("cannot convert value for field '{field}': expected {expected}, got {actual}")]
    TypeConversion {
        field: String,
        expected: String,
        actual: &'static str,
    },

    /// Store navigation attempted on an instance with no live graph element.
    #[error("field '{field}' requires an instance backed by a {required} element")]
    NotBacked { field: String, required: &'static str },

    /// Underlying store handle failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration errors raised while resolving a descriptor against the registry.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A field cannot map to both endpoints of a relationship.
    #[error("field '{field}' on '{entity}' carries both start-node and end-node markers")]
    ConflictingEndpointMarkers { entity: String, field: String },
}

/// Opaque failure reported by the external graph store handle.
///
/// The storage engine is an external collaborator; whatever it raises is
/// carried through as a message without further interpretation.
#[derive(Debug, Error)]
#[error("store error: {message}")]
pub struct StoreError {
    pub message: Cow<'static, str>,
}

impl StoreError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Convenience alias for store-collaborator calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience alias for accessor get/set operations.
pub type AccessResult<T> = Result<T, AccessError>;
