//! Graphom core library.
//!
//! Maps fields of in-memory domain objects onto elements of a graph data
//! store. The heart of the crate is accessor resolution: per persistent
//! field, an ordered registry of strategy factories decides which accessor
//! governs reads and writes of that field (relationship endpoints, scalar
//! properties, related entities, related collections), and a parallel
//! listener family observes mutations. The storage engine, entity
//! instantiation, and metadata extraction are external collaborators
//! consumed through the traits in [`element`].

pub mod accessor;
pub mod convert;
pub mod element;
pub mod errors;
pub mod listener;
pub mod registry;
pub mod testkit;
pub mod types;

pub use accessor::endpoint::{EndpointAccessor, EndpointAccessorFactory};
pub use accessor::property::{PropertyAccessor, PropertyAccessorFactory};
pub use accessor::related::{
    RelatedCollectionAccessor, RelatedCollectionAccessorFactory, RelatedEntityAccessor,
    RelatedEntityAccessorFactory,
};
pub use accessor::{FieldAccessor, FieldAccessorFactory, ValueOutcome};
pub use element::{
    BackingInstance, Direction, DomainEntity, ElementRef, Endpoint, EntityInstantiator, GraphStore,
    IndexWriter, MappingContext, NodeId, RelationshipId,
};
pub use errors::{AccessError, AccessResult, ResolveError, StoreError, StoreResult};
pub use listener::{
    FieldListener, FieldListenerFactory, IndexingListenerFactory, MutationLogListenerFactory,
};
pub use registry::{AccessorRegistry, FieldBinding, RegistryBuilder};
pub use types::{
    DeclaredType, EntityDescriptor, FieldDescriptor, FieldMarker, FieldValue, MarkerKind,
    PropertyValue,
};
