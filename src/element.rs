//! Graph element handles and the collaborator contracts consumed by the core.
//!
//! The storage engine, entity instantiation, and index maintenance are all
//! external. This module pins down the narrow traits the accessors call into,
//! plus the lightweight handles (`NodeId`, `RelationshipId`, `ElementRef`)
//! that cross those boundaries.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::StoreResult;
use crate::types::{FieldValue, PropertyValue};

/// Identifier of a node in the underlying graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Identifier of a relationship in the underlying graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub u64);

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rel:{}", self.0)
    }
}

/// Handle to either kind of graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Node(NodeId),
    Relationship(RelationshipId),
}

impl ElementRef {
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            ElementRef::Node(node) => Some(node),
            ElementRef::Relationship(_) => None,
        }
    }

    pub fn as_relationship(self) -> Option<RelationshipId> {
        match self {
            ElementRef::Relationship(rel) => Some(rel),
            ElementRef::Node(_) => None,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Node(node) => fmt::Display::fmt(node, f),
            ElementRef::Relationship(rel) => fmt::Display::fmt(rel, f),
        }
    }
}

/// Which end of a relationship an endpoint field reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Start,
    End,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::End => f.write_str("end"),
        }
    }
}

/// Traversal direction for related-entity navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Handle to the external graph storage engine.
///
/// Implementations own their concurrency and transaction semantics; every
/// method takes `&self` and any blocking happens behind this boundary.
pub trait GraphStore: Send + Sync {
    fn node_property(&self, node: NodeId, key: &str) -> StoreResult<Option<PropertyValue>>;

    fn set_node_property(&self, node: NodeId, key: &str, value: PropertyValue) -> StoreResult<()>;

    fn relationship_property(
        &self,
        rel: RelationshipId,
        key: &str,
    ) -> StoreResult<Option<PropertyValue>>;

    fn set_relationship_property(
        &self,
        rel: RelationshipId,
        key: &str,
        value: PropertyValue,
    ) -> StoreResult<()>;

    /// Node referenced by the given end of the relationship, if present.
    fn relationship_endpoint(
        &self,
        rel: RelationshipId,
        endpoint: Endpoint,
    ) -> StoreResult<Option<NodeId>>;

    /// Nodes reached from `node` over relationships of `rel_type` in the
    /// given direction, in store order.
    fn related_nodes(
        &self,
        node: NodeId,
        rel_type: &str,
        direction: Direction,
    ) -> StoreResult<Vec<NodeId>>;

    /// Replace the set of nodes linked to `node` over `rel_type`/`direction`.
    fn set_related(
        &self,
        node: NodeId,
        rel_type: &str,
        direction: Direction,
        targets: &[NodeId],
    ) -> StoreResult<()>;

    /// Property read dispatching on the element kind.
    fn element_property(&self, element: ElementRef, key: &str) -> StoreResult<Option<PropertyValue>> {
        match element {
            ElementRef::Node(node) => self.node_property(node, key),
            ElementRef::Relationship(rel) => self.relationship_property(rel, key),
        }
    }

    /// Property write dispatching on the element kind.
    fn set_element_property(
        &self,
        element: ElementRef,
        key: &str,
        value: PropertyValue,
    ) -> StoreResult<()> {
        match element {
            ElementRef::Node(node) => self.set_node_property(node, key, value),
            ElementRef::Relationship(rel) => self.set_relationship_property(rel, key, value),
        }
    }
}

/// External facility that builds a domain object wrapper around a raw node.
pub trait EntityInstantiator: Send + Sync {
    fn entity_from_node(&self, node: NodeId, target_type: &str) -> StoreResult<DomainEntity>;
}

/// Domain object whose field is being accessed.
///
/// Opaque to this core except for the handle to its underlying graph
/// element. A detached instance (not yet saved) returns `None`.
pub trait BackingInstance {
    fn underlying_element(&self) -> Option<ElementRef>;
}

/// External index maintenance hook fed by the indexing listener.
pub trait IndexWriter: Send + Sync {
    fn update(&self, element: ElementRef, field: &str, value: &FieldValue);
}

/// Wrapper handle produced by the entity-instantiation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntity {
    pub entity_type: String,
    pub node: NodeId,
}

impl DomainEntity {
    pub fn new(entity_type: impl Into<String>, node: NodeId) -> Self {
        Self {
            entity_type: entity_type.into(),
            node,
        }
    }
}

impl BackingInstance for DomainEntity {
    fn underlying_element(&self) -> Option<ElementRef> {
        Some(ElementRef::Node(self.node))
    }
}

/// Shared infrastructure handed to accessor factories at construction.
///
/// Bundles the store handle and the entity instantiator; cloning is cheap
/// and every accessor created by a factory holds its own copy.
#[derive(Clone)]
pub struct MappingContext {
    store: Arc<dyn GraphStore>,
    instantiator: Arc<dyn EntityInstantiator>,
}

impl MappingContext {
    pub fn new(store: Arc<dyn GraphStore>, instantiator: Arc<dyn EntityInstantiator>) -> Self {
        Self { store, instantiator }
    }

    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    pub fn instantiator(&self) -> &dyn EntityInstantiator {
        self.instantiator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ref_accessors() {
        let node = ElementRef::Node(NodeId(7));
        assert_eq!(node.as_node(), Some(NodeId(7)));
        assert_eq!(node.as_relationship(), None);

        let rel = ElementRef::Relationship(RelationshipId(3));
        assert_eq!(rel.as_relationship(), Some(RelationshipId(3)));
        assert_eq!(rel.as_node(), None);
    }

    #[test]
    fn domain_entity_is_node_backed() {
        let entity = DomainEntity::new("Person", NodeId(42));
        assert_eq!(entity.underlying_element(), Some(ElementRef::Node(NodeId(42))));
    }

    #[test]
    fn handles_display() {
        assert_eq!(NodeId(1).to_string(), "node:1");
        assert_eq!(RelationshipId(2).to_string(), "rel:2");
        assert_eq!(Endpoint::Start.to_string(), "start");
        assert_eq!(Endpoint::End.to_string(), "end");
    }
}
