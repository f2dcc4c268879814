//! In-memory doubles for the external collaborators.
//!
//! The real storage engine, instantiator, and index live outside this
//! crate; `MemoryGraph` and friends implement just enough of their
//! contracts to exercise accessors and the registry in tests and
//! embedding experiments.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::element::{
    BackingInstance, Direction, DomainEntity, ElementRef, Endpoint, EntityInstantiator, GraphStore,
    IndexWriter, MappingContext, NodeId, RelationshipId,
};
use crate::errors::{StoreError, StoreResult};
use crate::types::{FieldValue, PropertyValue};

#[derive(Debug, Default)]
struct RelationshipRecord {
    rel_type: String,
    start: Option<NodeId>,
    end: Option<NodeId>,
    properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: HashMap<NodeId, HashMap<String, PropertyValue>>,
    // BTreeMap keeps relationship iteration in creation order, which is
    // the store order the accessors rely on.
    relationships: BTreeMap<RelationshipId, RelationshipRecord>,
    next_node: u64,
    next_rel: u64,
}

/// In-memory `GraphStore` double. Cloning shares the underlying graph.
#[derive(Clone, Default)]
pub struct MemoryGraph {
    inner: Arc<RwLock<GraphData>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self) -> NodeId {
        let mut data = self.inner.write().unwrap();
        let id = NodeId(data.next_node);
        data.next_node += 1;
        data.nodes.insert(id, HashMap::new());
        id
    }

    /// Create a relationship; endpoints are optional so tests can model a
    /// dangling reference.
    pub fn add_relationship(
        &self,
        rel_type: &str,
        start: Option<NodeId>,
        end: Option<NodeId>,
    ) -> RelationshipId {
        let mut data = self.inner.write().unwrap();
        let id = RelationshipId(data.next_rel);
        data.next_rel += 1;
        data.relationships.insert(
            id,
            RelationshipRecord {
                rel_type: rel_type.to_string(),
                start,
                end,
                properties: HashMap::new(),
            },
        );
        id
    }

    /// Mapping context wired to this graph and the node-wrapping
    /// instantiator.
    pub fn context(&self) -> MappingContext {
        MappingContext::new(Arc::new(self.clone()), Arc::new(NodeInstantiator))
    }

    fn unknown_node(node: NodeId) -> StoreError {
        StoreError::new(format!("unknown {node}"))
    }

    fn unknown_relationship(rel: RelationshipId) -> StoreError {
        StoreError::new(format!("unknown {rel}"))
    }
}

impl GraphStore for MemoryGraph {
    fn node_property(&self, node: NodeId, key: &str) -> StoreResult<Option<PropertyValue>> {
        let data = self.inner.read().unwrap();
        let props = data.nodes.get(&node).ok_or_else(|| Self::unknown_node(node))?;
        Ok(props.get(key).cloned())
    }

    fn set_node_property(&self, node: NodeId, key: &str, value: PropertyValue) -> StoreResult<()> {
        let mut data = self.inner.write().unwrap();
        let props = data.nodes.get_mut(&node).ok_or_else(|| Self::unknown_node(node))?;
        props.insert(key.to_string(), value);
        Ok(())
    }

    fn relationship_property(
        &self,
        rel: RelationshipId,
        key: &str,
    ) -> StoreResult<Option<PropertyValue>> {
        let data = self.inner.read().unwrap();
        let record = data
            .relationships
            .get(&rel)
            .ok_or_else(|| Self::unknown_relationship(rel))?;
        Ok(record.properties.get(key).cloned())
    }

    fn set_relationship_property(
        &self,
        rel: RelationshipId,
        key: &str,
        value: PropertyValue,
    ) -> StoreResult<()> {
        let mut data = self.inner.write().unwrap();
        let record = data
            .relationships
            .get_mut(&rel)
            .ok_or_else(|| Self::unknown_relationship(rel))?;
        record.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn relationship_endpoint(
        &self,
        rel: RelationshipId,
        endpoint: Endpoint,
    ) -> StoreResult<Option<NodeId>> {
        let data = self.inner.read().unwrap();
        let record = data
            .relationships
            .get(&rel)
            .ok_or_else(|| Self::unknown_relationship(rel))?;
        Ok(match endpoint {
            Endpoint::Start => record.start,
            Endpoint::End => record.end,
        })
    }

    fn related_nodes(
        &self,
        node: NodeId,
        rel_type: &str,
        direction: Direction,
    ) -> StoreResult<Vec<NodeId>> {
        let data = self.inner.read().unwrap();
        let mut related = Vec::new();
        for record in data.relationships.values() {
            if record.rel_type != rel_type {
                continue;
            }
            let reached = match direction {
                Direction::Outgoing if record.start == Some(node) => record.end,
                Direction::Incoming if record.end == Some(node) => record.start,
                _ => None,
            };
            if let Some(reached) = reached {
                related.push(reached);
            }
        }
        Ok(related)
    }

    fn set_related(
        &self,
        node: NodeId,
        rel_type: &str,
        direction: Direction,
        targets: &[NodeId],
    ) -> StoreResult<()> {
        let mut data = self.inner.write().unwrap();
        data.relationships.retain(|_, record| {
            if record.rel_type != rel_type {
                return true;
            }
            match direction {
                Direction::Outgoing => record.start != Some(node),
                Direction::Incoming => record.end != Some(node),
            }
        });
        for &target in targets {
            let id = RelationshipId(data.next_rel);
            data.next_rel += 1;
            let (start, end) = match direction {
                Direction::Outgoing => (Some(node), Some(target)),
                Direction::Incoming => (Some(target), Some(node)),
            };
            data.relationships.insert(
                id,
                RelationshipRecord {
                    rel_type: rel_type.to_string(),
                    start,
                    end,
                    properties: HashMap::new(),
                },
            );
        }
        Ok(())
    }
}

/// Instantiator double: wraps the raw node into a `DomainEntity` handle.
pub struct NodeInstantiator;

impl EntityInstantiator for NodeInstantiator {
    fn entity_from_node(&self, node: NodeId, target_type: &str) -> StoreResult<DomainEntity> {
        Ok(DomainEntity::new(target_type, node))
    }
}

/// Backing instance wrapping an optional element handle.
#[derive(Debug, Clone)]
pub struct Backed {
    element: Option<ElementRef>,
}

impl Backed {
    pub fn node(node: NodeId) -> Self {
        Self {
            element: Some(ElementRef::Node(node)),
        }
    }

    pub fn relationship(rel: RelationshipId) -> Self {
        Self {
            element: Some(ElementRef::Relationship(rel)),
        }
    }

    /// An instance not yet saved to the store.
    pub fn detached() -> Self {
        Self { element: None }
    }
}

impl BackingInstance for Backed {
    fn underlying_element(&self) -> Option<ElementRef> {
        self.element
    }
}

/// Index-writer double that records every update it receives.
#[derive(Default)]
pub struct RecordingIndex {
    updates: Mutex<Vec<(ElementRef, String, FieldValue)>>,
}

impl RecordingIndex {
    pub fn updates(&self) -> Vec<(ElementRef, String, FieldValue)> {
        self.updates.lock().unwrap().clone()
    }
}

impl IndexWriter for RecordingIndex {
    fn update(&self, element: ElementRef, field: &str, value: &FieldValue) {
        self.updates
            .lock()
            .unwrap()
            .push((element, field.to_string(), value.clone()));
    }
}
