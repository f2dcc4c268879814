//! Relationship-endpoint accessor: fields marked start-node or end-node
//! read the corresponding node of the backing relationship. Endpoints are
//! structurally fixed when the relationship is created, so these fields
//! are never writeable.

use std::sync::Arc;

use crate::accessor::{FieldAccessor, FieldAccessorFactory, ValueOutcome, require_relationship};
use crate::element::{BackingInstance, Endpoint, MappingContext};
use crate::errors::{AccessError, AccessResult};
use crate::types::{FieldDescriptor, FieldValue, MarkerKind};

pub struct EndpointAccessorFactory {
    ctx: MappingContext,
}

impl EndpointAccessorFactory {
    pub fn new(ctx: MappingContext) -> Self {
        Self { ctx }
    }
}

impl FieldAccessorFactory for EndpointAccessorFactory {
    fn accepts(&self, field: &FieldDescriptor) -> bool {
        field.has_marker(MarkerKind::StartNode) || field.has_marker(MarkerKind::EndNode)
    }

    fn create(&self, field: &FieldDescriptor) -> Option<Arc<dyn FieldAccessor>> {
        let endpoint = if field.has_marker(MarkerKind::StartNode) {
            Endpoint::Start
        } else if field.has_marker(MarkerKind::EndNode) {
            Endpoint::End
        } else {
            return None;
        };
        // Late veto: an endpoint field must declare an entity type to wrap
        // the node into.
        let target = field.declared_type.entity_type()?.to_string();
        Some(Arc::new(EndpointAccessor {
            field: field.clone(),
            endpoint,
            target,
            ctx: self.ctx.clone(),
        }))
    }
}

/// Single accessor parameterized by which endpoint it reads.
pub struct EndpointAccessor {
    field: FieldDescriptor,
    endpoint: Endpoint,
    target: String,
    ctx: MappingContext,
}

impl FieldAccessor for EndpointAccessor {
    fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome> {
        let rel = require_relationship(&self.field, instance)?;
        let Some(node) = self.ctx.store().relationship_endpoint(rel, self.endpoint)? else {
            return Ok(ValueOutcome::Absent);
        };
        let entity = self.ctx.instantiator().entity_from_node(node, &self.target)?;
        Ok(ValueOutcome::Computed(FieldValue::Entity(entity)))
    }

    fn set(&self, _instance: &dyn BackingInstance, _value: &FieldValue) -> AccessResult<()> {
        Err(AccessError::UnsupportedMutation {
            field: self.field.name.clone(),
            reason: "cannot change the start or end node of an existing relationship".into(),
        })
    }

    fn is_writeable(&self, _instance: &dyn BackingInstance) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::DomainEntity;
    use crate::testkit::{Backed, MemoryGraph};
    use crate::types::{DeclaredType, FieldMarker};

    fn start_field() -> FieldDescriptor {
        FieldDescriptor::new("Friendship", "from", DeclaredType::Entity("Person".into()))
            .with_marker(FieldMarker::StartNode)
    }

    fn end_field() -> FieldDescriptor {
        FieldDescriptor::new("Friendship", "to", DeclaredType::Entity("Person".into()))
            .with_marker(FieldMarker::EndNode)
    }

    #[test]
    fn accepts_only_endpoint_markers() {
        let graph = MemoryGraph::new();
        let factory = EndpointAccessorFactory::new(graph.context());

        assert!(factory.accepts(&start_field()));
        assert!(factory.accepts(&end_field()));
        assert!(!factory.accepts(&FieldDescriptor::new("Person", "age", DeclaredType::Integer)));
    }

    #[test]
    fn creation_vetoes_non_entity_declared_type() {
        let graph = MemoryGraph::new();
        let factory = EndpointAccessorFactory::new(graph.context());
        let odd = FieldDescriptor::new("Friendship", "from", DeclaredType::Text)
            .with_marker(FieldMarker::StartNode);

        assert!(factory.accepts(&odd));
        assert!(factory.create(&odd).is_none());
    }

    #[test]
    fn get_wraps_live_start_node() {
        let graph = MemoryGraph::new();
        let alice = graph.add_node();
        let bob = graph.add_node();
        let rel = graph.add_relationship("KNOWS", Some(alice), Some(bob));

        let factory = EndpointAccessorFactory::new(graph.context());
        let accessor = factory.create(&start_field()).expect("accessor");

        let outcome = accessor.get(&Backed::relationship(rel)).expect("get");
        assert_eq!(
            outcome,
            ValueOutcome::Computed(FieldValue::Entity(DomainEntity::new("Person", alice)))
        );
    }

    #[test]
    fn get_is_idempotent() {
        let graph = MemoryGraph::new();
        let alice = graph.add_node();
        let bob = graph.add_node();
        let rel = graph.add_relationship("KNOWS", Some(alice), Some(bob));

        let factory = EndpointAccessorFactory::new(graph.context());
        let accessor = factory.create(&end_field()).expect("accessor");
        let instance = Backed::relationship(rel);

        let first = accessor.get(&instance).expect("first get");
        let second = accessor.get(&instance).expect("second get");
        assert_eq!(first, second);
        assert_eq!(
            first,
            ValueOutcome::Computed(FieldValue::Entity(DomainEntity::new("Person", bob)))
        );
    }

    #[test]
    fn absent_endpoint_reads_as_no_value() {
        let graph = MemoryGraph::new();
        let bob = graph.add_node();
        let rel = graph.add_relationship("KNOWS", None, Some(bob));

        let factory = EndpointAccessorFactory::new(graph.context());
        let accessor = factory.create(&start_field()).expect("accessor");

        assert_eq!(accessor.get(&Backed::relationship(rel)).expect("get"), ValueOutcome::Absent);
    }

    #[test]
    fn node_backed_instance_is_rejected() {
        let graph = MemoryGraph::new();
        let node = graph.add_node();

        let factory = EndpointAccessorFactory::new(graph.context());
        let accessor = factory.create(&start_field()).expect("accessor");

        let err = accessor.get(&Backed::node(node)).expect_err("node backing");
        assert!(matches!(err, AccessError::NotBacked { .. }));

        let err = accessor.get(&Backed::detached()).expect_err("detached");
        assert!(matches!(err, AccessError::NotBacked { .. }));
    }

    #[test]
    fn set_always_fails_and_is_never_writeable() {
        let graph = MemoryGraph::new();
        let alice = graph.add_node();
        let bob = graph.add_node();
        let rel = graph.add_relationship("KNOWS", Some(alice), Some(bob));

        let factory = EndpointAccessorFactory::new(graph.context());
        for field in [start_field(), end_field()] {
            let accessor = factory.create(&field).expect("accessor");
            let instance = Backed::relationship(rel);

            assert!(!accessor.is_writeable(&instance));
            let err = accessor
                .set(&instance, &FieldValue::Entity(DomainEntity::new("Person", alice)))
                .expect_err("endpoint writes must fail");
            assert!(matches!(err, AccessError::UnsupportedMutation { .. }));
        }
    }

    #[test]
    fn default_value_is_none() {
        let graph = MemoryGraph::new();
        let factory = EndpointAccessorFactory::new(graph.context());
        let accessor = factory.create(&start_field()).expect("accessor");
        assert_eq!(accessor.default_value(), None);
    }
}
