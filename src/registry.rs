//! Accessor and listener resolution.
//!
//! The registry owns the ordered factory lists and the per-(entity, field)
//! caches. It is built once, owned by the mapping-engine instance, and its
//! factory lists are frozen at build time; only the memoizing caches
//! change afterwards, and recomputation is pure so concurrent
//! first-population is benign.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::accessor::{FieldAccessor, FieldAccessorFactory, ValueOutcome};
use crate::element::{BackingInstance, MappingContext};
use crate::errors::{AccessResult, ResolveError};
use crate::listener::{FieldListener, FieldListenerFactory};
use crate::types::{EntityDescriptor, FieldDescriptor, FieldValue, MarkerKind};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FieldKey {
    entity: String,
    field: String,
}

impl FieldKey {
    fn for_field(field: &FieldDescriptor) -> Self {
        Self {
            entity: field.entity.clone(),
            field: field.name.clone(),
        }
    }
}

/// Collects factories in registration order, then freezes them into an
/// [`AccessorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    accessor_factories: Vec<Box<dyn FieldAccessorFactory>>,
    listener_factories: Vec<Box<dyn FieldListenerFactory>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accessor_factory(mut self, factory: impl FieldAccessorFactory + 'static) -> Self {
        self.accessor_factories.push(Box::new(factory));
        self
    }

    pub fn listener_factory(mut self, factory: impl FieldListenerFactory + 'static) -> Self {
        self.listener_factories.push(Box::new(factory));
        self
    }

    pub fn build(self) -> AccessorRegistry {
        AccessorRegistry {
            accessor_factories: self.accessor_factories,
            listener_factories: self.listener_factories,
            accessors: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
        }
    }
}

/// Ordered factory collection with per-(entity type, field) memoization.
pub struct AccessorRegistry {
    accessor_factories: Vec<Box<dyn FieldAccessorFactory>>,
    listener_factories: Vec<Box<dyn FieldListenerFactory>>,
    accessors: RwLock<HashMap<FieldKey, Option<Arc<dyn FieldAccessor>>>>,
    listeners: RwLock<HashMap<FieldKey, Vec<Arc<dyn FieldListener>>>>,
}

impl AccessorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with the standard strategy order: relationship endpoints,
    /// related entities, related collections, scalar properties; plus the
    /// mutation-log listener.
    pub fn with_default_factories(ctx: MappingContext) -> Self {
        use crate::accessor::endpoint::EndpointAccessorFactory;
        use crate::accessor::property::PropertyAccessorFactory;
        use crate::accessor::related::{RelatedCollectionAccessorFactory, RelatedEntityAccessorFactory};
        use crate::listener::MutationLogListenerFactory;

        Self::builder()
            .accessor_factory(EndpointAccessorFactory::new(ctx.clone()))
            .accessor_factory(RelatedEntityAccessorFactory::new(ctx.clone()))
            .accessor_factory(RelatedCollectionAccessorFactory::new(ctx.clone()))
            .accessor_factory(PropertyAccessorFactory::new(ctx))
            .listener_factory(MutationLogListenerFactory)
            .build()
    }

    /// Resolve the accessor governing the given field.
    ///
    /// First factory acceptance wins; `Ok(None)` means the field is
    /// unmapped (no factory accepted, or the accepting factory vetoed at
    /// creation time). The result is cached per (entity type, field).
    pub fn resolve_accessor(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Arc<dyn FieldAccessor>>, ResolveError> {
        validate_markers(field)?;

        let key = FieldKey::for_field(field);
        if let Some(cached) = self.accessors.read().unwrap().get(&key) {
            return Ok(cached.clone());
        }

        let resolved = self
            .accessor_factories
            .iter()
            .find(|factory| factory.accepts(field))
            .and_then(|factory| factory.create(field));
        debug!(
            "resolved field {}.{}: {}",
            field.entity,
            field.name,
            if resolved.is_some() { "mapped" } else { "unmapped" }
        );

        let mut cache = self.accessors.write().unwrap();
        Ok(cache.entry(key).or_insert(resolved).clone())
    }

    /// Resolve every accepting listener factory's listener for the field,
    /// in registration order. Cached alongside the accessors.
    pub fn resolve_listeners(&self, field: &FieldDescriptor) -> Vec<Arc<dyn FieldListener>> {
        let key = FieldKey::for_field(field);
        if let Some(cached) = self.listeners.read().unwrap().get(&key) {
            return cached.clone();
        }

        let built: Vec<_> = self
            .listener_factories
            .iter()
            .filter(|factory| factory.accepts(field))
            .map(|factory| factory.for_field(field))
            .collect();

        let mut cache = self.listeners.write().unwrap();
        cache.entry(key).or_insert(built).clone()
    }

    /// Eagerly populate the caches for every field of an entity type, at
    /// metadata-load time.
    pub fn register_entity(&self, entity: &EntityDescriptor) -> Result<(), ResolveError> {
        for field in &entity.fields {
            self.resolve_accessor(field)?;
            self.resolve_listeners(field);
        }
        Ok(())
    }

    /// Resolve accessor and listeners together into a binding whose `set`
    /// notifies the listeners.
    pub fn bind(&self, field: &FieldDescriptor) -> Result<Option<FieldBinding>, ResolveError> {
        let Some(accessor) = self.resolve_accessor(field)? else {
            return Ok(None);
        };
        Ok(Some(FieldBinding {
            field: field.clone(),
            accessor,
            listeners: self.resolve_listeners(field),
        }))
    }
}

fn validate_markers(field: &FieldDescriptor) -> Result<(), ResolveError> {
    if field.has_marker(MarkerKind::StartNode) && field.has_marker(MarkerKind::EndNode) {
        return Err(ResolveError::ConflictingEndpointMarkers {
            entity: field.entity.clone(),
            field: field.name.clone(),
        });
    }
    Ok(())
}

/// A resolved field: its accessor plus the listeners to notify after each
/// successful write.
pub struct FieldBinding {
    field: FieldDescriptor,
    accessor: Arc<dyn FieldAccessor>,
    listeners: Vec<Arc<dyn FieldListener>>,
}

impl FieldBinding {
    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn accessor(&self) -> &dyn FieldAccessor {
        self.accessor.as_ref()
    }

    pub fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome> {
        self.accessor.get(instance)
    }

    /// Write through the accessor, then notify every listener in
    /// registration order. Listeners do not fire on failed writes.
    pub fn set(&self, instance: &dyn BackingInstance, value: &FieldValue) -> AccessResult<()> {
        self.accessor.set(instance, value)?;
        for listener in &self.listeners {
            listener.field_changed(instance, &self.field, value);
        }
        Ok(())
    }

    pub fn is_writeable(&self, instance: &dyn BackingInstance) -> bool {
        self.accessor.is_writeable(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DomainEntity, ElementRef};
    use crate::errors::AccessError;
    use crate::listener::{IndexingListenerFactory, MutationLogListenerFactory};
    use crate::testkit::{Backed, MemoryGraph, RecordingIndex};
    use crate::types::{DeclaredType, FieldMarker, PropertyValue};

    fn start_field() -> FieldDescriptor {
        FieldDescriptor::new("Friendship", "from", DeclaredType::Entity("Person".into()))
            .with_marker(FieldMarker::StartNode)
    }

    #[test]
    fn resolution_is_deterministic_and_cached() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());
        let field = start_field();

        let first = registry.resolve_accessor(&field).expect("resolve").expect("mapped");
        let second = registry.resolve_accessor(&field).expect("resolve").expect("mapped");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unaccepted_descriptor_is_unmapped_not_an_error() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());
        // An entity-typed field with no markers matches no strategy.
        let field = FieldDescriptor::new("Person", "note", DeclaredType::Entity("Note".into()));

        assert!(registry.resolve_accessor(&field).expect("resolve").is_none());
        assert!(registry.bind(&field).expect("bind").is_none());
    }

    #[test]
    fn late_veto_reads_as_unmapped() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());
        // Endpoint marker accepted by the endpoint factory, but a text
        // declared type vetoes creation.
        let field = FieldDescriptor::new("Friendship", "from", DeclaredType::Text)
            .with_marker(FieldMarker::StartNode);

        assert!(registry.resolve_accessor(&field).expect("resolve").is_none());
    }

    #[test]
    fn conflicting_endpoint_markers_are_a_configuration_error() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());
        let field = FieldDescriptor::new("Friendship", "weird", DeclaredType::Entity("Person".into()))
            .with_marker(FieldMarker::StartNode)
            .with_marker(FieldMarker::EndNode);

        let err = registry.resolve_accessor(&field).expect_err("conflict");
        assert!(matches!(err, ResolveError::ConflictingEndpointMarkers { .. }));
    }

    #[test]
    fn first_accepting_factory_wins() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());
        // Endpoint and relationship markers both present: the endpoint
        // factory registers first and wins.
        let field = FieldDescriptor::new("Friendship", "from", DeclaredType::Entity("Person".into()))
            .with_marker(FieldMarker::StartNode)
            .with_marker(FieldMarker::Relationship {
                rel_type: "KNOWS".into(),
                direction: crate::element::Direction::Outgoing,
            });

        let accessor = registry.resolve_accessor(&field).expect("resolve").expect("mapped");
        // The endpoint strategy is read-only; the related-entity strategy
        // is not. Writeability tells the strategies apart.
        let a = graph.add_node();
        let b = graph.add_node();
        let rel = graph.add_relationship("KNOWS", Some(a), Some(b));
        assert!(!accessor.is_writeable(&Backed::relationship(rel)));
    }

    #[test]
    fn register_entity_populates_eagerly_and_rejects_conflicts() {
        let graph = MemoryGraph::new();
        let registry = AccessorRegistry::with_default_factories(graph.context());

        let good = EntityDescriptor::new(
            "Friendship",
            vec![
                start_field(),
                FieldDescriptor::new("Friendship", "since", DeclaredType::Integer),
            ],
        );
        registry.register_entity(&good).expect("register");

        let bad = EntityDescriptor::new(
            "Broken",
            vec![
                FieldDescriptor::new("Broken", "x", DeclaredType::Entity("Person".into()))
                    .with_marker(FieldMarker::StartNode)
                    .with_marker(FieldMarker::EndNode),
            ],
        );
        assert!(registry.register_entity(&bad).is_err());
    }

    #[test]
    fn listener_resolution_returns_every_accepting_factory() {
        let graph = MemoryGraph::new();
        let index = Arc::new(RecordingIndex::default());
        let registry = AccessorRegistry::builder()
            .accessor_factory(crate::accessor::property::PropertyAccessorFactory::new(
                graph.context(),
            ))
            .listener_factory(MutationLogListenerFactory)
            .listener_factory(IndexingListenerFactory::new(index))
            .build();

        let indexed = FieldDescriptor::new("Person", "name", DeclaredType::Text)
            .with_marker(FieldMarker::Indexed);
        assert_eq!(registry.resolve_listeners(&indexed).len(), 2);

        let plain = FieldDescriptor::new("Person", "age", DeclaredType::Integer);
        assert_eq!(registry.resolve_listeners(&plain).len(), 1);
    }

    #[test]
    fn binding_notifies_each_listener_exactly_once_per_set() {
        let graph = MemoryGraph::new();
        let node = graph.add_node();
        let index = Arc::new(RecordingIndex::default());
        let registry = AccessorRegistry::builder()
            .accessor_factory(crate::accessor::property::PropertyAccessorFactory::new(
                graph.context(),
            ))
            .listener_factory(IndexingListenerFactory::new(index.clone()))
            .build();

        let field = FieldDescriptor::new("Person", "name", DeclaredType::Text)
            .with_marker(FieldMarker::Indexed);
        let binding = registry.bind(&field).expect("bind").expect("mapped");
        let instance = Backed::node(node);

        let value = FieldValue::Scalar(PropertyValue::Text("Ada".into()));
        binding.set(&instance, &value).expect("set");
        assert_eq!(
            index.updates(),
            vec![(ElementRef::Node(node), "name".to_string(), value.clone())]
        );

        binding.set(&instance, &value).expect("set again");
        assert_eq!(index.updates().len(), 2);
    }

    #[test]
    fn binding_does_not_notify_on_failed_set() {
        let graph = MemoryGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let rel = graph.add_relationship("KNOWS", Some(a), Some(b));

        let index = Arc::new(RecordingIndex::default());
        let registry = AccessorRegistry::builder()
            .accessor_factory(crate::accessor::endpoint::EndpointAccessorFactory::new(
                graph.context(),
            ))
            .listener_factory(IndexingListenerFactory::new(index.clone()))
            .build();

        let field = start_field().with_marker(FieldMarker::Indexed);
        let binding = registry.bind(&field).expect("bind").expect("mapped");

        let err = binding
            .set(
                &Backed::relationship(rel),
                &FieldValue::Entity(DomainEntity::new("Person", a)),
            )
            .expect_err("endpoint writes fail");
        assert!(matches!(err, AccessError::UnsupportedMutation { .. }));
        assert!(index.updates().is_empty());
    }

    #[test]
    fn empty_registry_maps_nothing() {
        let registry = AccessorRegistry::builder().build();
        let field = start_field();
        assert!(registry.resolve_accessor(&field).expect("resolve").is_none());
        assert!(registry.resolve_listeners(&field).is_empty());
    }

    /// A second context shares nothing with the first registry; ordering
    /// within one registry is what determines resolution.
    #[test]
    fn registries_are_instance_scoped() {
        let graph_a = MemoryGraph::new();
        let graph_b = MemoryGraph::new();
        let registry_a = AccessorRegistry::with_default_factories(graph_a.context());
        let registry_b = AccessorRegistry::with_default_factories(graph_b.context());

        let field = start_field();
        let from_a = registry_a.resolve_accessor(&field).expect("resolve").expect("mapped");
        let from_b = registry_b.resolve_accessor(&field).expect("resolve").expect("mapped");
        assert!(!Arc::ptr_eq(&from_a, &from_b));
    }
}
