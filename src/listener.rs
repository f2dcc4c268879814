//! Field mutation listeners.
//!
//! Listener factories form a family parallel to the accessor factories,
//! but resolution is not first-wins: every accepting factory contributes a
//! listener, and all of them fire, in registration order, after each
//! successful `set`.

use std::sync::Arc;

use log::debug;

use crate::element::{BackingInstance, IndexWriter};
use crate::types::{FieldDescriptor, FieldValue, MarkerKind};

/// Observer notified after a successful field mutation.
pub trait FieldListener: Send + Sync {
    fn field_changed(
        &self,
        instance: &dyn BackingInstance,
        field: &FieldDescriptor,
        new_value: &FieldValue,
    );
}

/// Decides eligibility and constructs the listener for a field.
pub trait FieldListenerFactory: Send + Sync {
    fn accepts(&self, field: &FieldDescriptor) -> bool;

    fn for_field(&self, field: &FieldDescriptor) -> Arc<dyn FieldListener>;
}

/// Emits a structured log record for every mutation of a mapped field.
pub struct MutationLogListenerFactory;

impl FieldListenerFactory for MutationLogListenerFactory {
    fn accepts(&self, _field: &FieldDescriptor) -> bool {
        true
    }

    fn for_field(&self, _field: &FieldDescriptor) -> Arc<dyn FieldListener> {
        Arc::new(MutationLogListener)
    }
}

struct MutationLogListener;

impl FieldListener for MutationLogListener {
    fn field_changed(
        &self,
        instance: &dyn BackingInstance,
        field: &FieldDescriptor,
        new_value: &FieldValue,
    ) {
        let element = instance
            .underlying_element()
            .map_or_else(|| "detached".to_string(), |e| e.to_string());
        debug!(
            "field mutated: {}.{} on {} <- {}",
            field.entity,
            field.name,
            element,
            new_value.kind()
        );
    }
}

/// Forwards new values of indexed fields to the external index writer.
pub struct IndexingListenerFactory {
    writer: Arc<dyn IndexWriter>,
}

impl IndexingListenerFactory {
    pub fn new(writer: Arc<dyn IndexWriter>) -> Self {
        Self { writer }
    }
}

impl FieldListenerFactory for IndexingListenerFactory {
    fn accepts(&self, field: &FieldDescriptor) -> bool {
        field.has_marker(MarkerKind::Indexed)
    }

    fn for_field(&self, _field: &FieldDescriptor) -> Arc<dyn FieldListener> {
        Arc::new(IndexingListener {
            writer: self.writer.clone(),
        })
    }
}

struct IndexingListener {
    writer: Arc<dyn IndexWriter>,
}

impl FieldListener for IndexingListener {
    fn field_changed(
        &self,
        instance: &dyn BackingInstance,
        field: &FieldDescriptor,
        new_value: &FieldValue,
    ) {
        // A detached instance has nothing to index against yet.
        if let Some(element) = instance.underlying_element() {
            self.writer.update(element, &field.name, new_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementRef;
    use crate::testkit::{Backed, MemoryGraph, RecordingIndex};
    use crate::types::{DeclaredType, FieldMarker, PropertyValue};

    fn indexed_field() -> FieldDescriptor {
        FieldDescriptor::new("Person", "name", DeclaredType::Text).with_marker(FieldMarker::Indexed)
    }

    #[test]
    fn log_listener_accepts_everything() {
        let factory = MutationLogListenerFactory;
        assert!(factory.accepts(&indexed_field()));
        assert!(factory.accepts(&FieldDescriptor::new("Person", "age", DeclaredType::Integer)));
    }

    #[test]
    fn indexing_listener_accepts_indexed_fields_only() {
        let index = Arc::new(RecordingIndex::default());
        let factory = IndexingListenerFactory::new(index);

        assert!(factory.accepts(&indexed_field()));
        assert!(!factory.accepts(&FieldDescriptor::new("Person", "age", DeclaredType::Integer)));
    }

    #[test]
    fn indexing_listener_forwards_to_writer() {
        let graph = MemoryGraph::new();
        let node = graph.add_node();
        let index = Arc::new(RecordingIndex::default());
        let factory = IndexingListenerFactory::new(index.clone());

        let field = indexed_field();
        let listener = factory.for_field(&field);
        let value = FieldValue::Scalar(PropertyValue::Text("Ada".into()));
        listener.field_changed(&Backed::node(node), &field, &value);

        let updates = index.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0], (ElementRef::Node(node), "name".to_string(), value));
    }

    #[test]
    fn indexing_listener_skips_detached_instances() {
        let index = Arc::new(RecordingIndex::default());
        let factory = IndexingListenerFactory::new(index.clone());

        let field = indexed_field();
        let listener = factory.for_field(&field);
        listener.field_changed(
            &Backed::detached(),
            &field,
            &FieldValue::Scalar(PropertyValue::Text("Ada".into())),
        );

        assert!(index.updates().is_empty());
    }
}
