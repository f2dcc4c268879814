//! Related-entity accessors: fields carrying a relationship marker
//! navigate the store from the backing node to other entities. The
//! single-valued strategy reads the first match; the collection strategy
//! always computes a list. Writes replace the link set through the store
//! handle, which owns the actual relationship bookkeeping.

use std::sync::Arc;

use crate::accessor::{FieldAccessor, FieldAccessorFactory, ValueOutcome, require_node};
use crate::element::{BackingInstance, Direction, MappingContext};
use crate::errors::{AccessError, AccessResult};
use crate::types::{DeclaredType, FieldDescriptor, FieldValue, MarkerKind};

pub struct RelatedEntityAccessorFactory {
    ctx: MappingContext,
}

impl RelatedEntityAccessorFactory {
    pub fn new(ctx: MappingContext) -> Self {
        Self { ctx }
    }
}

impl FieldAccessorFactory for RelatedEntityAccessorFactory {
    fn accepts(&self, field: &FieldDescriptor) -> bool {
        field.has_marker(MarkerKind::Relationship)
            && matches!(field.declared_type, DeclaredType::Entity(_))
    }

    fn create(&self, field: &FieldDescriptor) -> Option<Arc<dyn FieldAccessor>> {
        let (rel_type, direction) = field.relationship_spec()?;
        let target = field.declared_type.entity_type()?.to_string();
        Some(Arc::new(RelatedEntityAccessor {
            rel_type: rel_type.to_string(),
            direction,
            target,
            field: field.clone(),
            ctx: self.ctx.clone(),
        }))
    }
}

pub struct RelatedEntityAccessor {
    field: FieldDescriptor,
    rel_type: String,
    direction: Direction,
    target: String,
    ctx: MappingContext,
}

impl FieldAccessor for RelatedEntityAccessor {
    fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome> {
        let node = require_node(&self.field, instance)?;
        let related = self
            .ctx
            .store()
            .related_nodes(node, &self.rel_type, self.direction)?;
        // Multiplicity is the store/schema layer's concern; the first
        // match in store order wins.
        match related.first() {
            None => Ok(ValueOutcome::Absent),
            Some(&first) => {
                let entity = self.ctx.instantiator().entity_from_node(first, &self.target)?;
                Ok(ValueOutcome::Computed(FieldValue::Entity(entity)))
            }
        }
    }

    fn set(&self, instance: &dyn BackingInstance, value: &FieldValue) -> AccessResult<()> {
        let node = require_node(&self.field, instance)?;
        let FieldValue::Entity(entity) = value else {
            return Err(AccessError::TypeConversion {
                field: self.field.name.clone(),
                expected: self.field.declared_type.to_string(),
                actual: value.kind(),
            });
        };
        self.ctx
            .store()
            .set_related(node, &self.rel_type, self.direction, &[entity.node])?;
        Ok(())
    }
}

pub struct RelatedCollectionAccessorFactory {
    ctx: MappingContext,
}

impl RelatedCollectionAccessorFactory {
    pub fn new(ctx: MappingContext) -> Self {
        Self { ctx }
    }
}

impl FieldAccessorFactory for RelatedCollectionAccessorFactory {
    fn accepts(&self, field: &FieldDescriptor) -> bool {
        field.has_marker(MarkerKind::Relationship)
            && matches!(field.declared_type, DeclaredType::EntityCollection(_))
    }

    fn create(&self, field: &FieldDescriptor) -> Option<Arc<dyn FieldAccessor>> {
        let (rel_type, direction) = field.relationship_spec()?;
        let target = field.declared_type.entity_type()?.to_string();
        Some(Arc::new(RelatedCollectionAccessor {
            rel_type: rel_type.to_string(),
            direction,
            target,
            field: field.clone(),
            ctx: self.ctx.clone(),
        }))
    }
}

pub struct RelatedCollectionAccessor {
    field: FieldDescriptor,
    rel_type: String,
    direction: Direction,
    target: String,
    ctx: MappingContext,
}

impl FieldAccessor for RelatedCollectionAccessor {
    fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome> {
        let node = require_node(&self.field, instance)?;
        let related = self
            .ctx
            .store()
            .related_nodes(node, &self.rel_type, self.direction)?;
        let entities = related
            .into_iter()
            .map(|n| self.ctx.instantiator().entity_from_node(n, &self.target))
            .collect::<Result<Vec<_>, _>>()?;
        // A collection field with no matches computes an empty list, not
        // an absent value.
        Ok(ValueOutcome::Computed(FieldValue::Entities(entities)))
    }

    fn set(&self, instance: &dyn BackingInstance, value: &FieldValue) -> AccessResult<()> {
        let node = require_node(&self.field, instance)?;
        let FieldValue::Entities(entities) = value else {
            return Err(AccessError::TypeConversion {
                field: self.field.name.clone(),
                expected: self.field.declared_type.to_string(),
                actual: value.kind(),
            });
        };
        let targets: Vec<_> = entities.iter().map(|e| e.node).collect();
        self.ctx
            .store()
            .set_related(node, &self.rel_type, self.direction, &targets)?;
        Ok(())
    }

    fn default_value(&self) -> Option<FieldValue> {
        Some(FieldValue::Entities(Vec::new()))
    }
}
