//! Scalar property accessor: fields of store-representable type map to a
//! property slot on the backing instance's graph element, with type
//! coercion at both read and write time.

use std::sync::Arc;

use crate::accessor::{FieldAccessor, FieldAccessorFactory, ValueOutcome, require_element};
use crate::convert::coerce;
use crate::element::{BackingInstance, MappingContext};
use crate::errors::{AccessError, AccessResult};
use crate::types::{FieldDescriptor, FieldValue, MarkerKind};

pub struct PropertyAccessorFactory {
    ctx: MappingContext,
}

impl PropertyAccessorFactory {
    pub fn new(ctx: MappingContext) -> Self {
        Self { ctx }
    }
}

impl FieldAccessorFactory for PropertyAccessorFactory {
    fn accepts(&self, field: &FieldDescriptor) -> bool {
        field.declared_type.is_store_scalar()
            && !field.has_marker(MarkerKind::StartNode)
            && !field.has_marker(MarkerKind::EndNode)
            && !field.has_marker(MarkerKind::Relationship)
    }

    fn create(&self, field: &FieldDescriptor) -> Option<Arc<dyn FieldAccessor>> {
        Some(Arc::new(PropertyAccessor {
            key: field.property_key().to_string(),
            field: field.clone(),
            ctx: self.ctx.clone(),
        }))
    }
}

pub struct PropertyAccessor {
    field: FieldDescriptor,
    key: String,
    ctx: MappingContext,
}

impl PropertyAccessor {
    fn conversion_error(&self, rejected: &'static str) -> AccessError {
        AccessError::TypeConversion {
            field: self.field.name.clone(),
            expected: self.field.declared_type.to_string(),
            actual: rejected,
        }
    }
}

impl FieldAccessor for PropertyAccessor {
    fn get(&self, instance: &dyn BackingInstance) -> AccessResult<ValueOutcome> {
        let element = require_element(&self.field, instance)?;
        let Some(raw) = self.ctx.store().element_property(element, &self.key)? else {
            return Ok(ValueOutcome::Absent);
        };
        let value = coerce(raw, &self.field.declared_type)
            .map_err(|rejected| self.conversion_error(rejected.kind()))?;
        Ok(ValueOutcome::Computed(FieldValue::Scalar(value)))
    }

    fn set(&self, instance: &dyn BackingInstance, value: &FieldValue) -> AccessResult<()> {
        let element = require_element(&self.field, instance)?;
        let FieldValue::Scalar(raw) = value else {
            return Err(self.conversion_error(value.kind()));
        };
        let coerced = coerce(raw.clone(), &self.field.declared_type)
            .map_err(|rejected| self.conversion_error(rejected.kind()))?;
        self.ctx.store().set_element_property(element, &self.key, coerced)?;
        Ok(())
    }
}
