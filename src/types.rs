use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::element::{Direction, DomainEntity};

/// Immutable description of one mapped field, supplied by the external
/// metadata provider.
///
/// Mapping intent is expressed through markers resolved once at
/// registration, not probed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Owning entity type name.
    pub entity: String,
    /// Field name as declared on the domain object.
    pub name: String,
    pub declared_type: DeclaredType,
    pub markers: Vec<FieldMarker>,
}

impl FieldDescriptor {
    pub fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        declared_type: DeclaredType,
    ) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            declared_type,
            markers: Vec::new(),
        }
    }

    /// Builder-style helper for attaching a marker.
    pub fn with_marker(mut self, marker: FieldMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn has_marker(&self, kind: MarkerKind) -> bool {
        self.markers.iter().any(|m| m.kind() == kind)
    }

    pub fn marker(&self, kind: MarkerKind) -> Option<&FieldMarker> {
        self.markers.iter().find(|m| m.kind() == kind)
    }

    /// Store property key for this field: the explicit key carried by a
    /// property marker, or the field name.
    pub fn property_key(&self) -> &str {
        match self.marker(MarkerKind::Property) {
            Some(FieldMarker::Property { key: Some(key) }) => key,
            _ => &self.name,
        }
    }

    /// Relationship type and direction, when the field carries a
    /// relationship marker.
    pub fn relationship_spec(&self) -> Option<(&str, Direction)> {
        match self.marker(MarkerKind::Relationship) {
            Some(FieldMarker::Relationship { rel_type, direction }) => {
                Some((rel_type.as_str(), *direction))
            }
            _ => None,
        }
    }
}

/// An entity type's name plus its ordered field descriptors; the unit of
/// eager registry population at metadata-load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub entity: String,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn new(entity: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            entity: entity.into(),
            fields,
        }
    }
}

/// Tagged mapping intent on a field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldMarker {
    /// Field maps to the start node of the backing relationship.
    StartNode,
    /// Field maps to the end node of the backing relationship.
    EndNode,
    /// Field maps to entities reached over relationships of `rel_type`.
    Relationship { rel_type: String, direction: Direction },
    /// Field maps to a property slot, optionally under an explicit key.
    Property { key: Option<String> },
    /// Field participates in the external index.
    Indexed,
}

impl FieldMarker {
    pub fn kind(&self) -> MarkerKind {
        match self {
            FieldMarker::StartNode => MarkerKind::StartNode,
            FieldMarker::EndNode => MarkerKind::EndNode,
            FieldMarker::Relationship { .. } => MarkerKind::Relationship,
            FieldMarker::Property { .. } => MarkerKind::Property,
            FieldMarker::Indexed => MarkerKind::Indexed,
        }
    }
}

/// Discriminant used to query a descriptor's marker set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    StartNode,
    EndNode,
    Relationship,
    Property,
    Indexed,
}

/// Declared type of a mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Uuid,
    /// Reference to another mapped entity type.
    Entity(String),
    /// Collection of references to another mapped entity type.
    EntityCollection(String),
}

impl DeclaredType {
    /// True for types the store can hold directly in a property slot.
    pub fn is_store_scalar(&self) -> bool {
        matches!(
            self,
            DeclaredType::Text
                | DeclaredType::Integer
                | DeclaredType::Float
                | DeclaredType::Boolean
                | DeclaredType::DateTime
                | DeclaredType::Uuid
        )
    }

    /// Target entity type name for entity-valued declarations.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            DeclaredType::Entity(name) | DeclaredType::EntityCollection(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Text => f.write_str("text"),
            DeclaredType::Integer => f.write_str("integer"),
            DeclaredType::Float => f.write_str("float"),
            DeclaredType::Boolean => f.write_str("boolean"),
            DeclaredType::DateTime => f.write_str("datetime"),
            DeclaredType::Uuid => f.write_str("uuid"),
            DeclaredType::Entity(name) => write!(f, "entity {name}"),
            DeclaredType::EntityCollection(name) => write!(f, "collection of {name}"),
        }
    }
}

/// The store's property type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Short kind name used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::Text(_) => "text",
            PropertyValue::DateTime(_) => "datetime",
            PropertyValue::List(_) => "list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(value)
    }
}

/// Runtime value crossing the accessor boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(PropertyValue),
    Entity(DomainEntity),
    Entities(Vec<DomainEntity>),
}

impl FieldValue {
    /// Short kind name used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Scalar(value) => value.kind(),
            FieldValue::Entity(_) => "entity",
            FieldValue::Entities(_) => "entity collection",
        }
    }

    pub fn as_scalar(&self) -> Option<&PropertyValue> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&DomainEntity> {
        match self {
            FieldValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_entities(&self) -> Option<&[DomainEntity]> {
        match self {
            FieldValue::Entities(entities) => Some(entities),
            _ => None,
        }
    }
}

impl From<PropertyValue> for FieldValue {
    fn from(value: PropertyValue) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<DomainEntity> for FieldValue {
    fn from(entity: DomainEntity) -> Self {
        FieldValue::Entity(entity)
    }
}
