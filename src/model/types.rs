//! Serializable metadata model: entities, attributes, keys.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A record as exchanged over the API: attribute property name -> value, in attribute order.
pub type Record = Map<String, Value>;

/// Normalized data type tag derived from the PostgreSQL column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    String,
    Int32,
    Int64,
    Bool,
    Float,
    Currency,
    Date,
    Time,
    DateTime,
    Guid,
    Blob,
    Json,
    Unknown,
}

impl DataType {
    /// Map a PostgreSQL `udt_name` (e.g. `int4`, `varchar`, `timestamptz`) to a tag.
    pub fn from_pg(udt_name: &str) -> Self {
        match udt_name {
            "text" | "varchar" | "bpchar" | "char" | "name" | "citext" => DataType::String,
            "int2" | "int4" => DataType::Int32,
            "int8" => DataType::Int64,
            "bool" => DataType::Bool,
            "float4" | "float8" => DataType::Float,
            "numeric" | "money" => DataType::Currency,
            "date" => DataType::Date,
            "time" | "timetz" => DataType::Time,
            "timestamp" | "timestamptz" => DataType::DateTime,
            "uuid" => DataType::Guid,
            "bytea" => DataType::Blob,
            "json" | "jsonb" => DataType::Json,
            _ => DataType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Bool => "Bool",
            DataType::Float => "Float",
            DataType::Currency => "Currency",
            DataType::Date => "Date",
            DataType::Time => "Time",
            DataType::DateTime => "DateTime",
            DataType::Guid => "Guid",
            DataType::Blob => "Blob",
            DataType::Json => "Json",
            DataType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Foreign key target of a single-column reference.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRef {
    pub entity: String,
    pub attribute: String,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// `<EntityId>.<column>`
    pub id: String,
    /// Column name; the key used in property bags and records.
    pub prop_name: String,
    pub caption: String,
    pub data_type: DataType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_editable: bool,
    pub is_visible: bool,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupRef>,
    /// Column has a default, identity or generation expression.
    #[serde(skip)]
    pub has_default: bool,
    /// PostgreSQL `udt_name`.
    #[serde(skip)]
    pub sql_type: String,
    /// Type used in `$n::<cast>` placeholders; schema-qualified and quoted for user-defined types.
    #[serde(skip)]
    pub cast_type: String,
    /// Position within the primary key (0-based), if part of it.
    #[serde(skip)]
    pub key_position: Option<usize>,
}

impl Attribute {
    /// Participates in free-text filtering.
    pub fn is_searchable(&self) -> bool {
        self.is_enabled && self.is_visible && self.data_type != DataType::Blob
    }

    pub fn is_tz_aware(&self) -> bool {
        self.sql_type == "timestamptz" || self.sql_type == "timetz"
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    /// Container name.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub table_name: String,
    pub attributes: Vec<Attribute>,
    key_indices: Vec<usize>,
    field_map: HashMap<String, usize>,
}

impl Entity {
    /// Build an entity; key order follows each attribute's `key_position`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        table_name: impl Into<String>,
        attributes: Vec<Attribute>,
    ) -> Self {
        let mut keyed: Vec<(usize, usize)> = attributes
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.key_position.map(|p| (p, i)))
            .collect();
        keyed.sort_unstable();
        let field_map = attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.prop_name.clone(), i))
            .collect();
        Entity {
            id: id.into(),
            name: name.into(),
            description,
            table_name: table_name.into(),
            attributes,
            key_indices: keyed.into_iter().map(|(_, i)| i).collect(),
            field_map,
        }
    }

    /// Key attributes in primary-key declaration order.
    pub fn key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.key_indices.iter().map(move |&i| &self.attributes[i])
    }

    pub fn key_len(&self) -> usize {
        self.key_indices.len()
    }

    /// Attribute index for a property name.
    pub fn field_index(&self, prop_name: &str) -> Option<usize> {
        self.field_map.get(prop_name).copied()
    }

    pub fn attribute(&self, prop_name: &str) -> Option<&Attribute> {
        self.field_index(prop_name).map(|i| &self.attributes[i])
    }

    pub fn searchable_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_searchable())
    }

    /// Zip a row (values in attribute order) into a record.
    pub fn record_from_row(&self, row: Vec<Value>) -> Record {
        self.attributes
            .iter()
            .map(|a| a.prop_name.clone())
            .zip(row)
            .collect()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Entity", 5)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        if let Some(d) = &self.description {
            s.serialize_field("description", d)?;
        }
        let keys: Vec<&str> = self.key_attributes().map(|a| a.id.as_str()).collect();
        s.serialize_field("keyAttrs", &keys)?;
        s.serialize_field("attributes", &self.attributes)?;
        s.end()
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    pub id: String,
    pub name: String,
    /// Database schema the model was introspected from.
    pub schema: String,
    entities: Vec<Entity>,
    entity_by_id: HashMap<String, usize>,
}

impl Model {
    /// Entities are kept sorted by id.
    pub fn new(id: impl Into<String>, name: impl Into<String>, schema: impl Into<String>, mut entities: Vec<Entity>) -> Self {
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        let entity_by_id = entities.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();
        Model {
            id: id.into(),
            name: name.into(),
            schema: schema.into(),
            entities,
            entity_by_id,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entity_by_id.get(id).map(|&i| &self.entities[i])
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityRoot<'a> {
    id: &'static str,
    name: &'static str,
    sub_entities: &'a [Entity],
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Model", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field(
            "entityRoot",
            &EntityRoot {
                id: "",
                name: "Root",
                sub_entities: &self.entities,
            },
        )?;
        s.end()
    }
}
