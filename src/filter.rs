//! Request-scoped filter criteria: field bindings, tag predicates and pagination.
//!
//! Every entity that can be filtered publishes a fixed allow-list of fields
//! through the [`Entity`] trait. Those names are the only ones accepted as
//! bindings or sort fields, and the columns they map to are the only
//! identifiers that ever end up inside generated SQL.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use rusqlite::Row;
use rusqlite::types::Value;

use crate::construct::{check_tag_key, Property, PropertyGroup};
use crate::error::{KeeperError, Result};
use crate::sort::Direction;

pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

pub trait Entity: Sized {
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Selected in this order by every fetch, which is what `from_row` relies on.
    const FIELDS: &'static [Field];
    const DEFAULT_SORT: &'static [(&'static str, Direction)];
    /// Whether tag predicates can be applied through the association table.
    const TAGGABLE: bool;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}

impl Entity for PropertyGroup {
    const NAME: &'static str = "PropertyGroup";
    const TABLE: &'static str = "PropertyGroup";
    const FIELDS: &'static [Field] = &[
        Field { name: "id", column: "id", kind: FieldKind::Integer },
        Field { name: "name", column: "name", kind: FieldKind::Text },
        Field { name: "version", column: "version", kind: FieldKind::Text },
        Field { name: "status", column: "status", kind: FieldKind::Text },
    ];
    const DEFAULT_SORT: &'static [(&'static str, Direction)] =
        &[("status", Direction::Asc), ("id", Direction::Asc)];
    const TAGGABLE: bool = true;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PropertyGroup {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            status: row.get(3)?,
        })
    }
}

impl Entity for Property {
    const NAME: &'static str = "Property";
    const TABLE: &'static str = "Property";
    const FIELDS: &'static [Field] = &[
        Field { name: "id", column: "id", kind: FieldKind::Integer },
        Field { name: "key", column: "key", kind: FieldKind::Text },
        Field { name: "value", column: "value", kind: FieldKind::Text },
        Field { name: "description", column: "description", kind: FieldKind::Text },
        Field { name: "propertyGroupId", column: "propertyGroupId", kind: FieldKind::Integer },
    ];
    const DEFAULT_SORT: &'static [(&'static str, Direction)] = &[("id", Direction::Asc)];
    const TAGGABLE: bool = false;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Property {
            id: Some(row.get(0)?),
            key: row.get(1)?,
            value: row.get(2)?,
            description: row.get(3)?,
            property_group_id: row.get(4)?,
        })
    }
}

// ------------- FilterBindings -------------
/// Optional equality constraints over the recognized fields of `E`.
///
/// A field that is not bound places no constraint on the result, which is
/// expressed in SQL as `(column = ?n OR ?n IS NULL)` with `NULL` bound.
#[derive(Debug, Clone)]
pub struct FilterBindings<E: Entity> {
    values: BTreeMap<&'static str, String>,
    entity: PhantomData<E>,
}

impl<E: Entity> Default for FilterBindings<E> {
    fn default() -> Self {
        Self { values: BTreeMap::new(), entity: PhantomData }
    }
}

impl<E: Entity> FilterBindings<E> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn recognizes(name: &str) -> bool {
        E::field(name).is_some()
    }
    /// Binds a value to a recognized field, replacing any earlier binding.
    pub fn bind(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self> {
        let field = E::field(name).ok_or_else(|| {
            KeeperError::Validation(format!("'{name}' is not a filterable field of {}", E::NAME))
        })?;
        self.values.insert(field.name, value.into());
        Ok(self)
    }
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Result<Self> {
        self.bind(name, value)?;
        Ok(self)
    }
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// The SQL parameter for a field: `NULL` when unbound. Integer fields are
    /// bound as integers when the text parses, otherwise as text that matches
    /// no row.
    pub fn parameter(&self, field: &Field) -> Value {
        match (self.values.get(field.name), field.kind) {
            (None, _) => Value::Null,
            (Some(value), FieldKind::Integer) => value
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(value.clone())),
            (Some(value), FieldKind::Text) => Value::Text(value.clone()),
        }
    }
}

// ------------- TagPredicates -------------
/// Required tag associations; every predicate must hold (logical AND).
/// Keys are matched case-insensitively, values by strict equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPredicates {
    // lowercased key -> (key as given, value)
    predicates: BTreeMap<String, (String, String)>,
}

impl TagPredicates {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<&mut Self> {
        check_tag_key(key)?;
        self.predicates
            .insert(key.to_ascii_lowercase(), (key.to_string(), value.into()));
        Ok(self)
    }
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
    pub fn len(&self) -> usize {
        self.predicates.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

// ------------- Pagination -------------
/// Offset based paging. Pages are recomputed on every request, so rows
/// inserted or deleted between two requests shift page membership: a row can
/// be skipped or seen twice. Callers needing a stable walk must not write
/// concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    start: i64,
    limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { start: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(start: i64, limit: i64) -> Result<Self> {
        if start < 0 {
            return Err(KeeperError::Validation(format!("start must be >= 0, got {start}")));
        }
        if limit < 1 {
            return Err(KeeperError::Validation(format!("limit must be >= 1, got {limit}")));
        }
        Ok(Self { start, limit })
    }
    pub fn start(&self) -> i64 {
        self.start
    }
    pub fn limit(&self) -> i64 {
        self.limit
    }
    pub fn page_number(&self) -> i64 {
        self.start / self.limit
    }
}
