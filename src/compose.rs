//! Turns filter bindings, tag predicates, sorts and pagination into a pair of
//! parameterized statements: one fetching a page of rows and one counting
//! every row that matches.
//!
//! Both statements are built from the same `FROM`/`WHERE` text and the same
//! leading parameters, so the count always describes the filtered set the
//! page was cut from. Only the fetch carries `ORDER BY`, `LIMIT` and `OFFSET`.
//!
//! Identifiers come exclusively from the entity's static field list; every
//! caller supplied value is bound as a parameter.

use std::collections::HashSet;
use std::marker::PhantomData;

use rusqlite::types::Value;

use crate::error::{KeeperError, Result};
use crate::filter::{Entity, FilterBindings, Pagination, TagPredicates};
use crate::sort::Sort;

const ALIAS: &str = "e";

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPair {
    pub fetch: ComposedQuery,
    pub count: ComposedQuery,
}

pub struct QueryComposer<E: Entity> {
    entity: PhantomData<E>,
}

impl<E: Entity> QueryComposer<E> {
    pub fn compose(
        bindings: &FilterBindings<E>,
        tags: &TagPredicates,
        sorts: &[Sort],
        page: &Pagination,
    ) -> Result<ComposedPair> {
        if !tags.is_empty() && !E::TAGGABLE {
            return Err(KeeperError::Validation(format!(
                "{} cannot be filtered by tags",
                E::NAME
            )));
        }
        let order = Self::order_by(sorts)?;

        let mut params = Vec::with_capacity(E::FIELDS.len() + 2 * tags.len() + 2);
        let mut predicates = Vec::with_capacity(E::FIELDS.len());
        for field in E::FIELDS {
            params.push(bindings.parameter(field));
            let n = params.len();
            predicates.push(format!(
                "({ALIAS}.{column} = ?{n} OR ?{n} IS NULL)",
                column = field.column
            ));
        }

        // one aliased join pair per tag key, each key being its own constraint
        let mut joins = String::new();
        for (i, (key, value)) in tags.iter().enumerate() {
            params.push(Value::Text(key.to_string()));
            let k = params.len();
            params.push(Value::Text(value.to_string()));
            let v = params.len();
            joins.push_str(&format!(
                " INNER JOIN TagPropertyGroupXref x{i} ON x{i}.propertyGroupId = {ALIAS}.id \
                 INNER JOIN Tag t{i} ON t{i}.id = x{i}.tagId AND t{i}.tagKey = ?{k} AND t{i}.tagValue = ?{v}"
            ));
        }

        let from_where = format!(
            "FROM {table} {ALIAS}{joins} WHERE {predicates}",
            table = E::TABLE,
            predicates = predicates.join(" AND ")
        );
        let columns = E::FIELDS
            .iter()
            .map(|f| format!("{ALIAS}.{}", f.column))
            .collect::<Vec<_>>()
            .join(", ");

        // joined rows multiply per matching tag, so collapse them back to entities
        let (distinct, counted) = if tags.is_empty() {
            ("", "*".to_string())
        } else {
            ("DISTINCT ", format!("DISTINCT {ALIAS}.id"))
        };

        let count = ComposedQuery {
            sql: format!("SELECT COUNT({counted}) {from_where}"),
            params: params.clone(),
        };

        params.push(Value::Integer(page.limit()));
        let l = params.len();
        params.push(Value::Integer(page.start()));
        let o = params.len();
        let fetch = ComposedQuery {
            sql: format!(
                "SELECT {distinct}{columns} {from_where} ORDER BY {order} LIMIT ?{l} OFFSET ?{o}"
            ),
            params,
        };

        Ok(ComposedPair { fetch, count })
    }

    /// Resolves sort fields against the allow-list, falling back to the
    /// entity's default order. Unknown fields are rejected; a repeated field
    /// keeps its first direction.
    fn order_by(sorts: &[Sort]) -> Result<String> {
        let defaults;
        let sorts = if sorts.is_empty() {
            defaults = E::DEFAULT_SORT
                .iter()
                .map(|(field, direction)| Sort::new(*field, *direction))
                .collect::<Result<Vec<_>>>()?;
            &defaults[..]
        } else {
            sorts
        };
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for sort in sorts {
            let field = E::field(sort.field()).ok_or_else(|| {
                KeeperError::Validation(format!(
                    "cannot sort {} by unknown field '{}'",
                    E::NAME,
                    sort.field()
                ))
            })?;
            if seen.insert(field.name) {
                terms.push(format!(
                    "{ALIAS}.{} {}",
                    field.column,
                    sort.direction().keyword()
                ));
            }
        }
        Ok(terms.join(", "))
    }
}
