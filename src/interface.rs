//! The boundary a transport talks to.
//!
//! A transport collects the raw query parameters of a filter request into
//! [`QueryParams`] and turns them into a [`FilterRequest`] here. The dispatch
//! rule is the same for every entity: `start`, `limit` and `sort` are paging
//! and ordering, names from the entity's field list become filter bindings,
//! and anything else is read as a tag predicate (for entities that can carry
//! tags). Results travel back in a [`PagedResponse`].

use serde::Serialize;

use crate::error::{KeeperError, Result};
use crate::filter::{Entity, FilterBindings, Pagination, TagPredicates, DEFAULT_PAGE_SIZE};
use crate::sort::Sort;

/// Raw query parameters in arrival order. A name may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((name.into(), value.into()));
        self
    }
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

const START: &str = "start";
const LIMIT: &str = "limit";
const SORT: &str = "sort";

#[derive(Debug, Clone)]
pub struct FilterRequest<E: Entity> {
    pub bindings: FilterBindings<E>,
    pub tags: TagPredicates,
    pub sorts: Vec<Sort>,
    pub page: Pagination,
}

impl<E: Entity> Default for FilterRequest<E> {
    fn default() -> Self {
        Self {
            bindings: FilterBindings::default(),
            tags: TagPredicates::default(),
            sorts: Vec::new(),
            page: Pagination::default(),
        }
    }
}

impl<E: Entity> FilterRequest<E> {
    pub fn new(bindings: FilterBindings<E>, page: Pagination) -> Self {
        Self { bindings, page, ..Self::default() }
    }
    pub fn with_tags(mut self, tags: TagPredicates) -> Self {
        self.tags = tags;
        self
    }
    pub fn with_sorts(mut self, sorts: Vec<Sort>) -> Self {
        self.sorts = sorts;
        self
    }

    /// Applies the dispatch rule to raw parameters. Only the first value of
    /// a repeated field or tag name counts; every `sort` value is kept, in
    /// order.
    pub fn from_query(params: &QueryParams, default_limit: i64) -> Result<Self> {
        let start = parse_integer(START, params.first(START), 0)?;
        let limit = parse_integer(LIMIT, params.first(LIMIT), default_limit)?;
        let page = Pagination::new(start, limit)?;
        let sorts = params
            .all(SORT)
            .map(str::parse)
            .collect::<Result<Vec<Sort>>>()?;

        let mut bindings = FilterBindings::<E>::new();
        let mut tags = TagPredicates::new();
        for (name, value) in params.iter() {
            if matches!(name, START | LIMIT | SORT) {
                continue;
            }
            if FilterBindings::<E>::recognizes(name) {
                if bindings.get(name).is_none() {
                    bindings.bind(name, value)?;
                }
                continue;
            }
            if !E::TAGGABLE {
                return Err(KeeperError::Validation(format!(
                    "'{name}' is not a filterable field of {}",
                    E::NAME
                )));
            }
            if !tags.iter().any(|(key, _)| key.eq_ignore_ascii_case(name)) {
                tags.insert(name, value)?;
            }
        }
        Ok(Self { bindings, tags, sorts, page })
    }

    pub fn from_query_default(params: &QueryParams) -> Result<Self> {
        Self::from_query(params, DEFAULT_PAGE_SIZE)
    }
}

fn parse_integer(name: &str, value: Option<&str>, default: i64) -> Result<i64> {
    match value {
        None => Ok(default),
        Some(text) => text.trim().parse().map_err(|_| {
            KeeperError::Validation(format!("{name} must be an integer, got '{text}'"))
        }),
    }
}

// ------------- PagedResponse -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub result: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total_results: i64,
}

impl<T> PagedResponse<T> {
    pub fn new(result: Vec<T>, page: &Pagination, total_results: i64) -> Self {
        Self {
            result,
            page_number: page.page_number(),
            page_size: page.limit(),
            total_results,
        }
    }
}
