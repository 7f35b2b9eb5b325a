//! Propkeeper – a small configuration store for property groups, properties and tags.
//!
//! The store keeps three kinds of constructs:
//! * A [`construct::PropertyGroup`] is a named, versioned and status‑tagged container.
//! * A [`construct::Property`] is a key/value/description record belonging to a group.
//! * A [`construct::Tag`] is a queryable key/value attribute attached to a group,
//!   whose key must be drawn from the current [`tags::TagDomain`].
//!
//! Identity is generated by the store and incidental: constructs compare by content.
//!
//! ## Modules
//! * [`construct`] – The constructs and their validation rules.
//! * [`sort`] – Ordering directives parsed from tokens like `"name desc"`.
//! * [`filter`] – Field bindings, tag predicates, pagination and the per‑entity
//!   field allow‑lists.
//! * [`compose`] – Builds the paired fetch and count statements.
//! * [`tags`] – The tag domain and tag storage.
//! * [`persist`] – SQLite schema and statements.
//! * [`database`] – The shared store handle and the rules callers rely on.
//! * [`interface`] – Query parameter dispatch and the paged response envelope.
//! * [`settings`] – Layered configuration.
//!
//! ## Filtering
//! Every recognized field of an entity takes part in the generated `WHERE`
//! clause as `(column = ?n OR ?n IS NULL)`, with `NULL` bound for fields the
//! caller left out. Tag predicates add one join pair per key. The count
//! statement shares the filter text and parameters with the fetch, minus
//! ordering and paging, so `totalResults` always describes the same set.
//!
//! ## Quick Start
//! ```
//! use propkeeper::construct::{PropertyGroup, Status};
//! use propkeeper::database::Database;
//! use propkeeper::interface::{FilterRequest, QueryParams};
//! use propkeeper::persist::PersistenceMode;
//!
//! let db = Database::new(PersistenceMode::InMemory).unwrap();
//! let id = db.create_property_group(&PropertyGroup::new("svc", "1.0", Status::Active)).unwrap();
//! let params: QueryParams = [("name", "svc")].into_iter().collect();
//! let page = db.filter_property_groups(&FilterRequest::from_query_default(&params).unwrap()).unwrap();
//! assert_eq!(page.total_results, 1);
//! assert_eq!(page.result[0].id, Some(id));
//! ```
//!
//! ## Consistency
//! Paging is offset based and recomputed per request. Writes landing between
//! two page requests can shift rows across pages.

pub mod compose;
pub mod construct;
pub mod database;
pub mod error;
pub mod filter;
pub mod interface;
pub mod persist;
pub mod settings;
pub mod sort;
pub mod tags;
