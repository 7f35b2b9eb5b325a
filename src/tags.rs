//! The tag domain and the tags drawn from it.
//!
//! The domain is the set of keys a tag may use. It lives in its own table and
//! is read back on every call, never cached: adding a key makes it available
//! to [`Persistor::add_tag`] immediately, removing one deletes every tag
//! recorded under it (and, by cascade, their group associations).
//!
//! Domain changes are not coordinated here. Two callers racing to add and
//! remove the same key must be serialized by whoever owns the connection;
//! [`crate::database::Database`] does so by holding its lock for each call.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::construct::{check_tag_key, Identity, Tag};
use crate::error::{KeeperError, Result};
use crate::persist::Persistor;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagDomain {
    keys: Vec<String>,
}

impl TagDomain {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Decodes a `(id, tagKey, tagValue)` row. Every stored tag carries exactly
/// one key; a row without one is corrupt and decoding fails rather than
/// yielding a partial tag.
pub fn decode_tag_row(row: &Row<'_>) -> Result<Tag> {
    let id: Identity = row.get(0)?;
    let key: Option<String> = row.get(1)?;
    let value: Option<String> = row.get(2)?;
    match key {
        Some(key) if !key.is_empty() => Ok(Tag { id: Some(id), key, value }),
        _ => Err(KeeperError::DataCorruption {
            message: format!("Tag[{id}] has no key"),
        }),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

// ------------- Tag domain -------------
impl Persistor {
    pub fn current_domain(&self) -> Result<TagDomain> {
        let mut statement = self
            .connection()
            .prepare_cached("select tagKey from TagDomain order by tagKey collate binary")?;
        let keys = statement
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(TagDomain { keys })
    }
    /// The key as spelled in the domain, if present under any casing.
    pub fn domain_key(&self, key: &str) -> Result<Option<String>> {
        let key = self
            .connection()
            .prepare_cached("select tagKey from TagDomain where tagKey = ?")?
            .query_row(params![key], |r| r.get(0))
            .optional()?;
        Ok(key)
    }
    pub fn add_domain_key(&self, key: &str) -> Result<TagDomain> {
        check_tag_key(key)?;
        if let Some(existing) = self.domain_key(key)? {
            return Err(KeeperError::Conflict(format!(
                "{key} is already part of the domain as {existing}"
            )));
        }
        self.connection()
            .prepare_cached("insert into TagDomain (tagKey, protected) values (?, 0)")?
            .execute(params![key])?;
        info!(key, "tag domain key added");
        self.current_domain()
    }
    /// Adds the key if needed and marks it protected from removal.
    pub fn protect_domain_key(&self, key: &str) -> Result<()> {
        check_tag_key(key)?;
        self.connection()
            .prepare_cached(
                "
                insert into TagDomain (tagKey, protected) values (?, 1)
                    on conflict (tagKey) do update set protected = 1
            ",
            )?
            .execute(params![key])?;
        debug!(key, "tag domain key protected");
        Ok(())
    }
    /// Removes a key together with every tag recorded under it. Removing a
    /// key that is not in the domain is not an error; `false` is returned.
    pub fn remove_domain_key(&self, key: &str) -> Result<bool> {
        let tx = self.connection().unchecked_transaction()?;
        let protected: Option<bool> = self
            .connection()
            .prepare_cached("select protected from TagDomain where tagKey = ?")?
            .query_row(params![key], |r| r.get(0))
            .optional()?;
        match protected {
            None => {
                debug!(key, "tag domain key not present");
                Ok(false)
            }
            Some(true) => Err(KeeperError::Conflict(format!(
                "{key} is a protected part of the domain"
            ))),
            Some(false) => {
                let discarded: i64 = self
                    .connection()
                    .prepare_cached("select count(*) from Tag where tagKey = ?")?
                    .query_row(params![key], |r| r.get(0))?;
                self.connection()
                    .prepare_cached("delete from TagDomain where tagKey = ?")?
                    .execute(params![key])?;
                tx.commit()?;
                info!(key, discarded, "tag domain key removed");
                Ok(true)
            }
        }
    }

    // ------------- Tags -------------
    pub fn add_tag(&self, key: &str, value: Option<&str>) -> Result<Identity> {
        check_tag_key(key)?;
        let canonical = self.domain_key(key)?.ok_or_else(|| {
            KeeperError::Validation(format!("invalid key: {key} is not part of the tag domain"))
        })?;
        self.connection()
            .prepare_cached("insert into Tag (tagKey, tagValue) values (?, ?)")?
            .execute(params![canonical, value])?;
        Ok(self.connection().last_insert_rowid())
    }
    pub fn associate(&self, tag_id: Identity, property_group_id: Identity) -> Result<()> {
        self.connection()
            .prepare_cached(
                "
                insert into TagPropertyGroupXref (
                    tagId,
                    propertyGroupId
                ) values (?, ?)
            ",
            )?
            .execute(params![tag_id, property_group_id])?;
        Ok(())
    }
    pub fn disassociate(&self, tag_id: Identity, property_group_id: Identity) -> Result<usize> {
        let changed = self
            .connection()
            .prepare_cached(
                "delete from TagPropertyGroupXref where tagId = ? and propertyGroupId = ?",
            )?
            .execute(params![tag_id, property_group_id])?;
        Ok(changed)
    }
    pub fn disassociate_group(&self, property_group_id: Identity) -> Result<usize> {
        let changed = self
            .connection()
            .prepare_cached("delete from TagPropertyGroupXref where propertyGroupId = ?")?
            .execute(params![property_group_id])?;
        Ok(changed)
    }
    /// Deletes those of the given tags that no group refers to anymore. A tag
    /// still attached elsewhere is kept.
    pub fn remove_unattached(&self, tag_ids: &[Identity]) -> Result<usize> {
        if tag_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "delete from Tag where id in ({}) and id not in (select tagId from TagPropertyGroupXref)",
            placeholders(tag_ids.len())
        );
        Ok(self.connection().execute(&sql, params_from_iter(tag_ids))?)
    }
    pub fn tag(&self, tag_id: Identity) -> Result<Option<Tag>> {
        let mut statement = self
            .connection()
            .prepare_cached("select id, tagKey, tagValue from Tag where id = ?")?;
        let mut rows = statement.query(params![tag_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(decode_tag_row(row)?)),
            None => Ok(None),
        }
    }
    pub fn tags_of_group(&self, property_group_id: Identity) -> Result<Vec<Tag>> {
        let mut statement = self.connection().prepare_cached(
            "
            select t.id, t.tagKey, t.tagValue
                from Tag t
                inner join TagPropertyGroupXref x
                on t.id = x.tagId
                where x.propertyGroupId = ?
                order by t.id
        ",
        )?;
        let mut rows = statement.query(params![property_group_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(decode_tag_row(row)?);
        }
        Ok(tags)
    }
}
