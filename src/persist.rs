// used for persistence
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::time::Duration;
use tracing::debug;

use crate::compose::ComposedPair;
use crate::construct::{Identity, Property, PropertyGroup};
use crate::error::Result;
use crate::filter::Entity;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// ------------- Persistence -------------
pub struct Persistor {
    db: Connection,
}
impl Persistor {
    pub fn new(mode: PersistenceMode, busy_timeout: Duration) -> Result<Persistor> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        connection.busy_timeout(busy_timeout)?;
        // cascades below depend on this, and SQLite has it off per connection
        connection.pragma_update(None, "foreign_keys", true)?;
        connection.execute_batch(
            "
            create table if not exists PropertyGroup (
                id integer not null,
                name text not null,
                version text not null,
                status text not null,
                constraint referenceable_PropertyGroup_id primary key (
                    id
                )
            );
            create index if not exists PropertyGroup_name_version on PropertyGroup (
                name,
                version
            );
            create table if not exists Property (
                id integer not null,
                key text not null,
                value text null,
                description text null,
                propertyGroupId integer not null,
                constraint referenceable_Property_id primary key (
                    id
                )
            );
            create index if not exists Property_propertyGroupId on Property (
                propertyGroupId
            );
            create table if not exists TagDomain (
                tagKey text not null collate nocase,
                protected integer not null default 0,
                constraint unique_TagDomain_tagKey primary key (
                    tagKey
                )
            );
            create table if not exists Tag (
                id integer not null,
                tagKey text null collate nocase,
                tagValue text null,
                constraint Tag_in_TagDomain foreign key (
                    tagKey
                ) references TagDomain(tagKey) on delete cascade,
                constraint referenceable_Tag_id primary key (
                    id
                )
            );
            create index if not exists Tag_tagKey_tagValue on Tag (
                tagKey,
                tagValue
            );
            create table if not exists TagPropertyGroupXref (
                tagId integer not null,
                propertyGroupId integer not null,
                constraint Xref_has_Tag foreign key (
                    tagId
                ) references Tag(id) on delete cascade,
                constraint Xref_has_PropertyGroup foreign key (
                    propertyGroupId
                ) references PropertyGroup(id) on delete cascade,
                constraint unique_TagPropertyGroupXref primary key (
                    tagId,
                    propertyGroupId
                )
            );
            create index if not exists TagPropertyGroupXref_propertyGroupId on TagPropertyGroupXref (
                propertyGroupId
            );
            ",
        )?;
        debug!(?mode, "schema ready");
        Ok(Persistor { db: connection })
    }
    pub fn connection(&self) -> &Connection {
        &self.db
    }

    // ------------- PropertyGroup -------------
    pub fn insert_property_group(&self, group: &PropertyGroup) -> Result<Identity> {
        self.db
            .prepare_cached(
                "
                insert into PropertyGroup (
                    name,
                    version,
                    status
                ) values (?, ?, ?)
            ",
            )?
            .execute(params![&group.name, &group.version, &group.status])?;
        Ok(self.db.last_insert_rowid())
    }
    pub fn update_property_group(&self, id: Identity, group: &PropertyGroup) -> Result<usize> {
        let changed = self
            .db
            .prepare_cached(
                "
                update PropertyGroup
                    set name = ?, version = ?, status = ?
                    where id = ?
            ",
            )?
            .execute(params![&group.name, &group.version, &group.status, id])?;
        Ok(changed)
    }
    pub fn delete_property_group(&self, id: Identity) -> Result<usize> {
        let changed = self
            .db
            .prepare_cached("delete from PropertyGroup where id = ?")?
            .execute(params![id])?;
        Ok(changed)
    }
    pub fn property_group(&self, id: Identity) -> Result<Option<PropertyGroup>> {
        let group = self
            .db
            .prepare_cached(
                "
                select id, name, version, status
                    from PropertyGroup
                    where id = ?
            ",
            )?
            .query_row(params![id], PropertyGroup::from_row)
            .optional()?;
        Ok(group)
    }

    // ------------- Property -------------
    pub fn insert_property(&self, property: &Property) -> Result<Identity> {
        self.db
            .prepare_cached(
                "
                insert into Property (
                    key,
                    value,
                    description,
                    propertyGroupId
                ) values (?, ?, ?, ?)
            ",
            )?
            .execute(params![
                &property.key,
                &property.value,
                &property.description,
                &property.property_group_id
            ])?;
        Ok(self.db.last_insert_rowid())
    }
    pub fn update_property(&self, id: Identity, property: &Property) -> Result<usize> {
        let changed = self
            .db
            .prepare_cached(
                "
                update Property
                    set key = ?, value = ?, description = ?, propertyGroupId = ?
                    where id = ?
            ",
            )?
            .execute(params![
                &property.key,
                &property.value,
                &property.description,
                &property.property_group_id,
                id
            ])?;
        Ok(changed)
    }
    pub fn delete_property(&self, id: Identity) -> Result<usize> {
        let changed = self
            .db
            .prepare_cached("delete from Property where id = ?")?
            .execute(params![id])?;
        Ok(changed)
    }
    pub fn property(&self, id: Identity) -> Result<Option<Property>> {
        let property = self
            .db
            .prepare_cached(
                "
                select id, key, value, description, propertyGroupId
                    from Property
                    where id = ?
            ",
            )?
            .query_row(params![id], Property::from_row)
            .optional()?;
        Ok(property)
    }

    // ------------- Filtering -------------
    /// Runs a composed fetch and its count inside one read transaction, so
    /// both observe the same snapshot. Either both succeed or nothing is
    /// returned.
    pub fn filter<E: Entity>(&mut self, pair: &ComposedPair) -> Result<(Vec<E>, i64)> {
        let tx = self.db.transaction()?;
        let rows = {
            let mut statement = tx.prepare_cached(&pair.fetch.sql)?;
            let params: Vec<&dyn ToSql> =
                pair.fetch.params.iter().map(|p| p as &dyn ToSql).collect();
            statement
                .query_map(params.as_slice(), E::from_row)?
                .collect::<rusqlite::Result<Vec<E>>>()?
        };
        let total: i64 = {
            let mut statement = tx.prepare_cached(&pair.count.sql)?;
            let params: Vec<&dyn ToSql> =
                pair.count.params.iter().map(|p| p as &dyn ToSql).collect();
            statement.query_row(params.as_slice(), |r| r.get(0))?
        };
        tx.commit()?;
        Ok((rows, total))
    }
}
