//! The store handle handed to request handlers.
//!
//! A [`Database`] is built once by the composition root and cloned into
//! whatever serves requests. Clones share one [`Persistor`] behind a mutex, so
//! calls are serialized on its connection; that includes tag domain changes,
//! which must never interleave with tag writes on the same key.
//!
//! On top of the raw persistence calls this layer enforces the rules a
//! resource would: no create for a construct that already has an identity,
//! matching identities on update, and a distinct not-found outcome for
//! missing rows.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};

use crate::compose::QueryComposer;
use crate::construct::{Identity, Property, PropertyGroup, Status, Tag};
use crate::error::{KeeperError, Result};
use crate::filter::{Entity, FilterBindings, Pagination, TagPredicates};
use crate::interface::{FilterRequest, PagedResponse};
use crate::persist::{PersistenceMode, Persistor, DEFAULT_BUSY_TIMEOUT};
use crate::settings::DatabaseSettings;
use crate::sort::Sort;
use crate::tags::TagDomain;

#[derive(Clone)]
pub struct Database {
    persistor: Arc<Mutex<Persistor>>,
}

impl Database {
    pub fn new(mode: PersistenceMode) -> Result<Database> {
        Self::with_busy_timeout(mode, DEFAULT_BUSY_TIMEOUT)
    }
    pub fn with_busy_timeout(mode: PersistenceMode, busy_timeout: Duration) -> Result<Database> {
        let persistor = Persistor::new(mode, busy_timeout)?;
        Ok(Database {
            persistor: Arc::new(Mutex::new(persistor)),
        })
    }
    pub fn open(settings: &DatabaseSettings) -> Result<Database> {
        Self::with_busy_timeout(
            settings.persistence_mode(),
            Duration::from_millis(settings.busy_timeout_ms),
        )
    }
    pub fn persistor(&self) -> Arc<Mutex<Persistor>> {
        Arc::clone(&self.persistor)
    }
    fn lock(&self) -> Result<MutexGuard<'_, Persistor>> {
        Ok(self.persistor.lock()?)
    }

    /// Fetches one page and the total number of matches for any entity.
    pub fn filter<E: Entity>(&self, request: &FilterRequest<E>) -> Result<PagedResponse<E>> {
        let pair = QueryComposer::<E>::compose(
            &request.bindings,
            &request.tags,
            &request.sorts,
            &request.page,
        )?;
        let (rows, total) = self.lock()?.filter::<E>(&pair)?;
        debug!(
            entity = E::NAME,
            rows = rows.len(),
            total,
            tags = request.tags.len(),
            "filter complete"
        );
        Ok(PagedResponse::new(rows, &request.page, total))
    }

    // ------------- PropertyGroup -------------
    pub fn create_property_group(&self, group: &PropertyGroup) -> Result<Identity> {
        if group.id.is_some() {
            return Err(KeeperError::Conflict("PropertyGroup already exists.".into()));
        }
        group.validate()?;
        let id = self.lock()?.insert_property_group(group)?;
        info!(id, name = %group.name, version = %group.version, "property group created");
        Ok(id)
    }
    pub fn update_property_group(&self, id: Identity, group: &PropertyGroup) -> Result<()> {
        if group.id != Some(id) {
            return Err(KeeperError::Validation("PropertyGroup is not persisted.".into()));
        }
        group.validate()?;
        if self.lock()?.update_property_group(id, group)? == 0 {
            return Err(KeeperError::NotFound(format!("PropertyGroup[{id}]")));
        }
        info!(id, status = %group.status, "property group updated");
        Ok(())
    }
    /// Deletes the group and detaches its tags. Tags no other group carries
    /// are deleted with it; properties are left alone.
    pub fn delete_property_group(&self, id: Identity) -> Result<()> {
        let persistor = self.lock()?;
        let tx = persistor.connection().unchecked_transaction()?;
        let tag_ids = tag_ids(&persistor.tags_of_group(id)?);
        persistor.disassociate_group(id)?;
        if persistor.delete_property_group(id)? == 0 {
            return Err(KeeperError::NotFound(format!("PropertyGroup[{id}]")));
        }
        let removed = persistor.remove_unattached(&tag_ids)?;
        tx.commit()?;
        info!(id, detached = tag_ids.len(), removed, "property group deleted");
        Ok(())
    }
    pub fn property_group(&self, id: Identity) -> Result<PropertyGroup> {
        self.lock()?
            .property_group(id)?
            .ok_or_else(|| KeeperError::NotFound(format!("PropertyGroup[{id}]")))
    }
    pub fn filter_property_groups(
        &self,
        request: &FilterRequest<PropertyGroup>,
    ) -> Result<PagedResponse<PropertyGroup>> {
        self.filter(request)
    }

    // Finders for the common lookups. They return every match ordered by
    // status and id, without paging.
    pub fn property_groups_by_name(&self, name: &str) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(FilterBindings::new().with("name", name)?, TagPredicates::new())
    }
    pub fn property_groups_by_name_and_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(
            FilterBindings::new().with("name", name)?.with("version", version)?,
            TagPredicates::new(),
        )
    }
    pub fn property_groups_by_name_and_status(
        &self,
        name: &str,
        status: Status,
    ) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(
            FilterBindings::new().with("name", name)?.with("status", status.as_str())?,
            TagPredicates::new(),
        )
    }
    pub fn property_groups_by_name_version_and_status(
        &self,
        name: &str,
        version: &str,
        status: Status,
    ) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(
            FilterBindings::new()
                .with("name", name)?
                .with("version", version)?
                .with("status", status.as_str())?,
            TagPredicates::new(),
        )
    }
    pub fn property_groups_by_name_version_and_tags(
        &self,
        name: &str,
        version: &str,
        tags: &[Tag],
    ) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(
            FilterBindings::new().with("name", name)?.with("version", version)?,
            tag_predicates(tags)?,
        )
    }
    pub fn property_groups_by_name_version_status_and_tags(
        &self,
        name: &str,
        version: &str,
        status: Status,
        tags: &[Tag],
    ) -> Result<Vec<PropertyGroup>> {
        self.find_property_groups(
            FilterBindings::new()
                .with("name", name)?
                .with("version", version)?
                .with("status", status.as_str())?,
            tag_predicates(tags)?,
        )
    }
    fn find_property_groups(
        &self,
        bindings: FilterBindings<PropertyGroup>,
        tags: TagPredicates,
    ) -> Result<Vec<PropertyGroup>> {
        let mut collected = Vec::new();
        let mut start = 0;
        loop {
            let request = FilterRequest {
                bindings: bindings.clone(),
                tags: tags.clone(),
                sorts: Vec::<Sort>::new(),
                page: Pagination::new(start, FIND_BATCH)?,
            };
            let page = self.filter(&request)?;
            let fetched = page.result.len() as i64;
            collected.extend(page.result);
            start += fetched;
            if fetched < FIND_BATCH || start >= page.total_results {
                return Ok(collected);
            }
        }
    }

    // ------------- Property -------------
    pub fn create_property(&self, property: &Property) -> Result<Identity> {
        if property.id.is_some() {
            return Err(KeeperError::Conflict("Property already exists.".into()));
        }
        property.validate()?;
        let id = self.lock()?.insert_property(property)?;
        info!(id, key = %property.key, group = property.property_group_id, "property created");
        Ok(id)
    }
    pub fn update_property(&self, id: Identity, property: &Property) -> Result<()> {
        if property.id != Some(id) {
            return Err(KeeperError::Validation("Property is not persisted.".into()));
        }
        property.validate()?;
        if self.lock()?.update_property(id, property)? == 0 {
            return Err(KeeperError::NotFound(format!("Property[{id}]")));
        }
        info!(id, key = %property.key, "property updated");
        Ok(())
    }
    pub fn delete_property(&self, id: Identity) -> Result<()> {
        if self.lock()?.delete_property(id)? == 0 {
            return Err(KeeperError::NotFound(format!("Property[{id}]")));
        }
        info!(id, "property deleted");
        Ok(())
    }
    pub fn property(&self, id: Identity) -> Result<Property> {
        self.lock()?
            .property(id)?
            .ok_or_else(|| KeeperError::NotFound(format!("Property[{id}]")))
    }
    pub fn filter_properties(
        &self,
        request: &FilterRequest<Property>,
    ) -> Result<PagedResponse<Property>> {
        self.filter(request)
    }

    // ------------- Tags -------------
    /// Adds the tag to the store and attaches it to the group in one step.
    pub fn create_tag(&self, property_group_id: Identity, tag: &Tag) -> Result<Identity> {
        if tag.id.is_some() {
            return Err(KeeperError::Conflict("Tag already exists.".into()));
        }
        tag.validate()?;
        let persistor = self.lock()?;
        if persistor.property_group(property_group_id)?.is_none() {
            return Err(KeeperError::NotFound(format!("PropertyGroup[{property_group_id}]")));
        }
        let tx = persistor.connection().unchecked_transaction()?;
        let id = persistor.add_tag(&tag.key, tag.value.as_deref())?;
        persistor.associate(id, property_group_id)?;
        tx.commit()?;
        info!(id, group = property_group_id, tag = %tag, "tag created");
        Ok(id)
    }
    /// Detaches the tag from the group, deleting it once no group carries it.
    pub fn delete_tag(&self, property_group_id: Identity, tag_id: Identity) -> Result<()> {
        let persistor = self.lock()?;
        let tx = persistor.connection().unchecked_transaction()?;
        persistor.disassociate(tag_id, property_group_id)?;
        let removed = persistor.remove_unattached(&[tag_id])?;
        tx.commit()?;
        debug!(tag_id, group = property_group_id, removed, "tag deleted");
        Ok(())
    }
    pub fn tag(&self, tag_id: Identity) -> Result<Tag> {
        self.lock()?
            .tag(tag_id)?
            .ok_or_else(|| KeeperError::NotFound(format!("Tag[{tag_id}]")))
    }
    pub fn tags(&self, property_group_id: Identity) -> Result<Vec<Tag>> {
        let persistor = self.lock()?;
        if persistor.property_group(property_group_id)?.is_none() {
            return Err(KeeperError::NotFound(format!("PropertyGroup[{property_group_id}]")));
        }
        persistor.tags_of_group(property_group_id)
    }
    /// Detaches every tag from the group and returns how many were attached.
    pub fn remove_all_tags(&self, property_group_id: Identity) -> Result<usize> {
        let persistor = self.lock()?;
        if persistor.property_group(property_group_id)?.is_none() {
            return Err(KeeperError::NotFound(format!("PropertyGroup[{property_group_id}]")));
        }
        let tx = persistor.connection().unchecked_transaction()?;
        let tag_ids = tag_ids(&persistor.tags_of_group(property_group_id)?);
        let detached = persistor.disassociate_group(property_group_id)?;
        let removed = persistor.remove_unattached(&tag_ids)?;
        tx.commit()?;
        info!(group = property_group_id, detached, removed, "tags removed");
        Ok(detached)
    }

    // ------------- Tag domain -------------
    pub fn tag_domain(&self) -> Result<TagDomain> {
        self.lock()?.current_domain()
    }
    pub fn add_tag_domain_key(&self, key: &str) -> Result<TagDomain> {
        self.lock()?.add_domain_key(key)
    }
    pub fn remove_tag_domain_key(&self, key: &str) -> Result<bool> {
        self.lock()?.remove_domain_key(key)
    }
    pub fn protect_tag_domain_key(&self, key: &str) -> Result<()> {
        self.lock()?.protect_domain_key(key)
    }
}

const FIND_BATCH: i64 = 500;

fn tag_ids(tags: &[Tag]) -> Vec<Identity> {
    tags.iter().filter_map(|t| t.id).collect()
}

fn tag_predicates(tags: &[Tag]) -> Result<TagPredicates> {
    let mut predicates = TagPredicates::new();
    for tag in tags {
        let value = tag.value.as_deref().ok_or_else(|| {
            KeeperError::Validation(format!("tag {} has no value to match", tag.key))
        })?;
        predicates.insert(&tag.key, value)?;
    }
    Ok(predicates)
}
