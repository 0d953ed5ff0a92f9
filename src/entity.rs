//! Shared entity plumbing.
//!
//! Every top-level entity (category, client, task) is a plain struct with
//! named fields implementing [`Entity`]. [`EntityService`] wraps the store
//! with construction defaults, validation and merge-on-update; entity
//! modules add their type-specific queries on top.

use std::cmp::Ordering;
use std::marker::PhantomData;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::store::{Collection, Store};

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Default priority for new entities (the lowest)
pub const DEFAULT_PRIORITY: u8 = MIN_PRIORITY;

pub(crate) fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Generate a prefixed, time-ordered id such as `task_01hv...`
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new().to_string().to_lowercase())
}

/// Timestamps persist with millisecond precision
pub(crate) fn stored_precision(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}

/// Accumulates every violated rule before failing
#[derive(Debug, Default)]
pub struct Violations {
    reasons: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub fn require_text(&mut self, value: &str, reason: &str) {
        if value.trim().is_empty() {
            self.push(reason);
        }
    }

    pub fn require_priority(&mut self, priority: u8) {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            self.push(format!(
                "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}"
            ));
        }
    }

    pub fn extend(&mut self, reasons: Vec<String>) {
        self.reasons.extend(reasons);
    }

    pub fn into_reasons(self) -> Vec<String> {
        self.reasons
    }

    pub fn into_result(self, entity: &'static str) -> Result<()> {
        if self.reasons.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                entity,
                reasons: self.reasons,
            })
        }
    }
}

/// A persisted top-level record
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Input for `create`; unset fields take the entity defaults
    type Draft;
    /// Partial update merged over an existing record
    type Patch;

    const COLLECTION: Collection;
    const KIND: &'static str;

    /// Build a new entity with a fresh id and `created_at == updated_at == now`
    fn build(draft: Self::Draft, now: DateTime<Utc>) -> Self;

    /// Merge `patch` over `self`. `id` and `created_at` are not reachable.
    fn apply(&mut self, patch: Self::Patch);

    fn validate(&self) -> Vec<String>;

    fn id(&self) -> &str;
    fn priority(&self) -> u8;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, now: DateTime<Utc>);

    /// Listing order: descending priority
    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.priority().cmp(&a.priority())
    }
}

/// CRUD service for one entity type over a borrowed store handle
pub struct EntityService<'a, T: Entity> {
    store: &'a Store,
    _entity: PhantomData<T>,
}

impl<'a, T: Entity> EntityService<'a, T> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// Build, validate and persist a new entity
    pub fn create(&self, draft: T::Draft) -> Result<T> {
        self.create_at(draft, Utc::now())
    }

    pub fn create_at(&self, draft: T::Draft, now: DateTime<Utc>) -> Result<T> {
        let entity = T::build(draft, stored_precision(now));
        self.check(&entity)?;
        self.store.add(T::COLLECTION, &entity)?;
        info!(kind = T::KIND, id = entity.id(), "created");
        Ok(entity)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        let found = self.store.get(T::COLLECTION, id)?;
        debug!(kind = T::KIND, id, found = found.is_some(), "lookup");
        Ok(found)
    }

    /// Like `get_by_id`, but absence is `NotFound`
    pub fn require(&self, id: &str) -> Result<T> {
        self.get_by_id(id)?
            .ok_or_else(|| Error::not_found(T::COLLECTION.name(), id))
    }

    /// All entities in listing order
    pub fn get_all(&self) -> Result<Vec<T>> {
        let mut all: Vec<T> = self.store.get_all(T::COLLECTION)?;
        all.sort_by(T::listing_order);
        debug!(kind = T::KIND, count = all.len(), "listed");
        Ok(all)
    }

    /// Merge `patch` over the stored record, re-validate and persist
    pub fn update(&self, id: &str, patch: T::Patch) -> Result<T> {
        self.update_at(id, patch, Utc::now())
    }

    pub fn update_at(&self, id: &str, patch: T::Patch, now: DateTime<Utc>) -> Result<T> {
        self.modify_at(id, now, |entity| {
            entity.apply(patch);
            Ok(())
        })
        .map(|(entity, ())| entity)
    }

    /// Load, edit in place, re-validate and persist one record
    pub(crate) fn modify_at<R>(
        &self,
        id: &str,
        now: DateTime<Utc>,
        edit: impl FnOnce(&mut T) -> Result<R>,
    ) -> Result<(T, R)> {
        let mut entity = self.require(id)?;
        let previous = entity.updated_at();
        let outcome = edit(&mut entity)?;
        entity.touch(stored_precision(now).max(previous));
        self.check(&entity)?;
        self.store.put(T::COLLECTION, &entity)?;
        info!(kind = T::KIND, id, "updated");
        Ok((entity, outcome))
    }

    /// Hard delete; deleting an absent id is not an error
    pub fn delete(&self, id: &str) -> Result<()> {
        let existed = self.store.delete(T::COLLECTION, id)?;
        info!(kind = T::KIND, id, existed, "deleted");
        Ok(())
    }

    /// Entities whose indexed field equals `value`, unsorted
    pub fn get_by_index<V: Serialize>(&self, index: &str, value: &V) -> Result<Vec<T>> {
        self.store.query_by_index(T::COLLECTION, index, value)
    }

    fn check(&self, entity: &T) -> Result<()> {
        let reasons = entity.validate();
        if reasons.is_empty() {
            return Ok(());
        }
        warn!(kind = T::KIND, id = entity.id(), reasons = ?reasons, "validation failed");
        Err(Error::Validation {
            entity: T::KIND,
            reasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = generate_id("cat");
        let b = generate_id("cat");
        assert!(a.starts_with("cat_"));
        assert_eq!(a.len(), "cat_".len() + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn violations_collect_every_rule() {
        let mut violations = Violations::new();
        violations.require_text("  ", "name is required");
        violations.require_priority(0);
        violations.require_priority(11);
        violations.require_priority(5);

        let err = violations.into_result("category").unwrap_err();
        match err {
            Error::Validation { entity, reasons } => {
                assert_eq!(entity, "category");
                assert_eq!(reasons.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
