// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Generic in-memory entity store and the per-type store registry.
//!
//! An [`EntityStore`] hands out monotonically increasing identities (starting
//! at 0, never reused) and keeps entities in a [`DashMap`] for O(1) lookup.
//! The [`Registry`] owns exactly one store per entity type and is itself owned
//! by the application root, so there is no process-wide global state.

use crate::error::ValidationError;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A record that can live in an [`EntityStore`].
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Typed identity handed out by the store.
    type Id: Copy + Eq + Hash + Ord + From<u32> + std::fmt::Debug + Send + Sync + 'static;

    /// Entity kind tag, used in validation errors.
    const KIND: &'static str;

    /// Checks the record against its full schema.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Checks a merged record before it replaces `previous`.
    ///
    /// Override to forbid changes to fields owned by other components.
    fn check_update(previous: &Self, next: &Self) -> Result<(), ValidationError> {
        let _ = previous;
        next.validate()
    }
}

/// Keyed container for one entity type.
#[derive(Debug)]
pub struct EntityStore<T: Entity> {
    /// Next identity to hand out.
    next_id: AtomicU32,
    /// Entities indexed by identity.
    entries: DashMap<T::Id, T>,
}

impl<T: Entity> EntityStore<T> {
    /// Creates an empty store whose first identity is 0.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(0),
            entries: DashMap::new(),
        }
    }

    /// Stores `entity` under a fresh identity and returns it.
    ///
    /// Every call yields a new identity, even for identical data.
    pub fn save(&self, entity: T) -> T::Id {
        self.save_with(entity, |_, _| ()).0
    }

    /// Like [`save`](Self::save), but runs `f` on the new entity before its
    /// entry lock is released, so no other caller can touch it first.
    pub fn save_with<R>(&self, entity: T, f: impl FnOnce(T::Id, &T) -> R) -> (T::Id, R) {
        let id = T::Id::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = self.entries.entry(id).insert(entity);
        let result = f(id, entry.value());
        (id, result)
    }

    /// Returns a copy of the entity, or `None` for unknown identities.
    pub fn get(&self, id: T::Id) -> Option<T> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns all stored entities with their identities.
    ///
    /// Identities only grow, so sorting by identity yields insertion order.
    pub fn list(&self) -> Vec<(T::Id, T)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Deletes the entity and returns its last value. The identity is retired.
    pub fn remove(&self, id: T::Id) -> Option<T> {
        self.entries.remove(&id).map(|(_, entity)| entity)
    }

    /// Merges a JSON object `patch` over the stored entity.
    ///
    /// The merged record is deserialized and validated with
    /// [`Entity::check_update`] before it is committed; on failure the stored
    /// value is left untouched.
    ///
    /// Returns `Ok(None)` when no entity has this identity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the patch is not an object, names a field
    /// the entity does not have, or produces an invalid record.
    pub fn update(&self, id: T::Id, patch: Value) -> Result<Option<T>, ValidationError> {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            return Ok(None);
        };

        let Value::Object(changes) = patch else {
            return Err(ValidationError::new(T::KIND, "patch", "must be a JSON object"));
        };

        let mut merged = serde_json::to_value(entry.value())
            .map_err(|e| ValidationError::new(T::KIND, "record", e.to_string()))?;
        let Value::Object(fields) = &mut merged else {
            return Err(ValidationError::new(T::KIND, "record", "not a struct"));
        };
        for (field, value) in changes {
            match fields.get_mut(&field) {
                Some(slot) => *slot = value,
                None => return Err(ValidationError::new(T::KIND, field, "unknown field")),
            }
        }

        let next: T = serde_json::from_value(merged)
            .map_err(|e| ValidationError::new(T::KIND, "record", e.to_string()))?;
        T::check_update(entry.value(), &next)?;

        *entry.value_mut() = next.clone();
        Ok(Some(next))
    }

    /// Runs `f` against the stored entity while holding its entry lock.
    ///
    /// Returns `None` for unknown identities. Validation is not re-run.
    pub fn modify<R>(&self, id: T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries
            .get_mut(&id)
            .map(|mut entry| f(entry.value_mut()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One [`EntityStore`] per entity type, created on first use.
#[derive(Default)]
pub struct Registry {
    stores: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `T`, creating it on first call.
    pub fn store<T: Entity>(&self) -> Arc<EntityStore<T>> {
        let erased = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(EntityStore::<T>::new()) as Arc<dyn Any + Send + Sync>)
            .clone();
        match erased.downcast::<EntityStore<T>>() {
            Ok(store) => store,
            // Entries are keyed by the TypeId of the store they hold.
            Err(_) => unreachable!("registry entry for {} has the wrong type", T::KIND),
        }
    }

    /// Number of entity types that have a store.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        pages: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    struct NoteId(u32);

    impl From<u32> for NoteId {
        fn from(raw: u32) -> Self {
            NoteId(raw)
        }
    }

    impl Entity for Note {
        type Id = NoteId;
        const KIND: &'static str = "note";

        fn validate(&self) -> Result<(), ValidationError> {
            if self.title.is_empty() {
                return Err(ValidationError::new(Self::KIND, "title", "must not be empty"));
            }
            Ok(())
        }
    }

    fn note(title: &str) -> Note {
        Note {
            title: title.to_string(),
            pages: 1,
        }
    }

    #[test]
    fn identities_start_at_zero_and_increase() {
        let store = EntityStore::new();
        assert_eq!(store.save(note("a")), NoteId(0));
        assert_eq!(store.save(note("a")), NoteId(1));
        assert_eq!(store.save(note("b")), NoteId(2));
    }

    #[test]
    fn save_with_runs_before_entry_is_visible() {
        let store = EntityStore::new();
        store.save(note("a"));
        let (id, seen) = store.save_with(note("b"), |id, stored| (id, stored.title.clone()));
        assert_eq!(id, NoteId(1));
        assert_eq!(seen, (NoteId(1), "b".to_string()));
        assert_eq!(store.get(id), Some(note("b")));
    }

    #[test]
    fn removed_identity_is_never_reused() {
        let store = EntityStore::new();
        let first = store.save(note("a"));
        assert_eq!(store.remove(first), Some(note("a")));
        assert_eq!(store.remove(first), None);
        assert_eq!(store.save(note("b")), NoteId(1));
    }

    #[test]
    fn list_is_in_insertion_order() {
        let store = EntityStore::new();
        for title in ["x", "y", "z"] {
            store.save(note(title));
        }
        store.remove(NoteId(1));
        let titles: Vec<_> = store.list().into_iter().map(|(_, n)| n.title).collect();
        assert_eq!(titles, vec!["x", "z"]);
    }

    #[test]
    fn update_merges_fields() {
        let store = EntityStore::new();
        let id = store.save(note("draft"));
        let updated = store.update(id, json!({ "pages": 7 })).unwrap();
        assert_eq!(
            updated,
            Some(Note {
                title: "draft".into(),
                pages: 7
            })
        );
        assert_eq!(store.get(id).unwrap().pages, 7);
    }

    #[test]
    fn update_unknown_id_is_none() {
        let store: EntityStore<Note> = EntityStore::new();
        assert_eq!(store.update(NoteId(9), json!({ "pages": 2 })), Ok(None));
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let store = EntityStore::new();
        let id = store.save(note("kept"));

        let invalid = store.update(id, json!({ "title": "" })).unwrap_err();
        assert_eq!(invalid.field, "title");

        let wrong_type = store.update(id, json!({ "pages": "many" })).unwrap_err();
        assert_eq!(wrong_type.field, "record");

        let unknown = store.update(id, json!({ "author": "me" })).unwrap_err();
        assert_eq!(unknown.field, "author");

        let not_object = store.update(id, json!([1, 2])).unwrap_err();
        assert_eq!(not_object.field, "patch");

        assert_eq!(store.get(id), Some(note("kept")));
    }

    #[test]
    fn modify_runs_under_entry_lock() {
        let store = EntityStore::new();
        let id = store.save(note("a"));
        let pages = store.modify(id, |n| {
            n.pages += 4;
            n.pages
        });
        assert_eq!(pages, Some(5));
        assert_eq!(store.modify(NoteId(42), |n| n.pages), None);
    }

    #[test]
    fn registry_reuses_one_store_per_type() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        let first = registry.store::<Note>();
        first.save(note("shared"));
        let second = registry.store::<Note>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
