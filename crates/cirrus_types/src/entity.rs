//! Entities: keyed records with named properties.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::key::Key;
use crate::value::Value;

/// A keyed record with named properties.
///
/// `Entity` is a cheap-clone handle: clones share one underlying record,
/// so a mutation made through one handle is visible through all of them.
/// This matters for partial keys: when the server assigns the missing id
/// at commit time, the completed key is written back onto the record the
/// application originally staged, and every handle sees it.
#[derive(Clone)]
pub struct Entity {
    inner: Arc<Mutex<EntityInner>>,
}

struct EntityInner {
    key: Option<Key>,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EntityInner {
                key: None,
                properties: BTreeMap::new(),
            })),
        }
    }

    /// Creates an entity with the given key.
    #[must_use]
    pub fn with_key(key: Key) -> Self {
        let entity = Self::new();
        entity.set_key(key);
        entity
    }

    /// Returns a snapshot of the key, if one is set.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        self.inner.lock().key.clone()
    }

    /// Replaces the key.
    pub fn set_key(&self, key: Key) {
        self.inner.lock().key = Some(key);
    }

    /// Sets a property.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().properties.insert(name.into(), value.into());
    }

    /// Returns a snapshot of a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.lock().properties.get(name).cloned()
    }

    /// Removes a property, returning its previous value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.lock().properties.remove(name)
    }

    /// Returns a snapshot of all properties.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, Value> {
        self.inner.lock().properties.clone()
    }

    /// Returns `true` if `other` is a handle to the same underlying record.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Entity")
            .field("key", &inner.key)
            .field("properties", &inner.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let entity = Entity::new();
        let handle = entity.clone();
        entity.set("title", "hello");
        assert_eq!(handle.get("title"), Some(Value::Text("hello".into())));
    }

    #[test]
    fn key_replacement_visible_through_clones() {
        let entity = Entity::with_key(Key::new("proj", "users"));
        let handle = entity.clone();
        entity.set_key(Key::new("proj", "users").with_id(9));
        assert!(handle.key().unwrap().is_complete());
    }

    #[test]
    fn same_entity_tracks_identity() {
        let a = Entity::new();
        let b = a.clone();
        let c = Entity::new();
        assert!(a.same_entity(&b));
        assert!(!a.same_entity(&c));
    }

    #[test]
    fn properties_snapshot() {
        let entity = Entity::new();
        entity.set("a", 1i64);
        entity.set("b", true);
        let props = entity.properties();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn remove_returns_previous() {
        let entity = Entity::new();
        entity.set("a", 1i64);
        assert_eq!(entity.remove("a"), Some(Value::Integer(1)));
        assert_eq!(entity.remove("a"), None);
        assert!(entity.properties().is_empty());
    }
}
