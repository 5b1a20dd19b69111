//! Hierarchical record keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Final identifier of a key path element.
///
/// Numeric ids are assigned by the server when a partial key commits;
/// names are chosen by the caller up front.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// Server-assignable numeric identifier.
    Id(i64),
    /// Caller-chosen name.
    Name(String),
}

impl KeyId {
    /// Returns the numeric id, if this is an id.
    #[must_use]
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Returns the name, if this is a name.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// One `(kind, id)` element of a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    kind: String,
    id: Option<KeyId>,
}

impl PathElement {
    /// Creates an element with no identifier yet.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Creates an element with an identifier.
    #[must_use]
    pub fn with_id(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the identifier, if present.
    #[must_use]
    pub fn id(&self) -> Option<&KeyId> {
        self.id.as_ref()
    }

    /// Returns `true` if this element has an identifier.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id.is_some()
    }
}

/// Hierarchical identifier for a record.
///
/// A key names a record by a path of `(kind, id)` elements scoped to a
/// project and optional namespace, for example `proj/users:7/posts:12`.
/// A key whose final element has no identifier is *partial*: the server
/// assigns a numeric id when the enclosing mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    project: String,
    namespace: Option<String>,
    path: Vec<PathElement>,
}

impl Key {
    /// Creates a partial key with a single path element of the given kind.
    #[must_use]
    pub fn new(project: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            namespace: None,
            path: vec![PathElement::new(kind)],
        }
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the final path element's identifier to a numeric id.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        if let Some(last) = self.path.last_mut() {
            last.id = Some(KeyId::Id(id));
        }
        self
    }

    /// Sets the final path element's identifier to a name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        if let Some(last) = self.path.last_mut() {
            last.id = Some(KeyId::Name(name.into()));
        }
        self
    }

    /// Appends a child element of the given kind. The new element has no
    /// identifier, so the resulting key is partial.
    #[must_use]
    pub fn child(mut self, kind: impl Into<String>) -> Self {
        self.path.push(PathElement::new(kind));
        self
    }

    /// Returns the project this key belongs to.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the namespace, if set.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the full path.
    #[must_use]
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Returns the kind of the final path element.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(PathElement::kind)
    }

    /// Returns the identifier of the final path element, if assigned.
    #[must_use]
    pub fn final_id(&self) -> Option<&KeyId> {
        self.path.last().and_then(PathElement::id)
    }

    /// Returns the final path element's numeric id, if it has one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.final_id().and_then(KeyId::as_id)
    }

    /// Returns the final path element's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.final_id().and_then(KeyId::as_name)
    }

    /// Returns `true` if every path element has an identifier.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && self.path.iter().all(PathElement::is_complete)
    }

    /// Returns `true` if the final path element still awaits an identifier.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.is_complete()
    }

    /// Fills in the final path element's identifier in place.
    ///
    /// Fails if the key is already complete or has no path.
    pub fn complete_with(&mut self, id: impl Into<KeyId>) -> Result<(), KeyError> {
        let last = self.path.last_mut().ok_or(KeyError::EmptyPath)?;
        if last.id.is_some() {
            return Err(KeyError::already_complete(last.kind.clone()));
        }
        last.id = Some(id.into());
        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.project)?;
        if let Some(namespace) = &self.namespace {
            write!(f, "[{namespace}]")?;
        }
        for element in &self.path {
            write!(f, "/{}", element.kind)?;
            if let Some(id) = &element.id {
                write!(f, ":{id}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_is_partial() {
        let key = Key::new("proj", "users");
        assert!(key.is_partial());
        assert!(!key.is_complete());
        assert_eq!(key.kind(), Some("users"));
        assert_eq!(key.final_id(), None);
    }

    #[test]
    fn with_id_completes() {
        let key = Key::new("proj", "users").with_id(42);
        assert!(key.is_complete());
        assert_eq!(key.final_id(), Some(&KeyId::Id(42)));
        assert_eq!(key.id(), Some(42));
        assert_eq!(key.name(), None);
    }

    #[test]
    fn with_name_completes() {
        let key = Key::new("proj", "users").with_name("alice");
        assert!(key.is_complete());
        assert_eq!(key.name(), Some("alice"));
        assert_eq!(key.id(), None);
    }

    #[test]
    fn child_makes_partial_again() {
        let key = Key::new("proj", "users").with_id(1).child("posts");
        assert!(key.is_partial());
        assert_eq!(key.kind(), Some("posts"));
        assert_eq!(key.path().len(), 2);
        assert!(key.path()[0].is_complete());
    }

    #[test]
    fn complete_with_fills_final_element() {
        let mut key = Key::new("proj", "users");
        key.complete_with(7).unwrap();
        assert!(key.is_complete());
        assert_eq!(key.final_id(), Some(&KeyId::Id(7)));
    }

    #[test]
    fn complete_with_rejects_complete_key() {
        let mut key = Key::new("proj", "users").with_id(7);
        let err = key.complete_with(8).unwrap_err();
        assert_eq!(err, KeyError::already_complete("users"));
        assert_eq!(key.final_id(), Some(&KeyId::Id(7)));
    }

    #[test]
    fn namespace_is_carried() {
        let key = Key::new("proj", "users").with_namespace("tenant-a");
        assert_eq!(key.namespace(), Some("tenant-a"));
    }

    #[test]
    fn display_shows_path() {
        let key = Key::new("proj", "users").with_id(1).child("posts").with_name("intro");
        assert_eq!(format!("{key}"), "proj/users:1/posts:intro");

        let partial = Key::new("proj", "users").with_namespace("t");
        assert_eq!(format!("{partial}"), "proj[t]/users");
    }

    #[test]
    fn key_id_accessors() {
        assert_eq!(KeyId::Id(3).as_id(), Some(3));
        assert_eq!(KeyId::Id(3).as_name(), None);
        assert_eq!(KeyId::from("n").as_name(), Some("n"));
        assert_eq!(KeyId::from("n").as_id(), None);
    }
}
