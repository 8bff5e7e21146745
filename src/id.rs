//! Opaque identifiers for users and files.
//!
//! Every entity is addressed by an [`EntityId`]. The parent of a file is a
//! [`ParentId`], which is either the root sentinel or a folder's id. The
//! root is encoded as `0` on the wire and in the database, a value no
//! generated id can take.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Wire and storage encoding of the root parent.
pub const ROOT_PARENT: &str = "0";

/// Opaque identifier of a user or a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a caller-supplied id.
    ///
    /// Returns `None` for empty input and for the root sentinel, neither of
    /// which can name an entity.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s == ROOT_PARENT {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid id: {s:?}"))
    }
}

/// Parent reference of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ParentId {
    /// Top level of the owner's tree.
    #[default]
    Root,
    /// A folder.
    Folder(EntityId),
}

impl ParentId {
    /// Whether this is the root sentinel.
    pub fn is_root(&self) -> bool {
        matches!(self, ParentId::Root)
    }

    /// The folder id, if any.
    pub fn folder(&self) -> Option<&EntityId> {
        match self {
            ParentId::Root => None,
            ParentId::Folder(id) => Some(id),
        }
    }

    /// Storage encoding: `"0"` for the root, the folder id otherwise.
    pub fn as_storage(&self) -> &str {
        match self {
            ParentId::Root => ROOT_PARENT,
            ParentId::Folder(id) => id.as_str(),
        }
    }

    /// Decode the storage representation.
    pub fn from_storage(s: &str) -> Self {
        EntityId::parse(s).map_or(ParentId::Root, ParentId::Folder)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_storage())
    }
}

impl From<EntityId> for ParentId {
    fn from(id: EntityId) -> Self {
        ParentId::Folder(id)
    }
}

impl Serialize for ParentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParentId::Root => serializer.serialize_u8(0),
            ParentId::Folder(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for ParentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// Clients send the root as `0`, `"0"` or `null`.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawParent {
            Number(u64),
            Text(String),
        }

        let parent = match Option::<RawParent>::deserialize(deserializer)? {
            None | Some(RawParent::Number(0)) => ParentId::Root,
            Some(RawParent::Number(n)) => ParentId::Folder(EntityId(n.to_string())),
            Some(RawParent::Text(s)) => ParentId::from_storage(&s),
        };
        Ok(parent)
    }
}
