/// Stable identity of a generic render object

use std::fmt;
use uuid::Uuid;

/// Identity of a `GenericRenderObject`
///
/// Used as the key of every per-renderer API object cache. Two generic
/// objects never share an id while both are alive (the registry retries
/// on collision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an id from a raw 128-bit value (deterministic ids in tools and tests)
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Low 64 bits, used as a cheap secondary sort key
    pub fn sort_bits(&self) -> u64 {
        self.0.as_u128() as u64
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
