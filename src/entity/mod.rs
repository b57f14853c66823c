pub mod inventory;
pub mod player;
pub mod props;

pub use player::Player;
pub use props::{ItemDrop, PropKind, ResourceProp, Tree};

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::registry::{Registrable, ResourceHandle};

/// Unique identifier for entities in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct EntityId(u64);

/// Largest raw id accepted from save files (exact in every JSON reader)
pub const MAX_ENTITY_ID: u64 = (1 << 53) - 1;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Generate a new unique entity ID
    pub fn new() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Create an EntityId from a raw u64 (for deserialization)
    pub fn from_raw(id: u64) -> Self {
        // Keep freshly generated IDs above anything loaded from disk
        Self::reserve_below(id.saturating_add(1));
        EntityId(id)
    }

    /// The id the next call to [`EntityId::new`] hands out
    pub fn next_free() -> u64 {
        NEXT_ENTITY_ID.load(Ordering::Relaxed)
    }

    /// Never hand out ids below `next` from now on
    pub fn reserve_below(next: u64) {
        NEXT_ENTITY_ID.fetch_max(next, Ordering::Relaxed);
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<u64> for EntityId {
    type Error = String;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        if id > MAX_ENTITY_ID {
            return Err(format!("entity id {} exceeds {}", id, MAX_ENTITY_ID));
        }
        Ok(EntityId::from_raw(id))
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Anything living in the world at a continuous position
pub trait Entity: fmt::Debug {
    fn id(&self) -> EntityId;

    /// Registered type, used as the tag in save files
    fn type_handle(&self) -> ResourceHandle;

    fn position(&self) -> Vec2;

    fn set_position(&mut self, position: Vec2);

    /// Re-key the entity, used when a loaded id is already taken
    fn set_id(&mut self, id: EntityId);

    /// Data tree written to chunk files; must round-trip through the type's factory
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    /// Whether the entity is saved with the chunk it stands in
    fn persists_in_chunk(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any;
}

type Factory = Box<dyn Fn(serde_json::Value) -> serde_json::Result<Box<dyn Entity>> + Send + Sync>;

/// Registered entity type: its handle plus the closure rebuilding it from saved data
pub struct EntityType {
    pub handle: ResourceHandle,
    factory: Factory,
}

impl EntityType {
    pub fn new<F>(handle: ResourceHandle, factory: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Result<Box<dyn Entity>> + Send + Sync + 'static,
    {
        Self {
            handle,
            factory: Box::new(factory),
        }
    }

    /// Entity type whose data tree is its serde representation
    pub fn of<T>(handle: ResourceHandle) -> Self
    where
        T: Entity + DeserializeOwned + 'static,
    {
        Self::new(handle, |data| {
            serde_json::from_value::<T>(data).map(|entity| Box::new(entity) as Box<dyn Entity>)
        })
    }

    pub fn create(&self, data: serde_json::Value) -> serde_json::Result<Box<dyn Entity>> {
        (self.factory)(data)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Registrable for EntityType {
    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

/// On-disk form of one entity inside a chunk file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub data: serde_json::Value,
}

impl EntityRecord {
    pub fn from_entity(entity: &dyn Entity) -> serde_json::Result<Self> {
        Ok(Self {
            type_tag: entity.type_handle().to_string(),
            data: entity.to_json()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_uniqueness() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id2.raw() > id1.raw());
    }

    #[test]
    fn test_entity_id_from_raw() {
        let id = EntityId::from_raw(4242);
        assert_eq!(id.raw(), 4242);

        let next_id = EntityId::new();
        assert!(next_id.raw() > 4242);
    }

    #[test]
    fn test_entity_id_deserialize_bumps_counter() {
        let id: EntityId = serde_json::from_str("900000").unwrap();
        assert_eq!(id.raw(), 900000);
        assert!(EntityId::new().raw() > 900000);
    }

    #[test]
    fn test_entity_id_rejects_huge_ids() {
        assert!(serde_json::from_str::<EntityId>("18446744073709551615").is_err());
        assert!(serde_json::from_str::<EntityId>(&(MAX_ENTITY_ID + 1).to_string()).is_err());
        assert!(EntityId::next_free() <= MAX_ENTITY_ID);
    }

    #[test]
    fn test_reserve_below() {
        EntityId::reserve_below(1_500_000);
        assert!(EntityId::next_free() >= 1_500_000);
        assert!(EntityId::new().raw() >= 1_500_000);
    }

    #[test]
    fn test_factory_round_trip() {
        let kind = EntityType::of::<Tree>(ResourceHandle::base("tree"));
        let tree = Tree::new(Vec2::new(3.5, -2.5));
        let record = EntityRecord::from_entity(&tree).unwrap();
        assert_eq!(record.type_tag, "base:tree");

        let rebuilt = kind.create(record.data.clone()).unwrap();
        assert_eq!(rebuilt.id(), tree.id());
        assert_eq!(rebuilt.position(), tree.position());
        assert_eq!(rebuilt.to_json().unwrap(), record.data);
    }
}
