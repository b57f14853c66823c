//! # Tilecraft - chunked 2D tile worlds
//!
//! An infinite, lazily materialized grid of 16x16 chunks with three tile
//! layers, autotiling, noise terrain, a compact chunk file format and a
//! day/night clock.

pub mod config;
pub mod content;
pub mod entity;
pub mod error;
pub mod item;
pub mod registry;
pub mod tile;
pub mod world;

/// Common imports for internal use
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::entity::{Entity, EntityId};
    pub use crate::error::{CodecError, RegistryError, WorldError, WorldResult};
    pub use crate::registry::{Registries, ResourceHandle};
    pub use crate::tile::{Cell, Layer, EMPTY, NULL};
    pub use crate::world::{Chunk, MapType, World, WorldOptions, CHUNK_SIZE};
    pub use glam::{IVec2, Vec2};
}
