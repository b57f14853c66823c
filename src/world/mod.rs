//! World management - chunks, loading, saving

mod chunk;
pub mod clock;
pub mod codec;
pub mod generation;
pub mod persistence;
pub mod spatial;
pub mod tilemap;
#[allow(clippy::module_inception)]
mod world;

pub use chunk::{Chunk, ChunkActivity, CHUNK_AREA, CHUNK_SIZE};
pub use clock::{DayPhase, WorldClock};
pub use generation::{GeneratedChunk, MapType, WorldGenerator};
pub use persistence::{ChunkPersistence, Manifest, WorldInfo};
pub use spatial::{chebyshev, chunks_in_radius};
pub use tilemap::{EdgeBlend, PaddedTiles, TileRenderer, Tilemap};
pub use world::{World, WorldOptions, WORLD_RADIUS};
