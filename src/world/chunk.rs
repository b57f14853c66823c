//! Chunk - 16x16 region of tiles on three layers

use std::collections::BTreeSet;

use glam::IVec2;

use super::tilemap::Tilemap;
use crate::entity::EntityId;
use crate::tile::Layer;

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// How close a chunk is to the nearest focus point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ChunkActivity {
    #[default]
    Inactive,
    Background,
    Nearby,
}

/// A 16x16 region of the world
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Chunk coordinates (in chunk space, not tile space)
    pub x: i32,
    pub y: i32,

    /// Ground, floor and wall, in [`Layer::index`] order
    layers: [Tilemap; 3],

    /// Entities standing in this chunk
    entities: BTreeSet<EntityId>,

    pub activity: ChunkActivity,

    /// Consecutive whole-second ticks spent Inactive
    pub idle_ticks: u32,

    /// Whether chunk has been modified since last save
    pub dirty: bool,
}

impl Chunk {
    pub fn new(x: i32, y: i32) -> Self {
        let coord = IVec2::new(x, y);
        Self {
            x,
            y,
            layers: Layer::ALL.map(|layer| Tilemap::new(coord, layer)),
            entities: BTreeSet::new(),
            activity: ChunkActivity::Inactive,
            idle_ticks: 0,
            dirty: false,
        }
    }

    pub fn coord(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// First world cell covered by this chunk
    pub fn world_origin(&self) -> IVec2 {
        self.coord() * CHUNK_SIZE as i32
    }

    pub fn tile_data(&self, layer: Layer) -> &Tilemap {
        &self.layers[layer.index()]
    }

    pub fn tile_data_mut(&mut self, layer: Layer) -> &mut Tilemap {
        &mut self.layers[layer.index()]
    }

    /// Logical tile id at local coordinates
    #[inline]
    pub fn absolute_tile(&self, layer: Layer, x: usize, y: usize) -> i32 {
        self.tile_data(layer).absolute_tile(x, y)
    }

    /// Logical ids of all three layers, row-major
    pub fn absolute_layers(&self) -> [[i32; CHUNK_AREA]; 3] {
        Layer::ALL.map(|layer| self.tile_data(layer).absolute_cells())
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn add_entity(&mut self, id: EntityId) -> bool {
        self.entities.insert(id)
    }

    pub(crate) fn remove_entity(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id)
    }

    /// Count tiles on every layer (for debugging save/load)
    pub fn count_tiles(&self) -> usize {
        self.layers.iter().map(Tilemap::count_tiles).sum()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
