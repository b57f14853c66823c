//! World - owns chunks, entities and the clock

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashMap;
use glam::{IVec2, Vec2};

use super::chunk::{Chunk, ChunkActivity, CHUNK_AREA, CHUNK_SIZE};
use super::clock::{WorldClock, START_TIME};
use super::codec;
use super::generation::{MapType, WorldGenerator};
use super::persistence::{ChunkPersistence, Manifest, WorldInfo};
use super::spatial::chebyshev;
use super::tilemap::PaddedTiles;
use crate::config::Settings;
use crate::entity::{Entity, EntityId, EntityRecord, Player};
use crate::error::{CodecError, WorldError, WorldResult};
use crate::registry::Registries;
use crate::tile::autotile::{self, TileGrid};
use crate::tile::{AutotileStrategy, Cell, Layer, NULL};

/// Half-extent of the playable world in tile units. A chunk exists only if
/// it lies entirely inside `[-WORLD_RADIUS, WORLD_RADIUS]` on both axes.
pub const WORLD_RADIUS: i64 = 1_000_016;

/// Parameters of a new world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldOptions {
    pub seed: i32,
    pub map_type: MapType,
    pub default_gamemode: i32,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            seed: rand::random(),
            map_type: MapType::Default,
            default_gamemode: 0,
        }
    }
}

/// The game world, composed of lazily materialized chunks
pub struct World {
    pub(super) registries: Arc<Registries>,
    settings: Settings,

    /// Loaded chunks, keyed by chunk coordinates
    pub(super) chunks: AHashMap<IVec2, Chunk>,

    /// Every live entity; chunks only hold ids
    pub(super) entities: AHashMap<EntityId, Box<dyn Entity>>,

    generator: WorldGenerator,
    /// None for worlds that live only in memory
    persistence: Option<ChunkPersistence>,
    pub default_gamemode: i32,
    clock: WorldClock,
    player: Option<EntityId>,
}

impl World {
    /// In-memory world without a save directory
    pub fn new(
        registries: Arc<Registries>,
        settings: Settings,
        options: WorldOptions,
    ) -> WorldResult<Self> {
        Self::build(registries, settings, options, START_TIME, 0, None)
    }

    /// Start a fresh world in `save_dir`, writing worldInfo and manifest
    pub fn create(
        registries: Arc<Registries>,
        settings: Settings,
        save_dir: impl Into<PathBuf>,
        options: WorldOptions,
    ) -> WorldResult<Self> {
        let persistence = ChunkPersistence::new(save_dir)?;
        Self::create_in(registries, settings, persistence, options)
    }

    /// Open the world saved in `save_dir`, creating it with a random seed when
    /// the directory holds no world yet
    pub fn open(
        registries: Arc<Registries>,
        settings: Settings,
        save_dir: impl Into<PathBuf>,
    ) -> WorldResult<Self> {
        let persistence = ChunkPersistence::new(save_dir)?;
        let Some(info) = persistence.load_world_info()? else {
            return Self::create_in(registries, settings, persistence, WorldOptions::default());
        };

        // Ids saved in chunk files stay reserved for their entities
        EntityId::reserve_below(info.next_entity_id);

        let options = WorldOptions {
            seed: info.seed,
            map_type: MapType::from_id(info.map_type),
            default_gamemode: info.default_gm,
        };
        let mut world = Self::build(
            registries,
            settings,
            options,
            info.time,
            info.play_time,
            Some(persistence),
        )?;
        if let Some(player) = info.player {
            world.spawn_player(player);
        }

        log::info!(
            "[LOAD] Opened world (seed {}, day {}, {})",
            world.seed(),
            world.clock.day(),
            world.clock.clock_text()
        );
        Ok(world)
    }

    fn create_in(
        registries: Arc<Registries>,
        settings: Settings,
        persistence: ChunkPersistence,
        options: WorldOptions,
    ) -> WorldResult<Self> {
        let world = Self::build(registries, settings, options, START_TIME, 0, Some(persistence))?;
        world.save_metadata()?;
        log::info!("[GEN] Created world with seed {}", world.seed());
        Ok(world)
    }

    fn build(
        registries: Arc<Registries>,
        settings: Settings,
        options: WorldOptions,
        time: i64,
        play_time: i64,
        persistence: Option<ChunkPersistence>,
    ) -> WorldResult<Self> {
        let generator = WorldGenerator::new(options.seed, options.map_type, &registries)?;
        let clock = WorldClock::new(time, play_time, settings.clock_24h);
        Ok(Self {
            registries,
            settings,
            chunks: AHashMap::new(),
            entities: AHashMap::new(),
            generator,
            persistence,
            default_gamemode: options.default_gamemode,
            clock,
            player: None,
        })
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.clock.set_24h(settings.clock_24h);
        self.settings = settings;
    }

    pub fn seed(&self) -> i32 {
        self.generator.seed
    }

    pub fn map_type(&self) -> MapType {
        self.generator.map_type
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    pub fn day_factor(&self) -> f32 {
        self.clock.day_factor()
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.persistence.as_ref().map(ChunkPersistence::save_dir)
    }

    // ---- Coordinates ----

    /// Convert world coordinates to chunk coordinates + local offset
    pub fn world_to_chunk_coords(world_x: i32, world_y: i32) -> (IVec2, usize, usize) {
        let chunk_x = world_x.div_euclid(CHUNK_SIZE as i32);
        let chunk_y = world_y.div_euclid(CHUNK_SIZE as i32);
        let local_x = world_x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let local_y = world_y.rem_euclid(CHUNK_SIZE as i32) as usize;
        (IVec2::new(chunk_x, chunk_y), local_x, local_y)
    }

    /// World cell containing a continuous position
    pub fn cell_of(pos: Vec2) -> IVec2 {
        pos.floor().as_ivec2()
    }

    pub fn chunk_coord_of(pos: Vec2) -> IVec2 {
        Self::local_cell_of(pos).0
    }

    /// Chunk coordinate and local cell of a continuous position
    pub fn local_cell_of(pos: Vec2) -> (IVec2, usize, usize) {
        let cell = Self::cell_of(pos);
        Self::world_to_chunk_coords(cell.x, cell.y)
    }

    /// Whether the chunk at `coord` lies inside the world boundary
    pub fn in_world_bounds(coord: IVec2) -> bool {
        let inside = |c: i32| {
            let lo = i64::from(c) * CHUNK_SIZE as i64;
            -WORLD_RADIUS <= lo && lo + CHUNK_SIZE as i64 <= WORLD_RADIUS
        };
        inside(coord.x) && inside(coord.y)
    }

    // ---- Chunks ----

    pub fn chunk(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunk_mut(&mut self, coord: IVec2) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn is_loaded(&self, coord: IVec2) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// The chunk at `coord`, loading it from disk or generating it first.
    /// None outside the world boundary.
    pub fn load_chunk(&mut self, coord: IVec2) -> WorldResult<Option<&mut Chunk>> {
        if !Self::in_world_bounds(coord) {
            return Ok(None);
        }
        if !self.chunks.contains_key(&coord) {
            self.construct_chunk(coord)?;
        }
        Ok(self.chunks.get_mut(&coord))
    }

    fn construct_chunk(&mut self, coord: IVec2) -> WorldResult<()> {
        // The empty chunk goes in first so placement can autotile across its borders
        self.insert_chunk(Chunk::new(coord.x, coord.y))?;
        if let Err(e) = self.populate_chunk(coord) {
            self.drop_chunk(coord);
            return Err(e);
        }
        // Fresh chunks start as not dirty
        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.dirty = false;
        }
        Ok(())
    }

    fn insert_chunk(&mut self, chunk: Chunk) -> WorldResult<()> {
        let coord = chunk.coord();
        if self.chunks.contains_key(&coord) {
            return Err(WorldError::ChunkExists(coord));
        }
        self.chunks.insert(coord, chunk);
        Ok(())
    }

    fn populate_chunk(&mut self, coord: IVec2) -> WorldResult<()> {
        let saved = match &self.persistence {
            Some(persistence) => persistence.read_chunk(coord)?,
            None => None,
        };

        let (layers, entities, prefix) = match saved {
            Some(bytes) => {
                let decoded = codec::decode(&self.registries, &bytes)
                    .map_err(|source| WorldError::Codec { coord, source })?;
                (decoded.layers, decoded.entities, "[LOAD]")
            }
            None => {
                let generated = self.generator.generate(coord);
                (generated.layers, generated.entities, "[GEN]")
            }
        };

        self.place_layers(coord, &layers);
        let entity_count = entities.len();
        for entity in entities {
            self.attach_entity(coord, entity);
        }

        log::debug!(
            "{} Chunk ({}, {}) - {} tiles, {} entities",
            prefix,
            coord.x,
            coord.y,
            self.chunks.get(&coord).map_or(0, Chunk::count_tiles),
            entity_count
        );
        Ok(())
    }

    /// Write logical ids through autotiling, ground first, then floor, then wall
    fn place_layers(&mut self, coord: IVec2, layers: &[[i32; CHUNK_AREA]; 3]) {
        let origin = coord * CHUNK_SIZE as i32;
        for layer in Layer::ALL {
            for (i, &id) in layers[layer.index()].iter().enumerate() {
                if id < 0 {
                    continue;
                }
                let x = origin.x + (i % CHUNK_SIZE) as i32;
                let y = origin.y + (i / CHUNK_SIZE) as i32;
                self.set_tile(layer, x, y, id);
            }
        }
    }

    /// Save the chunk if it changed, then drop it with its entities.
    /// In-memory worlds keep changed chunks, since dropping would lose them.
    pub fn unload_chunk(&mut self, coord: IVec2) -> WorldResult<bool> {
        let Some(chunk) = self.chunks.get(&coord) else {
            return Ok(false);
        };
        if chunk.dirty && !self.save_chunk(coord)? {
            log::debug!("Keeping modified chunk ({}, {}) without a save directory", coord.x, coord.y);
            return Ok(false);
        }
        self.drop_chunk(coord);
        log::debug!("Unloaded chunk ({}, {})", coord.x, coord.y);
        Ok(true)
    }

    fn drop_chunk(&mut self, coord: IVec2) -> Option<Chunk> {
        let chunk = self.chunks.remove(&coord)?;
        for id in chunk.entities() {
            self.entities.remove(&id);
        }
        Some(chunk)
    }

    // ---- Tiles ----

    /// Place (or with a negative id, remove) a tile with autotiling across
    /// loaded chunks. False when the chunk is not loaded or the id is unknown.
    pub fn set_tile(&mut self, layer: Layer, world_x: i32, world_y: i32, id: i32) -> bool {
        if id >= 0 && self.registries.tile(layer, id).is_none() {
            log::warn!("set_tile: unknown {} tile id {}", layer.name(), id);
            return false;
        }
        let (chunk_pos, _, _) = Self::world_to_chunk_coords(world_x, world_y);
        let Some(chunk) = self.chunks.get_mut(&chunk_pos) else {
            log::warn!(
                "set_tile: chunk {:?} not loaded (world: {}, {})",
                chunk_pos,
                world_x,
                world_y
            );
            return false;
        };
        chunk.mark_dirty();
        autotile::autotile(self, layer, id, world_x, world_y, 0);
        true
    }

    pub fn remove_tile(&mut self, layer: Layer, world_x: i32, world_y: i32) -> bool {
        self.set_tile(layer, world_x, world_y, crate::tile::EMPTY)
    }

    /// Logical tile id at a world cell, NULL when its chunk is not loaded
    pub fn tile_at_cell(&self, layer: Layer, world_x: i32, world_y: i32) -> i32 {
        let (chunk_pos, local_x, local_y) = Self::world_to_chunk_coords(world_x, world_y);
        self.chunks
            .get(&chunk_pos)
            .map_or(NULL, |c| c.absolute_tile(layer, local_x, local_y))
    }

    /// Logical tile id at a continuous position, NULL when unloaded
    pub fn tile_at(&self, layer: Layer, pos: Vec2) -> i32 {
        let cell = Self::cell_of(pos);
        self.tile_at_cell(layer, cell.x, cell.y)
    }

    /// Raw packed cell (with visual state) at a world cell
    pub fn raw_tile_at(&self, layer: Layer, world_x: i32, world_y: i32) -> i32 {
        self.raw_at(layer, world_x, world_y)
    }

    /// Tiles of one chunk layer with a one-cell border from its neighbors
    pub fn padded_neighborhood(&self, coord: IVec2, layer: Layer) -> Option<PaddedTiles> {
        let center = self.chunks.get(&coord)?;
        Some(center.tile_data(layer).padded_neighborhood(|dx, dy| {
            self.chunks
                .get(&(coord + IVec2::new(dx, dy)))
                .map(|c| c.tile_data(layer))
        }))
    }

    // ---- Entities ----

    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(&id).map(|e| e.as_ref())
    }

    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.entities.values().map(|e| e.as_ref())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Add an entity. Entities saved with chunks join the chunk under their
    /// position, which is loaded first if needed. Fails outside the world.
    pub fn spawn_entity(&mut self, entity: Box<dyn Entity>) -> WorldResult<EntityId> {
        let id = entity.id();
        if entity.persists_in_chunk() {
            let pos = entity.position();
            let chunk = self
                .load_chunk(Self::chunk_coord_of(pos))?
                .ok_or(WorldError::OutsideWorld(pos))?;
            chunk.add_entity(id);
            chunk.mark_dirty();
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Track an entity that came with a chunk being constructed. An id that is
    /// already live is replaced by a fresh one.
    fn attach_entity(&mut self, coord: IVec2, mut entity: Box<dyn Entity>) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let mut id = entity.id();
        if self.entities.contains_key(&id) {
            let fresh = EntityId::new();
            log::warn!(
                "[LOAD] {} in chunk ({}, {}) is already in use, renumbered to {}",
                id,
                coord.x,
                coord.y,
                fresh
            );
            entity.set_id(fresh);
            id = fresh;
            chunk.mark_dirty();
        }
        chunk.add_entity(id);
        self.entities.insert(id, entity);
    }

    /// Move an entity, updating which chunk holds it
    pub fn move_entity(&mut self, id: EntityId, pos: Vec2) -> WorldResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        let old = Self::chunk_coord_of(entity.position());
        let new = Self::chunk_coord_of(pos);
        if !entity.persists_in_chunk() {
            entity.set_position(pos);
            return Ok(());
        }
        if !Self::in_world_bounds(new) {
            return Err(WorldError::OutsideWorld(pos));
        }
        entity.set_position(pos);

        if let Some(chunk) = self.chunks.get_mut(&old) {
            chunk.mark_dirty();
            if old == new {
                return Ok(());
            }
            chunk.remove_entity(id);
        }
        if let Some(chunk) = self.load_chunk(new)? {
            chunk.add_entity(id);
            chunk.mark_dirty();
        }
        Ok(())
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let entity = self.entities.remove(&id)?;
        if entity.persists_in_chunk() {
            if let Some(chunk) = self.chunks.get_mut(&Self::chunk_coord_of(entity.position())) {
                chunk.remove_entity(id);
                chunk.mark_dirty();
            }
        }
        if self.player == Some(id) {
            self.player = None;
        }
        Some(entity)
    }

    /// Make `player` the world's player, replacing any previous one
    pub fn spawn_player(&mut self, player: Player) -> EntityId {
        if let Some(old) = self.player.take() {
            self.entities.remove(&old);
        }
        let id = player.id;
        self.entities.insert(id, Box::new(player));
        self.player = Some(id);
        id
    }

    pub fn player(&self) -> Option<&Player> {
        self.player
            .and_then(|id| self.entities.get(&id))
            .and_then(|e| e.as_any().downcast_ref::<Player>())
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    // ---- Simulation ----

    /// Positions chunk activity is measured from: the player, or the origin
    /// when there is none
    pub fn focus_points(&self) -> Vec<Vec2> {
        match self.player() {
            Some(player) => vec![player.position],
            None => vec![Vec2::ZERO],
        }
    }

    /// Advance one subtick. Whole seconds refresh chunk activity, evict idle
    /// chunks and run the autosave.
    pub fn tick(&mut self) -> WorldResult<()> {
        if !self.clock.tick() {
            return Ok(());
        }

        self.update_activity();
        self.evict_idle_chunks()?;

        let interval = self.settings.autosave_interval_secs;
        if interval > 0 && self.clock.play_time() % interval as i64 == 0 {
            log::info!("[SAVE] Autosave at {} play seconds", self.clock.play_time());
            self.save()?;
        }
        Ok(())
    }

    fn update_activity(&mut self) {
        let focus: Vec<IVec2> = self
            .focus_points()
            .into_iter()
            .map(Self::chunk_coord_of)
            .collect();
        let nearby = self.settings.nearby_radius;
        let background = self.settings.background_radius;

        for chunk in self.chunks.values_mut() {
            let distance = focus
                .iter()
                .map(|f| chebyshev(chunk.coord(), *f))
                .min()
                .unwrap_or(i32::MAX);
            chunk.activity = if distance <= nearby {
                ChunkActivity::Nearby
            } else if distance <= background {
                ChunkActivity::Background
            } else {
                ChunkActivity::Inactive
            };
            if chunk.activity == ChunkActivity::Inactive {
                chunk.idle_ticks += 1;
            } else {
                chunk.idle_ticks = 0;
            }
        }
    }

    /// Save and drop chunks that stayed Inactive long enough
    pub fn evict_idle_chunks(&mut self) -> WorldResult<usize> {
        let limit = self.settings.evict_after_ticks;
        let can_save = self.persistence.is_some();
        let idle: Vec<IVec2> = self
            .chunks
            .values()
            .filter(|c| c.activity == ChunkActivity::Inactive && c.idle_ticks >= limit)
            .filter(|c| can_save || !c.dirty)
            .map(Chunk::coord)
            .collect();

        let mut evicted = 0;
        for coord in &idle {
            if self.unload_chunk(*coord)? {
                evicted += 1;
            }
        }
        if evicted > 0 {
            log::debug!("Evicted {} idle chunks, {} remain loaded", evicted, self.chunks.len());
        }
        Ok(evicted)
    }

    // ---- Saving ----

    /// Write worldInfo, the manifest and every loaded chunk.
    /// In-memory worlds have nothing to write.
    pub fn save(&mut self) -> WorldResult<()> {
        if self.persistence.is_none() {
            log::debug!("[SAVE] World has no save directory, skipping");
            return Ok(());
        }

        self.save_metadata()?;
        let coords: Vec<IVec2> = self.chunks.keys().copied().collect();
        for coord in &coords {
            self.save_chunk(*coord)?;
        }

        log::info!(
            "[SAVE] Saved {} chunks, {} entities (play time {})",
            coords.len(),
            self.entities.len(),
            super::persistence::format_play_time(self.clock.play_time())
        );
        Ok(())
    }

    fn save_metadata(&self) -> WorldResult<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let info = WorldInfo {
            default_gm: self.default_gamemode,
            map_type: self.generator.map_type.id(),
            seed: self.generator.seed,
            time: self.clock.time(),
            play_time: self.clock.play_time(),
            next_entity_id: EntityId::next_free(),
            player: self.player().cloned(),
        };
        persistence.save_world_info(&info)?;
        persistence.save_manifest(&Manifest::now(self.clock.play_time()))
    }

    /// Encode and write one loaded chunk. False when there is nothing to write.
    pub fn save_chunk(&mut self, coord: IVec2) -> WorldResult<bool> {
        let Some(persistence) = &self.persistence else {
            return Ok(false);
        };
        let Some(chunk) = self.chunks.get(&coord) else {
            return Ok(false);
        };

        let records = chunk
            .entities()
            .filter_map(|id| self.entities.get(&id))
            .filter(|e| e.persists_in_chunk())
            .map(|e| EntityRecord::from_entity(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| WorldError::Codec {
                coord,
                source: CodecError::Json {
                    section: "entities",
                    source,
                },
            })?;
        let bytes = codec::encode(&self.registries, &chunk.absolute_layers(), &records)
            .map_err(|source| WorldError::Codec { coord, source })?;
        persistence.write_chunk(coord, &bytes)?;

        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.dirty = false;
        }
        Ok(true)
    }
}

impl TileGrid for World {
    fn raw_at(&self, layer: Layer, x: i32, y: i32) -> i32 {
        let (chunk_pos, local_x, local_y) = Self::world_to_chunk_coords(x, y);
        self.chunks
            .get(&chunk_pos)
            .map_or(NULL, |c| c.tile_data(layer).tile(local_x, local_y))
    }

    fn write(&mut self, layer: Layer, x: i32, y: i32, cell: Cell) {
        let (chunk_pos, local_x, local_y) = Self::world_to_chunk_coords(x, y);
        if let Some(chunk) = self.chunks.get_mut(&chunk_pos) {
            chunk.tile_data_mut(layer).write_cell(local_x, local_y, cell);
        }
    }

    fn strategy(&self, layer: Layer, id: i32) -> AutotileStrategy {
        self.registries.strategy(layer, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::base_registries;
    use crate::entity::{PropKind, ResourceProp};
    use crate::registry::ResourceHandle;
    use crate::tile::autotile::{orthogonal_frame, wall_frame, OpenEdges};
    use crate::tile::EMPTY;

    fn lab_world() -> World {
        let registries = Arc::new(base_registries().unwrap());
        World::new(
            registries,
            Settings::default(),
            WorldOptions {
                seed: 1,
                map_type: MapType::Lab,
                default_gamemode: 0,
            },
        )
        .unwrap()
    }

    fn tile_id(world: &World, layer: Layer, name: &str) -> i32 {
        world
            .registries()
            .tile_id(layer, &ResourceHandle::base(name))
            .unwrap()
    }

    #[test]
    fn test_world_to_chunk_coords() {
        assert_eq!(World::world_to_chunk_coords(0, 0), (IVec2::ZERO, 0, 0));
        assert_eq!(World::world_to_chunk_coords(17, 5), (IVec2::new(1, 0), 1, 5));
        assert_eq!(
            World::world_to_chunk_coords(-1, -16),
            (IVec2::new(-1, -1), 15, 0)
        );
        assert_eq!(World::chunk_coord_of(Vec2::new(-0.5, 15.9)), IVec2::new(-1, 0));
        assert_eq!(
            World::local_cell_of(Vec2::new(-0.5, 16.2)),
            (IVec2::new(-1, 1), 15, 0)
        );
    }

    #[test]
    fn test_world_bounds() {
        assert!(World::in_world_bounds(IVec2::new(62_500, 0)));
        assert!(!World::in_world_bounds(IVec2::new(62_501, 0)));
        assert!(World::in_world_bounds(IVec2::new(0, -62_501)));
        assert!(!World::in_world_bounds(IVec2::new(0, -62_502)));

        let mut world = lab_world();
        assert!(world.load_chunk(IVec2::new(62_501, 0)).unwrap().is_none());
        assert!(world.load_chunk(IVec2::new(62_500, 0)).unwrap().is_some());
    }

    #[test]
    fn test_insert_duplicate_chunk() {
        let mut world = lab_world();
        world.load_chunk(IVec2::ZERO).unwrap();
        assert!(matches!(
            world.insert_chunk(Chunk::new(0, 0)),
            Err(WorldError::ChunkExists(c)) if c == IVec2::ZERO
        ));
    }

    #[test]
    fn test_lab_chunk_loaded_clean() {
        let mut world = lab_world();
        let chunk = world.load_chunk(IVec2::ZERO).unwrap().unwrap();
        assert!(!chunk.dirty);
        assert_eq!(chunk.count_tiles(), CHUNK_AREA);

        let dark = tile_id(&world, Layer::Ground, "lab_dark");
        assert_eq!(world.tile_at(Layer::Ground, Vec2::new(3.5, 3.5)), dark);
        assert_eq!(world.tile_at(Layer::Wall, Vec2::new(3.5, 3.5)), EMPTY);
        assert_eq!(world.tile_at(Layer::Ground, Vec2::new(-3.5, 3.5)), NULL);
    }

    #[test]
    fn test_set_tile_requires_loaded_chunk() {
        let mut world = lab_world();
        let wall = tile_id(&world, Layer::Wall, "stone_wall");
        assert!(!world.set_tile(Layer::Wall, 40, 40, wall));
        assert!(!world.set_tile(Layer::Wall, 0, 0, 9999));
    }

    #[test]
    fn test_isolated_wall_frame() {
        let mut world = lab_world();
        world.load_chunk(IVec2::ZERO).unwrap();
        let wall = tile_id(&world, Layer::Wall, "stone_wall");

        assert!(world.set_tile(Layer::Wall, 5, 5, wall));
        let cell = Cell::unpack(world.raw_tile_at(Layer::Wall, 5, 5));
        assert_eq!(cell.id, wall);
        assert_eq!(cell.state, wall_frame(OpenEdges::ISOLATED));
        assert!(world.chunk(IVec2::ZERO).unwrap().dirty);
    }

    #[test]
    fn test_autotile_across_chunk_border() {
        let mut world = lab_world();
        world.load_chunk(IVec2::ZERO).unwrap();
        world.load_chunk(IVec2::new(1, 0)).unwrap();
        let floor = tile_id(&world, Layer::Floor, "wood_floor");

        world.set_tile(Layer::Floor, 15, 4, floor);
        world.set_tile(Layer::Floor, 16, 4, floor);

        let west = Cell::unpack(world.raw_tile_at(Layer::Floor, 15, 4));
        let east = Cell::unpack(world.raw_tile_at(Layer::Floor, 16, 4));
        assert_eq!(
            west.state,
            orthogonal_frame(OpenEdges::N | OpenEdges::S | OpenEdges::W)
        );
        assert_eq!(
            east.state,
            orthogonal_frame(OpenEdges::N | OpenEdges::E | OpenEdges::S)
        );

        assert!(world.remove_tile(Layer::Floor, 16, 4));
        let west = Cell::unpack(world.raw_tile_at(Layer::Floor, 15, 4));
        assert_eq!(west.state, orthogonal_frame(OpenEdges::N | OpenEdges::E | OpenEdges::S | OpenEdges::W));
    }

    #[test]
    fn test_unloaded_neighbor_counts_as_open() {
        let mut world = lab_world();
        world.load_chunk(IVec2::ZERO).unwrap();
        let floor = tile_id(&world, Layer::Floor, "wood_floor");

        world.set_tile(Layer::Floor, 0, 0, floor);
        world.set_tile(Layer::Floor, 1, 0, floor);
        let cell = Cell::unpack(world.raw_tile_at(Layer::Floor, 0, 0));
        assert_eq!(
            cell.state,
            orthogonal_frame(OpenEdges::N | OpenEdges::S | OpenEdges::W)
        );
    }

    #[test]
    fn test_padded_neighborhood() {
        let mut world = lab_world();
        world.load_chunk(IVec2::ZERO).unwrap();
        world.load_chunk(IVec2::new(0, 1)).unwrap();

        let padded = world.padded_neighborhood(IVec2::ZERO, Layer::Ground).unwrap();
        assert_eq!(padded.get(-1, 3), NULL);
        assert_eq!(
            padded.get(4, 16),
            world.raw_tile_at(Layer::Ground, 4, 16)
        );
        assert!(world.padded_neighborhood(IVec2::new(9, 9), Layer::Ground).is_none());
    }

    #[test]
    fn test_entity_membership_follows_moves() {
        let mut world = lab_world();
        let prop = ResourceProp::new(Vec2::new(2.5, 2.5), PropKind::Branch);
        let id = world.spawn_entity(Box::new(prop)).unwrap();

        assert!(world.chunk(IVec2::ZERO).unwrap().contains_entity(id));

        world.move_entity(id, Vec2::new(20.0, -3.0)).unwrap();
        assert!(!world.chunk(IVec2::ZERO).unwrap().contains_entity(id));
        assert!(world.chunk(IVec2::new(1, -1)).unwrap().contains_entity(id));
        assert_eq!(world.entity(id).unwrap().position(), Vec2::new(20.0, -3.0));

        let removed = world.remove_entity(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(!world.chunk(IVec2::new(1, -1)).unwrap().contains_entity(id));
        assert!(matches!(
            world.move_entity(id, Vec2::ZERO),
            Err(WorldError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_player_is_not_in_chunks() {
        let mut world = lab_world();
        let id = world.spawn_player(Player::new(Vec2::new(40.0, 40.0)));
        assert_eq!(world.player_id(), Some(id));
        assert_eq!(world.chunk_count(), 0);

        world.move_entity(id, Vec2::new(1.0, 1.0)).unwrap();
        assert_eq!(world.player().unwrap().position, Vec2::new(1.0, 1.0));
        assert_eq!(world.focus_points(), vec![Vec2::new(1.0, 1.0)]);
    }

    #[test]
    fn test_activity_and_eviction() {
        let mut world = lab_world();
        world.apply_settings(Settings {
            nearby_radius: 1,
            background_radius: 2,
            evict_after_ticks: 2,
            autosave_interval_secs: 0,
            ..Settings::default()
        });
        world.spawn_player(Player::new(Vec2::new(8.0, 8.0)));
        for coord in [IVec2::ZERO, IVec2::new(2, 0), IVec2::new(5, 5), IVec2::new(-5, 5)] {
            world.load_chunk(coord).unwrap();
        }
        let far_prop = ResourceProp::new(Vec2::new(88.5, 88.5), PropKind::RockPile);
        let far_id = world.spawn_entity(Box::new(far_prop)).unwrap();

        for _ in 0..60 {
            world.tick().unwrap();
        }
        assert_eq!(world.chunk(IVec2::ZERO).unwrap().activity, ChunkActivity::Nearby);
        assert_eq!(
            world.chunk(IVec2::new(2, 0)).unwrap().activity,
            ChunkActivity::Background
        );
        assert_eq!(
            world.chunk(IVec2::new(5, 5)).unwrap().activity,
            ChunkActivity::Inactive
        );

        for _ in 0..60 {
            world.tick().unwrap();
        }
        assert!(!world.is_loaded(IVec2::new(-5, 5)));
        assert!(world.is_loaded(IVec2::ZERO));
        assert!(world.is_loaded(IVec2::new(2, 0)));

        // Without a save directory the modified chunk stays, prop included
        assert!(world.is_loaded(IVec2::new(5, 5)));
        assert!(world.entity(far_id).is_some());
    }

    #[test]
    fn test_in_memory_eviction_keeps_edits() {
        let mut world = lab_world();
        world.apply_settings(Settings {
            nearby_radius: 1,
            background_radius: 2,
            evict_after_ticks: 1,
            autosave_interval_secs: 0,
            ..Settings::default()
        });
        let far = IVec2::new(10, 10);
        world.load_chunk(far).unwrap();
        let stone = tile_id(&world, Layer::Wall, "stone_wall");
        assert!(world.set_tile(Layer::Wall, 170, 170, stone));

        for _ in 0..120 {
            world.tick().unwrap();
        }
        assert!(world.is_loaded(far));
        assert_eq!(world.tile_at_cell(Layer::Wall, 170, 170), stone);

        assert!(!world.unload_chunk(far).unwrap());
        assert!(world.is_loaded(far));

        world.chunk_mut(far).unwrap().dirty = false;
        assert!(world.unload_chunk(far).unwrap());
        assert!(!world.is_loaded(far));
    }

    #[test]
    fn test_spawn_outside_world_fails() {
        let mut world = lab_world();
        let edge = WORLD_RADIUS as f32 + 100.0;
        let prop = ResourceProp::new(Vec2::new(edge, 0.5), PropKind::Branch);
        assert!(matches!(
            world.spawn_entity(Box::new(prop)),
            Err(WorldError::OutsideWorld(_))
        ));
        assert_eq!(world.entity_count(), 0);

        let prop = ResourceProp::new(Vec2::new(2.5, 2.5), PropKind::Branch);
        let id = world.spawn_entity(Box::new(prop)).unwrap();
        assert!(matches!(
            world.move_entity(id, Vec2::new(0.5, edge)),
            Err(WorldError::OutsideWorld(_))
        ));
        assert_eq!(world.entity(id).unwrap().position(), Vec2::new(2.5, 2.5));
        assert!(world.chunk(IVec2::ZERO).unwrap().contains_entity(id));
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut world = lab_world();
        for _ in 0..120 {
            world.tick().unwrap();
        }
        assert_eq!(world.clock().time(), START_TIME + 2);
        assert_eq!(world.clock().play_time(), 2);
        assert_eq!(world.day_factor(), 1.0);
    }
}
