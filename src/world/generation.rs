use glam::{IVec2, Vec2};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::content::ROCK_WALLS;
use crate::entity::{Entity, PropKind, ResourceProp, Tree};
use crate::error::RegistryError;
use crate::registry::{Registries, ResourceHandle};
use crate::tile::{Layer, EMPTY};
use crate::world::chunk::{CHUNK_AREA, CHUNK_SIZE};

/// Which terrain a world is generated with. Stored as an integer in worldInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapType {
    #[default]
    Default,
    /// Flat checkerboard test map
    Lab,
}

impl MapType {
    pub fn id(self) -> i32 {
        match self {
            MapType::Default => 0,
            MapType::Lab => 1,
        }
    }

    /// Unknown ids fall back to the default map
    pub fn from_id(id: i32) -> Self {
        match id {
            1 => MapType::Lab,
            0 => MapType::Default,
            other => {
                log::warn!("[GEN] Unknown map type {}, using default terrain", other);
                MapType::Default
            }
        }
    }
}

// Elevation bands
const DEEP_WATER_LEVEL: f64 = 0.30;
const SHALLOW_WATER_LEVEL: f64 = 0.35;
const SAND_LEVEL: f64 = 0.40;
const GRASS_LEVEL: f64 = 0.60;
const DIRT_LEVEL: f64 = 0.65;

/// ~40 tile wavelength for landmasses
const ELEVATION_FREQUENCY: f64 = 0.025;
const ROCK_FREQUENCY: f64 = 0.04;
/// Non-integer so samples never land on lattice points (where Perlin is 0)
const RESOURCE_FREQUENCY: f64 = 0.73;
const TREE_FREQUENCY: f64 = 0.37;

/// 83rd percentile of 2D Perlin mapped to 0..1, so ~17% of open grass and
/// sand cells get a prop
const RESOURCE_THRESHOLD: f64 = 0.716;
const TREE_THRESHOLD: f64 = 0.76;

/// Session ids of every tile the generator places
#[derive(Debug, Clone)]
struct Palette {
    deep_water: i32,
    shallow_water: i32,
    sand: i32,
    grass: i32,
    dirt: i32,
    stone: i32,
    lab_dark: i32,
    lab_light: i32,
    dirt_wall: i32,
    rock_walls: [i32; ROCK_WALLS.len()],
}

impl Palette {
    fn resolve(registries: &Registries) -> Result<Self, RegistryError> {
        let ground = |name: &str| registries.tile_id(Layer::Ground, &ResourceHandle::base(name));
        let wall = |name: &str| registries.tile_id(Layer::Wall, &ResourceHandle::base(name));

        let mut rock_walls = [EMPTY; ROCK_WALLS.len()];
        for (slot, name) in rock_walls.iter_mut().zip(ROCK_WALLS) {
            *slot = wall(name)?;
        }

        Ok(Self {
            deep_water: ground("deep_water")?,
            shallow_water: ground("shallow_water")?,
            sand: ground("sand")?,
            grass: ground("grass")?,
            dirt: ground("dirt")?,
            stone: ground("stone")?,
            lab_dark: ground("lab_dark")?,
            lab_light: ground("lab_light")?,
            dirt_wall: wall("dirt_wall")?,
            rock_walls,
        })
    }
}

/// Tiles and props for one chunk, before they are placed into the world
#[derive(Debug)]
pub struct GeneratedChunk {
    pub coord: IVec2,
    /// Logical ids per layer in [`Layer::index`] order, row-major
    pub layers: [[i32; CHUNK_AREA]; 3],
    pub entities: Vec<Box<dyn Entity>>,
}

impl GeneratedChunk {
    fn new(coord: IVec2) -> Self {
        Self {
            coord,
            layers: [[EMPTY; CHUNK_AREA]; 3],
            entities: Vec::new(),
        }
    }

    pub fn tile(&self, layer: Layer, x: usize, y: usize) -> i32 {
        self.layers[layer.index()][y * CHUNK_SIZE + x]
    }

    fn set(&mut self, layer: Layer, x: usize, y: usize, id: i32) {
        self.layers[layer.index()][y * CHUNK_SIZE + x] = id;
    }
}

/// Terrain generator. Output depends only on the seed and the chunk coordinate.
pub struct WorldGenerator {
    pub seed: i32,
    pub map_type: MapType,
    elevation_noise: Perlin,
    rock_noise: Fbm<Perlin>,
    resource_noise: Perlin,
    tree_noise: [Perlin; 2],
    palette: Palette,
}

impl WorldGenerator {
    pub fn new(seed: i32, map_type: MapType, registries: &Registries) -> Result<Self, RegistryError> {
        // Separate noise layers per feature (offset seeds for variety)
        let layer_seed = |offset: i32| seed.wrapping_add(offset) as u32;

        let rock_noise = Fbm::<Perlin>::new(layer_seed(1))
            .set_octaves(3)
            .set_frequency(ROCK_FREQUENCY)
            .set_lacunarity(2.0)
            .set_persistence(0.5);

        Ok(Self {
            seed,
            map_type,
            elevation_noise: Perlin::new(layer_seed(0)),
            rock_noise,
            resource_noise: Perlin::new(layer_seed(2)),
            tree_noise: [Perlin::new(layer_seed(3)), Perlin::new(layer_seed(4))],
            palette: Palette::resolve(registries)?,
        })
    }

    /// Generate the tiles and props of the chunk at `coord`
    pub fn generate(&self, coord: IVec2) -> GeneratedChunk {
        let mut chunk = GeneratedChunk::new(coord);
        match self.map_type {
            MapType::Default => self.generate_default(&mut chunk),
            MapType::Lab => self.generate_lab(&mut chunk),
        }
        log::debug!(
            "[GEN] Generated chunk ({}, {}) with {} props",
            coord.x,
            coord.y,
            chunk.entities.len()
        );
        chunk
    }

    fn generate_lab(&self, chunk: &mut GeneratedChunk) {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let id = if x % 2 == y % 2 {
                    self.palette.lab_dark
                } else {
                    self.palette.lab_light
                };
                chunk.set(Layer::Ground, x, y, id);
            }
        }
    }

    fn generate_default(&self, chunk: &mut GeneratedChunk) {
        let origin = chunk.coord * CHUNK_SIZE as i32;
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let world_x = origin.x + x as i32;
                let world_y = origin.y + y as i32;

                let (ground, wall) = self.terrain_at(world_x, world_y);
                chunk.set(Layer::Ground, x, y, ground);
                chunk.set(Layer::Wall, x, y, wall);

                if wall == EMPTY {
                    if let Some(prop) = self.prop_at(world_x, world_y, ground) {
                        chunk.entities.push(prop);
                    }
                }
            }
        }
    }

    /// Sample Perlin noise and map it from [-1, 1] to [0, 1]
    fn sample01(noise: &impl NoiseFn<f64, 2>, x: f64, y: f64) -> f64 {
        ((noise.get([x, y]) + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// Elevation in 0..1, pulled towards 0.5 near the origin so spawn is land
    pub fn elevation_at(&self, world_x: i32, world_y: i32) -> f64 {
        let (wx, wy) = (f64::from(world_x), f64::from(world_y));
        let f = ELEVATION_FREQUENCY;
        let base = self.elevation_noise.get([wx * f, wy * f]);
        let detail = self.elevation_noise.get([wx * f * 2.0, wy * f * 2.0]);
        let mut e = (((base + 0.2 * detail) / 1.2 + 1.0) / 2.0).clamp(0.0, 1.0);

        let dist = (wx * wx + wy * wy).sqrt() / CHUNK_SIZE as f64;
        e -= (e - 0.5) / (dist + 1.0);
        e
    }

    /// Ground and wall ids for a world cell
    fn terrain_at(&self, world_x: i32, world_y: i32) -> (i32, i32) {
        let palette = &self.palette;
        let e = self.elevation_at(world_x, world_y);

        if e < DEEP_WATER_LEVEL {
            (palette.deep_water, EMPTY)
        } else if e < SHALLOW_WATER_LEVEL {
            (palette.shallow_water, EMPTY)
        } else if e < SAND_LEVEL {
            (palette.sand, EMPTY)
        } else if e < GRASS_LEVEL {
            (palette.grass, EMPTY)
        } else if e < DIRT_LEVEL {
            (palette.dirt, palette.dirt_wall)
        } else {
            let v = Self::sample01(&self.rock_noise, f64::from(world_x), f64::from(world_y));
            let bucket = ((v * ROCK_WALLS.len() as f64) as usize).min(ROCK_WALLS.len() - 1);
            (palette.stone, palette.rock_walls[bucket])
        }
    }

    /// Resource prop or tree on an open cell, if any
    fn prop_at(&self, world_x: i32, world_y: i32, ground: i32) -> Option<Box<dyn Entity>> {
        let palette = &self.palette;
        let (wx, wy) = (f64::from(world_x), f64::from(world_y));
        let center = Vec2::new(world_x as f32 + 0.5, world_y as f32 + 0.5);

        if ground == palette.grass || ground == palette.sand {
            let v = Self::sample01(
                &self.resource_noise,
                wx * RESOURCE_FREQUENCY,
                wy * RESOURCE_FREQUENCY,
            );
            if v > RESOURCE_THRESHOLD {
                let kind = if (world_x + world_y).rem_euclid(2) == 0 {
                    PropKind::Branch
                } else {
                    PropKind::RockPile
                };
                return Some(Box::new(ResourceProp::new(center, kind)));
            }
        }

        if ground == palette.grass {
            let [a, b] = &self.tree_noise;
            let avg = (Self::sample01(a, wx * TREE_FREQUENCY, wy * TREE_FREQUENCY)
                + Self::sample01(b, wx * TREE_FREQUENCY, wy * TREE_FREQUENCY))
                / 2.0;
            if avg > TREE_THRESHOLD {
                return Some(Box::new(Tree::new(center)));
            }
        }

        None
    }
}
