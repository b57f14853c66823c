//! Tilemap - one 16x16 layer of packed cells

use glam::IVec2;

use super::chunk::{CHUNK_AREA, CHUNK_SIZE};
use crate::registry::Registries;
use crate::tile::autotile::{self, TileGrid};
use crate::tile::{AutotileStrategy, Cell, FrameCoords, Layer, EMPTY, NULL};

/// Side length of a padded neighborhood view
pub const PADDED_SIZE: usize = CHUNK_SIZE + 2;

/// Grid of packed cells for one layer of one chunk
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap {
    origin: IVec2,
    layer: Layer,
    /// Row-major, index = y * CHUNK_SIZE + x
    cells: [i32; CHUNK_AREA],
}

impl Tilemap {
    pub fn new(origin: IVec2, layer: Layer) -> Self {
        Self {
            origin,
            layer,
            cells: [EMPTY; CHUNK_AREA],
        }
    }

    /// Chunk coordinate this tilemap belongs to
    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    #[inline]
    fn index(x: usize, y: usize) -> usize {
        assert!(
            x < CHUNK_SIZE && y < CHUNK_SIZE,
            "tile ({x}, {y}) outside {CHUNK_SIZE}x{CHUNK_SIZE} tilemap"
        );
        y * CHUNK_SIZE + x
    }

    /// Raw packed cell including visual state. Rendering only.
    #[inline]
    pub fn tile(&self, x: usize, y: usize) -> i32 {
        self.cells[Self::index(x, y)]
    }

    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        Cell::unpack(self.tile(x, y))
    }

    /// Logical tile id without visual state
    #[inline]
    pub fn absolute_tile(&self, x: usize, y: usize) -> i32 {
        self.cell(x, y).id
    }

    #[inline]
    pub(crate) fn write_cell(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[Self::index(x, y)] = cell.pack();
    }

    /// Place `id` at local `(x, y)`. With `autotile`, frames are derived from
    /// this tilemap alone; cells beyond its border count as NULL.
    /// Out-of-range coordinates panic.
    pub fn set_tile(&mut self, x: usize, y: usize, id: i32, autotile: Option<&Registries>) {
        Self::index(x, y);
        match autotile {
            Some(registries) => {
                let layer = self.layer;
                let mut grid = LoneTilemap {
                    map: self,
                    registries,
                };
                autotile::autotile(&mut grid, layer, id, x as i32, y as i32, 0);
            }
            None => self.write_cell(x, y, Cell::new(id, 0)),
        }
    }

    /// Raw cells, row-major
    pub fn cells(&self) -> &[i32; CHUNK_AREA] {
        &self.cells
    }

    /// Logical ids of every cell, row-major
    pub fn absolute_cells(&self) -> [i32; CHUNK_AREA] {
        self.cells.map(|raw| Cell::unpack(raw).id)
    }

    pub fn count_tiles(&self) -> usize {
        self.cells.iter().filter(|raw| **raw >= 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count_tiles() == 0
    }

    /// (16+2)x(16+2) view of this tilemap plus a one-cell border taken from the
    /// neighboring tilemaps. `neighbor(dx, dy)` returns the tilemap of the chunk
    /// at that offset; missing neighbors read as NULL.
    pub fn padded_neighborhood<'a, F>(&self, neighbor: F) -> PaddedTiles
    where
        F: Fn(i32, i32) -> Option<&'a Tilemap>,
    {
        let size = CHUNK_SIZE as i32;
        let mut padded = PaddedTiles {
            cells: [NULL; PADDED_SIZE * PADDED_SIZE],
        };
        for py in -1..=size {
            for px in -1..=size {
                let dx = px.div_euclid(size);
                let dy = py.div_euclid(size);
                let lx = px.rem_euclid(size) as usize;
                let ly = py.rem_euclid(size) as usize;
                let raw = if dx == 0 && dy == 0 {
                    Some(self.tile(lx, ly))
                } else {
                    neighbor(dx, dy).map(|map| map.tile(lx, ly))
                };
                padded.set(px, py, raw.unwrap_or(NULL));
            }
        }
        padded
    }

    /// Feed every tile to the renderer. With edge blending, each tile also
    /// receives the base frame of differing orthogonal neighbors at `weight`
    /// opacity so borders between materials fade into each other.
    pub fn draw<R: TileRenderer + ?Sized>(
        &self,
        renderer: &mut R,
        registries: &Registries,
        blend: EdgeBlend<'_>,
    ) {
        let base = self.origin * CHUNK_SIZE as i32;
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let cell = self.cell(x, y);
                let wx = base.x + x as i32;
                let wy = base.y + y as i32;

                if let Some(def) = registries.tile(self.layer, cell.id) {
                    renderer.draw_frame(def.tile.tile_coords(cell.state), wx, wy, 1.0);
                }

                let EdgeBlend::On { neighborhood, weight } = blend else {
                    continue;
                };
                for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                    let other = Cell::unpack(neighborhood.get(x as i32 + dx, y as i32 + dy));
                    if !other.is_tile() || other.id == cell.id {
                        continue;
                    }
                    if let Some(def) = registries.tile(self.layer, other.id) {
                        renderer.draw_frame(def.tile.tile_coords(0), wx, wy, weight);
                    }
                }
            }
        }
    }
}

/// Edge blending mode for [`Tilemap::draw`]
#[derive(Clone, Copy, Debug)]
pub enum EdgeBlend<'a> {
    Off,
    On {
        neighborhood: &'a PaddedTiles,
        weight: f32,
    },
}

/// Rendering collaborator fed by [`Tilemap::draw`]
pub trait TileRenderer {
    /// Draw one atlas frame at a world cell with the given opacity
    fn draw_frame(&mut self, frame: FrameCoords, world_x: i32, world_y: i32, alpha: f32);
}

/// Tilemap cells with a one-cell border from neighboring chunks
#[derive(Clone, Debug, PartialEq)]
pub struct PaddedTiles {
    cells: [i32; PADDED_SIZE * PADDED_SIZE],
}

impl PaddedTiles {
    /// Raw cell at local coordinates in `-1..=16`
    pub fn get(&self, x: i32, y: i32) -> i32 {
        self.cells[Self::index(x, y)]
    }

    fn set(&mut self, x: i32, y: i32, raw: i32) {
        self.cells[Self::index(x, y)] = raw;
    }

    fn index(x: i32, y: i32) -> usize {
        let (px, py) = ((x + 1) as usize, (y + 1) as usize);
        assert!(px < PADDED_SIZE && py < PADDED_SIZE, "padded cell ({x}, {y}) out of range");
        py * PADDED_SIZE + px
    }
}

/// A tilemap on its own, addressed in local coordinates
struct LoneTilemap<'a> {
    map: &'a mut Tilemap,
    registries: &'a Registries,
}

impl LoneTilemap<'_> {
    fn local(x: i32, y: i32) -> Option<(usize, usize)> {
        let size = CHUNK_SIZE as i32;
        ((0..size).contains(&x) && (0..size).contains(&y)).then_some((x as usize, y as usize))
    }
}

impl TileGrid for LoneTilemap<'_> {
    fn raw_at(&self, _layer: Layer, x: i32, y: i32) -> i32 {
        Self::local(x, y).map_or(NULL, |(x, y)| self.map.tile(x, y))
    }

    fn write(&mut self, _layer: Layer, x: i32, y: i32, cell: Cell) {
        if let Some((x, y)) = Self::local(x, y) {
            self.map.write_cell(x, y, cell);
        }
    }

    fn strategy(&self, layer: Layer, id: i32) -> AutotileStrategy {
        self.registries.strategy(layer, id)
    }
}
