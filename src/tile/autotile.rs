//! Autotiling - derive a tile's visual frame from which of its neighbors are open
//!
//! A neighbor is "open" when it holds no tile (EMPTY, or NULL outside loaded
//! chunks). The open-edge mask is mapped to a frame index through a fixed
//! table. Negative frames tell the renderer to mirror frame `|index|`
//! horizontally, so left/right mirror images share one stored frame.
//!
//! Placing a tile re-evaluates its four orthogonal neighbors once. Neighbors of
//! neighbors are not revisited: [`AUTOTILE_PROPAGATION_DEPTH`] bounds the work
//! per placement.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::cell::{absolute, is_absent, Cell};
use super::Layer;

/// How many hops a placement propagates to re-evaluate neighbors
pub const AUTOTILE_PROPAGATION_DEPTH: u32 = 1;

/// Neighbor sampling strategy of a tileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutotileStrategy {
    /// Single frame, state stays 0
    #[default]
    None,
    /// 4-neighbor mask, 16-entry table
    Orthogonal,
    /// 8-neighbor mask collapsed into a 12-bit edge/corner mask
    Wall,
}

bitflags! {
    /// Open-edge mask. The low four bits are the whole mask for [`AutotileStrategy::Orthogonal`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct OpenEdges: u16 {
        const N = 1 << 0;
        const E = 1 << 1;
        const S = 1 << 2;
        const W = 1 << 3;
        /// Diagonal neighbor open, or forced open because an adjacent edge is open
        const DIAG_NE = 1 << 4;
        const DIAG_SE = 1 << 5;
        const DIAG_SW = 1 << 6;
        const DIAG_NW = 1 << 7;
        /// Both adjacent edges open
        const CONVEX_NE = 1 << 8;
        const CONVEX_SE = 1 << 9;
        const CONVEX_SW = 1 << 10;
        const CONVEX_NW = 1 << 11;
    }
}

impl OpenEdges {
    /// Mask of a tile with no neighbors at all
    pub const ISOLATED: OpenEdges = OpenEdges::all();

    /// Horizontal mirror image (east and west swap)
    pub fn mirrored(self) -> Self {
        const PAIRS: [(OpenEdges, OpenEdges); 5] = [
            (OpenEdges::E, OpenEdges::W),
            (OpenEdges::DIAG_NE, OpenEdges::DIAG_NW),
            (OpenEdges::DIAG_SE, OpenEdges::DIAG_SW),
            (OpenEdges::CONVEX_NE, OpenEdges::CONVEX_NW),
            (OpenEdges::CONVEX_SE, OpenEdges::CONVEX_SW),
        ];
        let mut out = self & (OpenEdges::N | OpenEdges::S);
        for (a, b) in PAIRS {
            out.set(a, self.contains(b));
            out.set(b, self.contains(a));
        }
        out
    }

    /// Build the canonical 12-bit wall mask from raw neighbor openness
    #[allow(clippy::too_many_arguments)]
    pub fn wall(n: bool, e: bool, s: bool, w: bool, ne: bool, se: bool, sw: bool, nw: bool) -> Self {
        let mut mask = Self::orthogonal(n, e, s, w);
        mask.set(OpenEdges::DIAG_NE, ne || n || e);
        mask.set(OpenEdges::DIAG_SE, se || s || e);
        mask.set(OpenEdges::DIAG_SW, sw || s || w);
        mask.set(OpenEdges::DIAG_NW, nw || n || w);
        mask.set(OpenEdges::CONVEX_NE, n && e);
        mask.set(OpenEdges::CONVEX_SE, s && e);
        mask.set(OpenEdges::CONVEX_SW, s && w);
        mask.set(OpenEdges::CONVEX_NW, n && w);
        mask
    }

    pub fn orthogonal(n: bool, e: bool, s: bool, w: bool) -> Self {
        let mut mask = OpenEdges::empty();
        mask.set(OpenEdges::N, n);
        mask.set(OpenEdges::E, e);
        mask.set(OpenEdges::S, s);
        mask.set(OpenEdges::W, w);
        mask
    }
}

/// Orthogonal strategy frames, indexed by the N/E/S/W bits.
///
/// Symmetric masks own frames 0..=7, east/west pairs share 8..=11 with the west
/// variant mirrored.
pub const ORTHOGONAL_FRAMES: [i8; 16] = [
    0,   // closed on all sides
    1,   // N
    8,   // E
    9,   // N E
    2,   // S
    3,   // N S
    10,  // E S
    11,  // N E S
    -8,  // W
    -9,  // N W
    4,   // E W
    5,   // N E W
    -10, // S W
    -11, // N S W
    6,   // E S W
    7,   // isolated
];

/// Frame for an orthogonal mask
pub fn orthogonal_frame(mask: OpenEdges) -> i8 {
    ORTHOGONAL_FRAMES[usize::from(mask.bits() & 0xF)]
}

/// Frame for a wall mask.
///
/// The table is derived once from all 256 raw neighborhoods: canonical masks in
/// ascending order get consecutive frames, except a mask whose mirror image
/// already has a frame, which reuses it negated. Masks no neighborhood can
/// produce map to frame 0.
pub fn wall_frame(mask: OpenEdges) -> i8 {
    wall_table()[usize::from(mask.bits())]
}

/// Every mask a real neighborhood can produce under the wall strategy
pub fn wall_masks() -> BTreeSet<OpenEdges> {
    (0u16..256)
        .map(|raw| {
            let bit = |i: u16| raw & (1 << i) != 0;
            OpenEdges::wall(bit(0), bit(1), bit(2), bit(3), bit(4), bit(5), bit(6), bit(7))
        })
        .collect()
}

fn wall_table() -> &'static [i8; 4096] {
    static TABLE: OnceLock<[i8; 4096]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0i8; 4096];
        let mut assigned = [false; 4096];
        let mut next: i8 = 0;
        for mask in wall_masks() {
            let index = usize::from(mask.bits());
            let mirror = usize::from(mask.mirrored().bits());
            table[index] = if mirror != index && assigned[mirror] {
                -table[mirror]
            } else {
                let frame = next;
                next += 1;
                frame
            };
            assigned[index] = true;
        }
        table
    })
}

/// Cell storage the autotiler reads and writes, addressed in world cell coordinates
pub trait TileGrid {
    /// Raw packed value, [`super::NULL`] outside loaded space
    fn raw_at(&self, layer: Layer, x: i32, y: i32) -> i32;

    /// Store a cell. Writes outside loaded space are dropped.
    fn write(&mut self, layer: Layer, x: i32, y: i32, cell: Cell);

    /// Strategy of the tileset entry `id`. Negative ids resolve to the
    /// layer's last entry, the reserved void tile.
    fn strategy(&self, layer: Layer, id: i32) -> AutotileStrategy;
}

const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Open-edge mask around `(x, y)` for the given strategy
pub fn sample_mask<G: TileGrid + ?Sized>(
    grid: &G,
    layer: Layer,
    x: i32,
    y: i32,
    strategy: AutotileStrategy,
) -> OpenEdges {
    let open = |dx: i32, dy: i32| is_absent(grid.raw_at(layer, x + dx, y + dy));
    match strategy {
        AutotileStrategy::None => OpenEdges::empty(),
        AutotileStrategy::Orthogonal => {
            OpenEdges::orthogonal(open(0, -1), open(1, 0), open(0, 1), open(-1, 0))
        }
        AutotileStrategy::Wall => OpenEdges::wall(
            open(0, -1),
            open(1, 0),
            open(0, 1),
            open(-1, 0),
            open(1, -1),
            open(1, 1),
            open(-1, 1),
            open(-1, -1),
        ),
    }
}

/// Frame a tile with this strategy shows for the given mask
pub fn frame_for(strategy: AutotileStrategy, mask: OpenEdges) -> i8 {
    match strategy {
        AutotileStrategy::None => 0,
        AutotileStrategy::Orthogonal => orthogonal_frame(mask),
        AutotileStrategy::Wall => wall_frame(mask),
    }
}

/// Place `id` at `(x, y)` with its derived frame, then re-evaluate the four
/// orthogonal neighbors while `depth < AUTOTILE_PROPAGATION_DEPTH`.
/// Callers start at depth 0.
pub fn autotile<G: TileGrid + ?Sized>(grid: &mut G, layer: Layer, id: i32, x: i32, y: i32, depth: u32) {
    let strategy = grid.strategy(layer, id);
    let mask = sample_mask(grid, layer, x, y, strategy);
    grid.write(layer, x, y, Cell::new(id, frame_for(strategy, mask)));

    if depth >= AUTOTILE_PROPAGATION_DEPTH {
        return;
    }
    for (dx, dy) in ORTHOGONAL_OFFSETS {
        let raw = grid.raw_at(layer, x + dx, y + dy);
        if !is_absent(raw) {
            autotile(grid, layer, absolute(raw), x + dx, y + dy, depth + 1);
        }
    }
}
