//! Tiles and tilesets - atlas frames, gameplay properties, packed cells, autotiling

pub mod autotile;
mod cell;

pub use autotile::{AutotileStrategy, TileGrid, AUTOTILE_PROPAGATION_DEPTH};
pub use cell::{Cell, EMPTY, NULL};

use serde::{Deserialize, Serialize};

use crate::item::ItemStack;
use crate::registry::{Registrable, ResourceHandle};

/// Default frame size in atlas pixels
pub const FRAME_SIZE: u32 = 32;

/// One of the three stacked tile layers of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Ground,
    Floor,
    Wall,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Ground, Layer::Floor, Layer::Wall];

    pub fn index(self) -> usize {
        match self {
            Layer::Ground => 0,
            Layer::Floor => 1,
            Layer::Wall => 2,
        }
    }

    /// Key used for this layer in chunk file metadata
    pub fn save_key(self) -> &'static str {
        match self {
            Layer::Ground => "g",
            Layer::Floor => "f",
            Layer::Wall => "s",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Ground => "ground",
            Layer::Floor => "floor",
            Layer::Wall => "wall",
        }
    }
}

/// Rectangle inside the sprite atlas, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRegion {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Source rect of one frame plus the mirror instruction for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCoords {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub flip_x: bool,
}

/// Atlas region sliced into a grid of frames (a tileset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRef {
    pub region: AtlasRegion,
    pub frame_width: u32,
    pub frame_height: u32,
    pub autotile: AutotileStrategy,
}

impl TileRef {
    pub fn new(region: AtlasRegion, autotile: AutotileStrategy) -> Self {
        Self {
            region,
            frame_width: FRAME_SIZE,
            frame_height: FRAME_SIZE,
            autotile,
        }
    }

    /// Number of frames in the tileset
    pub fn frame_count(&self) -> u32 {
        self.columns() * (self.region.height / self.frame_height.max(1))
    }

    fn columns(&self) -> u32 {
        (self.region.width / self.frame_width.max(1)).max(1)
    }

    /// Atlas rect for a visual state. Negative states mirror the frame `|state|`.
    /// States past the end of the tileset wrap so a short atlas never reads out of bounds.
    pub fn tile_coords(&self, state: i8) -> FrameCoords {
        let count = self.frame_count().max(1);
        let frame = u32::from(state.unsigned_abs()) % count;
        let columns = self.columns();
        FrameCoords {
            x: self.region.x + (frame % columns) * self.frame_width,
            y: self.region.y + (frame / columns) * self.frame_height,
            width: self.frame_width,
            height: self.frame_height,
            flip_x: state < 0,
        }
    }
}

/// Tool categories for breaking floors and walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Hand,
    Axe,
    Pickaxe,
    Shovel,
}

/// Item dropped when a tile is broken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDrop {
    pub stack: ItemStack,
    /// Chance in 0..=1
    pub probability: f32,
}

/// Gameplay definition of a ground, floor or wall tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub handle: ResourceHandle,
    pub layer: Layer,
    pub tile: TileRef,
    /// Seconds to break with the right tool (None = unbreakable)
    pub hardness: Option<f32>,
    /// Movement multiplier while standing on this tile
    pub speed_modifier: Option<f32>,
    pub solid: bool,
    pub drops: Vec<TileDrop>,
    pub footstep_sound: Option<String>,
    pub effective_tools: Vec<ToolKind>,
    /// Break-time multiplier when using a tool not in `effective_tools`
    pub wrong_tool_penalty: Option<f32>,
}

impl TileDef {
    pub fn new(handle: ResourceHandle, layer: Layer, tile: TileRef) -> Self {
        Self {
            handle,
            layer,
            tile,
            hardness: None,
            speed_modifier: None,
            solid: false,
            drops: Vec::new(),
            footstep_sound: None,
            effective_tools: Vec::new(),
            wrong_tool_penalty: None,
        }
    }

    pub fn hardness(mut self, seconds: f32) -> Self {
        self.hardness = Some(seconds);
        self
    }

    pub fn speed_modifier(mut self, modifier: f32) -> Self {
        self.speed_modifier = Some(modifier);
        self
    }

    pub fn solid(mut self) -> Self {
        self.solid = true;
        self
    }

    pub fn drop(mut self, stack: ItemStack, probability: f32) -> Self {
        self.drops.push(TileDrop { stack, probability });
        self
    }

    pub fn footstep(mut self, sound: impl Into<String>) -> Self {
        self.footstep_sound = Some(sound.into());
        self
    }

    pub fn tools(mut self, tools: &[ToolKind], wrong_tool_penalty: f32) -> Self {
        self.effective_tools = tools.to_vec();
        self.wrong_tool_penalty = Some(wrong_tool_penalty);
        self
    }

    /// Ground tiles accept any tool; floors and walls only their listed ones
    pub fn is_effective_tool(&self, tool: ToolKind) -> bool {
        self.layer == Layer::Ground
            || self.effective_tools.is_empty()
            || self.effective_tools.contains(&tool)
    }

    /// Seconds needed to break this tile with `tool`, None if unbreakable
    pub fn break_time(&self, tool: ToolKind) -> Option<f32> {
        let base = self.hardness?;
        if self.is_effective_tool(tool) {
            Some(base)
        } else {
            Some(base * self.wrong_tool_penalty.unwrap_or(1.0))
        }
    }
}

impl Registrable for TileDef {
    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}
