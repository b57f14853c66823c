//! Built-in `base` content: terrain tiles, items and entity types

use crate::entity::{EntityType, ItemDrop, Player, ResourceProp, Tree};
use crate::error::RegistryError;
use crate::item::{ItemDef, ItemStack};
use crate::registry::{Registries, ResourceHandle};
use crate::tile::{AtlasRegion, AutotileStrategy, Layer, TileDef, TileRef, ToolKind};

/// Rock walls picked by the stone noise bucket, in bucket order
pub const ROCK_WALLS: [&str; 6] = [
    "stone_wall",
    "granite_wall",
    "basalt_wall",
    "limestone_wall",
    "marble_wall",
    "sandstone_wall",
];

const ATLAS_WIDTH: u32 = 1024;

/// Hands out atlas regions left to right, wrapping into new rows
struct AtlasCursor {
    x: u32,
    y: u32,
    row_height: u32,
}

impl AtlasCursor {
    fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            row_height: 0,
        }
    }

    fn take(&mut self, strategy: AutotileStrategy) -> TileRef {
        let (width, height) = match strategy {
            AutotileStrategy::None => (32, 32),
            AutotileStrategy::Orthogonal => (128, 96),
            AutotileStrategy::Wall => (256, 192),
        };
        if self.x + width > ATLAS_WIDTH {
            self.x = 0;
            self.y += self.row_height;
            self.row_height = 0;
        }
        let region = AtlasRegion::new(self.x, self.y, width, height);
        self.x += width;
        self.row_height = self.row_height.max(height);
        TileRef::new(region, strategy)
    }
}

fn item(name: &str, count: u32) -> ItemStack {
    ItemStack::new(ResourceHandle::base(name), count)
}

/// Register everything in the `base` namespace. Call before
/// [`Registries::complete_registration`].
pub fn register_base_content(registries: &mut Registries) -> Result<(), RegistryError> {
    let mut atlas = AtlasCursor::new();
    let ground = |name: &str, atlas: &mut AtlasCursor| {
        TileDef::new(
            ResourceHandle::base(name),
            Layer::Ground,
            atlas.take(AutotileStrategy::Orthogonal),
        )
    };

    // Ground
    registries.register_tile(
        ground("deep_water", &mut atlas)
            .speed_modifier(0.3)
            .footstep("splash"),
    )?;
    registries.register_tile(
        ground("shallow_water", &mut atlas)
            .speed_modifier(0.6)
            .footstep("splash"),
    )?;
    registries.register_tile(
        ground("sand", &mut atlas)
            .hardness(0.5)
            .speed_modifier(0.9)
            .drop(item("sand", 1), 1.0)
            .footstep("sand"),
    )?;
    registries.register_tile(
        ground("grass", &mut atlas)
            .hardness(0.6)
            .drop(item("dirt", 1), 1.0)
            .footstep("grass"),
    )?;
    registries.register_tile(
        ground("dirt", &mut atlas)
            .hardness(0.6)
            .drop(item("dirt", 1), 1.0)
            .footstep("dirt"),
    )?;
    registries.register_tile(
        ground("stone", &mut atlas)
            .hardness(2.0)
            .drop(item("stone", 1), 1.0)
            .footstep("stone"),
    )?;
    for name in ["lab_dark", "lab_light"] {
        registries.register_tile(TileDef::new(
            ResourceHandle::base(name),
            Layer::Ground,
            atlas.take(AutotileStrategy::None),
        ))?;
    }

    // Floors
    registries.register_tile(
        TileDef::new(
            ResourceHandle::base("wood_floor"),
            Layer::Floor,
            atlas.take(AutotileStrategy::Orthogonal),
        )
        .hardness(1.0)
        .speed_modifier(1.2)
        .drop(item("wood_plank", 1), 1.0)
        .tools(&[ToolKind::Axe], 3.0)
        .footstep("wood"),
    )?;
    registries.register_tile(
        TileDef::new(
            ResourceHandle::base("stone_floor"),
            Layer::Floor,
            atlas.take(AutotileStrategy::Orthogonal),
        )
        .hardness(2.5)
        .speed_modifier(1.2)
        .drop(item("stone", 1), 1.0)
        .tools(&[ToolKind::Pickaxe], 4.0)
        .footstep("stone"),
    )?;

    // Walls
    registries.register_tile(
        TileDef::new(
            ResourceHandle::base("dirt_wall"),
            Layer::Wall,
            atlas.take(AutotileStrategy::Wall),
        )
        .hardness(1.5)
        .solid()
        .drop(item("dirt", 2), 1.0)
        .tools(&[ToolKind::Shovel, ToolKind::Pickaxe], 2.0),
    )?;
    for (i, name) in ROCK_WALLS.iter().enumerate() {
        registries.register_tile(
            TileDef::new(
                ResourceHandle::base(*name),
                Layer::Wall,
                atlas.take(AutotileStrategy::Wall),
            )
            .hardness(3.0 + i as f32 * 0.5)
            .solid()
            .drop(item("stone", 2), 1.0)
            .drop(item("flint", 1), 0.1)
            .tools(&[ToolKind::Pickaxe], 5.0),
        )?;
    }
    registries.register_tile(
        TileDef::new(
            ResourceHandle::base("wood_wall"),
            Layer::Wall,
            atlas.take(AutotileStrategy::Wall),
        )
        .hardness(2.0)
        .solid()
        .drop(item("wood_plank", 2), 1.0)
        .tools(&[ToolKind::Axe], 3.0),
    )?;

    // Items
    for name in ["stone", "dirt", "sand", "flint", "branch", "rock", "log", "torch"] {
        registries.register_item(ItemDef::plain(ResourceHandle::base(name)))?;
    }
    registries.register_item(ItemDef::tile(
        ResourceHandle::base("wood_plank"),
        Layer::Floor,
        ResourceHandle::base("wood_floor"),
    ))?;
    registries.register_item(ItemDef::tile(
        ResourceHandle::base("wood_wall"),
        Layer::Wall,
        ResourceHandle::base("wood_wall"),
    ))?;
    registries.register_item(ItemDef::entity(
        ResourceHandle::base("sapling"),
        ResourceHandle::base("tree"),
    ))?;

    // Entity types
    registries.register_entity(EntityType::of::<ItemDrop>(ResourceHandle::base("item_drop")))?;
    registries.register_entity(EntityType::of::<ResourceProp>(ResourceHandle::base(
        "resource_prop",
    )))?;
    registries.register_entity(EntityType::of::<Tree>(ResourceHandle::base("tree")))?;
    registries.register_entity(EntityType::of::<Player>(ResourceHandle::base("player")))?;

    Ok(())
}

/// Registries holding the base content, sealed and ready for a world
pub fn base_registries() -> Result<Registries, RegistryError> {
    let mut registries = Registries::new();
    register_base_content(&mut registries)?;
    registries.complete_registration()?;
    Ok(registries)
}
