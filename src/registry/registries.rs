use super::{Registry, ResourceHandle};
use crate::entity::EntityType;
use crate::error::RegistryError;
use crate::item::ItemDef;
use crate::tile::{AtlasRegion, AutotileStrategy, Layer, TileDef, TileRef};

/// Name of the edge pseudo-tile appended as the last entry of every tile layer
pub const VOID_TILE: &str = "void";

/// All content registries of a session.
///
/// Built once at startup, sealed with [`Registries::complete_registration`],
/// then shared read-only (behind an `Arc`) with the world for the rest of the
/// session.
pub struct Registries {
    pub ground: Registry<TileDef>,
    pub floor: Registry<TileDef>,
    pub wall: Registry<TileDef>,
    pub items: Registry<ItemDef>,
    pub entities: Registry<EntityType>,
}

impl Registries {
    pub fn new() -> Self {
        Self {
            ground: Registry::new("ground"),
            floor: Registry::new("floor"),
            wall: Registry::new("wall"),
            items: Registry::new("items"),
            entities: Registry::new("entities"),
        }
    }

    pub fn tiles(&self, layer: Layer) -> &Registry<TileDef> {
        match layer {
            Layer::Ground => &self.ground,
            Layer::Floor => &self.floor,
            Layer::Wall => &self.wall,
        }
    }

    pub fn tiles_mut(&mut self, layer: Layer) -> &mut Registry<TileDef> {
        match layer {
            Layer::Ground => &mut self.ground,
            Layer::Floor => &mut self.floor,
            Layer::Wall => &mut self.wall,
        }
    }

    /// Register a tile on the layer its definition names
    pub fn register_tile(&mut self, def: TileDef) -> Result<usize, RegistryError> {
        self.tiles_mut(def.layer).register(def)
    }

    pub fn register_item(&mut self, def: ItemDef) -> Result<usize, RegistryError> {
        self.items.register(def)
    }

    pub fn register_entity(&mut self, kind: EntityType) -> Result<usize, RegistryError> {
        self.entities.register(kind)
    }

    /// Append the void tile to each tile layer and seal every registry.
    /// Idempotent.
    pub fn complete_registration(&mut self) -> Result<(), RegistryError> {
        for layer in Layer::ALL {
            let registry = self.tiles_mut(layer);
            if registry.is_sealed() {
                continue;
            }
            registry.register(TileDef::new(
                ResourceHandle::base(VOID_TILE),
                layer,
                TileRef::new(AtlasRegion::new(0, 0, 0, 0), AutotileStrategy::Orthogonal),
            ))?;
            registry.complete_registration();
        }
        self.items.complete_registration();
        self.entities.complete_registration();
        log::info!(
            "[REG] Registration complete: {} ground, {} floor, {} wall tiles, {} items, {} entity types",
            self.ground.len(),
            self.floor.len(),
            self.wall.len(),
            self.items.len(),
            self.entities.len()
        );
        Ok(())
    }

    /// Tile definition for a layer-local id, None for sentinels or unknown ids
    pub fn tile(&self, layer: Layer, id: i32) -> Option<&TileDef> {
        usize::try_from(id)
            .ok()
            .and_then(|id| self.tiles(layer).get(id).ok())
    }

    /// Autotile strategy for `id`. Negative ids use the layer's last entry (the void tile).
    pub fn strategy(&self, layer: Layer, id: i32) -> AutotileStrategy {
        let def = if id < 0 {
            self.tiles(layer).entries().last()
        } else {
            self.tile(layer, id)
        };
        def.map(|def| def.tile.autotile).unwrap_or_default()
    }

    /// Session id of a tile by handle
    pub fn tile_id(&self, layer: Layer, handle: &ResourceHandle) -> Result<i32, RegistryError> {
        // Tile ids are bounded by the packed cell layout, far below i32::MAX
        self.tiles(layer).id_of(handle).map(|id| id as i32)
    }

    pub fn entity_type(&self, tag: &str) -> Result<&EntityType, RegistryError> {
        let id = self.entities.id_of_str(tag)?;
        self.entities.get(id)
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass() -> TileDef {
        TileDef::new(
            ResourceHandle::base("grass"),
            Layer::Ground,
            TileRef::new(AtlasRegion::new(0, 0, 128, 96), AutotileStrategy::Orthogonal),
        )
    }

    #[test]
    fn test_void_tile_is_last() {
        let mut registries = Registries::new();
        registries.register_tile(grass()).unwrap();
        registries.complete_registration().unwrap();

        let ground = registries.tiles(Layer::Ground);
        assert_eq!(ground.len(), 2);
        assert_eq!(ground.entries()[1].handle.name, VOID_TILE);
        assert_eq!(registries.tiles(Layer::Wall).len(), 1);
    }

    #[test]
    fn test_complete_registration_twice() {
        let mut registries = Registries::new();
        registries.register_tile(grass()).unwrap();
        registries.complete_registration().unwrap();
        registries.complete_registration().unwrap();
        assert_eq!(registries.ground.len(), 2);
    }

    #[test]
    fn test_register_after_seal() {
        let mut registries = Registries::new();
        registries.complete_registration().unwrap();
        assert!(matches!(
            registries.register_tile(grass()),
            Err(RegistryError::Sealed { .. })
        ));
    }

    #[test]
    fn test_strategy_for_sentinel_uses_void() {
        let mut registries = Registries::new();
        registries
            .register_tile(TileDef::new(
                ResourceHandle::base("stone_wall"),
                Layer::Wall,
                TileRef::new(AtlasRegion::new(0, 0, 256, 256), AutotileStrategy::Wall),
            ))
            .unwrap();
        registries.complete_registration().unwrap();

        assert_eq!(registries.strategy(Layer::Wall, 0), AutotileStrategy::Wall);
        assert_eq!(
            registries.strategy(Layer::Wall, crate::tile::EMPTY),
            AutotileStrategy::Orthogonal
        );
        assert_eq!(registries.strategy(Layer::Wall, 99), AutotileStrategy::None);
    }
}
