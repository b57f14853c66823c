//! Spatial queries over chunks and entities

use glam::{IVec2, Vec2};

use super::world::World;
use crate::entity::EntityId;
use crate::error::WorldResult;
use crate::tile::Layer;

/// Chessboard distance between two chunk coordinates
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    (a - b).abs().max_element()
}

/// Every chunk coordinate in the square of half-size `radius` around `center`,
/// row by row
pub fn chunks_in_radius(center: IVec2, radius: i32) -> impl Iterator<Item = IVec2> {
    let radius = radius.max(0);
    (-radius..=radius)
        .flat_map(move |dy| (-radius..=radius).map(move |dx| center + IVec2::new(dx, dy)))
}

impl World {
    /// Loaded chunks within `radius` chunks of the chunk containing `pos`
    pub fn loaded_chunks_near(&self, pos: Vec2, radius: i32) -> Vec<IVec2> {
        chunks_in_radius(Self::chunk_coord_of(pos), radius)
            .filter(|coord| self.chunks.contains_key(coord))
            .collect()
    }

    /// Load (or generate) every chunk within `radius` of `center`.
    /// Returns how many chunks are loaded in that square afterwards.
    pub fn load_chunks_around(&mut self, center: IVec2, radius: i32) -> WorldResult<usize> {
        let mut loaded = 0;
        for coord in chunks_in_radius(center, radius) {
            if self.load_chunk(coord)?.is_some() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Entities in loaded chunks within `chunk_radius` of `pos` and at most
    /// `max_distance` away from it, nearest first
    pub fn entities_near(&self, pos: Vec2, chunk_radius: i32, max_distance: f32) -> Vec<EntityId> {
        let mut found: Vec<(f32, EntityId)> = self
            .loaded_chunks_near(pos, chunk_radius)
            .into_iter()
            .filter_map(|coord| self.chunks.get(&coord))
            .flat_map(|chunk| chunk.entities())
            .filter_map(|id| {
                let distance = self.entities.get(&id)?.position().distance(pos);
                (distance <= max_distance).then_some((distance, id))
            })
            .collect();

        // Non-persisting entities (the player) live outside chunk membership
        found.extend(self.entities.values().filter_map(|entity| {
            if entity.persists_in_chunk() {
                return None;
            }
            let distance = entity.position().distance(pos);
            (distance <= max_distance).then_some((distance, entity.id()))
        }));

        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Whether a wall blocks movement at `pos`. Unloaded space is solid.
    pub fn is_solid_at(&self, pos: Vec2) -> bool {
        let (chunk_pos, local_x, local_y) = Self::local_cell_of(pos);
        let Some(chunk) = self.chunks.get(&chunk_pos) else {
            return true;
        };
        let wall = chunk.absolute_tile(Layer::Wall, local_x, local_y);
        self.registries
            .tile(Layer::Wall, wall)
            .is_some_and(|def| def.solid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::content::base_registries;
    use crate::entity::{Player, PropKind, ResourceProp};
    use crate::registry::ResourceHandle;
    use crate::world::generation::MapType;
    use crate::world::WorldOptions;
    use std::sync::Arc;

    fn lab_world() -> World {
        World::new(
            Arc::new(base_registries().unwrap()),
            Settings::default(),
            WorldOptions {
                seed: 3,
                map_type: MapType::Lab,
                default_gamemode: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_chebyshev() {
        assert_eq!(chebyshev(IVec2::new(0, 0), IVec2::new(3, -5)), 5);
        assert_eq!(chebyshev(IVec2::new(-2, 1), IVec2::new(-2, 1)), 0);
    }

    #[test]
    fn test_chunks_in_radius() {
        let coords: Vec<IVec2> = chunks_in_radius(IVec2::new(1, 1), 1).collect();
        assert_eq!(coords.len(), 9);
        assert_eq!(coords[0], IVec2::new(0, 0));
        assert_eq!(coords[8], IVec2::new(2, 2));
        assert_eq!(chunks_in_radius(IVec2::ZERO, 0).count(), 1);
        assert_eq!(chunks_in_radius(IVec2::ZERO, -4).count(), 1);
    }

    #[test]
    fn test_loaded_chunks_near() -> anyhow::Result<()> {
        let mut world = lab_world();
        assert_eq!(world.load_chunks_around(IVec2::ZERO, 1)?, 9);
        world.load_chunk(IVec2::new(5, 0))?;

        let near = world.loaded_chunks_near(Vec2::new(-3.0, 2.0), 1);
        assert_eq!(near.len(), 6);
        assert!(near.iter().all(|c| (-1..=0).contains(&c.x)));
        assert_eq!(world.loaded_chunks_near(Vec2::new(80.0, 0.0), 0), vec![IVec2::new(5, 0)]);
        Ok(())
    }

    #[test]
    fn test_entities_near() -> anyhow::Result<()> {
        let mut world = lab_world();
        let close = world.spawn_entity(Box::new(ResourceProp::new(
            Vec2::new(2.5, 2.5),
            PropKind::Branch,
        )))?;
        let across = world.spawn_entity(Box::new(ResourceProp::new(
            Vec2::new(17.5, 2.5),
            PropKind::RockPile,
        )))?;
        let far = world.spawn_entity(Box::new(ResourceProp::new(
            Vec2::new(60.5, 2.5),
            PropKind::Branch,
        )))?;
        let player = world.spawn_player(Player::new(Vec2::new(1.0, 1.5)));

        let found = world.entities_near(Vec2::new(1.0, 2.5), 1, 20.0);
        assert_eq!(found, vec![player, close, across]);
        assert!(!found.contains(&far));

        let found = world.entities_near(Vec2::new(1.0, 2.5), 1, 5.0);
        assert_eq!(found, vec![player, close]);
        Ok(())
    }

    #[test]
    fn test_is_solid_at() -> anyhow::Result<()> {
        let mut world = lab_world();
        assert!(world.is_solid_at(Vec2::new(4.5, 4.5)));

        world.load_chunk(IVec2::ZERO)?;
        assert!(!world.is_solid_at(Vec2::new(4.5, 4.5)));

        let wall = world
            .registries()
            .tile_id(Layer::Wall, &ResourceHandle::base("basalt_wall"))?;
        world.set_tile(Layer::Wall, 4, 4, wall);
        assert!(world.is_solid_at(Vec2::new(4.5, 4.5)));
        assert!(world.is_solid_at(Vec2::new(4.0, 4.99)));
        assert!(!world.is_solid_at(Vec2::new(5.0, 4.5)));
        Ok(())
    }
}
