use std::any::Any;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::inventory::{Inventory, DEFAULT_MAX_STACK};
use super::{Entity, EntityId};
use crate::registry::ResourceHandle;

/// The player entity. Stored in the world metadata rather than in chunk files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: EntityId,
    pub position: Vec2,
    pub inventory: Inventory,
    pub selected_slot: usize,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        let mut player = Player {
            id: EntityId::new(),
            position,
            inventory: Inventory::default(),
            selected_slot: 0,
        };

        // Starting kit
        player
            .inventory
            .add_item(&ResourceHandle::base("wood_plank"), 20, DEFAULT_MAX_STACK);
        player
            .inventory
            .add_item(&ResourceHandle::base("torch"), 4, DEFAULT_MAX_STACK);

        player
    }
}

impl Entity for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn type_handle(&self) -> ResourceHandle {
        ResourceHandle::base("player")
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn persists_in_chunk(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_not_saved_in_chunks() {
        let player = Player::new(Vec2::ZERO);
        assert!(!player.persists_in_chunk());
        assert_eq!(player.inventory.count_item(&ResourceHandle::base("torch")), 4);
    }
}
