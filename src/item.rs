//! Item definitions and stacks

use serde::{Deserialize, Serialize};

use crate::registry::{Registrable, ResourceHandle};
use crate::tile::Layer;

/// What an item does when used from the hotbar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Crafting material or tool with no placement
    Plain,
    /// Places a tile on the given layer
    Tile { layer: Layer, tile: ResourceHandle },
    /// Spawns an entity of the given type
    Entity { entity: ResourceHandle },
}

/// Registered item definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub handle: ResourceHandle,
    pub max_stack: u32,
    pub kind: ItemKind,
}

impl ItemDef {
    pub fn plain(handle: ResourceHandle) -> Self {
        Self {
            handle,
            max_stack: 99,
            kind: ItemKind::Plain,
        }
    }

    pub fn tile(handle: ResourceHandle, layer: Layer, tile: ResourceHandle) -> Self {
        Self {
            handle,
            max_stack: 99,
            kind: ItemKind::Tile { layer, tile },
        }
    }

    pub fn entity(handle: ResourceHandle, entity: ResourceHandle) -> Self {
        Self {
            handle,
            max_stack: 16,
            kind: ItemKind::Entity { entity },
        }
    }
}

impl Registrable for ItemDef {
    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

/// A stack of items. Stores the handle so stacks stay valid across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ResourceHandle,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ResourceHandle, count: u32) -> Self {
        Self { item, count }
    }

    /// Add items up to `max_stack`, returns the amount that didn't fit
    pub fn add(&mut self, amount: u32, max_stack: u32) -> u32 {
        let space = max_stack.saturating_sub(self.count);
        let to_add = amount.min(space);
        self.count += to_add;
        amount - to_add
    }

    /// Remove items, returns the amount actually removed
    pub fn remove(&mut self, amount: u32) -> u32 {
        let to_remove = amount.min(self.count);
        self.count -= to_remove;
        to_remove
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_add_overflow() {
        let mut stack = ItemStack::new(ResourceHandle::base("stone"), 95);
        assert_eq!(stack.add(10, 99), 6);
        assert_eq!(stack.count, 99);
    }

    #[test]
    fn test_stack_remove() {
        let mut stack = ItemStack::new(ResourceHandle::base("stone"), 3);
        assert_eq!(stack.remove(5), 3);
        assert!(stack.is_empty());
    }
}
