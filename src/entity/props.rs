//! World props: dropped items, harvestable resources, trees

use std::any::Any;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId};
use crate::item::ItemStack;
use crate::registry::ResourceHandle;

/// Item stack lying on the ground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub id: EntityId,
    pub position: Vec2,
    pub stack: ItemStack,
    /// Whole seconds since the drop appeared
    #[serde(default)]
    pub age: u32,
}

impl ItemDrop {
    pub fn new(position: Vec2, stack: ItemStack) -> Self {
        Self {
            id: EntityId::new(),
            position,
            stack,
            age: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropKind {
    Branch,
    RockPile,
}

/// Small harvestable resource scattered by terrain generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProp {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: PropKind,
}

impl ResourceProp {
    pub fn new(position: Vec2, kind: PropKind) -> Self {
        Self {
            id: EntityId::new(),
            position,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub id: EntityId,
    pub position: Vec2,
    /// 0..=1, fully grown trees drop more wood
    #[serde(default = "Tree::grown")]
    pub growth: f32,
}

impl Tree {
    pub fn new(position: Vec2) -> Self {
        Self {
            id: EntityId::new(),
            position,
            growth: Self::grown(),
        }
    }

    fn grown() -> f32 {
        1.0
    }
}

macro_rules! impl_entity {
    ($ty:ty, $name:literal) => {
        impl Entity for $ty {
            fn id(&self) -> EntityId {
                self.id
            }

            fn type_handle(&self) -> ResourceHandle {
                ResourceHandle::base($name)
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

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

impl_entity!(ItemDrop, "item_drop");
impl_entity!(ResourceProp, "resource_prop");
impl_entity!(Tree, "tree");
