use serde::{Deserialize, Serialize};

use crate::item::ItemStack;
use crate::registry::ResourceHandle;

/// Default maximum stack size when no item definition is at hand
pub const DEFAULT_MAX_STACK: u32 = 99;

/// Player inventory system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub slots: Vec<Option<ItemStack>>,
    pub max_slots: usize,
}

impl Inventory {
    /// Create a new inventory with the specified number of slots
    pub fn new(max_slots: usize) -> Self {
        Inventory {
            slots: vec![None; max_slots],
            max_slots,
        }
    }

    /// Try to add items. Returns the amount that couldn't be added.
    pub fn add_item(&mut self, item: &ResourceHandle, mut amount: u32, max_stack: u32) -> u32 {
        // First, try to add to existing stacks of the same item
        for stack in self.slots.iter_mut().flatten() {
            if &stack.item == item && stack.count < max_stack {
                amount = stack.add(amount, max_stack);
                if amount == 0 {
                    return 0;
                }
            }
        }

        // Then, try to create new stacks in empty slots
        while amount > 0 {
            match self.find_empty_slot() {
                Some(index) => {
                    let to_add = amount.min(max_stack);
                    self.slots[index] = Some(ItemStack::new(item.clone(), to_add));
                    amount -= to_add;
                }
                None => break,
            }
        }

        amount
    }

    /// Try to remove items. Returns the amount actually removed.
    pub fn remove_item(&mut self, item: &ResourceHandle, mut amount: u32) -> u32 {
        let mut removed = 0;

        for slot in &mut self.slots {
            if let Some(stack) = slot {
                if &stack.item == item {
                    let taken = stack.remove(amount);
                    removed += taken;
                    amount -= taken;

                    if stack.is_empty() {
                        *slot = None;
                    }

                    if amount == 0 {
                        break;
                    }
                }
            }
        }

        removed
    }

    /// Count how many of an item are in the inventory
    pub fn count_item(&self, item: &ResourceHandle) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| &stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }

    pub fn used_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(36)
    }
}
