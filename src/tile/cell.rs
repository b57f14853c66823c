//! Packed tile cell - logical tile ID and visual state in one `i32`
//!
//! Layout: bits 0-21 logical ID, bits 22-29 visual state (an `i8` frame index),
//! bit 30 reserved. Negative values are sentinels and carry no state.

/// No tile in this cell
pub const EMPTY: i32 = -1;

/// Cell lies outside any loaded area
pub const NULL: i32 = -2;

const ID_MASK: i32 = 0x003F_FFFF;
const STATE_SHIFT: u32 = 22;
const STATE_MASK: i32 = 0xFF;

/// Mask that strips visual state while keeping the sign of sentinels
pub const ABSOLUTE_MASK: u32 = 0x803F_FFFF;

/// Largest logical ID that fits in the packed layout
pub const MAX_TILE_ID: i32 = ID_MASK;

/// Unpacked view of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Logical tile ID, or [`EMPTY`] / [`NULL`]
    pub id: i32,
    /// Autotile frame; negative means horizontally mirrored
    pub state: i8,
}

impl Cell {
    pub const EMPTY: Cell = Cell { id: EMPTY, state: 0 };
    pub const NULL: Cell = Cell { id: NULL, state: 0 };

    pub fn new(id: i32, state: i8) -> Self {
        debug_assert!(id <= MAX_TILE_ID, "tile id {id} exceeds packed range");
        if id < 0 {
            Self { id, state: 0 }
        } else {
            Self { id, state }
        }
    }

    pub fn is_tile(self) -> bool {
        self.id >= 0
    }

    pub fn pack(self) -> i32 {
        if self.id < 0 {
            return self.id;
        }
        (self.id & ID_MASK) | ((i32::from(self.state as u8) & STATE_MASK) << STATE_SHIFT)
    }

    pub fn unpack(raw: i32) -> Self {
        if raw < 0 {
            let id = if raw == NULL { NULL } else { EMPTY };
            return Self { id, state: 0 };
        }
        Self {
            id: raw & ID_MASK,
            state: ((raw >> STATE_SHIFT) & STATE_MASK) as u8 as i8,
        }
    }
}

/// Strip the visual state from a raw cell value (sentinels stay negative)
#[inline]
pub fn absolute(raw: i32) -> i32 {
    (raw as u32 & ABSOLUTE_MASK) as i32
}

/// True when the raw value does not hold a tile (EMPTY, NULL, or any masked sentinel)
#[inline]
pub fn is_absent(raw: i32) -> bool {
    absolute(raw) <= EMPTY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bits_do_not_touch_id() {
        let cell = Cell::new(1234, 37);
        let raw = cell.pack();
        assert_eq!(raw & ID_MASK, 1234);
        assert_eq!(Cell::unpack(raw), cell);
    }

    #[test]
    fn test_negative_state_survives_packing() {
        let cell = Cell::new(7, -11);
        let raw = cell.pack();
        assert!(raw >= 0, "mirrored frames must not set the sign bit");
        assert_eq!(Cell::unpack(raw).state, -11);
        assert_eq!(absolute(raw), 7);
    }

    #[test]
    fn test_absolute_ignores_state() {
        let a = Cell::new(42, 3).pack();
        let b = Cell::new(42, -5).pack();
        assert_ne!(a, b);
        assert_eq!(absolute(a), absolute(b));
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(Cell::EMPTY.pack(), EMPTY);
        assert_eq!(Cell::NULL.pack(), NULL);
        assert_eq!(Cell::unpack(NULL), Cell::NULL);
        assert_eq!(Cell::new(EMPTY, 9).state, 0);

        assert!(is_absent(EMPTY));
        assert!(is_absent(NULL));
        assert!(!is_absent(0));
        assert!(absolute(EMPTY) <= EMPTY);
    }
}
