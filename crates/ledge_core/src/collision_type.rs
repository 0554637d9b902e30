//! Collision classification bit set.
//!
//! A `CollisionType` records which kinds of surface an entity touched while
//! its movement was resolved. Several facts can hold at once (standing on a
//! floor while pressed against a wall), so this is a set, not an enum.
//!
//! Ledge flags include their base surface bit: `FLOOR_START_LEDGE` contains
//! `FLOOR`, so `has_floor()` is true for any floor ledge contact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

const FLOOR_BIT: u8 = 1 << 0;
const CEILING_BIT: u8 = 1 << 1;
const LEFT_WALL_BIT: u8 = 1 << 2;
const RIGHT_WALL_BIT: u8 = 1 << 3;
const FLOOR_START_LEDGE_BIT: u8 = 1 << 4;
const FLOOR_END_LEDGE_BIT: u8 = 1 << 5;
const CEILING_START_LEDGE_BIT: u8 = 1 << 6;
const CEILING_END_LEDGE_BIT: u8 = 1 << 7;

const LEDGE_BITS: u8 =
    FLOOR_START_LEDGE_BIT | FLOOR_END_LEDGE_BIT | CEILING_START_LEDGE_BIT | CEILING_END_LEDGE_BIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionType(u8);

impl CollisionType {
    pub const NONE: Self = Self(0);
    pub const FLOOR: Self = Self(FLOOR_BIT);
    pub const CEILING: Self = Self(CEILING_BIT);
    /// Wall whose normal points to -x. Hit while moving right.
    pub const LEFT_WALL: Self = Self(LEFT_WALL_BIT);
    /// Wall whose normal points to +x. Hit while moving left.
    pub const RIGHT_WALL: Self = Self(RIGHT_WALL_BIT);
    pub const FLOOR_START_LEDGE: Self = Self(FLOOR_START_LEDGE_BIT | FLOOR_BIT);
    pub const FLOOR_END_LEDGE: Self = Self(FLOOR_END_LEDGE_BIT | FLOOR_BIT);
    pub const CEILING_START_LEDGE: Self = Self(CEILING_START_LEDGE_BIT | CEILING_BIT);
    pub const CEILING_END_LEDGE: Self = Self(CEILING_END_LEDGE_BIT | CEILING_BIT);

    /// Every named flag, in display order.
    const NAMED: &'static [(CollisionType, &'static str)] = &[
        (Self::FLOOR_START_LEDGE, "FLOOR_START_LEDGE"),
        (Self::FLOOR_END_LEDGE, "FLOOR_END_LEDGE"),
        (Self::CEILING_START_LEDGE, "CEILING_START_LEDGE"),
        (Self::CEILING_END_LEDGE, "CEILING_END_LEDGE"),
        (Self::FLOOR, "FLOOR"),
        (Self::CEILING, "CEILING"),
        (Self::LEFT_WALL, "LEFT_WALL"),
        (Self::RIGHT_WALL, "RIGHT_WALL"),
    ];

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    /// Clears exactly the bits of `flag`. Unsetting a ledge flag also clears
    /// its base surface bit; use `unset_ledge` to drop only ledge bits.
    #[inline]
    pub fn unset_flag(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    #[inline]
    pub fn add_type(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove_type(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn xor_type(&mut self, other: Self) {
        self.0 ^= other.0;
    }

    /// Drops all ledge bits, keeping floor/ceiling/wall bits.
    #[inline]
    pub fn unset_ledge(&mut self) {
        self.0 &= !LEDGE_BITS;
    }

    #[inline]
    pub const fn has_floor(self) -> bool {
        self.0 & FLOOR_BIT != 0
    }

    #[inline]
    pub const fn has_ceiling(self) -> bool {
        self.0 & CEILING_BIT != 0
    }

    #[inline]
    pub const fn has_left_wall(self) -> bool {
        self.0 & LEFT_WALL_BIT != 0
    }

    #[inline]
    pub const fn has_right_wall(self) -> bool {
        self.0 & RIGHT_WALL_BIT != 0
    }

    #[inline]
    pub const fn has_wall(self) -> bool {
        self.0 & (LEFT_WALL_BIT | RIGHT_WALL_BIT) != 0
    }

    #[inline]
    pub const fn has_floor_start_ledge(self) -> bool {
        self.contains(Self::FLOOR_START_LEDGE)
    }

    #[inline]
    pub const fn has_floor_end_ledge(self) -> bool {
        self.contains(Self::FLOOR_END_LEDGE)
    }

    #[inline]
    pub const fn has_ceiling_start_ledge(self) -> bool {
        self.contains(Self::CEILING_START_LEDGE)
    }

    #[inline]
    pub const fn has_ceiling_end_ledge(self) -> bool {
        self.contains(Self::CEILING_END_LEDGE)
    }

    #[inline]
    pub const fn has_ledge(self) -> bool {
        self.0 & LEDGE_BITS != 0
    }

    #[inline]
    pub const fn has_start_ledge(self) -> bool {
        self.0 & (FLOOR_START_LEDGE_BIT | CEILING_START_LEDGE_BIT) != 0
    }

    #[inline]
    pub const fn has_end_ledge(self) -> bool {
        self.0 & (FLOOR_END_LEDGE_BIT | CEILING_END_LEDGE_BIT) != 0
    }
}

impl BitOr for CollisionType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CollisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        // Ledge names already imply their surface, so the plain surface name
        // is only printed when no ledge of that surface was printed.
        let mut remaining = *self;
        let mut first = true;
        for &(flag, name) in Self::NAMED {
            if remaining.0 & flag.0 == 0 || !self.contains(flag) {
                continue;
            }
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
            remaining.0 &= !flag.0;
        }
        Ok(())
    }
}
