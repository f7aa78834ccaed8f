// NUFLIX Speedcode - Cycle-exact raster code generation for the Commodore 64
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Sprite colour tables.
//!
//! The bug section has four colour slots per attribute row, the underlay
//! six columns per screen row. The orchestrator owns one working copy of
//! both tables: rows it has already scheduled hold what the hardware will
//! actually show, rows below still hold the target picture.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{ATTRIBUTE_HEIGHT, BUG_COLOR_SLOTS, SCREEN_HEIGHT, UNDERLAY_COLUMNS};

/// State of one colour slot.
///
/// An unused slot is not visible on its row, so any colour will do there;
/// it still records the colour it is expected to carry so that writes can
/// be moved around it freely.
///
/// Serialized as a byte: the colour in the low nibble, bit 4 set for unused
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColorSlot {
    /// The slot is visible and must show this colour.
    Set(u8),
    /// The slot is not visible; it carries this colour.
    Unused(u8),
}

impl ColorSlot {
    /// The colour carried by the slot.
    pub fn color(self) -> u8 {
        match self {
            ColorSlot::Set(color) | ColorSlot::Unused(color) => color & 0x0F,
        }
    }

    /// Whether the slot is visible.
    pub fn is_set(self) -> bool {
        matches!(self, ColorSlot::Set(_))
    }

    /// The same colour, marked visible.
    pub fn shown(self) -> Self {
        ColorSlot::Set(self.color())
    }
}

impl Default for ColorSlot {
    fn default() -> Self {
        ColorSlot::Set(0)
    }
}

impl TryFrom<u8> for ColorSlot {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x00..=0x0F => Ok(ColorSlot::Set(value)),
            0x10..=0x1F => Ok(ColorSlot::Unused(value & 0x0F)),
            _ => Err(format!("colour slot value ${:02x} out of range", value)),
        }
    }
}

impl From<ColorSlot> for u8 {
    fn from(slot: ColorSlot) -> u8 {
        match slot {
            ColorSlot::Set(color) => color & 0x0F,
            ColorSlot::Unused(color) => 0x10 | (color & 0x0F),
        }
    }
}

impl fmt::Display for ColorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSlot::Set(color) => write!(f, "{:x}", color & 0x0F),
            ColorSlot::Unused(_) => write!(f, " "),
        }
    }
}

/// Bug colours per attribute row.
pub type BugRow = [ColorSlot; BUG_COLOR_SLOTS];

/// Underlay colours per screen row.
pub type UnderlayRow = [ColorSlot; UNDERLAY_COLUMNS];

/// Bug and underlay colour tables for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTables {
    bug: Vec<BugRow>,
    underlay: Vec<UnderlayRow>,
}

impl ColorTables {
    /// Create tables from full-height bug and underlay rows.
    ///
    /// Returns `None` if the row counts do not match the screen geometry.
    pub fn new(bug: Vec<BugRow>, underlay: Vec<UnderlayRow>) -> Option<Self> {
        if bug.len() != ATTRIBUTE_HEIGHT || underlay.len() != SCREEN_HEIGHT {
            return None;
        }
        Some(Self { bug, underlay })
    }

    /// Bug colour of `slot` on attribute row `row`.
    pub fn bug(&self, row: usize, slot: usize) -> ColorSlot {
        self.bug[row][slot]
    }

    /// All bug colours of attribute row `row`.
    pub fn bug_row(&self, row: usize) -> BugRow {
        self.bug[row]
    }

    pub fn set_bug(&mut self, row: usize, slot: usize, color: ColorSlot) {
        self.bug[row][slot] = color;
    }

    /// Underlay colour of `column` on screen row `screen_y`.
    pub fn underlay(&self, screen_y: usize, column: usize) -> ColorSlot {
        self.underlay[screen_y][column]
    }

    /// All underlay colours of screen row `screen_y`.
    pub fn underlay_row(&self, screen_y: usize) -> UnderlayRow {
        self.underlay[screen_y]
    }

    pub fn set_underlay(&mut self, screen_y: usize, column: usize, color: ColorSlot) {
        self.underlay[screen_y][column] = color;
    }

    /// Mark every bug slot of `row` visible, keeping its colour.
    pub fn show_bug_row(&mut self, row: usize) {
        for slot in self.bug[row].iter_mut() {
            *slot = slot.shown();
        }
    }

    /// Replace bug row `row + 1` with the state of row `row`.
    pub fn carry_bug_row(&mut self, row: usize) {
        self.bug[row + 1] = self.bug[row];
    }

    /// Replace underlay row `screen_y + 1` with the colours shown on row
    /// `screen_y`.
    pub fn carry_underlay_row(&mut self, screen_y: usize) {
        let shown = self.underlay[screen_y].map(ColorSlot::shown);
        self.underlay[screen_y + 1] = shown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> ColorTables {
        ColorTables::new(
            vec![[ColorSlot::Set(0); BUG_COLOR_SLOTS]; ATTRIBUTE_HEIGHT],
            vec![[ColorSlot::Set(0); UNDERLAY_COLUMNS]; SCREEN_HEIGHT],
        )
        .unwrap()
    }

    #[test]
    fn test_slot_byte_encoding() {
        assert_eq!(ColorSlot::try_from(0x07), Ok(ColorSlot::Set(7)));
        assert_eq!(ColorSlot::try_from(0x17), Ok(ColorSlot::Unused(7)));
        assert!(ColorSlot::try_from(0x20).is_err());
        assert_eq!(u8::from(ColorSlot::Unused(0x0C)), 0x1C);
    }

    #[test]
    fn test_unused_slot_keeps_color() {
        let slot = ColorSlot::Unused(9);
        assert_eq!(slot.color(), 9);
        assert!(!slot.is_set());
        assert_eq!(slot.shown(), ColorSlot::Set(9));
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        assert!(ColorTables::new(vec![], vec![]).is_none());
    }

    #[test]
    fn test_carry_underlay_row_shows_colors() {
        let mut tables = blank();
        tables.set_underlay(10, 2, ColorSlot::Unused(5));
        tables.carry_underlay_row(10);
        assert_eq!(tables.underlay(11, 2), ColorSlot::Set(5));
    }

    #[test]
    fn test_carry_bug_row_copies_state() {
        let mut tables = blank();
        tables.set_bug(3, 1, ColorSlot::Set(0x0E));
        tables.carry_bug_row(3);
        assert_eq!(tables.bug(4, 1), ColorSlot::Set(0x0E));
    }
}
