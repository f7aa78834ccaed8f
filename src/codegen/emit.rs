// NUFLIX Speedcode - Cycle-exact raster code generation for the Commodore 64
//
// Copyright (C) 2026 Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Emit helper methods for code generation.
//!
//! This module provides low-level byte emission utilities for generating
//! 6510 machine code, and the table of zero page cells that back the slow
//! (one cycle longer) load encoding.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::update::register_values;

/// Extension trait for low-level code emission.
///
/// Implemented for any byte buffer the speedcode is assembled into.
pub trait EmitHelpers {
    /// Emit a single byte to the code buffer.
    fn emit_byte(&mut self, byte: u8);

    /// Emit a 16-bit word in little-endian format.
    fn emit_word(&mut self, word: u16);

    /// Emit an instruction with immediate operand.
    fn emit_imm(&mut self, opcode: u8, value: u8);

    /// Emit an instruction with zero page operand.
    fn emit_zp(&mut self, opcode: u8, address: u8);

    /// Emit an instruction with absolute operand.
    fn emit_abs(&mut self, opcode: u8, address: u16);
}

impl EmitHelpers for Vec<u8> {
    fn emit_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn emit_word(&mut self, word: u16) {
        self.emit_byte((word & 0xFF) as u8);
        self.emit_byte((word >> 8) as u8);
    }

    fn emit_imm(&mut self, opcode: u8, value: u8) {
        self.emit_byte(opcode);
        self.emit_byte(value);
    }

    fn emit_zp(&mut self, opcode: u8, address: u8) {
        self.emit_byte(opcode);
        self.emit_byte(address);
    }

    fn emit_abs(&mut self, opcode: u8, address: u16) {
        self.emit_byte(opcode);
        self.emit_word(address);
    }
}

/// First zero page cell of the player's constant table.
const SLOW_TABLE_START: u8 = 0xD1;

/// Maps a value to the zero page cell holding it.
///
/// A load that has to take three cycles instead of two reads its value from
/// zero page instead of using an immediate. The player template provides a
/// small table of constants for this purpose; this type is its lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SlowValues {
    cells: BTreeMap<u8, u8>,
}

impl SlowValues {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// Build a lookup from the contents of the player's constant table,
    /// where entry `i` lives at zero page `$D1 + i`.
    ///
    /// When a value occurs more than once the last cell wins.
    pub fn from_table(values: &[u8]) -> Self {
        let mut lookup = Self::new();
        for (i, &value) in values.iter().enumerate() {
            lookup.insert(value, SLOW_TABLE_START.wrapping_add(i as u8));
        }
        lookup
    }

    /// Register `value` as living at zero page `address`.
    pub fn insert(&mut self, value: u8, address: u8) {
        self.cells.insert(value, address);
    }

    /// Zero page address holding `value`, if any.
    pub fn get(&self, value: u8) -> Option<u8> {
        self.cells.get(&value).copied()
    }

    /// Number of values in the lookup.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Default for SlowValues {
    /// The standard constant table: every value an update can load, laid
    /// out in the order of [`register_values`].
    fn default() -> Self {
        Self::from_table(&register_values())
    }
}
