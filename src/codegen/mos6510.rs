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

//! MOS 6510 opcodes and C64 I/O registers used by the speedcode.
//!
//! The speedcode only ever loads immediates (or zero page values when a load
//! has to take one cycle longer), stores absolute, and burns cycles.

/// Opcodes for the 6510 CPU.
///
/// Naming convention: INSTR_MODE where MODE is:
/// - IMM: Immediate (#$xx)
/// - ZP: Zero Page ($xx)
/// - ABS: Absolute ($xxxx)
/// - ABX: Absolute,X ($xxxx,X)
pub mod opcodes {
    pub const LDA_IMM: u8 = 0xA9;
    pub const LDA_ZP: u8 = 0xA5;

    pub const LDX_IMM: u8 = 0xA2;
    pub const LDX_ZP: u8 = 0xA6;

    pub const LDY_IMM: u8 = 0xA0;
    pub const LDY_ZP: u8 = 0xA4;

    pub const STA_ABS: u8 = 0x8D;
    pub const STA_ABX: u8 = 0x9D;
    pub const STX_ABS: u8 = 0x8E;
    pub const STY_ABS: u8 = 0x8C;

    /// BIT $xx, used as a 3 cycle no-op.
    pub const BIT_ZP: u8 = 0x24;

    pub const NOP: u8 = 0xEA;
    pub const RTS: u8 = 0x60;
}

/// VIC-II and CIA registers written by the speedcode.
pub mod vic {
    /// Sprite 0 Y position; sprite n is at `SPRITE0_Y + 2n`.
    pub const SPRITE0_Y: u16 = 0xD001;

    /// First register above the sprite position block.
    pub const SPRITE_POSITION_END: u16 = 0xD010;

    /// Control register 1; writing it triggers the FLI bad line.
    pub const CONTROL_1: u16 = 0xD011;

    /// Screen and character memory pointers.
    pub const MEMORY_POINTERS: u16 = 0xD018;

    pub const BORDER_COLOR: u16 = 0xD020;
    pub const BACKGROUND_COLOR: u16 = 0xD021;

    pub const SPRITE_MULTICOLOR_0: u16 = 0xD025;
    pub const SPRITE_MULTICOLOR_1: u16 = 0xD026;

    /// Sprite 0 colour; sprite n is at `SPRITE0_COLOR + n`.
    pub const SPRITE0_COLOR: u16 = 0xD027;

    /// Colour of the first underlay sprite (sprite 1).
    pub const UNDERLAY0_COLOR: u16 = 0xD028;

    /// Colour of the last underlay sprite (sprite 6), written right before
    /// the FLI trigger at the end of a row.
    pub const LAST_UNDERLAY_COLOR: u16 = 0xD02D;

    pub const SPRITE7_COLOR: u16 = 0xD02E;

    /// CIA 2 port A, selecting the VIC bank.
    pub const CIA2_BANK: u16 = 0xDD00;
}
