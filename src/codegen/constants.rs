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

//! Screen geometry, raster timing and memory layout constants.

/// Visible bitmap height in pixels (one screen row per raster line).
pub const SCREEN_HEIGHT: usize = 200;

/// Number of attribute rows. Each covers two screen rows and gets one
/// speedcode row.
pub const ATTRIBUTE_HEIGHT: usize = SCREEN_HEIGHT >> 1;

/// Width of a sprite in pixels.
pub const SPRITE_WIDTH: usize = 24;

/// Number of colour slots in the bug (left border) section.
pub const BUG_COLOR_SLOTS: usize = 4;

/// Width of one underlay column in character cells.
pub const UNDERLAY_BLOCK_WIDTH: usize = SPRITE_WIDTH >> 2;

/// Number of underlay sprite columns.
pub const UNDERLAY_COLUMNS: usize = 6;

/// First cycle of a row at which a register write may land.
pub const EARLIEST_CYCLE: i32 = 0x0a;

/// Cycle ceiling every row is padded up to.
pub const LATEST_CYCLE: i32 = 0x37;

/// Cycle at which the FLI trigger write has to land on non-stride rows.
pub const FLI_TRIGGER_CYCLE: i32 = 0x3a;

/// Cycle at which the underlay sprites start being displayed.
pub const UNDERLAY_START_CYCLE: i32 = 0x14;

/// Screen row from which sprite Y moves may be issued.
pub const EARLIEST_SPRITE_UPDATE_SCREEN_Y: u16 = 0x7b;

/// Screen row by which all sprite Y moves must have happened.
pub const LATEST_SPRITE_UPDATE_SCREEN_Y: u16 = 0xa3;

/// Number of sprites whose Y position is moved during the frame.
pub const SPRITE_COUNT: usize = 8;

/// Cap on deferred updates pulled into a single row per attempt.
pub const MAX_EXTRA_UPDATES: usize = 6;

/// Address the speedcode is loaded to.
pub const CODE_BASE_ADDRESS: u16 = 0x1000;

/// Space reserved for the speedcode in the player template.
pub const CODE_SIZE_LIMIT: usize = 0x1100;

/// Accumulator value in effect when the first row starts.
pub const INITIAL_ACCUMULATOR: u8 = 0x38;

/// Bit marking "deferred work was dropped" in encoded free cycle counts.
pub const DROPPED_DEFERRED_FLAG: i32 = 0x100;
