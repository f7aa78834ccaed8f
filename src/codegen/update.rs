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

//! Register update requests and their timing windows.
//!
//! A [`RegisterUpdate`] asks for a value to be written to a VIC-II or CIA
//! register so that it takes effect on a given screen row. The window of
//! cycles within a speedcode row during which the write may land is not
//! stored; it follows from the register kind and the parity and position
//! of the target row.

use std::cmp::{max, min};
use std::fmt;

use super::constants::{
    EARLIEST_CYCLE, EARLIEST_SPRITE_UPDATE_SCREEN_Y, FLI_TRIGGER_CYCLE,
    LATEST_CYCLE, LATEST_SPRITE_UPDATE_SCREEN_Y, SCREEN_HEIGHT, UNDERLAY_BLOCK_WIDTH,
    UNDERLAY_START_CYCLE,
};
use super::instruction::RegisterValue;
use super::mos6510::vic;

/// Bug colour slots in hires, multi 1, multi 2, multi 3 order.
const BUG_REGISTERS: [u16; 4] = [
    vic::SPRITE0_COLOR,
    vic::SPRITE_MULTICOLOR_0,
    vic::SPRITE7_COLOR,
    vic::SPRITE_MULTICOLOR_1,
];

/// Screen pointer written at the start of every attribute row, indexed by
/// attribute row. Entry 63 switches the VIC bank instead.
const SCREEN_ADDRESS_VALUES: [Option<u8>; 100] = {
    let upper: [u8; 8] = [0x68, 0x58, 0x48, 0x38, 0x28, 0x18, 0x08, 0x78];
    let lower: [u8; 36] = [
        0x98, 0xa8, 0xb8, 0x88, 0x98, 0xa8, 0xb8, 0x88, 0x98, 0xa8, 0xb8, 0x88, 0x98, 0xa8,
        0xb8, 0x88, 0x98, 0xa8, 0xb8, 0x98, 0xa8, 0xb8, 0x88, 0x98, 0xa8, 0xb8, 0x88, 0x98,
        0xa8, 0xb8, 0x88, 0x98, 0xa8, 0xb8, 0x88, 0x18,
    ];
    let mut table = [None; 100];
    let mut i = 0;
    while i < 63 {
        table[i] = Some(upper[i % 8]);
        i += 1;
    }
    let mut j = 0;
    while j < 36 {
        table[64 + j] = Some(lower[j]);
        j += 1;
    }
    table
};

/// Sprite Y position the sprites are moved to below the split.
pub const SPRITE_Y_SPLIT_VALUE: u8 = 0xd4;

/// Every byte an update can ask a register to hold, each once, in the order
/// it first shows up: colours, FLI triggers, screen pointers, sprite Y.
pub fn register_values() -> Vec<u8> {
    let colors = 0x00..=0x0Fu8;
    let triggers = (0x38..=0x3Fu8).chain([0x10]);
    let screens = SCREEN_ADDRESS_VALUES.iter().flatten().copied();
    let mut values = Vec::new();
    for value in colors
        .chain(triggers)
        .chain(screens)
        .chain([SPRITE_Y_SPLIT_VALUE])
    {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Kind of register an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    UnderlayColor,
    BugColor,
    BorderColor,
    BackgroundColor,
    ScreenAddress,
    FliTrigger,
    SpriteY,
}

impl RegisterKind {
    /// Whether only the low nibble of the written value matters.
    pub fn nibble_only(self) -> bool {
        matches!(
            self,
            RegisterKind::UnderlayColor
                | RegisterKind::BugColor
                | RegisterKind::BorderColor
                | RegisterKind::BackgroundColor
        )
    }
}

/// Stable identity of an update.
///
/// Two pending updates may agree in every field; the identifier is what
/// tells them apart when one of them has to be removed from a list.
/// Deferred updates keep their identifier when they are cloned into a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UpdateId(pub u32);

/// A request to write a register by a given screen row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUpdate {
    pub id: UpdateId,
    pub kind: RegisterKind,
    /// Index within the kind: colour slot, underlay column or sprite number.
    pub slot: u8,
    pub value: RegisterValue,
    /// Screen row on which the new value takes effect. `None` for deferred
    /// updates that are already overdue, which may land anywhere in a row.
    pub screen_y: Option<u16>,
    /// Screen row until which the update may be postponed.
    pub last_screen_y: Option<u16>,
}

impl RegisterUpdate {
    fn new(kind: RegisterKind, slot: u8, value: RegisterValue, screen_y: u16, last_screen_y: u16) -> Self {
        Self {
            id: UpdateId::default(),
            kind,
            slot,
            value,
            screen_y: Some(screen_y),
            last_screen_y: Some(last_screen_y),
        }
    }

    /// Underlay colour of `column`, taking effect on `screen_y`.
    pub fn underlay_color(column: u8, color: u8, screen_y: u16, last_screen_y: Option<u16>) -> Self {
        Self::new(
            RegisterKind::UnderlayColor,
            column,
            color.into(),
            screen_y,
            last_screen_y.unwrap_or(screen_y),
        )
    }

    /// Bug colour of `slot`, taking effect on `screen_y`.
    pub fn bug_color(slot: u8, color: u8, screen_y: u16, last_screen_y: Option<u16>) -> Self {
        Self::new(
            RegisterKind::BugColor,
            slot,
            color.into(),
            screen_y,
            last_screen_y.unwrap_or(screen_y),
        )
    }

    pub fn border_color(color: u8, screen_y: u16) -> Self {
        Self::new(RegisterKind::BorderColor, 0, color.into(), screen_y, screen_y)
    }

    /// Background colour below the split; may land anywhere in the frame.
    pub fn background_color(color: u8) -> Self {
        Self::new(
            RegisterKind::BackgroundColor,
            0,
            color.into(),
            0,
            (SCREEN_HEIGHT - 1) as u16,
        )
    }

    /// Screen pointer (or bank switch) for the attribute row starting at
    /// `screen_y`.
    pub fn screen_address(screen_y: u16) -> Self {
        let index = usize::from(screen_y >> 1) - 1;
        let value = match SCREEN_ADDRESS_VALUES[index] {
            Some(byte) => RegisterValue::Byte(byte),
            None => RegisterValue::BankSwitch,
        };
        Self::new(RegisterKind::ScreenAddress, 0, value, screen_y, screen_y)
    }

    /// FLI trigger forcing the bad line for `screen_y`.
    pub fn fli_trigger(screen_y: u16) -> Self {
        let value = if usize::from(screen_y) < SCREEN_HEIGHT {
            0x38 | (screen_y & 7) as u8
        } else {
            0x10
        };
        Self::new(RegisterKind::FliTrigger, 0, value.into(), screen_y, screen_y)
    }

    /// Move sprite `slot` below the split.
    pub fn sprite_y(slot: u8) -> Self {
        Self::new(
            RegisterKind::SpriteY,
            slot,
            SPRITE_Y_SPLIT_VALUE.into(),
            EARLIEST_SPRITE_UPDATE_SCREEN_Y,
            LATEST_SPRITE_UPDATE_SCREEN_Y - (u16::from(slot ^ 7) << 1),
        )
    }

    /// Same update with a different identifier.
    pub fn with_id(mut self, id: UpdateId) -> Self {
        self.id = id;
        self
    }

    /// Copy of a deferred update as seen from the row starting at
    /// `screen_y`. Updates that are already overdue lose their target row
    /// and may land anywhere.
    pub fn clone_deferred(&self, screen_y: u16) -> Self {
        let target = self.screen_y.filter(|&y| y >= screen_y);
        Self {
            screen_y: target,
            last_screen_y: target,
            ..self.clone()
        }
    }

    /// Register address written by this update.
    pub fn address(&self) -> u16 {
        match self.kind {
            RegisterKind::UnderlayColor => vic::UNDERLAY0_COLOR + u16::from(self.slot),
            RegisterKind::BugColor => BUG_REGISTERS[usize::from(self.slot)],
            RegisterKind::BorderColor => vic::BORDER_COLOR,
            RegisterKind::BackgroundColor => vic::BACKGROUND_COLOR,
            RegisterKind::ScreenAddress => match self.value {
                RegisterValue::BankSwitch => vic::CIA2_BANK,
                RegisterValue::Byte(_) => vic::MEMORY_POINTERS,
            },
            RegisterKind::FliTrigger => vic::CONTROL_1,
            RegisterKind::SpriteY => vic::SPRITE0_Y + (u16::from(self.slot) << 1),
        }
    }

    /// First cycle at which the write may land.
    pub fn first_cycle(&self) -> i32 {
        let slot = i32::from(self.slot);
        let width = UNDERLAY_BLOCK_WIDTH as i32;
        match (self.kind, self.screen_y) {
            (RegisterKind::UnderlayColor, None) => EARLIEST_CYCLE,
            (RegisterKind::UnderlayColor, Some(y)) if y & 1 == 0 => {
                min(UNDERLAY_START_CYCLE + (slot + 1) * width, LATEST_CYCLE)
            }
            (RegisterKind::UnderlayColor, Some(_)) => EARLIEST_CYCLE,
            (RegisterKind::BugColor, None) => EARLIEST_CYCLE,
            (RegisterKind::BugColor, Some(_)) => UNDERLAY_START_CYCLE,
            (RegisterKind::BorderColor, _) => EARLIEST_CYCLE + 4,
            (RegisterKind::FliTrigger, Some(y)) if y & 6 == 0 => {
                if usize::from(y) < SCREEN_HEIGHT {
                    EARLIEST_CYCLE
                } else {
                    LATEST_CYCLE + 1
                }
            }
            (RegisterKind::FliTrigger, _) => FLI_TRIGGER_CYCLE,
            _ => EARLIEST_CYCLE,
        }
    }

    /// Last cycle at which the write may land.
    pub fn last_cycle(&self) -> i32 {
        let slot = i32::from(self.slot);
        let width = UNDERLAY_BLOCK_WIDTH as i32;
        match (self.kind, self.screen_y) {
            (RegisterKind::UnderlayColor, Some(y)) if y & 1 == 1 => {
                UNDERLAY_START_CYCLE - 1 + slot * width
            }
            (RegisterKind::FliTrigger, _) => max(self.first_cycle(), LATEST_CYCLE),
            _ => LATEST_CYCLE,
        }
    }

    /// Whether only the low nibble of the value matters.
    pub fn nibble_only(&self) -> bool {
        self.kind.nibble_only()
    }

    /// Whether the window closes before the row's ceiling, so the write
    /// should go out as soon as possible.
    pub fn is_early(&self) -> bool {
        self.last_cycle() < LATEST_CYCLE
    }

    /// Whether the window opens too far after `cycle` for the update to be
    /// reordered freely.
    pub fn is_late(&self, cycle: i32) -> bool {
        self.first_cycle() > cycle + 3
    }

    /// Whether a register holding `value` satisfies this update.
    pub fn accepts(&self, value: RegisterValue) -> bool {
        if self.value == value {
            return true;
        }
        self.nibble_only() && value.is_byte() && self.value.nibble() == value.nibble()
    }

    /// Whether this is the screen row at which sprite moves become due.
    pub fn is_due_sprite_move(&self, screen_y: u16) -> bool {
        self.kind == RegisterKind::SpriteY && self.last_screen_y == Some(screen_y)
    }
}

impl fmt::Display for RegisterUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |y: Option<u16>| y.map_or_else(|| "-1".to_string(), |y| y.to_string());
        write!(
            f,
            "{:04x}:{}/{:02x}-{:02x}/{}-{}",
            self.address(),
            self.value,
            self.first_cycle(),
            self.last_cycle(),
            row(self.screen_y),
            row(self.last_screen_y)
        )
    }
}

/// Sort updates by window: opening cycle first, closing cycle second.
///
/// The sort is stable, so updates with identical windows keep their order.
pub fn sort_updates_by_time(updates: &mut [RegisterUpdate]) {
    updates.sort_by_key(|update| (update.first_cycle(), update.last_cycle()));
}
