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

//! NTSC re-timing.
//!
//! NTSC machines spend more cycles per raster line than PAL ones, so the
//! PAL speedcode has to be slowed down at fixed points to stay in sync with
//! the beam. Rather than scheduling the frame a second time, the PAL bytes
//! are patched: delays are inserted between runs of untouched bytes, and
//! FLI trigger stores that must not move are turned into indexed stores,
//! which take one cycle longer while still hitting `$D011`.
//!
//! The patch list is derived once from the scheduled rows. It is either
//! applied here, producing NTSC bytes, or shipped as an [`NtscPatchTable`]
//! for the player to apply at runtime.

use std::collections::HashMap;

use super::constants::CODE_BASE_ADDRESS;
use super::emit::SlowValues;
use super::instruction::{Instruction, Operation, Register};
use super::mos6510::{opcodes, vic};
use super::snippet::RowSchedule;
use crate::error::{CodegenError, ErrorCode, Result};

/// One step of the NTSC patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtscAdjustment {
    /// Cycles inserted in front of the run; 0 marks a trigger rewrite.
    pub delay_cycles: u8,
    /// Bytes copied unchanged after the delay.
    pub run_length: usize,
    /// Value of X when the trigger store runs.
    pub fli_trigger_delta: u8,
}

impl NtscAdjustment {
    /// Copy `run_length` bytes, preceded by a delay of `delay_cycles`.
    pub fn run_with_delay(delay_cycles: u8, run_length: usize) -> Self {
        Self {
            delay_cycles,
            run_length,
            fli_trigger_delta: 0,
        }
    }

    /// Rewrite the trigger store as `STA $D011-delta,X`.
    pub fn adjust_fli_trigger(delta: u8) -> Self {
        Self {
            delay_cycles: 0,
            run_length: 0,
            fli_trigger_delta: delta,
        }
    }

    /// Bytes this step adds to the code.
    pub fn delta_length(&self) -> Result<usize> {
        match self.delay_cycles {
            0 => Ok(0),
            2 => Ok(1),
            3 | 4 => Ok(2),
            other => Err(unsupported_delay(other)),
        }
    }
}

fn unsupported_delay(delay: u8) -> CodegenError {
    CodegenError::new(
        ErrorCode::UnsupportedDelay,
        format!("Unsupported adjustment delay: {}", delay),
    )
}

/// Derive the patch list for the scheduled rows.
///
/// `initial_x` is the value of X when the speedcode starts.
pub fn derive_adjustments(rows: &[RowSchedule], initial_x: u8) -> Vec<NtscAdjustment> {
    let mut adjustments = vec![NtscAdjustment::run_with_delay(3, 0)];
    let mut last_x = initial_x;
    let mut ended_with_last_column = false;
    let mut pad_cycles: u8 = 0;

    for (y, row) in rows.iter().enumerate() {
        let code = &row.code;
        let length = row.byte_length();
        pad_cycles += if ended_with_last_column { 3 } else { 2 };
        ended_with_last_column =
            code.last().and_then(Instruction::store_address) == Some(vic::LAST_UNDERLAY_COLOR);

        if y & 3 < 3 || y == rows.len() - 1 {
            let trigger = code.last();
            let previous = code.len().checked_sub(2).map(|i| &code[i]);
            let run = length.saturating_sub(3);
            if trigger.is_some_and(|i| i.operation == Operation::Sta)
                && previous.and_then(Instruction::store_address) == Some(vic::LAST_UNDERLAY_COLOR)
            {
                let x = code[..code.len() - 1]
                    .iter()
                    .rev()
                    .find(|i| i.operation == Operation::Ldx)
                    .and_then(Instruction::loaded_value)
                    .map_or(last_x, |value| value.byte());
                adjustments.push(NtscAdjustment::run_with_delay(pad_cycles, run));
                adjustments.push(NtscAdjustment::adjust_fli_trigger(x));
            } else {
                adjustments.push(NtscAdjustment::run_with_delay(pad_cycles, run));
                adjustments.push(NtscAdjustment::run_with_delay(2, 3));
            }
            pad_cycles = 0;
        } else {
            adjustments.push(NtscAdjustment::run_with_delay(pad_cycles, length));
            pad_cycles = if ended_with_last_column { 0 } else { 2 };
        }
        last_x = row.registers[Register::X.index()].byte();
    }
    adjustments
}

/// Offset of the final `RTS` in the patched code, for PAL code of
/// `code_length` bytes.
pub fn ntsc_rts_offset(code_length: usize, adjustments: &[NtscAdjustment]) -> Result<usize> {
    let mut offset = code_length.saturating_sub(1);
    for adjustment in adjustments {
        offset += adjustment.delta_length()?;
    }
    Ok(offset)
}

/// Apply `adjustments` to the PAL speedcode `code` (ending in `RTS`, not
/// padded).
///
/// The code is rewritten from the tail: the adjustments are consumed last
/// to first, and whatever precedes the first one is copied unchanged.
pub fn adjust_code_for_ntsc(code: &[u8], adjustments: &[NtscAdjustment]) -> Result<Vec<u8>> {
    let length = ntsc_rts_offset(code.len(), adjustments)? + 1;
    let mut reversed: Vec<u8> = Vec::with_capacity(length);
    let mut source = code.iter().rev();

    // RTS
    take_bytes(&mut source, 1, &mut reversed)?;
    for adjustment in adjustments.iter().rev() {
        match adjustment.delay_cycles {
            0 => {
                let mut store = Instruction::store(Register::A, vic::CONTROL_1);
                store.extend_sta(adjustment.fli_trigger_delta);
                let mut bytes = Vec::with_capacity(3);
                store.emit(&mut bytes, &SlowValues::new())?;
                reversed.extend(bytes.iter().rev());
                take_bytes(&mut source, 3, &mut Vec::with_capacity(3))?;
            }
            2 | 3 | 4 => {
                take_bytes(&mut source, adjustment.run_length, &mut reversed)?;
                match adjustment.delay_cycles {
                    2 => reversed.push(opcodes::NOP),
                    3 => reversed.extend([0x00, opcodes::BIT_ZP]),
                    _ => reversed.extend([opcodes::NOP, opcodes::NOP]),
                }
            }
            other => return Err(unsupported_delay(other)),
        }
    }
    reversed.extend(source);

    reversed.reverse();
    Ok(reversed)
}

fn take_bytes<'a>(
    source: &mut impl Iterator<Item = &'a u8>,
    count: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    for _ in 0..count {
        let byte = source.next().ok_or_else(|| {
            CodegenError::new(
                ErrorCode::PatchOutOfBounds,
                "NTSC adjustments cover more bytes than the code has",
            )
        })?;
        out.push(*byte);
    }
    Ok(())
}

/// Patch list in the form the player applies at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtscPatchTable {
    /// Distinct trigger deltas, in order of first use.
    pub deltas: Vec<u8>,
    /// One byte per adjustment: the delta index for trigger rewrites,
    /// `(delay - 1) << 6 | run_length` for delays.
    pub entries: Vec<u8>,
    /// Address of the PAL `RTS`.
    pub pal_rts_address: u16,
    /// Address of the `RTS` after patching.
    pub ntsc_rts_address: u16,
    /// Index of the last entry.
    pub last_index: u8,
}

impl NtscPatchTable {
    /// Room for entries in the player template.
    pub const MAX_ENTRIES: usize = 0xfb;

    /// Build the table for PAL code of `code_length` bytes.
    pub fn build(adjustments: &[NtscAdjustment], code_length: usize) -> Result<Self> {
        if adjustments.is_empty() || adjustments.len() > Self::MAX_ENTRIES {
            return Err(CodegenError::new(
                ErrorCode::PatchOutOfBounds,
                format!("{} NTSC adjustments do not fit the patch table", adjustments.len()),
            ));
        }

        let mut deltas = Vec::new();
        let mut mapping: HashMap<u8, u8> = HashMap::new();
        for adjustment in adjustments.iter().filter(|a| a.delay_cycles == 0) {
            if !mapping.contains_key(&adjustment.fli_trigger_delta) {
                mapping.insert(adjustment.fli_trigger_delta, deltas.len() as u8);
                deltas.push(adjustment.fli_trigger_delta);
            }
        }

        let mut entries = Vec::with_capacity(adjustments.len());
        for adjustment in adjustments {
            adjustment.delta_length()?;
            let entry = match adjustment.delay_cycles {
                0 => mapping[&adjustment.fli_trigger_delta],
                delay => {
                    if adjustment.run_length > 0x3f {
                        return Err(CodegenError::new(
                            ErrorCode::RunLengthTooLong,
                            format!("Run of {} bytes does not fit the patch table", adjustment.run_length),
                        )
                        .with_hint("Runs are limited to 63 bytes"));
                    }
                    ((delay - 1) << 6) | adjustment.run_length as u8
                }
            };
            entries.push(entry);
        }

        let pal_rts = code_length.saturating_sub(1);
        let ntsc_rts = ntsc_rts_offset(code_length, adjustments)?;
        Ok(Self {
            deltas,
            entries,
            pal_rts_address: CODE_BASE_ADDRESS + pal_rts as u16,
            ntsc_rts_address: CODE_BASE_ADDRESS + ntsc_rts as u16,
            last_index: (adjustments.len() - 1) as u8,
        })
    }
}
