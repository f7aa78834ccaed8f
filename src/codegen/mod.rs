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

//! Speedcode generation.
//!
//! This module turns the register updates of a frame into the speedcode
//! that performs them, one attribute row at a time.
//!
//! The generator:
//! - Schedules every row with the row scheduler, pulling in deferred work
//! - Thins out overflowing rows with the resolution heuristics and retries
//! - Carries register contents and shown colours from row to row
//! - Emits the PAL bytes and derives the NTSC re-timing patches
//!
//! Rows that cannot be fixed, deferred updates that expire and a program
//! that outgrows its slot are reported in [`Diagnostics`]; they never stop
//! generation.

pub mod colors;
pub mod constants;
pub mod emit;
pub mod instruction;
pub mod log;
pub mod mos6510;
pub mod ntsc;
pub mod planner;
pub mod resolve;
pub mod snippet;
pub mod update;

use std::cmp::{max, min};

use crate::distance::ColorDistance;
use crate::error::{CodegenError, ErrorCode, Result};
use colors::{ColorSlot, ColorTables};
use constants::{
    ATTRIBUTE_HEIGHT, CODE_BASE_ADDRESS, CODE_SIZE_LIMIT, DROPPED_DEFERRED_FLAG,
    EARLIEST_SPRITE_UPDATE_SCREEN_Y, INITIAL_ACCUMULATOR, LATEST_SPRITE_UPDATE_SCREEN_Y,
    MAX_EXTRA_UPDATES, SPRITE_COUNT,
};
use emit::SlowValues;
use instruction::{Instruction, Register, RegisterValue};
use log::{GenerationLog, RowLogEntry};
use mos6510::vic;
use ntsc::{NtscAdjustment, NtscPatchTable};
use planner::UpdatePlan;
use snippet::{first_needed_values, schedule_row, AppliedUpdate, RowInput, RowSchedule};
use update::{RegisterKind, RegisterUpdate, UpdateId};

/// Options for a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Collect the generation log.
    pub log: bool,
}

/// Free cycles of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeCycles {
    /// Cycles spent in no-ops, `None` if the row needed resolving.
    pub cycles: Option<i32>,
    /// Whether a deferred update expired in this row.
    pub dropped_deferred: bool,
}

impl FreeCycles {
    /// Single number form: `-1` for resolved rows, bit 8 marking expired
    /// deferred work.
    pub fn encoded(&self) -> i32 {
        let cycles = self.cycles.unwrap_or(-1);
        if self.dropped_deferred {
            cycles | DROPPED_DEFERRED_FLAG
        } else {
            cycles
        }
    }
}

/// Problems that did not stop generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Rows that still miss a window.
    pub unresolved_rows: Vec<usize>,
    /// One line per unresolved row.
    pub unresolved: String,
    /// Deferred updates that expired before a row had room for them.
    pub dropped_updates: Vec<RegisterUpdate>,
    /// Fewer sprite moves than sprites in the sprite move rows.
    pub sprite_move_failed: bool,
    /// The code does not fit its slot.
    pub oversized: bool,
}

impl Diagnostics {
    /// Whether there is nothing to report.
    pub fn is_clean(&self) -> bool {
        self.unresolved_rows.is_empty()
            && self.dropped_updates.is_empty()
            && !self.sprite_move_failed
            && !self.oversized
    }
}

/// The result of a generation run.
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    /// PAL speedcode: `STA $D011`, all rows, `RTS`.
    pub code: Vec<u8>,
    /// Scheduled rows.
    pub rows: Vec<RowSchedule>,
    pub ntsc_adjustments: Vec<NtscAdjustment>,
    /// Offset of the `RTS` in the NTSC code.
    pub ntsc_rts_offset: usize,
    pub free_cycles: Vec<FreeCycles>,
    /// X when the speedcode starts.
    pub init_x: u8,
    /// Y when the speedcode starts.
    pub init_y: u8,
    /// Address of the bank switch operand, if the code switches banks.
    pub bank_change_address: Option<u16>,
    pub diagnostics: Diagnostics,
    pub log: Option<String>,
}

impl GeneratedCode {
    /// The speedcode re-timed for NTSC machines.
    pub fn ntsc_code(&self) -> Result<Vec<u8>> {
        ntsc::adjust_code_for_ntsc(&self.code, &self.ntsc_adjustments)
    }

    /// The PAL code padded with zeros to the size of its slot. Code that
    /// is already too big is returned unchanged.
    pub fn padded_code(&self) -> Vec<u8> {
        pad_code(&self.code)
    }

    /// Patch table for PAL code that re-times itself on NTSC machines.
    pub fn ntsc_patch_table(&self) -> Result<NtscPatchTable> {
        NtscPatchTable::build(&self.ntsc_adjustments, self.code.len())
    }

    /// Sum of free cycles over all rows.
    pub fn total_free_cycles(&self) -> i32 {
        self.rows.iter().map(|row| row.free_cycles).sum()
    }
}

/// Pad `code` with zeros up to the code size limit.
pub fn pad_code(code: &[u8]) -> Vec<u8> {
    let mut padded = code.to_vec();
    if padded.len() < CODE_SIZE_LIMIT {
        padded.resize(CODE_SIZE_LIMIT, 0);
    }
    padded
}

/// Speedcode generator.
pub struct CodeGenerator<'a> {
    slow_values: &'a SlowValues,
    distance: &'a dyn ColorDistance,
    options: GenerationOptions,
    /// Working colour tables: what the screen shows so far.
    tables: ColorTables,
    /// Colour tables as the picture wants them.
    wanted: ColorTables,
    /// Deferred updates not yet written.
    pool: Vec<RegisterUpdate>,
    diagnostics: Diagnostics,
    log: Option<GenerationLog>,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator for a frame whose target colours are `tables`.
    pub fn new(
        tables: &ColorTables,
        slow_values: &'a SlowValues,
        distance: &'a dyn ColorDistance,
        options: GenerationOptions,
    ) -> Self {
        Self {
            slow_values,
            distance,
            options,
            tables: tables.clone(),
            wanted: tables.clone(),
            pool: Vec::new(),
            diagnostics: Diagnostics::default(),
            log: options.log.then(GenerationLog::new),
        }
    }

    /// Generate the speedcode for `plan`.
    pub fn generate(&mut self, plan: &UpdatePlan) -> Result<GeneratedCode> {
        if plan.rows.len() != ATTRIBUTE_HEIGHT {
            return Err(CodegenError::new(
                ErrorCode::InvalidUpdatePlan,
                format!(
                    "Update plan has {} rows, expected {}",
                    plan.rows.len(),
                    ATTRIBUTE_HEIGHT
                ),
            ));
        }

        let (mut rows, pool) = number_updates(plan);
        self.pool = pool;
        self.tables = self.wanted.clone();
        self.tables.show_bug_row(0);
        self.diagnostics = Diagnostics::default();
        self.log = self.options.log.then(GenerationLog::new);

        let initial = first_needed_values(&rows[0], 2);
        let init_x = initial.first().copied().unwrap_or(0);
        let init_y = initial.get(1).copied().unwrap_or(0);
        let mut registers = [
            RegisterValue::Byte(INITIAL_ACCUMULATOR),
            RegisterValue::Byte(init_x),
            RegisterValue::Byte(init_y),
        ];

        let mut schedules = Vec::with_capacity(ATTRIBUTE_HEIGHT);
        let mut free_cycles = Vec::with_capacity(ATTRIBUTE_HEIGHT);
        for y in 0..ATTRIBUTE_HEIGHT {
            let current = rows[y].clone();
            let mut next = rows.get(y + 1).cloned().unwrap_or_default();
            let (schedule, mut free) = self.generate_row(y, registers, current, &mut next);
            if let Some(following) = rows.get_mut(y + 1) {
                *following = next;
            }

            free.dropped_deferred = self.expire_deferred(y, &schedule);
            free_cycles.push(free);

            if y < ATTRIBUTE_HEIGHT - 1 {
                self.commit_row(y, &schedule.effective_updates);
            }
            if let Some(log) = self.log.as_mut() {
                log.row(&RowLogEntry {
                    schedule: &schedule,
                    wanted_bug: self.wanted.bug_row(y),
                    tables: &self.tables,
                    registers,
                });
            }
            registers = schedule.registers;
            schedules.push(schedule);
        }

        self.diagnostics.sprite_move_failed = sprite_moves(&schedules) < SPRITE_COUNT;
        let (code, bank_change_address) = self.emit(&schedules)?;
        self.diagnostics.oversized = code.len() > CODE_SIZE_LIMIT;

        let ntsc_adjustments = ntsc::derive_adjustments(&schedules, init_x);
        let ntsc_rts_offset = ntsc::ntsc_rts_offset(code.len(), &ntsc_adjustments)?;

        let total_free: i32 = schedules.iter().map(|row| row.free_cycles).sum();
        let log = self.log.take().map(|mut log| {
            for update in &self.diagnostics.dropped_updates {
                log.unused(update);
            }
            log.finish(total_free)
        });

        Ok(GeneratedCode {
            code,
            rows: schedules,
            ntsc_adjustments,
            ntsc_rts_offset,
            free_cycles,
            init_x,
            init_y,
            bank_change_address,
            diagnostics: std::mem::take(&mut self.diagnostics),
            log,
        })
    }

    /// Schedule row `y`, resolving overflows until the row fits or nothing
    /// more can be done.
    fn generate_row(
        &mut self,
        y: usize,
        registers: [RegisterValue; Register::COUNT],
        mut current: Vec<RegisterUpdate>,
        next: &mut Vec<RegisterUpdate>,
    ) -> (RowSchedule, FreeCycles) {
        let screen_y = ((y << 1) + 1) as u16;
        let mut matching: Vec<RegisterUpdate> = self
            .pool
            .iter()
            .filter(|u| {
                u.screen_y.unwrap_or(0) <= screen_y + 1
                    && u.last_screen_y.is_some_and(|last| screen_y <= last)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|u| u.last_screen_y);

        let mut extra_limit = min(MAX_EXTRA_UPDATES, matching.len());
        let mut free = FreeCycles {
            cycles: Some(0),
            dropped_deferred: false,
        };

        loop {
            let schedule = schedule_row(&RowInput {
                row: y,
                registers,
                extra_limit,
                updates: &current,
                following: next,
                deferred: &matching,
            });
            if free.cycles.is_some() {
                free.cycles = Some(schedule.free_cycles);
            }
            if !schedule.overflowed() {
                return (schedule, free);
            }

            let overflow = format!("Overflow {} ({}): ", y, schedule.cycle);
            if schedule.extra_updates > 0 {
                extra_limit = schedule.extra_updates - 1;
                self.note(format_args!("{}Extra {}", overflow, extra_limit));
                continue;
            }
            free.cycles = None;

            let mut resolution = resolve::defer_bug_color_swap(y, &mut current, next, &self.tables);
            if resolution.is_none() {
                resolution =
                    resolve::defer_bug_color_update(y, &mut current, next, &self.tables, self.distance);
            }
            if resolution.is_none() {
                resolution = resolve::remove_least_important_underlay_update(
                    y,
                    &mut current,
                    &mut self.tables,
                    self.distance,
                );
            }
            match resolution {
                Some(resolution) => self.note(format_args!("{}{}", overflow, resolution)),
                None => {
                    let line = format!("{}Unresolved", overflow);
                    self.note(&line);
                    self.diagnostics.unresolved_rows.push(y);
                    self.diagnostics.unresolved.push_str(&line);
                    self.diagnostics.unresolved.push('\n');
                    return (schedule, free);
                }
            }
        }
    }

    /// Take the deferred updates row `y` wrote out of the pool and expire
    /// the ones whose deadline has passed. Returns whether any expired.
    fn expire_deferred(&mut self, y: usize, schedule: &RowSchedule) -> bool {
        let screen_y = ((y << 1) + 1) as u16;
        let (included, rest): (Vec<_>, Vec<_>) = self
            .pool
            .drain(..)
            .partition(|u| schedule.deferred_included.contains(&u.id));
        self.pool = rest;
        if let Some(log) = self.log.as_mut() {
            for update in &included {
                log.included(y, update);
            }
        }

        let (dropped, kept): (Vec<_>, Vec<_>) = self
            .pool
            .drain(..)
            .partition(|u| u.last_screen_y.is_some_and(|last| last < screen_y + 2));
        self.pool = kept;
        let any = !dropped.is_empty();
        self.diagnostics.dropped_updates.extend(dropped);
        any
    }

    /// Carry the shown colours of row `y` into the next row and apply what
    /// the row wrote.
    fn commit_row(&mut self, y: usize, applied: &[AppliedUpdate]) {
        let top = y << 1;
        self.tables.carry_bug_row(y);
        self.tables.carry_underlay_row(top);

        let mut started_second_row = false;
        for update in applied.iter().map(|a| &a.update) {
            let color = ColorSlot::Set(update.value.nibble());
            match update.kind {
                RegisterKind::BugColor => {
                    self.tables.set_bug(y + 1, usize::from(update.slot), color);
                }
                RegisterKind::UnderlayColor => {
                    let target = update.screen_y.map_or(top + 1, usize::from);
                    if !started_second_row && target > top + 1 {
                        started_second_row = true;
                        self.tables.carry_underlay_row(top + 1);
                    }
                    self.tables
                        .set_underlay(max(target, top + 1), usize::from(update.slot), color);
                }
                _ => {}
            }
        }
        if !started_second_row {
            self.tables.carry_underlay_row(top + 1);
        }
    }

    /// Emit the PAL bytes. Returns the code and the address of the bank
    /// switch operand.
    fn emit(&self, schedules: &[RowSchedule]) -> Result<(Vec<u8>, Option<u16>)> {
        let mut code = Vec::new();
        let mut bank_change_address = None;
        Instruction::store(Register::A, vic::CONTROL_1).emit(&mut code, self.slow_values)?;

        let rts = Instruction::rts();
        let instructions = schedules
            .iter()
            .flat_map(|row| row.code.iter())
            .chain(std::iter::once(&rts));
        for instruction in instructions {
            if instruction.loaded_value() == Some(RegisterValue::BankSwitch) {
                bank_change_address = Some(CODE_BASE_ADDRESS + code.len() as u16 + 1);
            }
            instruction.emit(&mut code, self.slow_values)?;
        }
        Ok((code, bank_change_address))
    }

    fn note(&mut self, line: impl std::fmt::Display) {
        if let Some(log) = self.log.as_mut() {
            log.resolution(line);
        }
    }
}

/// Give every update of the plan its own identifier.
fn number_updates(plan: &UpdatePlan) -> (Vec<Vec<RegisterUpdate>>, Vec<RegisterUpdate>) {
    let mut next_id = 0u32;
    let mut number = |update: &RegisterUpdate| {
        next_id += 1;
        update.clone().with_id(UpdateId(next_id))
    };
    let rows = plan
        .rows
        .iter()
        .map(|row| row.iter().map(&mut number).collect())
        .collect();
    let deferred = plan.deferred.iter().map(&mut number).collect();
    (rows, deferred)
}

/// Number of sprite position stores in the rows where sprites have to move.
fn sprite_moves(schedules: &[RowSchedule]) -> usize {
    let first = usize::from(EARLIEST_SPRITE_UPDATE_SCREEN_Y >> 1);
    let last = usize::from(LATEST_SPRITE_UPDATE_SCREEN_Y >> 1);
    schedules
        .iter()
        .skip(first)
        .take(last - first + 1)
        .flat_map(|row| row.code.iter())
        .filter(|i| i.store_address().is_some_and(|a| a < vic::SPRITE_POSITION_END))
        .count()
}

/// Generate the speedcode for `plan`.
pub fn generate(
    plan: &UpdatePlan,
    tables: &ColorTables,
    slow_values: &SlowValues,
    distance: &dyn ColorDistance,
    options: GenerationOptions,
) -> Result<GeneratedCode> {
    let mut generator = CodeGenerator::new(tables, slow_values, distance, options);
    generator.generate(plan)
}
