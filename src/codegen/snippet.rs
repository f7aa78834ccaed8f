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

//! Row scheduler.
//!
//! Schedules the register writes of one speedcode row. The scheduler walks
//! the row's updates in window order and emits loads, stores and no-ops so
//! that every store lands inside its update's window:
//!
//! - Early updates (window closing before the row ceiling) are written as
//!   soon as they come up.
//! - Updates whose window is already open may be reordered freely; one that
//!   a register already satisfies is preferred.
//! - Late updates are committed to: their value is loaded, the wait until
//!   the window opens is filled with preloads for upcoming updates or
//!   no-ops, and an odd leftover cycle is absorbed by stretching an earlier
//!   instruction.
//!
//! The two writes closing every row (last underlay column, then the FLI
//! trigger) are prepared in reserved registers as soon as the scheduler
//! commits to the late part of the row.

use super::constants::{EARLIEST_CYCLE, FLI_TRIGGER_CYCLE, LATEST_CYCLE};
use super::instruction::{Instruction, Operation, Register, RegisterValue};
use super::mos6510::vic;
use super::update::{sort_updates_by_time, RegisterUpdate, UpdateId};

/// Everything the scheduler needs to know about one row.
#[derive(Debug, Clone, Copy)]
pub struct RowInput<'a> {
    /// Attribute row index.
    pub row: usize,
    /// Register contents when the row starts.
    pub registers: [RegisterValue; Register::COUNT],
    /// How many deferred updates may be pulled into the row.
    pub extra_limit: usize,
    /// Updates that belong to this row, sorted by window.
    pub updates: &'a [RegisterUpdate],
    /// Updates of the following row, used for preloading.
    pub following: &'a [RegisterUpdate],
    /// Deferred updates that may be pulled into this row.
    pub deferred: &'a [RegisterUpdate],
}

/// An update that made it into the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub update: RegisterUpdate,
    /// Cycle on which the store writes the register.
    pub write_cycle: i32,
}

/// The scheduled code of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchedule {
    pub row: usize,
    pub code: Vec<Instruction>,
    /// Register contents when the row ends.
    pub registers: [RegisterValue; Register::COUNT],
    /// Updates written by this row, in code order.
    pub effective_updates: Vec<AppliedUpdate>,
    /// Deferred updates pulled into this row.
    pub deferred_included: Vec<UpdateId>,
    /// Cycles spent in no-ops.
    pub free_cycles: i32,
    /// Cycle counter after the last instruction.
    pub cycle: i32,
    /// First update whose store missed its window, if any.
    pub overflow: Option<RegisterUpdate>,
    /// Number of deferred updates pulled in against the extra limit.
    pub extra_updates: usize,
}

impl RowSchedule {
    /// Whether an update missed its window.
    pub fn overflowed(&self) -> bool {
        self.overflow.is_some()
    }

    /// Encoded length of the row's code in bytes.
    pub fn byte_length(&self) -> usize {
        self.code.iter().map(Instruction::byte_length).sum()
    }
}

/// Cycle at which the code of `row` starts executing.
pub fn row_start_cycle(row: usize) -> i32 {
    if row > 0 && row & 3 == 0 {
        EARLIEST_CYCLE
    } else {
        EARLIEST_CYCLE + 1
    }
}

/// Schedule one row.
pub fn schedule_row(input: &RowInput<'_>) -> RowSchedule {
    let screen_y = ((input.row << 1) + 1) as u16;
    let mut remaining = input.updates.to_vec();
    let mut deferred_included = Vec::new();
    let mut extra_updates = 0;

    for update in input.deferred {
        // Sprite moves that are due now cannot wait for another row.
        if !update.is_due_sprite_move(screen_y) {
            if extra_updates >= input.extra_limit {
                continue;
            }
            extra_updates += 1;
        }
        remaining.push(update.clone_deferred(screen_y));
        deferred_included.push(update.id);
    }
    sort_updates_by_time(&mut remaining);

    let mut scheduler = RowScheduler::new(input.row, input.registers, &remaining);
    scheduler.run(remaining, input.following);
    scheduler.pad();

    RowSchedule {
        row: input.row,
        code: scheduler.code,
        registers: scheduler.registers,
        effective_updates: scheduler.effective,
        deferred_included,
        free_cycles: scheduler.free_cycles,
        cycle: scheduler.cycle,
        overflow: scheduler.overflow,
        extra_updates,
    }
}

/// The first `limit` distinct values needed by `updates`, in order.
///
/// A colour update whose nibble is already among the values adds nothing.
pub fn first_needed_values(updates: &[RegisterUpdate], limit: usize) -> Vec<u8> {
    let mut result: Vec<u8> = Vec::new();
    for update in updates {
        if result.len() >= limit {
            break;
        }
        let value = update.value.byte();
        let found = result.contains(&value)
            || (update.nibble_only() && result.iter().any(|v| v & 0x0F == value & 0x0F));
        if !found {
            result.push(value);
        }
    }
    result
}

/// Working state while scheduling a row.
struct RowScheduler {
    cycle: i32,
    registers: [RegisterValue; Register::COUNT],
    code: Vec<Instruction>,
    effective: Vec<AppliedUpdate>,
    overflow: Option<RegisterUpdate>,
    free_cycles: i32,
    /// Number of pending updates each register's value satisfies.
    future_uses: [i32; Register::COUNT],
    /// Register reserved for the FLI trigger.
    fli_register: Option<Register>,
    /// Register reserved for the last underlay column.
    last_column_register: Option<Register>,
}

impl RowScheduler {
    fn new(
        row: usize,
        registers: [RegisterValue; Register::COUNT],
        updates: &[RegisterUpdate],
    ) -> Self {
        let future_uses = registers.map(|value| count_accepting(updates, value));
        Self {
            cycle: row_start_cycle(row),
            registers,
            code: Vec::new(),
            effective: Vec::new(),
            overflow: None,
            free_cycles: 0,
            future_uses,
            fli_register: None,
            last_column_register: None,
        }
    }

    fn run(&mut self, mut remaining: Vec<RegisterUpdate>, following: &[RegisterUpdate]) {
        while let Some(head) = remaining.first().cloned() {
            if head.is_early() {
                remaining.remove(0);
                if !self.try_immediate_write(&head) {
                    self.add_best_update(&head, &remaining);
                }
            } else if !head.is_late(self.cycle) {
                let mut written = None;
                for (i, candidate) in remaining.iter().enumerate() {
                    if candidate.is_late(self.cycle) {
                        break;
                    }
                    if self.try_immediate_write(candidate) {
                        written = Some(i);
                        break;
                    }
                }
                match written {
                    Some(i) => {
                        remaining.remove(i);
                    }
                    None => {
                        let update = remaining.remove(0);
                        self.add_best_update(&update, &remaining);
                    }
                }
            } else {
                self.commit_late(head, &mut remaining, following);
            }
        }
    }

    /// Write `update` exactly when its window opens.
    fn commit_late(
        &mut self,
        update: RegisterUpdate,
        remaining: &mut Vec<RegisterUpdate>,
        following: &[RegisterUpdate],
    ) {
        if self.fli_register.is_none() && remaining.len() > 1 {
            let last = &remaining[remaining.len() - 1];
            let before_last = &remaining[remaining.len() - 2];
            if last.address() == vic::CONTROL_1 && before_last.address() == vic::LAST_UNDERLAY_COLOR {
                let (trigger, column) = (last.value, before_last.value);
                // The trigger has to sit in A: the NTSC patch turns its
                // store into an indexed one.
                self.fli_register = Some(Register::A);
                self.add_load(Register::A, trigger, remaining);
                self.last_column_register = Some(self.add_best_load(column, remaining, true));
            }
        }

        if !self.covers(&update) {
            self.add_best_load(update.value, remaining, update.nibble_only());
        }

        let mut wait = update.first_cycle() - 3 - self.cycle;
        while wait > 1 {
            if !self.preload(remaining, following) {
                self.add_nop(false);
            }
            wait -= 2;
        }
        if wait == 1 {
            self.stretch_previous_instruction();
        }

        remaining.remove(0);
        self.try_immediate_write(&update);
    }

    /// Load a free register with the value of the next update nothing
    /// covers yet. Only the first free register is considered.
    fn preload(&mut self, remaining: &[RegisterUpdate], following: &[RegisterUpdate]) -> bool {
        let Some(register) = Register::ALL
            .into_iter()
            .find(|&r| self.future_uses[r.index()] == 0 && !self.is_reserved(r))
        else {
            return false;
        };
        let mut future = remaining.to_vec();
        if remaining.last().is_some_and(|last| self.covers(last)) {
            future.extend_from_slice(following);
        }
        let Some(value) = future.iter().find(|u| !self.covers(u)).map(|u| u.value) else {
            return false;
        };
        self.add_load(register, value, &future);
        true
    }

    /// Absorb one cycle by switching the latest stretchable instruction to
    /// its longer encoding.
    fn stretch_previous_instruction(&mut self) {
        for instruction in self.code.iter_mut().rev() {
            if instruction.add_extra_cycle_if_possible() {
                self.cycle += 1;
                if instruction.operation == Operation::Nop {
                    self.free_cycles += 1;
                }
                break;
            }
        }
    }

    /// Fill the row up to the ceiling.
    fn pad(&mut self) {
        while self.cycle < LATEST_CYCLE {
            self.add_nop(self.cycle == LATEST_CYCLE - 3);
        }
    }

    fn is_reserved(&self, register: Register) -> bool {
        self.fli_register == Some(register) || self.last_column_register == Some(register)
    }

    fn covers(&self, update: &RegisterUpdate) -> bool {
        self.registers.iter().any(|&value| update.accepts(value))
    }

    /// Store `update` from a register that already satisfies it.
    fn try_immediate_write(&mut self, update: &RegisterUpdate) -> bool {
        let mut emitted = false;
        for register in Register::ALL {
            if !update.accepts(self.registers[register.index()]) {
                continue;
            }
            if !emitted {
                self.add_store(register, update);
                emitted = true;
            }
            self.future_uses[register.index()] -= 1;
        }
        emitted
    }

    /// Make `value` available in a register, loading it into the least
    /// useful unreserved register if no register holds it yet.
    ///
    /// With `free_high_nibble` only the low nibble of `value` matters, so a
    /// pending update needing a full byte with that nibble lends its value.
    fn add_best_load(
        &mut self,
        value: RegisterValue,
        remaining: &[RegisterUpdate],
        free_high_nibble: bool,
    ) -> Register {
        let chosen = Register::ALL
            .into_iter()
            .filter(|&r| !self.is_reserved(r))
            .min_by_key(|r| self.future_uses[r.index()])
            .unwrap_or(Register::A);

        let mut value = value;
        if free_high_nibble {
            if let Some(other) = remaining
                .iter()
                .find(|other| !other.nibble_only() && RegisterValue::Byte(other.value.nibble()) == value)
            {
                value = other.value;
            }
        }

        if let Some(register) = Register::ALL
            .into_iter()
            .find(|r| self.registers[r.index()] == value)
        {
            return register;
        }
        self.add_load(chosen, value, remaining);
        chosen
    }

    fn add_best_update(&mut self, update: &RegisterUpdate, remaining: &[RegisterUpdate]) {
        let register = self.add_best_load(update.value, remaining, update.nibble_only());
        self.add_store(register, update);
    }

    fn add_nop(&mut self, extra_cycle: bool) {
        let instruction = Instruction::nop(extra_cycle);
        self.cycle += instruction.cycles();
        self.free_cycles += instruction.cycles();
        self.code.push(instruction);
    }

    fn add_load(&mut self, register: Register, value: RegisterValue, future: &[RegisterUpdate]) {
        let instruction = Instruction::load(register, value);
        self.cycle += instruction.cycles();
        self.registers[register.index()] = value;
        self.future_uses[register.index()] = count_accepting(future, value);
        self.code.push(instruction);
    }

    fn add_store(&mut self, register: Register, update: &RegisterUpdate) {
        let instruction = Instruction::store(register, update.address());
        self.cycle += instruction.cycles();
        self.code.push(instruction);
        self.effective.push(AppliedUpdate {
            update: update.clone(),
            write_cycle: self.cycle - 1,
        });
        self.check_overflow(update);
    }

    fn check_overflow(&mut self, update: &RegisterUpdate) {
        if update.last_cycle() >= self.cycle - 1 {
            return;
        }
        // A late trigger write right behind another store is still in time.
        let len = self.code.len();
        if update.last_cycle() == FLI_TRIGGER_CYCLE && len >= 2 && self.code[len - 2].is_store() {
            return;
        }
        if self.overflow.is_none() {
            self.overflow = Some(update.clone());
        }
    }
}

fn count_accepting(updates: &[RegisterUpdate], value: RegisterValue) -> i32 {
    updates.iter().filter(|update| update.accepts(value)).count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::disassemble;

    fn registers(a: u8, x: u8, y: u8) -> [RegisterValue; 3] {
        [a.into(), x.into(), y.into()]
    }

    fn input<'a>(row: usize, regs: [RegisterValue; 3], updates: &'a [RegisterUpdate]) -> RowInput<'a> {
        RowInput {
            row,
            registers: regs,
            extra_limit: 0,
            updates,
            following: &[],
            deferred: &[],
        }
    }

    #[test]
    fn test_start_cycle() {
        assert_eq!(row_start_cycle(0), 0x0b);
        assert_eq!(row_start_cycle(4), 0x0a);
        assert_eq!(row_start_cycle(5), 0x0b);
    }

    #[test]
    fn test_empty_row_is_padded_to_ceiling() {
        let schedule = schedule_row(&input(1, registers(0x38, 0, 0), &[]));
        assert!(schedule.code.iter().all(|i| i.operation == Operation::Nop));
        assert_eq!(schedule.cycle, LATEST_CYCLE);
        assert_eq!(schedule.free_cycles, LATEST_CYCLE - 0x0b);
        assert!(!schedule.overflowed());
    }

    #[test]
    fn test_covered_update_is_single_store() {
        let updates = [RegisterUpdate::border_color(5, 4)];
        let schedule = schedule_row(&input(1, registers(0x38, 0x05, 0x00), &updates));
        assert_eq!(schedule.code[0], Instruction::store(Register::X, vic::BORDER_COLOR));
        assert!(schedule.code.iter().all(|i| i.operation != Operation::Ldx));
        assert_eq!(schedule.effective_updates.len(), 1);
    }

    #[test]
    fn test_nibble_match_reuses_register() {
        let updates = [RegisterUpdate::bug_color(0, 0x0a, 4, None)];
        let schedule = schedule_row(&input(1, registers(0x3a, 0, 0), &updates));
        assert!(schedule.code.contains(&Instruction::store(Register::A, vic::SPRITE0_COLOR)));
        assert!(schedule.code.iter().all(|i| !i.operation.is_load()));
    }

    #[test]
    fn test_late_trigger_waits_for_window() {
        let updates = [RegisterUpdate::fli_trigger(4)];
        let schedule = schedule_row(&input(1, registers(0x38, 0, 0), &updates));
        let applied = &schedule.effective_updates[0];
        assert_eq!(applied.write_cycle, FLI_TRIGGER_CYCLE);
        assert!(!schedule.overflowed());
        assert_eq!(schedule.registers[0], RegisterValue::Byte(0x3c));
    }

    #[test]
    fn test_odd_wait_stretches_instruction() {
        // Row 4 starts at $0a, so after the load the wait before $3a is odd.
        let updates = [RegisterUpdate::fli_trigger(10)];
        let schedule = schedule_row(&input(4, registers(0x38, 0, 0), &updates));
        assert!(schedule.code.iter().any(|i| i.extra_cycle));
        assert_eq!(schedule.cycle, FLI_TRIGGER_CYCLE + 1);
    }

    #[test]
    fn test_trigger_pair_is_preloaded() {
        let updates = [
            RegisterUpdate::underlay_color(5, 0x0e, 4, None),
            RegisterUpdate::fli_trigger(4),
        ];
        let mut sorted = updates.to_vec();
        sort_updates_by_time(&mut sorted);
        let schedule = schedule_row(&input(1, registers(0x00, 0x00, 0x00), &sorted));
        let text = disassemble(&schedule.code);
        assert!(text.starts_with("LDA #$3C"), "{}", text);
        assert!(text.ends_with("$D02D; STA $D011"), "{}", text);
    }

    #[test]
    fn test_pending_uses_follow_loads_and_stores() {
        let pending = vec![
            RegisterUpdate::border_color(3, 4),
            RegisterUpdate::bug_color(1, 0x03, 4, None),
            RegisterUpdate::underlay_color(2, 0x07, 4, None),
        ];
        let mut scheduler = RowScheduler::new(1, registers(0x38, 0x05, 0x07), &pending);
        assert_eq!(scheduler.future_uses, [0, 0, 1]);

        let register = scheduler.add_best_load(RegisterValue::Byte(3), &pending, false);
        assert_eq!(register, Register::A);
        assert_eq!(scheduler.future_uses, [2, 0, 1]);

        assert!(scheduler.try_immediate_write(&pending[0]));
        assert_eq!(scheduler.future_uses, [1, 0, 1]);
        for register in Register::ALL {
            let value = scheduler.registers[register.index()];
            assert_eq!(
                scheduler.future_uses[register.index()],
                count_accepting(&pending[1..], value)
            );
        }
    }

    #[test]
    fn test_due_sprite_move_is_forced_in() {
        let mut sprite = RegisterUpdate::sprite_y(7).with_id(UpdateId(9));
        sprite.last_screen_y = Some(0x7b);
        let background = RegisterUpdate::background_color(3).with_id(UpdateId(8));
        let deferred = [background, sprite];
        let schedule = schedule_row(&RowInput {
            deferred: &deferred,
            ..input(61, registers(0x38, 0, 0), &[])
        });
        assert_eq!(schedule.deferred_included, vec![UpdateId(9)]);
        assert_eq!(schedule.extra_updates, 0);
        assert!(schedule.code.iter().any(|i| i.store_address() == Some(0xd00f)));
    }

    #[test]
    fn test_first_needed_values_skips_nibble_duplicates() {
        let updates = [
            RegisterUpdate::screen_address(2),
            RegisterUpdate::bug_color(0, 0x08, 2, None),
            RegisterUpdate::fli_trigger(2),
        ];
        assert_eq!(first_needed_values(&updates, 2), vec![0x68, 0x3a]);
        assert_eq!(first_needed_values(&updates, 1), vec![0x68]);
    }
}
