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

//! Row scheduler tests.
//!
//! These tests drive single rows through the scheduler and check the
//! emitted code against hand-traced listings and update windows.

use nuflix_speedcode::codegen::constants::{FLI_TRIGGER_CYCLE, LATEST_CYCLE};
use nuflix_speedcode::codegen::instruction::{Instruction, Operation, Register, RegisterValue};
use nuflix_speedcode::codegen::snippet::{schedule_row, RowInput, RowSchedule};
use nuflix_speedcode::codegen::update::{sort_updates_by_time, RegisterKind, RegisterUpdate, UpdateId};
use pretty_assertions::assert_eq;
use test_case::test_case;

// ============================================================================
// Helpers
// ============================================================================

fn schedule(row: usize, registers: [u8; 3], updates: &[RegisterUpdate]) -> RowSchedule {
    let mut sorted = updates.to_vec();
    sort_updates_by_time(&mut sorted);
    schedule_row(&RowInput {
        row,
        registers: registers.map(RegisterValue::Byte),
        extra_limit: 0,
        updates: &sorted,
        following: &[],
        deferred: &[],
    })
}

/// One instruction per line with its cycle count; runs of the same
/// instruction are folded into one line.
fn listing(code: &[Instruction]) -> String {
    let mut lines: Vec<(String, usize)> = Vec::new();
    for instruction in code {
        let line = format!("{} ({})", instruction, instruction.cycles());
        match lines.last_mut() {
            Some((last, count)) if *last == line => *count += 1,
            _ => lines.push((line, 1)),
        }
    }
    lines
        .into_iter()
        .map(|(line, count)| {
            if count > 1 {
                format!("{} x{}", line, count)
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn total_cycles(code: &[Instruction]) -> i32 {
    code.iter().map(Instruction::cycles).sum()
}

// ============================================================================
// Listings
// ============================================================================

#[test]
fn test_empty_row_listing() {
    let schedule = schedule(4, [0x38, 0, 0], &[]);
    insta::assert_snapshot!(listing(&schedule.code), @r###"
    NOP (2) x21
    BIT $00 (3)
    "###);
}

#[test]
fn test_covered_border_listing() {
    let schedule = schedule(1, [0x38, 0x05, 0x00], &[RegisterUpdate::border_color(5, 4)]);
    insta::assert_snapshot!(listing(&schedule.code), @r###"
    STX $D020 (4)
    NOP (2) x20
    "###);
}

#[test]
fn test_late_trigger_listing() {
    let schedule = schedule(1, [0x38, 0, 0], &[RegisterUpdate::fli_trigger(4)]);
    insta::assert_snapshot!(listing(&schedule.code), @r###"
    LDA #$3C (2)
    NOP (2) x21
    STA $D011 (4)
    "###);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_covered_border_needs_no_load() {
    let schedule = schedule(1, [0x38, 0x05, 0x00], &[RegisterUpdate::border_color(5, 4)]);
    assert_eq!(schedule.code.iter().filter(|i| i.operation.is_load()).count(), 0);
    assert_eq!(schedule.effective_updates.len(), 1);
    assert_eq!(schedule.effective_updates[0].write_cycle, 0x0e);
    assert!(!schedule.overflowed());
}

#[test]
fn test_due_sprite_move_ignores_extra_limit() {
    let mut sprite = RegisterUpdate::sprite_y(3).with_id(UpdateId(1));
    sprite.last_screen_y = Some(0x7b);
    let deferred = [sprite];
    let schedule = schedule_row(&RowInput {
        row: 61,
        registers: [RegisterValue::Byte(0x38); 3],
        extra_limit: 0,
        updates: &[],
        following: &[],
        deferred: &deferred,
    });
    assert_eq!(schedule.deferred_included, vec![UpdateId(1)]);
    assert_eq!(schedule.extra_updates, 0);
    assert!(schedule
        .effective_updates
        .iter()
        .any(|applied| applied.update.kind == RegisterKind::SpriteY));
}

#[test]
fn test_deferred_update_respects_extra_limit() {
    let background = RegisterUpdate::background_color(6).with_id(UpdateId(7));
    let deferred = [background];
    let schedule = schedule_row(&RowInput {
        row: 10,
        registers: [RegisterValue::Byte(0x38); 3],
        extra_limit: 0,
        updates: &[],
        following: &[],
        deferred: &deferred,
    });
    assert!(schedule.deferred_included.is_empty());
    assert!(schedule.effective_updates.is_empty());
}

#[test]
fn test_crowded_row_overflows_but_completes() {
    // Eight different values for the first underlay column, all due in the
    // first few cycles of the row.
    let updates: Vec<_> = (0..8u8)
        .map(|i| RegisterUpdate::underlay_color(0, i, 3, None).with_id(UpdateId(u32::from(i))))
        .collect();
    let schedule = schedule(1, [0x38, 0x20, 0x30], &updates);
    assert!(schedule.overflowed());
    assert_eq!(schedule.effective_updates.len(), 8);
    assert!(schedule.cycle >= LATEST_CYCLE);
}

#[test]
fn test_trigger_right_behind_column_store_is_in_time() {
    // The last column lands on the ceiling, which leaves the trigger store
    // one cycle past its window.
    let schedule = schedule(
        1,
        [0, 0, 0],
        &[RegisterUpdate::underlay_color(5, 0x0e, 4, None), RegisterUpdate::fli_trigger(4)],
    );
    let column = &schedule.effective_updates[0];
    let trigger = &schedule.effective_updates[1];
    assert_eq!(column.update.address(), 0xD02D);
    assert_eq!(column.write_cycle, LATEST_CYCLE);
    assert_eq!(trigger.update.kind, RegisterKind::FliTrigger);
    assert_eq!(trigger.write_cycle, FLI_TRIGGER_CYCLE + 1);
    assert!(!schedule.overflowed());
}

#[test_case([0x38, 0x05, 0x07], Register::A; "A has no pending use")]
#[test_case([0x05, 0x38, 0x07], Register::X; "A still needed")]
fn test_load_evicts_register_without_pending_use(registers: [u8; 3], evicted: Register) {
    // The border value is new; the bug colour is already in a register.
    let schedule = schedule(
        1,
        registers,
        &[RegisterUpdate::border_color(3, 4), RegisterUpdate::bug_color(1, 5, 4, None)],
    );
    let loads: Vec<_> = schedule.code.iter().filter(|i| i.operation.is_load()).collect();
    assert_eq!(loads, vec![&Instruction::load(evicted, RegisterValue::Byte(3))]);

    let mut expected = registers.map(RegisterValue::Byte);
    expected[evicted.index()] = RegisterValue::Byte(3);
    assert_eq!(schedule.registers, expected);
    assert_eq!(schedule.effective_updates.len(), 2);
    assert!(!schedule.overflowed());
}

// ============================================================================
// Windows
// ============================================================================

#[test_case(1, [0x38, 0, 0], RegisterUpdate::border_color(3, 4); "border")]
#[test_case(1, [0x38, 0, 0], RegisterUpdate::bug_color(1, 0x0e, 4, None); "bug colour")]
#[test_case(1, [0x38, 0, 0], RegisterUpdate::underlay_color(2, 0x07, 3, None); "odd underlay row")]
#[test_case(1, [0x38, 0, 0], RegisterUpdate::underlay_color(4, 0x07, 4, None); "even underlay row")]
#[test_case(2, [0x38, 0, 0], RegisterUpdate::screen_address(6); "screen pointer")]
#[test_case(3, [0x38, 0, 0], RegisterUpdate::fli_trigger(8); "trigger on bad line row")]
#[test_case(5, [0x38, 0, 0], RegisterUpdate::fli_trigger(12); "late trigger")]
fn test_single_update_lands_in_window(row: usize, registers: [u8; 3], update: RegisterUpdate) {
    let schedule = schedule(row, registers, &[update.clone()]);
    assert!(!schedule.overflowed());
    let applied = &schedule.effective_updates[0];
    assert!(
        applied.write_cycle >= update.first_cycle() && applied.write_cycle <= update.last_cycle(),
        "write at {:#x} outside {}",
        applied.write_cycle,
        update
    );
}

#[test_case(0; "first row")]
#[test_case(3; "row before bad line")]
#[test_case(4; "bad line row")]
#[test_case(99; "last row")]
fn test_rows_reach_the_ceiling(row: usize) {
    let schedule = schedule(row, [0x38, 0, 0], &[RegisterUpdate::border_color(1, (row * 2 + 2) as u16)]);
    assert_eq!(schedule.cycle, LATEST_CYCLE);
    let start = nuflix_speedcode::codegen::snippet::row_start_cycle(row);
    assert_eq!(start + total_cycles(&schedule.code), schedule.cycle);
}

#[test]
fn test_trigger_write_cycle() {
    let schedule = schedule(1, [0x38, 0, 0], &[RegisterUpdate::fli_trigger(4)]);
    let applied = schedule
        .effective_updates
        .iter()
        .find(|applied| applied.update.kind == RegisterKind::FliTrigger)
        .unwrap();
    assert_eq!(applied.write_cycle, FLI_TRIGGER_CYCLE);
    assert_eq!(
        schedule.code.last().map(|i| i.operation),
        Some(Operation::Sta)
    );
}
