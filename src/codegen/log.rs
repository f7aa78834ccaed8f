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

//! Generation log.
//!
//! A plain text report of a generation run: a two-line table entry per
//! attribute row followed by every resolution step taken along the way.

use std::fmt::{self, Write};

use super::colors::{BugRow, ColorSlot, ColorTables};
use super::instruction::{disassemble, Register, RegisterValue};
use super::snippet::RowSchedule;
use super::update::RegisterUpdate;

/// Text log collected while generating.
#[derive(Debug, Clone, Default)]
pub struct GenerationLog {
    table: String,
    resolutions: String,
}

/// What the log shows for one row.
pub struct RowLogEntry<'a> {
    pub schedule: &'a RowSchedule,
    /// Bug colours the picture asks for on this row.
    pub wanted_bug: BugRow,
    /// Working colour tables after the row was committed.
    pub tables: &'a ColorTables,
    /// Register contents when the row started.
    pub registers: [RegisterValue; Register::COUNT],
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the table entry for a row.
    pub fn row(&mut self, entry: &RowLogEntry<'_>) {
        let schedule = entry.schedule;
        let y = schedule.row;
        let top = y << 1;
        let marker = if y & 3 == 0 { "*" } else { "" };

        let _ = write!(
            self.table,
            "{}{}\t| {} | {} | {} | {:2} | free cc: {:2}/{} |",
            y,
            marker,
            slots(&entry.wanted_bug),
            slots(&entry.tables.bug_row(y)),
            slots(&entry.tables.underlay_row(top)),
            schedule.effective_updates.len(),
            schedule.free_cycles,
            schedule.cycle
        );
        for applied in &schedule.effective_updates {
            let update = &applied.update;
            let _ = write!(
                self.table,
                " {:04x}:{:02x}[{}-{}]",
                update.address(),
                update.value.byte(),
                update.first_cycle(),
                update.last_cycle()
            );
        }
        self.table.push('\n');

        let extra = if schedule.extra_updates > 0 {
            format!("+{}", schedule.extra_updates)
        } else {
            "  ".to_string()
        };
        let [a, x, yr] = entry.registers.map(RegisterValue::byte);
        let _ = writeln!(
            self.table,
            "{}\t|      |      | {} | {} | a={:02x} x={:02x} y={:02x} | {}",
            if schedule.overflowed() { "!!!" } else { "" },
            slots(&entry.tables.underlay_row(top + 1)),
            extra,
            a,
            x,
            yr,
            disassemble(&schedule.code)
        );
    }

    /// Add a line to the resolutions section.
    pub fn resolution(&mut self, line: impl fmt::Display) {
        let _ = writeln!(self.resolutions, "{}", line);
    }

    /// Record a deferred update pulled into row `y`.
    pub fn included(&mut self, y: usize, update: &RegisterUpdate) {
        self.resolution(format_args!("Included {} {:?} {}", y, update.kind, update));
    }

    /// Record a deferred update that never made it into the code.
    pub fn unused(&mut self, update: &RegisterUpdate) {
        self.resolution(format_args!("Unused {:?} {}", update.kind, update));
    }

    /// Close the log with the total of free cycles.
    pub fn finish(self, total_free_cycles: i32) -> String {
        format!(
            "{}free cycles = {}\n\nResolutions:\n{}",
            self.table, total_free_cycles, self.resolutions
        )
    }
}

fn slots(row: &[ColorSlot]) -> String {
    row.iter().map(ToString::to_string).collect()
}
