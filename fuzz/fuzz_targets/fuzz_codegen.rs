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

//! Fuzz target for the complete generation pipeline.
//!
//! Arbitrary colour tables are turned into a frame and run through
//! planning, scheduling, emission and NTSC patching. Generation may fail
//! with an error but must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_codegen
//!
//! Run for a specific duration:
//!   cargo +nightly fuzz run fuzz_codegen -- -max_total_time=60

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nuflix_speedcode::codegen::colors::ColorSlot;
use nuflix_speedcode::codegen::emit::SlowValues;
use nuflix_speedcode::{generate_from_frame, Frame, GenerationOptions};

#[derive(Debug, Arbitrary)]
struct Input {
    bug: Vec<u8>,
    underlay: Vec<u8>,
    border: Vec<u8>,
    backgrounds: (u8, u8),
    full_slow_table: bool,
}

fn slot(byte: u8) -> ColorSlot {
    if byte & 0x10 != 0 {
        ColorSlot::Unused(byte & 0x0f)
    } else {
        ColorSlot::Set(byte & 0x0f)
    }
}

fuzz_target!(|input: Input| {
    let mut frame = Frame::blank();
    for (i, &byte) in input.bug.iter().enumerate().take(400) {
        frame.bug_colors[i / 4][i % 4] = slot(byte);
    }
    for (i, &byte) in input.underlay.iter().enumerate().take(1200) {
        frame.underlay_colors[i / 6][i % 6] = slot(byte);
    }
    for (color, &byte) in frame.border_colors.iter_mut().zip(&input.border) {
        *color = byte & 0x0f;
    }
    frame.top_background = input.backgrounds.0 & 0x0f;
    frame.bottom_background = input.backgrounds.1 & 0x0f;

    let slow_values = if input.full_slow_table {
        let mut values = SlowValues::new();
        for value in 0..=255u8 {
            values.insert(value, value);
        }
        values
    } else {
        SlowValues::default()
    };

    if let Ok(generated) = generate_from_frame(&frame, &slow_values, GenerationOptions { log: true }) {
        let _ = generated.ntsc_code();
        let _ = generated.ntsc_patch_table();
    }
});
