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

//! Perceptual cost of showing different colours than the picture asks for.
//!
//! When a row cannot fit all of its writes, the conflict resolver drops or
//! postpones the write whose absence hurts the picture least. How much it
//! hurts is answered by a [`ColorDistance`].

use crate::codegen::colors::{BugRow, ColorTables};

/// C64 palette: 16 colours indexed 0-15 in ARGB32 format (VICE PAL).
pub const PALETTE: [u32; 16] = [
    0xFF00_0000, // 0: Black
    0xFFFF_FFFF, // 1: White
    0xFF88_3932, // 2: Red
    0xFF67_B6BD, // 3: Cyan
    0xFF8B_3F96, // 4: Purple
    0xFF55_A049, // 5: Green
    0xFF40_318D, // 6: Blue
    0xFFBF_CE72, // 7: Yellow
    0xFF8B_5429, // 8: Orange
    0xFF57_4200, // 9: Brown
    0xFFB8_6962, // 10: Light Red
    0xFF50_5050, // 11: Dark Grey
    0xFF78_7878, // 12: Medium Grey
    0xFF94_E089, // 13: Light Green
    0xFF78_68C0, // 14: Light Blue
    0xFF9F_9F9F, // 15: Light Grey
];

/// Scores candidate colour arrangements against the intended picture.
/// Lower is better.
pub trait ColorDistance {
    /// Cost of showing `slots` in the bug section of attribute row
    /// `section_y`.
    fn bug_section_distance(&self, section_y: usize, slots: BugRow) -> u32;

    /// Cost of showing `underlay` behind underlay `column` on screen row
    /// `screen_y`.
    fn mid_section_distance(&self, screen_y: usize, column: usize, underlay: u8) -> u32;
}

/// Distance against the target colour tables of a frame, measured in RGB
/// space over the palette. Slots the picture does not use cost nothing.
#[derive(Debug, Clone)]
pub struct PaletteDistance {
    reference: ColorTables,
    distances: [[u32; 16]; 16],
}

impl PaletteDistance {
    pub fn new(reference: ColorTables) -> Self {
        let mut distances = [[0; 16]; 16];
        for (i, row) in distances.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = rgb_distance(PALETTE[i], PALETTE[j]);
            }
        }
        Self {
            reference,
            distances,
        }
    }

    /// Distance between two palette colours.
    pub fn color_distance(&self, a: u8, b: u8) -> u32 {
        self.distances[usize::from(a & 0x0F)][usize::from(b & 0x0F)]
    }
}

impl ColorDistance for PaletteDistance {
    fn bug_section_distance(&self, section_y: usize, slots: BugRow) -> u32 {
        let wanted = self.reference.bug_row(section_y);
        wanted
            .iter()
            .zip(slots.iter())
            .filter(|(wanted, _)| wanted.is_set())
            .map(|(wanted, shown)| self.color_distance(wanted.color(), shown.color()))
            .sum()
    }

    fn mid_section_distance(&self, screen_y: usize, column: usize, underlay: u8) -> u32 {
        let wanted = self.reference.underlay(screen_y, column);
        if wanted.is_set() {
            self.color_distance(wanted.color(), underlay)
        } else {
            0
        }
    }
}

fn rgb_distance(a: u32, b: u32) -> u32 {
    let channel = |color: u32, shift: u32| ((color >> shift) & 0xFF) as i32;
    let squared: i32 = [16, 8, 0]
        .iter()
        .map(|&shift| {
            let d = channel(a, shift) - channel(b, shift);
            d * d
        })
        .sum();
    f64::from(squared).sqrt().round() as u32
}
