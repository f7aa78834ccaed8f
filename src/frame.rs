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

//! Frame descriptions.
//!
//! A frame is everything the speedcode needs to know about a converted
//! image: the sprite colour tables, the border colour of every attribute
//! row and the background colours above and below the split.
//!
//! Frames are exchanged as JSON. Colour slots are bytes holding the colour
//! in the low nibble, with bit 4 set when the slot is unused on its row.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codegen::colors::{BugRow, ColorSlot, ColorTables, UnderlayRow};
use crate::codegen::constants::{
    ATTRIBUTE_HEIGHT, BUG_COLOR_SLOTS, SCREEN_HEIGHT, UNDERLAY_COLUMNS,
};
use crate::error::{CodegenError, ErrorCode, FrameError};

/// Colour layout of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Bug colour slots, one row per attribute row.
    pub bug_colors: Vec<BugRow>,
    /// Underlay colours, one row per screen row.
    pub underlay_colors: Vec<UnderlayRow>,
    /// Border colour of every attribute row plus the row below the picture.
    pub border_colors: Vec<u8>,
    /// Background colour at the top of the picture.
    pub top_background: u8,
    /// Background colour from the sprite split downwards.
    pub bottom_background: u8,
}

impl Frame {
    /// An all-black frame with every slot visible.
    pub fn blank() -> Self {
        Self {
            bug_colors: vec![[ColorSlot::Set(0); BUG_COLOR_SLOTS]; ATTRIBUTE_HEIGHT],
            underlay_colors: vec![[ColorSlot::Set(0); UNDERLAY_COLUMNS]; SCREEN_HEIGHT],
            border_colors: vec![0; ATTRIBUTE_HEIGHT + 1],
            top_background: 0,
            bottom_background: 0,
        }
    }

    /// Check that the tables match the screen geometry.
    pub fn validate(&self) -> Result<(), CodegenError> {
        let checks = [
            ("bug_colors", self.bug_colors.len(), ATTRIBUTE_HEIGHT),
            ("underlay_colors", self.underlay_colors.len(), SCREEN_HEIGHT),
            ("border_colors", self.border_colors.len(), ATTRIBUTE_HEIGHT + 1),
        ];
        for (name, actual, expected) in checks {
            if actual != expected {
                return Err(CodegenError::new(
                    ErrorCode::InvalidFrame,
                    format!("{} has {} rows, expected {}", name, actual, expected),
                ));
            }
        }
        if let Some(row) = self.border_colors.iter().position(|&c| c > 0x0F) {
            return Err(CodegenError::new(
                ErrorCode::InvalidFrame,
                format!("border colour of row {} is not a palette index", row),
            ));
        }
        if self.top_background > 0x0F || self.bottom_background > 0x0F {
            return Err(CodegenError::new(
                ErrorCode::InvalidFrame,
                "background colour is not a palette index",
            ));
        }
        Ok(())
    }

    /// Colour tables of this frame.
    pub fn color_tables(&self) -> Result<ColorTables, CodegenError> {
        self.validate()?;
        ColorTables::new(self.bug_colors.clone(), self.underlay_colors.clone()).ok_or_else(|| {
            CodegenError::new(ErrorCode::InvalidFrame, "colour tables have the wrong size")
        })
    }

    /// Parse and validate a frame from JSON text.
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        let frame: Frame = serde_json::from_str(text)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Load and validate a frame from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FrameError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize this frame as JSON.
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}
