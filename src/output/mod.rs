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

//! Output module for the speedcode generator.
//!
//! This module handles writing generated speedcode to disk:
//! - PRG files (load address `$1000` followed by the code)
//! - Raw binaries (the code only)

mod prg;

pub use prg::{read_prg, write_prg, write_prg_with_address};

use std::path::Path;

/// Determine the output format from a file extension.
pub fn format_from_extension(path: &Path) -> Option<OutputFormat> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "prg" => Some(OutputFormat::Prg),
        "bin" => Some(OutputFormat::Bin),
        _ => None,
    }
}

/// The output format for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// PRG file (program with load address).
    Prg,
    /// Raw binary without load address.
    Bin,
}

/// Write generated code to a file in the specified format.
pub fn write_output(code: &[u8], path: &Path, format: OutputFormat) -> std::io::Result<()> {
    match format {
        OutputFormat::Prg => write_prg(code, path),
        OutputFormat::Bin => std::fs::write(path, code),
    }
}
