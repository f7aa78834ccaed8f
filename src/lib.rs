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

//! NUFLIX Speedcode Library
//!
//! This library generates the speedcode that displays a NUFLIX picture on
//! the Commodore 64: a straight run of loads and stores that rewrites the
//! VIC colour, pointer and sprite registers in lockstep with the raster
//! beam, plus the patches that re-time it for NTSC machines.
//!
//! # Modules
//!
//! - [`error`] - Error types and error reporting
//! - [`frame`] - Input frame description (colour tables)
//! - [`distance`] - Colour distance used when writes have to be dropped
//! - [`codegen`] - Update planning, row scheduling and code emission
//! - [`output`] - PRG and raw binary file writing
//!
//! # Example
//!
//! ```no_run
//! use nuflix_speedcode::{codegen, frame::Frame, output};
//! use std::path::Path;
//!
//! fn build(input: &Path, output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the picture's colour tables
//!     let frame = Frame::load(input)?;
//!
//!     // Generate speedcode
//!     let generated = nuflix_speedcode::generate_from_frame(
//!         &frame,
//!         &codegen::emit::SlowValues::default(),
//!         codegen::GenerationOptions::default(),
//!     )?;
//!
//!     // Write output
//!     output::write_prg(&generated.padded_code(), output_path)?;
//!
//!     Ok(())
//! }
//! ```

pub mod codegen;
pub mod distance;
pub mod error;
pub mod frame;
pub mod output;

// Re-export commonly used types
pub use codegen::{generate, GeneratedCode, GenerationOptions};
pub use distance::{ColorDistance, PaletteDistance};
pub use error::{format_error, CodegenError, ErrorCode, Result};
pub use frame::Frame;

/// The version of the generator.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the generator.
pub const NAME: &str = "NUFLIX Speedcode";

/// Generate the speedcode for a frame.
///
/// This is the main entry point. It plans the register updates the frame
/// needs and schedules them, measuring dropped writes against the frame's
/// own colours.
///
/// # Example
///
/// ```no_run
/// use nuflix_speedcode::{codegen::emit::SlowValues, Frame, GenerationOptions};
///
/// let frame = Frame::blank();
/// match nuflix_speedcode::generate_from_frame(&frame, &SlowValues::default(), GenerationOptions::default()) {
///     Ok(generated) => println!("Generated {} bytes of code", generated.code.len()),
///     Err(e) => eprintln!("Generation error: {}", e),
/// }
/// ```
pub fn generate_from_frame(
    frame: &Frame,
    slow_values: &codegen::emit::SlowValues,
    options: GenerationOptions,
) -> Result<GeneratedCode> {
    frame.validate()?;
    let tables = frame.color_tables()?;
    let plan = codegen::planner::plan_updates(frame);
    let distance = PaletteDistance::new(tables.clone());
    codegen::generate(&plan, &tables, slow_values, &distance, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "NUFLIX Speedcode");
    }

    #[test]
    fn test_generate_from_blank_frame() {
        let generated = generate_from_frame(
            &Frame::blank(),
            &codegen::emit::SlowValues::default(),
            GenerationOptions::default(),
        )
        .unwrap();
        assert!(generated.code.len() <= codegen::constants::CODE_SIZE_LIMIT);
        assert!(!generated.diagnostics.oversized);
    }
}
