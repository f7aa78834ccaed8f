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

//! NUFLIX Speedcode CLI
//!
//! Generates the display speedcode for a NUFLIX frame.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use nuflix_speedcode::codegen::emit::SlowValues;
use nuflix_speedcode::codegen::{GeneratedCode, GenerationOptions};
use nuflix_speedcode::error::{format_error, FrameError};
use nuflix_speedcode::frame::Frame;
use nuflix_speedcode::output::{format_from_extension, write_output};

/// NUFLIX Speedcode - cycle-exact raster code for the Commodore 64
#[derive(Parser, Debug)]
#[command(name = "nuflix-speedcode")]
#[command(author = "Marcel Joachim Kloubert")]
#[command(version)]
#[command(about = "Generates the display speedcode of a NUFLIX picture")]
#[command(long_about = r#"
Reads a frame description (bug, underlay and border colours as JSON) and
generates the speedcode that shows it on a Commodore 64.

The output can be either:
  - PRG files (.prg) - Code with a load address of $1000
  - BIN files (.bin) - Raw code

Example usage:
  nuflix-speedcode picture.json -o speedcode.prg
  nuflix-speedcode picture.json -o speedcode.bin --ntsc --no-pad
  nuflix-speedcode picture.json -o speedcode.prg --log speedcode.log
"#)]
struct Cli {
    /// Frame description (.json)
    input: PathBuf,

    /// Output file (.prg or .bin)
    #[arg(short, long)]
    output: PathBuf,

    /// Write the code re-timed for NTSC machines
    #[arg(long)]
    ntsc: bool,

    /// Do not pad the code to the size of its slot
    #[arg(long)]
    no_pad: bool,

    /// Write the generation log to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Slow load values (.json object mapping value to zero page address)
    #[arg(long)]
    slow_values: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = match format_from_extension(&cli.output) {
        Some(f) => f,
        None => {
            eprintln!("Error: Unknown output format. Use .prg or .bin extension.");
            return ExitCode::from(2);
        }
    };

    if cli.verbose {
        println!("{} v{}", nuflix_speedcode::NAME, nuflix_speedcode::VERSION);
        println!("Output format: {:?}", format);
        println!("Output: {}", cli.output.display());
        println!("Input: {}", cli.input.display());
        println!();
    }

    if cli.verbose {
        println!("Reading {}...", cli.input.display());
    }
    let frame = match Frame::load(&cli.input) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Error: Cannot read {}: {}", cli.input.display(), e);
            return ExitCode::from(3);
        }
    };

    let slow_values = match &cli.slow_values {
        Some(path) => match load_slow_values(path) {
            Ok(values) => values,
            Err(e) => {
                eprintln!("Error: Cannot read {}: {}", path.display(), e);
                return ExitCode::from(3);
            }
        },
        None => SlowValues::default(),
    };

    if cli.verbose {
        println!("Generating...");
    }
    let options = GenerationOptions {
        log: cli.log.is_some(),
    };
    let generated = match nuflix_speedcode::generate_from_frame(&frame, &slow_values, options) {
        Ok(generated) => generated,
        Err(e) => {
            eprint!("{}", format_error(&e));
            return ExitCode::from(1);
        }
    };
    report_diagnostics(&generated);

    let code = if cli.ntsc {
        match generated.ntsc_code() {
            Ok(code) => code,
            Err(e) => {
                eprint!("{}", format_error(&e));
                return ExitCode::from(1);
            }
        }
    } else {
        generated.code.clone()
    };
    let code = if cli.no_pad {
        code
    } else {
        nuflix_speedcode::codegen::pad_code(&code)
    };

    if cli.verbose {
        println!("Generated {} bytes of code", generated.code.len());
        println!("Free cycles: {}", generated.total_free_cycles());
        println!("Initial X/Y: ${:02x}/${:02x}", generated.init_x, generated.init_y);
        if let Some(address) = generated.bank_change_address {
            println!("Bank switch operand at ${:04x}", address);
        }
        println!("Writing {}...", cli.output.display());
    }

    if let Err(e) = write_output(&code, &cli.output, format) {
        eprintln!("Error: Cannot write {}: {}", cli.output.display(), e);
        return ExitCode::from(1);
    }

    if let (Some(path), Some(log)) = (&cli.log, &generated.log) {
        if let Err(e) = std::fs::write(path, log) {
            eprintln!("Error: Cannot write {}: {}", path.display(), e);
            return ExitCode::from(1);
        }
    }

    if cli.verbose {
        println!("Done!");
    } else {
        println!(
            "Generated {} -> {}",
            cli.input.file_name().unwrap_or_default().to_string_lossy(),
            cli.output.display()
        );
    }

    ExitCode::SUCCESS
}

fn load_slow_values(path: &std::path::Path) -> Result<SlowValues, FrameError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Print what generation could not achieve. None of it is fatal.
fn report_diagnostics(generated: &GeneratedCode) {
    let diagnostics = &generated.diagnostics;
    for line in diagnostics.unresolved.lines() {
        eprintln!("warning: {}", line);
    }
    for update in &diagnostics.dropped_updates {
        eprintln!("warning: deferred update never written: {}", update);
    }
    if diagnostics.sprite_move_failed {
        eprintln!("warning: not all sprites could be moved below the split");
    }
    if diagnostics.oversized {
        eprintln!(
            "warning: speedcode size too big: {} bytes",
            generated.code.len()
        );
    }
}
