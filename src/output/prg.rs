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

//! PRG file writer.
//!
//! PRG format is very simple:
//! - 2-byte load address (little-endian)
//! - Program data

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::codegen::constants::CODE_BASE_ADDRESS;

/// Write a PRG file loading to the speedcode address.
pub fn write_prg(code: &[u8], path: &Path) -> io::Result<()> {
    write_prg_with_address(code, path, CODE_BASE_ADDRESS)
}

/// Write a PRG file with a custom load address.
pub fn write_prg_with_address(code: &[u8], path: &Path, load_address: u16) -> io::Result<()> {
    let mut file = File::create(path)?;

    // Write load address (little-endian)
    file.write_all(&load_address.to_le_bytes())?;

    // Write program data
    file.write_all(code)?;

    Ok(())
}

/// Read a PRG file and return the load address and code.
pub fn read_prg(path: &Path) -> io::Result<(u16, Vec<u8>)> {
    let data = std::fs::read(path)?;

    if data.len() < 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "PRG file too short",
        ));
    }

    let load_address = u16::from_le_bytes([data[0], data[1]]);
    Ok((load_address, data[2..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_prg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedcode.prg");

        let code = vec![0x8D, 0x11, 0xD0, 0x60]; // STA $D011, RTS
        write_prg(&code, &path).unwrap();

        let (load_addr, read_code) = read_prg(&path).unwrap();
        assert_eq!(load_addr, CODE_BASE_ADDRESS);
        assert_eq!(read_code, code);
    }

    #[test]
    fn test_custom_load_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.prg");

        write_prg_with_address(&[0x60], &path, 0xC000).unwrap();

        let (load_addr, _) = read_prg(&path).unwrap();
        assert_eq!(load_addr, 0xC000);
    }

    #[test]
    fn test_short_prg_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.prg");
        std::fs::write(&path, [0x00]).unwrap();

        let err = read_prg(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
