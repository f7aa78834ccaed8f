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

//! The speedcode instruction set.
//!
//! Speedcode is straight-line code built from eight operations: no-op,
//! return, the three immediate loads and the three absolute stores. Every
//! instruction except a store can be stretched by one cycle through an
//! alternate encoding, which is how the scheduler hits odd cycle targets.

use std::fmt;

use super::emit::{EmitHelpers, SlowValues};
use super::mos6510::opcodes;
use crate::error::{CodegenError, ErrorCode, Result};

/// A value held by one of the CPU registers.
///
/// The bank switch value is written as `$03` like any other byte, but it is
/// never interchangeable with a plain `$03`: it has to reach the CIA rather
/// than the VIC, the packaging layer patches its operand at runtime, and a
/// load of it can never be stretched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterValue {
    /// An ordinary byte.
    Byte(u8),
    /// The VIC bank switch, stored to the CIA.
    BankSwitch,
}

impl RegisterValue {
    /// Byte actually emitted for the bank switch value.
    pub const BANK_SWITCH_BYTE: u8 = 0x03;

    /// The byte this value is encoded as.
    pub fn byte(self) -> u8 {
        match self {
            RegisterValue::Byte(value) => value,
            RegisterValue::BankSwitch => Self::BANK_SWITCH_BYTE,
        }
    }

    /// The low nibble, which is all the VIC colour registers look at.
    pub fn nibble(self) -> u8 {
        self.byte() & 0x0F
    }

    /// Whether this is an ordinary byte.
    pub fn is_byte(self) -> bool {
        matches!(self, RegisterValue::Byte(_))
    }
}

impl From<u8> for RegisterValue {
    fn from(value: u8) -> Self {
        RegisterValue::Byte(value)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Byte(value) => write!(f, "{:02x}", value),
            RegisterValue::BankSwitch => write!(f, "bank"),
        }
    }
}

/// One of the three general purpose registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    X,
    Y,
}

impl Register {
    /// Number of registers.
    pub const COUNT: usize = 3;

    /// All registers in index order.
    pub const ALL: [Register; Register::COUNT] = [Register::A, Register::X, Register::Y];

    /// Index of this register in register arrays.
    pub fn index(self) -> usize {
        match self {
            Register::A => 0,
            Register::X => 1,
            Register::Y => 2,
        }
    }
}

/// Speedcode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Nop,
    Rts,
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
}

impl Operation {
    /// The load operation targeting `register`.
    pub fn load(register: Register) -> Self {
        match register {
            Register::A => Operation::Lda,
            Register::X => Operation::Ldx,
            Register::Y => Operation::Ldy,
        }
    }

    /// The store operation reading `register`.
    pub fn store(register: Register) -> Self {
        match register {
            Register::A => Operation::Sta,
            Register::X => Operation::Stx,
            Register::Y => Operation::Sty,
        }
    }

    /// Whether this operation writes to memory.
    pub fn is_store(self) -> bool {
        matches!(self, Operation::Sta | Operation::Stx | Operation::Sty)
    }

    /// Whether this operation loads a register.
    pub fn is_load(self) -> bool {
        matches!(self, Operation::Lda | Operation::Ldx | Operation::Ldy)
    }

    /// Base cycle count, without the extra cycle.
    pub fn base_cycles(self) -> i32 {
        match self {
            Operation::Nop => 2,
            Operation::Rts => 6,
            Operation::Lda | Operation::Ldx | Operation::Ldy => 2,
            Operation::Sta | Operation::Stx | Operation::Sty => 4,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            Operation::Nop => "NOP",
            Operation::Rts => "RTS",
            Operation::Lda => "LDA",
            Operation::Ldx => "LDX",
            Operation::Ldy => "LDY",
            Operation::Sta => "STA",
            Operation::Stx => "STX",
            Operation::Sty => "STY",
        }
    }
}

/// Instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// No operand (NOP, RTS).
    None,
    /// Value loaded into a register.
    Value(RegisterValue),
    /// Address written by a store.
    Address(u16),
}

/// One emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub operation: Operation,
    pub operand: Operand,
    /// Whether the one cycle longer encoding is used.
    pub extra_cycle: bool,
    /// Index correction applied to an extended `STA`.
    pub operand_offset: i16,
}

impl Instruction {
    fn new(operation: Operation, operand: Operand, extra_cycle: bool) -> Self {
        Self {
            operation,
            operand,
            extra_cycle,
            operand_offset: 0,
        }
    }

    /// A two cycle no-op, or a three cycle one when `extra_cycle` is set.
    pub fn nop(extra_cycle: bool) -> Self {
        Self::new(Operation::Nop, Operand::None, extra_cycle)
    }

    /// Return from the speedcode.
    pub fn rts() -> Self {
        Self::new(Operation::Rts, Operand::None, false)
    }

    /// Load `value` into `register`.
    pub fn load(register: Register, value: RegisterValue) -> Self {
        Self::new(Operation::load(register), Operand::Value(value), false)
    }

    /// Store `register` to `address`.
    pub fn store(register: Register, address: u16) -> Self {
        Self::new(Operation::store(register), Operand::Address(address), false)
    }

    /// Cycles taken by this instruction.
    pub fn cycles(&self) -> i32 {
        self.operation.base_cycles() + i32::from(self.extra_cycle)
    }

    /// Encoded length in bytes.
    pub fn byte_length(&self) -> usize {
        match self.operation {
            Operation::Nop => {
                if self.extra_cycle {
                    2
                } else {
                    1
                }
            }
            Operation::Rts => 1,
            Operation::Lda | Operation::Ldx | Operation::Ldy => 2,
            Operation::Sta | Operation::Stx | Operation::Sty => 3,
        }
    }

    /// Whether this instruction writes to memory.
    pub fn is_store(&self) -> bool {
        self.operation.is_store()
    }

    /// Target address if this is a store.
    pub fn store_address(&self) -> Option<u16> {
        match self.operand {
            Operand::Address(address) if self.is_store() => Some(address),
            _ => None,
        }
    }

    /// Loaded value if this is a load.
    pub fn loaded_value(&self) -> Option<RegisterValue> {
        match self.operand {
            Operand::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Switch to the one cycle longer encoding, if this instruction has one
    /// and does not use it yet.
    ///
    /// Stores are never stretched since that would move their write cycle,
    /// and neither is the bank switch load, whose operand gets patched.
    pub fn add_extra_cycle_if_possible(&mut self) -> bool {
        if self.extra_cycle
            || self.is_store()
            || self.operand == Operand::Value(RegisterValue::BankSwitch)
        {
            return false;
        }
        self.extra_cycle = true;
        true
    }

    /// Turn an `STA abs` into an `STA abs,X` that still hits the original
    /// address while `X` holds `x_value`. No-op for other operations.
    pub fn extend_sta(&mut self, x_value: u8) {
        if self.operation != Operation::Sta {
            return;
        }
        self.extra_cycle = true;
        self.operand_offset = -i16::from(x_value);
    }

    /// Append the machine code for this instruction to `code`.
    pub fn emit(&self, code: &mut Vec<u8>, slow_values: &SlowValues) -> Result<()> {
        match (self.operation, self.operand) {
            (Operation::Nop, _) => {
                if self.extra_cycle {
                    code.emit_zp(opcodes::BIT_ZP, 0x00);
                } else {
                    code.emit_byte(opcodes::NOP);
                }
            }
            (Operation::Rts, _) => code.emit_byte(opcodes::RTS),
            (Operation::Lda | Operation::Ldx | Operation::Ldy, Operand::Value(value)) => {
                let (imm, zp) = match self.operation {
                    Operation::Lda => (opcodes::LDA_IMM, opcodes::LDA_ZP),
                    Operation::Ldx => (opcodes::LDX_IMM, opcodes::LDX_ZP),
                    _ => (opcodes::LDY_IMM, opcodes::LDY_ZP),
                };
                if self.extra_cycle {
                    let cell = slow_values.get(value.byte()).ok_or_else(|| {
                        CodegenError::new(
                            ErrorCode::MissingSlowValue,
                            format!("No zero page cell holds ${:02x} for a slow load", value.byte()),
                        )
                        .with_hint("Add the value to the slow value table")
                    })?;
                    code.emit_zp(zp, cell);
                } else {
                    code.emit_imm(imm, value.byte());
                }
            }
            (Operation::Sta, Operand::Address(address)) => {
                let opcode = if self.extra_cycle {
                    opcodes::STA_ABX
                } else {
                    opcodes::STA_ABS
                };
                let target = (i32::from(address) + i32::from(self.operand_offset)) as u16;
                code.emit_abs(opcode, target);
            }
            (Operation::Stx, Operand::Address(address)) => code.emit_abs(opcodes::STX_ABS, address),
            (Operation::Sty, Operand::Address(address)) => code.emit_abs(opcodes::STY_ABS, address),
            (operation, operand) => {
                return Err(CodegenError::new(
                    ErrorCode::InvalidUpdatePlan,
                    format!("{:?} cannot take operand {:?}", operation, operand),
                ))
            }
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.operation.mnemonic();
        match (self.operation, self.operand) {
            (Operation::Nop, _) if self.extra_cycle => write!(f, "BIT $00"),
            (_, Operand::None) => write!(f, "{}", mnemonic),
            (_, Operand::Value(value)) => {
                let slow = if self.extra_cycle { "*" } else { "" };
                match value {
                    RegisterValue::Byte(byte) => write!(f, "{}{} #${:02X}", mnemonic, slow, byte),
                    RegisterValue::BankSwitch => write!(f, "{}{} #<bank>", mnemonic, slow),
                }
            }
            (_, Operand::Address(address)) => {
                if self.extra_cycle {
                    let target = (i32::from(address) + i32::from(self.operand_offset)) as u16;
                    write!(f, "{} ${:04X},X", mnemonic, target)
                } else {
                    write!(f, "{} ${:04X}", mnemonic, address)
                }
            }
        }
    }
}

/// Render an instruction list as one line of assembly, `; ` separated.
pub fn disassemble(code: &[Instruction]) -> String {
    code.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_and_length() {
        assert_eq!(Instruction::nop(false).cycles(), 2);
        assert_eq!(Instruction::nop(true).cycles(), 3);
        assert_eq!(Instruction::nop(true).byte_length(), 2);
        assert_eq!(Instruction::rts().cycles(), 6);
        assert_eq!(Instruction::load(Register::X, 0x12u8.into()).cycles(), 2);
        assert_eq!(Instruction::store(Register::Y, 0xD020).cycles(), 4);
        assert_eq!(Instruction::store(Register::Y, 0xD020).byte_length(), 3);
    }

    #[test]
    fn test_stores_cannot_be_stretched() {
        let mut store = Instruction::store(Register::A, 0xD021);
        assert!(!store.add_extra_cycle_if_possible());
        assert_eq!(store.cycles(), 4);
    }

    #[test]
    fn test_bank_switch_load_cannot_be_stretched() {
        let mut load = Instruction::load(Register::A, RegisterValue::BankSwitch);
        assert!(!load.add_extra_cycle_if_possible());
    }

    #[test]
    fn test_stretch_only_once() {
        let mut load = Instruction::load(Register::A, 0x05u8.into());
        assert!(load.add_extra_cycle_if_possible());
        assert!(!load.add_extra_cycle_if_possible());
        assert_eq!(load.cycles(), 3);
    }

    #[test]
    fn test_emit_slow_load_uses_zero_page() {
        let mut slow = SlowValues::new();
        slow.insert(0x05, 0xD6);
        let mut load = Instruction::load(Register::Y, 0x05u8.into());
        load.add_extra_cycle_if_possible();
        let mut code = Vec::new();
        load.emit(&mut code, &slow).unwrap();
        assert_eq!(code, vec![0xA4, 0xD6]);
    }

    #[test]
    fn test_emit_slow_load_without_cell_fails() {
        let mut load = Instruction::load(Register::A, 0x99u8.into());
        load.add_extra_cycle_if_possible();
        let mut code = Vec::new();
        let error = load.emit(&mut code, &SlowValues::new()).unwrap_err();
        assert_eq!(error.code, ErrorCode::MissingSlowValue);
    }

    #[test]
    fn test_extend_sta_keeps_effective_address() {
        let mut store = Instruction::store(Register::A, 0xD011);
        store.extend_sta(0x03);
        let mut code = Vec::new();
        store.emit(&mut code, &SlowValues::new()).unwrap();
        assert_eq!(code, vec![0x9D, 0x0E, 0xD0]);
        assert_eq!(store.cycles(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::load(Register::A, 0x38u8.into()).to_string(), "LDA #$38");
        assert_eq!(Instruction::store(Register::X, 0xD02D).to_string(), "STX $D02D");
        assert_eq!(Instruction::nop(true).to_string(), "BIT $00");
        assert_eq!(
            Instruction::load(Register::Y, RegisterValue::BankSwitch).to_string(),
            "LDY #<bank>"
        );
    }
}
