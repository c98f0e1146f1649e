//! # Opcode table
//!
//! Dense 256-entry table indexed by the opcode byte. The 151 documented NMOS
//! 6502 opcodes carry their published byte length, base cycle cost and the
//! status flags they affect. Every other byte holds the `UNDEFINED` sentinel,
//! which `OpCode::decode` reports as `NesError::UnimplementedOpcode`.

use crate::flags::StatusFlags;
use crate::{NesError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    /// Undocumented byte; never executed.
    Illegal,
}

impl Operation {
    pub const fn mnemonic(self) -> &'static str {
        use Operation::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Illegal => "???",
        }
    }

    /// The execution behavior family this operation dispatches to.
    pub const fn behavior(self) -> Behavior {
        use Operation::*;
        match self {
            Lda | Ldx | Ldy => Behavior::Load,
            Sta | Stx | Sty => Behavior::Store,
            Tax | Tay | Tsx | Txa | Txs | Tya => Behavior::Transfer,
            Pha | Php | Pla | Plp => Behavior::Stack,
            Adc | Sbc => Behavior::Arithmetic,
            And | Ora | Eor => Behavior::Logical,
            Bit => Behavior::BitTest,
            Cmp | Cpx | Cpy => Behavior::Compare,
            Inc | Inx | Iny | Dec | Dex | Dey => Behavior::IncrementDecrement,
            Asl | Lsr | Rol | Ror => Behavior::Shift,
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => Behavior::Branch,
            Jmp | Jsr | Rts | Rti | Brk => Behavior::Control,
            Clc | Cld | Cli | Clv => Behavior::ClearFlag,
            Sec | Sed | Sei => Behavior::SetFlag,
            Nop => Behavior::Nop,
            Illegal => Behavior::Undefined,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressMode {
    /// Instruction length including the opcode byte.
    pub const fn bytes(self) -> u8 {
        use AddressMode::*;
        match self {
            Implied | Accumulator => 1,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndirectX | IndirectY | Relative => 2,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 3,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Behavior {
    Load,
    Store,
    Transfer,
    Stack,
    Arithmetic,
    Logical,
    BitTest,
    Compare,
    IncrementDecrement,
    Shift,
    Branch,
    Control,
    SetFlag,
    ClearFlag,
    Nop,
    Undefined,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpCode {
    pub code: u8,
    pub operation: Operation,
    pub mode: AddressMode,
    pub bytes: u8,
    pub cycles: u8,
    pub affects: StatusFlags,
    pub behavior: Behavior,
}

impl OpCode {
    const UNDEFINED: OpCode = OpCode {
        code: 0,
        operation: Operation::Illegal,
        mode: AddressMode::Implied,
        bytes: 1,
        cycles: 0,
        affects: StatusFlags::empty(),
        behavior: Behavior::Undefined,
    };

    const fn new(
        code: u8,
        operation: Operation,
        mode: AddressMode,
        cycles: u8,
        affects: StatusFlags,
    ) -> Self {
        OpCode {
            code,
            operation,
            mode,
            bytes: mode.bytes(),
            cycles,
            affects,
            behavior: operation.behavior(),
        }
    }

    /// Looks up a documented opcode.
    ///
    /// `address` is only used to report where an undocumented byte was found.
    pub fn decode(code: u8, address: u16) -> Result<&'static OpCode> {
        let opcode = &OPCODES[code as usize];
        if opcode.is_defined() {
            Ok(opcode)
        } else {
            Err(NesError::UnimplementedOpcode {
                opcode: code,
                address,
            })
        }
    }

    pub fn is_defined(&self) -> bool {
        self.behavior != Behavior::Undefined
    }
}

pub static OPCODES: [OpCode; 256] = build_table();

const fn build_table() -> [OpCode; 256] {
    use AddressMode::*;
    use Operation::*;

    const NONE: StatusFlags = StatusFlags::empty();
    const NZ: StatusFlags = StatusFlags::NZ;
    const NZC: StatusFlags = StatusFlags::NZC;
    const NVZC: StatusFlags = StatusFlags::NVZC;
    const NVZ: StatusFlags = StatusFlags::NVZ;
    const ALL: StatusFlags = StatusFlags::all();
    const C: StatusFlags = StatusFlags::CARRY;
    const D: StatusFlags = StatusFlags::DECIMAL;
    const I: StatusFlags = StatusFlags::INTERRUPT_DISABLE;
    const V: StatusFlags = StatusFlags::OVERFLOW;
    const BI: StatusFlags = StatusFlags::BREAK.union(StatusFlags::INTERRUPT_DISABLE);

    // (code, operation, mode, cycles, affected flags)
    const DOCUMENTED: [(u8, Operation, AddressMode, u8, StatusFlags); 151] = [
        // Loads
        (0xA9, Lda, Immediate, 2, NZ),
        (0xA5, Lda, ZeroPage, 3, NZ),
        (0xB5, Lda, ZeroPageX, 4, NZ),
        (0xAD, Lda, Absolute, 4, NZ),
        (0xBD, Lda, AbsoluteX, 4, NZ),
        (0xB9, Lda, AbsoluteY, 4, NZ),
        (0xA1, Lda, IndirectX, 6, NZ),
        (0xB1, Lda, IndirectY, 5, NZ),
        (0xA2, Ldx, Immediate, 2, NZ),
        (0xA6, Ldx, ZeroPage, 3, NZ),
        (0xB6, Ldx, ZeroPageY, 4, NZ),
        (0xAE, Ldx, Absolute, 4, NZ),
        (0xBE, Ldx, AbsoluteY, 4, NZ),
        (0xA0, Ldy, Immediate, 2, NZ),
        (0xA4, Ldy, ZeroPage, 3, NZ),
        (0xB4, Ldy, ZeroPageX, 4, NZ),
        (0xAC, Ldy, Absolute, 4, NZ),
        (0xBC, Ldy, AbsoluteX, 4, NZ),
        // Stores
        (0x85, Sta, ZeroPage, 3, NONE),
        (0x95, Sta, ZeroPageX, 4, NONE),
        (0x8D, Sta, Absolute, 4, NONE),
        (0x9D, Sta, AbsoluteX, 5, NONE),
        (0x99, Sta, AbsoluteY, 5, NONE),
        (0x81, Sta, IndirectX, 6, NONE),
        (0x91, Sta, IndirectY, 6, NONE),
        (0x86, Stx, ZeroPage, 3, NONE),
        (0x96, Stx, ZeroPageY, 4, NONE),
        (0x8E, Stx, Absolute, 4, NONE),
        (0x84, Sty, ZeroPage, 3, NONE),
        (0x94, Sty, ZeroPageX, 4, NONE),
        (0x8C, Sty, Absolute, 4, NONE),
        // Register moves
        (0xAA, Tax, Implied, 2, NZ),
        (0xA8, Tay, Implied, 2, NZ),
        (0xBA, Tsx, Implied, 2, NZ),
        (0x8A, Txa, Implied, 2, NZ),
        (0x9A, Txs, Implied, 2, NONE),
        (0x98, Tya, Implied, 2, NZ),
        // Stack operations
        (0x48, Pha, Implied, 3, NONE),
        (0x08, Php, Implied, 3, NONE),
        (0x68, Pla, Implied, 4, NZ),
        (0x28, Plp, Implied, 4, ALL),
        // Arithmetic
        (0x69, Adc, Immediate, 2, NVZC),
        (0x65, Adc, ZeroPage, 3, NVZC),
        (0x75, Adc, ZeroPageX, 4, NVZC),
        (0x6D, Adc, Absolute, 4, NVZC),
        (0x7D, Adc, AbsoluteX, 4, NVZC),
        (0x79, Adc, AbsoluteY, 4, NVZC),
        (0x61, Adc, IndirectX, 6, NVZC),
        (0x71, Adc, IndirectY, 5, NVZC),
        (0xE9, Sbc, Immediate, 2, NVZC),
        (0xE5, Sbc, ZeroPage, 3, NVZC),
        (0xF5, Sbc, ZeroPageX, 4, NVZC),
        (0xED, Sbc, Absolute, 4, NVZC),
        (0xFD, Sbc, AbsoluteX, 4, NVZC),
        (0xF9, Sbc, AbsoluteY, 4, NVZC),
        (0xE1, Sbc, IndirectX, 6, NVZC),
        (0xF1, Sbc, IndirectY, 5, NVZC),
        // Bitwise operations
        (0x29, And, Immediate, 2, NZ),
        (0x25, And, ZeroPage, 3, NZ),
        (0x35, And, ZeroPageX, 4, NZ),
        (0x2D, And, Absolute, 4, NZ),
        (0x3D, And, AbsoluteX, 4, NZ),
        (0x39, And, AbsoluteY, 4, NZ),
        (0x21, And, IndirectX, 6, NZ),
        (0x31, And, IndirectY, 5, NZ),
        (0x09, Ora, Immediate, 2, NZ),
        (0x05, Ora, ZeroPage, 3, NZ),
        (0x15, Ora, ZeroPageX, 4, NZ),
        (0x0D, Ora, Absolute, 4, NZ),
        (0x1D, Ora, AbsoluteX, 4, NZ),
        (0x19, Ora, AbsoluteY, 4, NZ),
        (0x01, Ora, IndirectX, 6, NZ),
        (0x11, Ora, IndirectY, 5, NZ),
        (0x49, Eor, Immediate, 2, NZ),
        (0x45, Eor, ZeroPage, 3, NZ),
        (0x55, Eor, ZeroPageX, 4, NZ),
        (0x4D, Eor, Absolute, 4, NZ),
        (0x5D, Eor, AbsoluteX, 4, NZ),
        (0x59, Eor, AbsoluteY, 4, NZ),
        (0x41, Eor, IndirectX, 6, NZ),
        (0x51, Eor, IndirectY, 5, NZ),
        (0x24, Bit, ZeroPage, 3, NVZ),
        (0x2C, Bit, Absolute, 4, NVZ),
        // Comparisons
        (0xC9, Cmp, Immediate, 2, NZC),
        (0xC5, Cmp, ZeroPage, 3, NZC),
        (0xD5, Cmp, ZeroPageX, 4, NZC),
        (0xCD, Cmp, Absolute, 4, NZC),
        (0xDD, Cmp, AbsoluteX, 4, NZC),
        (0xD9, Cmp, AbsoluteY, 4, NZC),
        (0xC1, Cmp, IndirectX, 6, NZC),
        (0xD1, Cmp, IndirectY, 5, NZC),
        (0xE0, Cpx, Immediate, 2, NZC),
        (0xE4, Cpx, ZeroPage, 3, NZC),
        (0xEC, Cpx, Absolute, 4, NZC),
        (0xC0, Cpy, Immediate, 2, NZC),
        (0xC4, Cpy, ZeroPage, 3, NZC),
        (0xCC, Cpy, Absolute, 4, NZC),
        // Increments and decrements
        (0xE6, Inc, ZeroPage, 5, NZ),
        (0xF6, Inc, ZeroPageX, 6, NZ),
        (0xEE, Inc, Absolute, 6, NZ),
        (0xFE, Inc, AbsoluteX, 7, NZ),
        (0xC6, Dec, ZeroPage, 5, NZ),
        (0xD6, Dec, ZeroPageX, 6, NZ),
        (0xCE, Dec, Absolute, 6, NZ),
        (0xDE, Dec, AbsoluteX, 7, NZ),
        (0xE8, Inx, Implied, 2, NZ),
        (0xC8, Iny, Implied, 2, NZ),
        (0xCA, Dex, Implied, 2, NZ),
        (0x88, Dey, Implied, 2, NZ),
        // Shifts and rotates
        (0x0A, Asl, Accumulator, 2, NZC),
        (0x06, Asl, ZeroPage, 5, NZC),
        (0x16, Asl, ZeroPageX, 6, NZC),
        (0x0E, Asl, Absolute, 6, NZC),
        (0x1E, Asl, AbsoluteX, 7, NZC),
        (0x4A, Lsr, Accumulator, 2, NZC),
        (0x46, Lsr, ZeroPage, 5, NZC),
        (0x56, Lsr, ZeroPageX, 6, NZC),
        (0x4E, Lsr, Absolute, 6, NZC),
        (0x5E, Lsr, AbsoluteX, 7, NZC),
        (0x2A, Rol, Accumulator, 2, NZC),
        (0x26, Rol, ZeroPage, 5, NZC),
        (0x36, Rol, ZeroPageX, 6, NZC),
        (0x2E, Rol, Absolute, 6, NZC),
        (0x3E, Rol, AbsoluteX, 7, NZC),
        (0x6A, Ror, Accumulator, 2, NZC),
        (0x66, Ror, ZeroPage, 5, NZC),
        (0x76, Ror, ZeroPageX, 6, NZC),
        (0x6E, Ror, Absolute, 6, NZC),
        (0x7E, Ror, AbsoluteX, 7, NZC),
        // Branches
        (0x10, Bpl, Relative, 2, NONE),
        (0x30, Bmi, Relative, 2, NONE),
        (0x50, Bvc, Relative, 2, NONE),
        (0x70, Bvs, Relative, 2, NONE),
        (0x90, Bcc, Relative, 2, NONE),
        (0xB0, Bcs, Relative, 2, NONE),
        (0xD0, Bne, Relative, 2, NONE),
        (0xF0, Beq, Relative, 2, NONE),
        // Jumps and procedure calls
        (0x4C, Jmp, Absolute, 3, NONE),
        (0x6C, Jmp, Indirect, 5, NONE),
        (0x20, Jsr, Absolute, 6, NONE),
        (0x60, Rts, Implied, 6, NONE),
        (0x00, Brk, Implied, 7, BI),
        (0x40, Rti, Implied, 6, ALL),
        // Flag operations
        (0x18, Clc, Implied, 2, C),
        (0x38, Sec, Implied, 2, C),
        (0x58, Cli, Implied, 2, I),
        (0x78, Sei, Implied, 2, I),
        (0xB8, Clv, Implied, 2, V),
        (0xD8, Cld, Implied, 2, D),
        (0xF8, Sed, Implied, 2, D),
        // No operation
        (0xEA, Nop, Implied, 2, NONE),
    ];

    let mut table = [OpCode::UNDEFINED; 256];
    let mut code = 0;
    while code < 256 {
        table[code].code = code as u8;
        code += 1;
    }

    let mut i = 0;
    while i < DOCUMENTED.len() {
        let (code, operation, mode, cycles, affects) = DOCUMENTED[i];
        table[code as usize] = OpCode::new(code, operation, mode, cycles, affects);
        i += 1;
    }
    table
}
