//! # Addressing modes
//!
//! Turns an instruction's operand byte(s) plus the index registers into an
//! effective operand, and reports the one-cycle penalty some modes take.
//! `pc` always points at the opcode byte; the second operand byte is read
//! from `pc + 2`.

use crate::memory::Memory;
use crate::opcode::AddressMode;
use crate::Result;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub operand: Operand,
    /// Page-cross penalty. For `Relative` it is only owed if the branch is taken.
    pub penalty: u8,
}

impl Resolved {
    fn new(operand: Operand) -> Self {
        Resolved {
            operand,
            penalty: 0,
        }
    }

    fn indexed(base: u16, index: u8) -> Self {
        Resolved {
            operand: Operand::Address(offset(base, index)),
            penalty: cross(base, index) as u8,
        }
    }
}

pub fn resolve<M: Memory>(
    mode: AddressMode,
    pc: u16,
    x: u8,
    y: u8,
    operand: u8,
    bus: &mut M,
) -> Result<Resolved> {
    let resolved = match mode {
        AddressMode::Implied => Resolved::new(Operand::Implied),
        AddressMode::Accumulator => Resolved::new(Operand::Accumulator),
        AddressMode::Immediate => Resolved::new(Operand::Immediate(operand)),
        AddressMode::ZeroPage => Resolved::new(Operand::Address(operand as u16)),
        AddressMode::ZeroPageX => Resolved::new(Operand::Address(low_byte(offset(operand, x)))),
        AddressMode::ZeroPageY => Resolved::new(Operand::Address(low_byte(offset(operand, y)))),
        AddressMode::Absolute => Resolved::new(Operand::Address(absolute(pc, operand, bus)?)),
        AddressMode::AbsoluteX => Resolved::indexed(absolute(pc, operand, bus)?, x),
        AddressMode::AbsoluteY => Resolved::indexed(absolute(pc, operand, bus)?, y),
        AddressMode::Indirect => {
            // The high byte never carries into the next page.
            let i = absolute(pc, operand, bus)?;
            let target = bus.read_noncontinuous_word(i, high_byte(i) | low_byte(i.wrapping_add(1)))?;
            Resolved::new(Operand::Address(target))
        }
        AddressMode::IndirectX => {
            let i = offset(operand, x);
            let target = bus.read_noncontinuous_word(low_byte(i), low_byte(i + 1))?;
            Resolved::new(Operand::Address(target))
        }
        AddressMode::IndirectY => {
            let i = operand as u16;
            let base = bus.read_noncontinuous_word(i, low_byte(i + 1))?;
            Resolved::indexed(base, y)
        }
        AddressMode::Relative => {
            let next = pc.wrapping_add(2);
            let target = next.wrapping_add(operand as i8 as u16);
            Resolved {
                operand: Operand::Address(target),
                penalty: (high_byte(next) != high_byte(target)) as u8,
            }
        }
    };
    Ok(resolved)
}

fn absolute<M: Memory>(pc: u16, lo: u8, bus: &mut M) -> Result<u16> {
    let hi = bus.read(pc.wrapping_add(2))?;
    Ok(u16::from_le_bytes([lo, hi]))
}

fn cross(base: u16, offset: u8) -> bool {
    (base & 0xFF) + offset as u16 > 0xFF
}

fn offset<T: Into<u16>>(base: T, offset: u8) -> u16 {
    base.into().wrapping_add(offset as u16)
}

fn low_byte<T: Into<u16>>(value: T) -> u16 {
    value.into() & 0xFF
}

fn high_byte(value: u16) -> u16 {
    value & 0xFF00
}
