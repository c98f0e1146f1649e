//! # Instruction behaviors
//!
//! One function per operation family. Each consumes the resolved operand,
//! mutates registers and memory, applies flags through the opcode's
//! `affects` mask and reports the extra cycles it owes.

use crate::addressing::{self, Operand, Resolved};
use crate::cpu::{Cpu, Interrupt};
use crate::flags::StatusFlags;
use crate::memory::Memory;
use crate::opcode::{Behavior, OpCode, Operation};
use crate::{NesError, Result};

/// Who moves `pc` after the instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    /// The engine advances `pc` by the opcode's length.
    Next,
    /// The behavior already set `pc`.
    Jump,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub penalty: u8,
    pub flow: Flow,
}

impl Outcome {
    const NEXT: Outcome = Outcome {
        penalty: 0,
        flow: Flow::Next,
    };

    const JUMP: Outcome = Outcome {
        penalty: 0,
        flow: Flow::Jump,
    };

    fn next(penalty: u8) -> Self {
        Outcome {
            penalty,
            flow: Flow::Next,
        }
    }
}

pub fn execute<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, operand: u8) -> Result<Outcome> {
    let resolved = addressing::resolve(opcode.mode, cpu.pc, cpu.x, cpu.y, operand, &mut cpu.bus)?;

    match opcode.behavior {
        Behavior::Load => load(cpu, opcode, resolved),
        Behavior::Store => store(cpu, opcode, resolved),
        Behavior::Transfer => transfer(cpu, opcode, resolved),
        Behavior::Stack => stack(cpu, opcode, resolved),
        Behavior::Arithmetic => arithmetic(cpu, opcode, resolved),
        Behavior::Logical => logical(cpu, opcode, resolved),
        Behavior::BitTest => bit(cpu, opcode, resolved),
        Behavior::Compare => compare(cpu, opcode, resolved),
        Behavior::IncrementDecrement => increment_decrement(cpu, opcode, resolved),
        Behavior::Shift => shift(cpu, opcode, resolved),
        Behavior::Branch => branch(cpu, opcode, resolved),
        Behavior::Control => control(cpu, opcode, resolved),
        Behavior::SetFlag => {
            implied(opcode, resolved)?;
            cpu.p.insert(opcode.affects);
            Ok(Outcome::NEXT)
        }
        Behavior::ClearFlag => {
            implied(opcode, resolved)?;
            cpu.p.remove(opcode.affects);
            Ok(Outcome::NEXT)
        }
        Behavior::Nop => Ok(Outcome::NEXT),
        Behavior::Undefined => Err(NesError::UnimplementedOpcode {
            opcode: opcode.code,
            address: cpu.pc,
        }),
    }
}

fn unsupported(opcode: &OpCode) -> NesError {
    NesError::UnsupportedAddressing {
        operation: opcode.operation,
        mode: opcode.mode,
    }
}

fn implied(opcode: &OpCode, resolved: Resolved) -> Result<()> {
    match resolved.operand {
        Operand::Implied => Ok(()),
        _ => Err(unsupported(opcode)),
    }
}

fn address(opcode: &OpCode, resolved: Resolved) -> Result<u16> {
    match resolved.operand {
        Operand::Address(address) => Ok(address),
        _ => Err(unsupported(opcode)),
    }
}

fn read_operand<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<u8> {
    match resolved.operand {
        Operand::Immediate(value) => Ok(value),
        Operand::Address(address) => cpu.bus.read(address),
        Operand::Accumulator => Ok(cpu.a),
        Operand::Implied => Err(unsupported(opcode)),
    }
}

fn load<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let operand = read_operand(cpu, opcode, resolved)?;
    match opcode.operation {
        Operation::Lda => cpu.a = operand,
        Operation::Ldx => cpu.x = operand,
        Operation::Ldy => cpu.y = operand,
        _ => return Err(unsupported(opcode)),
    }
    cpu.apply_flags(opcode.affects, StatusFlags::zero_negative(operand));
    Ok(Outcome::next(resolved.penalty))
}

/// Stores never take the page-cross penalty; their base cost includes it.
fn store<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let address = address(opcode, resolved)?;
    let value = match opcode.operation {
        Operation::Sta => cpu.a,
        Operation::Stx => cpu.x,
        Operation::Sty => cpu.y,
        _ => return Err(unsupported(opcode)),
    };
    cpu.bus.write(address, value)?;
    Ok(Outcome::NEXT)
}

fn transfer<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    implied(opcode, resolved)?;
    let result = match opcode.operation {
        Operation::Tax => {
            cpu.x = cpu.a;
            cpu.x
        }
        Operation::Tay => {
            cpu.y = cpu.a;
            cpu.y
        }
        Operation::Tsx => {
            cpu.x = cpu.sp();
            cpu.x
        }
        Operation::Txa => {
            cpu.a = cpu.x;
            cpu.a
        }
        Operation::Txs => {
            cpu.set_stack_offset(cpu.x);
            cpu.x
        }
        Operation::Tya => {
            cpu.a = cpu.y;
            cpu.a
        }
        _ => return Err(unsupported(opcode)),
    };
    cpu.apply_flags(opcode.affects, StatusFlags::zero_negative(result));
    Ok(Outcome::NEXT)
}

fn stack<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    implied(opcode, resolved)?;
    match opcode.operation {
        Operation::Pha => cpu.push_byte(cpu.a)?,
        Operation::Php => cpu.push_byte(cpu.p.pushed(true))?,
        Operation::Pla => {
            cpu.a = cpu.pop_byte()?;
            cpu.apply_flags(opcode.affects, StatusFlags::zero_negative(cpu.a));
        }
        Operation::Plp => {
            let pulled = StatusFlags::pulled(cpu.pop_byte()?);
            cpu.apply_flags(opcode.affects, pulled);
        }
        _ => return Err(unsupported(opcode)),
    }
    Ok(Outcome::NEXT)
}

fn arithmetic<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let operand = read_operand(cpu, opcode, resolved)?;
    let operand = match opcode.operation {
        Operation::Adc => operand,
        // SBC is ADC of the one's complement.
        Operation::Sbc => !operand,
        _ => return Err(unsupported(opcode)),
    };

    let a = cpu.a;
    let result = a as u16 + operand as u16 + cpu.p.carry() as u16;
    let value = result as u8;

    let mut flags = StatusFlags::zero_negative(value);
    flags.set(StatusFlags::CARRY, result > 0xFF);
    flags.set(StatusFlags::OVERFLOW, (a ^ value) & (operand ^ value) & 0x80 != 0);

    cpu.a = value;
    cpu.apply_flags(opcode.affects, flags);
    Ok(Outcome::next(resolved.penalty))
}

fn logical<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let operand = read_operand(cpu, opcode, resolved)?;
    cpu.a = match opcode.operation {
        Operation::And => cpu.a & operand,
        Operation::Ora => cpu.a | operand,
        Operation::Eor => cpu.a ^ operand,
        _ => return Err(unsupported(opcode)),
    };
    cpu.apply_flags(opcode.affects, StatusFlags::zero_negative(cpu.a));
    Ok(Outcome::next(resolved.penalty))
}

fn bit<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let operand = read_operand(cpu, opcode, resolved)?;
    let mut flags = StatusFlags::from_bits_retain(operand)
        & (StatusFlags::OVERFLOW | StatusFlags::NEGATIVE);
    flags.set(StatusFlags::ZERO, cpu.a & operand == 0);
    cpu.apply_flags(opcode.affects, flags);
    Ok(Outcome::next(resolved.penalty))
}

fn compare<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let operand = read_operand(cpu, opcode, resolved)?;
    let register = match opcode.operation {
        Operation::Cmp => cpu.a,
        Operation::Cpx => cpu.x,
        Operation::Cpy => cpu.y,
        _ => return Err(unsupported(opcode)),
    };
    let mut flags = StatusFlags::zero_negative(register.wrapping_sub(operand));
    flags.set(StatusFlags::CARRY, register >= operand);
    cpu.apply_flags(opcode.affects, flags);
    Ok(Outcome::next(resolved.penalty))
}

fn increment_decrement<M: Memory>(
    cpu: &mut Cpu<M>,
    opcode: &OpCode,
    resolved: Resolved,
) -> Result<Outcome> {
    let result = match opcode.operation {
        Operation::Inc | Operation::Dec => {
            let address = address(opcode, resolved)?;
            let operand = cpu.bus.read(address)?;
            let result = if opcode.operation == Operation::Inc {
                operand.wrapping_add(1)
            } else {
                operand.wrapping_sub(1)
            };
            cpu.bus.write(address, result)?;
            result
        }
        Operation::Inx => {
            cpu.x = cpu.x.wrapping_add(1);
            cpu.x
        }
        Operation::Iny => {
            cpu.y = cpu.y.wrapping_add(1);
            cpu.y
        }
        Operation::Dex => {
            cpu.x = cpu.x.wrapping_sub(1);
            cpu.x
        }
        Operation::Dey => {
            cpu.y = cpu.y.wrapping_sub(1);
            cpu.y
        }
        _ => return Err(unsupported(opcode)),
    };
    cpu.apply_flags(opcode.affects, StatusFlags::zero_negative(result));
    Ok(Outcome::NEXT)
}

fn shift<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let (operand, target) = match resolved.operand {
        Operand::Accumulator => (cpu.a, None),
        Operand::Address(address) => (cpu.bus.read(address)?, Some(address)),
        _ => return Err(unsupported(opcode)),
    };

    let carry = cpu.p.carry();
    let (result, carry_out) = match opcode.operation {
        Operation::Asl => (operand << 1, operand & 0b1000_0000 != 0),
        Operation::Lsr => (operand >> 1, operand & 0b0000_0001 != 0),
        Operation::Rol => ((operand << 1) | carry, operand & 0b1000_0000 != 0),
        Operation::Ror => ((operand >> 1) | (carry << 7), operand & 0b0000_0001 != 0),
        _ => return Err(unsupported(opcode)),
    };

    match target {
        Some(address) => cpu.bus.write(address, result)?,
        None => cpu.a = result,
    }

    let mut flags = StatusFlags::zero_negative(result);
    flags.set(StatusFlags::CARRY, carry_out);
    cpu.apply_flags(opcode.affects, flags);
    Ok(Outcome::NEXT)
}

fn branch<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    let target = address(opcode, resolved)?;
    let p = cpu.p;
    let taken = match opcode.operation {
        Operation::Bpl => !p.contains(StatusFlags::NEGATIVE),
        Operation::Bmi => p.contains(StatusFlags::NEGATIVE),
        Operation::Bvc => !p.contains(StatusFlags::OVERFLOW),
        Operation::Bvs => p.contains(StatusFlags::OVERFLOW),
        Operation::Bcc => !p.contains(StatusFlags::CARRY),
        Operation::Bcs => p.contains(StatusFlags::CARRY),
        Operation::Bne => !p.contains(StatusFlags::ZERO),
        Operation::Beq => p.contains(StatusFlags::ZERO),
        _ => return Err(unsupported(opcode)),
    };

    if taken {
        cpu.pc = target;
        Ok(Outcome {
            penalty: 1 + resolved.penalty,
            flow: Flow::Jump,
        })
    } else {
        Ok(Outcome::NEXT)
    }
}

fn control<M: Memory>(cpu: &mut Cpu<M>, opcode: &OpCode, resolved: Resolved) -> Result<Outcome> {
    match opcode.operation {
        Operation::Jmp => {
            cpu.pc = address(opcode, resolved)?;
        }
        Operation::Jsr => {
            let target = address(opcode, resolved)?;
            // Return address minus one: the last byte of the JSR itself.
            cpu.push_word(cpu.pc.wrapping_add(2))?;
            cpu.pc = target;
        }
        Operation::Rts => {
            implied(opcode, resolved)?;
            cpu.pc = cpu.pop_word()?.wrapping_add(1);
        }
        Operation::Rti => {
            implied(opcode, resolved)?;
            let pulled = StatusFlags::pulled(cpu.pop_byte()?);
            cpu.apply_flags(opcode.affects, pulled);
            cpu.pc = cpu.pop_word()?;
        }
        Operation::Brk => {
            implied(opcode, resolved)?;
            // Skip the padding byte; the dispatch pushes this address.
            cpu.pc = cpu.pc.wrapping_add(2);
            cpu.interrupt(Interrupt::Break);
        }
        _ => return Err(unsupported(opcode)),
    }
    Ok(Outcome::JUMP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MemoryMap;
    use crate::memory::{MemoryBlock, MemoryRange};

    const ORIGIN: u16 = 0x0600;

    /// Powered on with the reset serviced and `program` at `ORIGIN`.
    fn cpu_with(program: &[u8]) -> Cpu<MemoryBlock> {
        let memory = MemoryBlock::new(MemoryRange::new(0x0000, 0xFFFF).unwrap());
        let mut cpu = Cpu::with_map(memory, MemoryMap::NES);
        for (i, byte) in program.iter().enumerate() {
            cpu.bus.write(ORIGIN + i as u16, *byte).unwrap();
        }
        cpu.bus.write(0xFFFC, ORIGIN as u8).unwrap();
        cpu.bus.write(0xFFFD, (ORIGIN >> 8) as u8).unwrap();
        cpu.power().unwrap();
        cpu.step().unwrap();
        cpu
    }

    fn run(cpu: &mut Cpu<MemoryBlock>, steps: usize) -> u32 {
        (0..steps).map(|_| cpu.step().unwrap()).sum()
    }

    fn flag(cpu: &Cpu<MemoryBlock>, flag: StatusFlags) -> bool {
        cpu.p.contains(flag)
    }

    #[test]
    fn test_lda_sets_zero_and_negative() {
        // LDA #$00; LDA #$80; LDA #$01
        let mut cpu = cpu_with(&[0xA9, 0x00, 0xA9, 0x80, 0xA9, 0x01]);
        run(&mut cpu, 1);
        assert!(flag(&cpu, StatusFlags::ZERO));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x80);
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        assert!(!flag(&cpu, StatusFlags::ZERO));
        run(&mut cpu, 1);
        assert!(!flag(&cpu, StatusFlags::NEGATIVE));
        assert_eq!(cpu.pc(), ORIGIN + 6);
    }

    #[test]
    fn test_load_store_round_trip() {
        // LDX #$07; LDA #$5A; STA $0200,X; LDY $0207
        let mut cpu = cpu_with(&[0xA2, 0x07, 0xA9, 0x5A, 0x9D, 0x00, 0x02, 0xAC, 0x07, 0x02]);
        let cycles = run(&mut cpu, 4);
        assert_eq!(cpu.bus.peek(0x0207).unwrap(), 0x5A);
        assert_eq!(cpu.y, 0x5A);
        assert_eq!(cycles, 2 + 2 + 5 + 4);
    }

    #[test]
    fn test_page_cross_penalty() {
        // LDX #$01; LDA $12FF,X; LDA $1200,X; STA $12FF,X
        let mut cpu = cpu_with(&[0xA2, 0x01, 0xBD, 0xFF, 0x12, 0xBD, 0x00, 0x12, 0x9D, 0xFF, 0x12]);
        run(&mut cpu, 1);
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.step().unwrap(), 4);
        assert_eq!(cpu.step().unwrap(), 5);
    }

    #[test]
    fn test_indirect_y_penalty() {
        // LDY #$10; LDA ($20),Y; LDY #$00; LDA ($20),Y
        let mut cpu = cpu_with(&[0xA0, 0x10, 0xB1, 0x20, 0xA0, 0x00, 0xB1, 0x20]);
        cpu.bus.write(0x0020, 0xF8).unwrap();
        cpu.bus.write(0x0021, 0x03).unwrap();
        cpu.bus.write(0x0408, 0x99).unwrap();
        run(&mut cpu, 1);
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.a, 0x99);
        run(&mut cpu, 1);
        assert_eq!(cpu.step().unwrap(), 5);
    }

    #[test]
    fn test_adc_carry_and_overflow() {
        // CLC; LDA #$50; ADC #$50
        let mut cpu = cpu_with(&[0x18, 0xA9, 0x50, 0x69, 0x50]);
        run(&mut cpu, 3);
        assert_eq!(cpu.a, 0xA0);
        assert!(flag(&cpu, StatusFlags::OVERFLOW));
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        assert!(!flag(&cpu, StatusFlags::CARRY));

        // SEC; LDA #$FF; ADC #$00
        let mut cpu = cpu_with(&[0x38, 0xA9, 0xFF, 0x69, 0x00]);
        run(&mut cpu, 3);
        assert_eq!(cpu.a, 0x00);
        assert!(flag(&cpu, StatusFlags::CARRY));
        assert!(flag(&cpu, StatusFlags::ZERO));
        assert!(!flag(&cpu, StatusFlags::OVERFLOW));
    }

    #[test]
    fn test_sbc_borrow() {
        // SEC; LDA #$50; SBC #$F0
        let mut cpu = cpu_with(&[0x38, 0xA9, 0x50, 0xE9, 0xF0]);
        run(&mut cpu, 3);
        assert_eq!(cpu.a, 0x60);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        assert!(!flag(&cpu, StatusFlags::OVERFLOW));

        // SEC; LDA #$D0; SBC #$70
        let mut cpu = cpu_with(&[0x38, 0xA9, 0xD0, 0xE9, 0x70]);
        run(&mut cpu, 3);
        assert_eq!(cpu.a, 0x60);
        assert!(flag(&cpu, StatusFlags::CARRY));
        assert!(flag(&cpu, StatusFlags::OVERFLOW));

        // CLC; LDA #$05; SBC #$03 (borrow in)
        let mut cpu = cpu_with(&[0x18, 0xA9, 0x05, 0xE9, 0x03]);
        run(&mut cpu, 3);
        assert_eq!(cpu.a, 0x01);
    }

    #[test]
    fn test_logical_ops() {
        // LDA #$F0; AND #$3C; ORA #$01; EOR #$FF
        let mut cpu = cpu_with(&[0xA9, 0xF0, 0x29, 0x3C, 0x09, 0x01, 0x49, 0xFF]);
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x30);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x31);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0xCE);
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_bit_uses_operand_bits() {
        // LDA #$01; BIT $10
        let mut cpu = cpu_with(&[0xA9, 0x01, 0x24, 0x10]);
        cpu.bus.write(0x0010, 0b1100_0000).unwrap();
        run(&mut cpu, 2);
        assert!(flag(&cpu, StatusFlags::ZERO));
        assert!(flag(&cpu, StatusFlags::OVERFLOW));
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        assert_eq!(cpu.a, 0x01);
    }

    #[test]
    fn test_compare() {
        // LDA #$40; CMP #$40; CPX #$01; LDY #$10; CPY #$20
        let mut cpu = cpu_with(&[0xA9, 0x40, 0xC9, 0x40, 0xE0, 0x01, 0xA0, 0x10, 0xC0, 0x20]);
        run(&mut cpu, 2);
        assert!(flag(&cpu, StatusFlags::ZERO));
        assert!(flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        run(&mut cpu, 2);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        assert!(!flag(&cpu, StatusFlags::ZERO));
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_increment_wraps_without_carry() {
        // SEC; LDX #$FF; INX; DEY; INC $10; DEC $11
        let mut cpu = cpu_with(&[0x38, 0xA2, 0xFF, 0xE8, 0x88, 0xE6, 0x10, 0xC6, 0x11]);
        cpu.bus.write(0x0010, 0xFF).unwrap();
        run(&mut cpu, 3);
        assert_eq!(cpu.x, 0x00);
        assert!(flag(&cpu, StatusFlags::ZERO));
        assert!(flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert_eq!(cpu.y, 0xFF);
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.bus.peek(0x0010).unwrap(), 0x00);
        run(&mut cpu, 1);
        assert_eq!(cpu.bus.peek(0x0011).unwrap(), 0xFF);
        assert!(flag(&cpu, StatusFlags::CARRY));
    }

    #[test]
    fn test_shifts_and_rotates() {
        // LDA #$81; ASL A; ROL A; LSR A; ROR A
        let mut cpu = cpu_with(&[0xA9, 0x81, 0x0A, 0x2A, 0x4A, 0x6A]);
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x02);
        assert!(flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x05);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x02);
        assert!(flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x81);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_shift_memory_keeps_accumulator() {
        // LDA #$33; SEC; ROR $40; ASL $41,X
        let mut cpu = cpu_with(&[0xA9, 0x33, 0x38, 0x66, 0x40, 0x16, 0x41]);
        cpu.bus.write(0x0040, 0x02).unwrap();
        cpu.bus.write(0x0041, 0x40).unwrap();
        run(&mut cpu, 3);
        assert_eq!(cpu.bus.peek(0x0040).unwrap(), 0x81);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.bus.peek(0x0041).unwrap(), 0x80);
        assert_eq!(cpu.a, 0x33);
    }

    #[test]
    fn test_branch_cycles() {
        // BEQ +2 (not taken); SEC; BCS +2 (taken, same page)
        let mut cpu = cpu_with(&[0xF0, 0x02, 0x38, 0xB0, 0x02, 0xEA, 0xEA, 0xEA]);
        cpu.p.remove(StatusFlags::ZERO);
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.pc(), ORIGIN + 2);
        run(&mut cpu, 1);
        assert_eq!(cpu.step().unwrap(), 3);
        assert_eq!(cpu.pc(), ORIGIN + 7);
    }

    #[test]
    fn test_branch_across_page() {
        let mut cpu = cpu_with(&[]);
        // BNE -8 at $06F0 lands on $06EA; BNE +$10 at $06FA lands on $070C.
        cpu.bus.write(0x06F0, 0xD0).unwrap();
        cpu.bus.write(0x06F1, 0xF8).unwrap();
        cpu.bus.write(0x06FA, 0xD0).unwrap();
        cpu.bus.write(0x06FB, 0x10).unwrap();
        cpu.p.remove(StatusFlags::ZERO);

        cpu.set_pc(0x06F0);
        assert_eq!(cpu.step().unwrap(), 3);
        assert_eq!(cpu.pc(), 0x06EA);

        cpu.set_pc(0x06FA);
        assert_eq!(cpu.step().unwrap(), 4);
        assert_eq!(cpu.pc(), 0x070C);
    }

    #[test]
    fn test_branch_leaves_flags() {
        // BMI +0
        let mut cpu = cpu_with(&[0x30, 0x00]);
        cpu.p = StatusFlags::NEGATIVE | StatusFlags::UNUSED;
        run(&mut cpu, 1);
        assert_eq!(cpu.p, StatusFlags::NEGATIVE | StatusFlags::UNUSED);
    }

    #[test]
    fn test_jsr_rts() {
        // JSR $0610; ...; $0610: LDX #$01; RTS
        let mut cpu = cpu_with(&[0x20, 0x10, 0x06]);
        cpu.bus.write(0x0610, 0xA2).unwrap();
        cpu.bus.write(0x0611, 0x01).unwrap();
        cpu.bus.write(0x0612, 0x60).unwrap();
        let sp = cpu.sp();

        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.pc(), 0x0610);
        assert_eq!(cpu.sp(), sp.wrapping_sub(2));
        let base = 0x0100 | sp as u16;
        assert_eq!(cpu.bus.peek(base).unwrap(), 0x06);
        assert_eq!(cpu.bus.peek(base - 1).unwrap(), 0x02);

        run(&mut cpu, 1);
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.pc(), ORIGIN + 3);
        assert_eq!(cpu.sp(), sp);
    }

    #[test]
    fn test_jmp_indirect_bug() {
        // JMP ($02FF)
        let mut cpu = cpu_with(&[0x6C, 0xFF, 0x02]);
        cpu.bus.write(0x02FF, 0x34).unwrap();
        cpu.bus.write(0x0200, 0x12).unwrap();
        cpu.bus.write(0x0300, 0x56).unwrap();
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.pc(), 0x1234);
    }

    #[test]
    fn test_php_plp() {
        // SEC; PHP; CLC; PLP
        let mut cpu = cpu_with(&[0x38, 0x08, 0x18, 0x28]);
        let sp = cpu.sp();
        run(&mut cpu, 2);
        let pushed = cpu.bus.peek(0x0100 | sp as u16).unwrap();
        assert_eq!(pushed, 0b0011_0101);
        assert!(!flag(&cpu, StatusFlags::BREAK));

        run(&mut cpu, 1);
        assert!(!flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 1);
        assert!(flag(&cpu, StatusFlags::CARRY));
        assert!(!flag(&cpu, StatusFlags::BREAK));
        assert!(flag(&cpu, StatusFlags::UNUSED));
    }

    #[test]
    fn test_pha_pla() {
        // LDA #$80; PHA; LDA #$00; PLA
        let mut cpu = cpu_with(&[0xA9, 0x80, 0x48, 0xA9, 0x00, 0x68]);
        let cycles = run(&mut cpu, 4);
        assert_eq!(cpu.a, 0x80);
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        assert_eq!(cycles, 2 + 3 + 2 + 4);
    }

    #[test]
    fn test_rti_restores_without_increment() {
        // RTI with $12 $34 and status $FF on the stack
        let mut cpu = cpu_with(&[0x40]);
        cpu.push_word(0x1234).unwrap();
        cpu.push_byte(0xFF).unwrap();
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.p, StatusFlags::all() - StatusFlags::BREAK);
    }

    #[test]
    fn test_transfers() {
        // LDX #$80; TXS; TSX; TXA; LDY #$00; TYA
        let mut cpu = cpu_with(&[0xA2, 0x80, 0x9A, 0xBA, 0x8A, 0xA0, 0x00, 0x98]);
        run(&mut cpu, 2);
        assert_eq!(cpu.stack_pointer(), 0x0180);
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x80);
        assert!(flag(&cpu, StatusFlags::NEGATIVE));
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x00);
        assert!(flag(&cpu, StatusFlags::ZERO));
    }

    #[test]
    fn test_txs_leaves_flags() {
        // TXS with X = 0
        let mut cpu = cpu_with(&[0x9A]);
        cpu.x = 0;
        run(&mut cpu, 1);
        assert!(!flag(&cpu, StatusFlags::ZERO));
        assert_eq!(cpu.sp(), 0x00);
    }

    #[test]
    fn test_flag_instructions() {
        // SED; SEC; CLI; CLV; CLD
        let mut cpu = cpu_with(&[0xF8, 0x38, 0x58, 0xB8, 0xD8]);
        cpu.p.insert(StatusFlags::OVERFLOW);
        run(&mut cpu, 2);
        assert!(flag(&cpu, StatusFlags::DECIMAL));
        assert!(flag(&cpu, StatusFlags::CARRY));
        run(&mut cpu, 3);
        assert_eq!(cpu.p, StatusFlags::CARRY | StatusFlags::UNUSED);
    }

    #[test]
    fn test_unsupported_mode_fails_loudly() {
        let mut cpu = cpu_with(&[]);
        let bogus = OpCode {
            mode: crate::opcode::AddressMode::Implied,
            ..*OpCode::decode(0xA9, 0).unwrap()
        };
        let err = execute(&mut cpu, &bogus, 0).unwrap_err();
        assert!(err.is_unimplemented());
        assert!(matches!(err, NesError::UnsupportedAddressing { operation: Operation::Lda, .. }));
    }
}
