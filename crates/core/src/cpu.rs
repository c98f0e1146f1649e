//! # 6502 CPU
//! Registers, the power/reset sequence, stack helpers and the
//! fetch → decode → execute → interrupt state machine.

use crate::bus::Bus;
use crate::execute::{self, Flow};
use crate::flags::StatusFlags;
use crate::map::MemoryMap;
use crate::memory::Memory;
use crate::opcode::{OpCode, OPCODES};
use crate::{NesError, Result};
use bitflags::bitflags;

/// Cycles taken by the NMI/IRQ/reset dispatch sequence.
pub const INTERRUPT_CYCLES: u32 = 7;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Reset,
    Irq,
    Break,
}

bitflags! {
    /// Interrupt requests latched until the next `step`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct PendingInterrupts: u8 {
        const NMI   = 0b0001;
        const RESET = 0b0010;
        const BREAK = 0b0100;
        const IRQ   = 0b1000;
    }
}

impl Interrupt {
    fn latch(self) -> PendingInterrupts {
        match self {
            Interrupt::Nmi => PendingInterrupts::NMI,
            Interrupt::Reset => PendingInterrupts::RESET,
            Interrupt::Irq => PendingInterrupts::IRQ,
            Interrupt::Break => PendingInterrupts::BREAK,
        }
    }
}

pub struct Cpu<M: Memory = Bus> {
    pub bus: M,
    map: MemoryMap,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: StatusFlags,
    pub(crate) pc: u16,
    /// Absolute address inside the stack page (`$0100 | S`).
    pub(crate) sp: u16,
    cycles: u64,
    powered: bool,
    pending: PendingInterrupts,
}

impl<P: Memory, A: Memory> Cpu<Bus<P, A>> {
    pub fn new(bus: Bus<P, A>) -> Self {
        let map = *bus.map();
        Cpu::with_map(bus, map)
    }
}

impl<M: Memory> Cpu<M> {
    /// CPU over any `Memory`, using `map` for vectors, the stack page and
    /// the APU registers silenced at power-on.
    pub fn with_map(bus: M, map: MemoryMap) -> Self {
        Cpu {
            bus,
            map,
            pc: 0,
            sp: map.stack_page,
            a: 0,
            x: 0,
            y: 0,
            p: StatusFlags::empty(),
            cycles: 0,
            powered: false,
            pending: PendingInterrupts::empty(),
        }
    }

    /// Toggles power. Switching on runs the reset sequence and latches a
    /// reset interrupt; switching off only flips the flag.
    pub fn power(&mut self) -> Result<()> {
        self.powered = !self.powered;
        if !self.powered {
            log::debug!("CPU powered off after {} cycles", self.cycles);
            return Ok(());
        }

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.p = StatusFlags::POWER_ON;
        self.pc = self.map.reset_vector;
        self.sp = self.map.stack_page;
        self.cycles = 0;
        self.pending = PendingInterrupts::RESET;

        // The APU powers up silent.
        for address in self.map.silent_apu_registers() {
            self.bus.write(address, 0)?;
        }

        log::debug!("CPU powered on");
        Ok(())
    }

    pub fn is_powered_on(&self) -> bool {
        self.powered
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u8 {
        self.sp as u8
    }

    pub fn stack_pointer(&self) -> u16 {
        self.sp
    }

    pub fn status(&self) -> u8 {
        self.p.bits()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pending_interrupts(&self) -> PendingInterrupts {
        self.pending
    }

    /// Latches an interrupt request; earlier requests stay latched.
    pub fn interrupt(&mut self, kind: Interrupt) {
        self.pending |= kind.latch();
    }

    /// Runs one instruction, or one interrupt dispatch, and returns the
    /// cycles it took.
    pub fn step(&mut self) -> Result<u32> {
        if !self.powered {
            return Err(NesError::PoweredOff);
        }

        if let Some(kind) = self.next_interrupt() {
            return self.service_interrupt(kind);
        }

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(line) = self.trace_line() {
                log::trace!("{}", line);
            }
        }

        let pc = self.pc;
        let code = self.bus.read(pc)?;
        let operand = self.bus.read(pc.wrapping_add(1))?;
        let opcode = OpCode::decode(code, pc)?;

        let outcome = execute::execute(self, opcode, operand)?;
        if outcome.flow == Flow::Next {
            self.pc = pc.wrapping_add(opcode.bytes as u16);
        }

        let cycles = opcode.cycles as u32 + outcome.penalty as u32;
        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// One nestest-style log line for the instruction at `pc`, built from
    /// side-effect-free peeks.
    pub fn trace_line(&self) -> Result<String> {
        let code = self.bus.peek(self.pc)?;
        let opcode = &OPCODES[code as usize];
        let mut bytes = format!("{:02X}", code);
        for i in 1..opcode.bytes as u16 {
            let byte = self.bus.peek(self.pc.wrapping_add(i))?;
            bytes.push_str(&format!(" {:02X}", byte));
        }
        Ok(format!(
            "{:04X}  {:<8}  {}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            bytes,
            opcode.operation.mnemonic(),
            self.a,
            self.x,
            self.y,
            self.p.bits(),
            self.sp(),
            self.cycles
        ))
    }

    fn next_interrupt(&self) -> Option<Interrupt> {
        if self.pending.contains(PendingInterrupts::NMI) {
            Some(Interrupt::Nmi)
        } else if self.pending.contains(PendingInterrupts::RESET) {
            Some(Interrupt::Reset)
        } else if self.pending.contains(PendingInterrupts::BREAK) {
            Some(Interrupt::Break)
        } else if self.pending.contains(PendingInterrupts::IRQ)
            && !self.p.contains(StatusFlags::INTERRUPT_DISABLE)
        {
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    fn service_interrupt(&mut self, kind: Interrupt) -> Result<u32> {
        let brk = kind == Interrupt::Break;
        self.push_word(self.pc)?;
        self.push_byte(self.p.pushed(brk))?;
        self.p.insert(StatusFlags::INTERRUPT_DISABLE);

        let vector = match kind {
            Interrupt::Nmi => self.map.nmi_vector,
            Interrupt::Reset => self.map.reset_vector,
            Interrupt::Irq | Interrupt::Break => self.map.irq_vector,
        };
        self.pc = self.bus.read_word(vector)?;
        self.pending.remove(kind.latch());

        self.cycles += INTERRUPT_CYCLES as u64;
        log::debug!("{:?} interrupt -> ${:04X}", kind, self.pc);
        Ok(INTERRUPT_CYCLES)
    }

    fn stack_address(&self, offset: u8) -> u16 {
        (self.map.stack_page & 0xFF00) | offset as u16
    }

    pub(crate) fn set_stack_offset(&mut self, offset: u8) {
        self.sp = self.stack_address(offset);
    }

    pub(crate) fn push_byte(&mut self, value: u8) -> Result<()> {
        self.bus.write(self.sp, value)?;
        self.set_stack_offset((self.sp as u8).wrapping_sub(1));
        Ok(())
    }

    pub(crate) fn pop_byte(&mut self) -> Result<u8> {
        self.set_stack_offset((self.sp as u8).wrapping_add(1));
        self.bus.read(self.sp)
    }

    pub(crate) fn push_word(&mut self, value: u16) -> Result<()> {
        self.push_byte((value >> 8) as u8)?;
        self.push_byte(value as u8)
    }

    pub(crate) fn pop_word(&mut self) -> Result<u16> {
        let lo = self.pop_byte()? as u16;
        let hi = self.pop_byte()? as u16;
        Ok((hi << 8) | lo)
    }

    /// Replaces the bits of `mask` in the status with those of `flags`.
    pub(crate) fn apply_flags(&mut self, mask: StatusFlags, flags: StatusFlags) {
        self.p = (self.p - mask) | (flags & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlock, MemoryRange};

    fn flat_cpu() -> Cpu<MemoryBlock> {
        let memory = MemoryBlock::new(MemoryRange::new(0x0000, 0xFFFF).unwrap());
        Cpu::with_map(memory, MemoryMap::NES)
    }

    /// Powered on, reset serviced, `pc` at `$0600` with `program` loaded.
    fn running_cpu(program: &[u8]) -> Cpu<MemoryBlock> {
        let mut cpu = flat_cpu();
        for (i, byte) in program.iter().enumerate() {
            cpu.bus.write(0x0600 + i as u16, *byte).unwrap();
        }
        cpu.bus.write(0xFFFC, 0x00).unwrap();
        cpu.bus.write(0xFFFD, 0x06).unwrap();
        cpu.bus.write(0xFFFE, 0x00).unwrap();
        cpu.bus.write(0xFFFF, 0x90).unwrap();
        cpu.bus.write(0xFFFA, 0x00).unwrap();
        cpu.bus.write(0xFFFB, 0xA0).unwrap();
        cpu.power().unwrap();
        cpu.step().unwrap();
        cpu
    }

    #[test]
    fn test_power_on_state() {
        let mut cpu = flat_cpu();
        for address in 0x4000..=0x4017 {
            cpu.bus.write(address, 0xFF).unwrap();
        }
        cpu.a = 1;
        cpu.x = 2;
        cpu.y = 3;

        cpu.power().unwrap();

        assert!(cpu.is_powered_on());
        assert_eq!((cpu.a, cpu.x, cpu.y), (0, 0, 0));
        assert_eq!(cpu.cycles(), 0);
        assert_eq!(cpu.p, StatusFlags::INTERRUPT_DISABLE | StatusFlags::UNUSED);
        assert_eq!(cpu.pc(), 0xFFFC);
        assert_eq!(cpu.stack_pointer(), 0x0100);
        for address in 0x4000..=0x400F {
            assert_eq!(cpu.bus.peek(address).unwrap(), 0, "{:#06x}", address);
        }
        assert_eq!(cpu.bus.peek(0x4015).unwrap(), 0);
        assert_eq!(cpu.bus.peek(0x4017).unwrap(), 0);
        assert_eq!(cpu.bus.peek(0x4016).unwrap(), 0xFF);
    }

    #[test]
    fn test_power_on_writes_reach_the_apu_window() {
        let bus: Bus = Bus::new(MemoryMap::NES).unwrap();
        let mut cpu = Cpu::new(bus);
        cpu.bus.write(0x4003, 0x77).unwrap();
        cpu.bus.write(0x4017, 0x40).unwrap();
        assert_eq!(cpu.bus.apu().latched(0x4017).unwrap(), 0x40);
        cpu.power().unwrap();
        assert_eq!(cpu.bus.apu().latched(0x4003).unwrap(), 0);
        assert_eq!(cpu.bus.apu().latched(0x4017).unwrap(), 0);
    }

    #[test]
    fn test_power_toggles() {
        let mut cpu = flat_cpu();
        assert!(!cpu.is_powered_on());
        cpu.power().unwrap();
        cpu.power().unwrap();
        assert!(!cpu.is_powered_on());
        cpu.power().unwrap();
        assert!(cpu.is_powered_on());
    }

    #[test]
    fn test_power_off_keeps_registers() {
        let mut cpu = running_cpu(&[0xA9, 0x42]);
        cpu.step().unwrap();
        cpu.power().unwrap();
        assert_eq!(cpu.a, 0x42);
        assert!(matches!(cpu.step(), Err(NesError::PoweredOff)));
    }

    #[test]
    fn test_reset_dispatch() {
        let mut cpu = flat_cpu();
        cpu.bus.write(0xFFFC, 0x34).unwrap();
        cpu.bus.write(0xFFFD, 0x12).unwrap();
        cpu.power().unwrap();
        assert_eq!(cpu.pending_interrupts(), PendingInterrupts::RESET);

        assert_eq!(cpu.step().unwrap(), 7);
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.cycles(), 7);
        assert_eq!(cpu.sp(), 0xFD);
        assert_eq!(cpu.status(), 0x24);
        assert!(cpu.pending_interrupts().is_empty());
    }

    #[test]
    fn test_stack_wraps_within_page() {
        let mut cpu = running_cpu(&[]);
        cpu.set_stack_offset(0x00);
        cpu.push_byte(0xAB).unwrap();
        assert_eq!(cpu.stack_pointer(), 0x01FF);
        assert_eq!(cpu.bus.peek(0x0100).unwrap(), 0xAB);
        assert_eq!(cpu.pop_byte().unwrap(), 0xAB);
        assert_eq!(cpu.stack_pointer(), 0x0100);

        cpu.set_stack_offset(0xFF);
        cpu.bus.write(0x0100, 0x5A).unwrap();
        assert_eq!(cpu.pop_byte().unwrap(), 0x5A);
        assert_eq!(cpu.stack_pointer(), 0x0100);
    }

    #[test]
    fn test_nmi_dispatch_pushes_state() {
        let mut cpu = running_cpu(&[0xEA]);
        cpu.p = StatusFlags::CARRY | StatusFlags::UNUSED;
        let sp = cpu.sp();
        cpu.interrupt(Interrupt::Nmi);

        assert_eq!(cpu.step().unwrap(), INTERRUPT_CYCLES);
        assert_eq!(cpu.pc(), 0xA000);
        assert!(cpu.p.contains(StatusFlags::INTERRUPT_DISABLE));
        assert_eq!(cpu.sp(), sp.wrapping_sub(3));
        let base = 0x0100 | sp as u16;
        assert_eq!(cpu.bus.peek(base).unwrap(), 0x06);
        assert_eq!(cpu.bus.peek(base - 1).unwrap(), 0x00);
        assert_eq!(cpu.bus.peek(base - 2).unwrap(), 0b0010_0001);
    }

    #[test]
    fn test_irq_masked_until_cli() {
        // SEI already set by reset; CLI; NOP
        let mut cpu = running_cpu(&[0xEA, 0x58, 0xEA]);
        cpu.interrupt(Interrupt::Irq);

        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.pc(), 0x0601);
        assert_eq!(cpu.pending_interrupts(), PendingInterrupts::IRQ);

        cpu.step().unwrap();
        assert!(!cpu.p.contains(StatusFlags::INTERRUPT_DISABLE));
        assert_eq!(cpu.step().unwrap(), INTERRUPT_CYCLES);
        assert_eq!(cpu.pc(), 0x9000);
        assert!(cpu.pending_interrupts().is_empty());
    }

    #[test]
    fn test_interrupt_priority() {
        let mut cpu = running_cpu(&[0xEA]);
        cpu.p.remove(StatusFlags::INTERRUPT_DISABLE);
        cpu.interrupt(Interrupt::Irq);
        cpu.interrupt(Interrupt::Break);
        cpu.interrupt(Interrupt::Nmi);
        assert_eq!(
            cpu.pending_interrupts(),
            PendingInterrupts::IRQ | PendingInterrupts::BREAK | PendingInterrupts::NMI
        );

        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0xA000);
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0x9000);
        assert_eq!(cpu.pending_interrupts(), PendingInterrupts::IRQ);
        // Both dispatches set I, so the IRQ waits.
        assert_eq!(cpu.next_interrupt(), None);
    }

    #[test]
    fn test_brk_goes_through_dispatch() {
        // BRK; padding
        let mut cpu = running_cpu(&[0x00, 0xFF]);
        let sp = cpu.sp();
        cpu.p = StatusFlags::UNUSED;

        assert_eq!(cpu.step().unwrap(), 7);
        assert_eq!(cpu.pending_interrupts(), PendingInterrupts::BREAK);
        assert_eq!(cpu.pc(), 0x0602);

        let cycles = cpu.cycles();
        assert_eq!(cpu.step().unwrap(), INTERRUPT_CYCLES);
        assert_eq!(cpu.cycles(), cycles + INTERRUPT_CYCLES as u64);
        assert_eq!(cpu.pc(), 0x9000);
        let base = 0x0100 | sp as u16;
        assert_eq!(cpu.bus.peek(base).unwrap(), 0x06);
        assert_eq!(cpu.bus.peek(base - 1).unwrap(), 0x02);
        assert_eq!(cpu.bus.peek(base - 2).unwrap(), 0b0011_0000);
        assert!(cpu.p.contains(StatusFlags::INTERRUPT_DISABLE));
        assert!(!cpu.p.contains(StatusFlags::BREAK));
    }

    #[test]
    fn test_undocumented_opcode_stops_step() {
        let mut cpu = running_cpu(&[0xEA, 0x02]);
        cpu.step().unwrap();
        let cycles = cpu.cycles();
        let err = cpu.step().unwrap_err();
        assert!(err.is_unimplemented());
        assert!(matches!(
            err,
            NesError::UnimplementedOpcode {
                opcode: 0x02,
                address: 0x0601
            }
        ));
        assert_eq!(cpu.pc(), 0x0601);
        assert_eq!(cpu.cycles(), cycles);
    }

    #[test]
    fn test_trace_line() {
        // JMP $C5F5
        let cpu = running_cpu(&[0x4C, 0xF5, 0xC5]);
        assert_eq!(
            cpu.trace_line().unwrap(),
            "0600  4C F5 C5  JMP  A:00 X:00 Y:00 P:24 SP:FD CYC:7"
        );
    }
}
