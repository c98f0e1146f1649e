//! # Compliance runner
//!
//! Bounded run loop and the nestest automation sequence: power on, service
//! the reset, jump to the automated entry point, run until the first
//! unimplemented instruction and read the result codes from zero page.

use crate::bus::Bus;
use crate::cartridge::Rom;
use crate::cpu::Cpu;
use crate::map::MemoryMap;
use crate::memory::Memory;
use crate::Result;
use serde::Serialize;

/// nestest's automated (no PPU) entry point.
pub const NESTEST_ENTRY: u16 = 0xC000;

/// Zero-page bytes holding the documented / undocumented opcode results.
pub const RESULT_CODES: [u16; 2] = [0x0002, 0x0003];

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Halt {
    /// `max_steps` instructions ran.
    Budget,
    /// The instruction at `pc` has no behavior.
    Unimplemented { pc: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub cycles: u64,
    pub halt: Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub entry: u16,
    /// `pc` when the run stopped.
    pub pc: u16,
    pub summary: RunSummary,
    pub result_codes: [u8; 2],
}

impl ComplianceReport {
    pub fn passed(&self) -> bool {
        self.result_codes == [0, 0]
    }
}

/// Steps `cpu` until `max_steps` instructions ran or an unimplemented
/// instruction is hit. Any other error is returned as is.
pub fn run<M: Memory>(cpu: &mut Cpu<M>, max_steps: u64) -> Result<RunSummary> {
    let start = cpu.cycles();
    let mut steps = 0;

    let halt = loop {
        if steps >= max_steps {
            break Halt::Budget;
        }
        match cpu.step() {
            Ok(_) => steps += 1,
            Err(err) if err.is_unimplemented() => {
                break Halt::Unimplemented {
                    pc: cpu.pc(),
                    message: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        }
    };

    let summary = RunSummary {
        steps,
        cycles: cpu.cycles() - start,
        halt,
    };
    log::info!(
        "Run halted after {} steps / {} cycles: {:?}",
        summary.steps,
        summary.cycles,
        summary.halt
    );
    Ok(summary)
}

/// Runs `rom` on the default NES map from nestest's automated entry point.
pub fn nestest(rom: Rom, max_steps: u64) -> Result<ComplianceReport> {
    run_rom(MemoryMap::NES, rom, NESTEST_ENTRY, max_steps)
}

/// Power on, service the reset, force `pc = entry`, run, collect the
/// result codes.
pub fn run_rom(map: MemoryMap, rom: Rom, entry: u16, max_steps: u64) -> Result<ComplianceReport> {
    let mut bus = Bus::new(map)?;
    bus.load(rom)?;
    let mut cpu = Cpu::new(bus);

    cpu.power()?;
    cpu.step()?;
    cpu.set_pc(entry);

    let summary = run(&mut cpu, max_steps)?;
    let result_codes = [
        cpu.bus.peek(RESULT_CODES[0])?,
        cpu.bus.peek(RESULT_CODES[1])?,
    ];

    Ok(ComplianceReport {
        entry,
        pc: cpu.pc(),
        summary,
        result_codes,
    })
}
