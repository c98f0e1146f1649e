//! 6502 processor status register (P).

use bitflags::bitflags;

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u8 {
        const CARRY             = 0b0000_0001;
        const ZERO              = 0b0000_0010;
        const INTERRUPT_DISABLE = 0b0000_0100;
        const DECIMAL           = 0b0000_1000;
        /// Only exists in copies pushed by BRK/PHP.
        const BREAK             = 0b0001_0000;
        /// Always set in pushed copies.
        const UNUSED            = 0b0010_0000;
        const OVERFLOW          = 0b0100_0000;
        const NEGATIVE          = 0b1000_0000;
    }
}

impl StatusFlags {
    pub const NZ: StatusFlags = StatusFlags::NEGATIVE.union(StatusFlags::ZERO);
    pub const NZC: StatusFlags = StatusFlags::NZ.union(StatusFlags::CARRY);
    pub const NVZC: StatusFlags = StatusFlags::NZC.union(StatusFlags::OVERFLOW);
    pub const NVZ: StatusFlags = StatusFlags::NZ.union(StatusFlags::OVERFLOW);

    /// Status right after the reset sequence.
    pub const POWER_ON: StatusFlags = StatusFlags::INTERRUPT_DISABLE.union(StatusFlags::UNUSED);

    /// Zero and Negative as derived from an 8-bit result.
    pub fn zero_negative(value: u8) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::ZERO, value == 0);
        flags.set(StatusFlags::NEGATIVE, value & 0b1000_0000 != 0);
        flags
    }

    /// The byte written to the stack by PHP/BRK (`brk = true`) or NMI/IRQ.
    pub fn pushed(self, brk: bool) -> u8 {
        let mut pushed = self | StatusFlags::UNUSED;
        pushed.set(StatusFlags::BREAK, brk);
        pushed.bits()
    }

    /// The live status restored from a byte pulled by PLP/RTI.
    pub fn pulled(value: u8) -> StatusFlags {
        (StatusFlags::from_bits_retain(value) - StatusFlags::BREAK) | StatusFlags::UNUSED
    }

    pub fn carry(self) -> u8 {
        self.contains(StatusFlags::CARRY) as u8
    }
}
