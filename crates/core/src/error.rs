//! エラー型の定義

use crate::memory::MemoryRange;
use crate::opcode::{AddressMode, Operation};
use thiserror::Error;

/// CPUコアのエラー型
#[derive(Error, Debug)]
pub enum NesError {
    #[error("Invalid ROM format: {0}")]
    InvalidRom(String),

    #[error("Invalid memory range: start {start:#06x} is past end {end:#06x}")]
    InvalidRange { start: u16, end: u16 },

    #[error("Memory ranges overlap: {first} and {second}")]
    OverlappingRanges {
        first: MemoryRange,
        second: MemoryRange,
    },

    #[error("Address {address:#06x} is outside {start:#06x}-{end:#06x}")]
    AddressOutOfRange { address: u16, start: u16, end: u16 },

    #[error("No device is mapped at address: {0:#06x}")]
    UnmappedAddress(u16),

    #[error("Cartridge window accessed at {0:#06x} before a ROM was loaded")]
    MissingCartridge(u16),

    #[error("Unimplemented CPU instruction: {opcode:#04x} at {address:#06x}")]
    UnimplementedOpcode { opcode: u8, address: u16 },

    #[error("No behavior wired for {operation:?} with {mode:?} addressing")]
    UnsupportedAddressing {
        operation: Operation,
        mode: AddressMode,
    },

    #[error("CPU is powered off")]
    PoweredOff,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NesError {
    /// 未実装命令（テーブルに無いオペコード、未配線のアドレッシング）かどうか
    ///
    /// コンプライアンスROMのハーネスはこの種類だけを正常終了として扱う。
    pub fn is_unimplemented(&self) -> bool {
        matches!(
            self,
            NesError::UnimplementedOpcode { .. } | NesError::UnsupportedAddressing { .. }
        )
    }
}

/// Result型のエイリアス
pub type Result<T> = std::result::Result<T, NesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unimplemented_class() {
        let err = NesError::UnimplementedOpcode {
            opcode: 0x02,
            address: 0xC000,
        };
        assert!(err.is_unimplemented());
        assert!(!NesError::MissingCartridge(0x8000).is_unimplemented());
        assert!(!NesError::PoweredOff.is_unimplemented());
    }

    #[test]
    fn test_messages_carry_addresses() {
        let err = NesError::UnimplementedOpcode {
            opcode: 0x02,
            address: 0xC000,
        };
        assert_eq!(
            err.to_string(),
            "Unimplemented CPU instruction: 0x02 at 0xc000"
        );
    }
}
