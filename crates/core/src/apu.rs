//! # APU / IOレジスタ
//!
//! 音声チャンネルは持たず、$4000-$4017への書き込みをラッチするだけのスタブ。
//! $4016/$4017の読み込みは2つのジョイパッドのバイトを返す。

use crate::memory::{Memory, MemoryBlock, MemoryRange};
use crate::Result;

/// ジョイパッド1 ($4016)
const JOYPAD1: u16 = 0x16;
/// ジョイパッド2 ($4017、書き込みはフレームカウンタ)
const JOYPAD2: u16 = 0x17;

/// コントローラーのボタン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub fn bit(self) -> u8 {
        match self {
            Button::A => 0b0000_0001,
            Button::B => 0b0000_0010,
            Button::Select => 0b0000_0100,
            Button::Start => 0b0000_1000,
            Button::Up => 0b0001_0000,
            Button::Down => 0b0010_0000,
            Button::Left => 0b0100_0000,
            Button::Right => 0b1000_0000,
        }
    }
}

/// ジョイパッドのポート
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    One,
    Two,
}

/// APU/IOレジスタのラッチとジョイパッド入力
#[derive(Debug, Clone)]
pub struct ApuRegisters {
    registers: MemoryBlock,
    joypads: [u8; 2],
}

impl ApuRegisters {
    pub fn new(range: MemoryRange) -> Self {
        ApuRegisters {
            registers: MemoryBlock::new(range),
            joypads: [0; 2],
        }
    }

    pub fn range(&self) -> MemoryRange {
        self.registers.range()
    }

    /// ジョイパッドが返すバイトを設定
    pub fn set_joypad(&mut self, port: Port, value: u8) {
        self.joypads[port as usize] = value;
    }

    pub fn joypad(&self, port: Port) -> u8 {
        self.joypads[port as usize]
    }

    /// ボタンの状態を設定
    pub fn set_button(&mut self, port: Port, button: Button, pressed: bool) {
        let joypad = &mut self.joypads[port as usize];
        if pressed {
            *joypad |= button.bit();
        } else {
            *joypad &= !button.bit();
        }
    }

    /// 最後に書き込まれた値（$4016/$4017も含めてラッチの中身を返す）
    pub fn latched(&self, address: u16) -> Result<u8> {
        self.registers.peek(address)
    }

    fn joypad_at(&self, address: u16) -> Option<u8> {
        let start = self.range().start();
        if address == start.wrapping_add(JOYPAD1) {
            Some(self.joypads[Port::One as usize])
        } else if address == start.wrapping_add(JOYPAD2) {
            Some(self.joypads[Port::Two as usize])
        } else {
            None
        }
    }
}

impl Default for ApuRegisters {
    fn default() -> Self {
        ApuRegisters::new(crate::map::MemoryMap::NES.apu_registers)
    }
}

impl Memory for ApuRegisters {
    fn read(&mut self, address: u16) -> Result<u8> {
        self.peek(address)
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        self.registers.write(address, value)
    }

    fn peek(&self, address: u16) -> Result<u8> {
        let latched = self.registers.peek(address)?;
        Ok(self.joypad_at(address).unwrap_or(latched))
    }
}
