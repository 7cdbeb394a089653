use serde::{Deserialize, Serialize};

/// The standard instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    PushInteger = 0x01, // Push an integer of `metadata` bytes, little-endian
    Halt = 0xFF,        // End of program
}

impl Opcode {
    pub const ALL: [Opcode; 2] = [Opcode::PushInteger, Opcode::Halt];

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Opcode::PushInteger),
            0xFF => Some(Opcode::Halt),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::PushInteger => "PUSH_INTEGER",
            Opcode::Halt => "HALT",
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

/// Two-byte instruction word. The first byte in memory is the high byte.
///
/// ```text
///   memory:  [pos]   [pos+1]
///            meta    opcode
///   word  = (meta << 8) | opcode
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionWord(pub u16);

impl InstructionWord {
    pub const SIZE: usize = 2;

    pub fn from_bytes(high: u8, low: u8) -> Self {
        Self((u16::from(high) << 8) | u16::from(low))
    }

    pub fn new(opcode: u8, metadata: u8) -> Self {
        Self::from_bytes(metadata, opcode)
    }

    pub fn opcode(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub fn metadata(self) -> u8 {
        ((self.0 & 0xFF00) >> 8) as u8
    }

    /// Bytes in stream order.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl std::fmt::Display for InstructionWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
