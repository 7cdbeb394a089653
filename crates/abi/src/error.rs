use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

/// Fatal interpreter conditions. None of these are recoverable; the driver
/// decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// A read or cursor move would touch memory past the buffer capacity.
    #[error("out of bounds: {len} byte(s) at cursor {cursor} (capacity {capacity})")]
    OutOfBounds {
        cursor: usize,
        len: usize,
        capacity: usize,
    },
    /// No handler is registered for the decoded opcode.
    #[error("Unimplemented Instruction: 0x{opcode:02X}")]
    UnimplementedInstruction { opcode: u8 },
    /// A second handler was registered for an opcode.
    #[error("duplicate handler for opcode 0x{opcode:02X}")]
    DuplicateOpcode { opcode: u8 },
    /// The driver-side cycle budget ran out before the program halted.
    #[error("cycle limit reached after {cycles} cycles")]
    CycleLimit { cycles: u64 },
}

impl VmError {
    /// Process exit status a driver should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            VmError::OutOfBounds { .. } => 3,
            VmError::UnimplementedInstruction { .. } => 4,
            VmError::DuplicateOpcode { .. } => 5,
            VmError::CycleLimit { .. } => 6,
        }
    }
}
