// Bytecode Application Binary Interface (ABI)
// Instruction encoding, memory model, handler registry and the
// fetch-decode-execute loop. No I/O happens in this crate.

pub mod config;
pub mod error;
pub mod instructions;
pub mod isa;
pub mod memory;
pub mod registry;
pub mod vm;

pub use config::{MAX_CAPACITY, MachineConfig};
pub use error::{Result, VmError};
pub use instructions::{Handler, Outcome, Value};
pub use isa::{InstructionWord, Opcode};
pub use memory::{DEFAULT_CAPACITY, Memory};
pub use registry::Registry;
pub use vm::{Machine, RunSummary, VMStatus};
