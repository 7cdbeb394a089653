use std::sync::Arc;

use log::{debug, info};

use crate::config::MachineConfig;
use crate::error::{Result, VmError};
use crate::instructions::{Outcome, Value};
use crate::isa::{InstructionWord, Opcode};
use crate::memory::Memory;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMStatus {
    Running,
    Produced(Value), // Handler decoded a value; a stack machine would push it
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Fetching,
    Halted,
    Faulted(VmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub cursor: usize,
}

/// One execution context: memory and cursor are owned here, the registry
/// is shared.
#[derive(Debug)]
pub struct Machine {
    pub memory: Memory,
    registry: Arc<Registry>,
    state: State,
    cycles: u64,
    trace: bool,
}

impl Machine {
    pub fn new(memory: Memory, registry: Arc<Registry>) -> Self {
        Self {
            memory,
            registry,
            state: State::Fetching,
            cycles: 0,
            trace: false,
        }
    }

    pub fn from_config(config: &MachineConfig, registry: Arc<Registry>) -> Self {
        let mut vm = Self::new(Memory::new(config.capacity), registry);
        vm.trace = config.trace;
        vm
    }

    /// Default-sized machine with the standard instruction set and `image`
    /// loaded at offset 0.
    pub fn with_program(image: &[u8]) -> Result<Self> {
        let mut memory = Memory::default();
        memory.load(image)?;
        Ok(Self::new(memory, Arc::new(Registry::with_defaults())))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// True only after a halt instruction.
    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// The fatal error that stopped this machine, if any.
    pub fn fault(&self) -> Option<&VmError> {
        match &self.state {
            State::Faulted(e) => Some(e),
            _ => None,
        }
    }

    /// Instructions executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Read the instruction word under the cursor and move past it. Nothing
    /// moves if the word does not fit.
    pub fn fetch(&mut self) -> Result<InstructionWord> {
        let high = self.memory.peek(0)?;
        let low = self.memory.peek(1)?;
        self.memory.advance(InstructionWord::SIZE)?;
        Ok(InstructionWord::from_bytes(high, low))
    }

    // Execute one instruction
    pub fn step(&mut self) -> Result<VMStatus> {
        match &self.state {
            State::Fetching => {}
            State::Halted => return Ok(VMStatus::Halted),
            State::Faulted(e) => return Err(e.clone()),
        }

        let outcome = match self.cycle() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = State::Faulted(e.clone());
                return Err(e);
            }
        };
        self.cycles += 1;

        match outcome {
            Outcome::Continue => Ok(VMStatus::Running),
            Outcome::Produced(value) => {
                debug!("produced {value} (0x{value:X})");
                Ok(VMStatus::Produced(value))
            }
            Outcome::Halt => {
                info!("halted after {} cycles at cursor {}", self.cycles, self.memory.cursor());
                self.state = State::Halted;
                Ok(VMStatus::Halted)
            }
        }
    }

    fn cycle(&mut self) -> Result<Outcome> {
        let at = self.memory.cursor();
        let word = self.fetch()?;
        let opcode = word.opcode();
        if self.trace {
            let name = Opcode::from_u8(opcode).map_or("?", Opcode::mnemonic);
            debug!("{at:04}: {word} {name} (metadata {})", word.metadata());
        }
        let handler = self.registry.dispatch(opcode)?;
        handler.execute(word, &mut self.memory)
    }

    /// Run until a halt instruction or a fatal error, handing every decoded
    /// value to `on_value`.
    pub fn run<F>(&mut self, on_value: F) -> Result<RunSummary>
    where
        F: FnMut(Value),
    {
        self.run_bounded(u64::MAX, on_value)
    }

    /// Like `run`, but gives up with `CycleLimit` after `max_cycles`
    /// instructions in this call.
    pub fn run_bounded<F>(&mut self, max_cycles: u64, mut on_value: F) -> Result<RunSummary>
    where
        F: FnMut(Value),
    {
        let mut executed = 0u64;
        loop {
            if self.is_halted() {
                break;
            }
            if executed >= max_cycles {
                return Err(VmError::CycleLimit { cycles: executed });
            }
            match self.step()? {
                VMStatus::Running => {}
                VMStatus::Produced(value) => on_value(value),
                VMStatus::Halted => {}
            }
            executed += 1;
        }
        Ok(RunSummary {
            cycles: self.cycles,
            cursor: self.memory.cursor(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(image: &[u8], registry: Registry) -> Machine {
        let mut memory = Memory::new(image.len());
        memory.load(image).unwrap();
        Machine::new(memory, Arc::new(registry))
    }

    #[test]
    fn opcode_is_the_second_byte_in_memory() {
        // Word 0x0401: opcode 0x04, metadata 0x01.
        let mut vm = machine(&[0x01, 0x04, 0xF0, 0xBA, 0x00, 0x00], Registry::with_defaults());
        assert_eq!(
            vm.step(),
            Err(VmError::UnimplementedInstruction { opcode: 0x04 })
        );

        let mut registry = Registry::new();
        registry.register(0x04, crate::instructions::PushInteger).unwrap();
        let mut vm = machine(&[0x01, 0x04, 0xF0, 0xBA, 0x00, 0x00], registry);
        // 0xF0 as a one-byte signed operand.
        assert_eq!(vm.step(), Ok(VMStatus::Produced(-16)));
        assert_eq!(vm.memory.cursor(), 3);
    }

    #[test]
    fn push_integer_in_stream_order() {
        let mut vm = machine(&[0x04, 0x01, 0xF0, 0xBA, 0x00, 0x00], Registry::with_defaults());
        assert_eq!(vm.step(), Ok(VMStatus::Produced(47856)));
        assert_eq!(vm.memory.cursor(), 6);
        assert_eq!(vm.cycles(), 1);
    }

    #[test]
    fn unimplemented_opcode_stops_after_word() {
        let mut vm = machine(&[0x02, 0x00], Registry::new());
        let before = vm.memory.clone();
        let fault = VmError::UnimplementedInstruction { opcode: 0x00 };
        assert_eq!(vm.step(), Err(fault.clone()));
        assert_eq!(vm.memory.cursor(), 2);
        assert!(!vm.is_halted());
        assert_eq!(vm.fault(), Some(&fault));
        assert_eq!(vm.memory.as_bytes(), before.as_bytes());
    }

    #[test]
    fn fault_is_reported_again_on_later_calls() {
        let mut vm = machine(&[0x02, 0x00], Registry::new());
        let fault = VmError::UnimplementedInstruction { opcode: 0x00 };
        assert_eq!(vm.run(|_| {}), Err(fault.clone()));
        assert_eq!(vm.run(|_| {}), Err(fault.clone()));
        assert_eq!(vm.step(), Err(fault));
        assert_eq!(vm.memory.cursor(), 2);
        assert_eq!(vm.cycles(), 0);
    }

    #[test]
    fn halt_is_not_a_fault() {
        let mut vm = machine(&[0xFF, 0xFF], Registry::with_defaults());
        assert_eq!(vm.run(|_| {}), Ok(RunSummary { cycles: 1, cursor: 2 }));
        assert!(vm.is_halted());
        assert_eq!(vm.fault(), None);
        assert_eq!(vm.step(), Ok(VMStatus::Halted));
    }

    #[test]
    fn partial_word_does_not_move_cursor() {
        let mut vm = machine(&[0x04, 0x01, 0x00], Registry::with_defaults());
        vm.memory.advance(2).unwrap();
        assert!(matches!(vm.fetch(), Err(VmError::OutOfBounds { cursor: 2, .. })));
        assert_eq!(vm.memory.cursor(), 2);
    }

    #[test]
    fn run_reports_values_until_halt() {
        let image = [0x04, 0x01, 0xF0, 0xBA, 0x00, 0x00, 0xFF, 0xFF];
        let mut vm = machine(&image, Registry::with_defaults());
        let mut values = Vec::new();
        let summary = vm.run(|v| values.push(v)).unwrap();
        assert_eq!(values, vec![47856]);
        assert_eq!(summary, RunSummary { cycles: 2, cursor: 8 });
        assert!(vm.is_halted());
    }

    #[test]
    fn run_stops_on_truncated_operand() {
        let mut vm = machine(&[0x04, 0x01, 0xF0], Registry::with_defaults());
        assert!(matches!(vm.run(|_| {}), Err(VmError::OutOfBounds { .. })));
    }

    #[test]
    fn run_bounded_gives_up() {
        let mut registry = Registry::new();
        registry
            .register(0x00, |_: InstructionWord, _: &mut Memory| -> Result<Outcome> {
                Ok(Outcome::Continue)
            })
            .unwrap();
        let mut vm = machine(&[0; 64], registry);
        assert_eq!(vm.run_bounded(5, |_| {}), Err(VmError::CycleLimit { cycles: 5 }));
        assert_eq!(vm.memory.cursor(), 10);
    }

    #[test]
    fn with_program_uses_reference_capacity() {
        let vm = Machine::with_program(&[0x04, 0x01]).unwrap();
        assert_eq!(vm.memory.capacity(), 160);
        assert!(vm.registry().contains(0xFF));
        assert!(Machine::with_program(&[0; 161]).is_err());
    }

    #[test]
    fn from_config_sizes_memory() {
        let config = MachineConfig { capacity: 8, ..MachineConfig::default() };
        let vm = Machine::from_config(&config, Arc::new(Registry::new()));
        assert_eq!(vm.memory.capacity(), 8);
    }
}
