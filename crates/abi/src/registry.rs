use std::fmt;
use std::sync::Arc;

use crate::error::{Result, VmError};
use crate::instructions::{Halt, Handler, PushInteger};
use crate::isa::Opcode;

/// Opcode to handler table, indexed by the raw opcode byte.
pub struct Registry {
    handlers: [Option<Arc<dyn Handler>>; 256],
}

impl Registry {
    pub fn new() -> Self {
        Self {
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Registry holding the standard instruction set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for op in Opcode::ALL {
            let handler: Arc<dyn Handler> = match op {
                Opcode::PushInteger => Arc::new(PushInteger),
                Opcode::Halt => Arc::new(Halt),
            };
            registry
                .register_arc(op.into(), handler)
                .expect("Opcode::ALL has no repeated opcodes");
        }
        registry
    }

    pub fn register<H: Handler + 'static>(&mut self, opcode: u8, handler: H) -> Result<()> {
        self.register_arc(opcode, Arc::new(handler))
    }

    pub fn register_arc(&mut self, opcode: u8, handler: Arc<dyn Handler>) -> Result<()> {
        let slot = &mut self.handlers[usize::from(opcode)];
        if slot.is_some() {
            return Err(VmError::DuplicateOpcode { opcode });
        }
        *slot = Some(handler);
        Ok(())
    }

    pub fn dispatch(&self, opcode: u8) -> Result<&Arc<dyn Handler>> {
        self.handlers[usize::from(opcode)]
            .as_ref()
            .ok_or(VmError::UnimplementedInstruction { opcode })
    }

    pub fn contains(&self, opcode: u8) -> bool {
        self.handlers[usize::from(opcode)].is_some()
    }

    /// Registered opcodes in ascending order.
    pub fn opcodes(&self) -> Vec<u8> {
        (0..=u8::MAX).filter(|op| self.contains(*op)).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.iter().filter(|h| h.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("opcodes", &self.opcodes())
            .finish()
    }
}
