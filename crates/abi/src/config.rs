use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_CAPACITY;

/// Largest memory a driver should accept from user configuration.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Knobs a driver can set on a machine. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Memory buffer size in bytes.
    pub capacity: usize,
    /// Cycle budget for `Machine::run_bounded`; `None` runs until halt or fault.
    pub max_cycles: Option<u64>,
    /// Log every decoded instruction at `debug` level.
    pub trace: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_cycles: None,
            trace: false,
        }
    }
}
