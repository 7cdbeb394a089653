use wasm_bindgen::prelude::*;

pub use abi::{Machine, MachineConfig, Memory, Opcode, Registry, VMStatus, VmError};
pub use compiler::{assemble, demo_program, disassemble};

pub const SYSTEM_STATUS: &str = r#"
================================================================================
BYTEVM // FETCH-DECODE-EXECUTE CORE
================================================================================
[ ARCHITECTURE ]
Fixed 160-byte memory + single cursor + opcode registry.

[ INSTRUCTION SET ]
[x] 0x01 PUSH_INTEGER (variable width, little-endian lanes)
[x] 0xFF HALT (end-of-program word 0xFFFF)

DEMONSTRATION RUN:
"#;

/// Run the demonstration program and describe the run.
pub fn run_suite() -> String {
    let mut report = String::from(SYSTEM_STATUS);
    let image = demo_program();

    let mut vm = match Machine::with_program(&image) {
        Ok(vm) => vm,
        Err(e) => {
            report.push_str(&format!("LOAD FAILED: {}\n", e));
            return report;
        }
    };
    report.push_str(&vm.memory.hexdump());

    for line in disassemble(&image) {
        report.push_str(&format!("{}\n", line));
    }

    let mut values = Vec::new();
    match vm.run(|v| values.push(v)) {
        Ok(summary) => {
            for v in &values {
                report.push_str(&format!("PUSH_INTEGER -> {} (0x{:08X})\n", v, v));
            }
            report.push_str(&format!(
                "HALTED after {} cycles, cursor {}\n",
                summary.cycles, summary.cursor
            ));
        }
        Err(e) => report.push_str(&format!("VM CRASH: {}\n", e)),
    }
    report
}

#[wasm_bindgen]
pub fn init_shell() -> String { run_suite() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_reports_decoded_value() {
        let report = run_suite();
        assert!(report.contains("PUSH_INTEGER -> 47856 (0x0000BAF0)"));
        assert!(report.contains("HALTED after 2 cycles, cursor 8"));
    }
}
