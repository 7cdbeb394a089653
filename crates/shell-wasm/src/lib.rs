use abi::{Machine, Value};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Browsers get no cycle budget from the user, so keep runaway images bounded.
const WASM_MAX_CYCLES: u64 = 10_000;

#[derive(Debug, Default, Serialize)]
struct RunReport {
    values: Vec<Value>,
    cycles: u64,
    cursor: usize,
    error: Option<String>,
}

fn execute(image: &[u8]) -> RunReport {
    let mut report = RunReport::default();
    let mut vm = match Machine::with_program(image) {
        Ok(vm) => vm,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    let result = vm.run_bounded(WASM_MAX_CYCLES, |v| report.values.push(v));
    if let Err(e) = result {
        report.error = Some(e.to_string());
    }
    report.cycles = vm.cycles();
    report.cursor = vm.memory.cursor();
    report
}

fn to_json(report: &RunReport) -> String {
    serde_json::to_string(report).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}

/// Run an image in a default machine and describe the run as JSON.
#[wasm_bindgen]
pub fn run_image(image: &[u8]) -> String {
    to_json(&execute(image))
}

#[wasm_bindgen]
pub fn init_shell() -> String {
    run_image(&compiler::demo_program())
}
