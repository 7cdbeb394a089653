use std::sync::Arc;

use abi::{InstructionWord, Machine, Memory, Opcode, Registry, VMStatus, VmError};
use colored::*;

const HEADER: &str = r#"
================================================================================
BYTEVM // DECODE LOOP CONFORMANCE
================================================================================

[ ENCODING ]
  word     = (memory[pos] << 8) | memory[pos + 1]
  opcode   = word & 0x00FF
  metadata = (word & 0xFF00) >> 8

[ INSTRUCTIONS ]
  0x01 PUSH_INTEGER   metadata = operand bytes, signed little-endian lanes
  0xFF HALT           end of program

================================================================================
CHECKS
================================================================================
"#;

fn main() {
    println!("{}", HEADER);
    let mut passed = 0u32;
    let mut failed = 0u32;

    run_test("ABI_OPCODE_MAPPING", test_abi_opcodes, &mut passed, &mut failed);
    run_test("WORD_HIGH_BYTE_FIRST", test_word_layout, &mut passed, &mut failed);
    run_test("PUSH_INTEGER_47856", test_push_integer, &mut passed, &mut failed);
    run_test("UNIMPLEMENTED_OPCODE", test_unimplemented, &mut passed, &mut failed);
    run_test("MEMORY_BOUNDS", test_bounds, &mut passed, &mut failed);
    run_test("DUPLICATE_OPCODE", test_duplicate, &mut passed, &mut failed);
    run_test("SIGNED_OPERAND", test_signed_operand, &mut passed, &mut failed);
    run_test("FAULT_IS_FINAL", test_fault_is_final, &mut passed, &mut failed);
    run_test("DEMO_PROGRAM_HALTS", test_demo_program, &mut passed, &mut failed);

    println!("\n--------------------------------------------------------------------------------");
    println!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", "ALL SYSTEMS NOMINAL.".green().bold());
    } else {
        std::process::exit(1);
    }
}

// --- TEST INFRASTRUCTURE ---

fn run_test<F>(name: &str, test_fn: F, passed: &mut u32, failed: &mut u32)
where
    F: Fn() -> Result<(), String>,
{
    print!("TEST: {:<30} ... ", name);
    match test_fn() {
        Ok(()) => {
            println!("{}", "PASS".green());
            *passed += 1;
        }
        Err(e) => {
            println!("{}", "FAIL".red());
            println!("  -> {}", e);
            *failed += 1;
        }
    }
}

fn machine(image: &[u8], registry: Registry) -> Result<Machine, String> {
    let mut memory = Memory::new(image.len());
    memory.load(image).map_err(|e| e.to_string())?;
    Ok(Machine::new(memory, Arc::new(registry)))
}

fn test_abi_opcodes() -> Result<(), String> {
    if (Opcode::PushInteger as u8) != 0x01 {
        return Err("PushInteger != 0x01".into());
    }
    if (Opcode::Halt as u8) != 0xFF {
        return Err("Halt != 0xFF".into());
    }
    Ok(())
}

fn test_word_layout() -> Result<(), String> {
    let word = InstructionWord::from_bytes(0x04, 0x01);
    if word.0 != 0x0401 {
        return Err(format!("word = {}", word));
    }
    if word.opcode() != 0x01 || word.metadata() != 0x04 {
        return Err(format!("opcode {:#04x} metadata {:#04x}", word.opcode(), word.metadata()));
    }
    Ok(())
}

fn test_push_integer() -> Result<(), String> {
    let mut vm = machine(&[0x04, 0x01, 0xF0, 0xBA, 0x00, 0x00], Registry::with_defaults())?;
    match vm.step() {
        Ok(VMStatus::Produced(47856)) => {}
        other => return Err(format!("step returned {:?}", other)),
    }
    if vm.memory.cursor() != 6 {
        return Err(format!("cursor = {}", vm.memory.cursor()));
    }
    Ok(())
}

fn test_unimplemented() -> Result<(), String> {
    let mut vm = machine(&[0x02, 0x00], Registry::new())?;
    match vm.step() {
        Err(VmError::UnimplementedInstruction { opcode: 0x00 }) => {}
        other => return Err(format!("step returned {:?}", other)),
    }
    if vm.memory.cursor() != 2 {
        return Err(format!("cursor = {}", vm.memory.cursor()));
    }
    Ok(())
}

fn test_signed_operand() -> Result<(), String> {
    let image = compiler::assemble("PUSH.2 -300\nHALT").map_err(|e| e.to_string())?;
    let mut vm = Machine::with_program(&image).map_err(|e| e.to_string())?;
    let mut values = Vec::new();
    vm.run(|v| values.push(v)).map_err(|e| e.to_string())?;
    if values != [-300] {
        return Err(format!("values = {:?}", values));
    }
    Ok(())
}

fn test_fault_is_final() -> Result<(), String> {
    let mut vm = machine(&[0x02, 0x00], Registry::new())?;
    let first = vm.run(|_| {});
    let second = vm.run(|_| {});
    match (&first, &second) {
        (Err(a), Err(b)) if a == b => Ok(()),
        _ => Err(format!("first run {:?}, second run {:?}", first, second)),
    }
}

fn test_bounds() -> Result<(), String> {
    let mut memory = Memory::new(4);
    memory.advance(3).map_err(|e| e.to_string())?;
    memory.read_byte().map_err(|e| format!("capacity-1: {}", e))?;
    memory.advance(1).map_err(|e| e.to_string())?;
    match memory.read_byte() {
        Err(VmError::OutOfBounds { .. }) => Ok(()),
        other => Err(format!("read at capacity returned {:?}", other)),
    }
}

fn test_duplicate() -> Result<(), String> {
    let mut registry = Registry::with_defaults();
    match registry.register(0x01, abi::instructions::Halt) {
        Err(VmError::DuplicateOpcode { opcode: 0x01 }) => Ok(()),
        other => Err(format!("register returned {:?}", other)),
    }
}

fn test_demo_program() -> Result<(), String> {
    let mut vm = Machine::with_program(&compiler::demo_program()).map_err(|e| e.to_string())?;
    let mut values = Vec::new();
    let summary = vm.run(|v| values.push(v)).map_err(|e| e.to_string())?;
    if values != [47856] {
        return Err(format!("values = {:?}", values));
    }
    if summary.cycles != 2 {
        return Err(format!("cycles = {}", summary.cycles));
    }
    Ok(())
}
