//! Handlers for the standard instruction set.

use log::trace;

use crate::error::Result;
use crate::isa::InstructionWord;
use crate::memory::Memory;

pub type Value = i64;

/// What a handler asks the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Produced(Value),
    Halt,
}

/// Logic for one opcode. The loop has already consumed the instruction
/// word; the handler consumes its own operands through `memory`.
pub trait Handler: Send + Sync {
    fn execute(&self, word: InstructionWord, memory: &mut Memory) -> Result<Outcome>;
}

impl<F> Handler for F
where
    F: Fn(InstructionWord, &mut Memory) -> Result<Outcome> + Send + Sync,
{
    fn execute(&self, word: InstructionWord, memory: &mut Memory) -> Result<Outcome> {
        self(word, memory)
    }
}

/// `PUSH_INTEGER`: metadata holds the operand width in bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushInteger;

impl Handler for PushInteger {
    fn execute(&self, word: InstructionWord, memory: &mut Memory) -> Result<Outcome> {
        let width = word.metadata();
        trace!("integer byte size: {width}");
        decode_integer(memory, usize::from(width)).map(Outcome::Produced)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Halt;

impl Handler for Halt {
    fn execute(&self, _word: InstructionWord, _memory: &mut Memory) -> Result<Outcome> {
        Ok(Outcome::Halt)
    }
}

/// Read `width` bytes at the cursor, first byte in the lowest lane, and
/// sign-extend from the top bit of the last lane.
///
/// Bytes past the eighth are consumed but have no lane to land in.
pub fn decode_integer(memory: &mut Memory, width: usize) -> Result<Value> {
    let mut value: u64 = 0;
    for i in 0..width {
        let byte = memory.next_byte()?;
        let lane = u32::try_from(i * 8).ok().and_then(|s| u64::from(byte).checked_shl(s));
        if let Some(bits) = lane {
            value |= bits;
        }
        trace!("byte position {}: 0x{:016X} :: {}", i * 8, value, value as Value);
    }
    Ok(sign_extend(value, width))
}

fn sign_extend(value: u64, width: usize) -> Value {
    match width {
        1..=7 => {
            let shift = 64 - 8 * width as u32;
            ((value << shift) as Value) >> shift
        }
        _ => value as Value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;
    use crate::isa::Opcode;

    fn memory_with(image: &[u8]) -> Memory {
        let mut mem = Memory::new(image.len());
        mem.load(image).unwrap();
        mem
    }

    #[test]
    fn decodes_little_endian_lanes() {
        let mut mem = memory_with(&[0xF0, 0xBA, 0x00, 0x00]);
        assert_eq!(decode_integer(&mut mem, 4), Ok(47856));
        assert_eq!(mem.cursor(), 4);
    }

    #[test]
    fn zero_width_consumes_nothing() {
        let mut mem = memory_with(&[0x11]);
        assert_eq!(decode_integer(&mut mem, 0), Ok(0));
        assert_eq!(mem.cursor(), 0);
    }

    #[test]
    fn full_width_can_be_negative() {
        let mut mem = memory_with(&[0xFF; 8]);
        assert_eq!(decode_integer(&mut mem, 8), Ok(-1));
    }

    #[test]
    fn narrow_widths_are_sign_extended() {
        let mut mem = memory_with(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_integer(&mut mem, 4), Ok(-1));

        let mut mem = memory_with(&[0xD4, 0xFE]);
        assert_eq!(decode_integer(&mut mem, 2), Ok(-300));

        let mut mem = memory_with(&[0x80]);
        assert_eq!(decode_integer(&mut mem, 1), Ok(-128));

        let mut mem = memory_with(&[0x7F]);
        assert_eq!(decode_integer(&mut mem, 1), Ok(127));

        let mut mem = memory_with(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80]);
        assert_eq!(decode_integer(&mut mem, 7), Ok(-(1 << 55)));
    }

    #[test]
    fn extra_bytes_are_consumed_without_effect() {
        let mut image = vec![0x01, 0, 0, 0, 0, 0, 0, 0];
        image.extend([0xEE, 0xEE]);
        let mut mem = memory_with(&image);
        assert_eq!(decode_integer(&mut mem, 10), Ok(1));
        assert_eq!(mem.cursor(), 10);
    }

    #[test]
    fn short_operand_is_out_of_bounds() {
        let mut mem = memory_with(&[0x01, 0x02]);
        assert!(matches!(
            decode_integer(&mut mem, 3),
            Err(VmError::OutOfBounds { cursor: 2, .. })
        ));
    }

    #[test]
    fn push_integer_uses_metadata_as_width() {
        let mut mem = memory_with(&[0x34, 0x12, 0x99]);
        let word = InstructionWord::new(Opcode::PushInteger.into(), 2);
        assert_eq!(PushInteger.execute(word, &mut mem), Ok(Outcome::Produced(0x1234)));
        assert_eq!(mem.cursor(), 2);
    }

    #[test]
    fn closures_are_handlers() {
        let skip = |word: InstructionWord, mem: &mut Memory| -> Result<Outcome> {
            mem.advance(usize::from(word.metadata()))?;
            Ok(Outcome::Continue)
        };
        let mut mem = memory_with(&[0; 4]);
        assert_eq!(skip.execute(InstructionWord::new(0x10, 3), &mut mem), Ok(Outcome::Continue));
        assert_eq!(mem.cursor(), 3);
    }
}
