// Assembler for the standard instruction set, plus the demonstration
// program and a small disassembler used by the shells.

use abi::{InstructionWord, Opcode};
use thiserror::Error;

pub const MAX_INTEGER_WIDTH: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("integer width {0} is outside 1..=8")]
    WidthOutOfRange(u8),
    #[error("value {value} does not fit in {width} byte(s)")]
    ValueOutOfRange { value: i64, width: u8 },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Builds an image instruction by instruction.
#[derive(Debug, Default, Clone)]
pub struct Assembler {
    code: Vec<u8>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PUSH_INTEGER` with a `width`-byte little-endian operand. The operand
    /// is signed two's complement, so `value` must lie in the signed range
    /// of `width` bytes.
    pub fn push_integer(&mut self, value: i64, width: u8) -> Result<&mut Self, AsmError> {
        if width == 0 || width > MAX_INTEGER_WIDTH {
            return Err(AsmError::WidthOutOfRange(width));
        }
        if !fits(value, width) {
            return Err(AsmError::ValueOutOfRange { value, width });
        }
        self.raw(InstructionWord::new(Opcode::PushInteger.into(), width));
        self.code
            .extend_from_slice(&value.to_le_bytes()[..usize::from(width)]);
        Ok(self)
    }

    pub fn halt(&mut self) -> &mut Self {
        self.raw(InstructionWord::new(Opcode::Halt.into(), 0xFF))
    }

    /// Emit an arbitrary instruction word, high byte first.
    pub fn raw(&mut self, word: InstructionWord) -> &mut Self {
        self.code.extend_from_slice(&word.to_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}

fn fits(value: i64, width: u8) -> bool {
    if width >= MAX_INTEGER_WIDTH {
        return true;
    }
    let half = 1i64 << (u32::from(width) * 8 - 1);
    (-half..half).contains(&value)
}

/// The demonstration image: push 47856 as a 4-byte integer, then the
/// `0xFFFF` end-of-program word.
///
/// ```text
/// 04 01 f0 ba 00 00 ff ff
/// ```
pub fn demo_program() -> Vec<u8> {
    let mut asm = Assembler::new();
    asm.push_integer(47856, 4)
        .expect("47856 fits in a 4-byte operand");
    asm.halt();
    asm.finish()
}

/// Assemble the text form:
///
/// ```text
/// PUSH.4 47856   ; width suffix is the operand size in bytes
/// WORD 0x0401    ; raw instruction word
/// HALT
/// ```
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let mut asm = Assembler::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw_line.split(';').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let syntax = |message: String| AsmError::Syntax { line, message };

        match tokens.as_slice() {
            ["HALT"] => {
                asm.halt();
            }
            ["WORD", word] => {
                let word = parse_int(word)
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| syntax(format!("bad instruction word '{word}'")))?;
                asm.raw(InstructionWord(word));
            }
            [mnemonic, value] if mnemonic.starts_with("PUSH.") => {
                let width = mnemonic["PUSH.".len()..]
                    .parse::<u8>()
                    .map_err(|_| syntax(format!("bad width in '{mnemonic}'")))?;
                let value = parse_int(value).ok_or_else(|| syntax(format!("bad integer '{value}'")))?;
                asm.push_integer(value, width).map_err(|e| syntax(e.to_string()))?;
            }
            _ => return Err(syntax(format!("unknown instruction '{text}'"))),
        }
    }
    Ok(asm.finish())
}

fn parse_int(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub offset: usize,
    pub word: InstructionWord,
    pub opcode: Option<Opcode>,
    pub operands: Vec<u8>,
}

impl std::fmt::Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.opcode.map_or("???", Opcode::mnemonic);
        write!(f, "{:04}: {} {:<12}", self.offset, self.word, name)?;
        for byte in &self.operands {
            write!(f, " {byte:02x}")?;
        }
        Ok(())
    }
}

/// Walk an image with the standard instruction set. Stops after `HALT`, at
/// the first unknown opcode, or when the image runs out.
pub fn disassemble(image: &[u8]) -> Vec<Listing> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + InstructionWord::SIZE <= image.len() {
        let word = InstructionWord::from_bytes(image[pos], image[pos + 1]);
        let opcode = Opcode::from_u8(word.opcode());
        let start = pos + InstructionWord::SIZE;
        let operand_len = match opcode {
            Some(Opcode::PushInteger) => usize::from(word.metadata()),
            _ => 0,
        };
        let end = (start + operand_len).min(image.len());
        out.push(Listing {
            offset: pos,
            word,
            opcode,
            operands: image[start..end].to_vec(),
        });
        if !matches!(opcode, Some(Opcode::PushInteger)) {
            break;
        }
        pos = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_program_bytes() {
        assert_eq!(demo_program(), vec![0x04, 0x01, 0xF0, 0xBA, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn text_form_matches_builder() {
        let src = "
            ; demonstration
            PUSH.4 47856
            HALT
        ";
        assert_eq!(assemble(src).unwrap(), demo_program());
        assert_eq!(assemble("WORD 0xFFFF").unwrap(), vec![0xFF, 0xFF]);
        assert_eq!(assemble("PUSH.1 -1").unwrap(), vec![0x01, 0x01, 0xFF]);
        assert_eq!(assemble("PUSH.2 0x1234").unwrap(), vec![0x02, 0x01, 0x34, 0x12]);
    }

    #[test]
    fn assemble_reports_line_numbers() {
        let err = assemble("HALT\nJUMP 4").unwrap_err();
        assert!(matches!(err, AsmError::Syntax { line: 2, .. }));
        let err = assemble("\nPUSH.9 1").unwrap_err();
        assert!(matches!(err, AsmError::Syntax { line: 2, .. }));
        assert!(assemble("WORD 0x10000").is_err());
    }

    #[test]
    fn push_integer_checks_range() {
        let mut asm = Assembler::new();
        assert_eq!(asm.push_integer(1, 0).unwrap_err(), AsmError::WidthOutOfRange(0));
        assert_eq!(
            asm.push_integer(256, 1).unwrap_err(),
            AsmError::ValueOutOfRange { value: 256, width: 1 }
        );
        assert_eq!(
            asm.push_integer(128, 1).unwrap_err(),
            AsmError::ValueOutOfRange { value: 128, width: 1 }
        );
        assert!(asm.push_integer(-129, 1).is_err());
        assert!(asm.push_integer(127, 1).is_ok());
        assert!(asm.push_integer(-128, 1).is_ok());
        assert!(asm.push_integer(i64::MIN, 8).is_ok());
        assert_eq!(asm.len(), 3 + 3 + 10);
    }

    #[test]
    fn disassemble_demo() {
        let listing = disassemble(&demo_program());
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].opcode, Some(Opcode::PushInteger));
        assert_eq!(listing[0].operands, vec![0xF0, 0xBA, 0x00, 0x00]);
        assert_eq!(listing[1].offset, 6);
        assert_eq!(listing[1].opcode, Some(Opcode::Halt));
        assert_eq!(listing[0].to_string(), "0000: 0x0401 PUSH_INTEGER f0 ba 00 00");
    }

    #[test]
    fn disassemble_stops_at_unknown() {
        let listing = disassemble(&[0x02, 0x00, 0x04, 0x01]);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].opcode, None);
    }
}
