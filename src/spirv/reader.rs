use crate::spirv::ShaderReflectionError;

pub const MAGIC_NUMBER: u32 = 0x0723_0203;
pub const HEADER_WORD_COUNT: usize = 5;

/// Converts a SPIR-V byte stream into host-order words, accepting either
/// endianness as identified by the magic number.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, ShaderReflectionError> {
    if bytes.len() % 4 != 0 {
        return Err(ShaderReflectionError::UnalignedLength(bytes.len()));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();

    if words.first() == Some(&MAGIC_NUMBER.swap_bytes()) {
        for word in words.iter_mut() {
            *word = word.swap_bytes();
        }
    }

    Ok(words)
}

pub struct WordReader<'a> {
    words: &'a [u32],
    position: usize,
}

impl<'a> WordReader<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self { words, position: 0 }
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let word = *self.words.get(self.position)?;
        self.position += 1;
        Some(word)
    }

    pub fn read_slice(&mut self, count: usize) -> Option<&'a [u32]> {
        let end = self.position.checked_add(count)?;
        let slice = self.words.get(self.position..end)?;
        self.position = end;
        Some(slice)
    }

    pub fn next_instruction(&mut self) -> Result<Option<Instruction<'a>>, ShaderReflectionError> {
        let offset = self.position;

        let header = match self.read_u32() {
            Some(header) => header,
            None => return Ok(None),
        };

        let word_count = (header >> 16) as usize;
        let opcode = (header & 0xffff) as u16;

        if word_count == 0 {
            return Err(ShaderReflectionError::ZeroWordCount { offset });
        }

        let operands = self.read_slice(word_count - 1).ok_or(
            ShaderReflectionError::TruncatedInstruction { offset, word_count },
        )?;

        Ok(Some(Instruction {
            offset,
            opcode,
            operands,
        }))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: u16,
    pub operands: &'a [u32],
}

impl<'a> Instruction<'a> {
    pub fn operand(&self, index: usize) -> Result<u32, ShaderReflectionError> {
        self.operands
            .get(index)
            .copied()
            .ok_or(ShaderReflectionError::MissingOperands {
                offset: self.offset,
                opcode: self.opcode,
            })
    }

    /// Reads a nul-terminated UTF-8 literal starting at `index`, returning it
    /// with the number of words it occupies.
    pub fn literal_string(&self, index: usize) -> Result<(String, usize), ShaderReflectionError> {
        let words = self.operands.get(index..).unwrap_or_default();
        let mut bytes = Vec::new();

        for (word_index, word) in words.iter().enumerate() {
            for byte in word.to_le_bytes() {
                if byte == 0 {
                    let literal = String::from_utf8(bytes)
                        .map_err(|_| ShaderReflectionError::InvalidLiteral { offset: self.offset })?;
                    return Ok((literal, word_index + 1));
                }

                bytes.push(byte);
            }
        }

        Err(ShaderReflectionError::InvalidLiteral {
            offset: self.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_byte_order_is_accepted() {
        let little: Vec<u8> = [MAGIC_NUMBER, 0x0001_0300]
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();
        let big: Vec<u8> = [MAGIC_NUMBER, 0x0001_0300]
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .collect();

        assert_eq!(words_from_bytes(&little).unwrap(), vec![MAGIC_NUMBER, 0x0001_0300]);
        assert_eq!(words_from_bytes(&big).unwrap(), vec![MAGIC_NUMBER, 0x0001_0300]);
    }

    #[test]
    fn unaligned_byte_stream_is_rejected() {
        assert_eq!(
            words_from_bytes(&[0x03, 0x02, 0x23, 0x07, 0x00]),
            Err(ShaderReflectionError::UnalignedLength(5))
        );
    }

    #[test]
    fn instructions_are_split_by_word_count() {
        let words = [(3 << 16) | 71, 7, 33, (1 << 16) | 253];
        let mut reader = WordReader::new(&words);

        let first = reader.next_instruction().unwrap().unwrap();
        assert_eq!(first.opcode, 71);
        assert_eq!(first.operands, &[7, 33]);

        let second = reader.next_instruction().unwrap().unwrap();
        assert_eq!(second.offset, 3);
        assert!(second.operands.is_empty());

        assert!(reader.next_instruction().unwrap().is_none());
    }

    #[test]
    fn malformed_word_counts_are_rejected() {
        let mut reader = WordReader::new(&[71]);
        assert_eq!(
            reader.next_instruction().unwrap_err(),
            ShaderReflectionError::ZeroWordCount { offset: 0 }
        );

        let mut reader = WordReader::new(&[(4 << 16) | 71, 7]);
        assert_eq!(
            reader.next_instruction().unwrap_err(),
            ShaderReflectionError::TruncatedInstruction {
                offset: 0,
                word_count: 4
            }
        );
    }

    #[test]
    fn literal_strings_consume_their_padding() {
        let name = u32::from_le_bytes(*b"main");
        let instruction = Instruction {
            offset: 0,
            opcode: 15,
            operands: &[0, 1, name, 0, 9],
        };

        assert_eq!(
            instruction.literal_string(2).unwrap(),
            (String::from("main"), 2)
        );
    }
}
