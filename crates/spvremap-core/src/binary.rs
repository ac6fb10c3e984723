//! Word-level view of a SPIR-V module image.
//!
//! Everything here works on raw `u32` words without decoding the
//! instruction stream: header validation, byte/word conversion with
//! endianness detection, and encoders for hand-built instructions.

use crate::error::RemapError;
use rspirv::spirv::{Op, Word};
use serde::{Deserialize, Serialize};

/// The SPIR-V magic number in host byte order.
pub const MAGIC_NUMBER: Word = 0x0723_0203;

/// Number of words in the module header.
pub const HEADER_WORDS: usize = 5;

/// The five-word module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub magic: Word,
    pub version: Word,
    pub generator: Word,
    pub bound: Word,
    pub schema: Word,
}

impl Header {
    /// Validate and read the header at the start of `words`.
    pub fn parse(words: &[Word]) -> Result<Self, RemapError> {
        if words.len() < HEADER_WORDS {
            return Err(RemapError::Truncated(words.len()));
        }
        let magic = words[0];
        if magic == MAGIC_NUMBER.swap_bytes() {
            return Err(RemapError::ByteSwapped);
        }
        if magic != MAGIC_NUMBER {
            return Err(RemapError::InvalidMagic(magic));
        }
        Ok(Self {
            magic,
            version: words[1],
            generator: words[2],
            bound: words[3],
            schema: words[4],
        })
    }

    /// Version as `(major, minor)`.
    pub fn version_pair(&self) -> (u8, u8) {
        (
            ((self.version >> 16) & 0xff) as u8,
            ((self.version >> 8) & 0xff) as u8,
        )
    }

    pub fn to_words(self) -> [Word; HEADER_WORDS] {
        [
            self.magic,
            self.version,
            self.generator,
            self.bound,
            self.schema,
        ]
    }
}

/// Split a byte image into words, detecting its byte order from the magic
/// number. An empty image yields no words.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<Word>, RemapError> {
    if bytes.len() % 4 != 0 {
        return Err(RemapError::UnalignedBytes(bytes.len()));
    }
    let Some(first) = bytes.first_chunk::<4>() else {
        return Ok(Vec::new());
    };

    let decode: fn([u8; 4]) -> Word = if Word::from_le_bytes(*first) == MAGIC_NUMBER {
        Word::from_le_bytes
    } else if Word::from_be_bytes(*first) == MAGIC_NUMBER {
        Word::from_be_bytes
    } else {
        return Err(RemapError::InvalidMagic(Word::from_le_bytes(*first)));
    };

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| decode([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Serialize words as a little-endian byte image.
pub fn words_to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// Encode one instruction: the leading word packs the word count and opcode.
pub fn encode_instruction(op: Op, operands: &[Word]) -> Vec<Word> {
    let word_count = (operands.len() + 1) as Word;
    let mut words = Vec::with_capacity(operands.len() + 1);
    words.push((word_count << 16) | op as Word);
    words.extend_from_slice(operands);
    words
}

/// Encode a literal string: UTF-8, nul-terminated, zero-padded to a word.
pub fn encode_string(value: &str) -> Vec<Word> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
