//! Error types for remap operations.

use rspirv::spirv::Word;

/// Errors arising from malformed input or invalid remap requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    /// Fewer words than the five-word module header.
    #[error("module too short: {0} words, expected at least 5 header words")]
    Truncated(usize),

    /// The first word is not the SPIR-V magic number in either byte order.
    #[error("invalid magic number {0:#010x}")]
    InvalidMagic(Word),

    /// The magic number is present but byte-swapped relative to the host.
    #[error("module words are byte-swapped relative to the host")]
    ByteSwapped,

    /// A byte image whose length cannot be split into words.
    #[error("byte length {0} is not a multiple of four")]
    UnalignedBytes(usize),

    /// The instruction stream could not be decoded.
    #[error("failed to parse module: {0}")]
    Parse(String),

    /// An id is referenced but has no defining instruction.
    #[error("id {0} is referenced but never defined")]
    UndefinedId(Word),

    /// An option mask carries bits with no known pass.
    #[error("unknown remap option bits: {0:#x}")]
    UnknownOptionBits(u32),
}
