//! The narrow seam between buffer plumbing and the remap algorithm.

use crate::error::RemapError;
use crate::remapper::Remapper;
use rspirv::spirv::Word;

/// Turns one module image into another, possibly shorter, one.
///
/// The boundary code only needs this; tests drive it with closures.
pub trait Transform {
    fn transform(&self, words: Vec<Word>) -> Result<Vec<Word>, RemapError>;
}

impl Transform for Remapper {
    fn transform(&self, words: Vec<Word>) -> Result<Vec<Word>, RemapError> {
        self.remap(&words).map(|remapped| remapped.words)
    }
}

impl<F> Transform for F
where
    F: Fn(Vec<Word>) -> Result<Vec<Word>, RemapError>,
{
    fn transform(&self, words: Vec<Word>) -> Result<Vec<Word>, RemapError> {
        self(words)
    }
}
