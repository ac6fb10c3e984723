//! In-place SPIR-V remapping over caller-owned buffers.
//!
//! The safe layer is [`SpirvBuffer`]: a borrowed word slice plus the number
//! of valid words in it. The slice length is the capacity a transformed
//! module has to fit into. The C entry points at the bottom of this file are
//! thin shells over it and keep the two-pointer `(words, len)` shape only at
//! the boundary.

use spvremap_core::{RemapError, RemapOptions, Remapper, Transform};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Why an in-place remap left the buffer untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("remapped module needs {needed} words but the buffer holds {capacity}")]
    TooLarge { needed: usize, capacity: usize },

    #[error(transparent)]
    Transform(#[from] RemapError),
}

/// A caller-owned word buffer and its reported length.
#[derive(Debug)]
pub struct SpirvBuffer<'a> {
    storage: &'a mut [u32],
    len: usize,
}

impl<'a> SpirvBuffer<'a> {
    /// View the whole slice as a module.
    pub fn new(storage: &'a mut [u32]) -> Self {
        let len = storage.len();
        Self { storage, len }
    }

    /// The valid words of the current module.
    pub fn words(&self) -> &[u32] {
        &self.storage[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Words available for a transformed module.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Run `transform` over a copy of the module and write the result back
    /// if it fits. On error neither the words nor the length change.
    pub fn remap_with(&mut self, transform: &impl Transform) -> Result<usize, BufferError> {
        let output = transform.transform(self.words().to_vec())?;
        if output.len() > self.capacity() {
            return Err(BufferError::TooLarge {
                needed: output.len(),
                capacity: self.capacity(),
            });
        }
        self.storage[..output.len()].copy_from_slice(&output);
        self.len = output.len();
        Ok(self.len)
    }
}

/// Remap `words[..*len]` in place. Returns false, leaving both untouched,
/// when the transform fails or its output does not fit in `*len` words.
pub fn remap_in_place(transform: &impl Transform, words: &mut [u32], len: &mut usize) -> bool {
    let capacity = words.len();
    let Some(module) = words.get_mut(..*len) else {
        tracing::warn!(len = *len, capacity, "reported length exceeds buffer");
        return false;
    };
    let mut buffer = SpirvBuffer::new(module);
    match buffer.remap_with(transform) {
        Ok(new_len) => {
            *len = new_len;
            true
        }
        Err(err) => {
            tracing::debug!(error = %err, "in-place remap declined");
            false
        }
    }
}

/// # Safety
///
/// `spv` must be valid for reads and writes of `*spv_len` words, and
/// `spv_len` must be valid for reads and writes, for the whole call.
unsafe fn remap_raw(spv: *mut u32, spv_len: *mut usize, options: RemapOptions) -> bool {
    if spv_len.is_null() {
        return false;
    }
    // SAFETY: non-null and valid per the caller contract.
    let len = unsafe { &mut *spv_len };
    let words: &mut [u32] = if *len == 0 {
        &mut []
    } else if spv.is_null() {
        return false;
    } else {
        // SAFETY: non-null and valid for `*len` words per the caller contract.
        unsafe { std::slice::from_raw_parts_mut(spv, *len) }
    };

    let remapper = Remapper::new(options);
    catch_unwind(AssertUnwindSafe(|| remap_in_place(&remapper, words, len))).unwrap_or(false)
}

/// Remap a SPIR-V module in place with every pass enabled.
///
/// On success the first `*spv_len` words of `spv` hold the remapped module
/// and `*spv_len` is its new word count. On failure neither is modified.
///
/// # Safety
///
/// `spv` must point to at least `*spv_len` writable words (it may be null
/// when `*spv_len` is 0) and `spv_len` must point to a writable `size_t`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spvremap_remap(spv: *mut u32, spv_len: *mut usize) -> bool {
    // SAFETY: forwarded caller contract.
    unsafe { remap_raw(spv, spv_len, RemapOptions::everything()) }
}

/// Like [`spvremap_remap`] with an explicit pass mask. Unknown bits make the
/// call fail without touching the buffer.
///
/// # Safety
///
/// Same contract as [`spvremap_remap`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spvremap_remap_with_options(
    spv: *mut u32,
    spv_len: *mut usize,
    flags: u32,
) -> bool {
    let Ok(options) = RemapOptions::from_bits(flags) else {
        return false;
    };
    // SAFETY: forwarded caller contract.
    unsafe { remap_raw(spv, spv_len, options) }
}
