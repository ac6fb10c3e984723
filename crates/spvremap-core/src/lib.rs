//! # spvremap core
//!
//! Rewrites SPIR-V modules so that equivalent shaders produce similar
//! binaries: debug information is stripped, dead functions, variables and
//! types are removed, trivial function-local loads and stores are folded,
//! and ids are renumbered from what they denote rather than from the order
//! a producer emitted them in.
//!
//! ## Architecture
//!
//! ```text
//! binary      ← header, byte/word conversion, word encoders
//!     │
//! ids, names  ← id operand access, traversal, name gathering
//!     │
//! strip, loadstore, dce, canon   ← the passes
//!     │
//! Remapper    ← runs the passes selected by RemapOptions
//!     │
//! Transform   ← words in, words out; what buffer plumbing depends on
//! ```

pub mod binary;
pub mod error;
pub mod options;
pub mod remapper;
pub mod transform;

mod canon;
mod dce;
mod ids;
mod loadstore;
mod names;
mod strip;

pub use rspirv;

pub use binary::{Header, MAGIC_NUMBER, words_from_bytes, words_to_bytes};
pub use error::RemapError;
pub use options::RemapOptions;
pub use remapper::{RemapReport, Remapped, Remapper};
pub use transform::Transform;
