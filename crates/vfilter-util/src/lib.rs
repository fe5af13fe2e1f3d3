//! Shared foundation for the filter expression crates: the error type and
//! the per-sample bit vector used throughout compilation and evaluation.

mod bitset;
mod error;
pub mod variant_type;

pub use bitset::BitSet;
pub use error::{FilterError, Result};
