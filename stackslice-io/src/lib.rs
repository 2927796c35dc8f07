//! stackslice-io: File I/O for stackslice.
//!
//! This crate reads channel stacks from JSON files and writes assembled
//! slice grids as CSV or little-endian binary.
//!

#[cfg(feature = "ndarray")]
pub mod array;
mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{read_stack, read_stack_from, write_stack, write_stack_to};
pub use writer::{GridFormat, GridWriter};
