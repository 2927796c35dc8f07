//! stackslice-core: Core types for image stack slicing.
//!
//! This crate provides the data model shared by the engine, I/O and CLI:
//! 2D channels, line geometry and profile extraction, and the composite
//! frame × position grid the slices are assembled into.
//!

pub mod channel;
pub mod error;
pub mod grid;
pub mod profile;

pub use channel::{Channel, Quantity};
pub use error::{Error, Result};
pub use grid::{GridDescriptor, SliceGrid};
pub use profile::{
    BilinearProfileExtraction, LineProfileConfig, Point, Profile, ProfileExtraction, ProfileLine,
};
