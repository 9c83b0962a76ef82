//! Core types for the table of contents, sections, and chunk records

pub mod chunk;
pub mod section;
pub mod toc;

pub use chunk::Chunk;
pub use section::{PageRange, Section};
pub use toc::TocEntry;
