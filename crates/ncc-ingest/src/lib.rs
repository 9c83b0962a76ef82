//! ncc-ingest: NCC building code PDFs to embedded, section-aligned chunks
//!
//! The PDF outline drives segmentation: every level-3 outline entry is one
//! section, its text is cut out of the surrounding pages at the section's
//! own code marker, and oversized sections are split by paragraph and then
//! by sentence. State and territory appendices are excluded. The resulting
//! chunks are embedded with Gemini and bulk inserted into Supabase.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod report;
pub mod types;

pub use config::{Credentials, IngestConfig, Volume};
pub use error::{Error, Result};
pub use ingestion::ChunkPipeline;
pub use processing::{OutputSink, SinkReport};
pub use types::{Chunk, Section, TocEntry};
