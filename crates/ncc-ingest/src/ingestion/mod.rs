//! Document ingestion: loading, section segmentation, and chunk splitting

pub mod cleaner;
pub mod loader;
pub mod pipeline;
pub mod segmenter;
pub mod splitter;

pub use cleaner::PageCleaner;
pub use loader::{DocumentLoader, LoadedDocument, MemoryDocument, PageSource, PdfDocument};
pub use pipeline::ChunkPipeline;
pub use segmenter::SectionSegmenter;
pub use splitter::ChunkSplitter;
