//! Provider abstractions for embeddings and chunk storage
//!
//! The ingestion core never talks to the network; these traits are the seam
//! the output sink uses, so tests can swap in in-memory providers.

pub mod chunk_store;
pub mod embedding;
pub mod gemini;
pub mod supabase;

pub use chunk_store::ChunkStore;
pub use embedding::EmbeddingProvider;
pub use gemini::GeminiEmbedder;
pub use supabase::SupabaseStore;
