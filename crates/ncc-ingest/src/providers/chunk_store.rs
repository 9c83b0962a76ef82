//! Persistent store trait for chunk records

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// Trait for persisting embedded chunks
///
/// Implementations:
/// - `SupabaseStore`: PostgREST bulk insert into a Supabase table
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert a batch of records; no rollback of earlier batches on failure
    async fn insert_batch(&self, chunks: &[Chunk]) -> Result<()>;

    /// Destination description for logging
    fn name(&self) -> &str;
}
