//! Supabase chunk store using the PostgREST bulk insert endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::{Credentials, StorageConfig};
use crate::error::{Error, Result};
use crate::types::Chunk;

use super::chunk_store::ChunkStore;

/// Supabase table writer
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    service_role_key: String,
    table: String,
}

impl SupabaseStore {
    /// Create a new store client
    pub fn new(config: &StorageConfig, credentials: &Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: credentials.supabase_url.trim_end_matches('/').to_string(),
            service_role_key: credentials.supabase_service_role_key.clone(),
            table: config.table.clone(),
        })
    }

    /// Get the table endpoint URL
    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl ChunkStore for SupabaseStore {
    async fn insert_batch(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Prefer", "return=minimal")
            .json(chunks)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::storage(format!(
                "insert into {} failed ({}): {}",
                self.table, status, body
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.table
    }
}
