//! Configuration for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable holding the Supabase project URL
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the Supabase service role key
pub const SUPABASE_KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";
/// Environment variable holding the Gemini API key
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

/// Jurisdiction abbreviations that mark state and territory appendices
const JURISDICTIONS: [&str; 8] = ["ACT", "NSW", "NT", "QLD", "SA", "TAS", "VIC", "WA"];

/// Supported NCC volumes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Volume {
    /// Volume One: class 2 to 9 buildings
    One,
    /// Volume Two: class 1 and 10 buildings
    #[default]
    Two,
}

impl Volume {
    /// Resolve a volume from its number
    pub fn from_number(number: u8) -> Result<Self> {
        match number {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(Error::UnsupportedVolume(other.to_string())),
        }
    }

    /// Volume number as stored on every chunk
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Volume name as printed in the running page header
    pub fn header_name(self) -> &'static str {
        match self {
            Self::One => "Volume One",
            Self::Two => "Volume Two",
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Volume {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let number: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::UnsupportedVolume(s.to_string()))?;
        Self::from_number(number)
    }
}

impl TryFrom<u8> for Volume {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_number(value)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.number()
    }
}

/// Immutable per-volume settings handed to the loader and segmenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeProfile {
    /// Volume this profile describes
    pub volume: Volume,
    /// Second line of the running page header
    pub title_line: String,
    /// Building classes every chunk of this volume applies to
    pub applicable_classes: Vec<u32>,
    /// Date stamp printed in the page footer
    pub footer_stamp: String,
    /// Prefixes of bracketed amendment annotations
    pub annotation_prefixes: Vec<String>,
    /// State and territory abbreviations
    pub jurisdictions: Vec<String>,
}

impl VolumeProfile {
    /// Build the profile for a volume
    pub fn for_volume(volume: Volume) -> Self {
        let applicable_classes = match volume {
            Volume::One => vec![2, 3, 4, 5, 6, 7, 8, 9],
            Volume::Two => vec![1, 10],
        };

        Self {
            volume,
            title_line: format!(
                "NCC 2022 {} - Building Code of Australia",
                volume.header_name()
            ),
            applicable_classes,
            footer_stamp: "(1 May 2023)".to_string(),
            annotation_prefixes: vec![
                "2019".to_string(),
                "New for 2022".to_string(),
                "New For 2022".to_string(),
            ],
            jurisdictions: JURISDICTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Full ingestion configuration, optionally loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunk size limits
    pub chunking: ChunkingConfig,
    /// Section boundary detection
    pub segmentation: SegmentationConfig,
    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
    /// Retry policy for transient embedding failures
    pub retry: RetryConfig,
    /// Persistent store settings
    pub storage: StorageConfig,
}

impl IngestConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunking.min_chunk_chars == 0 {
            return Err(Error::config("chunking.min_chunk_chars must be positive"));
        }
        if self.chunking.max_chunk_chars <= self.chunking.min_chunk_chars {
            return Err(Error::config(
                "chunking.max_chunk_chars must exceed chunking.min_chunk_chars",
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::config("embedding.batch_size must be positive"));
        }
        if self.storage.batch_size == 0 {
            return Err(Error::config("storage.batch_size must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum fragment size in characters
    pub max_chunk_chars: usize,
    /// Fragments below this size are merged into a neighbour
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 2000,
            min_chunk_chars: 50,
        }
    }
}

/// Section boundary detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Invisible character the text layer wraps section identifiers in
    pub marker_separator: char,
    /// Look for identifiers at line starts when the wrapped marker is absent
    pub line_anchored_fallback: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            marker_separator: '\u{200A}', // hair space
            line_anchored_fallback: true,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name
    pub model: String,
    /// Requested output dimensionality
    pub dimensions: usize,
    /// Texts per request
    pub batch_size: usize,
    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Pause between batches
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "gemini-embedding-001".to_string(),
            dimensions: 768,
            batch_size: 20,
            batch_delay_ms: 500,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Retry configuration for transient provider failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first
    pub max_attempts: u32,
    /// Wait grows by this many seconds per failed attempt
    pub backoff_step_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step_secs: 15,
        }
    }
}

/// Persistent store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Destination table
    pub table: String,
    /// Records per insert request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table: "ncc_chunks".to_string(),
            batch_size: 50,
            timeout_secs: 60,
        }
    }
}

/// Credentials for the embedding provider and the persistent store
#[derive(Clone)]
pub struct Credentials {
    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service role key
    pub supabase_service_role_key: String,
    /// Gemini API key
    pub gemini_api_key: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup, reporting every missing key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supabase_url = fetch(SUPABASE_URL_VAR);
        let supabase_key = fetch(SUPABASE_KEY_VAR);
        let gemini_key = fetch(GEMINI_KEY_VAR);

        match (supabase_url, supabase_key, gemini_key) {
            (Some(supabase_url), Some(supabase_service_role_key), Some(gemini_api_key)) => {
                Ok(Self {
                    supabase_url,
                    supabase_service_role_key,
                    gemini_api_key,
                })
            }
            (url, key, gemini) => {
                let missing = [
                    (SUPABASE_URL_VAR, url.is_none()),
                    (SUPABASE_KEY_VAR, key.is_none()),
                    (GEMINI_KEY_VAR, gemini.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name.to_string())
                .collect();
                Err(Error::MissingCredentials(missing))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_role_key", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_volume_parsing() {
        assert_eq!("1".parse::<Volume>().unwrap(), Volume::One);
        assert_eq!(" 2 ".parse::<Volume>().unwrap(), Volume::Two);
        assert!(matches!("3".parse::<Volume>(), Err(Error::UnsupportedVolume(_))));
        assert!(matches!("two".parse::<Volume>(), Err(Error::UnsupportedVolume(_))));
        assert_eq!(Volume::default(), Volume::Two);
    }

    #[test]
    fn test_volume_profiles() {
        let one = VolumeProfile::for_volume(Volume::One);
        assert_eq!(one.applicable_classes, vec![2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(one.title_line, "NCC 2022 Volume One - Building Code of Australia");

        let two = VolumeProfile::for_volume(Volume::Two);
        assert_eq!(two.applicable_classes, vec![1, 10]);
        assert!(two.jurisdictions.contains(&"NSW".to_string()));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.max_chunk_chars, 2000);
        assert_eq!(config.embedding.batch_size, 20);
        assert_eq!(config.storage.batch_size, 50);
        assert_eq!(config.segmentation.marker_separator, '\u{200A}');
    }

    #[test]
    fn test_config_from_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[chunking]\nmax_chunk_chars = 1500\n\n[storage]\ntable = \"ncc_chunks_v2\""
        )
        .unwrap();

        let config = IngestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chunking.max_chunk_chars, 1500);
        assert_eq!(config.chunking.min_chunk_chars, 50);
        assert_eq!(config.storage.table, "ncc_chunks_v2");
        assert_eq!(config.storage.batch_size, 50);
    }

    #[test]
    fn test_config_rejects_inverted_limits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chunking]\nmax_chunk_chars = 40\nmin_chunk_chars = 50").unwrap();

        let err = IngestConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = IngestConfig::from_file("/nonexistent/ncc.toml").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_credentials_report_all_missing() {
        let mut env = HashMap::new();
        env.insert(SUPABASE_URL_VAR, "https://example.supabase.co".to_string());
        env.insert(GEMINI_KEY_VAR, "   ".to_string());

        let err = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        match err {
            Error::MissingCredentials(missing) => {
                assert_eq!(missing, vec![SUPABASE_KEY_VAR.to_string(), GEMINI_KEY_VAR.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials {
            supabase_url: "https://example.supabase.co".to_string(),
            supabase_service_role_key: "secret-role".to_string(),
            gemini_api_key: "secret-gemini".to_string(),
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret"));
    }
}
