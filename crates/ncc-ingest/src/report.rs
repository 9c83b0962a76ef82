//! Dry-run reporting: chunk listing and summary statistics

use std::collections::HashSet;
use std::io::Write;

use crate::error::Result;
use crate::ingestion::splitter::char_len;
use crate::types::Chunk;

/// Characters of content shown per chunk in the listing
pub const PREVIEW_CHARS: usize = 120;

/// Aggregate figures over a chunk list
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkStats {
    pub total: usize,
    pub unique_sections: usize,
    pub total_chars: usize,
    pub average_chars: f64,
    /// Zero-based indices of chunks above the size limit
    pub oversized: Vec<usize>,
}

impl ChunkStats {
    /// Compute statistics against a character limit
    pub fn compute(chunks: &[Chunk], max_chars: usize) -> Self {
        let unique_sections = chunks
            .iter()
            .filter_map(|c| c.section.as_deref())
            .collect::<HashSet<_>>()
            .len();
        let lengths: Vec<usize> = chunks.iter().map(Chunk::char_len).collect();
        let total_chars: usize = lengths.iter().sum();
        let average_chars = if chunks.is_empty() {
            0.0
        } else {
            total_chars as f64 / chunks.len() as f64
        };
        let oversized = lengths
            .iter()
            .enumerate()
            .filter(|(_, &len)| len > max_chars)
            .map(|(i, _)| i)
            .collect();

        Self {
            total: chunks.len(),
            unique_sections,
            total_chars,
            average_chars,
            oversized,
        }
    }
}

/// Single-line preview of a chunk's content
pub fn preview(content: &str) -> String {
    content
        .chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Print the human-readable listing followed by the summary
pub fn write_listing<W: Write>(out: &mut W, chunks: &[Chunk], max_chars: usize) -> Result<()> {
    for (i, chunk) in chunks.iter().enumerate() {
        writeln!(
            out,
            "[{:3}] section={} title={} chars={}",
            i + 1,
            chunk.section.as_deref().unwrap_or("N/A"),
            chunk.title,
            chunk.char_len()
        )?;
        writeln!(out, "     part={}", chunk.part.as_deref().unwrap_or("N/A"))?;
        writeln!(out, "     {}...", preview(&chunk.content))?;
        writeln!(out)?;
    }

    write_summary(out, chunks, max_chars)
}

/// Print the summary block
pub fn write_summary<W: Write>(out: &mut W, chunks: &[Chunk], max_chars: usize) -> Result<()> {
    let stats = ChunkStats::compute(chunks, max_chars);

    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Total chunks: {}", stats.total)?;
    writeln!(out, "Unique sections: {}", stats.unique_sections)?;
    writeln!(out, "Total chars: {}", stats.total_chars)?;
    writeln!(out, "Avg chunk size: {:.0} chars", stats.average_chars)?;
    writeln!(out, "Chunks over {} chars: {}", max_chars, stats.oversized.len())?;

    for &i in &stats.oversized {
        let chunk = &chunks[i];
        writeln!(
            out,
            "  WARNING: [{:3}] {} '{}' = {} chars",
            i + 1,
            chunk.section.as_deref().unwrap_or("N/A"),
            chunk.title,
            char_len(&chunk.content)
        )?;
    }

    Ok(())
}

/// Print one JSON object per chunk
pub fn write_json_lines<W: Write>(out: &mut W, chunks: &[Chunk]) -> Result<()> {
    for chunk in chunks {
        serde_json::to_writer(&mut *out, chunk)?;
        writeln!(out)?;
    }
    Ok(())
}
