//! End-to-end transformation from a document to its ordered chunk list

use std::path::Path;

use crate::config::{IngestConfig, Volume, VolumeProfile};
use crate::error::Result;
use crate::types::{Chunk, Section};

use super::loader::{DocumentLoader, LoadedDocument, PageSource};
use super::segmenter::SectionSegmenter;
use super::splitter::{char_len, ChunkSplitter};

/// Loader, segmenter, and splitter for one volume
pub struct ChunkPipeline {
    loader: DocumentLoader,
    segmenter: SectionSegmenter,
    splitter: ChunkSplitter,
}

impl ChunkPipeline {
    /// Build the pipeline for a volume
    pub fn new(volume: Volume, config: &IngestConfig) -> Result<Self> {
        config.validate()?;
        let loader = DocumentLoader::new(volume)?;
        let segmenter = SectionSegmenter::new(loader.profile(), &config.segmentation);
        let splitter = ChunkSplitter::from_config(&config.chunking);

        Ok(Self {
            loader,
            segmenter,
            splitter,
        })
    }

    /// Profile of the selected volume
    pub fn profile(&self) -> &VolumeProfile {
        self.loader.profile()
    }

    /// Chunk a PDF file
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
        let doc = self.loader.open(path)?;
        self.run(doc)
    }

    /// Chunk any page source
    pub fn run_source<S: PageSource>(&self, source: S) -> Result<Vec<Chunk>> {
        let doc = self.loader.load(source)?;
        self.run(doc)
    }

    /// Chunk a loaded document, consuming it
    pub fn run<S: PageSource>(&self, mut doc: LoadedDocument<S>) -> Result<Vec<Chunk>> {
        let sections = self.segmenter.segment(&mut doc)?;
        drop(doc);

        let chunks = self.chunk_sections(&sections);
        tracing::info!("Extracted {} chunks from {} sections", chunks.len(), sections.len());
        Ok(chunks)
    }

    /// Split sections into chunks, preserving section and fragment order
    pub fn chunk_sections(&self, sections: &[Section]) -> Vec<Chunk> {
        let profile = self.loader.profile();
        let mut chunks = Vec::new();

        for section in sections {
            let fragments = self.splitter.split(&section.text);

            for fragment in &fragments {
                let len = char_len(fragment);
                if len > self.splitter.max_chars() {
                    tracing::warn!(
                        "{} '{}' kept at {} chars, above the {}-char limit",
                        section.id.as_deref().unwrap_or("N/A"),
                        section.title,
                        len,
                        self.splitter.max_chars()
                    );
                }
            }

            chunks.extend(Chunk::from_fragments(section, fragments, profile));
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::loader::MemoryDocument;
    use crate::types::{PageRange, TocEntry};

    fn section(id: &str, text: String) -> Section {
        Section {
            id: Some(id.to_string()),
            title: format!("{id} Title"),
            part: Some("Part H1".to_string()),
            page_range: PageRange::new(0, 1),
            is_state_specific: false,
            text,
        }
    }

    #[test]
    fn test_chunk_sections_orders_fragments() {
        let pipeline = ChunkPipeline::new(Volume::Two, &IngestConfig::default()).unwrap();
        let long = format!("{}\n\n{}", "a".repeat(1500), "b".repeat(1500));
        let sections = vec![
            section("H1D1", "short".to_string()),
            section("H1D2", long),
            section("H1D3", "also short".to_string()),
        ];

        let chunks = pipeline.chunk_sections(&sections);
        let titles: Vec<_> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "H1D1 Title",
                "H1D2 Title (part 1)",
                "H1D2 Title (part 2)",
                "H1D3 Title"
            ]
        );
        assert!(chunks.iter().all(|c| c.applicable_classes == vec![1, 10]));
    }

    #[test]
    fn test_run_source_without_outline_yields_nothing() {
        let pipeline = ChunkPipeline::new(Volume::One, &IngestConfig::default()).unwrap();
        let doc = MemoryDocument::new(vec!["text".to_string()], Vec::new());
        assert!(pipeline.run_source(doc).unwrap().is_empty());
    }

    #[test]
    fn test_run_source_uses_section_without_identifier() {
        let pipeline = ChunkPipeline::new(Volume::One, &IngestConfig::default()).unwrap();
        let doc = MemoryDocument::new(
            vec!["Introductory text for the governing requirements.".to_string()],
            vec![
                TocEntry::new(2, "Part A1 Governing requirements", 1),
                TocEntry::new(3, "Introduction", 1),
            ],
        );

        let chunks = pipeline.run_source(doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, None);
        assert_eq!(chunks[0].part.as_deref(), Some("Part A1 Governing requirements"));
        assert_eq!(chunks[0].volume, Volume::One);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = IngestConfig::default();
        config.chunking.max_chunk_chars = 10;
        assert!(ChunkPipeline::new(Volume::Two, &config).is_err());
    }
}
