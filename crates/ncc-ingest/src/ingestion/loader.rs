//! Document loading: outline, page count, and memoized cleaned page text

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use crate::config::{Volume, VolumeProfile};
use crate::error::{Error, Result};
use crate::types::TocEntry;

use super::cleaner::PageCleaner;

/// Raw access to a paginated document
///
/// Implementations:
/// - `PdfDocument`: lopdf-backed PDF file
/// - `MemoryDocument`: pages and outline held in memory
pub trait PageSource {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Outline entries in document order
    fn toc(&self) -> Result<Vec<TocEntry>>;

    /// Raw text of the page at a zero-based index
    fn page_text(&self, index: usize) -> Result<String>;
}

/// PDF document read through lopdf
pub struct PdfDocument {
    doc: lopdf::Document,
    /// lopdf page numbers (1-based) in page order
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    /// Open a PDF file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::pdf(format!("failed to load {}: {}", path.display(), e)))?;

        if doc.is_encrypted() {
            return Err(Error::pdf(format!("{} is encrypted", path.display())));
        }

        let page_numbers = doc.get_pages().keys().copied().collect();
        Ok(Self { doc, page_numbers })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        let toc = match self.doc.get_toc() {
            Ok(toc) => toc,
            Err(e) => {
                tracing::warn!("PDF outline unavailable ({}), no sections can be located", e);
                return Ok(Vec::new());
            }
        };

        for problem in &toc.errors {
            tracing::debug!("Outline entry skipped: {}", problem);
        }

        Ok(toc
            .toc
            .into_iter()
            .map(|entry| TocEntry::new(entry.level, entry.title.trim(), entry.page))
            .collect())
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let page_number = self.page_numbers.get(index).copied().ok_or_else(|| {
            Error::pdf(format!(
                "page index {} out of range ({} pages)",
                index,
                self.page_numbers.len()
            ))
        })?;

        self.doc
            .extract_text(&[page_number])
            .map_err(|e| Error::pdf(format!("text extraction failed on page {}: {}", page_number, e)))
    }
}

/// Document held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<String>,
    toc: Vec<TocEntry>,
}

impl MemoryDocument {
    /// Create from raw page texts and outline entries
    pub fn new(pages: Vec<String>, toc: Vec<TocEntry>) -> Self {
        Self { pages, toc }
    }
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }

    fn page_text(&self, index: usize) -> Result<String> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| Error::pdf(format!("page index {} out of range", index)))
    }
}

/// Opens documents for one volume
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    profile: VolumeProfile,
    cleaner: PageCleaner,
}

impl DocumentLoader {
    /// Create a loader for a volume
    pub fn new(volume: Volume) -> Result<Self> {
        let profile = VolumeProfile::for_volume(volume);
        let cleaner = PageCleaner::new(&profile)?;
        Ok(Self { profile, cleaner })
    }

    /// Profile of the selected volume
    pub fn profile(&self) -> &VolumeProfile {
        &self.profile
    }

    /// Open a PDF from disk
    pub fn open(&self, path: impl AsRef<Path>) -> Result<LoadedDocument<PdfDocument>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DocumentNotFound(path.display().to_string()));
        }

        tracing::info!("Parsing PDF: {} (Volume {})", path.display(), self.profile.volume);
        self.load(PdfDocument::open(path)?)
    }

    /// Wrap an already opened page source
    pub fn load<S: PageSource>(&self, source: S) -> Result<LoadedDocument<S>> {
        let toc = source.toc()?;
        tracing::debug!(
            "Loaded document with {} pages and {} outline entries",
            source.page_count(),
            toc.len()
        );

        Ok(LoadedDocument {
            source,
            toc,
            cleaner: self.cleaner.clone(),
            cache: HashMap::new(),
        })
    }
}

/// Loaded document with cleaned, memoized page text
pub struct LoadedDocument<S> {
    source: S,
    toc: Vec<TocEntry>,
    cleaner: PageCleaner,
    cache: HashMap<usize, String>,
}

impl<S: PageSource> LoadedDocument<S> {
    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    /// Outline entries in document order
    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    /// Cleaned text of a page, extracted and cleaned at most once
    pub fn page(&mut self, index: usize) -> Result<&str> {
        match self.cache.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_str()),
            Entry::Vacant(entry) => {
                let raw = self.source.page_text(index)?;
                let cleaned = self.cleaner.clean(&raw);
                Ok(entry.insert(cleaned).as_str())
            }
        }
    }

    /// Pages extracted so far
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSource {
        inner: MemoryDocument,
        reads: Cell<usize>,
    }

    impl PageSource for CountingSource {
        fn page_count(&self) -> usize {
            self.inner.page_count()
        }

        fn toc(&self) -> Result<Vec<TocEntry>> {
            self.inner.toc()
        }

        fn page_text(&self, index: usize) -> Result<String> {
            self.reads.set(self.reads.get() + 1);
            self.inner.page_text(index)
        }
    }

    #[test]
    fn test_missing_pdf_is_configuration_error() {
        let loader = DocumentLoader::new(Volume::Two).unwrap();
        let err = loader.open("/nonexistent/ncc-volume-two.pdf").err().unwrap();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn test_pages_are_cleaned_once() {
        let loader = DocumentLoader::new(Volume::Two).unwrap();
        let source = CountingSource {
            inner: MemoryDocument::new(
                vec![
                    "Part H1\nNCC 2022 Volume Two - Building Code of Australia\nPage 1\nH1D1 Scope".to_string(),
                    "Second page".to_string(),
                ],
                vec![TocEntry::new(1, "Section H", 1)],
            ),
            reads: Cell::new(0),
        };

        let mut doc = loader.load(source).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.toc().len(), 1);

        assert_eq!(doc.page(0).unwrap(), "H1D1 Scope");
        assert_eq!(doc.page(0).unwrap(), "H1D1 Scope");
        assert_eq!(doc.page(1).unwrap(), "Second page");
        assert_eq!(doc.cached_pages(), 2);
        assert_eq!(doc.source.reads.get(), 2);
    }

    #[test]
    fn test_out_of_range_page_is_error() {
        let loader = DocumentLoader::new(Volume::One).unwrap();
        let mut doc = loader.load(MemoryDocument::default()).unwrap();
        assert!(doc.page(0).is_err());
    }
}
