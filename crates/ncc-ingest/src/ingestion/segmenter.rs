//! Section segmentation from the table of contents
//!
//! Leaf (level 3) outline entries become sections. Each section draws text
//! from its start page through the page where the next section begins, and
//! the section's own identifier marker trims that text to its true bounds,
//! since neighbouring sections often share a page. A section followed by an
//! excluded appendix or the schedules stops at that heading's line.

use regex::Regex;

use crate::config::{SegmentationConfig, VolumeProfile};
use crate::error::Result;
use crate::types::{PageRange, Section, TocEntry};

use super::loader::{LoadedDocument, PageSource};

/// A leaf entry with its resolved pages, before text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub toc_index: usize,
    pub id: Option<String>,
    pub title: String,
    pub part: Option<String>,
    pub page_range: PageRange,
    /// Heading of excluded content opening on the last page of the range
    pub stop_heading: Option<String>,
}

/// Turns an outline plus cleaned pages into sections
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    jurisdictions: Vec<String>,
    /// Ordinary clause code, e.g. `H1D2`, `A1G4`
    clause_id: Regex,
    /// Specification code, e.g. `S2C1`
    spec_id: Regex,
    separator: char,
    line_anchored_fallback: bool,
    blank_line: Regex,
}

impl SectionSegmenter {
    /// Create a segmenter for a volume
    pub fn new(profile: &VolumeProfile, config: &SegmentationConfig) -> Self {
        Self {
            jurisdictions: profile.jurisdictions.clone(),
            clause_id: Regex::new(r"^[A-Z]\d+(?:[A-Z]+\d+)+$").expect("static clause pattern"),
            spec_id: Regex::new(r"^S\d+C\d+$").expect("static specification pattern"),
            separator: config.marker_separator,
            line_anchored_fallback: config.line_anchored_fallback,
            blank_line: Regex::new(r"\n[ \t]+\n").expect("static blank line pattern"),
        }
    }

    /// Segment a loaded document into sections with extracted text
    pub fn segment<S: PageSource>(&self, doc: &mut LoadedDocument<S>) -> Result<Vec<Section>> {
        let candidates = self.candidates(doc.toc(), doc.page_count());
        let mut sections = Vec::with_capacity(candidates.len());

        for (i, candidate) in candidates.iter().enumerate() {
            let mut pages = Vec::with_capacity(candidate.page_range.len());
            for index in candidate.page_range.indices() {
                let page = doc.page(index)?;
                if !page.is_empty() {
                    pages.push(page.to_string());
                }
            }
            let joined = pages.join("\n");

            if joined.trim().is_empty() {
                tracing::debug!("No text on pages for '{}', skipping", candidate.title);
                continue;
            }

            let mut content = match &candidate.id {
                Some(id) => {
                    let next_id = candidates.get(i + 1).and_then(|next| next.id.as_deref());
                    self.locate(&joined, id, next_id)
                }
                None => joined.as_str(),
            };
            if let Some(heading) = &candidate.stop_heading {
                content = self.cut_at_heading(content, heading);
            }

            let text = self.normalize(content);
            if text.trim().is_empty() {
                tracing::debug!("Section '{}' is empty after cleanup, dropping", candidate.title);
                continue;
            }

            sections.push(Section {
                id: candidate.id.clone(),
                title: candidate.title.clone(),
                part: candidate.part.clone(),
                page_range: candidate.page_range,
                is_state_specific: false,
                text,
            });
        }

        tracing::info!(
            "Located {} sections from {} leaf entries",
            sections.len(),
            candidates.len()
        );
        Ok(sections)
    }

    /// Leaf entries outside state appendices, with page ranges and parts
    pub(crate) fn candidates(&self, toc: &[TocEntry], page_count: usize) -> Vec<Candidate> {
        let leaves = self.leaf_indices(toc);
        let boundary = content_boundary(toc, &leaves);

        leaves
            .iter()
            .enumerate()
            .map(|(i, &toc_index)| {
                let entry = &toc[toc_index];
                let start = entry.start_index();
                // A 1-based start page used as an exclusive index keeps the
                // page the next section opens on, which both may share.
                let (mut end, limit, mut stop_heading) = match (leaves.get(i + 1), boundary) {
                    (Some(&next), _) => (toc[next].start_page, next, None),
                    (None, Some(b)) => (toc[b].start_page, b, Some(toc[b].title.clone())),
                    (None, None) => (page_count, toc.len(), None),
                };
                if let Some(appendix) = self.first_appendix(&toc[toc_index + 1..limit]) {
                    if appendix.start_page <= end {
                        end = appendix.start_page;
                        stop_heading = Some(appendix.title.clone());
                    }
                }
                let end = end.max(start + 1);

                Candidate {
                    toc_index,
                    id: self.extract_section_id(&entry.title),
                    title: entry.title.clone(),
                    part: resolve_part(toc, toc_index),
                    page_range: PageRange::new(start, end.min(page_count)),
                    stop_heading,
                }
            })
            .collect()
    }

    /// TOC indices of leaf entries, skipping state and territory appendices
    pub fn leaf_indices(&self, toc: &[TocEntry]) -> Vec<usize> {
        let mut in_state_appendix = false;
        let mut leaves = Vec::new();

        for (i, entry) in toc.iter().enumerate() {
            if entry.is_part_heading() {
                in_state_appendix = self.is_state_appendix(entry);
                if in_state_appendix {
                    tracing::debug!("Skipping state appendix '{}'", entry.title);
                }
            }
            if in_state_appendix {
                continue;
            }
            if entry.is_leaf() {
                leaves.push(i);
            }
        }

        leaves
    }

    /// First appendix heading in `entries`
    fn first_appendix<'a>(&self, entries: &'a [TocEntry]) -> Option<&'a TocEntry> {
        entries.iter().find(|entry| self.is_state_appendix(entry))
    }

    /// Whether a heading opens a state or territory appendix
    pub fn is_state_appendix(&self, entry: &TocEntry) -> bool {
        if !entry.is_part_heading() {
            return false;
        }

        let first_word = entry
            .title
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_uppercase();
        if self.jurisdictions.iter().any(|j| *j == first_word) {
            return true;
        }

        entry.title.contains("Schedule")
            && entry
                .title
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| self.jurisdictions.iter().any(|j| j == word))
    }

    /// First title word shaped like a clause or specification code
    pub fn extract_section_id(&self, title: &str) -> Option<String> {
        title
            .split_whitespace()
            .find(|word| self.clause_id.is_match(word) || self.spec_id.is_match(word))
            .map(str::to_string)
    }

    /// Narrow joined page text to the span between this and the next marker
    ///
    /// Falls back to the whole text when the section's own marker is absent.
    pub fn locate<'t>(&self, text: &'t str, id: &str, next_id: Option<&str>) -> &'t str {
        let Some((start, marker_end)) = self.find_marker(text, id, 0) else {
            tracing::debug!("Marker for {} not found, using whole page range", id);
            return text;
        };

        if let Some(next_id) = next_id {
            if let Some((end, _)) = self.find_marker(text, next_id, marker_end) {
                return text[start..end].trim();
            }
        }

        text[start..].trim()
    }

    /// Byte span of an identifier marker at or after `from`
    fn find_marker(&self, text: &str, id: &str, from: usize) -> Option<(usize, usize)> {
        let haystack = text.get(from..)?;

        let marker = format!("{sep}{id}{sep}", sep = self.separator);
        if let Some(pos) = haystack.find(&marker) {
            return Some((from + pos, from + pos + marker.len()));
        }

        if !self.line_anchored_fallback {
            return None;
        }

        // Page cleanup trims a separator that opened the page
        let sep = regex::escape(&self.separator.to_string());
        let pattern = Regex::new(&format!(
            r"(?m)^{sep}?{id}(?:[ \t\u{{00A0}}{sep}]|$)",
            sep = sep,
            id = regex::escape(id)
        ))
        .ok()?;
        pattern
            .find(haystack)
            .map(|m| (from + m.start(), from + m.end()))
    }

    /// Cut text where a heading line begins, keeping everything before it
    ///
    /// The heading is matched at a line start with any run of whitespace
    /// between its words. Text is returned whole when the heading is absent.
    pub fn cut_at_heading<'t>(&self, text: &'t str, heading: &str) -> &'t str {
        let words: Vec<String> = heading.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return text;
        }

        let pattern = format!(
            r"(?m)^{sep}?{title}",
            sep = regex::escape(&self.separator.to_string()),
            title = words.join(r"\s+")
        );
        let Ok(pattern) = Regex::new(&pattern) else {
            return text;
        };

        let cut = match pattern.find_iter(text).find(|m| m.start() > 0) {
            Some(m) => text[..m.start()].trim_end(),
            None => {
                tracing::debug!("Heading '{}' not found, keeping the shared page", heading);
                text
            }
        };
        cut
    }

    /// Drop separators, normalize non-breaking spaces, and empty blank-looking lines
    pub fn normalize(&self, text: &str) -> String {
        let text: String = text
            .chars()
            .filter(|&c| c != self.separator)
            .map(|c| if c == '\u{00A0}' { ' ' } else { c })
            .collect();
        self.blank_line.replace_all(&text, "\n\n").into_owned()
    }
}

/// TOC index of the entry where the substantive content stops
///
/// This is the first top-level entry after the last leaf; the schedules that
/// follow hold definitions and references, not clauses. With no such entry
/// the content runs to the last page.
pub fn content_boundary(toc: &[TocEntry], leaves: &[usize]) -> Option<usize> {
    let scan_from = leaves.last().copied().unwrap_or(0) + 1;

    toc.iter()
        .enumerate()
        .skip(scan_from)
        .find(|(_, entry)| entry.level <= 1)
        .map(|(i, _)| i)
}

/// Title of the nearest level ≤ 2 entry before `index`
pub fn resolve_part(toc: &[TocEntry], index: usize) -> Option<String> {
    toc[..index.min(toc.len())]
        .iter()
        .rev()
        .find(|entry| entry.is_part_heading())
        .map(|entry| entry.title.clone())
}
