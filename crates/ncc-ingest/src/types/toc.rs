//! Table-of-contents entries as embedded in the PDF outline

use serde::{Deserialize, Serialize};

/// Nesting level of leaf sections
pub const LEAF_LEVEL: usize = 3;

/// Deepest level that still counts as a part heading
pub const PART_LEVEL: usize = 2;

/// One outline entry: nesting level, title, and 1-based start page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting depth (1 = top)
    pub level: usize,
    /// Entry title as shown in the outline
    pub title: String,
    /// 1-based page the entry points at
    pub start_page: usize,
}

impl TocEntry {
    /// Create a new entry
    pub fn new(level: usize, title: impl Into<String>, start_page: usize) -> Self {
        Self {
            level,
            title: title.into(),
            start_page,
        }
    }

    /// Leaf section of interest
    pub fn is_leaf(&self) -> bool {
        self.level == LEAF_LEVEL
    }

    /// Top-level or part heading
    pub fn is_part_heading(&self) -> bool {
        self.level <= PART_LEVEL
    }

    /// Zero-based page index of the entry
    pub fn start_index(&self) -> usize {
        self.start_page.saturating_sub(1)
    }
}
