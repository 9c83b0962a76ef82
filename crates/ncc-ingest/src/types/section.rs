//! Logical sections derived from the table of contents

use std::ops::Range;

/// Half-open range of zero-based page indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First page index (inclusive)
    pub start: usize,
    /// Last page index (exclusive)
    pub end: usize,
}

impl PageRange {
    /// Create a range, collapsing inverted bounds to empty
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of pages covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when no page is covered
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Page indices covered by the range
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A leaf section with resolved pages and extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section code such as `H1D2` or `S2C1`
    pub id: Option<String>,
    /// Outline title
    pub title: String,
    /// Nearest enclosing part or top-level heading
    pub part: Option<String>,
    /// Pages the text was drawn from
    pub page_range: PageRange,
    /// Belongs to a state or territory appendix
    pub is_state_specific: bool,
    /// Cleaned section text
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_bounds() {
        let range = PageRange::new(4, 7);
        assert_eq!(range.len(), 3);
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![4, 5, 6]);

        let inverted = PageRange::new(9, 3);
        assert!(inverted.is_empty());
        assert_eq!(inverted.indices().count(), 0);
    }
}
