//! Size-bounded splitting of section text
//!
//! Sections that fit are returned whole. Larger sections are packed by
//! paragraph, undersized fragments are merged into a neighbour, and anything
//! still too large is force split on sentence boundaries.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Paragraph, merge, and sentence splitter with character limits
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    /// Maximum fragment size in characters
    max_chars: usize,
    /// Minimum fragment size before merging
    min_chars: usize,
    /// Blank line, including lines holding only whitespace
    paragraph_break: Regex,
    /// Sentence end (`.` or `;` then whitespace) or a line break
    sentence_break: Regex,
}

impl ChunkSplitter {
    /// Create a new splitter
    pub fn new(max_chars: usize, min_chars: usize) -> Self {
        Self {
            max_chars,
            min_chars,
            paragraph_break: Regex::new(r"\n\s*\n").expect("static paragraph pattern"),
            sentence_break: Regex::new(r"[.;]\s+|\n").expect("static sentence pattern"),
        }
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_chunk_chars, config.min_chunk_chars)
    }

    /// Maximum fragment size in characters
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split one section's text into ordered fragments
    pub fn split(&self, text: &str) -> Vec<String> {
        if char_len(text) <= self.max_chars {
            return vec![text.to_string()];
        }

        let packed = self.pack_paragraphs(text);
        let merged = self.merge_short(packed);

        let mut fragments = Vec::with_capacity(merged.len());
        for fragment in merged {
            if char_len(&fragment) <= self.max_chars {
                fragments.push(fragment);
            } else {
                fragments.extend(self.split_sentences(&fragment));
            }
        }

        if fragments.is_empty() {
            tracing::warn!(
                "No split points in {}-char text, keeping it whole",
                char_len(text)
            );
            return vec![text.to_string()];
        }

        fragments
    }

    /// Greedily pack paragraphs into fragments under the limit
    fn pack_paragraphs(&self, text: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for para in self.paragraph_break.split(text) {
            let para_len = char_len(para);

            if !current.is_empty() && current_len + para_len + 2 > self.max_chars {
                push_trimmed(&mut fragments, &current);
                current = para.to_string();
                current_len = para_len;
            } else if current.is_empty() {
                current = para.to_string();
                current_len = para_len;
            } else {
                current.push_str("\n\n");
                current.push_str(para);
                current_len += para_len + 2;
            }
        }

        push_trimmed(&mut fragments, &current);
        fragments
    }

    /// Fold fragments under the minimum into their neighbour
    ///
    /// A short fragment joins the one before it; a short first fragment
    /// absorbs the one after it.
    fn merge_short(&self, fragments: Vec<String>) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(fragments.len());

        for fragment in fragments {
            match merged.last_mut() {
                Some(last)
                    if char_len(last) < self.min_chars
                        || char_len(&fragment) < self.min_chars =>
                {
                    last.push_str("\n\n");
                    last.push_str(&fragment);
                }
                _ => merged.push(fragment),
            }
        }

        merged
    }

    /// Force split on sentence ends and newlines
    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in self.sentence_pieces(text) {
            if sentence.trim().is_empty() {
                continue;
            }

            for piece in self.fit_piece(sentence) {
                let piece_len = char_len(&piece);

                if !current.is_empty() && current_len + piece_len + 1 > self.max_chars {
                    push_trimmed(&mut fragments, &current);
                    current = piece;
                    current_len = piece_len;
                } else if current.is_empty() {
                    current = piece;
                    current_len = piece_len;
                } else {
                    current.push(' ');
                    current.push_str(&piece);
                    current_len += piece_len + 1;
                }
            }
        }

        push_trimmed(&mut fragments, &current);
        fragments
    }

    /// Split after sentence punctuation followed by whitespace, and at every newline
    ///
    /// The punctuation stays with the sentence it ends.
    fn sentence_pieces<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut pieces = Vec::new();
        let mut start = 0usize;

        for m in self.sentence_break.find_iter(text) {
            let keep = if m.as_str().starts_with('\n') { 0 } else { 1 };
            pieces.push(&text[start..m.start() + keep]);
            start = m.end();
        }

        pieces.push(&text[start..]);
        pieces
    }

    /// Cut a single over-long sentence at word boundaries, then by grapheme
    fn fit_piece(&self, sentence: &str) -> Vec<String> {
        if char_len(sentence) <= self.max_chars {
            return vec![sentence.to_string()];
        }

        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut spaced = false;

        for segment in sentence.split_word_bounds() {
            if segment.trim().is_empty() {
                spaced = true;
                continue;
            }

            let segment_len = char_len(segment);
            let gap = usize::from(spaced && !current.is_empty());
            spaced = false;

            if segment_len > self.max_chars {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                pieces.extend(grapheme_cut(segment, self.max_chars));
                continue;
            }

            if !current.is_empty() && current_len + gap + segment_len > self.max_chars {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            } else if gap == 1 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(segment);
            current_len += segment_len;
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Length in characters, not bytes
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_trimmed(fragments: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        fragments.push(trimmed.to_string());
    }
}

/// Cut text into pieces of at most `max_chars` without splitting a grapheme cluster
fn grapheme_cut(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for grapheme in text.graphemes(true) {
        let len = char_len(grapheme);
        if !current.is_empty() && current_len + len > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(grapheme);
        current_len += len;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
