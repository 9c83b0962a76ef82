//! Chunk records: the unit that is embedded and persisted

use serde::{Deserialize, Serialize};

use crate::config::{Volume, VolumeProfile};
use super::section::Section;

/// A bounded fragment of section text with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Fragment text
    pub content: String,
    /// Source volume number
    pub volume: Volume,
    /// Enclosing part heading
    pub part: Option<String>,
    /// Section code
    pub section: Option<String>,
    /// Section title, suffixed with the fragment position when split
    pub title: String,
    /// Building classes the volume applies to
    pub applicable_classes: Vec<u32>,
    /// Always false for emitted chunks: state appendices are never emitted
    pub state_specific: bool,
    /// Embedding vector, attached by the output sink
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build the chunks for one section from its split fragments
    pub fn from_fragments(
        section: &Section,
        fragments: Vec<String>,
        profile: &VolumeProfile,
    ) -> Vec<Self> {
        let total = fragments.len();

        fragments
            .into_iter()
            .enumerate()
            .map(|(i, content)| Self {
                content,
                volume: profile.volume,
                part: section.part.clone(),
                section: section.id.clone(),
                title: fragment_title(&section.title, i, total),
                applicable_classes: profile.applicable_classes.clone(),
                state_specific: section.is_state_specific,
                embedding: Vec::new(),
            })
            .collect()
    }

    /// Content length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Title for fragment `index` of `total`
pub fn fragment_title(title: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        title.to_string()
    } else {
        format!("{} (part {})", title, index + 1)
    }
}
