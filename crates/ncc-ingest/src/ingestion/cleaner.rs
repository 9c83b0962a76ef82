//! Running header, footer, and annotation stripping

use regex::Regex;

use crate::config::VolumeProfile;
use crate::error::{Error, Result};

/// Removes the volume's page furniture from extracted page text
#[derive(Debug, Clone)]
pub struct PageCleaner {
    header: Regex,
    footer: Regex,
    annotation: Regex,
}

impl PageCleaner {
    /// Compile the patterns for a volume
    pub fn new(profile: &VolumeProfile) -> Result<Self> {
        let header = Regex::new(&format!(
            r"(?m)^.+\n{}\nPage \d+\n",
            regex::escape(&profile.title_line)
        ))
        .map_err(|e| Error::config(format!("invalid header pattern: {}", e)))?;

        let footer = Regex::new(&format!(r"(?m){}\s*$", regex::escape(&profile.footer_stamp)))
            .map_err(|e| Error::config(format!("invalid footer pattern: {}", e)))?;

        let prefixes = profile
            .annotation_prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let annotation = Regex::new(&format!(r"(?m)^\[(?:{}):.+\]\s*$", prefixes))
            .map_err(|e| Error::config(format!("invalid annotation pattern: {}", e)))?;

        Ok(Self {
            header,
            footer,
            annotation,
        })
    }

    /// Strip header, footer stamp, and version annotations, then trim
    pub fn clean(&self, text: &str) -> String {
        let text = self.header.replace_all(text, "");
        let text = self.footer.replace_all(&text, "");
        let text = self.annotation.replace_all(&text, "");
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Volume;

    fn cleaner(volume: Volume) -> PageCleaner {
        PageCleaner::new(&VolumeProfile::for_volume(volume)).unwrap()
    }

    #[test]
    fn test_strips_volume_header() {
        let page = "Part H1 Structure\nNCC 2022 Volume Two - Building Code of Australia\nPage 37\nH1D2 Application\nBody text.";
        assert_eq!(cleaner(Volume::Two).clean(page), "H1D2 Application\nBody text.");
    }

    #[test]
    fn test_other_volume_header_is_kept() {
        let page = "Part A\nNCC 2022 Volume One - Building Code of Australia\nPage 3\nBody";
        let cleaned = cleaner(Volume::Two).clean(page);
        assert!(cleaned.contains("Volume One"));
    }

    #[test]
    fn test_strips_footer_stamp() {
        let page = "Body text.\nNCC 2022 Volume Two (1 May 2023)  \n";
        assert_eq!(cleaner(Volume::Two).clean(page), "Body text.\nNCC 2022 Volume Two");
    }

    #[test]
    fn test_strips_version_annotations() {
        let page = "H2D1 Weatherproofing\n[New for 2022: H2D1 is a new clause]\nBody.\n[2019: was P2.2.2]\n[Amended: kept]";
        let cleaned = cleaner(Volume::Two).clean(page);
        assert!(!cleaned.contains("New for 2022"));
        assert!(!cleaned.contains("2019:"));
        assert!(cleaned.contains("[Amended: kept]"));
        assert!(cleaned.contains("Body."));
    }

    #[test]
    fn test_blank_page_cleans_to_empty() {
        let page = "Contents\nNCC 2022 Volume One - Building Code of Australia\nPage 2\n\n(1 May 2023)\n";
        assert_eq!(cleaner(Volume::One).clean(page), "");
    }
}
