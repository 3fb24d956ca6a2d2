//! Pipe-separated manifest output (`segments.csv`, `metadata.csv`).

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::segment::{Segment, SegmentChain};

const SEPARATOR: char = '|';

/// One clip in the `id|source|begin|end` manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub source: String,
    pub begin: u64,
    pub end: u64,
}

impl ManifestEntry {
    pub fn from_segment(segment: &Segment, fallback_id: &str, source: &str) -> Self {
        Self {
            id: segment.id.clone().unwrap_or_else(|| fallback_id.to_string()),
            source: source.to_string(),
            begin: segment.begin,
            end: segment.end,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.id,
            self.source,
            self.begin,
            self.end,
            sep = SEPARATOR
        )
    }
}

/// Manifest entries for a chain whose ids have been assigned.
pub fn entries_for_chain(chain: &SegmentChain, source: &str) -> Vec<ManifestEntry> {
    chain
        .iter()
        .enumerate()
        .map(|(i, segment)| ManifestEntry::from_segment(segment, &format!("{:04}", i), source))
        .collect()
}

pub fn render_manifest(entries: &[ManifestEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}\n", e.to_line()))
        .collect()
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    fs::write(path, render_manifest(entries))?;
    info!("Wrote manifest with {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// A `filename|text` line for transcript metadata files.
pub fn metadata_line(filename: &str, text: &str) -> String {
    let stem = filename
        .strip_suffix(".mp3")
        .or_else(|| filename.strip_suffix(".wav"))
        .unwrap_or(filename);
    format!("{}{}{}", stem, SEPARATOR, text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_line() {
        let entry = ManifestEntry {
            id: "talk-0003".to_string(),
            source: "/data/talk.wav".to_string(),
            begin: 1200,
            end: 88200,
        };
        assert_eq!(entry.to_line(), "talk-0003|/data/talk.wav|1200|88200");
    }

    #[test]
    fn test_entries_for_chain_fallback_ids() {
        let chain = SegmentChain::from_bounds(&[(0, 10), (20, 30)]).unwrap();
        let entries = entries_for_chain(&chain, "a.wav");
        assert_eq!(entries[0].id, "0000");
        assert_eq!(entries[1].id, "0001");
        assert_eq!(
            render_manifest(&entries),
            "0000|a.wav|0|10\n0001|a.wav|20|30\n"
        );
    }

    #[test]
    fn test_metadata_line() {
        assert_eq!(metadata_line("clip-0001.wav", " hello "), "clip-0001|hello");
        assert_eq!(metadata_line("clip.mp3", "hi"), "clip|hi");
    }
}
