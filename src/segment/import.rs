//! Building chains from interval lists and diarization reports.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SegmentError};

use super::{Segment, SegmentChain};

/// An externally produced time interval, already in chain offset units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
    pub label: Option<String>,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }

    pub fn labeled(start: u64, end: u64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: Some(label.into()),
        }
    }
}

impl From<(u64, u64)> for Interval {
    fn from((start, end): (u64, u64)) -> Self {
        Self::new(start, end)
    }
}

/// Build a segment chain from ordered, non-overlapping intervals.
///
/// Nothing is built if any interval is out of order; disorder is never repaired.
pub fn import_intervals<I>(intervals: I) -> Result<SegmentChain>
where
    I: IntoIterator,
    I::Item: Into<Interval>,
{
    let intervals: Vec<Interval> = intervals.into_iter().map(Into::into).collect();
    if intervals.is_empty() {
        return Err(SegmentError::EmptyInput(
            "interval list contains no entries".to_string(),
        ));
    }

    let mut prev_end: Option<u64> = None;
    for (index, interval) in intervals.iter().enumerate() {
        if interval.start >= interval.end {
            return Err(SegmentError::InputOrder {
                index,
                reason: format!(
                    "start {} is not before end {}",
                    interval.start, interval.end
                ),
            });
        }
        if let Some(prev_end) = prev_end {
            if interval.start < prev_end {
                return Err(SegmentError::InputOrder {
                    index,
                    reason: format!(
                        "starts at {} before the previous interval ends at {}",
                        interval.start, prev_end
                    ),
                });
            }
        }
        prev_end = Some(interval.end);
    }

    let mut chain = SegmentChain::new();
    for interval in intervals {
        chain.push(Segment {
            begin: interval.start,
            end: interval.end,
            label: interval.label,
            id: None,
        });
    }

    debug!("Imported {} intervals", chain.len());
    Ok(chain)
}

/// Speaker track identifier; diarization tools emit either names or indices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Index(u64),
    Name(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackId::Index(i) => write!(f, "{}", i),
            TrackId::Name(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fragment {
    pub segment: TimeSpan,
    pub label: String,
    pub track: TrackId,
}

/// Diarization output: `{"uri": ..., "content": [{"segment": {...}, "label", "track"}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiarizationReport {
    pub uri: String,
    #[serde(default)]
    pub content: Vec<Fragment>,
}

impl DiarizationReport {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name of the source recording without its extension.
    pub fn uri_stem(&self) -> &str {
        self.uri.split('.').next().unwrap_or(&self.uri)
    }

    /// Convert fragment times (seconds) to intervals at `units_per_second`.
    pub fn intervals(&self, units_per_second: u32) -> Result<Vec<Interval>> {
        self.content
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                let start = seconds_to_units(fragment.segment.start, units_per_second, index)?;
                let end = seconds_to_units(fragment.segment.end, units_per_second, index)?;
                Ok(Interval::labeled(
                    start,
                    end,
                    format!("{}-{}", fragment.label, fragment.track),
                ))
            })
            .collect()
    }

    /// Import the report as a chain, naming each segment after its fragment.
    pub fn to_chain(&self, units_per_second: u32) -> Result<SegmentChain> {
        let mut chain = import_intervals(self.intervals(units_per_second)?)?;
        let stem = self.uri_stem();
        for (index, (segment, fragment)) in chain
            .segments_mut()
            .iter_mut()
            .zip(&self.content)
            .enumerate()
        {
            segment.id = Some(format!(
                "{}-{}-{}-{:04}",
                stem, fragment.label, fragment.track, index
            ));
        }

        info!(
            "Imported {} diarization fragments from {}",
            chain.len(),
            self.uri
        );
        Ok(chain)
    }
}

fn seconds_to_units(seconds: f64, units_per_second: u32, index: usize) -> Result<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SegmentError::InputOrder {
            index,
            reason: format!("invalid time {}", seconds),
        });
    }
    Ok((seconds * units_per_second as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "uri": "lecture.wav",
        "content": [
            {"segment": {"start": 0.5, "end": 2.25}, "track": "A", "label": "SPEAKER_00"},
            {"segment": {"start": 3.0, "end": 4.0}, "track": 1, "label": "SPEAKER_01"}
        ]
    }"#;

    #[test]
    fn test_import_ordered_intervals() {
        let chain = SegmentChain::from_bounds(&[(0, 100), (100, 200), (250, 300)]).unwrap();
        assert_eq!(chain.bounds(), vec![(0, 100), (100, 200), (250, 300)]);
        assert_eq!(chain.gap_after(0), Some(0));
        assert_eq!(chain.gap_after(1), Some(50));
    }

    #[test]
    fn test_import_empty_fails() {
        let result = import_intervals(Vec::<Interval>::new());
        assert!(matches!(result, Err(SegmentError::EmptyInput(_))));
    }

    #[test]
    fn test_import_rejects_overlap() {
        let result = SegmentChain::from_bounds(&[(0, 100), (90, 200)]);
        assert!(matches!(
            result,
            Err(SegmentError::InputOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_import_rejects_inverted_interval() {
        let result = SegmentChain::from_bounds(&[(0, 100), (300, 200)]);
        assert!(matches!(
            result,
            Err(SegmentError::InputOrder { index: 1, .. })
        ));

        let result = SegmentChain::from_bounds(&[(50, 50)]);
        assert!(matches!(
            result,
            Err(SegmentError::InputOrder { index: 0, .. })
        ));
    }

    #[test]
    fn test_import_keeps_labels() {
        let chain = import_intervals(vec![
            Interval::labeled(0, 10, "a"),
            Interval::new(20, 30),
        ])
        .unwrap();
        assert_eq!(chain.get(0).unwrap().label.as_deref(), Some("a"));
        assert_eq!(chain.get(1).unwrap().label, None);
    }

    #[test]
    fn test_diarization_report_to_chain() {
        let report = DiarizationReport::from_json(REPORT).unwrap();
        assert_eq!(report.uri_stem(), "lecture");

        let chain = report.to_chain(1000).unwrap();
        assert_eq!(chain.bounds(), vec![(500, 2250), (3000, 4000)]);

        let first = chain.get(0).unwrap();
        assert_eq!(first.label.as_deref(), Some("SPEAKER_00-A"));
        assert_eq!(first.id.as_deref(), Some("lecture-SPEAKER_00-A-0000"));
        assert_eq!(
            chain.get(1).unwrap().id.as_deref(),
            Some("lecture-SPEAKER_01-1-0001")
        );
    }

    #[test]
    fn test_diarization_report_rejects_negative_time() {
        let json = r#"{"uri": "x.wav", "content": [
            {"segment": {"start": -1.0, "end": 2.0}, "track": "A", "label": "S"}
        ]}"#;
        let report = DiarizationReport::from_json(json).unwrap();
        assert!(report.to_chain(1000).is_err());
    }
}
