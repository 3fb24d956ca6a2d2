pub mod import;
pub mod merge;
pub mod pad;

pub use import::{import_intervals, DiarizationReport, Interval};
pub use merge::{find_best_merge, optimize, optimize_with_rounds, MergeParams};
pub use pad::{pad_and_validate, BandViolation, OutOfBand, PadParams, PaddedChain};

/// A contiguous span of audio bounded by silence.
///
/// Offsets are in sample units (or whatever resolution the chain was built with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub begin: u64,
    pub end: u64,
    pub label: Option<String>,
    pub id: Option<String>,
}

impl Segment {
    pub fn new(begin: u64, end: u64) -> Self {
        Self {
            begin,
            end,
            label: None,
            id: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Length in offset units.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.len() as f64 / sample_rate as f64
    }
}

/// Time-ordered, non-overlapping sequence of segments.
///
/// The successor of a segment is the next element; the gap after a segment is
/// derived from its neighbour, so it can never go stale after a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentChain {
    segments: Vec<Segment>,
}

impl SegmentChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from `(begin, end)` pairs with the same checks as
    /// [`import_intervals`].
    pub fn from_bounds(bounds: &[(u64, u64)]) -> crate::error::Result<Self> {
        import_intervals(bounds.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_vec(self) -> Vec<Segment> {
        self.segments
    }

    /// `(begin, end)` pairs, mostly useful for assertions and logging.
    pub fn bounds(&self) -> Vec<(u64, u64)> {
        self.segments.iter().map(|s| (s.begin, s.end)).collect()
    }

    /// Silence between segment `index` and its successor.
    pub fn gap_after(&self, index: usize) -> Option<u64> {
        let current = self.segments.get(index)?;
        let next = self.segments.get(index + 1)?;
        Some(next.begin.saturating_sub(current.end))
    }

    /// Append a segment to the tail. Callers must keep the chain ordered.
    pub(crate) fn push(&mut self, segment: Segment) {
        debug_assert!(self
            .segments
            .last()
            .map_or(true, |last| last.end <= segment.begin));
        self.segments.push(segment);
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Absorb the successor of `index` into it. The earlier label is kept.
    ///
    /// Returns `false` when `index` has no successor.
    pub fn absorb_next(&mut self, index: usize) -> bool {
        if index + 1 >= self.segments.len() {
            return false;
        }
        let next = self.segments.remove(index + 1);
        self.segments[index].end = next.end;
        true
    }

    /// Check that every segment is non-empty and the chain is strictly ordered
    /// without overlap.
    pub fn is_well_formed(&self) -> bool {
        self.segments.iter().all(|s| s.begin < s.end)
            && self
                .segments
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].begin)
    }

    /// Total covered length in offset units.
    pub fn total_len(&self) -> u64 {
        self.segments.iter().map(Segment::len).sum()
    }
}

impl<'a> IntoIterator for &'a SegmentChain {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(bounds: &[(u64, u64)]) -> SegmentChain {
        SegmentChain::from_bounds(bounds).unwrap()
    }

    #[test]
    fn test_segment_duration() {
        let segment = Segment::new(1000, 3000);
        assert_eq!(segment.len(), 2000);
        assert!((segment.duration(1000) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_after() {
        let chain = chain(&[(0, 10), (15, 20), (20, 30)]);
        assert_eq!(chain.gap_after(0), Some(5));
        assert_eq!(chain.gap_after(1), Some(0));
        assert_eq!(chain.gap_after(2), None);
    }

    #[test]
    fn test_absorb_next_keeps_earlier_label() {
        let mut chain = import_intervals(vec![
            Interval::labeled(0, 10, "first"),
            Interval::labeled(12, 20, "second"),
            Interval::new(40, 50),
        ])
        .unwrap();

        assert!(chain.absorb_next(0));
        assert_eq!(chain.bounds(), vec![(0, 20), (40, 50)]);
        assert_eq!(chain.get(0).unwrap().label.as_deref(), Some("first"));
        assert_eq!(chain.gap_after(0), Some(20));
        assert!(!chain.absorb_next(1));
    }

    #[test]
    fn test_well_formed() {
        assert!(chain(&[(0, 10), (10, 20)]).is_well_formed());
        assert!(SegmentChain::new().is_well_formed());

        let mut overlapping = chain(&[(0, 10)]);
        overlapping.segments.push(Segment::new(5, 20));
        assert!(!overlapping.is_well_formed());
    }
}
