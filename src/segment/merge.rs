use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SegmentError};

use super::SegmentChain;

/// Thresholds that decide whether two neighbouring segments may be merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    pub sample_rate: u32,
    /// Longest merged segment allowed, in seconds.
    pub max_duration: f64,
    /// Longest silence a merge may bridge, in seconds.
    pub max_gap_duration: f64,
}

impl MergeParams {
    pub fn from_config(config: &Config, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            max_duration: config.max_duration,
            max_gap_duration: config.max_gap_duration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SegmentError::Config(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if !self.max_duration.is_finite() || self.max_duration <= 0.0 {
            return Err(SegmentError::Config(format!(
                "max_duration must be a positive number (got {})",
                self.max_duration
            )));
        }
        if !self.max_gap_duration.is_finite() || self.max_gap_duration < 0.0 {
            return Err(SegmentError::Config(format!(
                "max_gap_duration must not be negative (got {})",
                self.max_gap_duration
            )));
        }
        Ok(())
    }
}

/// Find the legal merge that bridges the smallest gap.
///
/// Returns the index of the segment that should absorb its successor. A pair is
/// legal when the gap and the merged duration are both within limits; among legal
/// pairs the tightest gap wins and ties go to the leftmost pair.
pub fn find_best_merge(chain: &SegmentChain, params: &MergeParams) -> Option<usize> {
    let rate = params.sample_rate as f64;
    let mut best: Option<(usize, f64)> = None;

    for (index, pair) in chain.as_slice().windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let gap_duration = next.begin.saturating_sub(current.end) as f64 / rate;
        let merged_duration = next.end.saturating_sub(current.begin) as f64 / rate;

        if gap_duration > params.max_gap_duration || merged_duration > params.max_duration {
            continue;
        }

        let score = params.max_gap_duration - gap_duration;
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
}

/// Merge neighbouring segments until no legal merge remains.
///
/// Each round applies the single best merge and re-scans from the head, since
/// absorbing a successor changes the pair it forms with the next segment.
pub fn optimize(chain: SegmentChain, params: &MergeParams) -> Result<SegmentChain> {
    optimize_with_rounds(chain, params).map(|(chain, _)| chain)
}

/// Like [`optimize`], also returning how many merges were applied.
///
/// Every merge removes one segment, so an `n`-segment chain settles after at most
/// `n - 1` rounds.
pub fn optimize_with_rounds(
    chain: SegmentChain,
    params: &MergeParams,
) -> Result<(SegmentChain, usize)> {
    params.validate()?;
    let budget = chain.len().saturating_sub(1);
    merge_until_stable(chain, params, budget)
}

/// Merge loop with an explicit round budget. Needing a merge after `max_rounds`
/// rounds is reported as `MergeDidNotConverge`.
pub(crate) fn merge_until_stable(
    mut chain: SegmentChain,
    params: &MergeParams,
    max_rounds: usize,
) -> Result<(SegmentChain, usize)> {
    let initial = chain.len();
    let mut rounds = 0;

    while let Some(index) = find_best_merge(&chain, params) {
        if rounds >= max_rounds {
            return Err(SegmentError::MergeDidNotConverge { rounds });
        }
        debug!(
            "Merge round {}: absorbing segment {} into {} (gap {:?})",
            rounds + 1,
            index + 1,
            index,
            chain.gap_after(index)
        );
        chain.absorb_next(index);
        rounds += 1;
    }

    debug!(
        "Merged {} segments into {} in {} rounds",
        initial,
        chain.len(),
        rounds
    );
    Ok((chain, rounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(sample_rate: u32, max_duration: f64, max_gap_duration: f64) -> MergeParams {
        MergeParams {
            sample_rate,
            max_duration,
            max_gap_duration,
        }
    }

    #[test]
    fn test_merges_close_pair_only() {
        let chain = SegmentChain::from_bounds(&[(0, 1000), (1050, 1900), (2500, 2600)]).unwrap();
        let result = optimize(chain, &params(1000, 2.0, 0.2)).unwrap();
        assert_eq!(result.bounds(), vec![(0, 1900), (2500, 2600)]);
    }

    #[test]
    fn test_tightest_gap_wins() {
        // Both pairs are legal, but once one merges the other exceeds the cap.
        let chain = SegmentChain::from_bounds(&[(0, 1000), (1300, 2300), (2400, 3400)]).unwrap();
        assert_eq!(find_best_merge(&chain, &params(1000, 2.5, 0.5)), Some(1));

        let result = optimize(chain, &params(1000, 2.5, 0.5)).unwrap();
        assert_eq!(result.bounds(), vec![(0, 1000), (1300, 3400)]);
    }

    #[test]
    fn test_equal_scores_prefer_leftmost() {
        let chain = SegmentChain::from_bounds(&[(0, 100), (110, 200), (210, 300)]).unwrap();
        assert_eq!(find_best_merge(&chain, &params(1000, 10.0, 1.0)), Some(0));
    }

    #[test]
    fn test_gap_equal_to_limit_is_legal() {
        let chain = SegmentChain::from_bounds(&[(0, 100), (300, 400)]).unwrap();
        let result = optimize(chain, &params(1000, 1.0, 0.2)).unwrap();
        assert_eq!(result.bounds(), vec![(0, 400)]);
    }

    #[test]
    fn test_rescan_after_each_merge() {
        // After the first merge the new pair exceeds the cap, so the tail stays.
        let chain = SegmentChain::from_bounds(&[(0, 500), (510, 1000), (1020, 1600)]).unwrap();
        let result = optimize(chain, &params(1000, 1.2, 0.1)).unwrap();
        assert_eq!(result.bounds(), vec![(0, 1000), (1020, 1600)]);
    }

    #[test]
    fn test_empty_and_single_unchanged() {
        let empty = optimize(SegmentChain::new(), &params(1000, 2.0, 0.2)).unwrap();
        assert!(empty.is_empty());

        let single = SegmentChain::from_bounds(&[(10, 20)]).unwrap();
        let result = optimize(single.clone(), &params(1000, 2.0, 0.2)).unwrap();
        assert_eq!(result, single);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let chain = SegmentChain::from_bounds(&[(0, 10)]).unwrap();
        assert!(optimize(chain.clone(), &params(0, 2.0, 0.2)).is_err());
        assert!(optimize(chain.clone(), &params(1000, 0.0, 0.2)).is_err());
        assert!(optimize(chain, &params(1000, 2.0, -0.1)).is_err());
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let chain = SegmentChain::from_bounds(&[
            (0, 400),
            (450, 900),
            (1000, 1500),
            (3000, 3300),
            (3310, 3900),
        ])
        .unwrap();
        let p = params(1000, 1.0, 0.3);
        let once = optimize(chain, &p).unwrap();
        let twice = optimize(once.clone(), &p).unwrap();
        assert_eq!(once, twice);
        assert_eq!(find_best_merge(&once, &p), None);
    }

    #[test]
    fn test_full_chain_settles_in_n_minus_one_rounds() {
        let chain = SegmentChain::from_bounds(&[
            (0, 100),
            (150, 250),
            (300, 400),
            (400, 500),
            (520, 600),
        ])
        .unwrap();
        let (result, rounds) = optimize_with_rounds(chain, &params(1000, 10.0, 0.1)).unwrap();
        assert_eq!(result.bounds(), vec![(0, 600)]);
        assert_eq!(rounds, 4);
    }

    #[test]
    fn test_round_budget_exhausted() {
        let chain = SegmentChain::from_bounds(&[(0, 100), (110, 200), (210, 300)]).unwrap();
        let err = merge_until_stable(chain, &params(1000, 10.0, 1.0), 1).unwrap_err();
        assert!(matches!(err, SegmentError::MergeDidNotConverge { rounds: 1 }));
    }

    #[test]
    fn test_round_budget_exactly_sufficient() {
        let chain = SegmentChain::from_bounds(&[(0, 100), (110, 200), (210, 300)]).unwrap();
        let (result, rounds) = merge_until_stable(chain, &params(1000, 10.0, 1.0), 2).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(rounds, 2);
    }
}
