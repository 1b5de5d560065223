//! Empirical cumulative distributions and descriptive statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::DistributionPoint;
use crate::error::{IacBugsError, Result};

/// Build the cumulative distribution of `samples` normalised against `total`.
///
/// One point is produced per distinct sample value, in ascending order. The
/// percentage at each point counts every sample at or below that value. `total`
/// may exceed the number of samples, in which case the curve stops short of
/// 100%.
pub fn cumulative_fractions(samples: &[u64], total: usize) -> Result<Vec<DistributionPoint>> {
    if total == 0 {
        return Err(IacBugsError::DivisionByZero);
    }

    let mut frequencies: BTreeMap<u64, usize> = BTreeMap::new();
    for sample in samples {
        *frequencies.entry(*sample).or_insert(0) += 1;
    }

    let mut running = 0usize;
    let points = frequencies
        .into_iter()
        .map(|(magnitude, count)| {
            running += count;
            DistributionPoint {
                magnitude,
                cumulative_percentage: running as f64 / total as f64 * 100.0,
            }
        })
        .collect();
    Ok(points)
}

/// Mean, median, spread and range of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of samples.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median; the mean of the two middle values for even sizes.
    pub median: f64,
    /// Sample standard deviation; absent for fewer than two samples.
    pub std_dev: Option<f64>,
    /// Smallest sample.
    pub min: u64,
    /// Largest sample.
    pub max: u64,
}

impl Summary {
    /// Summarise a sample; `None` when it is empty.
    pub fn of(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let mean = sorted.iter().map(|v| *v as f64).sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            sorted[count / 2] as f64
        } else {
            (sorted[count / 2 - 1] as f64 + sorted[count / 2] as f64) / 2.0
        };
        let std_dev = (count > 1).then(|| {
            let squares: f64 = sorted
                .iter()
                .map(|v| (*v as f64 - mean).powi(2))
                .sum();
            (squares / (count - 1) as f64).sqrt()
        });

        Some(Self {
            count,
            mean,
            median,
            std_dev,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn builds_cumulative_points() {
        let points = cumulative_fractions(&[1, 1, 3, 5, 5, 5], 6).expect("points");
        let magnitudes: Vec<u64> = points.iter().map(|p| p.magnitude).collect();
        assert_eq!(magnitudes, vec![1, 3, 5]);
        assert!(approx(points[0].cumulative_percentage, 33.33));
        assert!(approx(points[1].cumulative_percentage, 50.0));
        assert!(approx(points[2].cumulative_percentage, 100.0));
    }

    #[test]
    fn larger_population_leaves_curve_below_full() {
        let points = cumulative_fractions(&[2, 4], 8).expect("points");
        assert_eq!(points.len(), 2);
        assert!(approx(points[1].cumulative_percentage, 25.0));
    }

    #[test]
    fn points_are_monotonic() {
        let samples = [9, 0, 3, 3, 27, 1, 0, 9, 9, 100];
        let points = cumulative_fractions(&samples, 12).expect("points");
        for pair in points.windows(2) {
            assert!(pair[0].magnitude < pair[1].magnitude);
            assert!(pair[0].cumulative_percentage <= pair[1].cumulative_percentage);
        }
        let last = points.last().expect("last point");
        assert!(last.cumulative_percentage <= 100.0);
        assert!(approx(last.cumulative_percentage, 10.0 / 12.0 * 100.0));
    }

    #[test]
    fn zero_total_is_rejected() {
        let err = cumulative_fractions(&[1, 2, 3], 0).unwrap_err();
        assert!(matches!(err, IacBugsError::DivisionByZero));
    }

    #[test]
    fn empty_samples_give_empty_curve() {
        assert!(cumulative_fractions(&[], 10).expect("points").is_empty());
    }

    #[test]
    fn summary_matches_hand_computed_values() {
        let summary = Summary::of(&[4, 1, 3, 2]).expect("summary");
        assert_eq!(summary.count, 4);
        assert!(approx(summary.mean, 2.5));
        assert!(approx(summary.median, 2.5));
        assert!(approx(summary.std_dev.expect("sd"), 1.29));
        assert_eq!((summary.min, summary.max), (1, 4));
    }

    #[test]
    fn summary_of_single_sample_has_no_spread() {
        let summary = Summary::of(&[7]).expect("summary");
        assert_eq!(summary.median, 7.0);
        assert!(summary.std_dev.is_none());
        assert!(Summary::of(&[]).is_none());
    }
}
