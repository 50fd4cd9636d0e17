//! Series aggregation
//!
//! Each timing series has its own policy for unavailable samples; the
//! policies are kept as they are so stored records stay comparable across
//! versions.

use crate::metrics::UNAVAILABLE;

/// Average, maximum and size of a pause series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseSummary {
    pub average: f64,
    pub max: f64,
    /// Number of samples, unavailable ones included
    pub count: u32,
}

/// Mean, population standard deviation and size of the IKI series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkiSummary {
    pub mean: f64,
    pub std_dev: f64,
    /// Number of samples, unavailable ones included
    pub count: u32,
}

fn empty_pause_summary() -> PauseSummary {
    PauseSummary {
        average: UNAVAILABLE,
        max: 0.0,
        count: 0,
    }
}

/// Word-to-word pauses: mean over every sample, unavailable ones included.
pub fn summarize_pause_wtw(samples: &[f64]) -> PauseSummary {
    if samples.is_empty() {
        return empty_pause_summary();
    }

    let mut max = 0.0;
    let mut total = 0.0;
    for &duration in samples {
        if duration > max {
            max = duration;
        }
        total += duration;
    }

    PauseSummary {
        average: total / samples.len() as f64,
        max,
        count: samples.len() as u32,
    }
}

/// Character-to-character pauses.
///
/// Scanning stops at the first unavailable sample: it is excluded from the
/// denominator, but every sample after it is ignored for the sum and the max
/// while still counting toward the denominator.
pub fn summarize_pause_ctc(samples: &[f64]) -> PauseSummary {
    if samples.is_empty() {
        return empty_pause_summary();
    }

    let mut max = 0.0;
    let mut total = 0.0;
    let mut invalid = 0usize;
    for &duration in samples {
        if duration == UNAVAILABLE {
            invalid += 1;
            break;
        }
        if duration > max {
            max = duration;
        }
        total += duration;
    }

    let denominator = samples.len() - invalid;
    let average = if denominator == 0 {
        UNAVAILABLE
    } else {
        total / denominator as f64
    };

    PauseSummary {
        average,
        max,
        count: samples.len() as u32,
    }
}

/// Inter-key intervals: mean and population standard deviation over the
/// valid (non-negative) samples of the whole series.
pub fn summarize_iki(samples: &[f64]) -> IkiSummary {
    let valid: Vec<f64> = samples.iter().copied().filter(|d| *d >= 0.0).collect();
    let count = samples.len() as u32;

    if valid.is_empty() {
        return IkiSummary {
            mean: UNAVAILABLE,
            std_dev: UNAVAILABLE,
            count,
        };
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let variance = valid.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;

    IkiSummary {
        mean,
        std_dev: variance.sqrt(),
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_wtw_mean_and_max() {
        let summary = summarize_pause_wtw(&[0.5, 1.5, 2.0]);
        assert!((summary.average - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.max, 2.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_pause_wtw_keeps_zero_sentinels_in_mean() {
        let summary = summarize_pause_wtw(&[2.0, 0.0]);
        assert_eq!(summary.average, 1.0);
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn test_pause_wtw_empty() {
        let summary = summarize_pause_wtw(&[]);
        assert_eq!(summary.average, -1.0);
        assert_eq!(summary.max, 0.0);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn test_pause_ctc_all_valid() {
        let summary = summarize_pause_ctc(&[1.0, 3.0]);
        assert_eq!(summary.average, 2.0);
        assert_eq!(summary.max, 3.0);
    }

    #[test]
    fn test_pause_ctc_stops_at_first_invalid() {
        // 2.0 / (3 - 1); the trailing 3.0 never reaches the sum or the max
        let summary = summarize_pause_ctc(&[2.0, -1.0, 3.0]);
        assert_eq!(summary.average, 1.0);
        assert_eq!(summary.max, 2.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_pause_ctc_second_invalid_not_excluded() {
        // 1.0 / (4 - 1)
        let summary = summarize_pause_ctc(&[1.0, -1.0, -1.0, 5.0]);
        assert!((summary.average - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.count, 4);
    }

    #[test]
    fn test_pause_ctc_single_invalid() {
        let summary = summarize_pause_ctc(&[-1.0]);
        assert_eq!(summary.average, -1.0);
        assert_eq!(summary.max, 0.0);
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn test_iki_filters_invalid() {
        let summary = summarize_iki(&[1.0, -1.0, 2.0]);
        assert_eq!(summary.mean, 1.5);
        assert_eq!(summary.std_dev, 0.5);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_iki_scans_past_invalid() {
        let summary = summarize_iki(&[-1.0, 4.0, -1.0, 4.0]);
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.count, 4);
    }

    #[test]
    fn test_iki_no_valid_samples() {
        let summary = summarize_iki(&[-1.0, -1.0]);
        assert_eq!(summary.mean, -1.0);
        assert_eq!(summary.std_dev, -1.0);
        assert_eq!(summary.count, 2);

        let empty = summarize_iki(&[]);
        assert_eq!(empty.mean, -1.0);
        assert_eq!(empty.std_dev, -1.0);
        assert_eq!(empty.count, 0);
    }
}
