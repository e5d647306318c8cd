//! Trailing waste averages: per-row training features and the frozen
//! inference snapshot

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Trailing mean of the previous `window` values at every position of a
/// series. The current value is excluded, and positions with fewer than
/// `window` preceding values yield 0.0.
pub fn trailing_means(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(PipelineError::ValidationError(
            "Trailing mean window must be positive".to_string(),
        ));
    }

    Ok((0..values.len())
        .map(|i| {
            if i >= window {
                values[i - window..i].iter().sum::<f64>() / window as f64
            } else {
                0.0
            }
        })
        .collect())
}

/// Rolling waste history captured once from the end of the training batch.
///
/// The service reuses this snapshot verbatim for every request until the
/// next training run replaces it; it does not advance with elapsed time.
/// How stale it may become is bounded only by the retraining cadence,
/// which is an operational contract, not a property of this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalSnapshot {
    /// Mean of the last 3 recorded waste values
    pub past_3d_avg: f64,
    /// Mean of the last 7 recorded waste values
    pub past_7d_avg: f64,
}

impl TemporalSnapshot {
    /// Capture the snapshot from a date-ordered target series. Batches
    /// shorter than a window average whatever rows exist.
    pub fn capture(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::DataError(
                "Cannot capture a temporal snapshot from an empty series".to_string(),
            ));
        }

        Ok(Self {
            past_3d_avg: tail_mean(values, 3),
            past_7d_avg: tail_mean(values, 7),
        })
    }
}

fn tail_mean(values: &[f64], window: usize) -> f64 {
    let take = window.min(values.len());
    values[values.len() - take..].iter().sum::<f64>() / take as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn trailing_means_exclude_the_current_value() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let means = trailing_means(&series, 3).unwrap();

        assert_eq!(&means[..3], &[0.0, 0.0, 0.0]);
        assert_approx_eq!(means[3], 2.0); // mean of 1, 2, 3
        assert_approx_eq!(means[4], 3.0); // mean of 2, 3, 4
    }

    #[test]
    fn trailing_means_reject_zero_window() {
        assert!(trailing_means(&[1.0], 0).is_err());
    }

    #[test]
    fn snapshot_captures_tail_means() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let snapshot = TemporalSnapshot::capture(&series).unwrap();

        assert_approx_eq!(snapshot.past_3d_avg, 7.0); // mean of 6, 7, 8
        assert_approx_eq!(snapshot.past_7d_avg, 5.0); // mean of 2..=8
    }

    #[test]
    fn short_batches_average_what_exists() {
        let snapshot = TemporalSnapshot::capture(&[4.0, 6.0]).unwrap();
        assert_approx_eq!(snapshot.past_3d_avg, 5.0);
        assert_approx_eq!(snapshot.past_7d_avg, 5.0);
    }

    #[test]
    fn empty_series_is_a_data_error() {
        assert!(TemporalSnapshot::capture(&[]).is_err());
    }
}
