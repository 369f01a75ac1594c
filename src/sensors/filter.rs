//! Trimmed-mean sampler shared by every sensor channel.

use crate::error::SensorError;

/// Samples discarded at each end of the sorted set.
pub const TRIM: usize = 2;

/// Smallest sample set that leaves at least one value after trimming.
pub const MIN_SAMPLES: usize = 2 * TRIM + 1;

/// Sort, drop the two lowest and two highest samples, average the rest.
///
/// `[1, 2, 3, 4, 5, 6, 7, 8, 9, 100]` → mean of `[3..=8]` = 5.5.
pub fn trimmed_mean(samples: &[f32]) -> Result<f32, SensorError> {
    if samples.len() < MIN_SAMPLES {
        return Err(SensorError::InsufficientSamples);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f32::total_cmp);
    let kept = &sorted[TRIM..sorted.len() - TRIM];
    Ok(kept.iter().sum::<f32>() / kept.len() as f32)
}
