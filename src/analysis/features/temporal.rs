// Temporal module - Time-domain feature extraction

/// Compute zero-crossing rate (ZCR)
///
/// A crossing is counted between adjacent samples when one is >= 0 and the
/// other is < 0. The count is normalized by the number of adjacent pairs.
///
/// # Returns
/// Zero-crossing rate (0.0 to 1.0), or 0.0 for fewer than two samples
pub fn compute_zcr(audio: &[f32]) -> f64 {
    if audio.len() < 2 {
        return 0.0;
    }

    let crossings = audio
        .windows(2)
        .filter(|pair| (pair[1] >= 0.0 && pair[0] < 0.0) || (pair[1] < 0.0 && pair[0] >= 0.0))
        .count();

    crossings as f64 / (audio.len() - 1) as f64
}
