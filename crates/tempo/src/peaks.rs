/// Mean plus `multiplier` population standard deviations of `series`.
pub fn adaptive_threshold(series: &[f32], multiplier: f32) -> Option<f32> {
    if series.is_empty() {
        return None;
    }
    let n = series.len() as f64;
    let mean = series.iter().map(|v| *v as f64).sum::<f64>() / n;
    let variance = series
        .iter()
        .map(|v| (*v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    Some((mean + multiplier as f64 * variance.sqrt()) as f32)
}

/// Frame indices that rise above the adaptive threshold and dominate their
/// `min_separation` neighbourhood.
///
/// Earlier neighbours must be strictly lower and later ones no higher, so of
/// two equal spikes within the separation only the first survives. Indices
/// closer than `min_separation` to either end are never reported.
pub fn pick_peaks(series: &[f32], min_separation: usize, multiplier: f32) -> Vec<usize> {
    let Some(threshold) = adaptive_threshold(series, multiplier) else {
        return Vec::new();
    };
    let end = series.len().saturating_sub(min_separation);
    (min_separation..end)
        .filter(|&i| {
            let value = series[i];
            value > threshold
                && series[i - min_separation..i].iter().all(|v| *v < value)
                && series[i + 1..=i + min_separation].iter().all(|v| *v <= value)
        })
        .collect()
}
