use super::types::{OutcomeSet, PercentileSummary};

/// p-th percentile of `values` (p in 0..=100) by linear interpolation
/// between the closest ranks, inclusive of both ends.
///
/// Sorts a copy; the caller's ordering is left alone.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_of_sorted(&sorted, p)
}

/// Same as [`percentile`] for input already in ascending order.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    // 0-indexed form of rank = p/100 * (n-1) + 1.
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    // Equal brackets also covers a pair of infinities, where interpolating gives NaN.
    if lower == upper || sorted[lower] == sorted[upper] {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] + w * (sorted[upper] - sorted[lower])
    }
}

pub fn summarize(label: &str, outcomes: &OutcomeSet) -> PercentileSummary {
    let mut sorted = outcomes.values().to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    PercentileSummary {
        label: label.to_string(),
        p10: percentile_of_sorted(&sorted, 10.0),
        p50: percentile_of_sorted(&sorted, 50.0),
        p90: percentile_of_sorted(&sorted, 90.0),
    }
}
