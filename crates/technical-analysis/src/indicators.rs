//! Rolling-window primitives.
//!
//! Every function returns a vector aligned index-for-index with its input. Positions
//! where the window is not yet full are `None`, so warm-up is explicit instead of
//! being smuggled through NaN.

use analysis_core::stats;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let mut sum: f64 = data[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);
    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result[i] = Some(sum / period as f64);
    }
    result
}

/// Fractional change `data[t] / data[t-1] - 1`; undefined at the first position.
pub fn pct_change(data: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(data.len());
    if data.is_empty() {
        return result;
    }
    result.push(None);
    for w in data.windows(2) {
        result.push(Some(w[1] / w[0] - 1.0));
    }
    result
}

/// First difference `data[t] - data[t-1]`; undefined at the first position.
pub fn diff(data: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(data.len());
    if data.is_empty() {
        return result;
    }
    result.push(None);
    for w in data.windows(2) {
        result.push(Some(w[1] - w[0]));
    }
    result
}

/// Collect the trailing `window` values ending at `end` if all of them are defined.
fn full_window(values: &[Option<f64>], end: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || end + 1 < window {
        return None;
    }
    values[end + 1 - window..=end].iter().copied().collect()
}

/// Rolling mean over a partially defined series.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| full_window(values, i, window).map(|w| stats::mean(&w)))
        .collect()
}

/// Rolling sample standard deviation over a partially defined series.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| full_window(values, i, window).map(|w| stats::std_dev(&w)))
        .collect()
}

/// Rolling Pearson correlation.
///
/// Each position looks at the trailing `window` positions and keeps only those where
/// both series are defined; the result is `Some` once at least `min_pairs` such pairs
/// exist and both sides have non-zero variance.
pub fn rolling_corr(
    x: &[Option<f64>],
    y: &[Option<f64>],
    window: usize,
    min_pairs: usize,
) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    let mut result = vec![None; n];
    if window == 0 {
        return result;
    }

    let mut xs = Vec::with_capacity(window);
    let mut ys = Vec::with_capacity(window);
    for (i, slot) in result.iter_mut().enumerate() {
        xs.clear();
        ys.clear();
        let start = (i + 1).saturating_sub(window);
        for j in start..=i {
            if let (Some(a), Some(b)) = (x[j], y[j]) {
                xs.push(a);
                ys.push(b);
            }
        }
        if xs.len() >= min_pairs.max(2) {
            *slot = stats::pearson(&xs, &ys);
        }
    }
    result
}

/// Running drawdown `close / running_max(close) - 1` over the whole series.
pub fn drawdown(closes: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    closes
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            c / peak - 1.0
        })
        .collect()
}
