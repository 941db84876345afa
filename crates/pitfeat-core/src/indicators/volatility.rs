use super::rolling::{mean, rolling, sample_std};

/// True range; the first bar has no prior close so its range is `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let range = high[i] - low[i];
            match i.checked_sub(1).map(|prev| close[prev]) {
                Some(prev_close) => range
                    .max((high[i] - prev_close).abs())
                    .max((low[i] - prev_close).abs()),
                None => range,
            }
        })
        .collect()
}

/// Wilder average true range.
///
/// Seeded at index `period - 1` with the plain mean of the first `period` true
/// ranges, then `atr[i] = (atr[i-1] * (period - 1) + tr[i]) / period`.
pub fn average_true_range(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> Vec<Option<f64>> {
    let tr = true_range(high, low, close);
    let mut out = vec![None; tr.len()];
    if period == 0 || tr.len() < period {
        return out;
    }

    let n = period as f64;
    let mut atr = tr[..period].iter().sum::<f64>() / n;
    out[period - 1] = Some(atr);
    for (slot, range) in out.iter_mut().zip(&tr).skip(period) {
        atr = (atr * (n - 1.0) + range) / n;
        *slot = Some(atr);
    }
    out
}

/// `(v - mean) / (std + 1e-9)` over a trailing window of `window` volumes.
pub fn volume_zscore(volume: &[f64], window: usize) -> Vec<Option<f64>> {
    const EPSILON: f64 = 1e-9;

    let series: Vec<Option<f64>> = volume.iter().copied().map(Some).collect();
    let means = rolling(&series, window, mean);
    let stds = rolling(&series, window, sample_std);

    volume
        .iter()
        .zip(means.into_iter().zip(stds))
        .map(|(v, (mean, std))| Some((v - mean?) / (std? + EPSILON)))
        .collect()
}
