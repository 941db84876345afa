//! Window primitives shared by the indicators.
//!
//! Every function returns one value per input and is causal: output `i` reads
//! inputs `0..=i` only.

/// Exponentially weighted mean with `alpha`, recursive form
/// `m[i] = alpha * x[i] + (1 - alpha) * m[i-1]`, seeded with the first present value.
///
/// Leading `None` inputs are skipped. A `None` after the seed leaves the running mean
/// unchanged. Output stays `None` until `min_periods` present values have been seen.
pub fn ewm_mean(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut mean: Option<f64> = None;
    let mut seen = 0usize;

    for value in values {
        if let Some(x) = *value {
            seen += 1;
            mean = Some(match mean {
                Some(previous) => alpha * x + (1.0 - alpha) * previous,
                None => x,
            });
        }
        out.push(if seen >= min_periods { mean } else { None });
    }
    out
}

/// EMA with span `n`: `alpha = 2 / (n + 1)`, defined after `n` present values.
pub fn ema(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    ewm_mean(values, alpha, span)
}

/// Wilder smoothing with period `n`: `alpha = 1 / n`, defined after `n` present values.
pub fn wilder(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    ewm_mean(values, 1.0 / period as f64, period)
}

/// Apply `stat` to each full trailing window of `window` values.
///
/// The first `window - 1` outputs are `None`, as is any window holding a `None`.
pub fn rolling<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let mut buffer = Vec::with_capacity(window);
    for end in window..=values.len() {
        buffer.clear();
        buffer.extend(values[end - window..end].iter().map_while(|value| *value));
        if buffer.len() == window {
            out[end - 1] = stat(&buffer);
        }
    }
    out
}

pub fn mean(window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Sample standard deviation (`n - 1` denominator); `None` for fewer than two values.
pub fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let mean = mean(window)?;
    let squares: f64 = window.iter().map(|x| (x - mean).powi(2)).sum();
    Some((squares / (window.len() - 1) as f64).sqrt())
}

pub fn min(window: &[f64]) -> Option<f64> {
    window.iter().copied().reduce(f64::min)
}

pub fn max(window: &[f64]) -> Option<f64> {
    window.iter().copied().reduce(f64::max)
}

pub fn present(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}
