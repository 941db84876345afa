use super::rolling::{rolling, sample_std};

/// Log return over `lag` observations: `ln(p[i]) - ln(p[i - lag])`.
///
/// `None` while fewer than `lag` prior observations exist, or when either price is
/// not strictly positive.
pub fn log_return(prices: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| {
            let back = i.checked_sub(lag)?;
            let (now, then) = (prices[i], prices[back]);
            (now > 0.0 && then > 0.0).then(|| now.ln() - then.ln())
        })
        .collect()
}

/// One-day log return with the first observation defined as 0.
pub fn log_return_1d(prices: &[f64]) -> Vec<Option<f64>> {
    let mut out = log_return(prices, 1);
    if let Some(first) = out.first_mut() {
        *first = Some(0.0);
    }
    out
}

/// One-day simple return; the first observation is 0 as there is no prior day.
pub fn simple_return_1d(prices: &[f64]) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| {
            if i == 0 {
                return Some(0.0);
            }
            let previous = prices[i - 1];
            (previous > 0.0).then(|| prices[i] / previous - 1.0)
        })
        .collect()
}

/// Realized volatility: sample std of one-day simple returns over `window` observations.
pub fn realized_volatility(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(&simple_return_1d(prices), window, sample_std)
}
