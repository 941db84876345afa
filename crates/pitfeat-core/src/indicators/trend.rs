use super::rolling::{ema, present};

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub hist: Vec<Option<f64>>,
}

/// `EMA(fast) - EMA(slow)` of close, its EMA over `signal` observations, and their difference.
///
/// The signal EMA starts at the first defined MACD value, so it is defined from
/// index `max(fast, slow) + signal - 2`.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let close = present(close);
    let fast_ema = ema(&close, fast);
    let slow_ema = ema(&close, slow);

    let line: Vec<Option<f64>> = fast_ema
        .into_iter()
        .zip(slow_ema)
        .map(|(fast, slow)| Some(fast? - slow?))
        .collect();
    let signal = ema(&line, signal);
    let hist = line
        .iter()
        .zip(&signal)
        .map(|(line, signal)| Some((*line)? - (*signal)?))
        .collect();

    Macd { line, signal, hist }
}
