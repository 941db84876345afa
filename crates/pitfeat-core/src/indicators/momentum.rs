use super::rolling::{max, mean, min, present, rolling, wilder};

/// Relative strength index with Wilder smoothing over `period` observations.
///
/// The first change is counted as zero, so the first defined value sits at index
/// `period - 1`. When the smoothed loss is zero the index is 100.
pub fn rsi(close: &[f64], period: usize) -> Vec<Option<f64>> {
    let changes: Vec<f64> = close
        .first()
        .map(|_| 0.0)
        .into_iter()
        .chain(close.windows(2).map(|pair| pair[1] - pair[0]))
        .collect();
    let gains: Vec<f64> = changes.iter().map(|change| change.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|change| (-change).max(0.0)).collect();

    let avg_gain = wilder(&present(&gains), period);
    let avg_loss = wilder(&present(&losses), period);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| {
            let (gain, loss) = (gain?, loss?);
            if loss == 0.0 {
                Some(100.0)
            } else {
                Some(100.0 - 100.0 / (1.0 + gain / loss))
            }
        })
        .collect()
}

/// Stochastic oscillator `(%K, %D)`.
///
/// `%K = 100 * (close - lowest low) / (highest high - lowest low)` over `k_window`
/// observations, `None` when the range is zero. `%D` is the simple mean of `%K`
/// over `d_window` and needs every `%K` in its window.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_window: usize,
    d_window: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let lowest = rolling(&present(low), k_window, min);
    let highest = rolling(&present(high), k_window, max);

    let k: Vec<Option<f64>> = close
        .iter()
        .zip(lowest.into_iter().zip(highest))
        .map(|(close, (lowest, highest))| {
            let (lowest, highest) = (lowest?, highest?);
            let range = highest - lowest;
            (range != 0.0).then(|| 100.0 * (close - lowest) / range)
        })
        .collect();
    let d = rolling(&k, d_window, mean);
    (k, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_warm_up_lasts_period_minus_one() {
        let close: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i % 4)).collect();
        let out = rsi(&close, 14);
        assert!(out[..13].iter().all(Option::is_none));
        assert!(out[13..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_of_rising_series_is_100() {
        let close: Vec<f64> = (0..10).map(f64::from).collect();
        let out = rsi(&close, 3);
        assert_eq!(out[9], Some(100.0));
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value defined");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn rsi_matches_hand_worked_values() {
        // gains 0,1,0,2 and losses 0,0,1,0 smoothed with alpha 1/2
        let out = rsi(&[10.0, 11.0, 10.0, 12.0], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(100.0));
        assert_close(out[2], 100.0 / 3.0);
        assert_close(out[3], 900.0 / 11.0);
    }

    #[test]
    fn rsi_on_wilder_sample_closes() {
        let close = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        // Seeded from the first change, not from a 14-bar simple average.
        let out = rsi(&close, 14);
        assert_close(out[13], 71.802_410_653_732_82);
        assert_close(out[15], 65.186_598_925_270_93);
        assert_close(out[19], 54.179_295_420_546_97);
    }

    #[test]
    fn rsi_stays_within_bounds() {
        let close = [10.0, 11.0, 10.5, 10.0, 9.0, 9.5, 9.7, 9.2, 8.8, 9.9];
        for value in rsi(&close, 3).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn stochastic_k_places_close_within_range() {
        let high = [10.0, 12.0, 14.0];
        let low = [8.0, 9.0, 10.0];
        let close = [9.0, 11.0, 13.0];
        let (k, d) = stochastic(&high, &low, &close, 3, 2);
        assert_eq!(k[..2], [None, None]);
        // range 14 - 8 = 6, close 13 sits 5 above the low
        assert!((k[2].expect("defined") - 500.0 / 6.0).abs() < 1e-9);
        assert_eq!(d[2], None);
    }

    #[test]
    fn flat_range_leaves_k_undefined() {
        let flat = [5.0; 4];
        let (k, d) = stochastic(&flat, &flat, &flat, 2, 2);
        assert!(k.iter().all(Option::is_none));
        assert!(d.iter().all(Option::is_none));
    }

    #[test]
    fn stochastic_d_averages_k() {
        let high = [10.0, 11.0, 12.0, 13.0];
        let low = [9.0, 9.0, 9.0, 9.0];
        let close = [9.5, 10.0, 11.0, 13.0];
        let (k, d) = stochastic(&high, &low, &close, 2, 2);
        let expected = (k[2].expect("k2") + k[3].expect("k3")) / 2.0;
        assert!((d[3].expect("d3") - expected).abs() < 1e-12);
    }
}
