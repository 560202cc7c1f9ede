#[cfg(test)]
mod tests {
    use super::super::engine::*;
    use super::super::indicators::*;
    use analysis_core::{AnalysisError, PricePoint, PriceSeries};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    // Helper function to build a daily series from closes
    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000.0 + (i as f64) * 10.0,
            })
            .collect();
        PriceSeries::new("TEST", points).unwrap()
    }

    // Wavy upward drift, never flat
    fn sample_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.3).sin() + 0.1 * i as f64)
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 5);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 2.0); // (1+2+3)/3
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let result = sma(&[1.0, 2.0], 5);
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn test_pct_change_and_diff() {
        let data = vec![100.0, 110.0, 99.0];
        let pct = pct_change(&data);
        let d = diff(&data);

        assert_eq!(pct[0], None);
        assert_relative_eq!(pct[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(pct[2].unwrap(), -0.1, epsilon = 1e-12);
        assert_eq!(d, vec![None, Some(10.0), Some(-11.0)]);
    }

    #[test]
    fn test_rolling_windows_need_full_coverage() {
        let values = vec![None, Some(1.0), Some(2.0), Some(3.0), Some(6.0)];
        let means = rolling_mean(&values, 3);
        let stds = rolling_std(&values, 3);

        assert_eq!(means[2], None); // window touches the undefined head
        assert_relative_eq!(means[3].unwrap(), 2.0);
        assert_relative_eq!(means[4].unwrap(), 11.0 / 3.0, epsilon = 1e-12);
        assert_eq!(stds[2], None);
        assert_relative_eq!(stds[3].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_corr_min_pairs() {
        let x = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let y = vec![None, None, Some(3.0), Some(5.0)];
        let corr = rolling_corr(&x, &y, 3, 2);

        assert_eq!(corr[2], None); // single defined pair
        assert_relative_eq!(corr[3].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drawdown() {
        let dd = drawdown(&[100.0, 120.0, 90.0, 130.0]);
        assert_eq!(dd.len(), 4);
        assert_relative_eq!(dd[0], 0.0);
        assert_relative_eq!(dd[2], -0.25, epsilon = 1e-12);
        assert_relative_eq!(dd[3], 0.0);
    }

    #[test]
    fn test_snapshot_count_and_finiteness() {
        for n in [50usize, 60, 120, 252] {
            let series = series_from(&sample_closes(n));
            let snapshots = compute_indicators(&series).unwrap();

            assert_eq!(snapshots.len(), n - 49, "n = {n}");
            assert!(snapshots.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn test_snapshot_dates_start_after_warmup() {
        let closes = sample_closes(80);
        let series = series_from(&closes);
        let snapshots = compute_indicators(&series).unwrap();

        assert_eq!(snapshots[0].date, series.points()[49].date);
        assert_eq!(snapshots.last().unwrap().date, series.last().date);

        let expected_sma50 = closes[..50].iter().sum::<f64>() / 50.0;
        let expected_sma20 = closes[30..50].iter().sum::<f64>() / 20.0;
        assert_relative_eq!(snapshots[0].sma50, expected_sma50, epsilon = 1e-9);
        assert_relative_eq!(snapshots[0].sma20, expected_sma20, epsilon = 1e-9);
        assert_relative_eq!(snapshots[0].close, closes[49]);
    }

    #[test]
    fn test_momentum_is_mean_of_differences() {
        let closes = sample_closes(70);
        let series = series_from(&closes);
        let last = *compute_indicators(&series).unwrap().last().unwrap();

        // mean of the last 10 first differences telescopes to (c[t] - c[t-10]) / 10
        let expected = (closes[69] - closes[59]) / 10.0;
        assert_relative_eq!(last.momentum10, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sharpe_is_constant_across_rows() {
        let series = series_from(&sample_closes(100));
        let snapshots = compute_indicators(&series).unwrap();
        let first = snapshots[0].sharpe;
        assert!(snapshots.iter().all(|s| s.sharpe == first));
    }

    #[test]
    fn test_beta_bounds() {
        let series = series_from(&sample_closes(150));
        let snapshots = compute_indicators(&series).unwrap();

        // one (return, sma50) pair on the first valid date
        assert_eq!(snapshots[0].beta20, 0.0);
        assert!(snapshots.iter().all(|s| (-1.0..=1.0).contains(&s.beta20)));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let series = series_from(&sample_closes(200));
        let first = compute_indicators(&series).unwrap();
        let second = IndicatorEngine::new().compute_indicators(&series).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_insufficient_history() {
        let series = series_from(&sample_closes(49));
        let err = compute_indicators(&series).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientHistory {
                required: 50,
                actual: 49
            }
        );
    }

    #[test]
    fn test_constant_prices_are_degenerate() {
        let series = series_from(&[42.0; 60]);
        let err = compute_indicators(&series).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateSeries(_)));
    }

    #[test]
    fn test_constant_growth_is_degenerate() {
        // identical daily returns leave the Sharpe denominator at zero
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let err = compute_indicators(&series_from(&closes)).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateSeries(_)));
    }

    #[test]
    fn test_flat_tail_stays_finite() {
        let mut closes = sample_closes(60);
        closes.extend(std::iter::repeat(105.0).take(25));
        let snapshots = compute_indicators(&series_from(&closes)).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.volatility20, 0.0);
        assert_eq!(last.momentum10, 0.0);
        assert_eq!(last.rsi14, 50.0);
        assert_eq!(last.beta20, 0.0);
        assert!(last.sharpe.is_finite());
    }

    #[test]
    fn test_latest_drawdown() {
        let mut closes = sample_closes(60);
        let peak = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        closes.push(peak * 0.8);
        let series = series_from(&closes);
        assert_relative_eq!(latest_drawdown(&series), -0.2, epsilon = 1e-9);
    }

    fn sample_mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    // n - 1 denominator, written out independently of the engine helpers
    fn sample_std(values: &[f64]) -> f64 {
        let m = sample_mean(values);
        (values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64).sqrt()
    }

    fn correlation(x: &[f64], y: &[f64]) -> f64 {
        let (mx, my) = (sample_mean(x), sample_mean(y));
        let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let vx: f64 = x.iter().map(|a| (a - mx) * (a - mx)).sum();
        let vy: f64 = y.iter().map(|b| (b - my) * (b - my)).sum();
        cov / (vx.sqrt() * vy.sqrt())
    }

    #[test]
    fn test_snapshot_matches_reference_formulas() {
        let n = 90;
        let closes = sample_closes(n);
        let last = *compute_indicators(&series_from(&closes)).unwrap().last().unwrap();

        // returns[k] is the change into closes[k + 1]
        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let t = n - 1;

        let vol_window = &returns[t - 20..t];
        assert_relative_eq!(last.volatility20, sample_std(vol_window), epsilon = 1e-12);

        let rsi_window = &returns[t - 14..t];
        let expected_rsi = 100.0 - 100.0 / (1.0 + sample_mean(rsi_window) / sample_std(rsi_window));
        assert_relative_eq!(last.rsi14, expected_rsi, epsilon = 1e-9);

        let sma50: Vec<f64> = (t - 19..=t)
            .map(|i| closes[i + 1 - 50..=i].iter().sum::<f64>() / 50.0)
            .collect();
        let expected_beta = correlation(&returns[t - 20..t], &sma50);
        assert_relative_eq!(last.beta20, expected_beta, epsilon = 1e-9);

        let expected_sharpe = sample_mean(&returns) / sample_std(&returns);
        assert_relative_eq!(last.sharpe, expected_sharpe, epsilon = 1e-9);

        // population std would shift volatility by sqrt(20 / 19)
        let population = sample_std(vol_window) * (19.0f64 / 20.0).sqrt();
        assert!((last.volatility20 - population).abs() > 1e-6);
    }

    #[test]
    fn test_drawdown_peak_inside_warmup_counts() {
        // highest close sits in the first 49 observations
        let mut closes = sample_closes(70);
        closes[10] = 200.0;
        let series = series_from(&closes);

        let expected = closes[69] / 200.0 - 1.0;
        assert_relative_eq!(latest_drawdown(&series), expected, epsilon = 1e-12);
    }
}
