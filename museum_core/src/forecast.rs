//! Seasonal-naive visit forecasting.
//!
//! With at least a year of history, each future month is predicted as the
//! count observed in the same month one year earlier. Otherwise, or when that
//! month is missing, the prediction is the mean of the last three observed
//! months.

use crate::{MonthlyCount, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Minimum history length before same-month-last-year lookups are used
pub const SEASONAL_MIN_MONTHS: usize = 12;

/// Number of trailing observations averaged for the fallback baseline
pub const BASELINE_WINDOW: usize = 3;

/// How a forecast point was produced
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Value copied from the same month one year earlier
    SeasonalNaive,
    /// Enough history for seasonal lookup, but the prior-year month is missing
    #[serde(rename = "avg_last3_fallback")]
    AvgLast3Fallback,
    /// Not enough history for seasonal lookup
    #[serde(rename = "avg_last3")]
    AvgLast3,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::SeasonalNaive => "seasonal_naive",
            ForecastMethod::AvgLast3Fallback => "avg_last3_fallback",
            ForecastMethod::AvgLast3 => "avg_last3",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicted visit count for one future month
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForecastPoint {
    pub month: YearMonth,
    pub predicted_visits: u64,
    pub method: ForecastMethod,
}

/// Forecast `horizon` months following the last entry of `series`.
///
/// `series` must be in ascending month order. Returns an empty vector when
/// the series is empty or the horizon is not positive.
pub fn seasonal_naive_forecast(series: &[MonthlyCount], horizon: i64) -> Vec<ForecastPoint> {
    let Some(last) = series.last() else {
        return Vec::new();
    };
    if horizon <= 0 {
        return Vec::new();
    }

    // Later duplicates overwrite earlier ones.
    let by_month: HashMap<YearMonth, u64> =
        series.iter().map(|mc| (mc.month, mc.count)).collect();
    let seasonal = series.len() >= SEASONAL_MIN_MONTHS;
    let baseline = trailing_mean(series);

    let mut month = last.month;
    let mut points = Vec::new();
    for _ in 0..horizon {
        month = month.next();

        let (predicted_visits, method) = if seasonal {
            match by_month.get(&month.year_before()) {
                Some(&prior) => (prior, ForecastMethod::SeasonalNaive),
                None => (baseline, ForecastMethod::AvgLast3Fallback),
            }
        } else {
            (baseline, ForecastMethod::AvgLast3)
        };

        points.push(ForecastPoint {
            month,
            predicted_visits,
            method,
        });
    }

    tracing::debug!(
        "Forecast {} months from {} observations (seasonal: {})",
        points.len(),
        series.len(),
        seasonal
    );
    points
}

/// Mean of the last `BASELINE_WINDOW` counts, rounded half up.
/// Caller guarantees `series` is non-empty.
fn trailing_mean(series: &[MonthlyCount]) -> u64 {
    let window = &series[series.len().saturating_sub(BASELINE_WINDOW)..];
    let n = window.len() as u64;
    let sum: u64 = window.iter().map(|mc| mc.count).sum();
    (2 * sum + n) / (2 * n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(start: YearMonth, counts: &[u64]) -> Vec<MonthlyCount> {
        let mut month = start;
        let mut out = Vec::new();
        for &c in counts {
            out.push(MonthlyCount::new(month, c));
            month = month.next();
        }
        out
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_inputs_give_empty_forecast() {
        assert!(seasonal_naive_forecast(&[], 3).is_empty());

        let series = series_from(ym("2024-01"), &[5, 6]);
        assert!(seasonal_naive_forecast(&series, 0).is_empty());
        assert!(seasonal_naive_forecast(&series, -4).is_empty());
    }

    #[test]
    fn test_thirteen_month_scenario() {
        let series = series_from(
            ym("2023-01"),
            &[10, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 20, 15],
        );
        let points = seasonal_naive_forecast(&series, 3);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].month.to_string(), "2024-02");
        assert_eq!(points[0].predicted_visits, 12);
        assert_eq!(points[0].method, ForecastMethod::SeasonalNaive);
        assert_eq!(points[1].month.to_string(), "2024-03");
        assert_eq!(points[1].predicted_visits, 13);
        assert_eq!(points[2].predicted_visits, 14);
    }

    #[test]
    fn test_short_series_uses_rounded_trailing_mean() {
        // (4 + 5 + 6) / 3 = 5
        let series = series_from(ym("2024-01"), &[100, 4, 5, 6]);
        let points = seasonal_naive_forecast(&series, 4);
        assert_eq!(points.len(), 4);
        assert!(points
            .iter()
            .all(|p| p.method == ForecastMethod::AvgLast3 && p.predicted_visits == 5));
    }

    #[test]
    fn test_half_rounds_up() {
        // (1 + 2) / 2 = 1.5 -> 2
        let series = series_from(ym("2024-01"), &[1, 2]);
        assert_eq!(seasonal_naive_forecast(&series, 1)[0].predicted_visits, 2);

        // (1 + 1 + 2) / 3 = 1.33 -> 1
        let series = series_from(ym("2024-01"), &[1, 1, 2]);
        assert_eq!(seasonal_naive_forecast(&series, 1)[0].predicted_visits, 1);

        let single = series_from(ym("2024-01"), &[7]);
        assert_eq!(seasonal_naive_forecast(&single, 1)[0].predicted_visits, 7);
    }

    #[test]
    fn test_month_rollover_labels() {
        let series = series_from(ym("2024-11"), &[3, 4]);
        let labels: Vec<String> = seasonal_naive_forecast(&series, 2)
            .iter()
            .map(|p| p.month.to_string())
            .collect();
        assert_eq!(labels, vec!["2025-01", "2025-02"]);
    }

    #[test]
    fn test_gap_in_history_falls_back() {
        // Twelve entries, but 2023-02 is missing, so 2024-02 has no prior-year value.
        let mut series = vec![MonthlyCount::new(ym("2023-01"), 10)];
        series.extend(series_from(ym("2023-03"), &[30, 30, 30, 30, 30, 30, 30, 30, 30, 9, 11]));
        assert_eq!(series.len(), 12);
        assert_eq!(series.last().unwrap().month.to_string(), "2024-01");

        let points = seasonal_naive_forecast(&series, 2);
        assert_eq!(points[0].month.to_string(), "2024-02");
        assert_eq!(points[0].method, ForecastMethod::AvgLast3Fallback);
        // (30 + 9 + 11) / 3 = 16.67 -> 17
        assert_eq!(points[0].predicted_visits, 17);
        assert_eq!(points[1].method, ForecastMethod::SeasonalNaive);
        assert_eq!(points[1].predicted_visits, 30);
    }

    #[test]
    fn test_baseline_not_recomputed_from_forecasts() {
        let series = series_from(ym("2024-01"), &[9, 9, 12]);
        let points = seasonal_naive_forecast(&series, 6);
        assert!(points.iter().all(|p| p.predicted_visits == 10));
    }

    #[test]
    fn test_duplicate_labels_last_write_wins() {
        let mut series = series_from(ym("2023-01"), &[1; 12]);
        series.insert(1, MonthlyCount::new(ym("2023-02"), 99));
        // The later 2023-02 entry (count 1) wins over the inserted 99.
        let points = seasonal_naive_forecast(&series, 2);
        assert_eq!(points[1].month.to_string(), "2024-02");
        assert_eq!(points[1].method, ForecastMethod::SeasonalNaive);
        assert_eq!(points[1].predicted_visits, 1);

        let mut series = series_from(ym("2023-01"), &[1; 12]);
        series.push(MonthlyCount::new(ym("2023-02"), 99));
        let points = seasonal_naive_forecast(&series, 1);
        // Last entry is 2023-02, next month 2023-03; prior year 2022-03 is absent.
        assert_eq!(points[0].method, ForecastMethod::AvgLast3Fallback);
    }

    #[test]
    fn test_method_tags() {
        assert_eq!(
            serde_json::to_string(&ForecastMethod::AvgLast3Fallback).unwrap(),
            "\"avg_last3_fallback\""
        );
        assert_eq!(ForecastMethod::SeasonalNaive.to_string(), "seasonal_naive");
        assert_eq!(ForecastMethod::AvgLast3.as_str(), "avg_last3");
    }
}
