use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;
use lol_match_analyzer::metrics::Metric;
use lol_match_analyzer::series::{ChartPoint, assemble};
use lol_match_analyzer::state::{Forecast, ForecastMap, MatchRecord};
use proptest::prelude::*;

fn arb_metric() -> impl Strategy<Value = Metric> {
    (0..Metric::ALL.len()).prop_map(|i| Metric::ALL[i])
}

fn arb_record() -> impl Strategy<Value = MatchRecord> {
    (
        0i64..4_000_000_000_000,
        proptest::collection::btree_map(arb_metric(), 0.0f64..50_000.0, 0..Metric::ALL.len()),
    )
        .prop_map(|(ms, metrics)| MatchRecord {
            game_creation: DateTime::from_timestamp_millis(ms),
            metrics,
        })
}

fn arb_forecast() -> impl Strategy<Value = Forecast> {
    (
        proptest::collection::vec(-10.0f64..10.0, 0..8),
        proptest::collection::vec(-10.0f64..10.0, 0..8),
        proptest::collection::vec(-10.0f64..10.0, 0..8),
    )
        .prop_map(|(predictions, confidence_lower, confidence_upper)| Forecast {
            predictions,
            confidence_lower,
            confidence_upper,
        })
}

fn arb_forecasts() -> impl Strategy<Value = ForecastMap> {
    proptest::collection::btree_map(arb_metric(), arb_forecast(), 0..4)
}

proptest! {
    #[test]
    fn indices_are_contiguous_from_zero(
        matches in proptest::collection::vec(arb_record(), 0..30),
        predictions in arb_forecasts(),
        metric in arb_metric(),
    ) {
        let series = assemble(&matches, &predictions, metric);
        for (pos, point) in series.points.iter().enumerate() {
            prop_assert_eq!(point.index(), pos);
        }

        let m = matches.len();
        prop_assert_eq!(series.historical_len(), m);
        let expected_forecast = predictions.get(&metric).map(Forecast::len).unwrap_or(0);
        prop_assert_eq!(series.forecast_len(), expected_forecast);

        // History first, then forecast; never interleaved.
        let first_forecast = series.points.iter().position(ChartPoint::is_forecast);
        if let Some(first) = first_forecast {
            prop_assert_eq!(first, m);
            prop_assert!(series.points[first..].iter().all(ChartPoint::is_forecast));
        }
    }

    #[test]
    fn history_is_chronological(
        mut matches in proptest::collection::vec(arb_record(), 1..30),
        metric in arb_metric(),
    ) {
        // Newest first, as the backend delivers.
        matches.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
        let series = assemble(&matches, &ForecastMap::new(), metric);
        let values: Vec<Option<f64>> = series
            .points
            .iter()
            .map(|p| match p {
                ChartPoint::Historical { value, .. } => *value,
                ChartPoint::Forecast { .. } => None,
            })
            .collect();
        let expected: Vec<Option<f64>> = matches.iter().rev().map(|m| m.value(metric)).collect();
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn fields_never_mix_and_metrics_never_share_names(
        matches in proptest::collection::vec(arb_record(), 0..20),
        predictions in arb_forecasts(),
        a in arb_metric(),
        b in arb_metric(),
    ) {
        let key_a = a.key();
        for point in &assemble(&matches, &predictions, a).points {
            let names: Vec<String> = point.fields(a).into_iter().map(|(n, _)| n).collect();
            let raw = names.iter().any(|n| n == key_a);
            let forecast = names.iter().any(|n| n.starts_with(&format!("{key_a}_")));
            prop_assert!(!(raw && forecast));
        }

        prop_assume!(a != b);
        let names_for = |metric: Metric| -> BTreeSet<String> {
            assemble(&matches, &predictions, metric)
                .points
                .iter()
                .flat_map(|p| p.fields(metric))
                .map(|(n, _)| n)
                .collect()
        };
        prop_assert!(names_for(a).is_disjoint(&names_for(b)));
    }
}

#[test]
fn strategies_cover_missing_metrics() {
    let record = MatchRecord {
        game_creation: None,
        metrics: BTreeMap::new(),
    };
    let series = assemble(&[record], &ForecastMap::new(), Metric::Kda);
    assert!(series.points[0].fields(Metric::Kda).is_empty());
}
