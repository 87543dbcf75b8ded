//! Builds the unified historical + forecast sequence for one metric.
//!
//! Historical matches arrive newest-first and are emitted oldest-first; forecast steps follow
//! with indices continuing from the last historical point. The output is a pure function of
//! its three inputs and is recomputed on every call.

use chrono::{DateTime, Local, Utc};
use serde_json::{Map, Value};

use crate::metrics::Metric;
use crate::state::{ForecastMap, MatchRecord};

pub const INVALID_DATE_LABEL: &str = "Invalid Date";

#[derive(Debug, Clone, PartialEq)]
pub enum ChartPoint {
    Historical {
        index: usize,
        label: String,
        value: Option<f64>,
    },
    Forecast {
        index: usize,
        label: String,
        predicted: f64,
        lower: f64,
        upper: f64,
    },
}

impl ChartPoint {
    pub fn index(&self) -> usize {
        match self {
            ChartPoint::Historical { index, .. } | ChartPoint::Forecast { index, .. } => *index,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ChartPoint::Historical { label, .. } | ChartPoint::Forecast { label, .. } => label,
        }
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self, ChartPoint::Forecast { .. })
    }

    /// Named numeric fields in the row shape chart front-ends expect: `<metric>` on
    /// historical points, `<metric>_predicted`/`_lower`/`_upper` on forecast points.
    pub fn fields(&self, metric: Metric) -> Vec<(String, f64)> {
        let key = metric.key();
        match self {
            ChartPoint::Historical { value, .. } => value
                .map(|v| vec![(key.to_string(), v)])
                .unwrap_or_default(),
            ChartPoint::Forecast {
                predicted,
                lower,
                upper,
                ..
            } => vec![
                (format!("{key}_predicted"), *predicted),
                (format!("{key}_lower"), *lower),
                (format!("{key}_upper"), *upper),
            ],
        }
    }

    pub fn to_row(&self, metric: Metric) -> Value {
        let mut row = Map::new();
        row.insert("gameIndex".to_string(), Value::from(self.index()));
        row.insert("gameCreation".to_string(), Value::from(self.label()));
        for (name, value) in self.fields(metric) {
            row.insert(name, Value::from(value));
        }
        Value::Object(row)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub metric: Metric,
    pub points: Vec<ChartPoint>,
    /// Whether the forecast map had an entry for `metric`.
    pub has_forecast: bool,
}

impl ChartSeries {
    pub fn historical_len(&self) -> usize {
        self.points.iter().filter(|p| !p.is_forecast()).count()
    }

    pub fn forecast_len(&self) -> usize {
        self.points.iter().filter(|p| p.is_forecast()).count()
    }

    pub fn actual_xy(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| match p {
                ChartPoint::Historical {
                    index,
                    value: Some(v),
                    ..
                } => Some((*index as f64, *v)),
                _ => None,
            })
            .collect()
    }

    pub fn predicted_xy(&self) -> Vec<(f64, f64)> {
        self.forecast_xy(|predicted, _, _| predicted)
    }

    pub fn lower_xy(&self) -> Vec<(f64, f64)> {
        self.forecast_xy(|_, lower, _| lower)
    }

    pub fn upper_xy(&self) -> Vec<(f64, f64)> {
        self.forecast_xy(|_, _, upper| upper)
    }

    /// Min/max over every drawn value, padded by 5% of the span.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.actual_xy().into_iter().map(|(_, y)| y).collect::<Vec<_>>();
        for p in &self.points {
            if let ChartPoint::Forecast {
                predicted,
                lower,
                upper,
                ..
            } = p
            {
                values.extend([*predicted, *lower, *upper]);
            }
        }
        let finite = values.into_iter().filter(|v| v.is_finite());
        let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })?;
        let span = max - min;
        let pad = if span > 0.0 { span * 0.05 } else { min.abs().max(1.0) * 0.1 };
        Some((min - pad, max + pad))
    }

    fn forecast_xy(&self, pick: impl Fn(f64, f64, f64) -> f64) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| match p {
                ChartPoint::Forecast {
                    index,
                    predicted,
                    lower,
                    upper,
                    ..
                } => Some((*index as f64, pick(*predicted, *lower, *upper))),
                _ => None,
            })
            .collect()
    }
}

pub fn assemble(
    matches: &[MatchRecord],
    predictions: &ForecastMap,
    metric: Metric,
) -> ChartSeries {
    let mut points: Vec<ChartPoint> = matches
        .iter()
        .rev()
        .enumerate()
        .map(|(index, record)| ChartPoint::Historical {
            index,
            label: format_match_date(record.game_creation),
            value: record.value(metric),
        })
        .collect();

    let forecast = predictions.get(&metric);
    if let Some(forecast) = forecast {
        // Indices continue from the last historical point, or start at 0 with no history.
        let start = points.len();
        let steps = forecast.len();
        points.extend((0..steps).map(|k| ChartPoint::Forecast {
            index: start + k,
            label: format!("Prediction {}", k + 1),
            predicted: forecast.predictions[k],
            lower: forecast.confidence_lower[k],
            upper: forecast.confidence_upper[k],
        }));
    }

    ChartSeries {
        metric,
        points,
        has_forecast: forecast.is_some(),
    }
}

/// Calendar date in the local timezone.
pub fn format_match_date(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.with_timezone(&Local).format("%-m/%-d/%Y").to_string(),
        None => INVALID_DATE_LABEL.to_string(),
    }
}
