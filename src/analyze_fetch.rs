use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalyzeError;
use crate::http_client::http_client;
use crate::metrics::Metric;
use crate::state::{AnalysisPayload, AnalyzeRequest, Forecast, ForecastMap, MatchRecord};

const ANALYZE_PATH: &str = "/api/analyze-matches";

#[derive(Debug, Serialize)]
struct AnalyzeBody<'a> {
    name: &'a str,
    tag: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    matches: Option<Vec<Value>>,
    #[serde(default)]
    predictions: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ForecastDto {
    #[serde(default)]
    predictions: Vec<f64>,
    #[serde(default)]
    confidence_lower: Vec<f64>,
    #[serde(default)]
    confidence_upper: Vec<f64>,
}

pub fn fetch_analysis(
    base_url: &str,
    timeout_secs: u64,
    request: &AnalyzeRequest,
) -> Result<AnalysisPayload, AnalyzeError> {
    let client =
        http_client(timeout_secs).map_err(|err| AnalyzeError::Transport(format!("{err:#}")))?;
    let url = format!("{}{ANALYZE_PATH}", base_url.trim_end_matches('/'));
    tracing::info!(%url, name = %request.name, tag = %request.tag, "posting analyze request");

    let resp = client
        .post(&url)
        .json(&AnalyzeBody {
            name: &request.name,
            tag: &request.tag,
        })
        .send()
        .map_err(|err| AnalyzeError::Transport(err.to_string()))?;
    let status = resp.status();
    let body = resp
        .text()
        .map_err(|err| AnalyzeError::Transport(err.to_string()))?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "backend rejected analyze request");
        return Err(AnalyzeError::Backend {
            status: status.as_u16(),
            message: parse_error_body(&body),
        });
    }

    parse_analyze_response_json(&body).map_err(|err| AnalyzeError::Malformed(format!("{err:#}")))
}

pub fn parse_analyze_response_json(raw: &str) -> Result<AnalysisPayload> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(AnalysisPayload::default());
    }

    let resp: AnalyzeResponse =
        serde_json::from_str(trimmed).context("invalid analyze-matches json")?;

    let mut matches = Vec::new();
    for (idx, item) in resp.matches.unwrap_or_default().iter().enumerate() {
        matches.push(parse_match_record(item).with_context(|| format!("match #{idx}"))?);
    }

    let predictions = parse_forecasts(resp.predictions.as_ref());

    Ok(AnalysisPayload {
        matches,
        predictions,
    })
}

/// Forecast entries are optional: a bad or unknown entry is skipped, never fatal.
fn parse_forecasts(raw: Option<&Value>) -> ForecastMap {
    let mut predictions = ForecastMap::new();
    let Some(entries) = raw.and_then(Value::as_object) else {
        if raw.is_some_and(|v| !v.is_null()) {
            tracing::warn!("predictions is not an object, ignoring forecasts");
        }
        return predictions;
    };

    for (key, entry) in entries {
        let Some(metric) = Metric::from_key(key) else {
            tracing::debug!(key = %key, "ignoring forecast for unknown metric");
            continue;
        };
        let dto = match serde_json::from_value::<ForecastDto>(entry.clone()) {
            Ok(dto) => dto,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "skipping malformed forecast");
                continue;
            }
        };
        predictions.insert(
            metric,
            Forecast {
                predictions: dto.predictions,
                confidence_lower: dto.confidence_lower,
                confidence_upper: dto.confidence_upper,
            },
        );
    }
    predictions
}

/// Structured `{"error": "..."}` message from a failed response, if any.
pub fn parse_error_body(raw: &str) -> Option<String> {
    let root: Value = serde_json::from_str(raw.trim()).ok()?;
    let msg = root.get("error")?.as_str()?.trim();
    if msg.is_empty() {
        None
    } else {
        Some(msg.to_string())
    }
}

fn parse_match_record(item: &Value) -> Result<MatchRecord> {
    let Some(obj) = item.as_object() else {
        bail!("expected an object");
    };
    let game_creation = obj.get("game_creation").and_then(parse_game_creation);
    let metrics = Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            obj.get(metric.key())
                .and_then(Value::as_f64)
                .map(|v| (metric, v))
        })
        .collect();
    Ok(MatchRecord {
        game_creation,
        metrics,
    })
}

/// Epoch milliseconds (number or numeric string), RFC 3339, or a naive UTC date/time.
pub fn parse_game_creation(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(ms)
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    #[test]
    fn game_creation_accepts_epoch_millis() {
        let dt = parse_game_creation(&json!(1_700_000_000_000i64)).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
        let from_str = parse_game_creation(&json!("1700000000000")).unwrap();
        assert_eq!(from_str, dt);
    }

    #[test]
    fn game_creation_accepts_iso_forms() {
        let rfc = parse_game_creation(&json!("2024-03-05T10:20:30Z")).unwrap();
        assert_eq!((rfc.year(), rfc.month(), rfc.day()), (2024, 3, 5));
        assert_eq!(rfc.hour(), 10);

        let offset = parse_game_creation(&json!("2024-03-05T01:00:00+09:00")).unwrap();
        assert_eq!((offset.day(), offset.hour()), (4, 16));

        let naive = parse_game_creation(&json!("2024-03-05 10:20")).unwrap();
        assert_eq!(naive.minute(), 20);

        let date_only = parse_game_creation(&json!("2024-03-05")).unwrap();
        assert_eq!(date_only.hour(), 0);
    }

    #[test]
    fn game_creation_rejects_garbage() {
        assert!(parse_game_creation(&json!("yesterday")).is_none());
        assert!(parse_game_creation(&json!(null)).is_none());
        assert!(parse_game_creation(&json!(true)).is_none());
    }

    #[test]
    fn non_numeric_metric_is_absent() {
        let record = parse_match_record(&json!({
            "game_creation": 0,
            "KDA": "3.2",
            "kills": null,
            "deaths": 4
        }))
        .unwrap();
        assert_eq!(record.value(Metric::Kda), None);
        assert_eq!(record.value(Metric::Kills), None);
        assert_eq!(record.value(Metric::Deaths), Some(4.0));
    }

    #[test]
    fn error_body_requires_string_message() {
        assert_eq!(
            parse_error_body(r#"{"error":"Summoner not found"}"#).as_deref(),
            Some("Summoner not found")
        );
        assert!(parse_error_body(r#"{"error":""}"#).is_none());
        assert!(parse_error_body(r#"{"detail":"x"}"#).is_none());
        assert!(parse_error_body("<html>502</html>").is_none());
    }
}
