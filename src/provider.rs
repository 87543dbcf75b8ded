use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;

use crate::analyze_fetch;
use crate::config::{AnalyzerConfig, Source};
use crate::metrics::Metric;
use crate::state::{
    AnalysisPayload, AnalyzeRequest, Delta, Forecast, ForecastMap, MatchRecord, ProviderCommand,
};

const DEMO_MATCHES: usize = 20;
const DEMO_FORECAST_STEPS: usize = 5;

/// Services analyze commands one at a time, in arrival order, until the command channel
/// closes.
pub fn spawn_provider(
    config: AnalyzerConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Analyze(request) => {
                    let result = match config.source {
                        Source::Backend => analyze_fetch::fetch_analysis(
                            &config.api_url,
                            config.timeout_secs,
                            &request,
                        ),
                        Source::Demo => {
                            let _ = tx.send(Delta::Log(
                                "[INFO] Demo source: synthesizing matches".to_string(),
                            ));
                            Ok(demo_payload(&request, &mut rng))
                        }
                    };
                    if let Ok(payload) = &result {
                        tracing::info!(
                            request_id = request.id,
                            matches = payload.matches.len(),
                            forecasts = payload.predictions.len(),
                            "analysis received"
                        );
                    }
                    let finished = Delta::AnalysisFinished {
                        request_id: request.id,
                        result,
                    };
                    if tx.send(finished).is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("provider channel closed");
    })
}

/// Synthetic newest-first history with a short forecast per metric.
pub fn demo_payload(request: &AnalyzeRequest, rng: &mut impl Rng) -> AnalysisPayload {
    let skill = 0.8 + (request.name.len() % 5) as f64 * 0.1;
    let now = Utc::now();

    let matches: Vec<MatchRecord> = (0..DEMO_MATCHES)
        .map(|i| {
            let kills = (rng.gen_range(1.0..12.0) * skill).round();
            let deaths = rng.gen_range(1.0..9.0_f64).round();
            let assists = rng.gen_range(2.0..15.0_f64).round();
            let minutes = rng.gen_range(22.0..38.0_f64);
            let damage = rng.gen_range(9_000.0..32_000.0) * skill;
            let gold = rng.gen_range(7_000.0..16_000.0) * skill;
            let cs = rng.gen_range(120.0..280.0_f64).round();
            let metrics = [
                (Metric::Kda, ((kills + assists) / deaths.max(1.0) * 100.0).round() / 100.0),
                (Metric::Kills, kills),
                (Metric::Deaths, deaths),
                (Metric::Assists, assists),
                (Metric::DamageDealt, damage.round()),
                (Metric::DamageTaken, rng.gen_range(10_000.0..30_000.0_f64).round()),
                (Metric::GoldEarned, gold.round()),
                (Metric::CreepScore, cs),
                (Metric::DamagePerMinute, (damage / minutes).round()),
                (Metric::GoldPerMinute, (gold / minutes).round()),
            ]
            .into_iter()
            .collect();
            MatchRecord {
                game_creation: Some(now - ChronoDuration::days(i as i64)),
                metrics,
            }
        })
        .collect();

    let mut predictions = ForecastMap::new();
    for metric in Metric::ALL {
        let values: Vec<f64> = matches.iter().filter_map(|m| m.value(metric)).collect();
        if values.is_empty() {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let sd = var.sqrt();
        let drift = rng.gen_range(-0.02..0.02) * mean;

        let mut forecast = Forecast::default();
        for step in 1..=DEMO_FORECAST_STEPS {
            let predicted = mean + drift * step as f64;
            let band = sd * (1.0 + 0.15 * step as f64);
            forecast.predictions.push(predicted);
            forecast.confidence_lower.push(predicted - band);
            forecast.confidence_upper.push(predicted + band);
        }
        predictions.insert(metric, forecast);
    }

    AnalysisPayload {
        matches,
        predictions,
    }
}
