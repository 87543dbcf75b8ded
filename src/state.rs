use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::error::AnalyzeError;
use crate::metrics::Metric;
use crate::series::{self, ChartSeries};

const MAX_LOG_LINES: usize = 200;

/// One completed game for the analyzed player. Missing metrics are absent, never zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchRecord {
    pub game_creation: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<Metric, f64>,
}

impl MatchRecord {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Predicted values for one metric with their confidence band.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forecast {
    pub predictions: Vec<f64>,
    pub confidence_lower: Vec<f64>,
    pub confidence_upper: Vec<f64>,
}

impl Forecast {
    /// Usable steps: the shortest of the three arrays.
    pub fn len(&self) -> usize {
        self.predictions
            .len()
            .min(self.confidence_lower.len())
            .min(self.confidence_upper.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_consistent(&self) -> bool {
        self.predictions.len() == self.confidence_lower.len()
            && self.predictions.len() == self.confidence_upper.len()
    }
}

pub type ForecastMap = BTreeMap<Metric, Forecast>;

/// Normalized backend response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisPayload {
    /// Newest first, as delivered.
    pub matches: Vec<MatchRecord>,
    pub predictions: ForecastMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub id: u64,
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFocus {
    #[default]
    Name,
    Tag,
}

#[derive(Debug, Clone)]
pub enum Delta {
    AnalysisFinished {
        request_id: u64,
        result: Result<AnalysisPayload, AnalyzeError>,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Analyze(AnalyzeRequest),
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    pub player_name: String,
    pub player_tag: String,
    pub focus: InputFocus,
    pub matches: Vec<MatchRecord>,
    pub predictions: ForecastMap,
    pub selected_metric: Metric,
    pub status: AnalysisStatus,
    pub error_message: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    last_request_id: u64,
}

impl AnalysisState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.status == AnalysisStatus::Loading
    }

    pub fn has_results(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Validates the identity inputs and enters `Loading`. The previous result set stays
    /// in place until the request lands.
    pub fn begin_analysis(&mut self) -> Result<AnalyzeRequest, AnalyzeError> {
        let name = self.player_name.trim();
        let tag = self.player_tag.trim().trim_start_matches('#');
        if name.is_empty() || tag.is_empty() {
            return Err(AnalyzeError::Input(
                "Enter both a summoner name and a player tag".to_string(),
            ));
        }
        let request = AnalyzeRequest {
            id: self.last_request_id + 1,
            name: name.to_string(),
            tag: tag.to_string(),
        };
        self.last_request_id = request.id;
        self.status = AnalysisStatus::Loading;
        self.error_message = None;
        self.push_log(format!(
            "[INFO] Analyzing matches for {}#{}",
            request.name, request.tag
        ));
        Ok(request)
    }

    /// Terminal transition for a request. Responses to anything but the latest issued
    /// request are dropped.
    pub fn finish_analysis(
        &mut self,
        request_id: u64,
        result: Result<AnalysisPayload, AnalyzeError>,
    ) {
        if request_id != self.last_request_id {
            tracing::debug!(request_id, latest = self.last_request_id, "stale analysis dropped");
            self.push_log(format!("[INFO] Ignored stale response #{request_id}"));
            return;
        }

        let result = result.and_then(|payload| {
            if payload.matches.is_empty() {
                Err(AnalyzeError::EmptyResult)
            } else {
                Ok(payload)
            }
        });

        match result {
            Ok(payload) => {
                let count = payload.matches.len();
                self.matches = payload.matches;
                self.predictions = payload.predictions;
                self.status = AnalysisStatus::Success;
                self.error_message = None;
                self.push_log(format!("[INFO] Found {count} matches"));
                self.warn_inconsistent_forecasts();
            }
            Err(err) => {
                tracing::warn!(error = %err, "analysis failed");
                let message = err.user_message();
                self.matches.clear();
                self.predictions.clear();
                self.status = AnalysisStatus::Error;
                self.push_log(format!("[WARN] {message}"));
                self.error_message = Some(message);
            }
        }
    }

    /// Back to the initial state; inputs are kept.
    pub fn clear_results(&mut self) {
        self.matches.clear();
        self.predictions.clear();
        self.error_message = None;
        self.status = AnalysisStatus::Idle;
    }

    pub fn select_metric(&mut self, metric: Metric) {
        self.selected_metric = metric;
    }

    pub fn select_next_metric(&mut self) {
        self.selected_metric = self.selected_metric.next();
    }

    pub fn select_prev_metric(&mut self) {
        self.selected_metric = self.selected_metric.prev();
    }

    pub fn chart(&self) -> ChartSeries {
        series::assemble(&self.matches, &self.predictions, self.selected_metric)
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            InputFocus::Name => InputFocus::Tag,
            InputFocus::Tag => InputFocus::Name,
        };
    }

    pub fn focused_input_mut(&mut self) -> &mut String {
        match self.focus {
            InputFocus::Name => &mut self.player_name,
            InputFocus::Tag => &mut self.player_tag,
        }
    }

    /// Splits `name#tag` into the two inputs.
    pub fn prefill_player(&mut self, raw: &str) {
        let (name, tag) = raw.split_once('#').unwrap_or((raw, ""));
        self.player_name = name.trim().to_string();
        self.player_tag = tag.trim().to_string();
        if !self.player_name.is_empty() {
            self.focus = InputFocus::Tag;
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }

    fn warn_inconsistent_forecasts(&mut self) {
        let mismatched: Vec<(Metric, usize)> = self
            .predictions
            .iter()
            .filter(|(_, forecast)| !forecast.is_consistent())
            .map(|(metric, forecast)| (*metric, forecast.len()))
            .collect();
        for (metric, usable) in mismatched {
            tracing::warn!(metric = metric.key(), usable, "forecast arrays differ in length");
            self.push_log(format!(
                "[WARN] Forecast for {} truncated to {usable} points",
                metric.key()
            ));
        }
    }
}

pub fn apply_delta(state: &mut AnalysisState, delta: Delta) {
    match delta {
        Delta::AnalysisFinished { request_id, result } => {
            state.finish_analysis(request_id, result)
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn status_label(status: AnalysisStatus) -> &'static str {
    match status {
        AnalysisStatus::Idle => "IDLE",
        AnalysisStatus::Loading => "LOADING",
        AnalysisStatus::Success => "READY",
        AnalysisStatus::Error => "ERROR",
    }
}
