use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Backend,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub source: Source,
    pub log_file: Option<PathBuf>,
    pub player: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            source: Source::Backend,
            log_file: None,
            player: None,
        }
    }
}

impl AnalyzerConfig {
    /// Reads `.env.local` then `.env` (existing variables win), then the environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key).and_then(|val| {
                let val = val.trim().to_string();
                if val.is_empty() { None } else { Some(val) }
            })
        };

        let api_url = get("ANALYZER_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout_secs = get("ANALYZER_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        let source = match get("ANALYZER_SOURCE").map(|s| s.to_lowercase()).as_deref() {
            Some("demo") => Source::Demo,
            _ => Source::Backend,
        };

        Self {
            api_url,
            timeout_secs,
            source,
            log_file: get("ANALYZER_LOG").map(PathBuf::from),
            player: get("ANALYZER_PLAYER"),
        }
    }
}
