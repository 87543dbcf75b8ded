pub mod analyze_fetch;
pub mod config;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod provider;
pub mod series;
pub mod state;
