//! Service wiring shared by the `gps` and `gps-admin` binaries.

pub mod api;
pub mod state;

use sha2::{Digest, Sha256};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gps_core::SanitizedConfig;

pub use api::create_router;
pub use state::AppState;

/// Set to `json` for structured log lines.
pub const LOG_FORMAT_VAR: &str = "GPS_LOG_FORMAT";

/// Initialize logging from `RUST_LOG` (default `info`).
pub fn init_logging() {
    let json = std::env::var(LOG_FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Short SHA-256 fingerprint of the sanitized configuration.
pub fn config_fingerprint(config: &SanitizedConfig) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}
