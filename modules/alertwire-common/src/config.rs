use std::env;
use std::time::Duration;

/// Bounding box for area-scoped feed queries (fire detections).
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Immutable application configuration, constructed once at startup and
/// passed into the scheduler, adapters and classifier. Optional credentials
/// stay `None`; the owning adapter self-disables instead of failing.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Feed credentials (optional — absence disables the adapter)
    pub firms_api_key: Option<String>,
    pub wmata_api_key: Option<String>,

    // LLM tiers (optional — absence disables the tier)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,

    // Cadence
    pub refresh_interval: Duration,
    pub classify_poll_interval: Duration,
    pub classify_batch_limit: i64,
    pub shutdown_grace: Duration,

    // Area of interest
    pub center_lat: f64,
    pub center_lon: f64,
    pub bbox: BoundingBox,
    pub radius_km: u32,

    // River gauge sites to poll
    pub nwis_sites: Vec<String>,

    /// Widen feed queries for end-to-end testing against live data.
    pub test_mode: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            firms_api_key: optional_env("FIRMS_API_KEY"),
            wmata_api_key: optional_env("WMATA_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ollama_base_url: optional_env("OLLAMA_BASE_URL"),
            ollama_model: env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| "llama3.2:3b-instruct-q4".to_string()),
            refresh_interval: Duration::from_secs(parsed_env("REFRESH_INTERVAL_SECONDS", 300)),
            classify_poll_interval: Duration::from_secs(parsed_env("CLASSIFY_POLL_SECONDS", 30)),
            classify_batch_limit: parsed_env("CLASSIFY_BATCH_LIMIT", 10),
            shutdown_grace: Duration::from_secs(parsed_env("SHUTDOWN_GRACE_SECONDS", 10)),
            center_lat: parsed_env("CENTER_LAT", 38.8048),
            center_lon: parsed_env("CENTER_LON", -77.0469),
            bbox: BoundingBox {
                min_lon: parsed_env("BBOX_MIN_LON", -77.15),
                min_lat: parsed_env("BBOX_MIN_LAT", 38.75),
                max_lon: parsed_env("BBOX_MAX_LON", -77.00),
                max_lat: parsed_env("BBOX_MAX_LAT", 38.87),
            },
            radius_km: parsed_env("RADIUS_KM", 10),
            nwis_sites: list_env("NWIS_SITES", &["01652500", "01646500"]),
            test_mode: env::var("TEST_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Log the effective configuration without leaking credentials.
    pub fn log_redacted(&self) {
        tracing::info!(
            firms = self.firms_api_key.is_some(),
            wmata = self.wmata_api_key.is_some(),
            openai = self.openai_api_key.is_some(),
            ollama = self.ollama_base_url.is_some(),
            refresh_secs = self.refresh_interval.as_secs(),
            classify_poll_secs = self.classify_poll_interval.as_secs(),
            batch_limit = self.classify_batch_limit,
            test_mode = self.test_mode,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

/// Empty strings count as unset so a blank line in an env file does not
/// enable an adapter with a useless credential.
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number, got {v:?}")),
        Err(_) => default,
    }
}

fn list_env(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}
