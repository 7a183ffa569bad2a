use std::path::PathBuf;
use std::time::Duration;

/// Upstream credentials. Only constructed when all three values are present.
#[derive(Clone)]
pub struct Credentials {
    pub tfl_app_id: String,
    pub tfl_app_key: String,
    pub openweather_key: String,
}

impl Credentials {
    /// Returns `None` unless every value is set and non-empty.
    pub fn from_parts(
        tfl_app_id: Option<&str>,
        tfl_app_key: Option<&str>,
        openweather_key: Option<&str>,
    ) -> Option<Self> {
        let present = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_string);
        Some(Self {
            tfl_app_id: present(tfl_app_id)?,
            tfl_app_key: present(tfl_app_key)?,
            openweather_key: present(openweather_key)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tfl_app_id", &"[REDACTED]")
            .field("tfl_app_key", &"[REDACTED]")
            .field("openweather_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tfl_app_id: Option<String>,
    pub tfl_app_key: Option<String>,
    pub openweather_key: Option<String>,
    pub openweather_base: String,
    pub tfl_base: String,
    pub http_timeout_secs: u64,
    pub transition_ms: u64,
    pub node_tick_ms: u64,
    pub intel_refresh_ms: u64,
    pub payment_clear_ms: u64,
    pub ratify_ms: u64,
    pub receipt_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub sim_seed: Option<u64>,
    pub run_secs: Option<u64>,
    pub demo_bid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tfl_app_id: None,
            tfl_app_key: None,
            openweather_key: None,
            openweather_base: "https://api.openweathermap.org".to_string(),
            tfl_base: "https://api.tfl.gov.uk".to_string(),
            http_timeout_secs: 10,
            transition_ms: 2500,
            node_tick_ms: 2000,
            intel_refresh_ms: 60_000,
            payment_clear_ms: 1500,
            ratify_ms: 2000,
            receipt_dir: PathBuf::from("./receipts"),
            ledger_path: PathBuf::from("./bidsmith.sqlite"),
            sim_seed: None,
            run_secs: None,
            demo_bid: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            tfl_app_id: std::env::var("TFL_APP_ID").ok(),
            tfl_app_key: std::env::var("TFL_APP_KEY").ok(),
            openweather_key: std::env::var("OPENWEATHER_API_KEY").ok(),
            openweather_base: std::env::var("OPENWEATHER_BASE").unwrap_or(d.openweather_base),
            tfl_base: std::env::var("TFL_BASE").unwrap_or(d.tfl_base),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.http_timeout_secs),
            transition_ms: std::env::var("TRANSITION_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.transition_ms),
            node_tick_ms: std::env::var("NODE_TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.node_tick_ms),
            intel_refresh_ms: std::env::var("INTEL_REFRESH_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.intel_refresh_ms),
            payment_clear_ms: std::env::var("PAYMENT_CLEAR_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.payment_clear_ms),
            ratify_ms: std::env::var("RATIFY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.ratify_ms),
            receipt_dir: std::env::var("RECEIPT_DIR").map(PathBuf::from).unwrap_or(d.receipt_dir),
            ledger_path: std::env::var("LEDGER_PATH").map(PathBuf::from).unwrap_or(d.ledger_path),
            sim_seed: std::env::var("SIM_SEED").ok().and_then(|v| v.parse().ok()),
            run_secs: std::env::var("RUN_SECS").ok().and_then(|v| v.parse().ok()),
            demo_bid: std::env::var("DEMO_BID").map(|v| v == "1").unwrap_or(false),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(
            self.tfl_app_id.as_deref(),
            self.tfl_app_key.as_deref(),
            self.openweather_key.as_deref(),
        )
    }

    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn node_tick(&self) -> Duration {
        Duration::from_millis(self.node_tick_ms.max(1))
    }

    pub fn intel_refresh(&self) -> Duration {
        Duration::from_millis(self.intel_refresh_ms.max(1))
    }

    pub fn payment_clear_delay(&self) -> Duration {
        Duration::from_millis(self.payment_clear_ms)
    }

    pub fn ratify_delay(&self) -> Duration {
        Duration::from_millis(self.ratify_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_timings() {
        let cfg = Config::default();
        assert_eq!(cfg.transition_delay(), Duration::from_millis(2500));
        assert_eq!(cfg.node_tick(), Duration::from_millis(2000));
        assert_eq!(cfg.intel_refresh(), Duration::from_secs(60));
        assert_eq!(cfg.payment_clear_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.ratify_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_credentials_require_all_three() {
        assert!(Credentials::from_parts(Some("id"), Some("key"), Some("ow")).is_some());
        assert!(Credentials::from_parts(None, Some("key"), Some("ow")).is_none());
        assert!(Credentials::from_parts(Some("id"), None, Some("ow")).is_none());
        assert!(Credentials::from_parts(Some("id"), Some("key"), None).is_none());
    }

    #[test]
    fn test_empty_credential_counts_as_missing() {
        assert!(Credentials::from_parts(Some("id"), Some(""), Some("ow")).is_none());
        assert!(Credentials::from_parts(Some("  "), Some("key"), Some("ow")).is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::from_parts(Some("id-123"), Some("secret"), Some("ow-key")).unwrap();
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret"));
        assert!(!shown.contains("ow-key"));
    }
}
