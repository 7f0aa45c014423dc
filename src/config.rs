use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client settings. Values come from `ORION_*` environment variables and
/// can be overridden on the command line.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// `limit` sent to the priority-case endpoints.
    pub priority_limit: usize,
    /// Interval of the synthetic upload progress indicator.
    pub progress_tick: Duration,
    pub success_banner_ttl: Duration,
    pub error_banner_ttl: Duration,
    pub upload_error_banner_ttl: Duration,
    pub log_json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            priority_limit: 20,
            progress_tick: Duration::from_millis(200),
            success_banner_ttl: Duration::from_secs(3),
            error_banner_ttl: Duration::from_secs(5),
            upload_error_banner_ttl: Duration::from_secs(8),
            log_json: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("ORION_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            priority_limit: env_parse("ORION_PRIORITY_LIMIT").unwrap_or(defaults.priority_limit),
            progress_tick: env_parse("ORION_PROGRESS_TICK_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.progress_tick),
            log_json: env_bool("ORION_LOG_JSON", defaults.log_json),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_page_behaviour() {
        let c = ClientConfig::default();
        assert_eq!(c.priority_limit, 20);
        assert_eq!(c.success_banner_ttl, Duration::from_secs(3));
        assert_eq!(c.error_banner_ttl, Duration::from_secs(5));
        assert_eq!(c.upload_error_banner_ttl, Duration::from_secs(8));
    }

    #[test]
    fn unknown_bool_falls_back_to_default() {
        assert!(env_bool("ORION_TEST_UNSET_FLAG_FOR_CONFIG", true));
    }
}
