//! Environment-backed configuration.
//!
//! Everything tunable reads from env vars with the defaults below; the
//! parsed struct is cached for the process lifetime. Invalid numeric
//! values fall back to the default with a warning rather than aborting a
//! long-running worker.

use std::sync::OnceLock;

fn env_str(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }
        Err(_) => None,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_str(key) {
        Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env_str(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default, "invalid integer, using default");
            default
        }),
        None => default,
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    match env_str(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default, "invalid float, using default");
            default
        }),
        None => default,
    }
}

/// Full pipeline configuration, loaded once from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub batch_size: i64,

    // DNS / HTTP / TCP probing
    pub dns_timeout_secs: u64,
    pub dns_check_www: bool,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub tcp_probe_enabled: bool,
    pub tcp_probe_timeout_secs: u64,
    pub tcp_probe_ports: Vec<u16>,

    // Mutation API auth
    pub mutation_api_key: Option<String>,
    pub mutation_localhost_bypass: bool,

    // Automation
    pub auto_runner_enabled: bool,
    pub auto_runner_interval_seconds: u64,
    pub auto_daily_target_enabled: bool,
    pub daily_target_count: i64,
    pub daily_target_min_score: f64,
    pub daily_target_platform_prefix: String,
    pub daily_target_require_contact: bool,
    pub daily_target_require_domain_qualification: bool,
    pub daily_target_require_unhosted_domain: bool,
    pub daily_target_allow_recycle: bool,

    // RDAP / Overpass / SearXNG
    pub rdap_base_url: String,
    pub overpass_endpoint: String,
    pub overpass_timeout_secs: u64,
    pub searxng_url: String,

    // Export
    pub export_dir: String,

    // Third-party API keys
    pub google_places_api_key: Option<String>,
    pub foursquare_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub groq_api_key: Option<String>,

    // Notifications (ntfy.sh)
    pub ntfy_topic: Option<String>,
    pub ntfy_server: String,

    // Dashboard CORS origins
    pub frontend_origins: Vec<String>,
}

impl Config {
    fn from_env() -> Self {
        Self {
            database_url: env_str("DATABASE_URL")
                .unwrap_or_else(|| "postgresql://localhost:5432/webscout".to_string()),
            batch_size: env_u64("BATCH_SIZE", 100) as i64,

            dns_timeout_secs: env_u64("DNS_TIMEOUT", 5),
            dns_check_www: env_bool("DNS_CHECK_WWW", true),
            http_timeout_secs: env_u64("HTTP_TIMEOUT", 10),
            http_user_agent: env_str("HTTP_USER_AGENT")
                .unwrap_or_else(|| "webscout/0.3".to_string()),
            tcp_probe_enabled: env_bool("TCP_PROBE_ENABLED", false),
            tcp_probe_timeout_secs: env_u64("TCP_PROBE_TIMEOUT", 3),
            tcp_probe_ports: env_str("TCP_PROBE_PORTS")
                .unwrap_or_else(|| "80,443".to_string())
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect(),

            mutation_api_key: env_str("MUTATION_API_KEY"),
            mutation_localhost_bypass: env_bool("MUTATION_LOCALHOST_BYPASS", true),

            auto_runner_enabled: env_bool("AUTO_RUNNER_ENABLED", false),
            auto_runner_interval_seconds: env_u64("AUTO_RUNNER_INTERVAL_SECONDS", 900).max(30),
            auto_daily_target_enabled: env_bool("AUTO_DAILY_TARGET_ENABLED", true),
            daily_target_count: (env_u64("DAILY_TARGET_COUNT", 100).max(1)) as i64,
            daily_target_min_score: env_f64("DAILY_TARGET_MIN_SCORE", 40.0),
            daily_target_platform_prefix: env_str("DAILY_TARGET_PLATFORM_PREFIX")
                .unwrap_or_else(|| "daily".to_string()),
            daily_target_require_contact: env_bool("DAILY_TARGET_REQUIRE_CONTACT", true),
            daily_target_require_domain_qualification: env_bool(
                "DAILY_TARGET_REQUIRE_DOMAIN_QUALIFICATION",
                false,
            ),
            daily_target_require_unhosted_domain: env_bool(
                "DAILY_TARGET_REQUIRE_UNHOSTED_DOMAIN",
                false,
            ),
            daily_target_allow_recycle: env_bool("DAILY_TARGET_ALLOW_RECYCLE", true),

            rdap_base_url: env_str("RDAP_BASE_URL")
                .unwrap_or_else(|| "https://rdap.org/domain/".to_string()),
            overpass_endpoint: env_str("OVERPASS_ENDPOINT")
                .unwrap_or_else(|| "https://overpass-api.de/api/interpreter".to_string()),
            overpass_timeout_secs: env_u64("OVERPASS_TIMEOUT", 180),
            searxng_url: env_str("SEARXNG_URL")
                .unwrap_or_else(|| "http://localhost:8888/search".to_string()),

            export_dir: env_str("EXPORT_DIR").unwrap_or_else(|| "./exports".to_string()),

            google_places_api_key: env_str("GOOGLE_PLACES_API_KEY"),
            foursquare_api_key: env_str("FOURSQUARE_API_KEY"),
            openrouter_api_key: env_str("OPENROUTER_API_KEY"),
            gemini_api_key: env_str("GEMINI_API_KEY"),
            groq_api_key: env_str("GROQ_API_KEY"),

            ntfy_topic: env_str("NTFY_TOPIC"),
            ntfy_server: env_str("NTFY_SERVER").unwrap_or_else(|| "https://ntfy.sh".to_string()),

            frontend_origins: env_str("FRONTEND_ORIGINS")
                .unwrap_or_else(|| {
                    "http://localhost:5173,http://127.0.0.1:5173,http://localhost:8000".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Process-wide cached configuration.
    pub fn load() -> &'static Config {
        static CONFIG: OnceLock<Config> = OnceLock::new();
        CONFIG.get_or_init(Config::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // from_env with a clean-ish environment still yields workable values.
        let config = Config::from_env();
        assert!(config.batch_size > 0);
        assert!(config.auto_runner_interval_seconds >= 30);
        assert!(config.rdap_base_url.starts_with("http"));
        assert!(!config.tcp_probe_ports.is_empty());
    }
}
