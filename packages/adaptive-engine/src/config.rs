use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::content::CompilerConfig;

/// In-session adaptation thresholds. Response times are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionThresholds {
    pub slow_response_secs: f64,
    pub quick_response_secs: f64,
    pub excessive_hints: u32,
    pub struggle_consecutive_incorrect: u32,
    pub mastery_consecutive_correct: u32,
    pub min_attempts: u32,
    pub struggle_indicator_count: usize,
    pub mastery_indicator_count: usize,
    pub max_indicators: usize,
}

impl Default for SessionThresholds {
    fn default() -> Self {
        Self {
            slow_response_secs: 60.0,
            quick_response_secs: 10.0,
            excessive_hints: 2,
            struggle_consecutive_incorrect: 2,
            mastery_consecutive_correct: 3,
            min_attempts: 2,
            struggle_indicator_count: 2,
            mastery_indicator_count: 2,
            max_indicators: 64,
        }
    }
}

impl SessionThresholds {
    /// Indicator cap never drops below the count needed to trigger a decision.
    pub fn indicator_cap(&self) -> usize {
        self.max_indicators
            .max(self.struggle_indicator_count)
            .max(self.mastery_indicator_count)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub log_level: String,
    pub pool_per_template: u64,
    pub compiler: CompilerConfig,
    pub session: SessionThresholds,
    pub idle_ttl: Duration,
    pub sweep_interval: Duration,
    pub template_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pool_per_template: 20,
            compiler: CompilerConfig::default(),
            session: SessionThresholds::default(),
            idle_ttl: Duration::from_secs(1800),
            sweep_interval: Duration::from_secs(300),
            template_path: None,
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Applies a `.env` file if present, then reads the environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = level;
        }
        if let Some(v) = parse_var(&lookup, "ADAPTIVE_POOL_PER_TEMPLATE") {
            config.pool_per_template = v;
        }
        if let Some(v) = parse_var(&lookup, "ADAPTIVE_DISTRACTOR_COUNT") {
            config.compiler.distractor_count = v;
        }
        if let Some(v) = parse_var(&lookup, "ADAPTIVE_MAX_BACKFILL") {
            config.compiler.max_backfill_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "ADAPTIVE_MAX_INDICATORS") {
            config.session.max_indicators = v;
        }
        if let Some(v) = parse_var(&lookup, "ADAPTIVE_IDLE_TTL_SECS") {
            config.idle_ttl = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "ADAPTIVE_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(v.max(1));
        }
        if let Some(path) = lookup("ADAPTIVE_TEMPLATE_PATH").filter(|p| !p.trim().is_empty()) {
            config.template_path = Some(PathBuf::from(path));
        }

        let file_logs = lookup("ADAPTIVE_ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if file_logs {
            let dir = lookup("ADAPTIVE_LOG_DIR").unwrap_or_else(|| "./logs".to_string());
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.pool_per_template, 20);
        assert_eq!(config.compiler.distractor_count, 3);
        assert_eq!(config.session.slow_response_secs, 60.0);
        assert_eq!(config.idle_ttl, Duration::from_secs(1800));
        assert!(config.template_path.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ADAPTIVE_POOL_PER_TEMPLATE", "5"),
            ("ADAPTIVE_DISTRACTOR_COUNT", "4"),
            ("ADAPTIVE_MAX_INDICATORS", "8"),
            ("ADAPTIVE_SWEEP_INTERVAL_SECS", "0"),
            ("ADAPTIVE_TEMPLATE_PATH", "/tmp/templates.json"),
            ("RUST_LOG", "debug"),
        ]);
        assert_eq!(config.pool_per_template, 5);
        assert_eq!(config.compiler.distractor_count, 4);
        assert_eq!(config.session.max_indicators, 8);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.template_path, Some(PathBuf::from("/tmp/templates.json")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_file_logs_toggle() {
        let config = config_from(&[("ADAPTIVE_ENABLE_FILE_LOGS", "1")]);
        assert_eq!(config.log_dir, Some(PathBuf::from("./logs")));
        let config = config_from(&[
            ("ADAPTIVE_ENABLE_FILE_LOGS", "true"),
            ("ADAPTIVE_LOG_DIR", "/var/log/adaptive"),
        ]);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/adaptive")));
        let config = config_from(&[("ADAPTIVE_LOG_DIR", "/var/log/adaptive")]);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[("ADAPTIVE_POOL_PER_TEMPLATE", "lots")]);
        assert_eq!(config.pool_per_template, 20);
    }

    #[test]
    fn test_indicator_cap_floor() {
        let thresholds = SessionThresholds {
            max_indicators: 0,
            ..Default::default()
        };
        assert_eq!(thresholds.indicator_cap(), 2);
    }
}
