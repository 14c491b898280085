use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling: SchedulingConfig,
}

/// Tunables of the slot engine. Every value has a default matching the
/// clinic's historical behaviour (UTC+7, 30 minute slots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub utc_offset_hours: i32,
    pub slot_step_minutes: i64,
    pub conflict_window_minutes: i64,
    pub suggestion_limit: usize,
    pub default_days_ahead: u32,
    pub max_days_ahead: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 7,
            slot_step_minutes: 30,
            conflict_window_minutes: 30,
            suggestion_limit: 5,
            default_days_ahead: 30,
            max_days_ahead: 90,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut config = Self {
            utc_offset_hours: env_or("CLINIC_UTC_OFFSET_HOURS", defaults.utc_offset_hours),
            slot_step_minutes: env_or("SLOT_STEP_MINUTES", defaults.slot_step_minutes),
            conflict_window_minutes: env_or("CONFLICT_WINDOW_MINUTES", defaults.conflict_window_minutes),
            suggestion_limit: env_or("SUGGESTION_LIMIT", defaults.suggestion_limit),
            default_days_ahead: env_or("DEFAULT_DAYS_AHEAD", defaults.default_days_ahead),
            max_days_ahead: env_or("MAX_DAYS_AHEAD", defaults.max_days_ahead),
        };

        if !(-12..=14).contains(&config.utc_offset_hours) {
            warn!("CLINIC_UTC_OFFSET_HOURS={} out of range, using default", config.utc_offset_hours);
            config.utc_offset_hours = defaults.utc_offset_hours;
        }
        if config.slot_step_minutes <= 0 {
            warn!("SLOT_STEP_MINUTES must be positive, using default");
            config.slot_step_minutes = defaults.slot_step_minutes;
        }
        if config.conflict_window_minutes <= 0 {
            warn!("CONFLICT_WINDOW_MINUTES must be positive, using default");
            config.conflict_window_minutes = defaults.conflict_window_minutes;
        }
        if config.default_days_ahead > config.max_days_ahead {
            warn!("DEFAULT_DAYS_AHEAD exceeds MAX_DAYS_AHEAD, clamping");
            config.default_days_ahead = config.max_days_ahead;
        }

        config
    }
}

impl AppConfig {
    /// Loads `.env` (if present) before reading the environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_defaults() {
        let config = SchedulingConfig::default();
        assert_eq!(config.utc_offset_hours, 7);
        assert_eq!(config.slot_step_minutes, 30);
        assert_eq!(config.conflict_window_minutes, 30);
        assert_eq!(config.suggestion_limit, 5);
        assert!(config.default_days_ahead <= config.max_days_ahead);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("SHARED_CONFIG_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("SHARED_CONFIG_TEST_GARBAGE", 42i64), 42);
        env::remove_var("SHARED_CONFIG_TEST_GARBAGE");
    }

    #[test]
    fn test_env_or_reads_value() {
        env::set_var("SHARED_CONFIG_TEST_VALUE", " 15 ");
        assert_eq!(env_or("SHARED_CONFIG_TEST_VALUE", 30i64), 15);
        env::remove_var("SHARED_CONFIG_TEST_VALUE");
    }
}
