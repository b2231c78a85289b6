use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::warn;

use crate::logic::RetentionPolicy;

/// Server settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_title: String,
    pub app_description: String,
    pub cors_allowed_origins: Vec<String>,
    pub games_per_minute: u32,
    pub cleanup_interval: Duration,
    pub retention: RetentionPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_title: "Minefield".to_string(),
            app_description: "Independent minefield game sessions over HTTP".to_string(),
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            games_per_minute: 10,
            cleanup_interval: Duration::from_secs(60),
            retention: RetentionPolicy {
                idle_timeout: Duration::from_secs(600),
                finished_timeout: Duration::from_secs(120),
            },
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allowed_origins);

        let seconds = |key: &str, default: Duration| {
            Duration::from_secs(parsed(&lookup, key, default.as_secs()))
        };

        Self {
            app_title: lookup("APP_TITLE").unwrap_or(defaults.app_title),
            app_description: lookup("APP_DESCRIPTION").unwrap_or(defaults.app_description),
            cors_allowed_origins,
            games_per_minute: parsed(
                &lookup,
                "RATE_LIMIT_GAMES_PER_MINUTE",
                defaults.games_per_minute,
            ),
            cleanup_interval: seconds("CLEANUP_INTERVAL_SECONDS", defaults.cleanup_interval),
            retention: RetentionPolicy {
                idle_timeout: seconds(
                    "INACTIVE_GAME_TIMEOUT_SECONDS",
                    defaults.retention.idle_timeout,
                ),
                finished_timeout: seconds(
                    "FINISHED_GAME_TIMEOUT_SECONDS",
                    defaults.retention.finished_timeout,
                ),
            },
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
    }
}
