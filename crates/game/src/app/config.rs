use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::leaderboard::RegionCode;
use super::session::{ChallengeConfig, MonitorConfig, SessionConfig, MAX_CHECK_INTERVAL};

pub const MOVE_THRESHOLD_ENV_VAR: &str = "STAY_STILL_MOVE_THRESHOLD_PX";
pub const CHECK_MIN_ENV_VAR: &str = "STAY_STILL_CHECK_MIN_SECS";
pub const CHECK_MAX_ENV_VAR: &str = "STAY_STILL_CHECK_MAX_SECS";
pub const CHECK_RESPONSE_ENV_VAR: &str = "STAY_STILL_CHECK_RESPONSE_SECS";
pub const REGION_ENV_VAR: &str = "STAY_STILL_REGION";
pub const NICKNAME_ENV_VAR: &str = "STAY_STILL_NICKNAME";
pub const LEADERBOARD_ENV_VAR: &str = "STAY_STILL_LEADERBOARD";
pub const SEED_ENV_VAR: &str = "STAY_STILL_SEED";
const LOCALE_ENV_VAR: &str = "LANG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeaderboardBackend {
    #[default]
    File,
    Memory,
}

impl FromStr for LeaderboardBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub session: SessionConfig,
    pub region: RegionCode,
    pub nickname: String,
    pub leaderboard: LeaderboardBackend,
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name))
    }

    /// Builds the config from a variable lookup. Unparseable values are
    /// logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let defaults = ChallengeConfig::default();
        let challenge = ChallengeConfig {
            min_interval: parse_interval(&lookup, CHECK_MIN_ENV_VAR, defaults.min_interval),
            max_interval: parse_interval(&lookup, CHECK_MAX_ENV_VAR, defaults.max_interval),
            response_seconds: parse_or(&lookup, CHECK_RESPONSE_ENV_VAR, defaults.response_seconds),
        }
        .normalized();

        let movement_threshold_px = parse_or(
            &lookup,
            MOVE_THRESHOLD_ENV_VAR,
            MonitorConfig::default().movement_threshold_px,
        );
        let monitor = if movement_threshold_px.is_finite() && movement_threshold_px > 0.0 {
            MonitorConfig {
                movement_threshold_px,
            }
        } else {
            warn!(
                env_var = MOVE_THRESHOLD_ENV_VAR,
                value = movement_threshold_px,
                "movement threshold must be positive; falling back to default"
            );
            MonitorConfig::default()
        };

        let region = read_var(&lookup, REGION_ENV_VAR)
            .and_then(|value| parse_logged::<RegionCode>(REGION_ENV_VAR, &value))
            .or_else(|| {
                read_var(&lookup, LOCALE_ENV_VAR).and_then(|locale| RegionCode::from_locale(&locale))
            })
            .unwrap_or(RegionCode::UNKNOWN);

        Self {
            session: SessionConfig { monitor, challenge },
            region,
            nickname: read_var(&lookup, NICKNAME_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or_default(),
            leaderboard: parse_or(&lookup, LEADERBOARD_ENV_VAR, LeaderboardBackend::default()),
            seed: read_var(&lookup, SEED_ENV_VAR)
                .and_then(|value| parse_logged::<u64>(SEED_ENV_VAR, &value)),
        }
    }
}

fn read_var<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(
                env_var = name,
                error = %error,
                "unable to read env var; falling back to default"
            );
            None
        }
    }
}

fn parse_logged<T: FromStr>(name: &'static str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                env_var = name,
                value,
                "invalid env var value; falling back to default"
            );
            None
        }
    }
}

/// Whole seconds, at most [`MAX_CHECK_INTERVAL`]. Longer values are logged
/// and replaced by `default`.
fn parse_interval<F>(lookup: &F, name: &'static str, default: Duration) -> Duration
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    let seconds = parse_or(lookup, name, default.as_secs());
    if seconds > MAX_CHECK_INTERVAL.as_secs() {
        warn!(
            env_var = name,
            value = seconds,
            max = MAX_CHECK_INTERVAL.as_secs(),
            "check interval too long; falling back to default"
        );
        return default;
    }
    Duration::from_secs(seconds)
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> T
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
{
    read_var(lookup, name)
        .and_then(|value| parse_logged(name, &value))
        .unwrap_or(default)
}
