use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::info;
use rae_common::helpers::parse_int_flag;

/// The engine's tunable windows and timeouts.
///
/// [`EngineConfig::default`] gives the production values. [`EngineConfig::from_env`] applies `RAE_*` environment
/// overrides on top of the defaults, which is mainly useful for staging setups with shortened windows.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A bid arriving within this window before the deadline triggers a soft-close extension.
    pub soft_close_window: Duration,
    /// How far each soft-close extension pushes the deadline.
    pub extension_amount: Duration,
    /// Hard cap on soft-close extensions per auction.
    pub max_extensions: i64,
    /// A `LiveReverse` auction may only be closed early while more than this remains before the deadline.
    pub early_close_cutoff: Duration,
    /// Age of `closed_at` after which the buyer gets the one-time forfeiture warning.
    pub warning_after: Duration,
    /// Age of `closed_at` after which the deposit is forfeited.
    pub forfeit_after: Duration,
    /// Upper bound on any single outbound payment-gateway call.
    pub gateway_timeout: StdDuration,
    /// How long a single attempt to take an auction's lock may wait.
    pub lock_wait: StdDuration,
    /// How many lock attempts are made before surfacing a transient failure.
    pub lock_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soft_close_window: Duration::minutes(5),
            extension_amount: Duration::minutes(5),
            max_extensions: 3,
            early_close_cutoff: Duration::hours(1),
            warning_after: Duration::hours(48),
            forfeit_after: Duration::hours(72),
            gateway_timeout: StdDuration::from_secs(10),
            lock_wait: StdDuration::from_secs(5),
            lock_attempts: 3,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let minutes = |var: &str, default: Duration| {
            let v = parse_int_flag(env::var(var).ok(), default.num_minutes());
            if v != default.num_minutes() {
                info!("{var} override: {v} minutes");
            }
            Duration::minutes(v)
        };
        let hours = |var: &str, default: Duration| {
            let v = parse_int_flag(env::var(var).ok(), default.num_hours());
            if v != default.num_hours() {
                info!("{var} override: {v} hours");
            }
            Duration::hours(v)
        };
        Self {
            soft_close_window: minutes("RAE_SOFT_CLOSE_WINDOW_MINUTES", defaults.soft_close_window),
            extension_amount: minutes("RAE_EXTENSION_MINUTES", defaults.extension_amount),
            max_extensions: parse_int_flag(env::var("RAE_MAX_EXTENSIONS").ok(), defaults.max_extensions),
            early_close_cutoff: minutes("RAE_EARLY_CLOSE_CUTOFF_MINUTES", defaults.early_close_cutoff),
            warning_after: hours("RAE_WARNING_AFTER_HOURS", defaults.warning_after),
            forfeit_after: hours("RAE_FORFEIT_AFTER_HOURS", defaults.forfeit_after),
            gateway_timeout: StdDuration::from_secs(parse_int_flag(
                env::var("RAE_GATEWAY_TIMEOUT_SECONDS").ok(),
                defaults.gateway_timeout.as_secs() as i64,
            ) as u64),
            ..defaults
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_windows() {
        let config = EngineConfig::default();
        assert_eq!(config.soft_close_window, Duration::minutes(5));
        assert_eq!(config.max_extensions, 3);
        assert_eq!(config.warning_after, Duration::hours(48));
        assert_eq!(config.forfeit_after, Duration::hours(72));
        assert_eq!(config.gateway_timeout, StdDuration::from_secs(10));
    }
}
