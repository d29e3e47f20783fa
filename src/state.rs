use anyhow::{bail, Context};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::notification::NotificationHub;
use crate::reminder::SweepSettings;
use crate::task::TaskService;

/// One year. Keeps `now + horizon` well inside the representable range.
const MAX_HORIZON_MINUTES: i64 = 366 * 24 * 60;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub notification_hub: NotificationHub,
    pub task_service: TaskService,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub sweep_interval: Duration,
    /// Lead times a caller may choose from, ascending.
    pub reminder_lead_options: Vec<i32>,
    pub reminder_horizon: chrono::Duration,
    /// Equal to `sweep_interval`.
    pub sweep_lookback: chrono::Duration,
    pub notification_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;

        let sweep_secs: u64 = parse_or(&lookup, "REMINDER_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            bail!("REMINDER_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        let reminder_lead_options = match lookup("REMINDER_LEAD_OPTIONS") {
            Some(raw) => parse_lead_options(&raw)?,
            None => vec![15, 30, 45, 60],
        };
        let largest_lead = reminder_lead_options.last().copied().unwrap_or(60);

        // A zero lead has an empty window; every other window must span a tick.
        if let Some(smallest_lead) = reminder_lead_options.iter().copied().find(|m| *m > 0) {
            if sweep_secs > u64::from(smallest_lead.unsigned_abs()) * 60 {
                bail!(
                    "REMINDER_SWEEP_INTERVAL_SECS ({}) must not exceed the smallest lead option ({} minutes)",
                    sweep_secs,
                    smallest_lead
                );
            }
        }
        let sweep_lookback = i64::try_from(sweep_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .context("REMINDER_SWEEP_INTERVAL_SECS is out of range")?;

        let reminder_horizon_minutes: i64 =
            parse_or(&lookup, "REMINDER_HORIZON_MINUTES", i64::from(largest_lead))?;
        if reminder_horizon_minutes < i64::from(largest_lead) {
            bail!(
                "REMINDER_HORIZON_MINUTES ({}) must cover the largest lead option ({})",
                reminder_horizon_minutes,
                largest_lead
            );
        }
        let reminder_horizon = Some(reminder_horizon_minutes)
            .filter(|m| *m <= MAX_HORIZON_MINUTES)
            .and_then(chrono::Duration::try_minutes)
            .with_context(|| {
                format!(
                    "REMINDER_HORIZON_MINUTES ({}) is out of range (at most {})",
                    reminder_horizon_minutes, MAX_HORIZON_MINUTES
                )
            })?;

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            sweep_interval: Duration::from_secs(sweep_secs),
            reminder_lead_options,
            reminder_horizon,
            sweep_lookback,
            notification_channel_capacity: parse_or(&lookup, "NOTIFICATION_CHANNEL_CAPACITY", 100)?,
        })
    }

    /// Lead time applied when a task is created without one.
    pub fn default_lead_minutes(&self) -> i32 {
        if self.reminder_lead_options.contains(&60) {
            60
        } else {
            self.reminder_lead_options.last().copied().unwrap_or(60)
        }
    }

    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            interval: self.sweep_interval,
            horizon: self.reminder_horizon,
            lookback: self.sweep_lookback,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

fn parse_lead_options(raw: &str) -> anyhow::Result<Vec<i32>> {
    let mut options = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .with_context(|| format!("invalid reminder lead option {:?}", s))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if options.is_empty() {
        bail!("REMINDER_LEAD_OPTIONS must list at least one value");
    }
    if let Some(negative) = options.iter().find(|m| **m < 0) {
        bail!("reminder lead option {} must not be negative", negative);
    }

    options.sort_unstable();
    options.dedup();
    Ok(options)
}
