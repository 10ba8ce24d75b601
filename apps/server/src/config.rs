use std::env;

use anyhow::Context;
use chrono::FixedOffset;

use crate::reminders::DEFAULT_LEAD_MINUTES;
use crate::schedule::exceptions::DEFAULT_MAX_RANGE_DAYS;
use crate::schedule::grid::DEFAULT_SLOT_MINUTES;
use crate::schedule::{SlotGrid, TimeOfDay};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_token: String,
    pub staff_token: Option<String>,
    pub notify_webhook_url: Option<String>,
    pub webapp_url: Option<String>,
    // Scheduling
    pub window_start: TimeOfDay,
    pub window_end: TimeOfDay,
    pub slot_minutes: u16,
    pub venue_utc_offset_hours: i32,
    pub max_exception_range_days: u32,
    // Reminders
    pub reminder_lead_minutes: i64,
    pub reminder_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.into())
        };
        let optional = |key: &str| lookup(key).filter(|s| !s.is_empty());

        Ok(Self {
            database_url: var("DATABASE_URL", "sqlite:fields.db?mode=rwc"),
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "3000").parse().context("PORT")?,
            admin_token: optional("ADMIN_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("Missing required env var: ADMIN_TOKEN"))?,
            staff_token: optional("STAFF_TOKEN"),
            notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
            webapp_url: optional("WEBAPP_URL"),
            window_start: var("SERVICE_WINDOW_START", "15:30")
                .parse()
                .context("SERVICE_WINDOW_START")?,
            window_end: var("SERVICE_WINDOW_END", "05:00")
                .parse()
                .context("SERVICE_WINDOW_END")?,
            slot_minutes: var("SLOT_MINUTES", &DEFAULT_SLOT_MINUTES.to_string())
                .parse()
                .context("SLOT_MINUTES")?,
            venue_utc_offset_hours: var("VENUE_UTC_OFFSET_HOURS", "3")
                .parse()
                .context("VENUE_UTC_OFFSET_HOURS")?,
            max_exception_range_days: var("MAX_EXCEPTION_RANGE_DAYS", &DEFAULT_MAX_RANGE_DAYS.to_string())
                .parse()
                .context("MAX_EXCEPTION_RANGE_DAYS")?,
            reminder_lead_minutes: var("REMINDER_LEAD_MINUTES", &DEFAULT_LEAD_MINUTES.to_string())
                .parse()
                .context("REMINDER_LEAD_MINUTES")?,
            reminder_interval_secs: var("REMINDER_INTERVAL_SECS", "900")
                .parse()
                .context("REMINDER_INTERVAL_SECS")?,
        })
    }

    /// Fails on a window the grid cannot walk.
    pub fn slot_grid(&self) -> anyhow::Result<SlotGrid> {
        Ok(SlotGrid::new(
            self.window_start,
            self.window_end,
            self.slot_minutes,
        )?)
    }

    pub fn venue_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.venue_utc_offset_hours * 3600).ok_or_else(|| {
            anyhow::anyhow!(
                "VENUE_UTC_OFFSET_HOURS out of range: {}",
                self.venue_utc_offset_hours
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_venue_schedule() {
        let cfg = config(&[("ADMIN_TOKEN", "secret")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.slot_grid().unwrap(), SlotGrid::default());
        assert_eq!(cfg.venue_offset().unwrap().local_minus_utc(), 3 * 3600);
        assert_eq!(cfg.reminder_lead_minutes, 120);
        assert_eq!(cfg.max_exception_range_days, 92);
        assert!(cfg.staff_token.is_none());
        assert!(cfg.notify_webhook_url.is_none());
    }

    #[test]
    fn admin_token_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("ADMIN_TOKEN", "")]).is_err());
    }

    #[test]
    fn degenerate_window_fails_at_startup() {
        let cfg = config(&[
            ("ADMIN_TOKEN", "secret"),
            ("SERVICE_WINDOW_START", "10:00"),
            ("SERVICE_WINDOW_END", "10:00"),
        ])
        .unwrap();
        assert!(cfg.slot_grid().is_err());
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = config(&[("ADMIN_TOKEN", "secret"), ("SLOT_MINUTES", "ninety")]).unwrap_err();
        assert!(err.to_string().contains("SLOT_MINUTES"));
    }
}
