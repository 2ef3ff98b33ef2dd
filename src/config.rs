//! Runtime configuration from environment variables (a `.env` file is honoured).

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::domain::loyalty::{Tier, TierTable};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    pub notify_max_attempts: u32,
    pub notify_retry_delay: Duration,
    /// Cashback ladder, unvalidated until [`Config::tier_table`].
    pub tiers: Vec<Tier>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            port: 8083,
            nats_url: None,
            notify_max_attempts: 5,
            notify_retry_delay: Duration::from_millis(500),
            tiers: TierTable::default().tiers().to_vec(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(defaults.database_max_connections),
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            nats_url: non_empty("NATS_URL"),
            notify_max_attempts: parse(&get, "NOTIFY_MAX_ATTEMPTS")?.unwrap_or(defaults.notify_max_attempts),
            notify_retry_delay: parse(&get, "NOTIFY_RETRY_DELAY_MS")?.map(Duration::from_millis).unwrap_or(defaults.notify_retry_delay),
            tiers: match non_empty("LOYALTY_TIERS") {
                Some(value) => parse_tiers(&value).ok_or(ConfigError::Invalid { key: "LOYALTY_TIERS", value })?,
                None => defaults.tiers,
            },
        })
    }

    pub fn tier_table(&self) -> crate::Result<TierTable> {
        Ok(TierTable::new(self.tiers.clone())?)
    }
}

/// `name:min_lifetime_spend:rate_percent` entries separated by commas,
/// e.g. `Base:0:3,Silver:50000:5`.
fn parse_tiers(value: &str) -> Option<Vec<Tier>> {
    value.split(',').map(|entry| {
        let mut parts = entry.trim().split(':');
        let (name, min, pct) = (parts.next()?.trim(), parts.next()?.trim(), parts.next()?.trim());
        if name.is_empty() || parts.next().is_some() { return None; }
        let min: Decimal = min.parse().ok()?;
        let pct: Decimal = pct.parse().ok()?;
        Some(Tier::new(name, min, pct / Decimal::ONE_HUNDRED))
    }).collect()
}

fn parse<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::loyalty::TierError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/loyalty"), ("PORT", "9000"),
            ("NATS_URL", ""), ("NOTIFY_RETRY_DELAY_MS", "50"),
        ])).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/loyalty"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.nats_url, None);
        assert_eq!(config.notify_retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_tier_ladder_from_env() {
        let config = Config::from_lookup(lookup(&[("LOYALTY_TIERS", "Member:0:2, VIP:1000:4.5")])).unwrap();
        let table = config.tier_table().unwrap();
        let names: Vec<&str> = table.tiers().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Member", "VIP"]);
        assert_eq!(table.rate_for(Decimal::new(999, 0)), Decimal::new(2, 2));
        assert_eq!(table.rate_for(Decimal::new(1000, 0)), Decimal::new(45, 3));
        assert_eq!(Config::default().tier_table().unwrap(), TierTable::default());
    }

    #[test]
    fn test_malformed_tiers() {
        for value in ["Base:0", "Base:0:3:1", ":0:3", "Base:zero:3", "Base:0:3,"] {
            let err = Config::from_lookup(lookup(&[("LOYALTY_TIERS", value)])).unwrap_err();
            assert_eq!(err, ConfigError::Invalid { key: "LOYALTY_TIERS", value: value.into() });
        }
    }

    #[test]
    fn test_inconsistent_tiers_rejected() {
        let config = Config::from_lookup(lookup(&[("LOYALTY_TIERS", "Base:0:5,Silver:50000:3")])).unwrap();
        assert!(matches!(
            config.tier_table(),
            Err(crate::LoyaltyError::InvalidTiers(TierError::RateDecreases(name))) if name == "Silver"
        ));
        let config = Config::from_lookup(lookup(&[("LOYALTY_TIERS", "Silver:100:5")])).unwrap();
        assert!(matches!(config.tier_table(), Err(crate::LoyaltyError::InvalidTiers(TierError::MissingBaseTier))));
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
    }
}
