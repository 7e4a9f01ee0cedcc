//! Reconciler configuration.
//!
//! ```toml
//! call_timeout = "10s"
//! interval = "30s"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every autoscaler built from one factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Upper bound on each external call (metric lookup, get, update).
    #[serde(default = "default_call_timeout", with = "human_duration")]
    pub call_timeout: Duration,
    /// Delay between passes when driven by `Autoscaler::run`.
    #[serde(default = "default_interval", with = "human_duration")]
    pub interval: Duration,
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout(),
            interval: default_interval(),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Parse a duration like "250ms", "30s", "5m" or "1h". A bare number is
/// taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        (s, 1_000)
    };
    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration {s:?}"))?;
    n.checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration {s:?} out of range"))
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 3_600_000 == 0 && ms > 0 {
        format!("{}h", ms / 3_600_000)
    } else if ms % 60_000 == 0 && ms > 0 {
        format!("{}m", ms / 60_000)
    } else if ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{ms}ms")
    }
}

mod human_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert!(parse_duration("invalid").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn format_duration_picks_largest_exact_unit() {
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn defaults_apply_to_empty_document() {
        let config = ReconcilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconcilerConfig::default());
        assert_eq!(config.call_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_overrides() {
        let config = ReconcilerConfig::from_toml_str("call_timeout = \"2s\"\ninterval = \"1m\"").unwrap();
        assert_eq!(config.call_timeout, Duration::from_secs(2));
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = ReconcilerConfig::from_toml_str("interval = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("soon"), "{err}");
    }

    #[test]
    fn serializes_human_durations() {
        let s = toml::to_string(&ReconcilerConfig::default()).unwrap();
        assert!(s.contains("call_timeout = \"10s\""), "{s}");
        assert!(s.contains("interval = \"30s\""), "{s}");
    }
}
