//! Fixed-width bucket durations.
//!
//! A [`Granularity`] is a whole number of seconds, parsed from the compact
//! forms used in configs and on the command line:
//!
//! ```
//! use trade_series::granularity::Granularity;
//!
//! let g: Granularity = "5m".parse().unwrap();
//! assert_eq!(g.as_secs(), 300);
//! assert_eq!("3600".parse::<Granularity>().unwrap().to_string(), "1h");
//! ```
//!
//! Calendar units (months) are deliberately absent: every bucket must have the
//! same width for the epoch alignment in [`crate::bucket`] to hold.

use std::{fmt, num::NonZeroU32, str::FromStr};

use anyhow::{anyhow, bail};
use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bucket::{SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_MINUTE, SECS_PER_WEEK};

/// Unit part of a granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityUnit {
    /// seconds
    Second,
    /// UTC minute
    Minute,
    /// UTC hour
    Hour,
    /// UTC day
    Day,
    /// 7 days
    Week,
}

impl GranularityUnit {
    const fn secs(self) -> i64 {
        match self {
            GranularityUnit::Second => 1,
            GranularityUnit::Minute => SECS_PER_MINUTE,
            GranularityUnit::Hour => SECS_PER_HOUR,
            GranularityUnit::Day => SECS_PER_DAY,
            GranularityUnit::Week => SECS_PER_WEEK,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            GranularityUnit::Second => "s",
            GranularityUnit::Minute => "m",
            GranularityUnit::Hour => "h",
            GranularityUnit::Day => "D",
            GranularityUnit::Week => "W",
        }
    }
}

/// A granularity = amount × unit (e.g. 5-Minute, 6-Hour, 1-Day).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granularity {
    amount: NonZeroU32,
    unit: GranularityUnit,
}

impl Granularity {
    /// Create a new granularity.
    pub const fn new(amount: NonZeroU32, unit: GranularityUnit) -> Self {
        Self { amount, unit }
    }

    /// Express a number of seconds in the largest unit that divides it.
    pub fn from_secs(secs: u32) -> Option<Self> {
        let amount = NonZeroU32::new(secs)?;
        let unit = [
            GranularityUnit::Week,
            GranularityUnit::Day,
            GranularityUnit::Hour,
            GranularityUnit::Minute,
        ]
        .into_iter()
        .find(|u| i64::from(secs) % u.secs() == 0)
        .unwrap_or(GranularityUnit::Second);
        let scaled = u32::try_from(i64::from(amount.get()) / unit.secs()).ok()?;
        Some(Self::new(NonZeroU32::new(scaled)?, unit))
    }

    /// Total width in seconds.
    pub fn as_secs(&self) -> i64 {
        i64::from(self.amount.get()) * self.unit.secs()
    }

    /// Width as a chrono duration.
    pub fn as_duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.as_secs())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.get(), self.unit.suffix())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 60 / 30s / 5m / 3h / 1D / 1W
        let s = s.trim();
        if s.is_empty() {
            bail!("empty granularity");
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let secs: u32 = s.parse()?;
            return Self::from_secs(secs).ok_or_else(|| anyhow!("granularity must be > 0"));
        }
        let split = s.len() - s.chars().next_back().map_or(0, char::len_utf8);
        let (digits, unit) = s.split_at(split);
        let amount_num: u32 = digits.parse()?;
        let amount = NonZeroU32::new(amount_num).ok_or_else(|| anyhow!("amount must be > 0"))?;
        let unit = match unit {
            "s" => GranularityUnit::Second,
            "m" => GranularityUnit::Minute,
            "h" => GranularityUnit::Hour,
            "D" | "d" => GranularityUnit::Day,
            "W" | "w" => GranularityUnit::Week,
            _ => bail!("unknown unit: {unit}"),
        };
        Ok(Granularity::new(amount, unit))
    }
}

impl Serialize for Granularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Granularity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Secs(n) => Granularity::from_secs(n)
                .ok_or_else(|| serde::de::Error::custom("granularity must be > 0")),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_forms() {
        assert_eq!("30s".parse::<Granularity>().unwrap().as_secs(), 30);
        assert_eq!("5m".parse::<Granularity>().unwrap().as_secs(), 300);
        assert_eq!("6h".parse::<Granularity>().unwrap().as_secs(), 21_600);
        assert_eq!("1D".parse::<Granularity>().unwrap().as_secs(), 86_400);
        assert_eq!("2W".parse::<Granularity>().unwrap().as_secs(), 1_209_600);
    }

    #[test]
    fn bare_seconds_normalize_to_largest_unit() {
        assert_eq!("900".parse::<Granularity>().unwrap().to_string(), "15m");
        assert_eq!("86400".parse::<Granularity>().unwrap().to_string(), "1D");
        assert_eq!("45".parse::<Granularity>().unwrap().to_string(), "45s");
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Granularity>().is_err());
        assert!("0m".parse::<Granularity>().is_err());
        assert!("0".parse::<Granularity>().is_err());
        assert!("5M".parse::<Granularity>().is_err());
        assert!("m".parse::<Granularity>().is_err());
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct W {
            g: Granularity,
        }
        let a: W = toml::from_str("g = 60").unwrap();
        let b: W = toml::from_str("g = \"1m\"").unwrap();
        assert_eq!(a.g, b.g);
    }
}
