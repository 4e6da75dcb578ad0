use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("KR", "South Korea"),
    ("US", "United States"),
    ("JP", "Japan"),
    ("CN", "China"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("BR", "Brazil"),
    ("IN", "India"),
    ("RU", "Russia"),
    ("MX", "Mexico"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("NL", "Netherlands"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("PL", "Poland"),
    ("TW", "Taiwan"),
    ("HK", "Hong Kong"),
    ("SG", "Singapore"),
    ("TH", "Thailand"),
    ("VN", "Vietnam"),
    ("PH", "Philippines"),
    ("ID", "Indonesia"),
    ("MY", "Malaysia"),
    ("NZ", "New Zealand"),
];

const GLOBE: &str = "\u{1F30D}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("region code must be two ASCII letters, got {0:?}")]
pub struct RegionCodeError(pub String);

/// ISO 3166-1 alpha-2 code, stored uppercase. `ZZ` stands for unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode([u8; 2]);

impl RegionCode {
    pub const UNKNOWN: RegionCode = RegionCode(*b"ZZ");

    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII letters by construction.
        std::str::from_utf8(&self.0).unwrap_or("ZZ")
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// English name for the regions the leaderboard labels; `None` otherwise.
    pub fn name(&self) -> Option<&'static str> {
        KNOWN_REGIONS
            .iter()
            .find(|(code, _)| *code == self.as_str())
            .map(|(_, name)| *name)
    }

    /// Regional-indicator flag for labelled regions, a globe for the rest.
    pub fn flag(&self) -> String {
        if self.name().is_none() {
            return GLOBE.to_string();
        }
        self.0
            .iter()
            .filter_map(|byte| char::from_u32(0x1F1E6 + u32::from(byte - b'A')))
            .collect()
    }

    /// Extracts the territory from a POSIX or BCP 47 locale such as
    /// `ko_KR.UTF-8` or `en-US`.
    pub fn from_locale(locale: &str) -> Option<RegionCode> {
        let without_encoding = locale.split(['.', '@']).next()?;
        let territory = without_encoding.split(['_', '-']).nth(1)?;
        territory.parse().ok()
    }
}

impl Default for RegionCode {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl FromStr for RegionCode {
    type Err = RegionCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.as_bytes() {
            [first, second] if first.is_ascii_alphabetic() && second.is_ascii_alphabetic() => Ok(
                RegionCode([first.to_ascii_uppercase(), second.to_ascii_uppercase()]),
            ),
            _ => Err(RegionCodeError(value.to_string())),
        }
    }
}

impl TryFrom<String> for RegionCode {
    type Error = RegionCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uppercases_and_rejects_bad_input() {
        assert_eq!("kr".parse::<RegionCode>().map(|c| c.to_string()), Ok("KR".to_string()));
        assert!("K".parse::<RegionCode>().is_err());
        assert!("KOR".parse::<RegionCode>().is_err());
        assert!("1A".parse::<RegionCode>().is_err());
    }

    #[test]
    fn locale_territory_is_extracted() {
        assert_eq!(
            RegionCode::from_locale("ko_KR.UTF-8").map(|c| c.to_string()),
            Some("KR".to_string())
        );
        assert_eq!(
            RegionCode::from_locale("en-us").map(|c| c.to_string()),
            Some("US".to_string())
        );
        assert_eq!(RegionCode::from_locale("C"), None);
        assert_eq!(RegionCode::from_locale("POSIX"), None);
    }

    #[test]
    fn known_regions_have_flag_and_name() {
        let korea: RegionCode = "KR".parse().expect("code");
        assert_eq!(korea.name(), Some("South Korea"));
        assert_eq!(korea.flag(), "\u{1F1F0}\u{1F1F7}");
    }

    #[test]
    fn unknown_regions_show_globe() {
        assert_eq!(RegionCode::UNKNOWN.flag(), GLOBE);
        assert!(RegionCode::UNKNOWN.is_unknown());
        let elsewhere: RegionCode = "AQ".parse().expect("code");
        assert_eq!(elsewhere.name(), None);
        assert_eq!(elsewhere.flag(), GLOBE);
    }

    #[test]
    fn serde_uses_plain_string() {
        let code: RegionCode = "jp".parse().expect("code");
        let json = serde_json::to_string(&code).expect("serialize");
        assert_eq!(json, "\"JP\"");
        let back: RegionCode = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, code);
        assert!(serde_json::from_str::<RegionCode>("\"JPN\"").is_err());
    }
}
