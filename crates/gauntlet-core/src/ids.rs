//! Identifiers shared across contexts.
//!
//! Tenants and members are opaque to this system. Tenant ids double as file
//! name components for per-tenant storage, so they are restricted to a safe
//! character set. Events are identified by their calendar date.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_TENANT_ID_LEN: usize = 64;
const EVENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque identifier of an isolated team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the identifier is empty, longer
    /// than 64 characters, or contains anything other than ASCII
    /// alphanumerics, `-` and `_`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_TENANT_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(DomainError::Validation(format!("invalid tenant id: {raw:?}")))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Opaque identifier of a team member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Wraps a member identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calendar date identifying an event within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventDate(NaiveDate);

impl EventDate {
    /// Parses a `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventDate` if the input is empty or not a
    /// valid calendar date in that format.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidEventDate("date is empty".into()));
        }
        // chrono accepts unpadded fields; the canonical form must round-trip.
        NaiveDate::parse_from_str(trimmed, EVENT_DATE_FORMAT)
            .ok()
            .filter(|date| date.format(EVENT_DATE_FORMAT).to_string() == trimmed)
            .map(Self)
            .ok_or_else(|| DomainError::InvalidEventDate(trimmed.to_owned()))
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for EventDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(EVENT_DATE_FORMAT))
    }
}

impl FromStr for EventDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventDate {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventDate> for String {
    fn from(value: EventDate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_accepts_discord_style_snowflake() {
        let id = TenantId::parse("884213370142310411").unwrap();
        assert_eq!(id.as_str(), "884213370142310411");
    }

    #[test]
    fn test_tenant_id_rejects_path_characters() {
        assert!(TenantId::parse("../etc").is_err());
        assert!(TenantId::parse("a/b").is_err());
        assert!(TenantId::parse("").is_err());
        assert!(TenantId::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_event_date_parses_canonical_form() {
        let date = EventDate::parse("2026-03-25").unwrap();
        assert_eq!(date.to_string(), "2026-03-25");
    }

    #[test]
    fn test_event_date_rejects_empty_and_malformed_input() {
        assert!(matches!(
            EventDate::parse(""),
            Err(DomainError::InvalidEventDate(_))
        ));
        assert!(matches!(
            EventDate::parse("2026-13-01"),
            Err(DomainError::InvalidEventDate(_))
        ));
        assert!(matches!(
            EventDate::parse("2026-3-5"),
            Err(DomainError::InvalidEventDate(_))
        ));
        assert!(matches!(
            EventDate::parse("25/03/2026"),
            Err(DomainError::InvalidEventDate(_))
        ));
    }

    #[test]
    fn test_event_date_deserializes_through_validation() {
        let ok: EventDate = serde_json::from_str("\"2026-02-28\"").unwrap();
        assert_eq!(ok.to_string(), "2026-02-28");
        assert!(serde_json::from_str::<EventDate>("\"2026-02-30\"").is_err());
    }
}
