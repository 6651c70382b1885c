//! Common types for Sendlater

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for work items
pub type WorkItemId = Uuid;

/// Unique identifier for follow-up rules
pub type RuleId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Where a delivered message originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    Scheduled,
    Bulk,
    Manual,
    Followup,
}

impl std::fmt::Display for SourceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceChannel::Scheduled => write!(f, "scheduled"),
            SourceChannel::Bulk => write!(f, "bulk"),
            SourceChannel::Manual => write!(f, "manual"),
            SourceChannel::Followup => write!(f, "followup"),
        }
    }
}

impl std::str::FromStr for SourceChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SourceChannel::Scheduled),
            "bulk" => Ok(SourceChannel::Bulk),
            "manual" => Ok(SourceChannel::Manual),
            "followup" => Ok(SourceChannel::Followup),
            _ => Err(format!("Invalid source channel: {}", s)),
        }
    }
}

/// Email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    pub local: String,
    pub domain: String,
}

impl EmailAddress {
    /// Parse an email address from a string
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.splitn(2, '@').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            Some(Self {
                local: parts[0].to_string(),
                domain: parts[1].to_string(),
            })
        } else {
            None
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation("Invalid email address".to_string()))
    }
}

/// Split a comma-separated free-text recipient field into trimmed
/// addresses, dropping empty entries
pub fn split_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_address_parse() {
        let email = EmailAddress::parse("user@example.com").unwrap();
        assert_eq!(email.local, "user");
        assert_eq!(email.domain, "example.com");
        assert_eq!(email.to_string(), "user@example.com");
    }

    #[test]
    fn test_email_address_invalid() {
        assert!(EmailAddress::parse("invalid").is_none());
        assert!(EmailAddress::parse("@example.com").is_none());
        assert!(EmailAddress::parse("user@").is_none());
    }

    #[test]
    fn test_split_address_list() {
        assert_eq!(
            split_address_list("a@x.com, b@y.com ,,  c@z.com"),
            vec!["a@x.com", "b@y.com", "c@z.com"]
        );
        assert!(split_address_list("  ").is_empty());
        assert!(split_address_list("").is_empty());
    }

    #[test]
    fn test_source_channel_roundtrip() {
        assert_eq!(SourceChannel::Bulk.to_string(), "bulk");
        assert_eq!("followup".parse::<SourceChannel>().unwrap(), SourceChannel::Followup);
        assert!("smoke-signal".parse::<SourceChannel>().is_err());
    }
}
