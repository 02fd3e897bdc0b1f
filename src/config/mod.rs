//! Configuration for the conversations core
//!
//! A TOML file with defaulted fields, so an embedding application can ship
//! no config at all and still get sane behavior.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::error::Result;

/// Which set of messages counts against a user's quota.
///
/// `Stored` charges users for what sits in their own mailbox; `Authored`
/// charges for what they wrote, regardless of whose mailboxes the copies
/// live in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaScope {
    #[default]
    Stored,
    Authored,
}

/// Runtime settings for the private-messaging subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmConfig {
    /// Maximum stored messages per user; 0 disables the quota entirely.
    #[serde(default = "default_message_quota")]
    pub message_quota: u64,

    /// Fixed page size for inbox and archive listings.
    #[serde(default = "default_conversations_per_page")]
    pub conversations_per_page: u32,

    /// Which messages count against the quota.
    #[serde(default)]
    pub quota_scope: QuotaScope,
}

fn default_message_quota() -> u64 {
    50
}

fn default_conversations_per_page() -> u32 {
    10
}

impl Default for PmConfig {
    fn default() -> Self {
        Self {
            message_quota: default_message_quota(),
            conversations_per_page: default_conversations_per_page(),
            quota_scope: QuotaScope::default(),
        }
    }
}

impl PmConfig {
    /// Load configuration from a TOML file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: PmConfig = toml::from_str(&raw)?;
        info!(
            quota = config.message_quota,
            per_page = config.conversations_per_page,
            "Loaded conversations config"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PmConfig::default();
        assert_eq!(config.message_quota, 50);
        assert_eq!(config.conversations_per_page, 10);
        assert_eq!(config.quota_scope, QuotaScope::Stored);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: PmConfig = toml::from_str("message_quota = 5").expect("Failed to parse config");
        assert_eq!(config.message_quota, 5);
        assert_eq!(config.conversations_per_page, 10);
    }

    #[test]
    fn test_quota_scope_parses_snake_case() {
        let config: PmConfig =
            toml::from_str("quota_scope = \"authored\"").expect("Failed to parse config");
        assert_eq!(config.quota_scope, QuotaScope::Authored);
    }
}
