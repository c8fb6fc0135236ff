use crate::directory::codec;

/// Placeholder used when a directory entry carries no operating system value.
pub const UNKNOWN_OS: &str = "Unknown";

/// A machine object as listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub fully_qualified_name: String,
    pub short_name: String,
    pub operating_system: String,
}

impl HostRecord {
    pub fn new(fully_qualified_name: &str, domain: &str, operating_system: Option<&str>) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.to_string(),
            short_name: codec::extract_short_name(fully_qualified_name, domain),
            operating_system: operating_system.unwrap_or(UNKNOWN_OS).to_string(),
        }
    }
}

/// One active session on a host, resolved to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Session-owner token as surfaced by the host (a SID string).
    pub raw_identifier: String,
    pub account_name: String,
    pub account_domain: String,
}

impl SessionIdentity {
    pub fn new(raw_identifier: &str, account_name: &str, account_domain: &str) -> Self {
        Self {
            raw_identifier: raw_identifier.to_string(),
            account_name: account_name.to_string(),
            account_domain: account_domain.to_string(),
        }
    }

    /// `DOMAIN\account`
    pub fn full_identity(&self) -> String {
        format!("{}\\{}", self.account_domain, self.account_name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_hosts: usize,
    pub hosts_with_sessions: usize,
    pub total_sessions: usize,
}
