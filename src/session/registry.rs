use super::{ReachabilityProbe, ResolvedAccount, SessionKeys, SessionStore, SessionStoreError};
use crate::platform::{self, UsersHive};

/// Session store backed by the remote registry: every subkey of a host's
/// `HKEY_USERS` hive is named after the SID of a loaded user profile.
#[derive(Debug, Clone, Default)]
pub struct RemoteRegistry {
    probe: Option<ReachabilityProbe>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, probe: ReachabilityProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn probe(&self) -> Option<&ReachabilityProbe> {
        self.probe.as_ref()
    }
}

impl SessionKeys for UsersHive {
    fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError> {
        UsersHive::next_subkey(self)
    }
}

impl SessionStore for RemoteRegistry {
    type Keys = UsersHive;

    fn connect(&self, host: &str) -> Result<UsersHive, SessionStoreError> {
        if let Some(probe) = &self.probe {
            probe
                .check(host)
                .map_err(|source| SessionStoreError::Unreachable {
                    host: host.to_string(),
                    source,
                })?;
        }
        platform::open_users_hive(host)
    }

    fn resolve(&self, host: &str, token: &str) -> Result<ResolvedAccount, SessionStoreError> {
        if !platform::looks_like_sid(token) {
            return Err(SessionStoreError::InvalidToken {
                token: token.to_string(),
            });
        }
        platform::lookup_account_sid(host, token)
    }
}
