pub mod probe;
pub mod registry;

use crate::model::SessionIdentity;
use std::io;
use thiserror::Error;
use tracing::{debug, trace};

pub use probe::ReachabilityProbe;
pub use registry::RemoteRegistry;

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("host {host} is not reachable: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot open the session store on {host} (code {code})")]
    Connect { host: String, code: i32 },

    #[error("enumerating sessions on {host} failed (code {code})")]
    Enumerate { host: String, code: i32 },

    #[error("'{token}' is not a session-owner token")]
    InvalidToken { token: String },

    #[error("cannot resolve {token} on {host} (code {code})")]
    Resolve { host: String, token: String, code: u32 },

    #[error("remote session stores are not supported on this platform")]
    Unsupported,
}

/// Account classification reported by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Group,
    Domain,
    Alias,
    WellKnownGroup,
    DeletedAccount,
    Invalid,
    Unknown,
    Computer,
    Label,
    LogonSession,
}

impl AccountKind {
    /// Map a `SID_NAME_USE` value.
    pub fn from_sid_name_use(value: u32) -> Self {
        match value {
            1 => AccountKind::User,
            2 => AccountKind::Group,
            3 => AccountKind::Domain,
            4 => AccountKind::Alias,
            5 => AccountKind::WellKnownGroup,
            6 => AccountKind::DeletedAccount,
            7 => AccountKind::Invalid,
            9 => AccountKind::Computer,
            10 => AccountKind::Label,
            11 => AccountKind::LogonSession,
            _ => AccountKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub name: String,
    pub domain: String,
    pub kind: AccountKind,
}

/// Cursor over the session-owner tokens of one host. Dropping it releases the
/// underlying store handle.
pub trait SessionKeys {
    fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError>;
}

/// A per-host session registry that can be opened remotely.
pub trait SessionStore: Send + Sync {
    type Keys: SessionKeys;

    fn connect(&self, host: &str) -> Result<Self::Keys, SessionStoreError>;

    /// Resolve a token using `host` as the resolution authority.
    fn resolve(&self, host: &str, token: &str) -> Result<ResolvedAccount, SessionStoreError>;
}

/// Outcome of scanning one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    /// The store could not be opened.
    Unavailable { reason: String },
    /// The store was opened; may hold zero sessions.
    Found(Vec<SessionIdentity>),
}

impl SessionLookup {
    pub fn is_available(&self) -> bool {
        matches!(self, SessionLookup::Found(_))
    }

    pub fn sessions(&self) -> &[SessionIdentity] {
        match self {
            SessionLookup::Unavailable { .. } => &[],
            SessionLookup::Found(sessions) => sessions.as_slice(),
        }
    }

    pub fn into_sessions(self) -> Vec<SessionIdentity> {
        match self {
            SessionLookup::Unavailable { .. } => Vec::new(),
            SessionLookup::Found(sessions) => sessions,
        }
    }
}

pub struct SessionEnumerator<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> SessionEnumerator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active sessions on `host`. Never fails: an unreachable host is
    /// `Unavailable`, unresolvable entries are skipped.
    pub fn enumerate_sessions(&self, host: &str) -> SessionLookup {
        let mut keys = match self.store.connect(host) {
            Ok(keys) => keys,
            Err(err) => {
                debug!("{}", err);
                return SessionLookup::Unavailable {
                    reason: err.to_string(),
                };
            }
        };

        let mut sessions = Vec::new();
        loop {
            let token = match keys.next_subkey() {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(err) => {
                    debug!("{}; keeping {} sessions", err, sessions.len());
                    break;
                }
            };

            match self.store.resolve(host, &token) {
                Ok(account) => {
                    trace!(
                        host = host,
                        token = %token,
                        kind = ?account.kind,
                        "Resolved {}\\{}",
                        account.domain,
                        account.name
                    );
                    sessions.push(SessionIdentity::new(&token, &account.name, &account.domain));
                }
                Err(err) => trace!("Skipping session: {}", err),
            }
        }

        SessionLookup::Found(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedKeys {
        keys: std::vec::IntoIter<Result<String, i32>>,
        released: Arc<AtomicUsize>,
    }

    impl SessionKeys for ScriptedKeys {
        fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError> {
            match self.keys.next() {
                Some(Ok(key)) => Ok(Some(key)),
                Some(Err(code)) => Err(SessionStoreError::Enumerate {
                    host: "scripted".to_string(),
                    code,
                }),
                None => Ok(None),
            }
        }
    }

    impl Drop for ScriptedKeys {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ScriptedStore {
        hosts: HashMap<String, Vec<Result<String, i32>>>,
        accounts: HashMap<String, (String, String)>,
        released: Arc<AtomicUsize>,
    }

    impl ScriptedStore {
        fn host(mut self, name: &str, keys: Vec<Result<&str, i32>>) -> Self {
            self.hosts.insert(
                name.to_string(),
                keys.into_iter().map(|k| k.map(str::to_string)).collect(),
            );
            self
        }

        fn account(mut self, sid: &str, domain: &str, name: &str) -> Self {
            self.accounts
                .insert(sid.to_string(), (domain.to_string(), name.to_string()));
            self
        }
    }

    impl SessionStore for ScriptedStore {
        type Keys = ScriptedKeys;

        fn connect(&self, host: &str) -> Result<ScriptedKeys, SessionStoreError> {
            let keys = self.hosts.get(host).ok_or(SessionStoreError::Connect {
                host: host.to_string(),
                code: 53,
            })?;
            Ok(ScriptedKeys {
                keys: keys.clone().into_iter(),
                released: Arc::clone(&self.released),
            })
        }

        fn resolve(&self, host: &str, token: &str) -> Result<ResolvedAccount, SessionStoreError> {
            let (domain, name) = self.accounts.get(token).ok_or(SessionStoreError::Resolve {
                host: host.to_string(),
                token: token.to_string(),
                code: 1332,
            })?;
            Ok(ResolvedAccount {
                name: name.clone(),
                domain: domain.clone(),
                kind: AccountKind::User,
            })
        }
    }

    #[test]
    fn test_unreachable_host_is_unavailable() {
        let enumerator = SessionEnumerator::new(ScriptedStore::default());
        let lookup = enumerator.enumerate_sessions("gone.example.com");
        assert!(!lookup.is_available());
        assert!(lookup.sessions().is_empty());
    }

    #[test]
    fn test_unresolvable_entries_are_skipped() {
        let store = ScriptedStore::default()
            .host(
                "pc1.example.com",
                vec![
                    Ok(".DEFAULT"),
                    Ok("S-1-5-21-1-1001"),
                    Ok("S-1-5-21-1-1001_Classes"),
                    Ok("S-1-5-21-1-1002"),
                ],
            )
            .account("S-1-5-21-1-1001", "EXAMPLE", "alice")
            .account("S-1-5-21-1-1002", "EXAMPLE", "bob");
        let enumerator = SessionEnumerator::new(store);

        let sessions = enumerator.enumerate_sessions("pc1.example.com").into_sessions();
        assert_eq!(
            sessions,
            vec![
                SessionIdentity::new("S-1-5-21-1-1001", "alice", "EXAMPLE"),
                SessionIdentity::new("S-1-5-21-1-1002", "bob", "EXAMPLE"),
            ]
        );
    }

    #[test]
    fn test_enumeration_failure_keeps_collected_sessions() {
        let store = ScriptedStore::default()
            .host("pc1.example.com", vec![Ok("S-1-5-18"), Err(5), Ok("S-1-5-21-1-1001")])
            .account("S-1-5-18", "NT AUTHORITY", "SYSTEM")
            .account("S-1-5-21-1-1001", "EXAMPLE", "alice");
        let enumerator = SessionEnumerator::new(store);

        let lookup = enumerator.enumerate_sessions("pc1.example.com");
        assert!(lookup.is_available());
        assert_eq!(lookup.sessions().len(), 1);
        assert_eq!(lookup.sessions()[0].full_identity(), "NT AUTHORITY\\SYSTEM");
    }

    #[test]
    fn test_reachable_host_without_sessions_is_found_and_empty() {
        let store = ScriptedStore::default().host("pc1.example.com", vec![]);
        let enumerator = SessionEnumerator::new(store);
        assert_eq!(
            enumerator.enumerate_sessions("pc1.example.com"),
            SessionLookup::Found(vec![])
        );
    }

    #[test]
    fn test_handle_released_on_every_path() {
        let store = ScriptedStore::default()
            .host("ok.example.com", vec![Ok("S-1-5-18")])
            .host("broken.example.com", vec![Err(5)]);
        let released = Arc::clone(&store.released);
        let enumerator = SessionEnumerator::new(store);

        enumerator.enumerate_sessions("ok.example.com");
        enumerator.enumerate_sessions("broken.example.com");
        enumerator.enumerate_sessions("missing.example.com");
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_account_kind_mapping() {
        assert_eq!(AccountKind::from_sid_name_use(1), AccountKind::User);
        assert_eq!(AccountKind::from_sid_name_use(5), AccountKind::WellKnownGroup);
        assert_eq!(AccountKind::from_sid_name_use(9), AccountKind::Computer);
        assert_eq!(AccountKind::from_sid_name_use(42), AccountKind::Unknown);
    }
}
