#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use user_scanner::directory::{
    DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError, ResultSet,
};
use user_scanner::session::{
    AccountKind, ResolvedAccount, SessionKeys, SessionStore, SessionStoreError,
};

pub const DOMAIN: &str = "example.com";
pub const DOMAIN_CONTROLLER: &str = "dc.example.com";

/// Where a scripted directory should fail, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Connect,
    Auth,
    Search,
}

/// Search log shared between a [`FakeDirectory`] and its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub base_path: String,
    pub filter: String,
    pub attributes: Vec<String>,
}

#[derive(Clone)]
pub struct FakeDirectory {
    failure: Failure,
    entries: Vec<DirectoryEntry>,
    pub searches: Arc<Mutex<Vec<SearchCall>>>,
    pub connections: Arc<Mutex<usize>>,
}

impl FakeDirectory {
    pub fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            failure: Failure::None,
            entries,
            searches: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure,
            ..Self::with_entries(Vec::new())
        }
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.searches.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> usize {
        *self.connections.lock().unwrap()
    }
}

impl DirectoryConnector for FakeDirectory {
    fn connect(&self, address: &str) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        if self.failure == Failure::Connect {
            return Err(DirectoryError::Connect {
                address: address.to_string(),
                message: "connection refused".to_string(),
            });
        }
        *self.connections.lock().unwrap() += 1;
        Ok(Box::new(FakeConnection {
            failure: self.failure,
            entries: self.entries.clone(),
            searches: Arc::clone(&self.searches),
            last_error_code: 0,
        }))
    }
}

struct FakeConnection {
    failure: Failure,
    entries: Vec<DirectoryEntry>,
    searches: Arc<Mutex<Vec<SearchCall>>>,
    last_error_code: u32,
}

impl DirectoryConnection for FakeConnection {
    fn authenticate(&mut self) -> Result<(), DirectoryError> {
        if self.failure == Failure::Auth {
            self.last_error_code = 49;
            return Err(DirectoryError::Auth {
                code: 49,
                message: "invalid credentials".to_string(),
            });
        }
        Ok(())
    }

    fn search(
        &mut self,
        base_path: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<ResultSet, DirectoryError> {
        self.searches.lock().unwrap().push(SearchCall {
            base_path: base_path.to_string(),
            filter: filter.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        });
        if self.failure == Failure::Search {
            self.last_error_code = 32;
            return Err(DirectoryError::Search {
                code: 32,
                base_path: base_path.to_string(),
                filter: filter.to_string(),
                message: "no such object".to_string(),
            });
        }

        // Only (cn=NAME) equality is understood beyond "return everything".
        let wanted_cn = filter
            .split("(cn=")
            .nth(1)
            .and_then(|rest| rest.split(')').next())
            .map(str::to_string);
        let entries = self
            .entries
            .iter()
            .filter(|entry| match &wanted_cn {
                Some(cn) => entry
                    .first("cn")
                    .map(|value| value.eq_ignore_ascii_case(cn))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();
        Ok(ResultSet::new(entries))
    }

    fn last_error_code(&self) -> u32 {
        self.last_error_code
    }
}

pub fn computer(cn: &str, dns_host_name: Option<&str>, os: Option<&str>) -> DirectoryEntry {
    let mut entry = DirectoryEntry::new(&format!("CN={},CN=Computers,DC=example,DC=com", cn))
        .with_values("cn", &[cn]);
    if let Some(name) = dns_host_name {
        entry = entry.with_values("dNSHostName", &[name]);
    }
    if let Some(os) = os {
        entry = entry.with_values("operatingSystem", &[os]);
    }
    entry
}

/// What a host's session store looks like.
#[derive(Debug, Clone)]
pub enum HostScript {
    Unreachable,
    Tokens(Vec<String>),
    Panics,
}

/// In-memory session store. Tokens resolve through `accounts`; anything
/// missing there fails resolution.
#[derive(Default)]
pub struct FakeSessionStore {
    hosts: HashMap<String, HostScript>,
    accounts: HashMap<String, (String, String)>,
}

impl FakeSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, name: &str, tokens: &[&str]) -> Self {
        self.hosts.insert(
            name.to_string(),
            HostScript::Tokens(tokens.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn unreachable(mut self, name: &str) -> Self {
        self.hosts.insert(name.to_string(), HostScript::Unreachable);
        self
    }

    pub fn panicking(mut self, name: &str) -> Self {
        self.hosts.insert(name.to_string(), HostScript::Panics);
        self
    }

    pub fn account(mut self, token: &str, domain: &str, name: &str) -> Self {
        self.accounts
            .insert(token.to_string(), (name.to_string(), domain.to_string()));
        self
    }
}

pub struct FakeKeys {
    tokens: std::vec::IntoIter<String>,
}

impl SessionKeys for FakeKeys {
    fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.tokens.next())
    }
}

impl SessionStore for FakeSessionStore {
    type Keys = FakeKeys;

    fn connect(&self, host: &str) -> Result<FakeKeys, SessionStoreError> {
        match self.hosts.get(host) {
            Some(HostScript::Tokens(tokens)) => Ok(FakeKeys {
                tokens: tokens.clone().into_iter(),
            }),
            Some(HostScript::Panics) => panic!("scripted panic for {}", host),
            Some(HostScript::Unreachable) | None => Err(SessionStoreError::Connect {
                host: host.to_string(),
                code: 53,
            }),
        }
    }

    fn resolve(&self, host: &str, token: &str) -> Result<ResolvedAccount, SessionStoreError> {
        match self.accounts.get(token) {
            Some((name, domain)) => Ok(ResolvedAccount {
                name: name.clone(),
                domain: domain.clone(),
                kind: AccountKind::User,
            }),
            None => Err(SessionStoreError::Resolve {
                host: host.to_string(),
                token: token.to_string(),
                code: 1332,
            }),
        }
    }
}

/// Report body without the byte-order mark.
pub fn report_text(bytes: &[u8]) -> String {
    assert!(bytes.starts_with(user_scanner::report::UTF8_BOM));
    String::from_utf8(bytes[user_scanner::report::UTF8_BOM.len()..].to_vec()).unwrap()
}
