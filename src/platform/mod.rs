#[cfg(target_os = "windows")]
pub mod windows;

use crate::session::{ResolvedAccount, SessionStoreError};

#[cfg(target_os = "windows")]
pub use windows::UsersHive;

#[cfg(target_os = "windows")]
pub fn open_users_hive(host: &str) -> Result<UsersHive, SessionStoreError> {
    windows::open_users_hive(host)
}

#[cfg(target_os = "windows")]
pub fn lookup_account_sid(host: &str, sid: &str) -> Result<ResolvedAccount, SessionStoreError> {
    windows::lookup_account_sid(host, sid)
}

/// Stand-in for the remote `HKEY_USERS` hive where the remote registry does not exist.
#[cfg(not(target_os = "windows"))]
#[derive(Debug)]
pub struct UsersHive {
    _private: (),
}

#[cfg(not(target_os = "windows"))]
impl UsersHive {
    pub fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError> {
        Ok(None)
    }
}

#[cfg(not(target_os = "windows"))]
pub fn open_users_hive(_host: &str) -> Result<UsersHive, SessionStoreError> {
    Err(SessionStoreError::Unsupported)
}

#[cfg(not(target_os = "windows"))]
pub fn lookup_account_sid(_host: &str, _sid: &str) -> Result<ResolvedAccount, SessionStoreError> {
    Err(SessionStoreError::Unsupported)
}

/// Shape check for a string SID (`S-<revision>-<authority>-<sub>...`), used to
/// skip hive keys such as `.DEFAULT` or `<sid>_Classes` before any remote call.
pub fn looks_like_sid(token: &str) -> bool {
    let mut parts = token.split('-');
    if !matches!(parts.next(), Some(s) if s.eq_ignore_ascii_case("S")) {
        return false;
    }
    let rest: Vec<&str> = parts.collect();
    rest.len() >= 2
        && rest
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
