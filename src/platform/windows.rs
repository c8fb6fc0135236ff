use crate::session::{AccountKind, ResolvedAccount, SessionStoreError};
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use winapi::shared::minwindef::{DWORD, HKEY};
use winapi::shared::sddl::ConvertStringSidToSidW;
use winapi::shared::winerror::{ERROR_INSUFFICIENT_BUFFER, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::winbase::{LocalFree, LookupAccountSidW};
use winapi::um::winnt::{PSID, SID_NAME_USE};
use winapi::um::winreg::{RegCloseKey, RegConnectRegistryW, RegEnumKeyExW, HKEY_USERS};

/// Registry key names are at most 255 characters.
const MAX_KEY_NAME: usize = 256;
const ACCOUNT_NAME_CAPACITY: usize = 256;

fn to_wide(value: &str) -> Vec<u16> {
    OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buffer: &[u16], len: usize) -> String {
    String::from_utf16_lossy(&buffer[..len.min(buffer.len())])
}

/// `HKEY_USERS` of a remote machine. Closed on drop.
pub struct UsersHive {
    key: HKEY,
    host: String,
    index: DWORD,
}

impl UsersHive {
    pub fn next_subkey(&mut self) -> Result<Option<String>, SessionStoreError> {
        let mut name = [0u16; MAX_KEY_NAME];
        let mut name_len = MAX_KEY_NAME as DWORD;

        let status = unsafe {
            RegEnumKeyExW(
                self.key,
                self.index,
                name.as_mut_ptr(),
                &mut name_len,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };

        match status as DWORD {
            ERROR_SUCCESS => {
                self.index += 1;
                Ok(Some(from_wide(&name, name_len as usize)))
            }
            ERROR_NO_MORE_ITEMS => Ok(None),
            code => Err(SessionStoreError::Enumerate {
                host: self.host.clone(),
                code: code as i32,
            }),
        }
    }
}

impl Drop for UsersHive {
    fn drop(&mut self) {
        unsafe {
            RegCloseKey(self.key);
        }
    }
}

pub fn open_users_hive(host: &str) -> Result<UsersHive, SessionStoreError> {
    let machine = to_wide(host);
    let mut key: HKEY = ptr::null_mut();

    let status = unsafe { RegConnectRegistryW(machine.as_ptr(), HKEY_USERS, &mut key) };
    if status as DWORD != ERROR_SUCCESS {
        return Err(SessionStoreError::Connect {
            host: host.to_string(),
            code: status,
        });
    }

    Ok(UsersHive {
        key,
        host: host.to_string(),
        index: 0,
    })
}

/// Binary SID allocated by `ConvertStringSidToSidW`, freed on drop.
struct LocalSid(PSID);

impl LocalSid {
    fn parse(token: &str) -> Result<Self, SessionStoreError> {
        let wide = to_wide(token);
        let mut sid: PSID = ptr::null_mut();
        let ok = unsafe { ConvertStringSidToSidW(wide.as_ptr(), &mut sid) };
        if ok == 0 || sid.is_null() {
            return Err(SessionStoreError::InvalidToken {
                token: token.to_string(),
            });
        }
        Ok(LocalSid(sid))
    }
}

impl Drop for LocalSid {
    fn drop(&mut self) {
        unsafe {
            LocalFree(self.0 as _);
        }
    }
}

pub fn lookup_account_sid(host: &str, token: &str) -> Result<ResolvedAccount, SessionStoreError> {
    let sid = LocalSid::parse(token)?;
    let system = to_wide(host);

    let mut name_capacity = ACCOUNT_NAME_CAPACITY as DWORD;
    let mut domain_capacity = ACCOUNT_NAME_CAPACITY as DWORD;

    // A second attempt is made with the sizes reported by the first one.
    for _ in 0..2 {
        let mut name = vec![0u16; name_capacity as usize];
        let mut domain = vec![0u16; domain_capacity as usize];
        let mut name_len = name_capacity;
        let mut domain_len = domain_capacity;
        let mut sid_type: SID_NAME_USE = 0;

        let ok = unsafe {
            LookupAccountSidW(
                system.as_ptr(),
                sid.0,
                name.as_mut_ptr(),
                &mut name_len,
                domain.as_mut_ptr(),
                &mut domain_len,
                &mut sid_type,
            )
        };

        if ok != 0 {
            return Ok(ResolvedAccount {
                name: from_wide(&name, name_len as usize),
                domain: from_wide(&domain, domain_len as usize),
                kind: AccountKind::from_sid_name_use(sid_type as u32),
            });
        }

        let code = unsafe { GetLastError() };
        if code != ERROR_INSUFFICIENT_BUFFER {
            return Err(SessionStoreError::Resolve {
                host: host.to_string(),
                token: token.to_string(),
                code,
            });
        }
        name_capacity = name_len.max(name_capacity);
        domain_capacity = domain_len.max(domain_capacity);
    }

    Err(SessionStoreError::Resolve {
        host: host.to_string(),
        token: token.to_string(),
        code: ERROR_INSUFFICIENT_BUFFER,
    })
}
