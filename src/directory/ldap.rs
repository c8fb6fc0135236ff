use super::{
    DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError, ResultSet, SUCCESS,
};
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{LdapConn, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_LDAP_PORT: u16 = 389;
const SEARCH_PAGE_SIZE: i32 = 500;

/// Code reported when the failure happened below the protocol (socket, TLS).
const SERVER_DOWN: u32 = 81;
const TIMEOUT: u32 = 85;
#[cfg(not(any(feature = "gssapi", windows)))]
const AUTH_METHOD_NOT_SUPPORTED: u32 = 7;

#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Applied to connection setup and to every subsequent operation.
    pub timeout: Duration,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LdapConnector {
    settings: LdapSettings,
}

impl LdapConnector {
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }
}

impl DirectoryConnector for LdapConnector {
    fn connect(&self, address: &str) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let url = ldap_url(address);
        let conn_settings = LdapConnSettings::new().set_conn_timeout(self.settings.timeout);

        let conn = LdapConn::with_settings(conn_settings, &url).map_err(|e| {
            DirectoryError::Connect {
                address: address.to_string(),
                message: e.to_string(),
            }
        })?;

        debug!("LDAP connection established: {}", url);
        Ok(Box::new(LdapClient {
            conn,
            host: host_part(address).to_string(),
            timeout: self.settings.timeout,
            last_error_code: 0,
        }))
    }
}

/// One physical LDAP connection. Unbound on drop.
pub struct LdapClient {
    conn: LdapConn,
    host: String,
    // ldap3 consumes the timeout with the operation it precedes, so it is
    // re-armed before every call.
    timeout: Duration,
    last_error_code: u32,
}

impl LdapClient {
    /// Kerberos bind with the caller's ticket (SSPI on Windows). The timeout
    /// covers the first leg of the exchange.
    #[cfg(any(feature = "gssapi", windows))]
    fn bind(&mut self) -> Result<(), DirectoryError> {
        let host = self.host.clone();
        self.conn
            .with_timeout(self.timeout)
            .sasl_gssapi_bind(&host)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|err| DirectoryError::Auth {
                code: result_code(&err),
                message: err.to_string(),
            })
    }

    #[cfg(not(any(feature = "gssapi", windows)))]
    fn bind(&mut self) -> Result<(), DirectoryError> {
        Err(DirectoryError::Auth {
            code: AUTH_METHOD_NOT_SUPPORTED,
            message: "no negotiated authentication mechanism in this build (enable the `gssapi` feature)"
                .to_string(),
        })
    }

    fn paged_search(
        &mut self,
        base_path: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, LdapError> {
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(SEARCH_PAGE_SIZE)),
        ];
        let mut search = self.conn.with_timeout(self.timeout).streaming_search_with(
            adapters,
            base_path,
            Scope::Subtree,
            filter,
            attributes.to_vec(),
        )?;

        let mut entries = Vec::new();
        while let Some(entry) = search.next()? {
            let entry = SearchEntry::construct(entry);
            entries.push(DirectoryEntry {
                dn: entry.dn,
                attrs: entry.attrs,
            });
        }
        search.result().success()?;
        Ok(entries)
    }
}

impl DirectoryConnection for LdapClient {
    fn authenticate(&mut self) -> Result<(), DirectoryError> {
        let result = self.bind();
        self.last_error_code = match &result {
            Ok(()) => {
                info!("LDAP bind successful: {}", self.host);
                SUCCESS
            }
            Err(err) => err.code().unwrap_or(SERVER_DOWN),
        };
        result
    }

    fn search(
        &mut self,
        base_path: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<ResultSet, DirectoryError> {
        match self.paged_search(base_path, filter, attributes) {
            Ok(entries) => {
                self.last_error_code = 0;
                info!("{} results found.", entries.len());
                Ok(ResultSet::new(entries))
            }
            Err(err) => {
                self.last_error_code = result_code(&err);
                Err(DirectoryError::Search {
                    code: self.last_error_code,
                    base_path: base_path.to_string(),
                    filter: filter.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    fn last_error_code(&self) -> u32 {
        self.last_error_code
    }
}

impl Drop for LdapClient {
    fn drop(&mut self) {
        if let Err(e) = self.conn.with_timeout(self.timeout).unbind() {
            debug!("LDAP unbind from {} failed: {}", self.host, e);
        }
    }
}

fn result_code(err: &LdapError) -> u32 {
    match err {
        LdapError::LdapResult { result } => result.rc,
        LdapError::Timeout { .. } => TIMEOUT,
        _ => SERVER_DOWN,
    }
}

/// Accepts `dc.example.com`, `dc.example.com:3268` or a full `ldap://`/`ldaps://` URL.
pub fn ldap_url(address: &str) -> String {
    if address.contains("://") {
        return address.to_string();
    }
    if address.contains(':') {
        format!("ldap://{}", address)
    } else {
        format!("ldap://{}:{}", address, DEFAULT_LDAP_PORT)
    }
}

/// Host portion of an address, used as the Kerberos service host.
fn host_part(address: &str) -> &str {
    let without_scheme = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    authority.split(':').next().unwrap_or(authority)
}
