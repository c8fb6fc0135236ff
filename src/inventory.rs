use crate::directory::{codec, DirectoryConnection, DirectoryConnector, DirectoryError};
use crate::model::HostRecord;
use tracing::{error, info, warn};

pub const DEFAULT_HOST_FILTER: &str = "(objectClass=computer)";

const ATTR_DNS_HOST_NAME: &str = "dNSHostName";
const ATTR_OPERATING_SYSTEM: &str = "operatingSystem";

/// Lists the machine objects of a domain. Every call opens, uses and releases
/// its own directory connection.
pub struct HostInventory<C: DirectoryConnector> {
    connector: C,
    domain: String,
    domain_controller: String,
    base_path: String,
    host_filter: String,
}

impl<C: DirectoryConnector> HostInventory<C> {
    pub fn new(connector: C, domain: &str, domain_controller: &str) -> Self {
        let base_path = codec::domain_to_base_path(domain);
        info!(
            domain = domain,
            domain_controller = domain_controller,
            base_path = %base_path,
            "Host inventory initialized"
        );
        Self {
            connector,
            domain: domain.to_string(),
            domain_controller: domain_controller.to_string(),
            base_path,
            host_filter: DEFAULT_HOST_FILTER.to_string(),
        }
    }

    pub fn with_host_filter(mut self, filter: &str) -> Self {
        self.host_filter = filter.to_string();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Every machine object with a DNS host name. Failures are logged and
    /// produce an empty list.
    pub fn list_hosts(&self) -> Vec<HostRecord> {
        match self.query_hosts() {
            Ok(hosts) => {
                info!("Total {} computers found.", hosts.len());
                hosts
            }
            Err(err) => {
                error!("Computer search failed: {}", err);
                Vec::new()
            }
        }
    }

    /// Operating system of one host by its short name, `None` when the host is
    /// unknown, has no OS value, or the directory could not be queried.
    pub fn get_operating_system(&self, short_name: &str) -> Option<String> {
        let filter = format!(
            "(&(objectClass=computer)(cn={}))",
            ldap3::ldap_escape(short_name)
        );
        let result = self.open().and_then(|mut conn| {
            conn.search(&self.base_path, &filter, &[ATTR_OPERATING_SYSTEM])
        });
        match result {
            Ok(rs) => rs.attribute_values(ATTR_OPERATING_SYSTEM).into_iter().next(),
            Err(err) => {
                warn!("Operating system lookup for {} failed: {}", short_name, err);
                None
            }
        }
    }

    fn query_hosts(&self) -> Result<Vec<HostRecord>, DirectoryError> {
        let mut conn = self.open()?;
        let rs = conn.search(
            &self.base_path,
            &self.host_filter,
            &[ATTR_DNS_HOST_NAME, ATTR_OPERATING_SYSTEM],
        )?;

        let hosts = rs
            .entries()
            .iter()
            .filter_map(|entry| {
                let fqdn = entry.first(ATTR_DNS_HOST_NAME)?;
                Some(HostRecord::new(
                    fqdn,
                    &self.domain,
                    entry.first(ATTR_OPERATING_SYSTEM),
                ))
            })
            .collect();
        Ok(hosts)
    }

    fn open(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let mut conn = self.connector.connect(&self.domain_controller)?;
        if let Err(err) = conn.authenticate() {
            error!(
                "LDAP connection could not be established: {}",
                conn.last_error()
            );
            return Err(err);
        }
        Ok(conn)
    }
}
