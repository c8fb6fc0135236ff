use crate::directory::LdapSettings;
use crate::error::Error;
use crate::inventory::DEFAULT_HOST_FILTER;
use crate::scheduler::{self, DEFAULT_WORKERS};
use crate::session::probe::{ReachabilityProbe, DEFAULT_PROBE_PORT};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_NAME: &str = "UserScanner";
const ENV_PREFIX: &str = "USER_SCANNER";

/// Values read from the optional configuration file and the environment.
/// Everything here can be overridden on the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub domain: Option<String>,
    pub domain_controller: Option<String>,
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub ldap_timeout_secs: u64,
    pub probe_port: u16,
    pub probe_timeout_ms: u64,
    pub skip_probe: bool,
    pub host_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            domain: None,
            domain_controller: None,
            output: None,
            threads: None,
            ldap_timeout_secs: 30,
            probe_port: DEFAULT_PROBE_PORT,
            probe_timeout_ms: 3000,
            skip_probe: false,
            host_filter: None,
        }
    }
}

/// Load `UserScanner.{toml,json,yaml,...}` from the working directory if present
/// (or the explicit `path`, which must exist), then `USER_SCANNER_*` variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name(CONFIG_NAME).required(false),
    };
    let builder = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Command-line values; `Some` wins over the configuration.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub domain: Option<String>,
    pub domain_controller: Option<String>,
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub no_probe: bool,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub domain: String,
    pub domain_controller: String,
    pub output: Option<PathBuf>,
    pub threads: usize,
    pub ldap: LdapSettings,
    pub probe: Option<ReachabilityProbe>,
    pub host_filter: String,
}

impl ScanSettings {
    pub fn resolve(config: &AppConfig, overrides: &SettingsOverrides) -> Result<Self, Error> {
        let domain = pick(&overrides.domain, &config.domain)
            .ok_or_else(|| Error::Settings("Domain name not specified (-d or --domain)".into()))?;
        let domain_controller = pick(&overrides.domain_controller, &config.domain_controller)
            .ok_or_else(|| {
                Error::Settings("Domain controller not specified (-c or --dc)".into())
            })?;

        let threads = scheduler::clamp_workers(
            overrides
                .threads
                .or(config.threads)
                .unwrap_or(DEFAULT_WORKERS),
        );

        let probe = if overrides.no_probe || config.skip_probe {
            None
        } else {
            Some(ReachabilityProbe::new(
                config.probe_port,
                Duration::from_millis(config.probe_timeout_ms),
            ))
        };

        Ok(Self {
            domain,
            domain_controller,
            output: overrides.output.clone().or_else(|| config.output.clone()),
            threads,
            ldap: LdapSettings {
                timeout: Duration::from_secs(config.ldap_timeout_secs.max(1)),
            },
            probe,
            host_filter: config
                .host_filter
                .clone()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST_FILTER.to_string()),
        })
    }

    pub fn require_output(&self) -> Result<&Path, Error> {
        self.output
            .as_deref()
            .ok_or_else(|| Error::Settings("Output file not specified (-o or --output)".into()))
    }
}

fn pick(first: &Option<String>, second: &Option<String>) -> Option<String> {
    first
        .iter()
        .chain(second.iter())
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
