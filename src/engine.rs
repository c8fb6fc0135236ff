use crate::config::ScanSettings;
use crate::directory::{DirectoryConnector, LdapConnector};
use crate::error::Error;
use crate::inventory::HostInventory;
use crate::model::RunStatistics;
use crate::progress::ScanReporter;
use crate::report::ReportSink;
use crate::scheduler::WorkScheduler;
use crate::session::{RemoteRegistry, SessionEnumerator, SessionStore};
use crate::utils::stats::StatsTimer;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub statistics: RunStatistics,
    pub workers: usize,
    pub unreachable_hosts: usize,
    pub inventory_duration: Duration,
    pub scan_duration: Duration,
}

/// Inventory, fan-out and report in one run.
pub struct ScanEngine<C: DirectoryConnector, S: SessionStore> {
    inventory: HostInventory<C>,
    enumerator: SessionEnumerator<S>,
    scheduler: WorkScheduler,
}

impl ScanEngine<LdapConnector, RemoteRegistry> {
    /// Engine wired to the directory over LDAP and to the hosts' remote registries.
    pub fn from_settings(settings: &ScanSettings) -> Self {
        let inventory = HostInventory::new(
            LdapConnector::new(settings.ldap.clone()),
            &settings.domain,
            &settings.domain_controller,
        )
        .with_host_filter(&settings.host_filter);

        let registry = match settings.probe {
            Some(probe) => RemoteRegistry::new().with_probe(probe),
            None => RemoteRegistry::new(),
        };

        Self::new(inventory, SessionEnumerator::new(registry), settings.threads)
    }
}

impl<C: DirectoryConnector, S: SessionStore> ScanEngine<C, S> {
    pub fn new(inventory: HostInventory<C>, enumerator: SessionEnumerator<S>, workers: usize) -> Self {
        Self {
            inventory,
            enumerator,
            scheduler: WorkScheduler::new(workers),
        }
    }

    pub fn inventory(&self) -> &HostInventory<C> {
        &self.inventory
    }

    pub fn operating_system(&self, short_name: &str) -> Option<String> {
        self.inventory.get_operating_system(short_name)
    }

    /// Run a full scan into `sink`. The sink is closed before returning; its
    /// writer comes back with the result.
    pub fn run<W: Write + Send>(
        &self,
        sink: ReportSink<W>,
        reporter: &dyn ScanReporter,
    ) -> Result<(W, ScanResult), Error> {
        info!("Scanning computers...");
        reporter.on_inventory_start();
        let mut inventory_timer = StatsTimer::new();
        let hosts = self.inventory.list_hosts();
        inventory_timer.finish();
        reporter.on_inventory_complete(hosts.len(), inventory_timer.get_duration_secs());
        debug!("Inventory completed in {}", inventory_timer.get_duration_human());

        let mut scan_timer = StatsTimer::new();
        let summary = if hosts.is_empty() {
            warn!("No computers found.");
            Default::default()
        } else {
            info!("Collecting user information...");
            self.scheduler
                .run(&hosts, &self.enumerator, &sink, reporter)?
        };
        scan_timer.finish();

        let (writer, statistics) = sink.close()?;
        reporter.on_scan_complete(&statistics, scan_timer.get_duration_secs());
        debug!(
            "Session scan completed in {}, {} of {} computers unreachable",
            scan_timer.get_duration_string(),
            summary.unreachable_hosts,
            statistics.total_hosts
        );

        Ok((
            writer,
            ScanResult {
                statistics,
                workers: summary.workers,
                unreachable_hosts: summary.unreachable_hosts,
                inventory_duration: inventory_timer.get_duration(),
                scan_duration: scan_timer.get_duration(),
            },
        ))
    }
}
