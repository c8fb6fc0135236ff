use crate::model::{HostRecord, RunStatistics};

/// Trait for reporting scan progress.
///
/// The CLI implements it with an indicatif progress bar. Called from worker
/// threads, hence `Send + Sync`. All methods have default no-op implementations.
pub trait ScanReporter: Send + Sync {
    fn on_inventory_start(&self) {}
    fn on_inventory_complete(&self, _total_hosts: usize, _duration_secs: f64) {}
    fn on_scan_start(&self, _total_hosts: usize, _workers: usize) {}
    fn on_host_complete(&self, _host: &HostRecord, _sessions: usize, _reachable: bool) {}
    fn on_scan_complete(&self, _stats: &RunStatistics, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ScanReporter for SilentReporter {}
