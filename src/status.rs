use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use user_scanner::{HostRecord, RunStatistics, ScanReporter};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Terminal progress for a scan.
///
/// - Inventory: spinner while the directory is queried
/// - Session scan: bar over the known host count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS)
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanReporter for CliReporter {
    fn on_inventory_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::style("{spinner:.cyan} {msg}"));
        pb.set_message("Querying directory for computers...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_inventory_complete(&self, total_hosts: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Inventory complete: {} computers in {:.2}s",
            "✓".green(),
            total_hosts,
            duration_secs
        );
    }

    fn on_scan_start(&self, total_hosts: usize, workers: usize) {
        let pb = ProgressBar::new(total_hosts as u64);
        pb.set_style(Self::style(
            "  {spinner:.cyan} Scanning [{bar:30.cyan/dim}] {pos}/{len} computers ({eta} remaining) {msg}",
        ));
        pb.set_message(format!("{} workers", workers));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_host_complete(&self, _host: &HostRecord, _sessions: usize, _reachable: bool) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn on_scan_complete(&self, stats: &RunStatistics, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Scan complete: {} logons on {} of {} computers in {:.2}s",
            "✓".green(),
            stats.total_sessions,
            stats.hosts_with_sessions,
            stats.total_hosts,
            duration_secs
        );
    }
}
