use crate::error::Error;
use crate::model::HostRecord;
use crate::progress::ScanReporter;
use crate::report::ReportSink;
use crate::session::{SessionEnumerator, SessionLookup, SessionStore};
use rayon::ThreadPoolBuilder;
use std::fmt;
use std::io::Write;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 500;
pub const DEFAULT_WORKERS: usize = 100;

const PROGRESS_INTERVAL: usize = 10;

pub fn clamp_workers(requested: usize) -> usize {
    if requested > MAX_WORKERS {
        warn!("Thread count limited to {}.", MAX_WORKERS);
    }
    requested.clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Split `0..total` into at most `workers` contiguous batches of
/// `ceil(total / workers)` hosts. Empty batches are never produced.
pub fn partition(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.max(1);
    let batch_size = total.div_ceil(workers);

    (0..workers)
        .map(|worker| worker * batch_size)
        .take_while(|&start| start < total)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dispatching,
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Dispatching => "dispatching",
            Phase::Draining => "draining",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Workers actually launched.
    pub workers: usize,
    pub unreachable_hosts: usize,
}

/// Bounded fork-join over the host list: one worker per batch, each batch
/// scanned in index order, every host streamed to the sink as soon as it is done.
#[derive(Debug, Clone)]
pub struct WorkScheduler {
    workers: usize,
}

impl WorkScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: clamp_workers(workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run<S, W>(
        &self,
        hosts: &[HostRecord],
        enumerator: &SessionEnumerator<S>,
        sink: &ReportSink<W>,
        reporter: &dyn ScanReporter,
    ) -> Result<DispatchSummary, Error>
    where
        S: SessionStore,
        W: Write + Send,
    {
        let mut phase = Phase::Idle;
        let batches = partition(hosts.len(), self.workers);
        if batches.is_empty() {
            transition(&mut phase, Phase::Done);
            return Ok(DispatchSummary::default());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(batches.len())
            .thread_name(|index| format!("scan-worker-{}", index))
            .build()?;

        info!(
            "Scanning {} computers with {} workers ({} per worker)",
            hosts.len(),
            batches.len(),
            batches[0].len()
        );
        reporter.on_scan_start(hosts.len(), batches.len());

        let unreachable = AtomicUsize::new(0);
        transition(&mut phase, Phase::Dispatching);
        pool.scope(|scope| {
            for (worker, range) in batches.iter().cloned().enumerate() {
                let unreachable = &unreachable;
                scope.spawn(move |_| {
                    run_batch(
                        worker,
                        &hosts[range],
                        enumerator,
                        sink,
                        reporter,
                        unreachable,
                    )
                });
            }
            transition(&mut phase, Phase::Draining);
        });
        transition(&mut phase, Phase::Done);

        Ok(DispatchSummary {
            workers: batches.len(),
            unreachable_hosts: unreachable.into_inner(),
        })
    }
}

fn transition(phase: &mut Phase, next: Phase) {
    debug!("Scheduler {} -> {}", phase, next);
    *phase = next;
}

fn run_batch<S: SessionStore, W: Write>(
    worker: usize,
    batch: &[HostRecord],
    enumerator: &SessionEnumerator<S>,
    sink: &ReportSink<W>,
    reporter: &dyn ScanReporter,
    unreachable: &AtomicUsize,
) {
    let total = batch.len();
    for (index, host) in batch.iter().enumerate() {
        let lookup = panic::catch_unwind(AssertUnwindSafe(|| {
            enumerator.enumerate_sessions(&host.fully_qualified_name)
        }))
        .unwrap_or_else(|_| {
            error!("Scanning {} panicked", host.fully_qualified_name);
            SessionLookup::Unavailable {
                reason: "scan panicked".to_string(),
            }
        });

        if !lookup.is_available() {
            unreachable.fetch_add(1, Ordering::Relaxed);
        }
        if let Err(err) = sink.append(host, lookup.sessions()) {
            error!(
                "Could not write report rows for {}: {}",
                host.fully_qualified_name, err
            );
        }
        reporter.on_host_complete(host, lookup.sessions().len(), lookup.is_available());

        let processed = index + 1;
        if processed % PROGRESS_INTERVAL == 0 || processed == total {
            debug!(worker = worker, "{}/{} computers processed", processed, total);
        }
    }
}
