use crate::model::{HostRecord, RunStatistics, SessionIdentity};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const HEADER: [&str; 4] = ["Computer", "OS", "SID", "Logon User"];

/// Wrap in quotes and double internal quotes when the value contains a comma,
/// a quote or a line break.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(quote_field(value))
    } else {
        Cow::Borrowed(value)
    }
}

/// Unconditionally quote-wrapped.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

struct SinkState<W: Write> {
    out: W,
    stats: RunStatistics,
    /// Set once a write to `out` fails; the stream may end in a partial row.
    failed: bool,
}

/// CSV report shared by every scan worker.
///
/// Each `append` holds the lock for exactly one host and emits that host's
/// rows as a single block, so a host's rows are contiguous in the output and
/// the statistics always match the rows written.
pub struct ReportSink<W: Write> {
    state: Mutex<SinkState<W>>,
}

impl ReportSink<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Could not open output file {}: {}", path.display(), e),
            )
        })?;
        let sink = Self::open(BufWriter::new(file))?;
        info!("Report file created: {}", path.display());
        Ok(sink)
    }
}

// Fields are escaped by hand: the identity column is always quoted.
fn row_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish_block(rows: Writer<Vec<u8>>) -> io::Result<Vec<u8>> {
    rows.into_inner()
        .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))
}

/// Every row of one host, formatted.
pub fn host_rows(host: &HostRecord, sessions: &[SessionIdentity]) -> io::Result<Vec<u8>> {
    let computer = escape_field(&host.fully_qualified_name);
    let os = escape_field(&host.operating_system);

    let mut rows = row_writer();
    if sessions.is_empty() {
        rows.write_record([&*computer, &*os, "", ""])?;
    } else {
        for session in sessions {
            let sid = escape_field(&session.raw_identifier);
            let identity = quote_field(&session.full_identity());
            rows.write_record([&*computer, &*os, &*sid, identity.as_str()])?;
        }
    }
    finish_block(rows)
}

impl<W: Write> ReportSink<W> {
    /// Writes the byte-order mark and the header row before anything else.
    pub fn open(mut out: W) -> io::Result<Self> {
        let mut header = row_writer();
        header.write_record(HEADER)?;
        let header = finish_block(header)?;

        out.write_all(UTF8_BOM)?;
        out.write_all(&header)?;
        out.flush()?;

        Ok(Self {
            state: Mutex::new(SinkState {
                out,
                stats: RunStatistics::default(),
                failed: false,
            }),
        })
    }

    /// Record one host. Safe to call from any number of workers at once.
    ///
    /// After a failed write the sink refuses further rows instead of
    /// continuing on a possibly truncated line.
    pub fn append(&self, host: &HostRecord, sessions: &[SessionIdentity]) -> io::Result<()> {
        let block = host_rows(host, sessions)?;

        let mut state = self.lock();
        if state.failed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "report output failed earlier; no further rows are written",
            ));
        }
        let written = match state.out.write_all(&block) {
            Ok(()) => state.out.flush(),
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            state.failed = true;
            return Err(err);
        }

        state.stats.total_hosts += 1;
        if !sessions.is_empty() {
            state.stats.hosts_with_sessions += 1;
            state.stats.total_sessions += sessions.len();
        }
        Ok(())
    }

    pub fn statistics(&self) -> RunStatistics {
        self.lock().stats
    }

    /// Flush and hand back the underlying writer with the final statistics.
    pub fn close(self) -> io::Result<(W, RunStatistics)> {
        let mut state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.out.flush()?;
        Ok((state.out, state.stats))
    }

    // Rows are formatted before the lock is taken, so a panic cannot happen
    // halfway through a host's block.
    fn lock(&self) -> MutexGuard<'_, SinkState<W>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
