use std::env;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ldap3 and its runtime trace every PDU at debug level.
const QUIET_DEPENDENCIES: &[&str] = &["ldap3=warn", "tokio=warn", "mio=warn"];

/// `TRACING_LEVEL` wins when set; otherwise `-v` raises the level from info.
fn filter_directives(env_level: Option<String>, verbosity: u8) -> String {
    if let Some(level) = env_level.filter(|level| !level.trim().is_empty()) {
        return level;
    }
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut directives = vec![level];
    if verbosity < 2 {
        directives.extend_from_slice(QUIET_DEPENDENCIES);
    }
    directives.join(",")
}

pub fn init_logger(verbosity: u8) -> impl Drop {
    let filter = filter_directives(env::var("TRACING_LEVEL").ok(), verbosity);
    let filter_layer = EnvFilter::new(filter);

    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| "./logs/user-scanner.log".to_string());

    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            // worker thread names (`scan-worker-N`) tie host lines to their batch
            fmt::layer()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    info!("Tracing is configured for stdout and file logging.");

    guard
}
