pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod model;
pub mod platform;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod utils;

pub use config::{AppConfig, ScanSettings};
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use model::{HostRecord, RunStatistics, SessionIdentity};
pub use progress::{ScanReporter, SilentReporter};
pub use report::ReportSink;
