use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use user_scanner::config::SettingsOverrides;

#[derive(Debug, Parser)]
#[command(name = "user-scanner")]
#[command(version)]
#[command(
    about = "Scans every computer in an Active Directory domain and reports the logged-on users as CSV",
    long_about = None
)]
#[command(after_help = "Example:\n  user-scanner -d example.com -c dc.example.com -o report.csv -t 50\n\n\
Note: the domain controller is `-c` or `--dc`. A single-dash `-dc` is read as\n\
`-d c` and rejected, so write `--dc dc.example.com`.")]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Domain name (e.g., example.com)
    #[arg(short = 'd', long, global = true)]
    pub domain: Option<String>,

    /// Domain controller address (e.g., dc.example.com)
    #[arg(short = 'c', long = "dc", visible_alias = "domain-controller", global = true)]
    pub domain_controller: Option<String>,

    /// Output CSV file (e.g., report.csv)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,

    /// Number of worker threads, 1 to 500 [default: 100]
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Configuration file (default: UserScanner.toml in the working directory, if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the TCP reachability check before opening a host's registry
    #[arg(long, global = true)]
    pub no_probe: bool,

    /// More log output (-v debug, -vv trace); TRACING_LEVEL overrides
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl SettingsArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            domain: self.domain.clone(),
            domain_controller: self.domain_controller.clone(),
            output: self.output.clone(),
            threads: self.threads,
            no_probe: self.no_probe,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan all computers and write the logged-on user report (default)
    Scan,
    /// Look up the operating system of a single computer by its short name
    HostOs {
        /// Computer name (e.g., PC1)
        name: String,
    },
    /// Print configuration values
    PrintConfig,
}
