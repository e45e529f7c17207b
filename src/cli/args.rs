use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "ops-review",
    version,
    about = "Periodic operational review for a contact-center instance",
    long_about = "Runs the full analyzer suite (quotas, metrics, phone numbers, contact flows, \
API throttling, flow logs) against a contact-center instance, stores the per-component results, \
and assembles a review report."
)]
pub struct Args {
    /// How many days back the review window covers (default: from config)
    #[arg(short = 'd', long = "days-back", value_name = "DAYS")]
    pub days_back: Option<u32>,

    /// Path to the configuration file (default: ops-review.toml if present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory to write the report into (overrides config)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Report format: markdown or json (overrides config)
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Storage backend: object-store or key-value-table (overrides config)
    #[arg(long = "backend", value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long, default_value_t = false)]
    pub quiet: bool,
}

impl Args {
    /// Log level implied by the verbosity flags; `None` defers to config.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}
