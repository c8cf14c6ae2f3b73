use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "blkreads",
    about = "Per-process block-device read accounting",
    long_about = None
)]
pub struct Cli {
    /// Reporting interval in seconds
    #[arg(long, default_value_t = 5)]
    pub interval: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub interval: Duration,
}
