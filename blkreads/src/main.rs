mod agg;
mod model;
mod trace;
mod ui;

use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use log::error;

use crate::{
    agg::interval::IntervalAggregator,
    model::cli::{Cli, RunConfig},
    trace::{EventSource, build_source},
    ui::report,
};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = RunConfig {
        interval: Duration::from_secs(cli.interval),
    };

    run(config)
}

fn run(config: RunConfig) -> Result<()> {
    let agg = Arc::new(Mutex::new(IntervalAggregator::new()));

    let mut source = build_source()?;
    let agg_for_source = Arc::clone(&agg);
    thread::spawn(move || {
        if let Err(e) = source.run(agg_for_source) {
            error!("event source error: {e}");
            std::process::exit(1);
        }
    });

    // Reporter loop: drain and print once per interval, until killed.
    loop {
        thread::sleep(config.interval);

        let snapshot = agg.lock().unwrap().drain();
        report::print_interval(&snapshot);
    }
}
