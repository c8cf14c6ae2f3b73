pub mod ebpf;

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::agg::interval::IntervalAggregator;

/// A source of block I/O events feeding the shared aggregator. Runs on
/// its own thread until the process is terminated.
pub trait EventSource {
    fn run(&mut self, agg: Arc<Mutex<IntervalAggregator>>) -> Result<()>;
}

pub fn build_source() -> Result<Box<dyn EventSource + Send>> {
    Ok(Box::new(ebpf::EbpfTracer::new()?))
}
