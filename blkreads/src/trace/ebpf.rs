use std::{
    env::var,
    fs::read,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use aya::{
    Ebpf,
    EbpfLoader,
    maps::{Array, MapData, RingBuf},
    programs::TracePoint,
};
use aya_log::EbpfLogger;
use log::warn;

use crate::{agg::interval::IntervalAggregator, model::event::ReadEvent, trace::EventSource};

// Match op flag bits from eBPF kernelspace
pub const OP_READ: u32 = 1 << 0;
pub const OP_WRITE: u32 = 1 << 1;
pub const OP_FLUSH: u32 = 1 << 2;
pub const OP_DISCARD: u32 = 1 << 3;

/// Raw record emitted by the block_rq_issue probe. Layout must match
/// the kernelspace struct.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct BlockIoEvent {
    pub comm: [u8; 16],
    pub bytes: u64,
    pub flags: u32,
}

pub struct EbpfTracer {
    bpf: Option<Ebpf>,
}

impl EbpfTracer {
    pub fn new() -> Result<Self> {
        let path = var("BLKREADS_EBPF_PATH")
            .context("BLKREADS_EBPF_PATH not set; did you build your eBPF object?")?;
        let data = read(path).context("failed to read BPF object")?;

        let bpf = EbpfLoader::new().load(&data)?;
        Ok(Self { bpf: Some(bpf) })
    }
}

impl EventSource for EbpfTracer {
    fn run(&mut self, agg: Arc<Mutex<IntervalAggregator>>) -> Result<()> {
        run_linux_ebpf(self.bpf.take(), agg)
    }
}

fn run_linux_ebpf(bpf_opt: Option<Ebpf>, agg: Arc<Mutex<IntervalAggregator>>) -> Result<()> {
    let mut bpf = bpf_opt.context("BPF object already used or not initialized")?;

    if let Err(e) = EbpfLogger::init(&mut bpf) {
        // The probe logs nothing in the steady state; this only matters
        // for kernel-side diagnostics.
        warn!("failed to initialize eBPF logger: {e}");
    }

    let (ring, drop_count) = configure_ebpf(&mut bpf)?;

    let dropped_events = move || -> Result<u64> { Ok(drop_count.get(&0, 0)?) };

    poll_ringbuf(agg, ring, dropped_events)
}

fn configure_ebpf(bpf: &mut Ebpf) -> Result<(RingBuf<&MapData>, Array<&MapData, u64>)> {
    let prog = bpf
        .program_mut("block_rq_issue")
        .ok_or_else(|| anyhow!("BPF program block_rq_issue not found"))?;
    let prog: &mut TracePoint = prog.try_into()?;
    prog.load()?;
    prog.attach("block", "block_rq_issue")
        .context("attach block_rq_issue")?;

    let event_map = bpf
        .map("BLOCK_EVENTS")
        .ok_or_else(|| anyhow!("BPF map BLOCK_EVENTS not found"))?;
    let ring = RingBuf::try_from(event_map)?;

    let drop_map = bpf
        .map("DROP_COUNT")
        .ok_or_else(|| anyhow!("BPF map DROP_COUNT not found"))?;
    let drop_count: Array<_, u64> = Array::try_from(drop_map)?;

    Ok((ring, drop_count))
}

fn poll_ringbuf<T>(
    agg: Arc<Mutex<IntervalAggregator>>,
    mut ring: RingBuf<&MapData>,
    dropped_events: T,
) -> Result<()>
where
    T: Fn() -> Result<u64>,
{
    let mut last_dropped = 0;

    loop {
        let mut got_events = false;

        while let Some(item) = ring.next() {
            got_events = true;

            if item.len() >= std::mem::size_of::<BlockIoEvent>() {
                let raw: BlockIoEvent =
                    unsafe { std::ptr::read_unaligned(item.as_ptr() as *const _) };

                if let Some(ev) = block_event_to_read_event(&raw) {
                    agg.lock().unwrap().record(ev);
                }
            }
        }

        let current_drops = dropped_events()?;
        if current_drops != last_dropped {
            warn!("ring buffer dropped {} events", current_drops - last_dropped);
            last_dropped = current_drops;
        }

        if !got_events {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
}

/// Accept only read operations; project everything else to nothing.
pub fn block_event_to_read_event(raw: &BlockIoEvent) -> Option<ReadEvent> {
    if raw.flags & OP_READ == 0 {
        return None;
    }

    Some(ReadEvent {
        comm: comm_to_string(&raw.comm),
        bytes: raw.bytes,
    })
}

fn comm_to_string(comm: &[u8; 16]) -> String {
    let end = comm.iter().position(|&b| b == 0).unwrap_or(comm.len());
    String::from_utf8_lossy(&comm[..end]).into_owned()
}
