#![no_std]
#![no_main]

use aya_ebpf::{
    helpers::bpf_get_current_comm,
    macros::{map, tracepoint},
    maps::{Array, RingBuf},
    programs::TracePointContext,
};

pub const OP_READ: u32 = 1 << 0;
pub const OP_WRITE: u32 = 1 << 1;
pub const OP_FLUSH: u32 = 1 << 2;
pub const OP_DISCARD: u32 = 1 << 3;

#[repr(C)]
pub struct BlockIoEvent {
    pub comm: [u8; 16],
    pub bytes: u64,
    pub flags: u32,
}

#[map(name = "BLOCK_EVENTS")]
static BLOCK_EVENTS: RingBuf = RingBuf::with_byte_size(256 * 1024, 0);

#[map(name = "DROP_COUNT")]
static DROP_COUNT: Array<u64> = Array::with_max_entries(1, 0);

// block/block_rq_issue record layout:
// dev(8), sector(16), nr_sector(24), bytes(28), rwbs[8](32), comm[16](40)
const BYTES_OFFSET: usize = 28;
const RWBS_OFFSET: usize = 32;

#[tracepoint(category = "block", name = "block_rq_issue")]
pub fn block_rq_issue(ctx: TracePointContext) -> u32 {
    match try_block_rq_issue(&ctx) {
        Ok(v) => v,
        Err(_) => 0,
    }
}

fn try_block_rq_issue(ctx: &TracePointContext) -> Result<u32, i64> {
    let bytes = unsafe { ctx.read_at::<u32>(BYTES_OFFSET)? } as u64;
    let rwbs = unsafe { ctx.read_at::<[u8; 8]>(RWBS_OFFSET)? };

    // Issue time runs in the context of the issuing task, so current
    // comm is the attribution we want.
    let comm = bpf_get_current_comm()?;

    emit_event(BlockIoEvent {
        comm,
        bytes,
        flags: op_flags(&rwbs),
    });

    Ok(0)
}

/// Derive op flag bits from the tracepoint's rwbs string ("R", "WS",
/// "RA", "FF", ...). Modifier characters (A, S, M) carry no bit.
fn op_flags(rwbs: &[u8; 8]) -> u32 {
    let mut flags = 0;
    for &b in rwbs.iter() {
        match b {
            b'R' => flags |= OP_READ,
            b'W' => flags |= OP_WRITE,
            b'F' => flags |= OP_FLUSH,
            b'D' => flags |= OP_DISCARD,
            0 => break,
            _ => {}
        }
    }
    flags
}

fn emit_event(ev: BlockIoEvent) {
    if let Some(mut entry) = BLOCK_EVENTS.reserve::<BlockIoEvent>(0) {
        entry.write(ev);
        entry.submit(0);
    } else {
        // Ring buffer full - increment drop counter
        if let Some(count) = DROP_COUNT.get_ptr_mut(0) {
            unsafe { *count += 1 };
        }
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
