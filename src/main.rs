use clap::Parser;
use clap::error::ErrorKind;
use cyclestat::{Channel, SampleStore, SampleStoreOptions, report};
use spdlog::prelude::*;
use std::process::ExitCode;
use std::sync::atomic::{Ordering, compiler_fence};

const DEFAULT_NUM_OPS: u64 = 100_000;
const DEFAULT_NUM_STORES: u64 = 2;
const CALIBRATION_ITERATIONS: usize = 100_000;
const L1_CELL_VALUE: u32 = 13;

/// Measures the cycle cost of tiny code regions.
#[derive(Parser)]
#[command(name = "cyclestat")]
struct Args {
    /// Measured operations per channel
    #[arg(short = 'o', long, visible_alias = "num_ops", default_value_t = DEFAULT_NUM_OPS, value_parser = clap::value_parser!(u64).range(1..))]
    num_ops: u64,

    /// Channels to exercise; channel k runs workload k (nop, empty, pause, L1 load)
    #[arg(short = 's', long, visible_alias = "num_stores", default_value_t = DEFAULT_NUM_STORES, value_parser = clap::value_parser!(u64).range(1..))]
    num_stores: u64,

    /// Pin the measuring thread to this core
    #[arg(short = 'c', long)]
    pin_core: Option<usize>,

    /// Print this many raw samples ahead of each summary
    #[arg(short = 'p', long, default_value_t = 0)]
    print: usize,
}

#[derive(Clone, Copy)]
enum Workload {
    Nop,
    Empty,
    Pause,
    L1Load,
}

impl Workload {
    fn for_channel(channel: usize) -> Self {
        match channel {
            0 => Workload::Nop,
            1 => Workload::Empty,
            2 => Workload::Pause,
            _ => Workload::L1Load,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Workload::Nop => "asm nop",
            Workload::Empty => "compiler fence",
            Workload::Pause => "spin loop hint",
            Workload::L1Load => "L1 access",
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if let Some(core) = args.pin_core {
        let pinned = core_affinity::get_core_ids()
            .and_then(|ids| ids.into_iter().find(|id| id.id == core))
            .is_some_and(core_affinity::set_for_current);
        if !pinned {
            error!("[System] could not pin to core {}", core);
            return ExitCode::FAILURE;
        }
        info!("[System] pinned to core {}", core);
    }

    let num_ops = args.num_ops as usize;
    let num_stores = args.num_stores as usize;

    info!("[00] * initializing {} stores of {} entries", num_stores, num_ops);
    let mut store = SampleStore::new(SampleStoreOptions::new(num_stores, num_ops, 0));
    store.calibrate(CALIBRATION_ITERATIONS);

    let cell = L1_CELL_VALUE;
    for channel in (0..num_stores).rev() {
        let workload = Workload::for_channel(channel);
        info!("[00] * testing store {}: {}", channel, workload.label());
        run(store.channel_mut(channel), num_ops, workload, &cell);
        store.print(channel, num_ops, args.print.min(report::PRINT_MAX));
        println!("{}", report::format_percentiles(&store.percentiles(channel, num_ops)));
    }

    store.terminate();
    ExitCode::SUCCESS
}

fn run(channel: &mut Channel, num_ops: usize, workload: Workload, cell: &u32) {
    match workload {
        Workload::Nop => {
            for r in 0..num_ops {
                channel.capture(r, || unsafe {
                    core::arch::asm!("nop", options(nomem, nostack));
                });
            }
        }
        Workload::Empty => {
            for r in 0..num_ops {
                channel.capture(r, || compiler_fence(Ordering::SeqCst));
            }
        }
        Workload::Pause => {
            for r in 0..num_ops {
                channel.capture(r, std::hint::spin_loop);
            }
        }
        Workload::L1Load => {
            for r in 0..num_ops {
                let val = channel.capture(r, || {
                    let val = unsafe { std::ptr::read_volatile(cell) };
                    load_fence();
                    val
                });
                if val != L1_CELL_VALUE {
                    warn!("[00] L1 load returned {} instead of {}", val, L1_CELL_VALUE);
                }
            }
        }
    }
}

#[inline(always)]
#[allow(unused_unsafe)]
fn load_fence() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::x86_64::_mm_lfence();
    }
    #[cfg(not(target_arch = "x86_64"))]
    compiler_fence(Ordering::SeqCst);
}
