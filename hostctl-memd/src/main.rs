//! `hostctl-memd` — the memory coordinator daemon (spec §4.6-§4.8).
//!
//! Sleeps for `interval` seconds, samples each guest's balloon stats and the
//! host's free memory, classifies guests excess/hungry, and runs the
//! excess-reclaim then hungry-growth (with fair-reclaim under host
//! pressure) adjustment passes, forever, until a `SIGINT`/`SIGTERM` or a
//! fatal tick error.
//!
//! The production hypervisor transport is out of scope for this workspace
//! (§1): `hostctl_core::adapter::HostAdapter` is the extension point a real
//! deployment implements and wires in here in place of
//! [`hostctl_core::testing::FakeAdapter`]. This binary seeds that fake with
//! a small fixed topology so the control loop has something to do.

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use hostctl_core::adapter::{GuestId, MemStat, MemStatTag};
use hostctl_core::control_loop::{self, Daemon, ErrorPolicy};
use hostctl_core::error::HostCtlError;
use hostctl_core::mem::{MemConfig, MemHostState};
use hostctl_core::testing::FakeAdapter;

/// Fixed local hypervisor session URI (§6.3).
const DEFAULT_URI: &str = "qemu:///system";

/// Demo topology used in the absence of a production `HostAdapter` (see the
/// module docs): three guests, each balanced near its guest target, on a
/// host with comfortable headroom.
const DEMO_GUESTS: usize = 3;
const DEMO_GUEST_MEM_MAX_KIB: u64 = 2_000_000;
const DEMO_GUEST_MEM_TOTAL_KIB: u64 = 1_000_000;
const DEMO_GUEST_MEM_FREE_KIB: u64 = 300_000;
const DEMO_HOST_TOTAL_KIB: u64 = 8_000_000;
const DEMO_HOST_FREE_KIB: u64 = 4_000_000;

/// `hostctl-memd` — periodically grows or shrinks guest balloon allocations.
#[derive(Parser)]
#[command(name = "hostctl-memd", version, about)]
struct Cli {
    /// Cycle time in seconds between sample/classify/adjust ticks.
    #[arg(value_parser = parse_positive_interval)]
    interval: u64,

    /// Hypervisor session URI (defaults to the local system session, §6.3).
    #[arg(long, default_value = DEFAULT_URI)]
    uri: String,

    /// Emit the §6.4 human-readable trace block to stdout every tick.
    #[arg(long)]
    trace: bool,

    /// Host-free low-water mark, percent (default: `HOST_LOW`).
    #[arg(long, default_value_t = hostctl_core::mem::HOST_LOW)]
    host_low: u8,

    /// Host-free target, percent (default: `HOST_TGT`).
    #[arg(long, default_value_t = hostctl_core::mem::HOST_TGT)]
    host_tgt: u8,

    /// Guest-available low-water mark, percent (default: `GUEST_LOW`).
    #[arg(long, default_value_t = hostctl_core::mem::GUEST_LOW)]
    guest_low: u8,

    /// Guest-available target, percent (default: `GUEST_TGT`).
    #[arg(long, default_value_t = hostctl_core::mem::GUEST_TGT)]
    guest_tgt: u8,

    /// Guest-available excess threshold, percent (default: `GUEST_HIGH`).
    #[arg(long, default_value_t = hostctl_core::mem::GUEST_HIGH)]
    guest_high: u8,
}

/// Validates the positional `<interval>` argument per §6.1: a positive
/// integer, otherwise clap prints a usage line to stderr and exits non-zero.
fn parse_positive_interval(s: &str) -> Result<u64, String> {
    let v: u64 = s.parse().map_err(|_| format!("'{s}' is not a valid non-negative integer"))?;
    if v == 0 {
        return Err("interval must be a positive integer (seconds)".to_string());
    }
    Ok(v)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let trace = cli.trace || env::var("HOSTCTL_TRACE").as_deref() == Ok("1");

    let config = MemConfig {
        interval_secs: cli.interval,
        host_low: cli.host_low,
        host_tgt: cli.host_tgt,
        guest_low: cli.guest_low,
        guest_tgt: cli.guest_tgt,
        guest_high: cli.guest_high,
    };

    let adapter: Box<dyn hostctl_core::adapter::HostAdapter> = Box::new(demo_adapter());

    let state = match MemHostState::init(adapter, &cli.uri, config) {
        Ok(s) => s,
        Err(e) => return fatal(&e),
    };

    let daemon = Memd { state, trace };
    let stop = control_loop::install_stop_flag();
    let interval = Duration::from_secs(cli.interval);

    match control_loop::run_loop(daemon, interval, &stop, ErrorPolicy::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(&e),
    }
}

/// Prints `e`'s §6.2 numeric code to stderr and maps it onto a process exit
/// status (exit codes are unsigned on every platform clap/std target, so the
/// negative §6.2 codes are reported by magnitude).
fn fatal(e: &HostCtlError) -> ExitCode {
    eprintln!("hostctl-memd: {e}");
    eprintln!("{}", e.code());
    ExitCode::from(e.code().unsigned_abs() as u8)
}

/// Seeds the demo [`FakeAdapter`] with a static topology and telemetry (see
/// the module docs for why there is no real adapter here).
fn demo_adapter() -> FakeAdapter {
    let mut fake = FakeAdapter::new();
    let guests: Vec<GuestId> = (0..DEMO_GUESTS as u64).map(GuestId).collect();
    fake.set_guests(guests.clone())
        .set_host_total_kib(DEMO_HOST_TOTAL_KIB)
        .set_host_free_kib(DEMO_HOST_FREE_KIB);

    for guest in guests {
        fake.set_guest_max_mem_kib(guest, DEMO_GUEST_MEM_MAX_KIB).set_guest_mem_stats(
            guest,
            vec![
                MemStat { tag: MemStatTag::ActualBalloon, value_kib: DEMO_GUEST_MEM_TOTAL_KIB },
                MemStat { tag: MemStatTag::Unused, value_kib: DEMO_GUEST_MEM_FREE_KIB },
            ],
        );
    }
    fake
}

/// Wraps [`MemHostState`] with the §6.4 human-readable trace block, kept out
/// of the core crate since it is purely an operator convenience on top of
/// the tick, not part of the decision logic.
struct Memd {
    state: MemHostState,
    trace: bool,
}

impl Daemon for Memd {
    fn tick(&mut self) -> hostctl_core::error::Result<()> {
        self.state.tick()?;
        if self.trace {
            print_trace(&self.state);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.state.teardown();
    }
}

/// Prints the §6.4 memory-daemon trace block: host free MiB, then per-guest
/// (guest id, balloon MiB, free MiB, percent-available).
fn print_trace(state: &MemHostState) {
    let table = state.table();
    println!("--- hostctl-memd tick ---");
    println!("  host free: {} MiB", state.host_free_kib() / 1024);
    for rec in &table.guests {
        println!(
            "  guest {:?}: balloon={:5} MiB free={:5} MiB avail={:3}%",
            rec.guest,
            rec.mem_total / 1024,
            rec.mem_free / 1024,
            rec.percent_avail
        );
    }
}
