//! `hostctl-cpud` — the CPU scheduler daemon (spec §4.2-§4.5).
//!
//! Sleeps for `interval` seconds, samples pCPU idle-time and vCPU run-time
//! counters, classifies pCPUs hot/cold, and runs the best-fit migration
//! planner, forever, until a `SIGINT`/`SIGTERM` or a fatal tick error.
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

use hostctl_core::adapter::GuestId;
use hostctl_core::control_loop::{self, Daemon, ErrorPolicy};
use hostctl_core::cpu::{CpuConfig, CpuHostState};
use hostctl_core::error::HostCtlError;
use hostctl_core::testing::FakeAdapter;

/// Fixed local hypervisor session URI (§6.3).
const DEFAULT_URI: &str = "qemu:///system";

/// Demo topology used in the absence of a production `HostAdapter` (see the
/// module docs): four guests across four pCPUs, the balanced-init scenario
/// from §8.1.
const DEMO_GUESTS: usize = 4;
const DEMO_PCPUS: usize = 4;

/// `hostctl-cpud` — periodically repins guest vCPUs to balance pCPU load.
#[derive(Parser)]
#[command(name = "hostctl-cpud", version, about)]
struct Cli {
    /// Cycle time in seconds between sample/classify/migrate ticks.
    #[arg(value_parser = parse_positive_interval)]
    interval: u64,

    /// Hypervisor session URI (defaults to the local system session, §6.3).
    #[arg(long, default_value = DEFAULT_URI)]
    uri: String,

    /// Emit the §6.4 human-readable trace block to stdout every tick.
    #[arg(long)]
    trace: bool,

    /// Hot-pCPU utilization threshold, percent (default: `HIGH_THRESH`).
    #[arg(long, default_value_t = hostctl_core::cpu::HIGH_THRESH)]
    high_thresh: u8,

    /// Cold-pCPU utilization threshold, percent (default: `LOW_THRESH`).
    #[arg(long, default_value_t = hostctl_core::cpu::LOW_THRESH)]
    low_thresh: u8,

    /// Best-fit migration target utilization, percent (default: `PCPU_TGT`).
    #[arg(long, default_value_t = hostctl_core::cpu::PCPU_TGT)]
    target: u8,
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

    let config = CpuConfig {
        interval_secs: cli.interval,
        high_thresh: cli.high_thresh,
        low_thresh: cli.low_thresh,
        target: cli.target,
    };

    let adapter: Box<dyn hostctl_core::adapter::HostAdapter> = Box::new(demo_adapter());

    let state = match CpuHostState::init(adapter, &cli.uri, config) {
        Ok(s) => s,
        Err(e) => return fatal(&e),
    };

    let daemon = Cpud { state, trace };
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
    eprintln!("hostctl-cpud: {e}");
    eprintln!("{}", e.code());
    ExitCode::from(e.code().unsigned_abs() as u8)
}

/// Seeds the demo [`FakeAdapter`] with a static topology and telemetry (see
/// the module docs for why there is no real adapter here).
fn demo_adapter() -> FakeAdapter {
    let mut fake = FakeAdapter::new();
    let guests: Vec<GuestId> = (0..DEMO_GUESTS as u64).map(GuestId).collect();
    fake.set_guests(guests).set_num_pcpus(DEMO_PCPUS);
    fake
}

/// Wraps [`CpuHostState`] with the §6.4 human-readable trace block, kept out
/// of the core crate since it is purely an operator convenience on top of
/// the tick, not part of the decision logic.
struct Cpud {
    state: CpuHostState,
    trace: bool,
}

impl Daemon for Cpud {
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

/// Prints the §6.4 CPU-daemon trace block: per-pCPU utilization, then
/// per-guest (guest id, pinned pCPU, vCPU utilization).
fn print_trace(state: &CpuHostState) {
    let table = state.table();
    println!("--- hostctl-cpud tick ---");
    for pcpu in &table.pcpus {
        println!("  pCPU {:2}: util={:3}% pinned={}", pcpu.id, pcpu.util, pcpu.num_pinned);
    }
    for (i, guest) in state.guests().iter().enumerate() {
        let vcpu = &table.vcpus[i];
        let pcpu = vcpu.pcpu.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!("  guest {:?}: pcpu={} util={:3}%", guest, pcpu, vcpu.util);
    }
}
