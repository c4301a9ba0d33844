//! The control-loop driver shared by both daemons (§4.9, §5).
//!
//! Each daemon is strictly single-threaded cooperative: sleep, sample,
//! classify, act, repeat, with the only suspension points being the
//! inter-tick sleep and synchronous adapter calls. There is no task
//! executor here on purpose — an async runtime would invite interleaving
//! the spec explicitly rules out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// The per-tick sample-error handling policy (§7, §9 open question).
///
/// The source's baseline behavior treats every per-tick sample error as
/// fatal; this crate keeps that as the only policy actually wired to the
/// CLI layer, but expresses it as an enum so a future operator-facing flag
/// could introduce `SkipTick` without touching the algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Any error returned by a tick terminates the loop (the spec's
    /// default and the only behavior this workspace exposes today).
    #[default]
    FatalOnSampleError,
}

/// One daemon's sense/decide/act cycle, abstracted over its concrete state.
///
/// `CpuHostState` and `MemHostState` each implement this; `run_loop` drives
/// either one identically.
pub trait Daemon {
    /// Runs one sample → classify → act cycle.
    fn tick(&mut self) -> Result<()>;

    /// Releases all adapter-owned resources. Called exactly once, whether
    /// the loop exited due to a fatal tick error or an external stop
    /// signal.
    fn teardown(&mut self);
}

/// A shared, process-wide stop flag toggled by the SIGINT/SIGTERM handler
/// installed in each binary's `main`.
///
/// Checked between ticks only — the current tick always finishes before
/// the loop unwinds through `teardown` (§5: "Cancellation / timeout: None
/// in-loop").
pub fn install_stop_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    // ctrlc::set_handler can only be installed once per process; a second
    // daemon in the same process (not a supported deployment, but harmless
    // in tests) would simply see its handler ignored.
    let _ = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    });
    flag
}

/// Runs `daemon` forever: sleep `interval`, tick, repeat, until a tick
/// returns an error (per `policy`, always fatal today) or `stop` is set.
///
/// `teardown` always runs before returning, matching §9's "context created
/// by init, mutated only by the loop thread, destroyed by teardown."
pub fn run_loop<D: Daemon>(
    mut daemon: D,
    interval: Duration,
    stop: &AtomicBool,
    _policy: ErrorPolicy,
) -> Result<()> {
    let result = loop {
        if stop.load(Ordering::SeqCst) {
            break Ok(());
        }
        std::thread::sleep(interval);
        if stop.load(Ordering::SeqCst) {
            break Ok(());
        }

        if let Err(e) = daemon.tick() {
            break Err(e);
        }
    };

    daemon.teardown();
    result
}
