//! The CPU scheduler daemon: pin table, sampler, classifier, and best-fit
//! migration planner (§4.2–§4.5).

pub mod classifier;
pub mod model;
pub mod planner;
pub mod sampler;

use crate::adapter::{GuestId, HostAdapter};
use crate::bitset::MAX_BITS;
use crate::control_loop::Daemon;
use crate::error::{HostCtlError, Result};

use model::CpuTable;

/// Default "hot" threshold, percent (§4.3).
pub const HIGH_THRESH: u8 = 90;
/// Default "cold" threshold, percent (§4.3).
pub const LOW_THRESH: u8 = 70;
/// Default migration target utilization, percent (§4.3).
pub const PCPU_TGT: u8 = 80;

/// Tunable thresholds and the sampling period for the CPU scheduler.
#[derive(Debug, Clone, Copy)]
pub struct CpuConfig {
    /// Sampling/tick interval, seconds.
    pub interval_secs: u64,
    /// §4.3 `HIGH_THRESH`.
    pub high_thresh: u8,
    /// §4.3 `LOW_THRESH`.
    pub low_thresh: u8,
    /// §4.3/§4.4 `PCPU_TGT`.
    pub target: u8,
}

impl CpuConfig {
    /// Builds a config for the given interval using the §4.3 defaults.
    pub fn with_defaults(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            high_thresh: HIGH_THRESH,
            low_thresh: LOW_THRESH,
            target: PCPU_TGT,
        }
    }
}

/// The CPU daemon's owned context: its adapter, guest list, and pin table.
///
/// Created by [`CpuHostState::init`], mutated only by the loop thread
/// (via [`Daemon::tick`]), destroyed by [`Daemon::teardown`] — which frees
/// each guest handle and closes the session in that order (§9).
pub struct CpuHostState {
    adapter: Box<dyn HostAdapter>,
    guests: Vec<GuestId>,
    table: CpuTable,
    config: CpuConfig,
}

impl CpuHostState {
    /// Connects to `uri`, enumerates guests and pCPUs, and pins guest *i*
    /// to pCPU `i mod num_pcpus` (§4.5's initial placement).
    ///
    /// Fatal per §7: any failure here means the loop never starts.
    pub fn init(mut adapter: Box<dyn HostAdapter>, uri: &str, config: CpuConfig) -> Result<Self> {
        adapter.connect(uri).map_err(HostCtlError::Adapter)?;
        let guests = adapter.list_active_guests().map_err(HostCtlError::Adapter)?;

        if guests.len() > MAX_BITS {
            return Err(HostCtlError::OutOfMemory(format!(
                "{} guests exceeds the {MAX_BITS}-entity bitmask domain",
                guests.len()
            )));
        }
        let num_pcpus = adapter.num_pcpus().map_err(HostCtlError::Adapter)?;
        if num_pcpus == 0 || num_pcpus > MAX_BITS {
            return Err(HostCtlError::OutOfMemory(format!(
                "{num_pcpus} pCPUs exceeds the {MAX_BITS}-entity bitmask domain"
            )));
        }

        let mut table = CpuTable::new(num_pcpus, &guests);

        for (i, p) in table.pcpus.iter_mut().enumerate() {
            p.last_idle_ns = adapter.pcpu_idle_ns(i).map_err(HostCtlError::Adapter)?;
        }
        for (i, guest) in guests.iter().enumerate() {
            let info = adapter.guest_vcpu_info(*guest).map_err(HostCtlError::Adapter)?;
            table.vcpus[i].last_runtime_ns = info.runtime_ns;
        }

        for i in 0..guests.len() {
            let target_pcpu = i % num_pcpus;
            planner::pin(&mut table, adapter.as_mut(), i, target_pcpu).map_err(HostCtlError::Adapter)?;
        }

        Ok(Self { adapter, guests, table, config })
    }

    /// Direct read access to the pin table, for tests and the §6.4 trace.
    pub fn table(&self) -> &CpuTable {
        &self.table
    }

    /// Direct read access to the guest list.
    pub fn guests(&self) -> &[GuestId] {
        &self.guests
    }
}

impl Daemon for CpuHostState {
    fn tick(&mut self) -> Result<()> {
        let valid_pcpu = sampler::sample_pcpus(&mut self.table, self.adapter.as_ref(), self.config.interval_secs)
            .map_err(HostCtlError::Adapter)?;
        let _valid_vcpu = sampler::sample_vcpus(&mut self.table, self.adapter.as_ref(), self.config.interval_secs)
            .map_err(HostCtlError::Adapter)?;

        classifier::classify(&mut self.table, valid_pcpu, self.config.high_thresh, self.config.low_thresh);

        let migrations = planner::migrate(&mut self.table, self.adapter.as_mut(), self.config.target, self.config.high_thresh)
            .map_err(HostCtlError::Adapter)?;
        tracing::debug!(migrations, "CPU tick complete");

        debug_assert_eq!(self.table.total_pinned(), self.guests.len(), "CPU-1 violated");
        Ok(())
    }

    fn teardown(&mut self) {
        for guest in &self.guests {
            self.adapter.release_guest(*guest);
        }
        self.adapter.close();
    }
}
