//! The memory coordinator daemon: balloon sampler, excess/hungry
//! classifier, and grow/shrink/fair-reclaim adjuster (§4.6–§4.8).

pub mod adjuster;
pub mod classifier;
pub mod model;
pub mod sampler;

use crate::adapter::{GuestId, HostAdapter};
use crate::bitset::MAX_BITS;
use crate::control_loop::Daemon;
use crate::error::{HostCtlError, Result};

use model::MemTable;

/// Default host-free low-water mark, percent of host total (§4.7).
pub const HOST_LOW: u8 = 10;
/// Default host-free target, percent of host total (§4.7).
pub const HOST_TGT: u8 = 15;
/// Default guest-available low-water mark, percent (§4.7).
pub const GUEST_LOW: u8 = 25;
/// Default guest-available target, percent (§4.7).
pub const GUEST_TGT: u8 = 30;
/// Default guest-available excess threshold, percent (§4.7).
pub const GUEST_HIGH: u8 = 33;

/// Tunable thresholds and the sampling period for the memory coordinator.
#[derive(Debug, Clone, Copy)]
pub struct MemConfig {
    /// Sampling/tick interval, seconds.
    pub interval_secs: u64,
    /// §4.7 `HOST_LOW`.
    pub host_low: u8,
    /// §4.7 `HOST_TGT`.
    pub host_tgt: u8,
    /// §4.7 `GUEST_LOW`.
    pub guest_low: u8,
    /// §4.7 `GUEST_TGT`.
    pub guest_tgt: u8,
    /// §4.7 `GUEST_HIGH`.
    pub guest_high: u8,
}

impl MemConfig {
    /// Builds a config for the given interval using the §4.7 defaults.
    pub fn with_defaults(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            host_low: HOST_LOW,
            host_tgt: HOST_TGT,
            guest_low: GUEST_LOW,
            guest_tgt: GUEST_TGT,
            guest_high: GUEST_HIGH,
        }
    }
}

/// The memory daemon's owned context: its adapter, guest list, host
/// capacities, and per-guest balloon table.
pub struct MemHostState {
    adapter: Box<dyn HostAdapter>,
    guests: Vec<GuestId>,
    host_total_kib: u64,
    host_free_kib: u64,
    table: MemTable,
    config: MemConfig,
}

impl MemHostState {
    /// Connects to `uri`, enumerates guests, and requests 1 Hz balloon
    /// stats from each (§4.1's `guest_set_mem_stats_period`).
    ///
    /// Fatal per §7: any failure here means the loop never starts.
    pub fn init(mut adapter: Box<dyn HostAdapter>, uri: &str, config: MemConfig) -> Result<Self> {
        adapter.connect(uri).map_err(HostCtlError::Adapter)?;
        let guests = adapter.list_active_guests().map_err(HostCtlError::Adapter)?;

        if guests.len() > MAX_BITS {
            return Err(HostCtlError::OutOfMemory(format!(
                "{} guests exceeds the {MAX_BITS}-entity bitmask domain",
                guests.len()
            )));
        }

        let host_total_kib = adapter.host_total_kib().map_err(HostCtlError::Adapter)?;
        let host_free_kib = adapter.host_free_kib().map_err(HostCtlError::Adapter)?;

        let mut entries = Vec::with_capacity(guests.len());
        for &g in &guests {
            adapter.guest_set_mem_stats_period(g, 1).map_err(HostCtlError::Adapter)?;
            let mem_max = adapter.guest_max_mem_kib(g).map_err(HostCtlError::Adapter)?;
            entries.push((g, mem_max));
        }
        let table = MemTable::new(&entries);

        Ok(Self {
            adapter,
            guests,
            host_total_kib,
            host_free_kib,
            table,
            config,
        })
    }

    /// Direct read access to the balloon table, for tests and the §6.4 trace.
    pub fn table(&self) -> &MemTable {
        &self.table
    }

    /// The host's last-sampled free memory, KiB.
    pub fn host_free_kib(&self) -> u64 {
        self.host_free_kib
    }

    /// The host's static total memory, KiB.
    pub fn host_total_kib(&self) -> u64 {
        self.host_total_kib
    }
}

impl Daemon for MemHostState {
    fn tick(&mut self) -> Result<()> {
        self.host_free_kib = self.adapter.host_free_kib().map_err(HostCtlError::Adapter)?;
        let valid = sampler::sample_guests(&mut self.table, self.adapter.as_ref()).map_err(HostCtlError::Adapter)?;

        classifier::classify(&mut self.table, valid, self.config.guest_low, self.config.guest_high);

        let shrunk = adjuster::excess_pass(&mut self.table, self.adapter.as_mut(), self.config.guest_tgt)
            .map_err(HostCtlError::Adapter)?;

        let host_tgt_kib = self.host_total_kib * self.config.host_tgt as u64 / 100;
        let outcome = adjuster::hungry_pass(
            &mut self.table,
            self.adapter.as_mut(),
            &mut self.host_free_kib,
            self.host_total_kib,
            host_tgt_kib,
            self.config.host_low,
            self.config.guest_tgt,
        )
        .map_err(HostCtlError::Adapter)?;

        tracing::debug!(shrunk, grants = outcome.grants, fair_reclaim = outcome.fair_reclaim_fired, "memory tick complete");

        for rec in &self.table.guests {
            debug_assert!(rec.mem_total <= rec.mem_max, "MEM-2 violated");
        }
        Ok(())
    }

    fn teardown(&mut self) {
        for guest in &self.guests {
            self.adapter.release_guest(*guest);
        }
        self.adapter.close();
    }
}
