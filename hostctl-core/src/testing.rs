//! A deterministic in-memory [`HostAdapter`] for tests and demos (§9:
//! "unit tests to drive scenarios with a deterministic fake adapter
//! exercising every branch in §4.4 and §4.8").
//!
//! Not a production transport: there is no real hypervisor behind it. A
//! test programs a scenario's telemetry with the `set_*` methods, runs one
//! `init`/`tick`, then inspects `pin_calls()`/`set_memory_calls()` and the
//! daemon's own state to assert against the §8 scenarios.

use std::collections::HashMap;

use crate::adapter::{GuestId, HostAdapter, MemStat, VcpuInfo};
use crate::error::AdapterError;

/// A deterministic, fully in-memory [`HostAdapter`].
#[derive(Debug, Default)]
pub struct FakeAdapter {
    guests: Vec<GuestId>,
    num_pcpus: usize,
    host_free_kib: u64,
    host_total_kib: u64,
    pcpu_idle_ns: HashMap<usize, u64>,
    vcpu_info: HashMap<GuestId, VcpuInfo>,
    mem_stats: HashMap<GuestId, Vec<MemStat>>,
    max_mem_kib: HashMap<GuestId, u64>,
    /// Guests whose `guest_set_memory_kib` should fail, to exercise the
    /// fair-reclaim ignore-errors path.
    refuse_set_memory: std::collections::HashSet<GuestId>,

    pin_calls: Vec<(GuestId, u64)>,
    set_memory_calls: Vec<(GuestId, u64)>,
}

impl FakeAdapter {
    /// Builds an adapter with no guests and zeroed telemetry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs the guest list returned by `list_active_guests`.
    pub fn set_guests(&mut self, guests: Vec<GuestId>) -> &mut Self {
        self.guests = guests;
        self
    }

    /// Programs `num_pcpus()`'s return value.
    pub fn set_num_pcpus(&mut self, n: usize) -> &mut Self {
        self.num_pcpus = n;
        self
    }

    /// Programs `host_free_kib()`'s return value.
    pub fn set_host_free_kib(&mut self, kib: u64) -> &mut Self {
        self.host_free_kib = kib;
        self
    }

    /// Programs `host_total_kib()`'s return value.
    pub fn set_host_total_kib(&mut self, kib: u64) -> &mut Self {
        self.host_total_kib = kib;
        self
    }

    /// Programs `pcpu_idle_ns(pcpu)`'s return value.
    pub fn set_pcpu_idle_ns(&mut self, pcpu: usize, ns: u64) -> &mut Self {
        self.pcpu_idle_ns.insert(pcpu, ns);
        self
    }

    /// Programs `guest_vcpu_info(guest)`'s return value.
    pub fn set_guest_vcpu_info(&mut self, guest: GuestId, info: VcpuInfo) -> &mut Self {
        self.vcpu_info.insert(guest, info);
        self
    }

    /// Programs `guest_mem_stats(guest)`'s return value.
    pub fn set_guest_mem_stats(&mut self, guest: GuestId, stats: Vec<MemStat>) -> &mut Self {
        self.mem_stats.insert(guest, stats);
        self
    }

    /// Programs `guest_max_mem_kib(guest)`'s return value.
    pub fn set_guest_max_mem_kib(&mut self, guest: GuestId, kib: u64) -> &mut Self {
        self.max_mem_kib.insert(guest, kib);
        self
    }

    /// Makes `guest_set_memory_kib(guest, _)` fail from now on, to exercise
    /// the fair-reclaim ignore-errors path.
    pub fn refuse_set_memory(&mut self, guest: GuestId) -> &mut Self {
        self.refuse_set_memory.insert(guest);
        self
    }

    /// Every `(guest, cpumap)` pair passed to `guest_pin_vcpu`, in call order.
    pub fn pin_calls(&self) -> Vec<(GuestId, u64)> {
        self.pin_calls.clone()
    }

    /// Every `(guest, kib)` pair passed to `guest_set_memory_kib`, in call order.
    pub fn set_memory_calls(&self) -> Vec<(GuestId, u64)> {
        self.set_memory_calls.clone()
    }
}

impl HostAdapter for FakeAdapter {
    fn connect(&mut self, _uri: &str) -> Result<(), AdapterError> {
        Ok(())
    }

    fn list_active_guests(&self) -> Result<Vec<GuestId>, AdapterError> {
        if self.guests.is_empty() {
            return Err(AdapterError::NoGuests);
        }
        Ok(self.guests.clone())
    }

    fn host_free_kib(&self) -> Result<u64, AdapterError> {
        Ok(self.host_free_kib)
    }

    fn host_total_kib(&self) -> Result<u64, AdapterError> {
        Ok(self.host_total_kib)
    }

    fn num_pcpus(&self) -> Result<usize, AdapterError> {
        Ok(self.num_pcpus)
    }

    fn pcpu_idle_ns(&self, pcpu: usize) -> Result<u64, AdapterError> {
        Ok(*self.pcpu_idle_ns.get(&pcpu).unwrap_or(&0))
    }

    fn guest_vcpu_info(&self, guest: GuestId) -> Result<VcpuInfo, AdapterError> {
        Ok(*self.vcpu_info.get(&guest).unwrap_or(&VcpuInfo { pcpu: 0, runtime_ns: 0 }))
    }

    fn guest_pin_vcpu(&mut self, guest: GuestId, _vcpu_idx: usize, cpumap: u64) -> Result<(), AdapterError> {
        self.pin_calls.push((guest, cpumap));
        Ok(())
    }

    fn guest_set_mem_stats_period(&mut self, _guest: GuestId, _seconds: u32) -> Result<(), AdapterError> {
        Ok(())
    }

    fn guest_mem_stats(&self, guest: GuestId) -> Result<Vec<MemStat>, AdapterError> {
        Ok(self.mem_stats.get(&guest).cloned().unwrap_or_default())
    }

    fn guest_max_mem_kib(&self, guest: GuestId) -> Result<u64, AdapterError> {
        Ok(*self.max_mem_kib.get(&guest).unwrap_or(&u64::MAX))
    }

    fn guest_set_memory_kib(&mut self, guest: GuestId, kib: u64) -> Result<(), AdapterError> {
        if self.refuse_set_memory.contains(&guest) {
            return Err(AdapterError::GuestMem(format!("guest {guest:?} refused set_memory")));
        }
        self.set_memory_calls.push((guest, kib));
        Ok(())
    }

    fn release_guest(&mut self, _guest: GuestId) {}

    fn close(&mut self) {}
}
