//! The host-interface contract (§4.1 and §6.6).
//!
//! The core is agnostic to the transport: it is written entirely against
//! this trait. A production binary wires in whatever concrete session type
//! talks to the real hypervisor; this crate ships only the contract plus
//! [`crate::testing::FakeAdapter`], a deterministic in-memory implementation
//! used by unit tests and demos.

use crate::error::AdapterError;

/// Opaque handle to a guest, as returned by [`HostAdapter::list_active_guests`].
///
/// The core never inspects this beyond equality and using it as an index
/// key back into the adapter; ordering between `GuestId`s carries no
/// meaning beyond the ordering the adapter chose to return them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestId(pub u64);

/// A tagged balloon-stat value as returned by `guest_mem_stats`.
///
/// The core matches by tag, not position (§4.6): iteration order over the
/// stats list returned by an adapter is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemStatTag {
    /// Current balloon size (the guest's actual assigned memory), in KiB.
    ActualBalloon,
    /// Memory unused inside the guest, in KiB.
    Unused,
    /// Any other tag the adapter reports; the core ignores these.
    Other,
}

/// One tagged balloon-stat reading.
#[derive(Debug, Clone, Copy)]
pub struct MemStat {
    /// Which quantity this reading is.
    pub tag: MemStatTag,
    /// The reading's value in KiB.
    pub value_kib: u64,
}

/// Per-vCPU telemetry as returned by `guest_vcpu_info`.
#[derive(Debug, Clone, Copy)]
pub struct VcpuInfo {
    /// The pCPU id this vCPU is currently bound to, per the adapter's own
    /// bookkeeping (used only as a sanity cross-check at init; the core's
    /// own pinning table is authoritative once the loop starts).
    pub pcpu: usize,
    /// Cumulative vCPU run-time in nanoseconds, monotonically non-decreasing.
    pub runtime_ns: u64,
}

/// The capability bundle both daemons are built against.
///
/// Every operation can fail; the core treats any `Err` the same way it
/// would treat a hardware read failure and either skips the affected entity
/// for the tick or aborts the tick entirely, per §7's taxonomy. See the
/// individual operation docs for which.
pub trait HostAdapter {
    /// Opens a read/write session with the hypervisor at `uri`.
    fn connect(&mut self, uri: &str) -> Result<(), AdapterError>;

    /// Returns an ordered list of opaque handles for guests currently
    /// running.
    ///
    /// Must return `Err(AdapterError::NoGuests)` if the list would be
    /// empty, rather than `Ok(vec![])`, so callers cannot mistake an empty
    /// successful call for one of the list-retrieval failure modes.
    fn list_active_guests(&self) -> Result<Vec<GuestId>, AdapterError>;

    /// Host-node free memory, in KiB.
    fn host_free_kib(&self) -> Result<u64, AdapterError>;

    /// Host-node total memory, in KiB.
    fn host_total_kib(&self) -> Result<u64, AdapterError>;

    /// Number of physical CPUs visible to the hypervisor.
    fn num_pcpus(&self) -> Result<usize, AdapterError>;

    /// Monotonic per-pCPU idle-time counter, in nanoseconds.
    fn pcpu_idle_ns(&self, pcpu: usize) -> Result<u64, AdapterError>;

    /// Per-guest vCPU telemetry (bound pCPU, cumulative run-time).
    fn guest_vcpu_info(&self, guest: GuestId) -> Result<VcpuInfo, AdapterError>;

    /// Sets the affinity mask for one guest's (sole) vCPU.
    ///
    /// `cpumap` is a bitmask of acceptable pCPUs; this crate always issues
    /// a singleton mask `{pcpu.id}` per the pinning invariant (single vCPU
    /// per guest, §1 non-goals).
    fn guest_pin_vcpu(&mut self, guest: GuestId, vcpu_idx: usize, cpumap: u64) -> Result<(), AdapterError>;

    /// Requests the guest's balloon driver publish stats at 1 Hz.
    fn guest_set_mem_stats_period(&mut self, guest: GuestId, seconds: u32) -> Result<(), AdapterError>;

    /// Fetches the guest's tagged balloon-stats list.
    fn guest_mem_stats(&self, guest: GuestId) -> Result<Vec<MemStat>, AdapterError>;

    /// Returns the guest's configured maximum memory, in KiB.
    fn guest_max_mem_kib(&self, guest: GuestId) -> Result<u64, AdapterError>;

    /// Requests a new current memory size for the guest, in KiB.
    ///
    /// Best-effort: per §7, failures here are propagated by callers in the
    /// ordinary grow/shrink passes but deliberately ignored inside the
    /// fair-reclaim branch.
    fn guest_set_memory_kib(&mut self, guest: GuestId, kib: u64) -> Result<(), AdapterError>;

    /// Releases a guest handle. Infallible by contract.
    fn release_guest(&mut self, guest: GuestId);

    /// Closes the session. Infallible by contract.
    fn close(&mut self);
}
