//! Data model for the CPU scheduler: the pCPU table and the vCPU ring arena.
//!
//! The source attaches `prev`/`next` pointers directly to vCPU records to
//! get O(1) unpin out of an intrusive doubly-linked ring. Here the ring is
//! an arena with indices (§9): `pcpus[p].head_idx` names a slot in `vcpus`,
//! and each [`VcpuRecord`] carries `prev_idx`/`next_idx` back into the same
//! vector. No unsafe code is needed to keep CPU-1/CPU-2 checkable.

use crate::adapter::GuestId;
use crate::bitset::Bitset32;

/// One physical CPU's pinning and utilization bookkeeping.
#[derive(Debug, Clone)]
pub struct PcpuRecord {
    /// Zero-based pCPU id.
    pub id: usize,
    /// Singleton affinity mask with only bit `id` set.
    pub affinity_mask: u64,
    /// Last observed idle-time counter, nanoseconds, monotonic.
    pub last_idle_ns: u64,
    /// Last computed utilization, 0..=100.
    pub util: u8,
    /// Count of vCPUs currently pinned here; always equals the ring length.
    pub num_pinned: usize,
    /// Index into the owning [`CpuTable::vcpus`] of the ring's head, or
    /// `None` if the ring is empty.
    pub head_idx: Option<usize>,
}

impl PcpuRecord {
    fn new(id: usize) -> Self {
        Self {
            id,
            affinity_mask: 1u64 << id,
            last_idle_ns: 0,
            util: 0,
            num_pinned: 0,
            head_idx: None,
        }
    }
}

/// One guest's (sole) vCPU: its telemetry and its ring-membership links.
#[derive(Debug, Clone)]
pub struct VcpuRecord {
    /// The guest this vCPU belongs to.
    pub guest: GuestId,
    /// Last observed cumulative run-time counter, nanoseconds, monotonic.
    pub last_runtime_ns: u64,
    /// Last computed utilization, 0..=100.
    pub util: u8,
    /// Index of the pCPU this vCPU is currently pinned to, or `None` before
    /// the first pin (never observed post-init, per CPU-1).
    pub pcpu: Option<usize>,
    /// Previous vCPU in the owning pCPU's ring, by index into `vcpus`.
    pub prev_idx: Option<usize>,
    /// Next vCPU in the owning pCPU's ring, by index into `vcpus`.
    pub next_idx: Option<usize>,
}

impl VcpuRecord {
    fn new(guest: GuestId) -> Self {
        Self {
            guest,
            last_runtime_ns: 0,
            util: 0,
            pcpu: None,
            prev_idx: None,
            next_idx: None,
        }
    }
}

/// The pCPU table and vCPU arena owned by the CPU scheduler's [`super::CpuHostState`].
#[derive(Debug, Clone)]
pub struct CpuTable {
    /// One record per physical CPU, indexed by pCPU id.
    pub pcpus: Vec<PcpuRecord>,
    /// One record per guest, indexed by guest index (the same index used in
    /// `CpuHostState::guests`).
    pub vcpus: Vec<VcpuRecord>,
    /// pCPUs currently classified hot (CPU-3, CPU-4).
    pub pcpu_high_mask: Bitset32,
    /// pCPUs currently classified cold (CPU-4).
    pub pcpu_low_mask: Bitset32,
}

impl CpuTable {
    /// Builds an empty table for `num_pcpus` pCPUs and `guests` guests, with
    /// every vCPU record present but unpinned.
    pub fn new(num_pcpus: usize, guests: &[GuestId]) -> Self {
        Self {
            pcpus: (0..num_pcpus).map(PcpuRecord::new).collect(),
            vcpus: guests.iter().map(|&g| VcpuRecord::new(g)).collect(),
            pcpu_high_mask: Bitset32::empty(),
            pcpu_low_mask: Bitset32::empty(),
        }
    }

    /// Returns the vCPU indices on pCPU `p`'s ring, head-to-tail, in O(ring
    /// length) without allocating beyond the returned `Vec`.
    ///
    /// CPU-2: a ring is either empty (`head_idx = None`, `num_pinned = 0`)
    /// or a circular doubly-linked list; this walk relies on that invariant
    /// to terminate by returning to `head_idx` rather than by counting.
    pub fn ring_members(&self, p: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(head) = self.pcpus[p].head_idx else {
            return out;
        };
        let mut cur = head;
        loop {
            out.push(cur);
            cur = self.vcpus[cur].next_idx.expect("ring node missing next_idx");
            if cur == head {
                break;
            }
        }
        out
    }

    /// Sum of `num_pinned` across all pCPUs — should always equal the
    /// number of guests (CPU-1).
    pub fn total_pinned(&self) -> usize {
        self.pcpus.iter().map(|p| p.num_pinned).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guests(n: usize) -> Vec<GuestId> {
        (0..n as u64).map(GuestId).collect()
    }

    #[test]
    fn new_table_has_empty_rings() {
        let t = CpuTable::new(2, &guests(4));
        assert_eq!(t.total_pinned(), 0);
        assert!(t.ring_members(0).is_empty());
        assert!(t.ring_members(1).is_empty());
    }

    #[test]
    fn affinity_mask_is_singleton() {
        let t = CpuTable::new(3, &guests(0));
        assert_eq!(t.pcpus[0].affinity_mask, 0b001);
        assert_eq!(t.pcpus[1].affinity_mask, 0b010);
        assert_eq!(t.pcpus[2].affinity_mask, 0b100);
    }
}
