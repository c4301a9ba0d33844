//! Data model for the memory coordinator: per-guest balloon bookkeeping.

use crate::adapter::GuestId;
use crate::bitset::Bitset32;

/// One guest's balloon-driver bookkeeping (§3's `GuestMem` record).
#[derive(Debug, Clone, Copy)]
pub struct GuestMemRecord {
    /// The guest this record belongs to.
    pub guest: GuestId,
    /// Last observed balloon size (the guest's current assigned memory), KiB.
    pub mem_total: u64,
    /// Last observed unused-in-guest memory, KiB.
    pub mem_free: u64,
    /// Static configured maximum memory, KiB.
    pub mem_max: u64,
    /// Derived percent-available, clamped to `0..=100` (MEM-1).
    pub percent_avail: u8,
}

impl GuestMemRecord {
    fn new(guest: GuestId, mem_max: u64) -> Self {
        Self {
            guest,
            mem_total: 0,
            mem_free: 0,
            mem_max,
            percent_avail: 0,
        }
    }
}

/// The per-guest memory table and classifier masks owned by
/// [`super::MemHostState`].
#[derive(Debug, Clone)]
pub struct MemTable {
    /// One record per guest, indexed the same way as the owning
    /// `MemHostState::guests`.
    pub guests: Vec<GuestMemRecord>,
    /// Guests currently classified excess (§4.7).
    pub high_mem_mask: Bitset32,
    /// Guests currently classified hungry (§4.7).
    pub low_mem_mask: Bitset32,
}

impl MemTable {
    /// Builds a table with one (zeroed) record per `(guest, mem_max)` pair.
    pub fn new(guests: &[(GuestId, u64)]) -> Self {
        Self {
            guests: guests.iter().map(|&(g, max)| GuestMemRecord::new(g, max)).collect(),
            high_mem_mask: Bitset32::empty(),
            low_mem_mask: Bitset32::empty(),
        }
    }
}
