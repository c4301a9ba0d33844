//! Per-tick balloon-stat sampling for the memory coordinator (§4.6).

use crate::adapter::{HostAdapter, MemStatTag};
use crate::bitset::Bitset32;
use crate::error::AdapterError;

use super::model::MemTable;

/// Refreshes `table`'s per-guest balloon stats and derived `percent_avail`.
///
/// Returns the set of guests whose `percent_avail` was validly refreshed
/// this tick. A guest is left out of that set (and skipped for
/// classification, per §4.6: "otherwise skip classification for that
/// guest") when its reported `mem_total` is zero, since percent-available
/// is undefined in that case.
pub fn sample_guests(table: &mut MemTable, adapter: &dyn HostAdapter) -> Result<Bitset32, AdapterError> {
    let mut valid = Bitset32::empty();

    for (i, rec) in table.guests.iter_mut().enumerate() {
        let stats = adapter.guest_mem_stats(rec.guest)?;
        let mut mem_total = None;
        let mut mem_free = None;
        for stat in stats {
            match stat.tag {
                MemStatTag::ActualBalloon => mem_total = Some(stat.value_kib),
                MemStatTag::Unused => mem_free = Some(stat.value_kib),
                MemStatTag::Other => {}
            }
        }

        let (Some(mem_total), Some(mem_free)) = (mem_total, mem_free) else {
            tracing::warn!(guest = ?rec.guest, "balloon stats missing required tags, skipping");
            continue;
        };

        rec.mem_total = mem_total;
        rec.mem_free = mem_free;

        if mem_total == 0 {
            tracing::warn!(guest = ?rec.guest, "mem_total is zero, skipping classification");
            continue;
        }

        let pct = (100u64 * mem_free / mem_total).min(100);
        rec.percent_avail = pct as u8;
        if i < 32 {
            valid.set(i);
        }
    }

    Ok(valid)
}
