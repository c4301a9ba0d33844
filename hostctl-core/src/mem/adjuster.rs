//! Memory adjustment: excess reclaim, hungry growth, and fair reclaim (§4.8).

use crate::adapter::HostAdapter;
use crate::error::AdapterError;

use super::model::MemTable;

/// Runs the excess pass: while any guest is classified excess, shrink it
/// back toward `guest_tgt` and issue the adapter call.
///
/// Errors from `guest_set_memory_kib` here are propagated (ordinary
/// grow/shrink calls are not the fair-reclaim branch's ignore-errors
/// exemption, §7).
pub fn excess_pass(table: &mut MemTable, adapter: &mut dyn HostAdapter, guest_tgt: u8) -> Result<usize, AdapterError> {
    let mut adjusted = 0usize;

    while let Some(g) = table.high_mem_mask.lowest_set() {
        let rec = &mut table.guests[g];
        let adj = rec.mem_total as i128 * (rec.percent_avail as i128 - guest_tgt as i128) / 100;
        let adj = adj.max(0) as u64;
        rec.mem_total = rec.mem_total.saturating_sub(adj);
        let new_total = rec.mem_total;
        let guest = rec.guest;
        adapter.guest_set_memory_kib(guest, new_total)?;
        tracing::info!(guest = ?guest, new_total_kib = new_total, "excess reclaim");
        table.high_mem_mask.clear(g);
        adjusted += 1;
    }

    Ok(adjusted)
}

/// Outcome of the hungry pass, for tracing and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct HungryPassOutcome {
    /// Number of guests granted additional memory.
    pub grants: usize,
    /// Whether the fair-reclaim branch fired this tick.
    pub fair_reclaim_fired: bool,
}

/// Runs the hungry pass: while any guest is classified hungry, either grant
/// it memory (if host health allows), skip it (if the host merely isn't
/// healthy enough to grow but isn't critical), or — the first time the host
/// is both refusing growth and below its own target — perform one
/// fair-reclaim sweep across every guest and abandon the rest of the pass.
///
/// `host_free` is the caller's current best estimate of host free memory;
/// per §4.8 step 1, it is re-read from the adapter at the top of every
/// iteration, since the previous iteration's grant (or this pass's own
/// prior fair-reclaim) perturbs it.
#[allow(clippy::too_many_arguments)]
pub fn hungry_pass(
    table: &mut MemTable,
    adapter: &mut dyn HostAdapter,
    host_free: &mut u64,
    host_total: u64,
    host_tgt_kib: u64,
    host_low_pct: u8,
    guest_tgt: u8,
) -> Result<HungryPassOutcome, AdapterError> {
    let mut outcome = HungryPassOutcome::default();

    while let Some(g) = table.low_mem_mask.lowest_set() {
        *host_free = adapter.host_free_kib()?;

        let rec = table.guests[g];
        let adj = (rec.mem_total as i128 * (guest_tgt as i128 - rec.percent_avail as i128) / 100).max(0) as u64;

        let host_free_after_pct = if host_total == 0 {
            0
        } else {
            ((*host_free as i128 - adj as i128) * 100 / host_total as i128).max(0) as u64
        };

        if host_free_after_pct > host_low_pct as u64 {
            let new_total = (rec.mem_total + adj).min(rec.mem_max);
            table.guests[g].mem_total = new_total;
            let guest = rec.guest;
            adapter.guest_set_memory_kib(guest, new_total)?;
            tracing::info!(guest = ?guest, new_total_kib = new_total, "hungry grant");
            table.low_mem_mask.clear(g);
            outcome.grants += 1;
        } else if *host_free < host_tgt_kib {
            fair_reclaim(table, adapter, *host_free, host_total, host_tgt_kib);
            outcome.fair_reclaim_fired = true;
            break;
        } else {
            table.low_mem_mask.clear(g);
        }
    }

    Ok(outcome)
}

/// The fair-reclaim branch (§4.8): every guest surrenders memory in
/// proportion to its current share of host memory of the shortfall
/// `host_tgt_kib - host_free`. Fires at most once per tick, from
/// [`hungry_pass`]. Per-guest `guest_set_memory_kib` errors are
/// deliberately ignored here (§7) so one refusing guest cannot block
/// cluster-wide reclaim; `table.low_mem_mask` is zeroed by the caller.
fn fair_reclaim(table: &mut MemTable, adapter: &mut dyn HostAdapter, host_free: u64, host_total: u64, host_tgt_kib: u64) {
    if host_total == 0 {
        table.low_mem_mask.clear_all();
        return;
    }
    let shortfall = host_tgt_kib.saturating_sub(host_free) as i128;

    for rec in &mut table.guests {
        let share = shortfall * 100 * rec.mem_total as i128 / host_total as i128;
        let adj = (rec.mem_total as i128 * share / 100).max(0) as u64;
        rec.mem_total = rec.mem_total.saturating_sub(adj);
        let guest = rec.guest;
        let new_total = rec.mem_total;
        if let Err(e) = adapter.guest_set_memory_kib(guest, new_total) {
            tracing::warn!(guest = ?guest, error = %e, "fair-reclaim set_memory failed, ignoring");
        } else {
            tracing::info!(guest = ?guest, new_total_kib = new_total, "fair reclaim");
        }
    }

    table.low_mem_mask.clear_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GuestId;
    use crate::testing::FakeAdapter;

    #[test]
    fn excess_reclaim_shrinks_to_target() {
        let mut table = MemTable::new(&[(GuestId(0), 2_000_000)]);
        table.guests[0].mem_total = 1_000_000;
        table.guests[0].percent_avail = 50;
        table.high_mem_mask.set(0);

        let mut adapter = FakeAdapter::new();
        let n = excess_pass(&mut table, &mut adapter, 30).unwrap();
        assert_eq!(n, 1);
        assert_eq!(table.guests[0].mem_total, 800_000);
        assert_eq!(adapter.set_memory_calls(), vec![(GuestId(0), 800_000)]);
    }

    #[test]
    fn hungry_grant_clamped_to_max() {
        let mut table = MemTable::new(&[(GuestId(0), 1_000_000)]);
        table.guests[0].mem_total = 1_000_000;
        table.guests[0].percent_avail = 10;
        table.low_mem_mask.set(0);

        let mut adapter = FakeAdapter::new();
        adapter.set_host_free_kib(4_000_000);
        let mut host_free = 4_000_000u64;
        let outcome = hungry_pass(&mut table, &mut adapter, &mut host_free, 8_000_000, 1_200_000, 10, 30).unwrap();
        assert_eq!(outcome.grants, 1);
        assert!(!outcome.fair_reclaim_fired);
        assert_eq!(table.guests[0].mem_total, 1_000_000, "clamped to mem_max");
    }

    #[test]
    fn fair_reclaim_fires_once_and_clears_mask() {
        let mut table = MemTable::new(&[(GuestId(0), 2_000_000), (GuestId(1), 2_000_000)]);
        table.guests[0].mem_total = 2_000_000;
        table.guests[1].mem_total = 2_000_000;
        table.guests[0].percent_avail = 10;
        table.low_mem_mask.set(0);

        let mut adapter = FakeAdapter::new();
        adapter.set_host_free_kib(400_000);
        let mut host_free = 400_000u64;
        let outcome = hungry_pass(&mut table, &mut adapter, &mut host_free, 4_500_000, 675_000, 10, 30).unwrap();
        assert!(outcome.fair_reclaim_fired);
        assert!(table.low_mem_mask.is_empty());
        assert_eq!(adapter.set_memory_calls().len(), 2);
    }
}
