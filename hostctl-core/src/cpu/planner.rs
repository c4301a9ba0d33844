//! Pinning primitives (§4.5) and the best-fit migration planner (§4.4).

use crate::adapter::HostAdapter;
use crate::error::AdapterError;

use super::model::CpuTable;

/// Pins vCPU `v` (by index into `table.vcpus`) onto pCPU `p` (by index into
/// `table.pcpus`).
///
/// `pin` is the only mutator of the ownership graph (§4.5): it issues the
/// adapter call first and leaves every structure untouched on failure, then
/// unpins from the old location (no-op if unpinned), links `v` at the tail
/// of `p`'s ring, and updates `num_pinned`/back-pointers.
pub fn pin(
    table: &mut CpuTable,
    adapter: &mut dyn HostAdapter,
    v: usize,
    p: usize,
) -> Result<(), AdapterError> {
    let guest = table.vcpus[v].guest;
    let cpumap = table.pcpus[p].affinity_mask;
    adapter.guest_pin_vcpu(guest, 0, cpumap)?;

    if let Some(old_p) = table.vcpus[v].pcpu {
        unpin(table, v, old_p);
    }

    // Link v at the tail of p's ring (i.e. just before p's head).
    match table.pcpus[p].head_idx {
        None => {
            table.vcpus[v].prev_idx = Some(v);
            table.vcpus[v].next_idx = Some(v);
            table.pcpus[p].head_idx = Some(v);
        }
        Some(head) => {
            let tail = table.vcpus[head].prev_idx.expect("ring node missing prev_idx");
            table.vcpus[tail].next_idx = Some(v);
            table.vcpus[v].prev_idx = Some(tail);
            table.vcpus[v].next_idx = Some(head);
            table.vcpus[head].prev_idx = Some(v);
        }
    }

    table.pcpus[p].num_pinned += 1;
    table.vcpus[v].pcpu = Some(p);

    tracing::info!(guest = ?guest, pcpu = p, "vCPU pinned");
    Ok(())
}

/// Removes vCPU `v` from pCPU `p`'s ring, patching neighbor links and
/// clearing `p.head_idx` when the ring empties. No-op if `v` is not
/// currently a member of `p`'s ring (`v.pcpu` already differs from `p`, or
/// `v` was never pinned).
pub fn unpin(table: &mut CpuTable, v: usize, p: usize) {
    if table.vcpus[v].pcpu != Some(p) {
        return;
    }

    let prev = table.vcpus[v].prev_idx.expect("pinned vcpu missing prev_idx");
    let next = table.vcpus[v].next_idx.expect("pinned vcpu missing next_idx");

    if prev == v && next == v {
        // Sole member: ring becomes empty.
        table.pcpus[p].head_idx = None;
    } else {
        table.vcpus[prev].next_idx = Some(next);
        table.vcpus[next].prev_idx = Some(prev);
        if table.pcpus[p].head_idx == Some(v) {
            table.pcpus[p].head_idx = Some(next);
        }
    }

    table.vcpus[v].prev_idx = None;
    table.vcpus[v].next_idx = None;
    table.pcpus[p].num_pinned -= 1;
}

/// Runs one best-fit migration pass (§4.4).
///
/// Consumes working copies of the hot/cold masks; the authoritative
/// `table.pcpu_high_mask` has origin bits cleared as vCPUs actually move.
/// Returns the number of `pin` calls issued, for tests and tracing.
pub fn migrate(
    table: &mut CpuTable,
    adapter: &mut dyn HostAdapter,
    target: u8,
    high_thresh: u8,
) -> Result<usize, AdapterError> {
    let mut low_working = table.pcpu_low_mask;
    let mut migrations = 0usize;

    while let Some(l) = low_working.lowest_set() {
        let mut best: Option<usize> = None;
        let mut best_delta: i32 = 100;

        for h in table.pcpu_high_mask.iter_ascending() {
            for v in table.ring_members(h) {
                let proj = table.pcpus[l].util as i32 + table.vcpus[v].util as i32;
                let delta = (target as i32 - proj).abs();
                if delta < best_delta && proj < high_thresh as i32 {
                    best = Some(v);
                    best_delta = delta;
                }
            }
        }

        if let Some(v) = best {
            let origin = table.vcpus[v].pcpu.expect("hot-ring vcpu must be pinned");
            table.pcpu_high_mask.clear(origin);
            pin(table, adapter, v, l)?;
            migrations += 1;
        }

        low_working.clear(l);
    }

    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAdapter;

    #[test]
    fn stable_state_issues_no_migrations() {
        let guests: Vec<_> = (0..4u64).map(crate::adapter::GuestId).collect();
        let mut table = CpuTable::new(2, &guests);
        let mut adapter = FakeAdapter::new();
        pin(&mut table, &mut adapter, 0, 0).unwrap();
        pin(&mut table, &mut adapter, 1, 1).unwrap();

        for p in &mut table.pcpus {
            p.util = 80;
        }
        // No masks set: nothing hot or cold.
        let n = migrate(&mut table, &mut adapter, 80, 90).unwrap();
        assert_eq!(n, 0);
    }
}
