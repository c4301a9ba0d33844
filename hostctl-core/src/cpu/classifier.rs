//! Hot/cold pCPU classification (§4.3).

use crate::bitset::Bitset32;

use super::model::CpuTable;

/// Recomputes `table.pcpu_high_mask` and `table.pcpu_low_mask` from scratch.
///
/// Stale bits are always cleared first (§4.3: "recomputed from scratch").
/// Only pCPUs present in `valid` (i.e. sampled without a counter
/// regression this tick) are eligible to be marked; any pCPU missing from
/// `valid` is left unmarked in both masks for this tick.
pub fn classify(table: &mut CpuTable, valid: Bitset32, high_thresh: u8, low_thresh: u8) {
    table.pcpu_high_mask.clear_all();
    table.pcpu_low_mask.clear_all();

    for p in &table.pcpus {
        if !valid.contains(p.id) {
            continue;
        }
        if p.util > high_thresh && p.num_pinned > 1 {
            table.pcpu_high_mask.set(p.id);
        } else if p.util < low_thresh {
            table.pcpu_low_mask.set(p.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GuestId;

    #[test]
    fn hot_requires_more_than_one_pinned() {
        let mut table = CpuTable::new(1, &[GuestId(0)]);
        table.pcpus[0].util = 95;
        table.pcpus[0].num_pinned = 1;
        let valid = {
            let mut b = Bitset32::empty();
            b.set(0);
            b
        };
        classify(&mut table, valid, 90, 70);
        assert!(table.pcpu_high_mask.is_empty(), "single-pinned pCPU must never be marked hot (CPU-3)");
    }

    #[test]
    fn masks_are_disjoint_and_rebuilt() {
        let mut table = CpuTable::new(2, &[GuestId(0), GuestId(1)]);
        table.pcpus[0].util = 95;
        table.pcpus[0].num_pinned = 2;
        table.pcpus[1].util = 10;
        let valid = {
            let mut b = Bitset32::empty();
            b.set(0);
            b.set(1);
            b
        };
        classify(&mut table, valid, 90, 70);
        assert!(table.pcpu_high_mask.contains(0));
        assert!(table.pcpu_low_mask.contains(1));
        assert!(table.pcpu_high_mask.intersection(&table.pcpu_low_mask).is_empty());
    }

    #[test]
    fn unsampled_pcpu_is_left_unmarked() {
        let mut table = CpuTable::new(2, &[GuestId(0), GuestId(1)]);
        table.pcpus[0].util = 95;
        table.pcpus[0].num_pinned = 2;
        // Mark pCPU 0 unmarked as hot before classify, to prove it gets cleared when invalid.
        table.pcpu_high_mask.set(0);
        let valid = Bitset32::empty(); // nothing validly sampled this tick
        classify(&mut table, valid, 90, 70);
        assert!(table.pcpu_high_mask.is_empty());
        assert!(table.pcpu_low_mask.is_empty());
    }
}
