//! Excess/hungry guest classification (§4.7).

use crate::bitset::Bitset32;

use super::model::MemTable;

/// Recomputes `table.high_mem_mask` and `table.low_mem_mask` from scratch.
///
/// Only guests present in `valid` (sampled without a missing/zero
/// `mem_total` this tick) are eligible to be marked.
pub fn classify(table: &mut MemTable, valid: Bitset32, guest_low: u8, guest_high: u8) {
    table.high_mem_mask.clear_all();
    table.low_mem_mask.clear_all();

    for (i, rec) in table.guests.iter().enumerate() {
        if !valid.contains(i) {
            continue;
        }
        if rec.percent_avail > guest_high {
            table.high_mem_mask.set(i);
        } else if rec.percent_avail < guest_low && rec.mem_total < rec.mem_max {
            table.low_mem_mask.set(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GuestId;

    #[test]
    fn hungry_requires_headroom_under_max() {
        let mut table = MemTable::new(&[(GuestId(0), 1_000_000)]);
        table.guests[0].percent_avail = 5;
        table.guests[0].mem_total = 1_000_000; // already at max
        let mut valid = Bitset32::empty();
        valid.set(0);
        classify(&mut table, valid, 25, 33);
        assert!(table.low_mem_mask.is_empty(), "guest at mem_max must not be classified hungry");
    }

    #[test]
    fn excess_classification() {
        let mut table = MemTable::new(&[(GuestId(0), 2_000_000)]);
        table.guests[0].percent_avail = 50;
        table.guests[0].mem_total = 1_000_000;
        let mut valid = Bitset32::empty();
        valid.set(0);
        classify(&mut table, valid, 25, 33);
        assert!(table.high_mem_mask.contains(0));
    }
}
