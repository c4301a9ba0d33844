//! End-to-end scenarios for the CPU scheduler's decision logic (spec §8
//! scenarios 1-3), driven directly against the pin table and planner so
//! each scenario's literal utilization figures apply to a single
//! classify+migrate pass without needing to fake two rounds of monotonic
//! counters through a stateless adapter.

use hostctl_core::adapter::GuestId;
use hostctl_core::bitset::Bitset32;
use hostctl_core::cpu::model::CpuTable;
use hostctl_core::cpu::{classifier, planner, CpuConfig, CpuHostState};
use hostctl_core::testing::FakeAdapter;

fn guests(n: u64) -> Vec<GuestId> {
    (0..n).map(GuestId).collect()
}

#[test]
fn scenario_1_balanced_init() {
    let mut fake = FakeAdapter::new();
    fake.set_guests(guests(4));
    fake.set_num_pcpus(4);

    let state = CpuHostState::init(Box::new(fake), "test:///", CpuConfig::with_defaults(1)).unwrap();

    assert_eq!(state.table().total_pinned(), 4);
    for pcpu in 0..4 {
        assert_eq!(state.table().ring_members(pcpu), vec![pcpu], "guest i must land on pCPU i");
        assert_eq!(state.table().pcpus[pcpu].num_pinned, 1);
    }
}

#[test]
fn scenario_2_overloaded_single_pcpu_migrates_exactly_one() {
    let mut table = CpuTable::new(2, &guests(4));
    let mut adapter = FakeAdapter::new();

    // Initial placement per §4.5: guest i -> pCPU (i mod num_pcpus).
    for (i, _) in guests(4).iter().enumerate() {
        planner::pin(&mut table, &mut adapter, i, i % 2).unwrap();
    }
    assert_eq!(table.ring_members(0), vec![0, 2]);
    assert_eq!(table.ring_members(1), vec![1, 3]);

    table.pcpus[0].util = 95;
    table.pcpus[1].util = 30;
    table.vcpus[0].util = 40;
    table.vcpus[2].util = 40;

    let mut valid = Bitset32::empty();
    valid.set(0);
    valid.set(1);
    classifier::classify(&mut table, valid, 90, 70);
    assert!(table.pcpu_high_mask.contains(0));
    assert!(table.pcpu_low_mask.contains(1));

    let migrations = planner::migrate(&mut table, &mut adapter, 80, 90).unwrap();

    assert_eq!(migrations, 1, "exactly one migration occurs");
    assert_eq!(table.ring_members(1), vec![1, 3, 0], "guest 0 migrates to the tail of pCPU 1's ring");
    assert_eq!(table.ring_members(0), vec![2]);
    assert_eq!(table.pcpus[0].num_pinned, 1);
    assert_eq!(table.pcpus[1].num_pinned, 3);
}

#[test]
fn scenario_3_stable_state_issues_no_migrations() {
    let mut table = CpuTable::new(2, &guests(4));
    let mut adapter = FakeAdapter::new();
    for (i, _) in guests(4).iter().enumerate() {
        planner::pin(&mut table, &mut adapter, i, i % 2).unwrap();
    }
    let before_0 = table.ring_members(0);
    let before_1 = table.ring_members(1);

    table.pcpus[0].util = 80;
    table.pcpus[1].util = 80;

    let mut valid = Bitset32::empty();
    valid.set(0);
    valid.set(1);
    classifier::classify(&mut table, valid, 90, 70);
    assert!(table.pcpu_high_mask.is_empty());
    assert!(table.pcpu_low_mask.is_empty());

    let migrations = planner::migrate(&mut table, &mut adapter, 80, 90).unwrap();

    assert_eq!(migrations, 0, "P5: all utilizations in [LOW_THRESH, HIGH_THRESH] => zero pins");
    assert_eq!(table.ring_members(0), before_0);
    assert_eq!(table.ring_members(1), before_1);
}

#[test]
fn p1_every_guest_pinned_exactly_once_and_ring_lengths_agree() {
    let mut fake = FakeAdapter::new();
    fake.set_guests(guests(6));
    fake.set_num_pcpus(3);
    let state = CpuHostState::init(Box::new(fake), "test:///", CpuConfig::with_defaults(1)).unwrap();

    assert_eq!(state.table().total_pinned(), 6);
    for p in 0..3 {
        assert_eq!(state.table().ring_members(p).len(), state.table().pcpus[p].num_pinned);
    }
}
