//! End-to-end scenarios for the memory coordinator's decision logic (spec
//! §8 scenarios 4-6), driven through `MemHostState::init` + one `tick()` so
//! each scenario exercises the sampler, classifier, and adjuster exactly as
//! the control loop would call them.

use hostctl_core::adapter::{GuestId, MemStat, MemStatTag};
use hostctl_core::control_loop::Daemon;
use hostctl_core::mem::{MemConfig, MemHostState};
use hostctl_core::testing::FakeAdapter;

fn balloon_stats(mem_total: u64, mem_free: u64) -> Vec<MemStat> {
    vec![
        MemStat { tag: MemStatTag::ActualBalloon, value_kib: mem_total },
        MemStat { tag: MemStatTag::Unused, value_kib: mem_free },
    ]
}

#[test]
fn scenario_4_memory_excess_reclaim() {
    let guest = GuestId(0);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![guest])
        .set_guest_max_mem_kib(guest, u64::MAX)
        .set_guest_mem_stats(guest, balloon_stats(1_000_000, 500_000))
        .set_host_total_kib(10_000_000)
        .set_host_free_kib(5_000_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    assert_eq!(state.table().guests[0].percent_avail, 50);
    assert_eq!(state.table().guests[0].mem_total, 800_000, "adj = 1_000_000*(50-30)/100 = 200_000");
}

#[test]
fn scenario_5_memory_hungry_grant() {
    let guest = GuestId(0);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![guest])
        .set_guest_max_mem_kib(guest, 2_000_000)
        .set_guest_mem_stats(guest, balloon_stats(1_000_000, 100_000))
        .set_host_total_kib(8_000_000)
        .set_host_free_kib(4_000_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    assert_eq!(state.table().guests[0].percent_avail, 10);
    assert_eq!(state.table().guests[0].mem_total, 1_200_000, "adj = 1_000_000*(30-10)/100 = 200_000");
}

#[test]
fn scenario_5_hungry_grant_is_clamped_to_mem_max() {
    let guest = GuestId(0);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![guest])
        .set_guest_max_mem_kib(guest, 1_100_000)
        .set_guest_mem_stats(guest, balloon_stats(1_000_000, 100_000))
        .set_host_total_kib(8_000_000)
        .set_host_free_kib(4_000_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    assert_eq!(state.table().guests[0].mem_total, 1_100_000, "grant clamped by MEM-2 (mem_total <= mem_max)");
}

#[test]
fn scenario_6_fair_reclaim_under_host_pressure() {
    let g0 = GuestId(0);
    let g1 = GuestId(1);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![g0, g1])
        .set_guest_max_mem_kib(g0, u64::MAX)
        .set_guest_max_mem_kib(g1, u64::MAX)
        // g0 is hungry (10% avail); g1 is comfortably mid-range, neither hungry nor excess.
        .set_guest_mem_stats(g0, balloon_stats(2_000_000, 200_000))
        .set_guest_mem_stats(g1, balloon_stats(2_000_000, 600_000))
        .set_host_total_kib(4_500_000)
        .set_host_free_kib(400_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    // Neither guest grew: the hungry pass entered the fair-reclaim branch
    // instead of granting g0 memory.
    assert!(state.table().guests[0].mem_total < 2_000_000);
    assert!(state.table().guests[1].mem_total < 2_000_000);
    assert!(state.table().low_mem_mask.is_empty(), "fair-reclaim clears low_mem_mask for the whole tick");
}

#[test]
fn p3_percent_avail_always_clamped_after_tick() {
    let guest = GuestId(0);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![guest])
        .set_guest_max_mem_kib(guest, u64::MAX)
        // mem_free > mem_total: percent would be >100% without the MEM-1 clamp.
        .set_guest_mem_stats(guest, balloon_stats(1_000_000, 5_000_000))
        .set_host_total_kib(8_000_000)
        .set_host_free_kib(4_000_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    assert!(state.table().guests[0].percent_avail <= 100);
}

#[test]
fn p4_mem_total_never_exceeds_mem_max_after_adjustment() {
    let guest = GuestId(0);
    let mut fake = FakeAdapter::new();
    fake.set_guests(vec![guest])
        .set_guest_max_mem_kib(guest, 900_000)
        .set_guest_mem_stats(guest, balloon_stats(800_000, 50_000))
        .set_host_total_kib(8_000_000)
        .set_host_free_kib(4_000_000);

    let mut state = MemHostState::init(Box::new(fake), "test:///", MemConfig::with_defaults(1)).unwrap();
    state.tick().unwrap();

    assert!(state.table().guests[0].mem_total <= 900_000);
}
