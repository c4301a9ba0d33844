//! # hostctl-core
//!
//! Decision core shared by the `hostctl-cpud` and `hostctl-memd` daemons.
//!
//! This crate holds no binaries and talks to no real hypervisor. It is
//! written entirely against the [`adapter::HostAdapter`] trait — an
//! injected capability — so that the two daemon binaries can each wire in
//! a concrete transport while this crate's algorithms stay transport-free
//! and unit-testable via [`testing::FakeAdapter`].
//!
//! ## Key properties
//!
//! - Single-threaded cooperative control loop, no async runtime
//! - Bitmask classifiers bounded to 32 entities, scanned lowest-bit-first
//! - An index arena (not raw pointers) for the vCPU pinning ring
//! - No persisted state: every daemon restarts cold
//!
//! ## Quick start
//!
//! ```rust
//! use hostctl_core::adapter::GuestId;
//! use hostctl_core::cpu::{CpuConfig, CpuHostState};
//! use hostctl_core::testing::FakeAdapter;
//!
//! let mut fake = FakeAdapter::new();
//! fake.set_guests(vec![GuestId(0), GuestId(1)]);
//! fake.set_num_pcpus(2);
//!
//! let state = CpuHostState::init(Box::new(fake), "test:///", CpuConfig::with_defaults(1))
//!     .expect("init should succeed with a programmed fake adapter");
//! assert_eq!(state.table().total_pinned(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! adapter::HostAdapter (trait)  <-- injected
//!          ^
//!          |
//!   cpu::CpuHostState           mem::MemHostState
//!    ├─ cpu::sampler             ├─ mem::sampler
//!    ├─ cpu::classifier          ├─ mem::classifier
//!    └─ cpu::planner             └─ mem::adjuster
//!          \                           /
//!           `--- control_loop::run_loop ---`
//! ```

pub mod adapter;
pub mod bitset;
pub mod control_loop;
pub mod cpu;
pub mod error;
pub mod mem;
pub mod testing;
