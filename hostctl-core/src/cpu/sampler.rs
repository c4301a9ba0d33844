//! Per-tick counter sampling for the CPU scheduler (§4.2).

use crate::adapter::HostAdapter;
use crate::bitset::Bitset32;
use crate::error::AdapterError;

use super::model::CpuTable;

/// Clamps a signed percentage into `0..=100`.
fn clamp_pct(v: i64) -> u8 {
    v.clamp(0, 100) as u8
}

/// Samples every pCPU's idle counter and converts the delta over `t_secs`
/// into a utilization percentage.
///
/// Returns the set of pCPUs whose utilization was validly refreshed this
/// tick. A pCPU is left out of that set (and its cached `util` left
/// unchanged) when its counter regressed, per the adapter contract's note
/// that a regression is a sampling error local to that entity, not a
/// tick-fatal one. A hard read failure, by contrast, is propagated and
/// aborts the tick (§7: per-tick sample errors are fatal by default).
pub fn sample_pcpus(
    table: &mut CpuTable,
    adapter: &dyn HostAdapter,
    t_secs: u64,
) -> Result<Bitset32, AdapterError> {
    let t_ns = t_secs as i64 * 1_000_000_000;
    let mut valid = Bitset32::empty();

    for p in &mut table.pcpus {
        let idle_now = adapter.pcpu_idle_ns(p.id)?;
        if idle_now < p.last_idle_ns {
            tracing::warn!(pcpu = p.id, prev = p.last_idle_ns, now = idle_now, "idle counter regressed, skipping");
            continue;
        }
        let delta = (idle_now - p.last_idle_ns) as i64;
        p.util = clamp_pct(100 - delta * 100 / t_ns);
        p.last_idle_ns = idle_now;
        valid.set(p.id);
    }

    Ok(valid)
}

/// Samples every vCPU's cumulative run-time counter and converts the delta
/// over `t_secs` into a utilization percentage. Same regression handling as
/// [`sample_pcpus`].
pub fn sample_vcpus(
    table: &mut CpuTable,
    adapter: &dyn HostAdapter,
    t_secs: u64,
) -> Result<Bitset32, AdapterError> {
    let t_ns = t_secs as i64 * 1_000_000_000;
    let mut valid = Bitset32::empty();

    for (i, v) in table.vcpus.iter_mut().enumerate() {
        let info = adapter.guest_vcpu_info(v.guest)?;
        if info.runtime_ns < v.last_runtime_ns {
            tracing::warn!(guest = ?v.guest, prev = v.last_runtime_ns, now = info.runtime_ns, "vCPU run-time counter regressed, skipping");
            continue;
        }
        let delta = (info.runtime_ns - v.last_runtime_ns) as i64;
        v.util = clamp_pct(delta * 100 / t_ns);
        v.last_runtime_ns = info.runtime_ns;
        if i < 32 {
            valid.set(i);
        }
    }

    Ok(valid)
}
