//! Error types for the host control-loop core.
//!
//! Every fallible host-interface operation (§4.1 of the adapter contract)
//! surfaces through [`AdapterError`]; every fallible core operation —
//! including adapter failures — surfaces through [`HostCtlError`]. The
//! numeric codes on [`HostCtlError::code`] are the exit-status contract the
//! binaries print to stderr and exit with.

use thiserror::Error;

/// Errors raised by a [`crate::adapter::HostAdapter`] implementation.
///
/// These map directly onto the operations in the host-adapter contract;
/// each variant names the operation that failed, not the transport reason,
/// since the core never depends on why an adapter call failed, only that it
/// did.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Failed to open a session with the hypervisor.
    #[error("hypervisor connection failed: {0}")]
    Conn(String),

    /// Guest-list retrieval failed.
    #[error("guest list retrieval failed: {0}")]
    List(String),

    /// The hypervisor reported zero active guests.
    #[error("no active guests")]
    NoGuests,

    /// A host-level info query failed (total memory, pCPU count, ...).
    #[error("host info query failed: {0}")]
    HostInfo(String),

    /// The host free-memory query failed.
    #[error("host free-memory query failed: {0}")]
    HostFree(String),

    /// A per-pCPU idle-time counter query failed.
    #[error("pCPU {pcpu} idle-counter query failed: {source}")]
    PcpuIdle {
        /// The pCPU whose counter could not be read.
        pcpu: usize,
        /// The underlying transport error.
        source: String,
    },

    /// A per-guest vCPU/memory info query failed.
    #[error("guest info query failed: {0}")]
    GuestInfo(String),

    /// A guest balloon-stats query failed.
    #[error("guest memory-stats query failed: {0}")]
    GuestMem(String),

    /// A vCPU pin request failed.
    #[error("failed to pin vCPU for guest {guest} to pCPU {pcpu}: {source}")]
    Pin {
        /// Index of the guest whose vCPU could not be pinned.
        guest: usize,
        /// Target pCPU id.
        pcpu: usize,
        /// The underlying transport error.
        source: String,
    },
}

/// The top-level error type for the control-loop core.
///
/// This is what `init`, a single tick, and `teardown` all return. It wraps
/// [`AdapterError`] plus the handful of core-only failure modes that are not
/// the adapter's fault (out-of-memory allocating internal tables, invalid
/// configuration from the CLI layer).
#[derive(Error, Debug)]
pub enum HostCtlError {
    /// An underlying host-adapter call failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Allocating an internal per-entity table failed (table sized beyond
    /// `N <= 32`, or a genuine allocation failure).
    #[error("failed to allocate internal tables: {0}")]
    OutOfMemory(String),

    /// CLI-supplied configuration was invalid (e.g. zero interval).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HostCtlError {
    /// Maps this error onto the §6.2 numeric error code.
    ///
    /// Binaries print this value to stderr and use it (negated back to a
    /// small positive status, since process exit codes are unsigned bytes)
    /// as the process exit status.
    pub fn code(&self) -> i32 {
        match self {
            HostCtlError::Adapter(AdapterError::Conn(_)) => -1,
            HostCtlError::Adapter(AdapterError::NoGuests) => -2,
            HostCtlError::Adapter(AdapterError::List(_)) => -3,
            HostCtlError::OutOfMemory(_) => -4,
            HostCtlError::Adapter(AdapterError::GuestInfo(_) | AdapterError::GuestMem(_)) => -5,
            HostCtlError::Adapter(
                AdapterError::HostFree(_) | AdapterError::HostInfo(_) | AdapterError::PcpuIdle { .. },
            ) => -6,
            HostCtlError::Adapter(AdapterError::Pin { .. }) => -5,
            HostCtlError::InvalidConfig(_) => -4,
        }
    }
}

/// Convenience alias for `Result<T, HostCtlError>`.
pub type Result<T> = std::result::Result<T, HostCtlError>;
