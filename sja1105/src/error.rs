// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::platform::{MutexError, SpiError};

/// Every way a `sja1105::Device` operation can fail.
///
/// This is a flat enum rather than a tree of per-subsystem errors, matching
/// the `VscError`-style error currency used throughout this family of
/// drivers: callers match on one type, and `From` impls absorb whatever a
/// collaborator (SPI, mutex) returns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Argument violates a static precondition; no side effects occurred.
    Parameter,
    /// The device (or a port on it) is already configured; this is an
    /// idempotent guard, not a hard failure.
    AlreadyConfigured,
    /// A prior configuration step this call depends on was never taken.
    NotConfigured,
    /// Transport-level failure (includes the sentinel-echo detection in
    /// [`crate::transport::Transport::read_checked`]).
    Spi(SpiError),
    /// Device ID / part number mismatch with the configured variant.
    Id,
    /// Structural violation of the static-configuration image.
    StaticConf,
    /// A required table, or a table dependency, is absent from the image.
    MissingTable(u8),
    /// A CRC mismatch was observed (local or global, computed or reported
    /// by the switch). Always increments [`crate::counters::EventCounters::crc_errors`].
    Crc,
    /// RAM parity error latched by the switch; caller must reset and
    /// reload the static configuration.
    RamParity,
    /// Placeholder for SGMII and other features this driver doesn't
    /// implement (deferred at the source, per spec).
    NotImplemented,
    /// Structural mutex failure (distinct from [`Error::Busy`], which is
    /// the ordinary, recoverable "someone else is holding it" case).
    Mutex,
    /// Mutex acquisition timed out.
    Busy,
    /// Double-free, leak, or allocator exhaustion in the table-store
    /// allocator capability.
    DynMemory,
    /// The dynamic-reconfiguration ERRORS bit was set after a write; the
    /// edit was rejected and in-silicon state is unchanged.
    DynReconfig,
    /// A failure was observed while undoing a prior failure. This is
    /// catastrophic: the driver's mirror and the silicon may now disagree,
    /// and the caller should treat the handle as unusable until
    /// `deinit(hard)` + `init` with a known-good image.
    Revert,
    /// All four management-route slots are taken and none is evictable.
    NoFreeMgmtRoutes,
    /// The temperature-sensor binary search ended on a rail (guess stuck
    /// at 0 or 40); the true reading is outside the lookup table's range.
    TemperatureRange,
}

impl From<SpiError> for Error {
    fn from(e: SpiError) -> Self {
        Self::Spi(e)
    }
}

impl From<MutexError> for Error {
    fn from(e: MutexError) -> Self {
        match e {
            MutexError::Busy => Self::Busy,
            MutexError::Structural => Self::Mutex,
        }
    }
}
