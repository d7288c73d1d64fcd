// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The capability set this driver is built against.
//!
//! Nothing in this crate talks to an SPI peripheral, a GPIO pin, an RTOS
//! mutex, or an allocator directly. Instead, a single [`Platform`]
//! implementation is injected by the host firmware, in the same spirit as
//! `drv/vsc7448`'s `Vsc7448Rw` trait or `drv/spi-api`'s `SpiServer` — the
//! driver is generic over it, and a host-side mock implementation lets the
//! whole static-configuration/dynamic-reconfiguration/port-control stack be
//! exercised without any hardware.

/// Transport-level failure reported by the SPI capability.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpiError {
    /// The peripheral driver reported a failure (framing, overrun, NACK).
    Peripheral,
    /// No response was observed within the caller-specified timeout.
    Timeout,
}

/// Structural failure reported by the mutex capability.
///
/// `Busy` (acquisition timed out) is recoverable and distinct from
/// `Structural` (e.g. releasing a mutex the caller doesn't hold), which
/// indicates a bug in the driver or its host and is not expected to occur
/// in a well-behaved integration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MutexError {
    Busy,
    Structural,
}

/// Failure reported by the 32-bit-word allocator capability.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllocError {
    OutOfMemory,
    DoubleFree,
}

/// Logic level for a GPIO line driven by this driver (chip-select and
/// reset).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Low,
    High,
}

/// The capability set consumed by the driver from its host.
///
/// Every method takes `&self`: callers are expected to hand the driver a
/// cheaply-`Clone`-able handle (as `SpiDevice<S>` does for `SpiServer`), not
/// a uniquely-owned `&mut`. Serialization across capability calls is the
/// driver's job, done with [`Platform::take_mutex`]/[`Platform::give_mutex`]
/// around every public operation (see `device.rs`).
pub trait Platform {
    /// Monotonic milliseconds. Subtracting an earlier reading from a later
    /// one must be correct across a single wraparound.
    fn now_ms(&self) -> u32;

    /// Cooperative sleep; yields to the scheduler. Never called while a
    /// chip-select is asserted.
    fn sleep_ms(&self, ms: u32);

    /// Blocking, non-yielding spin wait for sub-millisecond SPI timings.
    /// On platforms whose shortest yieldable sleep is much larger than the
    /// requested delay, this must busy-wait rather than call
    /// [`Platform::sleep_ms`].
    fn delay_ns(&self, ns: u32);

    /// Acquire the device mutex, waiting up to `timeout_ms`.
    fn take_mutex(&self, timeout_ms: u32) -> Result<(), MutexError>;

    /// Release the device mutex.
    fn give_mutex(&self) -> Result<(), MutexError>;

    /// Obtain a zeroed, statically-owned buffer of `words` 32-bit words for
    /// a variable-length table's data. The table store calls this once per
    /// table (the source's five separate per-field allocations are
    /// collapsed into one, since this driver keeps a table's id/size/CRCs
    /// as plain struct fields rather than separately-owned buffers).
    fn alloc(&self, words: usize) -> Result<&'static mut [u32], AllocError>;

    /// Release a single allocation made with [`Platform::alloc`].
    fn free(&self, buf: &'static mut [u32]);

    /// Release every outstanding allocation made through this capability,
    /// e.g. during a hard `deinit`.
    fn free_all(&self);

    /// Start a new running CRC-32 computation. Must use the same
    /// polynomial/reflection/endianness the switch itself uses (see
    /// spec image-format notes); this is the one piece of the transport
    /// that must bit-for-bit match the chip.
    fn crc_reset(&self);

    /// Accumulate `words` into the running CRC started by the most recent
    /// [`Platform::crc_reset`] and return the CRC so far.
    fn crc_accumulate(&self, words: &[u32]) -> u32;

    /// Full-duplex SPI exchange: `tx.len() == rx.len()`, 32-bit-word
    /// granularity (callers always pass a whole number of words' worth of
    /// bytes), MSB-first, CPOL=low/CPHA=2nd-edge, software NSS.
    fn spi_exchange(
        &self,
        tx: &[u8],
        rx: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), SpiError>;

    /// Write-only SPI transaction.
    fn spi_write(&self, tx: &[u8], timeout_ms: u32) -> Result<(), SpiError>;

    /// Read-only SPI transaction (clocked with dummy/don't-care output).
    fn spi_read(&self, rx: &mut [u8], timeout_ms: u32) -> Result<(), SpiError>;

    /// Drive the chip-select line.
    fn set_cs(&self, level: Level);

    /// Drive the reset line.
    fn set_reset(&self, level: Level);
}
