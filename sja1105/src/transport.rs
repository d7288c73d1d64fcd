// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Framed SPI transport: control-frame construction, payload chunking,
//! mandated inter-transaction delays, and the flag-polling primitives
//! every other module builds on. Grounded on `SJA1105_ReadRegister` /
//! `SJA1105_WriteRegister` / `SJA1105_Reset` in `sja1105_spi.c`.

use ringbuf::*;

use crate::counters::EventCounters;
use crate::platform::{Level, Platform, SpiError};
use crate::regs;
use crate::Error;

#[derive(Copy, Clone, PartialEq)]
enum Trace {
    None,
    Read { addr: u32, words: u32 },
    Write { addr: u32, words: u32 },
    Reset,
    CfgReset,
    CheckSentinelObserved { addr: u32 },
}

ringbuf!(Trace, 16, Trace::None);

/// A known, non-trivial word sent as filler during a check-read's data
/// phase. If the chip echoes this exact value back, MISO is most likely
/// not actually wired up and we're just seeing our own MOSI looped
/// back — see `read_checked`.
pub const CHECK_SENTINEL: u32 = 0xa5a5_a5a5;

fn bounds_check(addr: u32, words: usize) -> Result<(), Error> {
    if words == 0 {
        return Ok(());
    }
    let last = addr
        .checked_add(words as u32 - 1)
        .ok_or(Error::Parameter)?;
    if last > regs::ADDRESS_MAX {
        return Err(Error::Parameter);
    }
    Ok(())
}

fn control_frame(write: bool, addr: u32, read_words: usize) -> u32 {
    let mut frame = 0u32;
    if write {
        frame |= 1 << 31;
    } else {
        let size_field = if read_words == 64 { 0 } else { read_words as u32 };
        frame |= (size_field & 0x3f) << 25;
    }
    frame |= (addr & ((1 << regs::ADDRESS_BITS) - 1)) << 4;
    frame
}

/// Wraps a [`Platform`] with the chip's framing/timing contract. Holds
/// no device state of its own; callers supply the mutable event
/// counters they want updated.
pub struct Transport<'p, P: Platform> {
    platform: &'p P,
}

impl<'p, P: Platform> Transport<'p, P> {
    pub fn new(platform: &'p P) -> Self {
        Self { platform }
    }

    /// Chunked read into `buf`, in bursts of at most
    /// [`regs::MAX_READ_BURST_WORDS`] words.
    pub fn read(
        &self,
        addr: u32,
        buf: &mut [u32],
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<(), Error> {
        bounds_check(addr, buf.len())?;
        let mut offset = 0usize;
        while offset < buf.len() {
            let chunk = core::cmp::min(regs::MAX_READ_BURST_WORDS, buf.len() - offset);
            self.read_burst(addr + offset as u32, &mut buf[offset..offset + chunk], timeout_ms)?;
            offset += chunk;
        }
        counters.on_words_read(buf.len());
        ringbuf_entry!(Trace::Read {
            addr,
            words: buf.len() as u32
        });
        Ok(())
    }

    /// Single-word read that detects a disconnected MISO line by
    /// transmitting [`CHECK_SENTINEL`] during the data phase (via the
    /// full-duplex [`Platform::spi_exchange`]) and failing if the chip
    /// echoes it back unchanged — a straight loop-back of our own MOSI
    /// is the most likely explanation for ever seeing it.
    pub fn read_checked(
        &self,
        addr: u32,
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<u32, Error> {
        bounds_check(addr, 1)?;
        self.platform.delay_ns(regs::T_SPI_WR_NS);
        self.platform.set_cs(Level::Low);
        self.platform.delay_ns(regs::T_SPI_LEAD_NS);

        let frame = control_frame(false, addr, 1);
        self.platform.spi_write(&frame.to_be_bytes(), timeout_ms)?;

        self.platform.delay_ns(regs::T_SPI_CTRL_DATA_NS);
        let tx = CHECK_SENTINEL.to_be_bytes();
        let mut rx = [0u8; 4];
        self.platform.spi_exchange(&tx, &mut rx, timeout_ms)?;

        self.platform.delay_ns(regs::T_SPI_LAG_NS);
        self.platform.set_cs(Level::High);

        let word = u32::from_be_bytes(rx);
        counters.on_words_read(1);
        if word == CHECK_SENTINEL {
            ringbuf_entry!(Trace::CheckSentinelObserved { addr });
            return Err(Error::Spi(SpiError::Peripheral));
        }
        ringbuf_entry!(Trace::Read { addr, words: 1 });
        Ok(word)
    }

    fn read_burst(&self, addr: u32, buf: &mut [u32], timeout_ms: u32) -> Result<(), Error> {
        debug_assert!(buf.len() <= regs::MAX_READ_BURST_WORDS);
        self.platform.delay_ns(regs::T_SPI_WR_NS);
        self.platform.set_cs(Level::Low);
        self.platform.delay_ns(regs::T_SPI_LEAD_NS);

        let frame = control_frame(false, addr, buf.len());
        self.platform.spi_write(&frame.to_be_bytes(), timeout_ms)?;

        self.platform.delay_ns(regs::T_SPI_CTRL_DATA_NS);
        let mut rx = [0u8; regs::MAX_READ_BURST_WORDS * 4];
        let rx_len = buf.len() * 4;
        self.platform.spi_read(&mut rx[..rx_len], timeout_ms)?;
        for (word, bytes) in buf.iter_mut().zip(rx.chunks_exact(4)) {
            *word = u32::from_be_bytes(bytes.try_into().unwrap());
        }

        self.platform.delay_ns(regs::T_SPI_LAG_NS);
        self.platform.set_cs(Level::High);
        Ok(())
    }

    /// Single SPI burst; the chip accepts unbounded write payloads.
    pub fn write(
        &self,
        addr: u32,
        words: &[u32],
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<(), Error> {
        bounds_check(addr, words.len())?;
        self.write_burst(addr, words, timeout_ms)?;
        counters.on_words_written(words.len());
        ringbuf_entry!(Trace::Write {
            addr,
            words: words.len() as u32
        });
        Ok(())
    }

    fn write_burst(&self, addr: u32, words: &[u32], timeout_ms: u32) -> Result<(), Error> {
        self.platform.delay_ns(regs::T_SPI_WR_NS);
        self.platform.set_cs(Level::Low);
        self.platform.delay_ns(regs::T_SPI_LEAD_NS);

        let frame = control_frame(true, addr, 0);
        self.platform.spi_write(&frame.to_be_bytes(), timeout_ms)?;
        for word in words {
            self.platform.spi_write(&word.to_be_bytes(), timeout_ms)?;
        }

        self.platform.delay_ns(regs::T_SPI_LAG_NS);
        self.platform.set_cs(Level::High);
        Ok(())
    }

    /// Streams a table's header/data/data_crc to `addr` (spec.md §4.1's
    /// `write_table`). Requires `data_crc_valid` on entry — callers
    /// recompute missing CRCs before calling this. When
    /// `accumulate_crc` is set, every word actually streamed (header,
    /// header CRC, data, data CRC) is folded into the platform's
    /// running global-CRC computation, matching the source's "also
    /// accumulates the bytes written into the crc" safe-mode behavior.
    pub fn write_table(
        &self,
        addr: u32,
        id: u8,
        size: u32,
        header_crc: u32,
        data: &[u32],
        data_crc: u32,
        safe: bool,
        accumulate_crc: bool,
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<(), Error> {
        let header = [(id as u32) << regs::STATIC_CONF_BLOCK_ID_SHIFT, size];
        self.write(addr, &header, timeout_ms, counters)?;
        self.write(addr + 2, &[header_crc], timeout_ms, counters)?;
        self.write(addr + 3, data, timeout_ms, counters)?;
        self.write(addr + 3 + size, &[data_crc], timeout_ms, counters)?;

        if accumulate_crc {
            self.platform.crc_accumulate(&header);
            self.platform.crc_accumulate(&[header_crc]);
            self.platform.crc_accumulate(data);
            self.platform.crc_accumulate(&[data_crc]);
        }

        if safe {
            let flags = self.read_static_conf_flags(timeout_ms, counters)?;
            if flags.contains(regs::StaticConfFlags::CRCCHKL) {
                counters.on_crc_error();
                return Err(Error::Crc);
            }
        }
        Ok(())
    }

    fn read_flag_value(
        &self,
        addr: u32,
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<u32, Error> {
        let mut buf = [0u32; 1];
        self.read(addr, &mut buf, timeout_ms, counters)?;
        Ok(buf[0])
    }

    /// Reads the static-configuration flags register.
    pub fn read_static_conf_flags(
        &self,
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<regs::StaticConfFlags, Error> {
        let value = self.read_flag_value(regs::STATIC_CONF_FLAGS_ADDR, timeout_ms, counters)?;
        Ok(regs::StaticConfFlags::from_bits_truncate(value))
    }

    /// Up to 10 reads spaced `timeout/10` apart; returns `Spi(Timeout)`
    /// on exhaustion.
    pub fn poll_flag(
        &self,
        addr: u32,
        mask: u32,
        polarity: bool,
        timeout_ms: u32,
        counters: &mut EventCounters,
    ) -> Result<(), Error> {
        let step = core::cmp::max(1, timeout_ms / 10);
        for attempt in 0..10 {
            let value = self.read_flag_value(addr, timeout_ms, counters)?;
            if ((value & mask != 0)) == polarity {
                return Ok(());
            }
            if attempt != 9 {
                self.platform.sleep_ms(step);
            }
        }
        Err(Error::Spi(SpiError::Timeout))
    }

    pub fn read_flag(
        &self,
        addr: u32,
        mask: u32,
        counters: &mut EventCounters,
    ) -> Result<bool, Error> {
        let value = self.read_flag_value(addr, 100, counters)?;
        Ok(value & mask != 0)
    }

    /// Pulses RST_N low for 5 µs, releases it, then waits 1 ms of
    /// cooperative sleep before any further SPI access — long enough to
    /// cover `T_RST_STARTUP_HW` (329 µs), rounded up to the coarsest unit
    /// [`Platform::sleep_ms`] can express. The 5 µs assertion itself is
    /// still a blocking spin: it's far below any yieldable granularity.
    pub fn full_reset(&self, counters: &mut EventCounters) {
        self.platform.set_reset(Level::Low);
        self.platform.delay_ns(regs::T_RST_NS);
        self.platform.set_reset(Level::High);
        self.platform.sleep_ms(1);
        counters.on_reset();
        ringbuf_entry!(Trace::Reset);
    }

    /// Writes the RGU configuration-reset bit and waits
    /// `T_CFG_RESET_NS`.
    pub fn cfg_reset(&self, counters: &mut EventCounters) -> Result<(), Error> {
        self.write(
            regs::RGU_RESET_CTRL_ADDR,
            &[regs::RGU_CFG_RESET_MASK],
            100,
            counters,
        )?;
        self.platform.delay_ns(regs::T_CFG_RESET_NS);
        ringbuf_entry!(Trace::CfgReset);
        Ok(())
    }
}
