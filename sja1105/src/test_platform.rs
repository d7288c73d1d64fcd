// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A software-simulated [`Platform`] standing in for the switch plus
//! every collaborator capability, used only by `#[cfg(test)]` code.
//!
//! The register file is a flat word-addressed map, populated the way the
//! real chip's SPI framing would: the first [`Platform::spi_write`]
//! after chip-select goes low is decoded as a control frame (matching
//! `transport.rs`'s `control_frame`/`read_burst`/`write_burst`), and
//! subsequent words are read from or written to that address,
//! incrementing. This is enough to drive every module in this crate
//! without a real switch, the same role `drv/vsc7448`'s host-side mock
//! register map plays for its own property tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::platform::{AllocError, Level, MutexError, Platform, SpiError};

#[derive(Copy, Clone)]
struct Pending {
    addr: u32,
    cursor: u32,
}

/// A fault to inject on the next matching SPI access; consumed on use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Fail the control-frame phase of any transaction touching `addr`.
    Addr(u32),
}

pub struct TestPlatform {
    registers: RefCell<HashMap<u32, u32>>,
    pending: Cell<Option<Pending>>,
    expecting_control: Cell<bool>,
    cs_level: Cell<Level>,
    reset_level: Cell<Level>,
    time_ms: Cell<u32>,
    mutex_locked: Cell<bool>,
    allocations: RefCell<HashSet<usize>>,
    crc: Cell<u32>,
    faults: RefCell<Vec<Fault>>,
    /// The LUT index the temperature-sensor comparator simulation
    /// should converge to; `None` leaves `ACU_TS_STATUS_ADDR` untouched.
    temp_target: Cell<Option<u32>>,
    /// Every `(cs_level, was_sleep)` sample taken around a `sleep_ms`
    /// call, for property 6 ("no CS straddles a ms sleep").
    pub sleep_cs_log: RefCell<Vec<Level>>,
    pub sleep_calls: Cell<u32>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self {
            registers: RefCell::new(HashMap::new()),
            pending: Cell::new(None),
            expecting_control: Cell::new(false),
            cs_level: Cell::new(Level::High),
            reset_level: Cell::new(Level::High),
            time_ms: Cell::new(0),
            mutex_locked: Cell::new(false),
            allocations: RefCell::new(HashSet::new()),
            crc: Cell::new(0),
            faults: RefCell::new(Vec::new()),
            temp_target: Cell::new(None),
            sleep_cs_log: RefCell::new(Vec::new()),
            sleep_calls: Cell::new(0),
        }
    }

    pub fn poke(&self, addr: u32, value: u32) {
        self.registers.borrow_mut().insert(addr, value);
    }

    pub fn peek(&self, addr: u32) -> u32 {
        *self.registers.borrow().get(&addr).unwrap_or(&0)
    }

    pub fn advance_ms(&self, ms: u32) {
        self.time_ms.set(self.time_ms.get().wrapping_add(ms));
    }

    pub fn inject_fault(&self, fault: Fault) {
        self.faults.borrow_mut().push(fault);
    }

    pub fn outstanding_allocations(&self) -> usize {
        self.allocations.borrow().len()
    }

    /// Arms the temperature-sensor comparator simulation: every ACU
    /// threshold-register write from here on reports "exceeded" iff the
    /// written guess is at or below `index`, so [`crate::temp::read_temperature_x10`]'s
    /// binary search converges on `index`.
    pub fn set_temperature_index(&self, index: u32) {
        self.temp_target.set(Some(index));
    }

    fn take_matching_fault(&self, addr: u32) -> bool {
        let mut faults = self.faults.borrow_mut();
        if let Some(pos) = faults.iter().position(|f| matches!(f, Fault::Addr(a) if *a == addr))
        {
            faults.remove(pos);
            true
        } else {
            false
        }
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn is_dynreconf_ctrl_addr(addr: u32) -> bool {
    addr == crate::regs::DYN_MAC_CONFIG_CTRL_ADDR
        || addr == crate::regs::DYN_L2_LOOKUP_CTRL_ADDR
        || addr == crate::regs::DYN_MGMT_ROUTE_CTRL_ADDR
}

/// Standard reflected CRC-32 (the common "CRC-32/ISO-HDLC" polynomial).
/// Nothing in this crate's tests needs this to match the real switch's
/// polynomial bit-for-bit (see [`Platform::crc_accumulate`]'s doc
/// comment) — only internal self-consistency, which any correct CRC-32
/// gives.
fn crc32_update(mut crc: u32, bytes: &[u8]) -> u32 {
    for &byte in bytes {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xedb8_8320 } else { crc >> 1 };
        }
    }
    crc
}

/// Builds a minimal, valid static-configuration image for `config`: the
/// six required tables (spec.md §3), with `mac_configuration` and
/// `xmii_mode_parameters` populated to match `config.ports` exactly (so
/// [`crate::static_conf::load`]'s validators accept it), and every CRC
/// left zero to exercise the autofill convention (spec.md §4.2 step 2d/e).
/// `general_parameters`' host-port field is set from `config.host_port`.
/// CGU and ACU are deliberately omitted — the driver back-fills both
/// from the port descriptors regardless of what the image supplies.
pub fn build_valid_image(config: &crate::config::DeviceConfig) -> Vec<u32> {
    use crate::config::{Interface, PortRole};
    use crate::regs;
    use crate::tables::{mac_configuration, xmii_mode};

    let mut mac_conf = vec![0u32; regs::MAC_CONF_ENTRY_WORDS * crate::config::NUM_PORTS];
    let mut xmii = vec![0u32; regs::XMII_MODE_PARAMETERS_WORDS];
    for port in &config.ports {
        if !port.configured {
            continue;
        }
        mac_configuration::set_speed(&mut mac_conf, port.port_num, port.speed);
        xmii_mode::set_interface(&mut xmii, port.port_num, port.interface);
        let role = if port.interface == Interface::Sgmii {
            PortRole::Mac
        } else if port.interface == Interface::Rmii
            && port.role == PortRole::Phy
            && port.output_rmii_refclk
        {
            PortRole::Mac
        } else {
            port.role
        };
        xmii_mode::set_role(&mut xmii, port.port_num, role);
    }

    let mut general = vec![0u32; regs::GENERAL_PARAMETERS_WORDS];
    general[4] = (config.host_port as u32) << 14;

    let mut words = vec![config.variant.device_id()];
    push_table(&mut words, regs::BLOCK_ID_L2_POLICING, &[0]);
    push_table(&mut words, regs::BLOCK_ID_L2_FORWARDING, &[0]);
    push_table(
        &mut words,
        regs::BLOCK_ID_L2_FORWARDING_PARAMETERS,
        &[0; regs::L2_FORWARDING_PARAMETERS_WORDS],
    );
    push_table(&mut words, regs::BLOCK_ID_MAC_CONFIGURATION, &mac_conf);
    push_table(&mut words, regs::BLOCK_ID_GENERAL_PARAMETERS, &general);
    push_table(&mut words, regs::BLOCK_ID_XMII_MODE_PARAMETERS, &xmii);
    words.extend_from_slice(&[0, 0, 0]);
    words
}

fn push_table(words: &mut Vec<u32>, id: u8, data: &[u32]) {
    words.push((id as u32) << crate::regs::STATIC_CONF_BLOCK_ID_SHIFT);
    words.push(data.len() as u32);
    words.push(0);
    words.extend_from_slice(data);
    words.push(0);
}

/// A default 5-port configuration matching spec.md §8's "Initial
/// bring-up, variant Q" scenario: port 0 MII/PHY dynamic, ports 1-3
/// RGMII/MAC fixed speeds (1G each), port 4 SGMII/MAC fixed at 100M.
pub fn scenario_q_config() -> crate::config::DeviceConfig {
    use crate::config::{DeviceConfig, Interface, PortConfig, PortRole, Speed, Variant, Voltage};

    let mut ports = [PortConfig::unconfigured(0); 5];
    ports[0] = PortConfig {
        port_num: 0,
        interface: Interface::Mii,
        role: PortRole::Phy,
        speed: Speed::Dynamic,
        voltage: Voltage::V3_3,
        output_rmii_refclk: false,
        configured: true,
    };
    for (i, port) in ports.iter_mut().enumerate().take(4).skip(1) {
        *port = PortConfig {
            port_num: i as u8,
            interface: Interface::Rgmii,
            role: PortRole::Mac,
            speed: Speed::Speed1G,
            voltage: Voltage::V2_5,
            output_rmii_refclk: false,
            configured: true,
        };
    }
    ports[4] = PortConfig {
        port_num: 4,
        interface: Interface::Sgmii,
        role: PortRole::Mac,
        speed: Speed::Speed100M,
        voltage: Voltage::Unspecified,
        output_rmii_refclk: false,
        configured: true,
    };

    DeviceConfig {
        variant: Variant::Q,
        ports,
        mutex_timeout_ms: 100,
        mgmt_route_timeout_ms: 1000,
        host_port: 0,
        skew_clocks: false,
        switch_id: 0,
        ports_start_enabled: false,
    }
}

/// Pokes the two registers a successful [`crate::device::Device::init`]
/// needs to see from a real chip that this software model can't derive
/// on its own: the ACU product-id register (checked by
/// `device::check_part_id`) and the static-configuration flags register
/// with CONFIGS already latched (what a real switch reports once it has
/// accepted an image — this fixture can't reproduce the chip's internal
/// acceptance logic, so it's asserted as a precondition instead).
pub fn setup_for_init(platform: &TestPlatform, config: &crate::config::DeviceConfig) {
    use crate::regs;
    let part_nr = regs::expected_part_nr(config.variant);
    platform.poke(
        regs::ACU_PROD_ID_ADDR,
        (part_nr as u32) << regs::ACU_PART_NR_SHIFT,
    );
    platform.poke(
        regs::STATIC_CONF_FLAGS_ADDR,
        regs::STATIC_CONF_FLAGS_CONFIGS_MASK,
    );
}

impl Platform for TestPlatform {
    fn now_ms(&self) -> u32 {
        self.time_ms.get()
    }

    fn sleep_ms(&self, ms: u32) {
        self.sleep_calls.set(self.sleep_calls.get() + 1);
        self.sleep_cs_log.borrow_mut().push(self.cs_level.get());
        self.time_ms.set(self.time_ms.get().wrapping_add(ms));
    }

    fn delay_ns(&self, _ns: u32) {}

    fn take_mutex(&self, _timeout_ms: u32) -> Result<(), MutexError> {
        if self.mutex_locked.get() {
            return Err(MutexError::Busy);
        }
        self.mutex_locked.set(true);
        Ok(())
    }

    fn give_mutex(&self) -> Result<(), MutexError> {
        if !self.mutex_locked.get() {
            return Err(MutexError::Structural);
        }
        self.mutex_locked.set(false);
        Ok(())
    }

    fn alloc(&self, words: usize) -> Result<&'static mut [u32], AllocError> {
        let buf: &'static mut [u32] = Box::leak(vec![0u32; words].into_boxed_slice());
        self.allocations.borrow_mut().insert(buf.as_ptr() as usize);
        Ok(buf)
    }

    fn free(&self, buf: &'static mut [u32]) {
        let key = buf.as_ptr() as usize;
        if !self.allocations.borrow_mut().remove(&key) {
            // Double free; tests that exercise this look at
            // `outstanding_allocations` instead of panicking here, since
            // `free` itself has no error return in the capability
            // contract (spec.md's `DynMemory` surfaces at the call site
            // that detects it, not here).
            return;
        }
        // SAFETY: `buf` was produced by `Box::leak` in `alloc` above and
        // the key was still present in `allocations`, so this is the
        // first and only `free` of this allocation.
        unsafe {
            drop(Box::from_raw(buf as *mut [u32]));
        }
    }

    fn free_all(&self) {
        self.allocations.borrow_mut().clear();
    }

    fn crc_reset(&self) {
        self.crc.set(0xffff_ffff);
    }

    fn crc_accumulate(&self, words: &[u32]) -> u32 {
        let mut crc = self.crc.get();
        for word in words {
            crc = crc32_update(crc, &word.to_be_bytes());
        }
        self.crc.set(crc);
        crc ^ 0xffff_ffff
    }

    fn spi_exchange(&self, tx: &[u8], rx: &mut [u8], timeout_ms: u32) -> Result<(), SpiError> {
        // Outside an established transaction this is the control-frame
        // phase, identical to a plain `spi_write`.
        if self.expecting_control.get() {
            self.spi_write(tx, timeout_ms)?;
            return self.spi_read(rx, timeout_ms);
        }
        // Inside the data phase of an already-framed transaction, a real
        // full-duplex read drives MISO from the chip's register content
        // no matter what junk the master clocks out on MOSI — so `tx`
        // is only ever actually echoed back when the register genuinely
        // holds that value. Mirrors `spi_read`, `tx` unused.
        let _ = tx;
        self.spi_read(rx, timeout_ms)
    }

    fn spi_write(&self, tx: &[u8], _timeout_ms: u32) -> Result<(), SpiError> {
        if self.expecting_control.get() {
            self.expecting_control.set(false);
            let frame = u32::from_be_bytes(tx.try_into().map_err(|_| SpiError::Peripheral)?);
            let write = frame & (1 << 31) != 0;
            let addr = (frame >> 4) & ((1 << 21) - 1);
            if self.take_matching_fault(addr) {
                return Err(SpiError::Peripheral);
            }
            self.pending.set(Some(Pending { addr, cursor: 0 }));
            let _ = write; // direction only affects which of spi_write/spi_read runs next
            return Ok(());
        }
        let mut pending = self.pending.get().ok_or(SpiError::Peripheral)?;
        let word = u32::from_be_bytes(tx.try_into().map_err(|_| SpiError::Peripheral)?);
        let addr = pending.addr + pending.cursor;
        // The three dynamic-reconfiguration control registers service a
        // VALID command synchronously here — this model has no latency to
        // speak of, so there's no separate instant at which a real chip's
        // state machine would still be busy. Without this, `wait_valid_clear`
        // would poll a VALID bit this software model never clears on its
        // own and every dynreconf handshake would time out.
        let stored = if is_dynreconf_ctrl_addr(addr) {
            word & !crate::regs::DYNCONF_VALID_MASK
        } else {
            word
        };
        self.registers.borrow_mut().insert(addr, stored);
        if addr == crate::regs::ACU_TS_CONFIG_ADDR {
            if let Some(target) = self.temp_target.get() {
                let guess = (stored & crate::regs::ACU_TS_CONFIG_THRESHOLD_MASK)
                    >> crate::regs::ACU_TS_CONFIG_THRESHOLD_SHIFT;
                let status = if guess <= target { crate::regs::ACU_TS_STATUS_EXCEEDED_MASK } else { 0 };
                self.registers.borrow_mut().insert(crate::regs::ACU_TS_STATUS_ADDR, status);
            }
        }
        pending.cursor += 1;
        self.pending.set(Some(pending));
        Ok(())
    }

    fn spi_read(&self, rx: &mut [u8], _timeout_ms: u32) -> Result<(), SpiError> {
        let pending = self.pending.get().ok_or(SpiError::Peripheral)?;
        for (i, chunk) in rx.chunks_exact_mut(4).enumerate() {
            let value = self
                .registers
                .borrow()
                .get(&(pending.addr + i as u32))
                .copied()
                .unwrap_or(0);
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        self.pending.set(None);
        Ok(())
    }

    fn set_cs(&self, level: Level) {
        if level == Level::Low {
            self.expecting_control.set(true);
        } else {
            self.pending.set(None);
        }
        self.cs_level.set(level);
    }

    fn set_reset(&self, level: Level) {
        self.reset_level.set(level);
    }
}
