// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dynamic-reconfiguration VALID/ERRORS handshake, parameterized
//! over a table's register window (spec.md §4.4). Every table that
//! supports post-init edits goes through one of these windows; only
//! the window addresses and entry width differ between tables.

use crate::counters::EventCounters;
use crate::platform::Platform;
use crate::regs;
use crate::transport::Transport;
use crate::Error;

/// A dynamic-reconfiguration register window: one control register and
/// a run of data registers.
#[derive(Copy, Clone)]
pub struct Window {
    pub ctrl_addr: u32,
    pub data_addr: u32,
    pub entry_words: usize,
}

pub const MAC_CONFIG: Window = Window {
    ctrl_addr: regs::DYN_MAC_CONFIG_CTRL_ADDR,
    data_addr: regs::DYN_MAC_CONFIG_DATA_ADDR,
    entry_words: regs::MAC_CONF_ENTRY_WORDS,
};

pub const L2_LOOKUP: Window = Window {
    ctrl_addr: regs::DYN_L2_LOOKUP_CTRL_ADDR,
    data_addr: regs::DYN_L2_LOOKUP_DATA_ADDR,
    entry_words: regs::DYN_L2_LOOKUP_ENTRY_WORDS,
};

pub const MGMT_ROUTE: Window = Window {
    ctrl_addr: regs::DYN_MGMT_ROUTE_CTRL_ADDR,
    data_addr: regs::DYN_MGMT_ROUTE_DATA_ADDR,
    entry_words: regs::DYN_MGMT_ROUTE_ENTRY_WORDS,
};

fn wait_valid_clear<P: Platform>(
    transport: &Transport<P>,
    window: &Window,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    transport.poll_flag(
        window.ctrl_addr,
        regs::DYNCONF_VALID_MASK,
        false,
        timeout_ms,
        counters,
    )
}

fn check_errors<P: Platform>(
    transport: &Transport<P>,
    window: &Window,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    if transport.read_flag(window.ctrl_addr, regs::DYNCONF_ERRORS_MASK, counters)? {
        counters.on_dyn_reconfig_error();
        return Err(Error::DynReconfig);
    }
    Ok(())
}

/// Writes one entry through `window`, with `index` in the
/// control-register index field and any table-specific control bits
/// (e.g. `DYNCONF_MGMTROUTE_MASK`) in `extra_ctrl_bits`.
pub fn write_entry<P: Platform>(
    transport: &Transport<P>,
    window: &Window,
    index: u32,
    entry: &[u32],
    extra_ctrl_bits: u32,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    debug_assert_eq!(entry.len(), window.entry_words);
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    transport.write(window.data_addr, entry, timeout_ms, counters)?;
    let ctrl = regs::DYNCONF_VALID_MASK
        | regs::DYNCONF_RDWRSET_MASK
        | extra_ctrl_bits
        | ((index << regs::DYNCONF_INDEX_SHIFT) & regs::DYNCONF_INDEX_MASK);
    transport.write(window.ctrl_addr, &[ctrl], timeout_ms, counters)?;
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    check_errors(transport, window, counters)
}

/// Reads one entry through `window` (RDWRSET clear).
pub fn read_entry<P: Platform>(
    transport: &Transport<P>,
    window: &Window,
    index: u32,
    entry: &mut [u32],
    extra_ctrl_bits: u32,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    debug_assert_eq!(entry.len(), window.entry_words);
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    let ctrl = regs::DYNCONF_VALID_MASK
        | extra_ctrl_bits
        | ((index << regs::DYNCONF_INDEX_SHIFT) & regs::DYNCONF_INDEX_MASK);
    transport.write(window.ctrl_addr, &[ctrl], timeout_ms, counters)?;
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    check_errors(transport, window, counters)?;
    transport.read(window.data_addr, entry, timeout_ms, counters)
}

/// Issues the `INVALIDATE_ENTRY` host command at `index` instead of a
/// write — used by the L2 address-lookup table's invalidate-by-range
/// operation (spec.md §4.4).
pub fn invalidate_entry<P: Platform>(
    transport: &Transport<P>,
    window: &Window,
    index: u32,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    let ctrl = regs::DYNCONF_VALID_MASK
        | regs::DYNCONF_INVALIDATE_ENTRY_MASK
        | ((index << regs::DYNCONF_INDEX_SHIFT) & regs::DYNCONF_INDEX_MASK);
    transport.write(window.ctrl_addr, &[ctrl], timeout_ms, counters)?;
    wait_valid_clear(transport, window, timeout_ms, counters)?;
    check_errors(transport, window, counters)
}

/// Invalidates every L2 address-lookup entry in `start..start+count`,
/// iterating the same handshake [`invalidate_entry`] uses one index at a
/// time. Grounded on `sja1105_tables.c`'s range-invalidate loop (poll,
/// write index, issue command, poll) — see spec.md §4.4 and
/// `SPEC_FULL.md`'s supplemented-features note.
pub fn invalidate_range<P: Platform>(
    transport: &Transport<P>,
    start: u32,
    count: u32,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    for index in start..start.checked_add(count).ok_or(Error::Parameter)? {
        invalidate_entry(transport, &L2_LOOKUP, index, timeout_ms, counters)?;
    }
    Ok(())
}
