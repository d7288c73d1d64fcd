// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full general-status register read (spec.md §4.8). Grounded on the
//! RAM-parity check embedded in `SJA1105_Init` in `sja1105_init.c`,
//! generalized here into a standalone, callable-anytime operation per
//! spec.md's "supplement" note on `SJA1105_CheckStatusRegisters`.

use crate::counters::EventCounters;
use crate::regs;
use crate::transport::Transport;
use crate::platform::Platform;
use crate::Error;

/// Reads general-status registers 1..11 in one burst and fails with
/// [`Error::RamParity`] if either RAM-parity latch (registers 10, 11)
/// is non-zero. Returns the full register block either way callers
/// that need the raw bits.
pub fn check_status<P: Platform>(
    transport: &Transport<P>,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<[u32; regs::GENERAL_STATUS_COUNT], Error> {
    let mut regs_buf = [0u32; regs::GENERAL_STATUS_COUNT];
    transport.read(regs::GENERAL_STATUS_1_ADDR, &mut regs_buf, timeout_ms, counters)?;

    let parity = regs_buf[9] != 0 || regs_buf[10] != 0;
    if parity {
        counters.on_ram_parity_error();
        return Err(Error::RamParity);
    }
    Ok(regs_buf)
}
