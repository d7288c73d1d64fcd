// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auxiliary Configuration Unit: per-port I/O pad electrical
//! properties (spec.md §4.5). Grounded on `sja1105_acu.c`'s per-port
//! slew/pulldown/hysteresis programming and the exact pad-config word
//! layout in `sja1105_regs.h`.
//!
//! The source ORs the RX-side pulldown/hysteresis bits into
//! `reg_data[TX]` a second time instead of `reg_data[RX]`. Since every
//! pad group in a word gets the *same* uniform slew/pulldown/hysteresis
//! setting here (spec.md's "applied uniformly" rule), the TX and RX
//! words end up identical by construction — there's no TX/RX
//! distinction left to get backwards, so that bug has no counterpart
//! in this port.

use crate::config::{DeviceConfig, Interface, PortConfig, Voltage};
use crate::counters::EventCounters;
use crate::platform::Platform;
use crate::regs;
use crate::tables::TableStore;
use crate::transport::Transport;
use crate::Error;

/// The uniform pad word for a configured port, or `None` for SGMII
/// (not configured via the ACU).
fn pad_word(interface: Interface, voltage: Voltage) -> Result<Option<u32>, Error> {
    let slew = match interface {
        Interface::Mii => regs::OS_LOW,
        Interface::Rmii => {
            if voltage == Voltage::V1_8 {
                return Err(Error::Parameter);
            }
            regs::OS_LOW
        }
        Interface::Rgmii => match voltage {
            Voltage::V2_5 | Voltage::V3_3 => regs::OS_MEDIUM,
            Voltage::V1_8 | Voltage::Unspecified => regs::OS_HIGH,
        },
        Interface::Sgmii => return Ok(None),
    };
    Ok(Some(regs::acu_pad_word(slew, regs::IPUD_PI, regs::IH_NON_SCHMITT)))
}

/// Programs one port's pad config into the ACU mirror, and (when
/// `write`) into the chip. A no-op for unconfigured ports.
pub fn program_port<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    port: &PortConfig,
    write: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    if !port.configured {
        return Ok(());
    }
    let Some(word) = pad_word(port.interface, port.voltage)? else {
        return Ok(());
    };

    let base = port.port_num as usize * 3;
    {
        let data = store.data_mut(regs::ACU_INDEX);
        data[base] = word;
        data[base + 1] = word;
    }
    store.mark_edited(regs::ACU_INDEX);

    if write {
        transport.write(
            regs::acu_pad_tx_addr(port.port_num),
            &[word],
            timeout_ms,
            counters,
        )?;
        transport.write(
            regs::acu_pad_rx_addr(port.port_num),
            &[word],
            timeout_ms,
            counters,
        )?;
    }
    Ok(())
}

/// Programs every configured port (skipping port 4 on R/S variants,
/// which have no SGMII port).
pub fn program_all<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    config: &DeviceConfig,
    write: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    for port in &config.ports {
        if port.port_num == 4 && !config.variant.has_port_4() {
            continue;
        }
        program_port(transport, store, port, write, timeout_ms, counters)?;
    }
    Ok(())
}
