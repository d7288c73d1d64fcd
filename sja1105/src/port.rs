// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Post-init port mutators: speed, forwarding and learning, each with
//! single-attempt revert-on-failure (spec.md §4.5). Grounded on
//! `drv/vsc7448/src/port.rs`'s multi-step hardware sequences, adapted
//! to the SJA1105's mirror-then-write-then-revert shape rather than
//! `vsc7448`'s flush/wait state machine.

use crate::acu;
use crate::cgu;
use crate::config::{DeviceConfig, Interface, PortConfig, Speed};
use crate::counters::EventCounters;
use crate::dynreconf;
use crate::platform::Platform;
use crate::regs;
use crate::tables::{mac_configuration, TableStore};
use crate::transport::Transport;
use crate::Error;

/// The mirror's current per-port state, read straight back with no
/// device I/O.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortState {
    pub ingress: bool,
    pub egress: bool,
    /// `ingress && egress` — the port forwards traffic in both
    /// directions.
    pub forwarding: bool,
    pub dyn_learn: bool,
    pub speed: Speed,
}

pub fn get_state(data: &[u32], port_num: u8) -> PortState {
    let ingress = mac_configuration::get_ingress(data, port_num);
    let egress = mac_configuration::get_egress(data, port_num);
    PortState {
        ingress,
        egress,
        forwarding: ingress && egress,
        dyn_learn: mac_configuration::get_dyn_learn(data, port_num),
        speed: mac_configuration::get_speed(data, port_num),
    }
}

fn write_mac_config_entry<P: Platform>(
    transport: &Transport<P>,
    store: &TableStore,
    port_num: u8,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    let entry = mac_configuration::entry(store.data(regs::MAC_CONFIGURATION_INDEX), port_num);
    dynreconf::write_entry(
        transport,
        &dynreconf::MAC_CONFIG,
        port_num as u32,
        &entry,
        0,
        timeout_ms,
        counters,
    )
}

/// Changes a `Dynamic`-speed port's runtime speed, reprogramming the
/// MAC-configuration mirror, the CGU and the ACU in sequence. Any
/// failure reverts the mirror and silicon to the pre-call speed in a
/// single bounded recursion; a revert failure upgrades the returned
/// error to [`Error::Revert`] and leaves the handle's state suspect.
pub fn set_speed<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    config: &DeviceConfig,
    port_num: u8,
    new_speed: Speed,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    let port = *config.port(port_num).ok_or(Error::Parameter)?;
    if !port.configured {
        return Err(Error::NotConfigured);
    }
    if port.speed != Speed::Dynamic {
        return Err(Error::Parameter);
    }
    if port.interface == Interface::Sgmii {
        return Err(Error::NotImplemented);
    }
    if new_speed == Speed::Dynamic {
        return Err(Error::Parameter);
    }
    let current = mac_configuration::get_speed(store.data(regs::MAC_CONFIGURATION_INDEX), port_num);
    if new_speed == current {
        return Err(Error::Parameter);
    }

    set_speed_inner(
        transport, store, config, &port, new_speed, current, true, timeout_ms, counters,
    )
}

#[allow(clippy::too_many_arguments)]
fn set_speed_inner<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    config: &DeviceConfig,
    port: &PortConfig,
    new_speed: Speed,
    previous_speed: Speed,
    allow_revert: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    {
        let data = store.data_mut(regs::MAC_CONFIGURATION_INDEX);
        mac_configuration::set_speed(data, port.port_num, new_speed);
    }
    store.mark_edited(regs::MAC_CONFIGURATION_INDEX);

    let result = write_mac_config_entry(transport, store, port.port_num, timeout_ms, counters)
        .and_then(|_| acu::program_port(transport, store, port, true, timeout_ms, counters))
        .and_then(|_| {
            cgu::program_port(
                transport,
                store,
                port,
                new_speed,
                config.skew_clocks,
                true,
                timeout_ms,
                counters,
            )
        });

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if allow_revert {
                set_speed_inner(
                    transport,
                    store,
                    config,
                    port,
                    previous_speed,
                    previous_speed,
                    false,
                    timeout_ms,
                    counters,
                )
                .map_err(|_| Error::Revert)?;
            }
            Err(e)
        }
    }
}

/// Enables or disables forwarding (ingress and egress together) on a
/// port. A no-op, successful call if the port already matches.
pub fn set_forwarding<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    port_num: u8,
    enable: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    if port_num as usize >= crate::config::NUM_PORTS {
        return Err(Error::Parameter);
    }
    let data = store.data(regs::MAC_CONFIGURATION_INDEX);
    let prev = (
        mac_configuration::get_ingress(data, port_num),
        mac_configuration::get_egress(data, port_num),
    );
    if prev == (enable, enable) {
        return Ok(());
    }

    apply_forwarding(transport, store, port_num, enable, timeout_ms, counters).or_else(|e| {
        apply_forwarding(transport, store, port_num, prev.0, timeout_ms, counters)
            .map_err(|_| Error::Revert)?;
        Err(e)
    })
}

fn apply_forwarding<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    port_num: u8,
    enable: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    {
        let data = store.data_mut(regs::MAC_CONFIGURATION_INDEX);
        mac_configuration::set_ingress(data, port_num, enable);
        mac_configuration::set_egress(data, port_num, enable);
    }
    store.mark_edited(regs::MAC_CONFIGURATION_INDEX);
    write_mac_config_entry(transport, store, port_num, timeout_ms, counters)
}

/// Enables or disables dynamic MAC-address learning on a port.
pub fn set_learning<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    port_num: u8,
    enable: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    if port_num as usize >= crate::config::NUM_PORTS {
        return Err(Error::Parameter);
    }
    let prev = mac_configuration::get_dyn_learn(store.data(regs::MAC_CONFIGURATION_INDEX), port_num);
    if prev == enable {
        return Ok(());
    }

    apply_learning(transport, store, port_num, enable, timeout_ms, counters).or_else(|e| {
        apply_learning(transport, store, port_num, prev, timeout_ms, counters)
            .map_err(|_| Error::Revert)?;
        Err(e)
    })
}

fn apply_learning<P: Platform>(
    transport: &Transport<P>,
    store: &mut TableStore,
    port_num: u8,
    enable: bool,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<(), Error> {
    {
        let data = store.data_mut(regs::MAC_CONFIGURATION_INDEX);
        mac_configuration::set_dyn_learn(data, port_num, enable);
    }
    store.mark_edited(regs::MAC_CONFIGURATION_INDEX);
    write_mac_config_entry(transport, store, port_num, timeout_ms, counters)
}
