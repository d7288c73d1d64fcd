// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors over the MAC-configuration table's per-port 8-word
//! entries (spec.md §4.3). Bit layout for word 3 of each entry:
//! ingress at bit 3, egress at bit 4, dynamic-learn at bit 5, speed at
//! bits[2:1] — the one field position spec.md pins down exactly.

use crate::config::{PortConfig, Speed, NUM_PORTS};
use crate::regs::MAC_CONF_ENTRY_WORDS;
use crate::Error;

const WORD_OFFSET: usize = 3;
const SPEED_SHIFT: u32 = 1;
const SPEED_MASK: u32 = 0b11 << SPEED_SHIFT;
const INGRESS_MASK: u32 = 1 << 3;
const EGRESS_MASK: u32 = 1 << 4;
const DYN_LEARN_MASK: u32 = 1 << 5;

fn word_index(port_num: u8) -> usize {
    port_num as usize * MAC_CONF_ENTRY_WORDS + WORD_OFFSET
}

fn speed_to_raw(speed: Speed) -> u32 {
    match speed {
        Speed::Dynamic => 0,
        Speed::Speed1G => 1,
        Speed::Speed100M => 2,
        Speed::Speed10M => 3,
    }
}

fn raw_to_speed(raw: u32) -> Speed {
    match raw {
        0 => Speed::Dynamic,
        1 => Speed::Speed1G,
        2 => Speed::Speed100M,
        _ => Speed::Speed10M,
    }
}

pub fn get_speed(data: &[u32], port_num: u8) -> Speed {
    raw_to_speed((data[word_index(port_num)] & SPEED_MASK) >> SPEED_SHIFT)
}

pub fn set_speed(data: &mut [u32], port_num: u8, speed: Speed) {
    let idx = word_index(port_num);
    data[idx] = (data[idx] & !SPEED_MASK) | (speed_to_raw(speed) << SPEED_SHIFT);
}

pub fn get_ingress(data: &[u32], port_num: u8) -> bool {
    data[word_index(port_num)] & INGRESS_MASK != 0
}

pub fn set_ingress(data: &mut [u32], port_num: u8, enabled: bool) {
    set_bit(data, port_num, INGRESS_MASK, enabled)
}

pub fn get_egress(data: &[u32], port_num: u8) -> bool {
    data[word_index(port_num)] & EGRESS_MASK != 0
}

pub fn set_egress(data: &mut [u32], port_num: u8, enabled: bool) {
    set_bit(data, port_num, EGRESS_MASK, enabled)
}

pub fn get_dyn_learn(data: &[u32], port_num: u8) -> bool {
    data[word_index(port_num)] & DYN_LEARN_MASK != 0
}

pub fn set_dyn_learn(data: &mut [u32], port_num: u8, enabled: bool) {
    set_bit(data, port_num, DYN_LEARN_MASK, enabled)
}

fn set_bit(data: &mut [u32], port_num: u8, mask: u32, enabled: bool) {
    let idx = word_index(port_num);
    if enabled {
        data[idx] |= mask;
    } else {
        data[idx] &= !mask;
    }
}

/// The full per-port entry, as pushed to the dynamic-reconfiguration
/// data registers by `write_port`.
pub fn entry(data: &[u32], port_num: u8) -> [u32; MAC_CONF_ENTRY_WORDS] {
    let base = port_num as usize * MAC_CONF_ENTRY_WORDS;
    let mut out = [0u32; MAC_CONF_ENTRY_WORDS];
    out.copy_from_slice(&data[base..base + MAC_CONF_ENTRY_WORDS]);
    out
}

pub fn load_entry(data: &mut [u32], port_num: u8, entry: &[u32; MAC_CONF_ENTRY_WORDS]) {
    let base = port_num as usize * MAC_CONF_ENTRY_WORDS;
    data[base..base + MAC_CONF_ENTRY_WORDS].copy_from_slice(entry);
}

/// Cross-checks every configured, non-dynamic port's mirror speed
/// against its descriptor (spec.md §4.3).
pub fn validate(data: &[u32], ports: &[PortConfig; NUM_PORTS]) -> Result<(), Error> {
    for port in ports {
        if !port.configured || port.speed == Speed::Dynamic {
            continue;
        }
        if get_speed(data, port.port_num) != port.speed {
            return Err(Error::StaticConf);
        }
    }
    Ok(())
}

/// Resets ingress/egress/dynamic-learning for every port to a uniform
/// value — all-off (safe) unless the integrator opted into
/// `ports_start_enabled`.
pub fn reset_ports(data: &mut [u32], enabled: bool) {
    for port_num in 0..NUM_PORTS as u8 {
        set_ingress(data, port_num, enabled);
        set_egress(data, port_num, enabled);
        set_dyn_learn(data, port_num, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> [u32; MAC_CONF_ENTRY_WORDS * NUM_PORTS] {
        [0u32; MAC_CONF_ENTRY_WORDS * NUM_PORTS]
    }

    #[test]
    fn speed_round_trips_per_port_without_disturbing_neighbors() {
        let mut data = blank();
        set_speed(&mut data, 0, Speed::Speed1G);
        set_speed(&mut data, 1, Speed::Speed100M);
        set_speed(&mut data, 4, Speed::Speed10M);
        assert_eq!(get_speed(&data, 0), Speed::Speed1G);
        assert_eq!(get_speed(&data, 1), Speed::Speed100M);
        assert_eq!(get_speed(&data, 2), Speed::Dynamic);
        assert_eq!(get_speed(&data, 4), Speed::Speed10M);
    }

    #[test]
    fn ingress_egress_and_learning_bits_are_independent() {
        let mut data = blank();
        set_ingress(&mut data, 2, true);
        assert!(get_ingress(&data, 2));
        assert!(!get_egress(&data, 2));
        assert!(!get_dyn_learn(&data, 2));

        set_egress(&mut data, 2, true);
        set_dyn_learn(&mut data, 2, true);
        assert!(get_ingress(&data, 2) && get_egress(&data, 2) && get_dyn_learn(&data, 2));

        set_ingress(&mut data, 2, false);
        assert!(!get_ingress(&data, 2));
        assert!(get_egress(&data, 2));
    }

    #[test]
    fn entry_and_load_entry_round_trip() {
        let mut data = blank();
        set_speed(&mut data, 3, Speed::Speed1G);
        set_ingress(&mut data, 3, true);
        let snapshot = entry(&data, 3);

        let mut fresh = blank();
        load_entry(&mut fresh, 3, &snapshot);
        assert_eq!(get_speed(&fresh, 3), Speed::Speed1G);
        assert!(get_ingress(&fresh, 3));
    }

    #[test]
    fn validate_ignores_dynamic_ports_but_checks_fixed_ones() {
        let mut data = blank();
        let mut ports = [PortConfig::unconfigured(0); NUM_PORTS];
        for (i, port) in ports.iter_mut().enumerate() {
            port.port_num = i as u8;
            port.configured = true;
            port.speed = Speed::Speed1G;
        }
        ports[0].speed = Speed::Dynamic;
        for port in &ports {
            if port.speed != Speed::Dynamic {
                set_speed(&mut data, port.port_num, port.speed);
            }
        }
        assert!(validate(&data, &ports).is_ok());

        set_speed(&mut data, 1, Speed::Speed100M);
        assert!(validate(&data, &ports).is_err());
    }

    #[test]
    fn reset_ports_sets_every_port_uniformly() {
        let mut data = blank();
        set_ingress(&mut data, 2, true);
        reset_ports(&mut data, false);
        for port_num in 0..NUM_PORTS as u8 {
            assert!(!get_ingress(&data, port_num));
            assert!(!get_egress(&data, port_num));
            assert!(!get_dyn_learn(&data, port_num));
        }
        reset_ports(&mut data, true);
        for port_num in 0..NUM_PORTS as u8 {
            assert!(get_ingress(&data, port_num));
            assert!(get_egress(&data, port_num));
            assert!(get_dyn_learn(&data, port_num));
        }
    }
}
