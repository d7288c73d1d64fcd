// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors over the 11-word general-parameters table.
//!
//! The MAC-filter fields are the table's one genuinely unaligned
//! layout: four 6-byte fields packed back-to-back starting at bit 152
//! (word 4, byte 3), matching `SJA1105_GetMACFilters` in the original
//! source. Extracted here as plain big-endian byte reads across the
//! word boundary rather than exposed as raw words, per spec.md §9's
//! "typed accessors, never raw word arrays" note.

use crate::regs::GENERAL_PARAMETERS_WORDS;
use crate::Error;

const HOST_PORT_WORD: usize = 4;
const HOST_PORT_SHIFT: u32 = 14;
const HOST_PORT_MASK: u32 = 0b111 << HOST_PORT_SHIFT;

const MAC_FILTER_START_BIT: usize = 152;
const MAC_FILTER_COUNT: usize = 4;
const MAC_FILTER_LEN: usize = 6;

pub fn host_port(data: &[u32]) -> u8 {
    ((data[HOST_PORT_WORD] & HOST_PORT_MASK) >> HOST_PORT_SHIFT) as u8
}

pub fn set_host_port(data: &mut [u32], port_num: u8) {
    data[HOST_PORT_WORD] = (data[HOST_PORT_WORD] & !HOST_PORT_MASK)
        | ((port_num as u32) << HOST_PORT_SHIFT);
}

/// spec.md §4.3: the host-port field must equal the configured host
/// port.
pub fn validate(data: &[u32], configured_host_port: u8) -> Result<(), Error> {
    if host_port(data) != configured_host_port {
        return Err(Error::StaticConf);
    }
    Ok(())
}

fn to_bytes(data: &[u32]) -> [u8; GENERAL_PARAMETERS_WORDS * 4] {
    let mut bytes = [0u8; GENERAL_PARAMETERS_WORDS * 4];
    for (i, w) in data.iter().enumerate().take(GENERAL_PARAMETERS_WORDS) {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&w.to_be_bytes());
    }
    bytes
}

/// The four configured MAC-filter addresses used to trap management
/// frames to the host port.
pub fn mac_filters(data: &[u32]) -> [[u8; MAC_FILTER_LEN]; MAC_FILTER_COUNT] {
    let bytes = to_bytes(data);
    let start_byte = MAC_FILTER_START_BIT / 8;
    let mut out = [[0u8; MAC_FILTER_LEN]; MAC_FILTER_COUNT];
    for (i, slot) in out.iter_mut().enumerate() {
        let offset = start_byte + i * MAC_FILTER_LEN;
        slot.copy_from_slice(&bytes[offset..offset + MAC_FILTER_LEN]);
    }
    out
}
