// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors over the single-word xMII-mode-parameters table:
//! per-port 2-bit interface at bit `17 + 3·port` and 1-bit role at bit
//! `19 + 3·port`, per spec.md §4.3. Port 4's interface lands at bits
//! 29-30 and its role at bit 31 — the tightest fit, but it fits exactly
//! in the one 32-bit word.

use crate::config::{Interface, PortConfig, PortRole};
use crate::Error;

fn role_shift(port_num: u8) -> u32 {
    19 + 3 * port_num as u32
}

fn interface_shift(port_num: u8) -> u32 {
    17 + 3 * port_num as u32
}

pub fn get_role(data: &[u32], port_num: u8) -> PortRole {
    if (data[0] >> role_shift(port_num)) & 0x1 != 0 {
        PortRole::Phy
    } else {
        PortRole::Mac
    }
}

pub fn set_role(data: &mut [u32], port_num: u8, role: PortRole) {
    let shift = role_shift(port_num);
    let bit = match role {
        PortRole::Mac => 0,
        PortRole::Phy => 1,
    };
    data[0] = (data[0] & !(0x1 << shift)) | (bit << shift);
}

pub fn get_interface(data: &[u32], port_num: u8) -> Interface {
    match (data[0] >> interface_shift(port_num)) & 0x3 {
        0 => Interface::Mii,
        1 => Interface::Rmii,
        2 => Interface::Rgmii,
        _ => Interface::Sgmii,
    }
}

pub fn set_interface(data: &mut [u32], port_num: u8, interface: Interface) {
    let shift = interface_shift(port_num);
    let raw: u32 = match interface {
        Interface::Mii => 0,
        Interface::Rmii => 1,
        Interface::Rgmii => 2,
        Interface::Sgmii => 3,
    };
    data[0] = (data[0] & !(0x3 << shift)) | (raw << shift);
}

/// spec.md §4.3: role must match the port descriptor, except an
/// RMII PHY that drives the shared reference clock, which the silicon
/// configuration expresses as MAC even though the port behaves as a
/// PHY at the link layer. SGMII always carries role=MAC.
pub fn validate_port(data: &[u32], port: &PortConfig) -> Result<(), Error> {
    if !port.configured {
        return Ok(());
    }
    if get_interface(data, port.port_num) != port.interface {
        return Err(Error::StaticConf);
    }
    let expected_role = if port.interface == Interface::Rmii
        && port.role == PortRole::Phy
        && port.output_rmii_refclk
    {
        PortRole::Mac
    } else if port.interface == Interface::Sgmii {
        PortRole::Mac
    } else {
        port.role
    };
    if get_role(data, port.port_num) != expected_role {
        return Err(Error::StaticConf);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_port_including_the_last_one() {
        let mut data = [0u32; 1];
        for port_num in 0..5u8 {
            set_interface(&mut data, port_num, Interface::Rgmii);
            set_role(&mut data, port_num, PortRole::Mac);
        }
        for port_num in 0..5u8 {
            assert_eq!(get_interface(&data, port_num), Interface::Rgmii);
            assert_eq!(get_role(&data, port_num), PortRole::Mac);
        }

        // Port 4 is the tightest fit in the word; every interface value
        // must survive a set/get round trip there, not just Rgmii.
        for interface in [Interface::Mii, Interface::Rmii, Interface::Rgmii, Interface::Sgmii] {
            set_interface(&mut data, 4, interface);
            assert_eq!(get_interface(&data, 4), interface);
        }
    }

    #[test]
    fn validate_port_accepts_rmii_refclk_phy_as_mac_in_silicon() {
        let mut data = [0u32; 1];
        let port = PortConfig {
            port_num: 1,
            interface: Interface::Rmii,
            role: PortRole::Phy,
            speed: crate::config::Speed::Dynamic,
            voltage: crate::config::Voltage::V3_3,
            output_rmii_refclk: true,
            configured: true,
        };
        set_interface(&mut data, 1, Interface::Rmii);
        set_role(&mut data, 1, PortRole::Mac);
        assert!(validate_port(&data, &port).is_ok());
    }

    #[test]
    fn validate_port_rejects_mismatched_interface() {
        let mut data = [0u32; 1];
        let port = PortConfig {
            port_num: 0,
            interface: Interface::Rgmii,
            role: PortRole::Mac,
            speed: crate::config::Speed::Speed1G,
            voltage: crate::config::Voltage::V2_5,
            output_rmii_refclk: false,
            configured: true,
        };
        set_interface(&mut data, 0, Interface::Mii);
        set_role(&mut data, 0, PortRole::Mac);
        assert!(validate_port(&data, &port).is_err());
    }

    #[test]
    fn validate_port_skips_unconfigured_ports() {
        let data = [0u32; 1];
        let port = PortConfig::unconfigured(2);
        assert!(validate_port(&data, &port).is_ok());
    }
}
