// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level configuration abstraction for the SJA1105 family.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const NUM_PORTS: usize = 5;

/// Which member of the SJA1105 family this handle talks to.
///
/// The device-id word at the front of the static-configuration image must
/// match one of these, grouped the way the switch itself groups them (see
/// `SJA1105_T_SWITCH_CORE_ID` and friends in the image-format notes).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Variant {
    E,
    T,
    P,
    Q,
    R,
    S,
}

impl Variant {
    /// Expected device-id word for this variant, per spec.md §4.2 step 1.
    pub fn device_id(self) -> u32 {
        match self {
            Variant::E | Variant::T => 0x9f00_030e,
            Variant::P | Variant::R => 0xaf00_030e,
            Variant::Q | Variant::S => 0xae00_030e,
        }
    }

    /// R and S variants have only 4 ports (no SGMII port 4).
    pub fn has_port_4(self) -> bool {
        !matches!(self, Variant::R | Variant::S)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Interface {
    Mii,
    Rmii,
    Rgmii,
    Sgmii,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortRole {
    Mac,
    Phy,
}

/// Port speed. `Dynamic` means "choose the speed at runtime via
/// `port_set_speed`"; the silicon is programmed with a fixed value either
/// way, but a `Dynamic` port is allowed to change after `init`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Speed {
    Dynamic,
    Speed1G,
    Speed100M,
    Speed10M,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Voltage {
    V1_8,
    V2_5,
    V3_3,
    Unspecified,
}

/// Static, per-port wiring description. One of these is supplied for every
/// physical port (0..5) before `init`, or later via `port_configure` for a
/// port left unconfigured at init time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    pub port_num: u8,
    pub interface: Interface,
    pub role: PortRole,
    pub speed: Speed,
    pub voltage: Voltage,
    /// Only meaningful for an RMII PHY: does this port drive the shared
    /// reference clock?
    pub output_rmii_refclk: bool,
    pub configured: bool,
}

impl PortConfig {
    pub const fn unconfigured(port_num: u8) -> Self {
        Self {
            port_num,
            interface: Interface::Mii,
            role: PortRole::Mac,
            speed: Speed::Dynamic,
            voltage: Voltage::Unspecified,
            output_rmii_refclk: false,
            configured: false,
        }
    }

    /// spec.md §3 port-descriptor invariants, checked before a descriptor is
    /// accepted by `port_configure` or before a static-config load back-fills
    /// ACU/CGU for it.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match (self.interface, self.speed) {
            (Interface::Rmii, Speed::Speed1G) => return Err(crate::Error::Parameter),
            (Interface::Mii, Speed::Speed1G) => return Err(crate::Error::Parameter),
            _ => {}
        }
        if self.interface == Interface::Rmii && self.voltage == Voltage::V1_8 {
            return Err(crate::Error::Parameter);
        }
        if self.interface == Interface::Sgmii && self.role != PortRole::Mac {
            return Err(crate::Error::Parameter);
        }
        if self.speed == Speed::Dynamic
            && self.configured
            && self.voltage == Voltage::Unspecified
        {
            return Err(crate::Error::Parameter);
        }
        Ok(())
    }
}

/// Immutable, whole-device configuration: variant, pin identifiers, timeouts
/// and the static per-port wiring. Analogous to `drv/vsc7448`'s `PortMap`,
/// generalized to the SJA1105's 5 fixed ports and its handful of
/// device-wide knobs.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub variant: Variant,
    pub ports: [PortConfig; NUM_PORTS],
    pub mutex_timeout_ms: u32,
    pub mgmt_route_timeout_ms: u32,
    pub host_port: u8,
    pub skew_clocks: bool,
    pub switch_id: u8,
    pub ports_start_enabled: bool,
}

impl DeviceConfig {
    pub fn port(&self, port_num: u8) -> Option<&PortConfig> {
        self.ports.get(port_num as usize)
    }

    /// Fills in a port left `unconfigured` by the initial descriptor
    /// set, either before `init` (while building a [`DeviceConfig`]
    /// from scratch) or afterwards through `Device::port_configure`.
    /// Rejects a port that's already configured rather than silently
    /// overwriting it.
    pub fn port_configure(
        &mut self,
        port_num: u8,
        interface: Interface,
        role: PortRole,
        output_rmii_refclk: bool,
        speed: Speed,
        voltage: Voltage,
    ) -> Result<(), crate::Error> {
        let slot = self
            .ports
            .get_mut(port_num as usize)
            .ok_or(crate::Error::Parameter)?;
        if slot.configured {
            return Err(crate::Error::AlreadyConfigured);
        }
        let candidate = PortConfig {
            port_num,
            interface,
            role,
            speed,
            voltage,
            output_rmii_refclk,
            configured: true,
        };
        candidate.validate()?;
        *slot = candidate;
        Ok(())
    }
}
