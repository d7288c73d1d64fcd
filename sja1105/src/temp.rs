// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature-sensor readout via ACU threshold binary search (spec.md
//! §4.7). Not present in the retrieved original source; built fresh
//! from spec.md's description of the threshold-comparator protocol, in
//! the register-poll style of `acu.rs`/`transport.rs`.

use crate::counters::EventCounters;
use crate::platform::Platform;
use crate::regs;
use crate::transport::Transport;
use crate::Error;

const MAX_GUESS: u32 = (regs::TEMPERATURE_LUT.len() - 1) as u32;

/// Reads the switch's junction temperature to a tenth of a degree
/// Celsius, via up to 7 rounds of binary search over the ACU's
/// threshold comparator. Wakes the sensor from powerdown first if
/// necessary.
pub fn read_temperature_x10<P: Platform>(
    transport: &Transport<P>,
    platform: &P,
    timeout_ms: u32,
    counters: &mut EventCounters,
) -> Result<i16, Error> {
    let mut config_word = transport.read_checked(regs::ACU_TS_CONFIG_ADDR, timeout_ms, counters)?;
    if config_word & regs::ACU_TS_CONFIG_POWERDOWN_MASK != 0 {
        config_word &= !regs::ACU_TS_CONFIG_POWERDOWN_MASK;
        transport.write(regs::ACU_TS_CONFIG_ADDR, &[config_word], timeout_ms, counters)?;
        platform.sleep_ms(1);
    }

    let mut lo = 0u32;
    let mut hi = MAX_GUESS;
    let mut guess = (lo + hi) / 2;

    for _ in 0..7 {
        let word = (config_word & !regs::ACU_TS_CONFIG_THRESHOLD_MASK)
            | ((guess << regs::ACU_TS_CONFIG_THRESHOLD_SHIFT) & regs::ACU_TS_CONFIG_THRESHOLD_MASK);
        transport.write(regs::ACU_TS_CONFIG_ADDR, &[word], timeout_ms, counters)?;

        let status = transport.read_checked(regs::ACU_TS_STATUS_ADDR, timeout_ms, counters)?;
        let exceeded = status & regs::ACU_TS_STATUS_EXCEEDED_MASK != 0;

        let prev_guess = guess;
        if exceeded {
            lo = guess;
        } else {
            hi = guess;
        }
        guess = (lo + hi) / 2;
        if guess == prev_guess {
            break;
        }
    }

    if guess == 0 || guess == MAX_GUESS {
        return Err(Error::TemperatureRange);
    }
    Ok(regs::TEMPERATURE_LUT[guess as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_platform::TestPlatform;

    #[test]
    fn binary_search_converges_on_the_armed_lut_index() {
        let platform = TestPlatform::new();
        platform.set_temperature_index(20);
        let transport = Transport::new(&platform);
        let mut counters = EventCounters::new();
        let result = read_temperature_x10(&transport, &platform, 100, &mut counters).unwrap();
        assert_eq!(result, regs::TEMPERATURE_LUT[20]);
    }

    #[test]
    fn binary_search_converges_on_every_interior_index() {
        for index in 1..MAX_GUESS {
            let platform = TestPlatform::new();
            platform.set_temperature_index(index);
            let transport = Transport::new(&platform);
            let mut counters = EventCounters::new();
            let result = read_temperature_x10(&transport, &platform, 100, &mut counters).unwrap();
            assert_eq!(result, regs::TEMPERATURE_LUT[index as usize], "index {index}");
        }
    }

    #[test]
    fn rail_index_reports_temperature_range_error() {
        let platform = TestPlatform::new();
        platform.set_temperature_index(0);
        let transport = Transport::new(&platform);
        let mut counters = EventCounters::new();
        let result = read_temperature_x10(&transport, &platform, 100, &mut counters);
        assert!(matches!(result, Err(Error::TemperatureRange)));
    }

    #[test]
    fn wakes_the_sensor_from_powerdown_before_searching() {
        let platform = TestPlatform::new();
        platform.poke(regs::ACU_TS_CONFIG_ADDR, regs::ACU_TS_CONFIG_POWERDOWN_MASK);
        platform.set_temperature_index(20);
        let transport = Transport::new(&platform);
        let mut counters = EventCounters::new();
        read_temperature_x10(&transport, &platform, 100, &mut counters).unwrap();
        assert_eq!(
            platform.peek(regs::ACU_TS_CONFIG_ADDR) & regs::ACU_TS_CONFIG_POWERDOWN_MASK,
            0
        );
    }
}
