// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/config.rs - Structured form of a regbin register configuration.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `config` Module
 *
 * The structured representation of an amplifier register configuration.
 * This is what [crate::builder] consumes and what [crate::parser] produces.
 */

use std::fmt;
use std::str::FromStr;

use crate::error::RegbinError;

/// The register map style of the target platform, which fixes the width of
/// every register address in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    /// Registers are addressed with a single byte.
    Compact,
    /// Registers are addressed with two bytes.
    Extended,
}

impl PlatformType {
    /// Width of a register address on this platform, in bytes.
    pub fn address_width(self) -> usize {
        match self {
            PlatformType::Compact => 1,
            PlatformType::Extended => 2,
        }
    }

    /// The largest register address this platform can express.
    pub fn max_address(self) -> u16 {
        match self {
            PlatformType::Compact => u8::MAX as u16,
            PlatformType::Extended => u16::MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlatformType::Compact => "compact",
            PlatformType::Extended => "extended",
        }
    }
}

impl From<PlatformType> for u8 {
    fn from(platform: PlatformType) -> u8 {
        match platform {
            PlatformType::Compact => 0,
            PlatformType::Extended => 1,
        }
    }
}

impl TryFrom<u8> for PlatformType {
    type Error = RegbinError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlatformType::Compact),
            1 => Ok(PlatformType::Extended),
            _ => Err(RegbinError::UnknownPlatform(value)),
        }
    }
}

/// The amplifier family every device in the image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    Tas25xx,
    Tas27xx,
}

impl DeviceFamily {
    pub fn name(self) -> &'static str {
        match self {
            DeviceFamily::Tas25xx => "TAS25XX",
            DeviceFamily::Tas27xx => "TAS27XX",
        }
    }
}

impl From<DeviceFamily> for u8 {
    fn from(family: DeviceFamily) -> u8 {
        match family {
            DeviceFamily::Tas25xx => 0,
            DeviceFamily::Tas27xx => 1,
        }
    }
}

impl TryFrom<u8> for DeviceFamily {
    type Error = RegbinError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceFamily::Tas25xx),
            1 => Ok(DeviceFamily::Tas27xx),
            _ => Err(RegbinError::UnknownDeviceFamily(value)),
        }
    }
}

/// The part fitted at one device position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmplifierType {
    Tas2562,
    Tas2563,
    Tas2780,
    Tas2781,
}

impl AmplifierType {
    pub fn family(self) -> DeviceFamily {
        match self {
            AmplifierType::Tas2562 | AmplifierType::Tas2563 => DeviceFamily::Tas25xx,
            AmplifierType::Tas2780 | AmplifierType::Tas2781 => DeviceFamily::Tas27xx,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AmplifierType::Tas2562 => "TAS2562",
            AmplifierType::Tas2563 => "TAS2563",
            AmplifierType::Tas2780 => "TAS2780",
            AmplifierType::Tas2781 => "TAS2781",
        }
    }
}

impl From<AmplifierType> for u8 {
    fn from(amplifier: AmplifierType) -> u8 {
        match amplifier {
            AmplifierType::Tas2562 => 0,
            AmplifierType::Tas2563 => 1,
            AmplifierType::Tas2780 => 2,
            AmplifierType::Tas2781 => 3,
        }
    }
}

impl TryFrom<u8> for AmplifierType {
    type Error = RegbinError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmplifierType::Tas2562),
            1 => Ok(AmplifierType::Tas2563),
            2 => Ok(AmplifierType::Tas2780),
            3 => Ok(AmplifierType::Tas2781),
            _ => Err(RegbinError::UnknownAmplifierType(value)),
        }
    }
}

impl FromStr for AmplifierType {
    type Err = RegbinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            AmplifierType::Tas2562,
            AmplifierType::Tas2563,
            AmplifierType::Tas2780,
            AmplifierType::Tas2781,
        ]
        .into_iter()
        .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| RegbinError::validation("amplifier_types", format!("unknown amplifier {s:?}")))
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for AmplifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One register-programming directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEntry {
    /// Write `value` to one register. With a mask, only the masked bits
    /// are updated.
    RegisterWrite {
        address: u16,
        value: u8,
        mask: Option<u8>,
    },
    /// Write `values` to consecutive registers starting at `address`.
    BurstWrite { address: u16, values: Vec<u8> },
    /// Wait before the next directive.
    Delay { milliseconds: u32 },
    /// Apply the following directives to one device only.
    DeviceSelect { device: u8 },
}

/// A run of entries governed by the same device select directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceScope<'a> {
    /// The selected device, or `None` for entries that precede any device
    /// select and therefore apply to every device.
    pub device: Option<u8>,
    pub entries: &'a [ConfigEntry],
}

/// A complete register configuration for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub platform: PlatformType,
    pub device_family: DeviceFamily,
    /// Number of amplifiers programmed by the image.
    pub device_count: u8,
    /// The part at each device position. Either empty or one per device.
    pub amplifier_types: Vec<AmplifierType>,
    pub entries: Vec<ConfigEntry>,
}

impl Configuration {
    /// Splits the entry list at each device select directive.
    ///
    /// Device select entries themselves are not part of any scope's
    /// `entries`. A select that is immediately followed by another select
    /// yields an empty scope.
    pub fn scopes(&self) -> Vec<DeviceScope<'_>> {
        let mut scopes = Vec::new();
        let mut device = None;
        let mut start = 0;

        for (i, entry) in self.entries.iter().enumerate() {
            if let ConfigEntry::DeviceSelect { device: next } = entry {
                if i > start || device.is_some() {
                    scopes.push(DeviceScope {
                        device,
                        entries: &self.entries[start..i],
                    });
                }
                device = Some(*next);
                start = i + 1;
            }
        }

        if start < self.entries.len() || device.is_some() {
            scopes.push(DeviceScope {
                device,
                entries: &self.entries[start..],
            });
        }

        scopes
    }

    /// The distinct device indices named by device select directives, in
    /// ascending order.
    pub fn selected_devices(&self) -> Vec<u8> {
        let mut devices: Vec<u8> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::DeviceSelect { device } => Some(*device),
                _ => None,
            })
            .collect();
        devices.sort_unstable();
        devices.dedup();
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(address: u16, value: u8) -> ConfigEntry {
        ConfigEntry::RegisterWrite {
            address,
            value,
            mask: None,
        }
    }

    fn config(entries: Vec<ConfigEntry>) -> Configuration {
        Configuration {
            platform: PlatformType::Compact,
            device_family: DeviceFamily::Tas27xx,
            device_count: 2,
            amplifier_types: vec![AmplifierType::Tas2781, AmplifierType::Tas2781],
            entries,
        }
    }

    #[test]
    fn test_enum_codes() {
        for value in 0..=1 {
            assert_eq!(u8::from(PlatformType::try_from(value).unwrap()), value);
            assert_eq!(u8::from(DeviceFamily::try_from(value).unwrap()), value);
        }
        for value in 0..=3 {
            assert_eq!(u8::from(AmplifierType::try_from(value).unwrap()), value);
        }
        assert_eq!(
            PlatformType::try_from(7),
            Err(RegbinError::UnknownPlatform(7))
        );
        assert_eq!(
            DeviceFamily::try_from(2),
            Err(RegbinError::UnknownDeviceFamily(2))
        );
        assert_eq!(
            AmplifierType::try_from(0x80),
            Err(RegbinError::UnknownAmplifierType(0x80))
        );
    }

    #[test]
    fn test_amplifier_names() {
        assert_eq!("tas2563".parse::<AmplifierType>(), Ok(AmplifierType::Tas2563));
        assert_eq!(" TAS2781 ".parse::<AmplifierType>(), Ok(AmplifierType::Tas2781));
        assert!("TAS9999".parse::<AmplifierType>().is_err());
        assert_eq!(AmplifierType::Tas2562.family(), DeviceFamily::Tas25xx);
        assert_eq!(AmplifierType::Tas2780.family(), DeviceFamily::Tas27xx);
    }

    #[test]
    fn test_scopes_without_select() {
        let cfg = config(vec![write(0x0A, 1), write(0x0B, 2)]);
        let scopes = cfg.scopes();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].device, None);
        assert_eq!(scopes[0].entries.len(), 2);
        assert!(cfg.selected_devices().is_empty());
    }

    #[test]
    fn test_scopes_split_on_select() {
        let cfg = config(vec![
            write(0x02, 1),
            ConfigEntry::DeviceSelect { device: 1 },
            write(0x03, 2),
            ConfigEntry::Delay { milliseconds: 5 },
            ConfigEntry::DeviceSelect { device: 0 },
            ConfigEntry::DeviceSelect { device: 1 },
        ]);
        let scopes = cfg.scopes();
        let devices: Vec<_> = scopes.iter().map(|s| s.device).collect();
        assert_eq!(devices, [None, Some(1), Some(0), Some(1)]);
        assert_eq!(scopes[1].entries.len(), 2);
        assert!(scopes[2].entries.is_empty());
        assert!(scopes[3].entries.is_empty());
        assert_eq!(cfg.selected_devices(), [0, 1]);
    }
}
