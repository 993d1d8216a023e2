// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/json.rs - JSON configuration documents and image file helpers.
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
 * # `json` Module
 *
 * Reads and writes configurations in the JSON layout used by the amplifier
 * tuning tools:
 *
 * ```json
 * {
 *   "settings": {
 *     "platformType": "extended",
 *     "deviceFamily": "TAS25XX",
 *     "devicesCount": 1,
 *     "amplifierType": ["TAS2563"],
 *     "configurationList": [
 *       { "type": "write", "address": "0x0a", "value": "0x01" },
 *       { "type": "delay", "milliseconds": 10 },
 *       { "type": "burst", "address": "0x40", "values": [1, 2, 3] },
 *       { "type": "deviceSelect", "device": 0 }
 *     ]
 *   }
 * }
 * ```
 *
 * Numbers may be written as JSON integers or as decimal or `0x` strings.
 * Enumerations accept either their name or their numeric code.
 */

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AmplifierType, ConfigEntry, Configuration, DeviceFamily, PlatformType};
use crate::error::RegbinError;
use crate::image::Image;
use crate::parser::ParsedImage;

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Regbin(#[from] RegbinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn value(&self, field: &'static str) -> Result<u64, RegbinError> {
        match self {
            Number::Int(n) => Ok(*n),
            Number::Text(s) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                parsed.map_err(|_| RegbinError::validation(field, format!("{s:?} is not a number")))
            }
        }
    }

    fn to_u8(&self, field: &'static str) -> Result<u8, RegbinError> {
        let n = self.value(field)?;
        u8::try_from(n).map_err(|_| RegbinError::validation(field, format!("{n:#x} does not fit in 8 bits")))
    }

    fn to_u16(&self, field: &'static str) -> Result<u16, RegbinError> {
        let n = self.value(field)?;
        u16::try_from(n).map_err(|_| RegbinError::validation(field, format!("{n:#x} does not fit in 16 bits")))
    }

    fn hex(value: u64) -> Self {
        Number::Text(format!("0x{value:02x}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum EntryDocument {
    Write {
        address: Number,
        value: Number,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mask: Option<Number>,
    },
    Burst {
        address: Number,
        values: Vec<Number>,
    },
    Delay {
        milliseconds: u32,
    },
    DeviceSelect {
        device: u8,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    platform_type: Number,
    device_family: Number,
    devices_count: u8,
    #[serde(default)]
    amplifier_type: Vec<String>,
    configuration_list: Vec<EntryDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigDocument {
    settings: Settings,
}

fn platform_from(value: &Number) -> Result<PlatformType, RegbinError> {
    if let Number::Text(name) = value {
        for platform in [PlatformType::Compact, PlatformType::Extended] {
            if platform.name().eq_ignore_ascii_case(name.trim()) {
                return Ok(platform);
            }
        }
    }
    PlatformType::try_from(value.to_u8("platform")?)
}

fn family_from(value: &Number) -> Result<DeviceFamily, RegbinError> {
    if let Number::Text(name) = value {
        for family in [DeviceFamily::Tas25xx, DeviceFamily::Tas27xx] {
            if family.name().eq_ignore_ascii_case(name.trim()) {
                return Ok(family);
            }
        }
    }
    DeviceFamily::try_from(value.to_u8("device_family")?)
}

fn entry_from(doc: &EntryDocument) -> Result<ConfigEntry, RegbinError> {
    Ok(match doc {
        EntryDocument::Write {
            address,
            value,
            mask,
        } => ConfigEntry::RegisterWrite {
            address: address.to_u16("entries")?,
            value: value.to_u8("entries")?,
            mask: mask.as_ref().map(|m| m.to_u8("entries")).transpose()?,
        },
        EntryDocument::Burst { address, values } => ConfigEntry::BurstWrite {
            address: address.to_u16("entries")?,
            values: values
                .iter()
                .map(|v| v.to_u8("entries"))
                .collect::<Result<_, _>>()?,
        },
        EntryDocument::Delay { milliseconds } => ConfigEntry::Delay {
            milliseconds: *milliseconds,
        },
        EntryDocument::DeviceSelect { device } => ConfigEntry::DeviceSelect { device: *device },
    })
}

fn entry_to(entry: &ConfigEntry) -> EntryDocument {
    match entry {
        ConfigEntry::RegisterWrite {
            address,
            value,
            mask,
        } => EntryDocument::Write {
            address: Number::hex(*address as u64),
            value: Number::hex(*value as u64),
            mask: mask.map(|m| Number::hex(m as u64)),
        },
        ConfigEntry::BurstWrite { address, values } => EntryDocument::Burst {
            address: Number::hex(*address as u64),
            values: values.iter().map(|v| Number::Int(*v as u64)).collect(),
        },
        ConfigEntry::Delay { milliseconds } => EntryDocument::Delay {
            milliseconds: *milliseconds,
        },
        ConfigEntry::DeviceSelect { device } => EntryDocument::DeviceSelect { device: *device },
    }
}

impl Configuration {
    /// Parses a JSON configuration document.
    ///
    /// Only the document shape and value ranges are checked here; image
    /// rules such as the amplifier count are checked by
    /// [crate::builder::build].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigFileError> {
        let doc: ConfigDocument = serde_json::from_str(json)?;
        let settings = &doc.settings;

        let amplifier_types = settings
            .amplifier_type
            .iter()
            .map(|name| name.parse::<AmplifierType>())
            .collect::<Result<Vec<_>, _>>()?;

        let config = Configuration {
            platform: platform_from(&settings.platform_type)?,
            device_family: family_from(&settings.device_family)?,
            device_count: settings.devices_count,
            amplifier_types,
            entries: settings
                .configuration_list
                .iter()
                .map(entry_from)
                .collect::<Result<_, _>>()?,
        };

        debug!("Loaded JSON configuration: {} platform", config.platform);
        debug!("Device count: {}", config.device_count);
        debug!(
            "Amplifier type: {}",
            config
                .amplifier_types
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        debug!("{} configuration entries", config.entries.len());

        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigFileError> {
        let doc = ConfigDocument {
            settings: Settings {
                platform_type: Number::Text(self.platform.name().to_string()),
                device_family: Number::Text(self.device_family.name().to_string()),
                devices_count: self.device_count,
                amplifier_type: self
                    .amplifier_types
                    .iter()
                    .map(|a| a.name().to_string())
                    .collect(),
                configuration_list: self.entries.iter().map(entry_to).collect(),
            },
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

pub fn load_configuration(path: impl AsRef<Path>) -> Result<Configuration, ConfigFileError> {
    let path = path.as_ref();
    debug!("Reading configuration from {}", path.display());
    Configuration::from_json_str(&fs::read_to_string(path)?)
}

pub fn save_configuration(
    path: impl AsRef<Path>,
    config: &Configuration,
) -> Result<(), ConfigFileError> {
    fs::write(path, config.to_json_string()?)?;
    Ok(())
}

pub fn write_image(path: impl AsRef<Path>, image: &Image) -> Result<(), ConfigFileError> {
    let path = path.as_ref();
    debug!(
        "Writing {} byte image to {}",
        image.block_sequence.len() + crate::image::HEADER_LEN,
        path.display()
    );
    fs::write(path, image.to_bytes())?;
    Ok(())
}

pub fn read_image(path: impl AsRef<Path>) -> Result<ParsedImage, ConfigFileError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!("Read {} byte image from {}", bytes.len(), path.display());
    Ok(ParsedImage::from_bytes(&bytes)?)
}
