// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/builder.rs - Regbin image builder.
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
 * # `builder` Module
 *
 * Turns a [Configuration] into a regbin [Image].
 *
 * ## Usage Example
 *
 * ```no_run
 * use regbin::builder::{build, BuildOptions};
 * use regbin::config::*;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let config = Configuration {
 *         platform: PlatformType::Extended,
 *         device_family: DeviceFamily::Tas25xx,
 *         device_count: 1,
 *         amplifier_types: vec![AmplifierType::Tas2563],
 *         entries: vec![
 *             ConfigEntry::RegisterWrite { address: 0x0A, value: 0x01, mask: None },
 *             ConfigEntry::Delay { milliseconds: 10 },
 *         ],
 *     };
 *
 *     let image = build(&config, &BuildOptions::default())?;
 *     std::fs::write("tas2563-custom.bin", image.to_bytes())?;
 *
 *     Ok(())
 * }
 * ```
 */

use chrono::Utc;

use crate::block::{BlockContext, encode_entry, end_marker};
use crate::checksum::compute_checksum;
use crate::config::{ConfigEntry, Configuration};
use crate::error::{RegbinError, Result};
use crate::image::{Header, Image, MAX_DEVICES};
use crate::primitive::ByteWriter;
use crate::version::{CURRENT_FORMAT, FormatSpec};

pub const DEFAULT_FIRMWARE_VERSION: u32 = 0x0101;

/// Image metadata that is not part of the [Configuration].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Format version to write. Must be listed in [crate::version::FORMATS].
    pub format_version: u32,
    pub firmware_version: u32,
    /// Creation time in epoch seconds; `None` uses the current time.
    pub timestamp: Option<u32>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            format_version: CURRENT_FORMAT,
            firmware_version: DEFAULT_FIRMWARE_VERSION,
            timestamp: None,
        }
    }
}

fn current_timestamp() -> u32 {
    Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
}

/// Checks the image-level rules a configuration must satisfy for `format`.
///
/// Per-entry rules that depend on encoding (address widths, device select
/// indices) are enforced while encoding.
pub fn validate(config: &Configuration, format: &FormatSpec) -> Result<()> {
    if config.device_count == 0 || config.device_count > MAX_DEVICES {
        return Err(RegbinError::validation(
            "device_count",
            format!(
                "{} device(s) requested, expected 1 to {MAX_DEVICES}",
                config.device_count
            ),
        ));
    }
    if config.device_count > 1 && !format.supports_multiple_devices() {
        return Err(RegbinError::validation(
            "device_count",
            format!("format 0x{:04x} supports a single device", format.version),
        ));
    }

    if !config.amplifier_types.is_empty() {
        if !format.amplifier_table {
            return Err(RegbinError::validation(
                "amplifier_types",
                format!("format 0x{:04x} has no amplifier table", format.version),
            ));
        }
        if config.amplifier_types.len() != config.device_count as usize {
            return Err(RegbinError::validation(
                "amplifier_types",
                format!(
                    "{} amplifier type(s) listed for {} device(s)",
                    config.amplifier_types.len(),
                    config.device_count
                ),
            ));
        }
        if let Some(amplifier) = config
            .amplifier_types
            .iter()
            .find(|a| a.family() != config.device_family)
        {
            return Err(RegbinError::validation(
                "amplifier_types",
                format!("{amplifier} is not a {} device", config.device_family),
            ));
        }
    }

    if config.entries.is_empty() {
        return Err(RegbinError::validation("entries", "configuration list is empty"));
    }
    if !format.supports_multiple_devices()
        && config
            .entries
            .iter()
            .any(|e| matches!(e, ConfigEntry::DeviceSelect { .. }))
    {
        return Err(RegbinError::validation(
            "entries",
            format!("format 0x{:04x} has no device select", format.version),
        ));
    }

    Ok(())
}

/// Builds an image from `config`.
pub fn build(config: &Configuration, options: &BuildOptions) -> Result<Image> {
    let format = FormatSpec::lookup(options.format_version)?;
    validate(config, format)?;

    let ctx = BlockContext {
        platform: config.platform,
        ndev: config.device_count,
        format,
    };

    let mut blocks = Vec::with_capacity(config.entries.len() + 1);
    for entry in &config.entries {
        blocks.extend(encode_entry(entry, &ctx)?);
    }
    blocks.push(end_marker(&config.amplifier_types, &ctx)?);

    let mut writer = ByteWriter::with_capacity(blocks.iter().map(|b| b.encoded_len()).sum());
    for block in &blocks {
        block.write_to(&mut writer);
    }
    let block_sequence = writer.into_inner();

    let image_size = u32::try_from(block_sequence.len()).map_err(|_| {
        RegbinError::validation(
            "entries",
            format!("block sequence of {} bytes is too large", block_sequence.len()),
        )
    })?;

    let header = Header {
        image_size,
        checksum: compute_checksum(&block_sequence),
        format_version: format.version,
        firmware_version: options.firmware_version,
        timestamp: options.timestamp.unwrap_or_else(current_timestamp),
        platform: config.platform,
        device_family: config.device_family,
        ndev: config.device_count,
    };

    Ok(Image {
        header,
        block_sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockTag, DecodedBlock, decode_block};
    use crate::config::{AmplifierType, DeviceFamily, PlatformType};
    use crate::error::EncodingError;
    use crate::image::HEADER_LEN;
    use crate::primitive::ByteReader;
    use crate::version::{FORMAT_1_4, FORMAT_1_5};

    fn options() -> BuildOptions {
        BuildOptions {
            timestamp: Some(1_700_000_000),
            ..BuildOptions::default()
        }
    }

    fn scenario() -> Configuration {
        Configuration {
            platform: PlatformType::Extended,
            device_family: DeviceFamily::Tas25xx,
            device_count: 1,
            amplifier_types: Vec::new(),
            entries: vec![
                ConfigEntry::RegisterWrite {
                    address: 0x0A,
                    value: 0x01,
                    mask: None,
                },
                ConfigEntry::Delay { milliseconds: 10 },
                ConfigEntry::RegisterWrite {
                    address: 0x0B,
                    value: 0x02,
                    mask: None,
                },
            ],
        }
    }

    #[test]
    fn test_scenario_image() {
        let image = build(&scenario(), &options()).unwrap();
        let header = &image.header;
        assert_eq!(header.ndev, 1);
        assert_eq!(u8::from(header.platform), 1);
        assert_eq!(u8::from(header.device_family), 0);
        assert_eq!(header.format_version, CURRENT_FORMAT);
        assert_eq!(header.firmware_version, DEFAULT_FIRMWARE_VERSION);
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.image_size as usize, image.block_sequence.len());
        assert_eq!(header.checksum, compute_checksum(&image.block_sequence));

        let ctx = BlockContext {
            platform: header.platform,
            ndev: header.ndev,
            format: header.format().unwrap(),
        };
        let mut reader = ByteReader::new(&image.block_sequence);
        let mut decoded = Vec::new();
        while !reader.is_empty() {
            decoded.push(decode_block(&mut reader, &ctx).unwrap());
        }
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[3], DecodedBlock::EndMarker(Vec::new()));
        assert_eq!(
            decoded[1],
            DecodedBlock::Entry(ConfigEntry::Delay { milliseconds: 10 })
        );

        let bytes = image.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + image.block_sequence.len());
        assert_eq!(bytes[HEADER_LEN], u8::from(BlockTag::RegisterWrite));
    }

    #[test]
    fn test_image_size_matches_sequence() {
        let mut config = scenario();
        config.entries.push(ConfigEntry::Delay {
            milliseconds: 200_000,
        });
        config.entries.push(ConfigEntry::BurstWrite {
            address: 0x1000,
            values: vec![0x55; 300],
        });
        let image = build(&config, &options()).unwrap();
        assert_eq!(image.header.image_size as usize, image.block_sequence.len());
    }

    #[test]
    fn test_default_timestamp_is_now() {
        let before = current_timestamp();
        let image = build(&scenario(), &BuildOptions::default()).unwrap();
        assert!(image.header.timestamp >= before);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = scenario();
        config.device_count = 0;
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "device_count", .. })
        ));

        let mut config = scenario();
        config.device_count = 9;
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "device_count", .. })
        ));

        let mut config = scenario();
        config.entries.clear();
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "entries", .. })
        ));

        let mut config = scenario();
        config.amplifier_types = vec![AmplifierType::Tas2563, AmplifierType::Tas2563];
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "amplifier_types", .. })
        ));

        let mut config = scenario();
        config.amplifier_types = vec![AmplifierType::Tas2781];
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "amplifier_types", .. })
        ));

        let mut config = scenario();
        config.platform = PlatformType::Compact;
        config.entries[0] = ConfigEntry::RegisterWrite {
            address: 0x1FF,
            value: 0,
            mask: None,
        };
        assert!(matches!(
            build(&config, &options()),
            Err(RegbinError::Validation { field: "entries", .. })
        ));
    }

    #[test]
    fn test_device_select_out_of_range_is_encoding_error() {
        let mut config = scenario();
        config.device_count = 2;
        config.entries.insert(0, ConfigEntry::DeviceSelect { device: 2 });
        assert_eq!(
            build(&config, &options()),
            Err(RegbinError::Encoding(EncodingError::InvalidDeviceIndex {
                index: 2,
                ndev: 2
            }))
        );
    }

    #[test]
    fn test_format_constraints() {
        let legacy = BuildOptions {
            format_version: FORMAT_1_4,
            ..options()
        };
        assert!(build(&scenario(), &legacy).is_ok());

        let mut config = scenario();
        config.device_count = 2;
        assert!(matches!(
            build(&config, &legacy),
            Err(RegbinError::Validation { field: "device_count", .. })
        ));

        let mut config = scenario();
        config.entries.push(ConfigEntry::DeviceSelect { device: 0 });
        assert!(matches!(
            build(&config, &legacy),
            Err(RegbinError::Validation { field: "entries", .. })
        ));

        let mut config = scenario();
        config.amplifier_types = vec![AmplifierType::Tas2563];
        let v15 = BuildOptions {
            format_version: FORMAT_1_5,
            ..options()
        };
        assert!(matches!(
            build(&config, &v15),
            Err(RegbinError::Validation { field: "amplifier_types", .. })
        ));

        let unknown = BuildOptions {
            format_version: 0x0200,
            ..options()
        };
        assert_eq!(
            build(&scenario(), &unknown),
            Err(RegbinError::UnsupportedVersion { version: 0x0200 })
        );
    }
}
