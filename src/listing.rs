// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/listing.rs - CSV register listings of regbin configurations.
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
 * # `listing` Module
 *
 * Flattens a [Configuration] into one CSV row per register access, so an
 * image can be reviewed or diffed as text. Burst writes are expanded to one
 * row per register. Entries that precede any device select are listed
 * against device `all`.
 */

use std::io;

use crate::config::{ConfigEntry, Configuration, PlatformType};

const COLUMNS: [&str; 6] = ["device", "operation", "address", "value", "mask", "delay_ms"];

fn format_address(address: u32, platform: PlatformType) -> String {
    format!(
        "0x{:0width$x}",
        address,
        width = platform.address_width() * 2
    )
}

pub fn write_listing<W: io::Write>(config: &Configuration, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(COLUMNS)?;

    for scope in config.scopes() {
        let device = match scope.device {
            Some(index) => index.to_string(),
            None => "all".to_string(),
        };

        for entry in scope.entries {
            match entry {
                ConfigEntry::RegisterWrite {
                    address,
                    value,
                    mask,
                } => {
                    let address = format_address(*address as u32, config.platform);
                    let value = format!("0x{value:02x}");
                    let mask = mask.map(|m| format!("0x{m:02x}")).unwrap_or_default();
                    csv_writer.write_record([
                        device.as_str(),
                        "write",
                        address.as_str(),
                        value.as_str(),
                        mask.as_str(),
                        "",
                    ])?;
                }
                ConfigEntry::BurstWrite { address, values } => {
                    for (i, value) in values.iter().enumerate() {
                        let address = format_address(*address as u32 + i as u32, config.platform);
                        let value = format!("0x{value:02x}");
                        csv_writer.write_record([
                            device.as_str(),
                            "burst",
                            address.as_str(),
                            value.as_str(),
                            "",
                            "",
                        ])?;
                    }
                }
                ConfigEntry::Delay { milliseconds } => {
                    let milliseconds = milliseconds.to_string();
                    csv_writer.write_record([
                        device.as_str(),
                        "delay",
                        "",
                        "",
                        "",
                        milliseconds.as_str(),
                    ])?;
                }
                // Consumed by Configuration::scopes.
                ConfigEntry::DeviceSelect { .. } => {}
            }
        }
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn listing_string(config: &Configuration) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_listing(config, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
