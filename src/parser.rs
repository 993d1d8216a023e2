// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/parser.rs - Parser library for regbin images.
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
 * # `parser` Module
 *
 * This module validates regbin images and converts them back into a
 * [Configuration].
 *
 * An image is accepted only as a whole: any header, size, checksum or block
 * error rejects it, even if some blocks decoded cleanly before the failure.
 *
 * ## Usage Example
 *
 * ```no_run
 * use regbin::parser::ParsedImage;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let bytes = std::fs::read("tas2563-custom.bin")?;
 *     let parsed = ParsedImage::from_bytes(&bytes)?;
 *
 *     println!("{}", parsed.header);
 *     for entry in &parsed.configuration.entries {
 *         println!("{:?}", entry);
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

use crate::block::{BlockContext, DecodedBlock, decode_block};
use crate::checksum::compute_checksum;
use crate::config::{ConfigEntry, Configuration};
use crate::error::{RegbinError, Result};
use crate::image::{HEADER_LEN, Header};
use crate::primitive::ByteReader;

/// A validated image: its header and the configuration it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImage {
    pub header: Header,
    pub configuration: Configuration,
}

impl ParsedImage {
    /// Validates and decodes a complete image.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The whole image, header included.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `ParsedImage` or the first problem found.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(RegbinError::TruncatedData {
                offset: 0,
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }

        let mut reader = ByteReader::new(bytes);
        let header = Header::read_from(&mut reader)?;
        let format = header.format()?;

        let declared = header.image_size as usize;
        let available = reader.remaining();
        if available < declared {
            return Err(RegbinError::TruncatedData {
                offset: HEADER_LEN,
                needed: declared,
                available,
            });
        }
        if available > declared {
            return Err(RegbinError::TrailingData {
                offset: HEADER_LEN + declared,
                extra: available - declared,
            });
        }

        let block_sequence = reader.read_bytes(declared)?;
        let computed = compute_checksum(block_sequence);
        if computed != header.checksum {
            return Err(RegbinError::ChecksumMismatch {
                expected: header.checksum,
                computed,
            });
        }

        let ctx = BlockContext {
            platform: header.platform,
            ndev: header.ndev,
            format,
        };
        let mut blocks = ByteReader::with_base(block_sequence, HEADER_LEN);
        let mut entries = Vec::new();
        let mut amplifier_types = Vec::new();
        // Set while the last block read was a continued chunk.
        let mut open_chunk = false;

        while !blocks.is_empty() {
            let offset = blocks.offset();
            match decode_block(&mut blocks, &ctx)? {
                DecodedBlock::Entry(entry) => {
                    push_entry(&mut entries, entry, open_chunk, offset)?;
                    open_chunk = false;
                }
                DecodedBlock::Continued(entry) => {
                    push_entry(&mut entries, entry, open_chunk, offset)?;
                    open_chunk = true;
                }
                DecodedBlock::EndMarker(table) => {
                    if open_chunk {
                        return Err(RegbinError::malformed(
                            offset,
                            "end marker inside a split entry",
                        ));
                    }
                    if !blocks.is_empty() {
                        return Err(RegbinError::TrailingData {
                            offset: blocks.offset(),
                            extra: blocks.remaining(),
                        });
                    }
                    amplifier_types = table;
                }
            }
        }
        if open_chunk {
            return Err(RegbinError::malformed(
                blocks.offset(),
                "split entry is missing its final block",
            ));
        }

        Ok(Self {
            header,
            configuration: Configuration {
                platform: header.platform,
                device_family: header.device_family,
                device_count: header.ndev,
                amplifier_types,
                entries,
            },
        })
    }
}

/// Validates and decodes an image, keeping only its configuration.
pub fn parse(bytes: &[u8]) -> Result<Configuration> {
    ParsedImage::from_bytes(bytes).map(|parsed| parsed.configuration)
}

/// Appends a decoded entry. When `joins` is set the entry is the next chunk
/// of the split entry at the end of `entries` and is merged into it.
fn push_entry(
    entries: &mut Vec<ConfigEntry>,
    entry: ConfigEntry,
    joins: bool,
    offset: usize,
) -> Result<()> {
    if !joins {
        entries.push(entry);
        return Ok(());
    }

    match (entries.last_mut(), entry) {
        (
            Some(ConfigEntry::Delay { milliseconds }),
            ConfigEntry::Delay {
                milliseconds: next,
            },
        ) => {
            *milliseconds = milliseconds
                .checked_add(next)
                .ok_or_else(|| RegbinError::malformed(offset, "split delay overflows 32 bits"))?;
            Ok(())
        }
        (
            Some(ConfigEntry::BurstWrite { address, values }),
            ConfigEntry::BurstWrite {
                address: next_address,
                values: next_values,
            },
        ) if *address as usize + values.len() == next_address as usize => {
            values.extend(next_values);
            Ok(())
        }
        _ => Err(RegbinError::malformed(
            offset,
            "block does not continue the split entry before it",
        )),
    }
}
