// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/block.rs - Block encoder and decoder for regbin images.
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
 * # `block` Module
 *
 * Every block in the block sequence has the same three-byte prefix:
 *
 * | Size | Field |
 * |---|---|
 * | 1 | tag |
 * | 2 | payload length (big-endian) |
 * | n | payload |
 *
 * Payload layouts, with `addr` being one or two bytes depending on the
 * [PlatformType]:
 *
 * - register write (`0x01`): `addr value [0x01 mask]`
 * - burst write (`0x02`): `addr count:u16 value*count [0x01]`
 * - delay (`0x03`): `milliseconds:u16 [0x01]`
 * - device select (`0x04`): `device`
 * - end marker (`0xFF`): empty, or one amplifier type per device when the
 *   format carries an amplifier table
 *
 * A delay or burst too large for one block is split across consecutive
 * blocks of the same tag. Every chunk but the last ends with the `0x01`
 * continuation flag, so a split entry reads back as one entry and two
 * entries that happen to be adjacent stay separate.
 */

use crate::config::{AmplifierType, ConfigEntry, PlatformType};
use crate::error::{EncodingError, RegbinError, Result};
use crate::primitive::{ByteReader, ByteWriter};
use crate::version::FormatSpec;

/// Size of the tag and length fields that precede every payload.
pub const BLOCK_PREFIX_LEN: usize = 3;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Longest wait a single delay block can encode.
pub const MAX_DELAY_MS: u32 = u16::MAX as u32;

const MASK_PRESENT: u8 = 0x01;
const CONTINUED: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    RegisterWrite,
    BurstWrite,
    Delay,
    DeviceSelect,
    EndMarker,
}

/// Fails with the unrecognized byte. Whether a known tag is legal depends
/// on the format version, which [decode_block] checks.
impl TryFrom<u8> for BlockTag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x01 => Ok(BlockTag::RegisterWrite),
            0x02 => Ok(BlockTag::BurstWrite),
            0x03 => Ok(BlockTag::Delay),
            0x04 => Ok(BlockTag::DeviceSelect),
            0xFF => Ok(BlockTag::EndMarker),
            _ => Err(value),
        }
    }
}

impl From<BlockTag> for u8 {
    fn from(tag: BlockTag) -> u8 {
        match tag {
            BlockTag::RegisterWrite => 0x01,
            BlockTag::BurstWrite => 0x02,
            BlockTag::Delay => 0x03,
            BlockTag::DeviceSelect => 0x04,
            BlockTag::EndMarker => 0xFF,
        }
    }
}

/// One encoded block. The payload length is guaranteed to fit the length
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    tag: BlockTag,
    payload: Vec<u8>,
}

impl Block {
    pub fn new(tag: BlockTag, payload: Vec<u8>) -> std::result::Result<Self, EncodingError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodingError::PayloadTooLarge { len: payload.len() });
        }
        Ok(Self { tag, payload })
    }

    pub fn tag(&self) -> BlockTag {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of the block on the wire, prefix included.
    pub fn encoded_len(&self) -> usize {
        BLOCK_PREFIX_LEN + self.payload.len()
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.tag.into());
        // Checked in Block::new.
        writer.write_u16(self.payload.len() as u16);
        writer.write_bytes(&self.payload);
    }
}

/// The image-wide facts every block encoding depends on.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext {
    pub platform: PlatformType,
    pub ndev: u8,
    pub format: &'static FormatSpec,
}

impl BlockContext {
    /// Most values a single burst block can hold on this platform.
    pub fn max_burst_values(&self) -> usize {
        MAX_PAYLOAD_LEN - self.platform.address_width() - 2
    }

    /// Values per chunk when a burst is split, leaving room for the
    /// continuation flag.
    pub fn burst_chunk_values(&self) -> usize {
        self.max_burst_values() - 1
    }
}

/// A block read back from an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBlock {
    Entry(ConfigEntry),
    /// A chunk of a split delay or burst. The next block carries the rest.
    Continued(ConfigEntry),
    /// The end marker, with the amplifier table if the format carries one.
    EndMarker(Vec<AmplifierType>),
}

fn write_address(writer: &mut ByteWriter, address: u32, platform: PlatformType) -> Result<()> {
    if address > platform.max_address() as u32 {
        return Err(RegbinError::validation(
            "entries",
            format!(
                "register address 0x{address:x} does not fit a {} platform",
                platform
            ),
        ));
    }
    match platform {
        PlatformType::Compact => writer.write_u8(address as u8),
        PlatformType::Extended => writer.write_u16(address as u16),
    }
    Ok(())
}

fn read_address(reader: &mut ByteReader<'_>, platform: PlatformType) -> Result<u16> {
    match platform {
        PlatformType::Compact => Ok(reader.read_u8()? as u16),
        PlatformType::Extended => reader.read_u16(),
    }
}

fn burst_block(address: u32, values: &[u8], continued: bool, ctx: &BlockContext) -> Result<Block> {
    if values.is_empty() {
        return Err(RegbinError::validation("entries", "burst write has no values"));
    }
    let last = address + values.len() as u32 - 1;
    if last > ctx.platform.max_address() as u32 {
        return Err(RegbinError::validation(
            "entries",
            format!("burst write ends at register 0x{last:x}, past the {} register map", ctx.platform),
        ));
    }
    let count = u16::try_from(values.len())
        .map_err(|_| EncodingError::PayloadTooLarge { len: values.len() })?;

    let mut payload = ByteWriter::with_capacity(ctx.platform.address_width() + 3 + values.len());
    write_address(&mut payload, address, ctx.platform)?;
    payload.write_u16(count);
    payload.write_bytes(values);
    if continued {
        payload.write_u8(CONTINUED);
    }
    Ok(Block::new(BlockTag::BurstWrite, payload.into_inner())?)
}

fn delay_block(milliseconds: u16, continued: bool) -> Result<Block> {
    let mut payload = ByteWriter::with_capacity(3);
    payload.write_u16(milliseconds);
    if continued {
        payload.write_u8(CONTINUED);
    }
    Ok(Block::new(BlockTag::Delay, payload.into_inner())?)
}

/// Encodes one entry as exactly one block.
///
/// Fails with `PayloadTooLarge` when the entry needs more than one block;
/// use [encode_entry] to apply the splitting policy instead.
pub fn encode_block(entry: &ConfigEntry, ctx: &BlockContext) -> Result<Block> {
    match entry {
        ConfigEntry::RegisterWrite {
            address,
            value,
            mask,
        } => {
            let mut payload = ByteWriter::with_capacity(ctx.platform.address_width() + 3);
            write_address(&mut payload, *address as u32, ctx.platform)?;
            payload.write_u8(*value);
            if let Some(mask) = mask {
                payload.write_u8(MASK_PRESENT);
                payload.write_u8(*mask);
            }
            Ok(Block::new(BlockTag::RegisterWrite, payload.into_inner())?)
        }
        ConfigEntry::BurstWrite { address, values } => {
            let len = ctx.platform.address_width() + 2 + values.len();
            if len > MAX_PAYLOAD_LEN {
                return Err(EncodingError::PayloadTooLarge { len }.into());
            }
            burst_block(*address as u32, values, false, ctx)
        }
        ConfigEntry::Delay { milliseconds } => {
            let milliseconds = u16::try_from(*milliseconds).map_err(|_| {
                RegbinError::validation(
                    "entries",
                    format!("delay of {milliseconds} ms does not fit one delay block"),
                )
            })?;
            delay_block(milliseconds, false)
        }
        ConfigEntry::DeviceSelect { device } => {
            if *device >= ctx.ndev {
                return Err(EncodingError::InvalidDeviceIndex {
                    index: *device,
                    ndev: ctx.ndev,
                }
                .into());
            }
            Ok(Block::new(BlockTag::DeviceSelect, vec![*device])?)
        }
    }
}

/// Encodes one entry, splitting long delays and oversized bursts across as
/// many blocks as needed.
pub fn encode_entry(entry: &ConfigEntry, ctx: &BlockContext) -> Result<Vec<Block>> {
    match entry {
        ConfigEntry::Delay { milliseconds } if *milliseconds > MAX_DELAY_MS => {
            let mut blocks = Vec::new();
            let mut remaining = *milliseconds;
            while remaining > 0 {
                let chunk = remaining.min(MAX_DELAY_MS);
                remaining -= chunk;
                blocks.push(delay_block(chunk as u16, remaining > 0)?);
            }
            Ok(blocks)
        }
        ConfigEntry::BurstWrite { address, values } if values.len() > ctx.max_burst_values() => {
            let chunk_values = ctx.burst_chunk_values();
            let last = (values.len() - 1) / chunk_values;
            values
                .chunks(chunk_values)
                .enumerate()
                .map(|(i, chunk)| {
                    let start = *address as u32 + (i * chunk_values) as u32;
                    burst_block(start, chunk, i < last, ctx)
                })
                .collect()
        }
        _ => Ok(vec![encode_block(entry, ctx)?]),
    }
}

/// Builds the block that closes the block sequence.
pub fn end_marker(amplifier_types: &[AmplifierType], ctx: &BlockContext) -> Result<Block> {
    let payload = if ctx.format.amplifier_table {
        amplifier_types.iter().map(|a| u8::from(*a)).collect()
    } else {
        Vec::new()
    };
    Ok(Block::new(BlockTag::EndMarker, payload)?)
}

fn read_continuation(body: &mut ByteReader<'_>, offset: usize) -> Result<()> {
    let flag = body.read_u8()?;
    if flag != CONTINUED {
        return Err(RegbinError::malformed(
            offset,
            format!("continuation flag is 0x{flag:02x}"),
        ));
    }
    Ok(())
}

fn chunk(entry: ConfigEntry, continued: bool) -> DecodedBlock {
    if continued {
        DecodedBlock::Continued(entry)
    } else {
        DecodedBlock::Entry(entry)
    }
}

/// Reads one block from `reader`.
pub fn decode_block(reader: &mut ByteReader<'_>, ctx: &BlockContext) -> Result<DecodedBlock> {
    let offset = reader.offset();
    let tag_byte = reader.read_u8()?;
    let tag = BlockTag::try_from(tag_byte)
        .ok()
        .filter(|tag| ctx.format.allows(*tag))
        .ok_or(RegbinError::UnknownBlockTag {
            tag: tag_byte,
            offset,
            version: ctx.format.version,
        })?;
    let length = reader.read_u16()? as usize;
    let payload_offset = reader.offset();
    let payload = reader.read_bytes(length)?;
    let mut body = ByteReader::with_base(payload, payload_offset);
    let address_width = ctx.platform.address_width();

    let decoded = match tag {
        BlockTag::RegisterWrite => {
            let mask_present = if length == address_width + 1 {
                false
            } else if length == address_width + 3 {
                true
            } else {
                return Err(RegbinError::malformed(
                    offset,
                    format!("register write payload is {length} bytes"),
                ));
            };
            let address = read_address(&mut body, ctx.platform)?;
            let value = body.read_u8()?;
            let mask = if mask_present {
                let flag = body.read_u8()?;
                if flag != MASK_PRESENT {
                    return Err(RegbinError::malformed(
                        offset,
                        format!("mask flag is 0x{flag:02x}"),
                    ));
                }
                Some(body.read_u8()?)
            } else {
                None
            };
            DecodedBlock::Entry(ConfigEntry::RegisterWrite {
                address,
                value,
                mask,
            })
        }
        BlockTag::BurstWrite => {
            let address = read_address(&mut body, ctx.platform)?;
            let count = body.read_u16()? as usize;
            if count == 0 {
                return Err(RegbinError::malformed(offset, "burst write has no values"));
            }
            let continued = if body.remaining() == count {
                false
            } else if body.remaining() == count + 1 {
                true
            } else {
                return Err(RegbinError::malformed(
                    offset,
                    format!(
                        "burst write declares {count} values but carries {}",
                        body.remaining()
                    ),
                ));
            };
            let values = body.read_bytes(count)?.to_vec();
            if continued {
                read_continuation(&mut body, offset)?;
            }
            chunk(
                ConfigEntry::BurstWrite { address, values },
                continued,
            )
        }
        BlockTag::Delay => {
            let continued = match length {
                2 => false,
                3 => true,
                _ => {
                    return Err(RegbinError::malformed(
                        offset,
                        format!("delay payload is {length} bytes"),
                    ));
                }
            };
            let milliseconds = body.read_u16()? as u32;
            if continued {
                read_continuation(&mut body, offset)?;
            }
            chunk(ConfigEntry::Delay { milliseconds }, continued)
        }
        BlockTag::DeviceSelect => {
            if length != 1 {
                return Err(RegbinError::malformed(
                    offset,
                    format!("device select payload is {length} bytes"),
                ));
            }
            let device = body.read_u8()?;
            if device >= ctx.ndev {
                return Err(RegbinError::DeviceIndexOutOfRange {
                    index: device,
                    ndev: ctx.ndev,
                    offset: payload_offset,
                });
            }
            DecodedBlock::Entry(ConfigEntry::DeviceSelect { device })
        }
        BlockTag::EndMarker => {
            let table_ok = length == 0 || (ctx.format.amplifier_table && length == ctx.ndev as usize);
            if !table_ok {
                return Err(RegbinError::malformed(
                    offset,
                    format!("end marker payload is {length} bytes for {} device(s)", ctx.ndev),
                ));
            }
            let amplifier_types = payload
                .iter()
                .map(|code| AmplifierType::try_from(*code))
                .collect::<Result<Vec<_>>>()?;
            DecodedBlock::EndMarker(amplifier_types)
        }
    };

    Ok(decoded)
}
