// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/image.rs - Regbin image header and container.
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
 * # `image` Module
 *
 * The fixed 24-byte header that starts every regbin image:
 *
 * | Offset | Size | Field |
 * |---|---|---|
 * | 0 | 4 | image size (block sequence only) |
 * | 4 | 4 | CRC-32 of the block sequence |
 * | 8 | 4 | binary format version |
 * | 12 | 4 | driver firmware version |
 * | 16 | 4 | timestamp (epoch seconds) |
 * | 20 | 1 | platform type |
 * | 21 | 1 | device family |
 * | 22 | 1 | reserved, zero |
 * | 23 | 1 | device count |
 *
 * All multi-byte fields are big-endian.
 */

use std::fmt;

use chrono::DateTime;

use crate::config::{DeviceFamily, PlatformType};
use crate::error::{RegbinError, Result};
use crate::primitive::{ByteReader, ByteWriter};
use crate::version::FormatSpec;

pub const HEADER_LEN: usize = 24;

const NDEV_OFFSET: usize = 23;

/// Upper bound on the device count, matching the driver's device table.
pub const MAX_DEVICES: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Length of the block sequence in bytes.
    pub image_size: u32,
    pub checksum: u32,
    pub format_version: u32,
    pub firmware_version: u32,
    pub timestamp: u32,
    pub platform: PlatformType,
    pub device_family: DeviceFamily,
    pub ndev: u8,
}

impl Header {
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.image_size);
        writer.write_u32(self.checksum);
        writer.write_u32(self.format_version);
        writer.write_u32(self.firmware_version);
        writer.write_u32(self.timestamp);
        writer.write_u8(self.platform.into());
        writer.write_u8(self.device_family.into());
        writer.write_u8(0);
        writer.write_u8(self.ndev);
    }

    /// Reads and validates a header.
    ///
    /// Checks are made in a fixed order: format version, reserved byte,
    /// platform, device family, device count.
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let image_size = reader.read_u32()?;
        let checksum = reader.read_u32()?;
        let format_version = reader.read_u32()?;
        let firmware_version = reader.read_u32()?;
        let timestamp = reader.read_u32()?;
        let platform = reader.read_u8()?;
        let device_family = reader.read_u8()?;
        let reserved = reader.read_u8()?;
        let ndev = reader.read_u8()?;

        let format = FormatSpec::lookup(format_version)?;
        if reserved != 0 {
            return Err(RegbinError::ReservedFieldViolation { value: reserved });
        }
        let platform = PlatformType::try_from(platform)?;
        let device_family = DeviceFamily::try_from(device_family)?;
        let supported = if format.supports_multiple_devices() {
            MAX_DEVICES
        } else {
            1
        };
        if ndev == 0 || ndev > supported {
            return Err(RegbinError::InvalidDeviceCount {
                ndev,
                supported,
                offset: NDEV_OFFSET,
            });
        }

        Ok(Self {
            image_size,
            checksum,
            format_version,
            firmware_version,
            timestamp,
            platform,
            device_family,
            ndev,
        })
    }

    pub fn format(&self) -> Result<&'static FormatSpec> {
        FormatSpec::lookup(self.format_version)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "format version:   {}.{}",
            self.format_version >> 8,
            self.format_version & 0xFF
        )?;
        writeln!(f, "firmware version: 0x{:x}", self.firmware_version)?;
        match DateTime::from_timestamp(self.timestamp as i64, 0) {
            Some(time) => writeln!(f, "created:          {}", time.to_rfc3339())?,
            None => writeln!(f, "created:          {}", self.timestamp)?,
        }
        writeln!(f, "platform:         {}", self.platform)?;
        writeln!(f, "device family:    {}", self.device_family)?;
        writeln!(f, "devices:          {}", self.ndev)?;
        writeln!(f, "image size:       {} bytes", self.image_size)?;
        write!(f, "checksum:         0x{:08x}", self.checksum)
    }
}

/// A built image: header plus the encoded block sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub header: Header,
    pub block_sequence: Vec<u8>,
}

impl Image {
    /// Serializes the image as it would be stored on disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(HEADER_LEN + self.block_sequence.len());
        self.header.write_to(&mut writer);
        writer.write_bytes(&self.block_sequence);
        writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::FORMAT_1_4;

    fn header() -> Header {
        Header {
            image_size: 0x10,
            checksum: 0xDEADBEEF,
            format_version: 0x0105,
            firmware_version: 0x0101,
            timestamp: 1_700_000_000,
            platform: PlatformType::Extended,
            device_family: DeviceFamily::Tas25xx,
            ndev: 2,
        }
    }

    fn header_bytes(h: &Header) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        h.write_to(&mut writer);
        writer.into_inner()
    }

    #[test]
    fn test_header_layout() {
        let bytes = header_bytes(&header());
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(
            bytes,
            [
                0x00, 0x00, 0x00, 0x10, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00,
                0x01, 0x01, 0x65, 0x53, 0xF1, 0x00, 0x01, 0x00, 0x00, 0x02,
            ]
        );
        let parsed = Header::read_from(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(parsed, header());
    }

    #[test]
    fn test_header_rejections() {
        let mut bytes = header_bytes(&header());
        bytes[11] = 0x07;
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&bytes)),
            Err(RegbinError::UnsupportedVersion { version: 0x0107 })
        );

        let mut bytes = header_bytes(&header());
        bytes[22] = 0x01;
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&bytes)),
            Err(RegbinError::ReservedFieldViolation { value: 0x01 })
        );

        let mut bytes = header_bytes(&header());
        bytes[20] = 0x09;
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&bytes)),
            Err(RegbinError::UnknownPlatform(0x09))
        );

        let mut bytes = header_bytes(&header());
        bytes[23] = 0;
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&bytes)),
            Err(RegbinError::InvalidDeviceCount {
                ndev: 0,
                supported: MAX_DEVICES,
                offset: 23
            })
        );

        let mut bytes = header_bytes(&header());
        bytes[23] = 9;
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&bytes)),
            Err(RegbinError::InvalidDeviceCount {
                ndev: 9,
                supported: MAX_DEVICES,
                offset: 23
            })
        );

        let legacy = Header {
            format_version: FORMAT_1_4,
            ..header()
        };
        assert_eq!(
            Header::read_from(&mut ByteReader::new(&header_bytes(&legacy))),
            Err(RegbinError::InvalidDeviceCount {
                ndev: 2,
                supported: 1,
                offset: 23
            })
        );
    }

    #[test]
    fn test_header_display() {
        let text = header().to_string();
        assert!(text.contains("format version:   1.5"));
        assert!(text.contains("2023-11-14T22:13:20+00:00"));
        assert!(text.contains("TAS25XX"));
    }
}
