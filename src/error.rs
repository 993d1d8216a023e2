// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/error.rs - Error types for the regbin codec.
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

use thiserror::Error;

/// Errors raised while serializing a single block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The block payload does not fit the 16-bit length field.
    #[error("block payload of {len} bytes exceeds the 65535-byte limit")]
    PayloadTooLarge { len: usize },

    /// A device select directive names a device the image does not declare.
    #[error("device index {index} is out of range for {ndev} device(s)")]
    InvalidDeviceIndex { index: u8, ndev: u8 },
}

/// Every way building or parsing a regbin image can fail.
///
/// Parse-time errors carry the byte offset (relative to the start of the
/// image) at which the problem was found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegbinError {
    #[error("invalid configuration field `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("truncated data at offset {offset}: needed {needed} byte(s), {available} available")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{extra} trailing byte(s) at offset {offset}")]
    TrailingData { offset: usize, extra: usize },

    #[error("block tag 0x{tag:02x} at offset {offset} is not legal in format version 0x{version:04x}")]
    UnknownBlockTag { tag: u8, offset: usize, version: u32 },

    #[error("unsupported binary format version 0x{version:04x}")]
    UnsupportedVersion { version: u32 },

    #[error("reserved header byte is 0x{value:02x}, expected 0x00")]
    ReservedFieldViolation { value: u8 },

    #[error("checksum mismatch: header says 0x{expected:08x}, block sequence is 0x{computed:08x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("device index {index} at offset {offset} is out of range for {ndev} device(s)")]
    DeviceIndexOutOfRange { index: u8, ndev: u8, offset: usize },

    #[error("malformed block at offset {offset}: {reason}")]
    MalformedBlock { offset: usize, reason: String },

    #[error("header at offset {offset} declares {ndev} device(s), expected 1 to {supported}")]
    InvalidDeviceCount { ndev: u8, supported: u8, offset: usize },

    #[error("unknown platform type 0x{0:02x}")]
    UnknownPlatform(u8),

    #[error("unknown device family 0x{0:02x}")]
    UnknownDeviceFamily(u8),

    #[error("unknown amplifier type 0x{0:02x}")]
    UnknownAmplifierType(u8),
}

impl RegbinError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedBlock {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegbinError>;
