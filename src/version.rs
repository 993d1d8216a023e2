// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/version.rs - Recognized regbin format versions.
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

use crate::block::BlockTag;
use crate::error::{RegbinError, Result};

/// Version 1.4: single-device images, no device select blocks.
pub const FORMAT_1_4: u32 = 0x0104;
/// Version 1.5: adds device select blocks for multi-device images.
pub const FORMAT_1_5: u32 = 0x0105;
/// Version 1.6: the end marker carries the per-device amplifier table.
pub const FORMAT_1_6: u32 = 0x0106;

/// The version written by [crate::builder::BuildOptions::default].
pub const CURRENT_FORMAT: u32 = FORMAT_1_6;

/// What a given format version allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    /// Packed `(major << 8) | minor` version number.
    pub version: u32,
    /// Block tags a conforming image may contain.
    pub tags: &'static [BlockTag],
    /// Whether the end marker payload lists each device's amplifier type.
    pub amplifier_table: bool,
}

const BASE_TAGS: &[BlockTag] = &[
    BlockTag::RegisterWrite,
    BlockTag::BurstWrite,
    BlockTag::Delay,
    BlockTag::EndMarker,
];

const MULTI_DEVICE_TAGS: &[BlockTag] = &[
    BlockTag::RegisterWrite,
    BlockTag::BurstWrite,
    BlockTag::Delay,
    BlockTag::DeviceSelect,
    BlockTag::EndMarker,
];

pub static FORMATS: [FormatSpec; 3] = [
    FormatSpec {
        version: FORMAT_1_4,
        tags: BASE_TAGS,
        amplifier_table: false,
    },
    FormatSpec {
        version: FORMAT_1_5,
        tags: MULTI_DEVICE_TAGS,
        amplifier_table: false,
    },
    FormatSpec {
        version: FORMAT_1_6,
        tags: MULTI_DEVICE_TAGS,
        amplifier_table: true,
    },
];

impl FormatSpec {
    /// Looks up a version in [FORMATS].
    pub fn lookup(version: u32) -> Result<&'static FormatSpec> {
        FORMATS
            .iter()
            .find(|format| format.version == version)
            .ok_or(RegbinError::UnsupportedVersion { version })
    }

    pub fn allows(&self, tag: BlockTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn supports_multiple_devices(&self) -> bool {
        self.allows(BlockTag::DeviceSelect)
    }

    pub fn major(&self) -> u32 {
        self.version >> 8
    }

    pub fn minor(&self) -> u32 {
        self.version & 0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let format = FormatSpec::lookup(0x0105).unwrap();
        assert_eq!((format.major(), format.minor()), (1, 5));
        assert!(format.allows(BlockTag::DeviceSelect));
        assert!(!format.amplifier_table);

        assert!(!FormatSpec::lookup(FORMAT_1_4).unwrap().supports_multiple_devices());
        assert!(FormatSpec::lookup(CURRENT_FORMAT).unwrap().amplifier_table);

        assert_eq!(
            FormatSpec::lookup(0x0103),
            Err(RegbinError::UnsupportedVersion { version: 0x0103 })
        );
    }
}
