// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/checksum.rs - Block sequence integrity check.
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
 * # `checksum` Module
 *
 * The image checksum is the zlib/gzip CRC-32 (reflected polynomial
 * 0xEDB88320, initial value and final XOR 0xFFFFFFFF) of the block
 * sequence. The header is not covered.
 */

use flate2::Crc;

pub fn compute_checksum(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

pub fn verify_checksum(bytes: &[u8], expected: u32) -> bool {
    compute_checksum(bytes) == expected
}
