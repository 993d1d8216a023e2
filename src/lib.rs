// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/lib.rs - Builder and parser library for TAS25xx/TAS27xx regbin images.
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
 * # `regbin` Crate
 *
 * A library for building and parsing "regbin" images, the binary register
 * programming files loaded by TAS25xx/TAS27xx smart amplifier drivers.
 *
 * The crate provides both directions of the conversion:
 *
 * 1. [builder]: Validates a [config::Configuration] and encodes it as an
 *    [image::Image].
 * 2. [parser]: Validates an image byte for byte and decodes it back into a
 *    configuration.
 *
 * The lower layers ([primitive], [block], [checksum], [version]) are public
 * for tools that need to inspect individual blocks. [json] and [listing]
 * convert configurations to and from text.
 *
 * ## Usage Example
 *
 * ```no_run
 * use regbin::builder::{build, BuildOptions};
 * use regbin::config::Configuration;
 * use regbin::json::load_configuration;
 * use regbin::parser::parse;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     // Load the configuration
 *     let config = load_configuration("tas2563-1amp-reg.json")?;
 *
 *     // Build the image
 *     let image = build(&config, &BuildOptions::default())?;
 *     let bytes = image.to_bytes();
 *
 *     // Parse it back
 *     let parsed: Configuration = parse(&bytes)?;
 *     assert_eq!(parsed, config);
 *
 *     Ok(())
 * }
 * ```
 */

pub mod block;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod error;
pub mod image;
pub mod json;
pub mod listing;
pub mod parser;
pub mod primitive;
pub mod version;

pub use builder::{BuildOptions, build};
pub use config::{ConfigEntry, Configuration};
pub use error::{EncodingError, RegbinError};
pub use image::{Header, Image};
pub use parser::{ParsedImage, parse};
