// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  json2regbin.rs - JSON to regbin converter demo.
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

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use regbin::builder::*;
use regbin::json::*;
use regbin::version::CURRENT_FORMAT;

fn parse_u32(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Converts a TAS2563/TAS2781 JSON configuration to a regbin image", long_about = None)]
struct Args {
    /// The JSON configuration to read.
    input: String,

    /// The regbin image to write.
    output: String,

    /// Binary format version to write, e.g. 0x105.
    #[arg(long, value_parser = parse_u32, default_value_t = CURRENT_FORMAT)]
    format_version: u32,

    /// Driver firmware version recorded in the header.
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_FIRMWARE_VERSION)]
    firmware_version: u32,

    /// Print debug messages while loading and writing files.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    if !Path::new(&args.input).exists() {
        eprintln!("Error: input file {:?} does not exist", &args.input);
        return ExitCode::FAILURE;
    }

    let config = match load_configuration(&args.input) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error loading configuration {:?}: {}", &args.input, error);
            return ExitCode::FAILURE;
        }
    };

    let options = BuildOptions {
        format_version: args.format_version,
        firmware_version: args.firmware_version,
        timestamp: None,
    };
    let image = match build(&config, &options) {
        Ok(image) => image,
        Err(error) => {
            eprintln!("Error building image from {:?}: {}", &args.input, error);
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = write_image(&args.output, &image) {
        eprintln!("Error writing {:?}: {}", &args.output, error);
        return ExitCode::FAILURE;
    }

    println!("{}", image.header);
    ExitCode::SUCCESS
}
