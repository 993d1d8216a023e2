// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  regbin_info.rs - Regbin image validation and dump demo.
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

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use regbin::json::*;
use regbin::listing::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The image to read.
    file: String,

    /// Print a CSV listing of every register access.
    #[arg(long)]
    csv: bool,

    /// Print the configuration as JSON.
    #[arg(long)]
    json: bool,

    /// Print debug messages while loading and writing files.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    let parsed = match read_image(&args.file) {
        Ok(parsed) => parsed,
        Err(error) => {
            eprintln!("Error parsing file {:?}: {}", &args.file, error);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", parsed.header);
    if !parsed.configuration.amplifier_types.is_empty() {
        let names: Vec<_> = parsed
            .configuration
            .amplifier_types
            .iter()
            .map(|a| a.name())
            .collect();
        println!("amplifiers:       {}", names.join(", "));
    }
    println!("entries:          {}", parsed.configuration.entries.len());

    if args.csv {
        if let Err(error) = write_listing(&parsed.configuration, io::stdout()) {
            eprintln!("Error writing listing: {}", error);
            return ExitCode::FAILURE;
        }
    }

    if args.json {
        match parsed.configuration.to_json_string() {
            Ok(json) => println!("{}", json),
            Err(error) => {
                eprintln!("Error converting to JSON: {}", error);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
