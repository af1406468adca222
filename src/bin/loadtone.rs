// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `loadtone` - turns CPU and RAM load into an audible tone for an analog
//! meter hooked up to the sound card.

use std::path::PathBuf;
use std::process;

use log::error;
use structopt::StructOpt;

use loadtone::{config, run};

#[derive(Debug, StructOpt)]
#[structopt(name = "loadtone", about = "Playing system load as sound")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// The configuration file with the channel calibrations.
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level).unwrap();

    let config = match config::load(&opt.config) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    if let Err(err) = run::run(&config) {
        error!("{}", err);
        process::exit(1);
    }
}
