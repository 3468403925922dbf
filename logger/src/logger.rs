//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

extern crate clap;
extern crate libc;
extern crate plib;
extern crate syslog;

mod priority;
mod session;

use clap::Parser;
use gettextrs::{bind_textdomain_codeset, gettext, textdomain};
use plib::PROJECT_NAME;
use std::io::{self, BufRead};

use crate::priority::parse_priority;
use crate::session::{Session, SessionOptions, SyslogSink};

/// logger - enter messages into the system log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Log the process ID of the logger process with each line
    #[arg(short = 'i', long = "id")]
    id: bool,

    /// Enter the message into the log with the specified priority, given
    /// numerically or as a facility.severity pair such as "local3.info".
    /// The default is "user.notice".
    #[arg(short, long, default_value = "user.notice")]
    priority: String,

    /// Output the message to standard error as well as to the system log
    #[arg(short, long)]
    stderr: bool,

    /// Mark every line to be logged with the specified tag
    #[arg(short, long, default_value = "")]
    tag: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    textdomain(PROJECT_NAME)?;
    bind_textdomain_codeset(PROJECT_NAME, "UTF-8")?;

    // resolve the priority before touching the log transport
    let (facility, severity) = match parse_priority(&args.priority) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("logger: {}", e);
            std::process::exit(1);
        }
    };

    let options = SessionOptions {
        tag: args.tag,
        include_pid: args.id,
        mirror_stderr: args.stderr,
        facility,
    };

    let stdin = io::stdin();
    let session = Session::new(SyslogSink::new(), io::stderr(), options, severity);
    if let Err(e) = session.run(stdin.lock().lines()) {
        eprintln!("logger: {}: {}", gettext("cannot log message"), e);
        std::process::exit(1);
    }

    Ok(())
}
