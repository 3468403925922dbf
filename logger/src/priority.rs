//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::error::Error;
use std::fmt;

/// Syslog facility: the subsystem a message is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facility {
    Kern,
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Lpr,
    News,
    Uucp,
    Cron,
    Authpriv,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    /// Look up a facility from its symbolic name or decimal code.
    ///
    /// Numeric and symbolic spellings share one key space; the numeric
    /// branch of [`parse_priority`] formats its facility code into the same
    /// table. Unrecognized keys resolve to `user`, matching the historical
    /// logger behavior of logging under the default facility instead of
    /// rejecting the message.
    pub fn from_key(key: &str) -> Facility {
        match key {
            "0" | "kern" => Facility::Kern,
            "1" | "user" => Facility::User,
            "2" | "mail" => Facility::Mail,
            "3" | "daemon" => Facility::Daemon,
            "4" | "auth" => Facility::Auth,
            "5" | "syslog" => Facility::Syslog,
            "6" | "lpr" => Facility::Lpr,
            "7" | "news" => Facility::News,
            "8" | "uucp" => Facility::Uucp,
            "9" | "cron" => Facility::Cron,
            "10" | "authpriv" => Facility::Authpriv,
            "16" | "local0" => Facility::Local0,
            "17" | "local1" => Facility::Local1,
            "18" | "local2" => Facility::Local2,
            "19" | "local3" => Facility::Local3,
            "20" | "local4" => Facility::Local4,
            "21" | "local5" => Facility::Local5,
            "22" | "local6" => Facility::Local6,
            "23" | "local7" => Facility::Local7,
            _ => Facility::User,
        }
    }
}

/// Syslog severity, ordered from most to least severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Emerg,
    Alert,
    Crit,
    Err,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    /// Look up a severity from its symbolic name or decimal code 0-7.
    /// Unrecognized keys resolve to `notice` (see [`Facility::from_key`]).
    pub fn from_key(key: &str) -> Severity {
        match key {
            "0" | "emerg" => Severity::Emerg,
            "1" | "alert" => Severity::Alert,
            "2" | "crit" => Severity::Crit,
            "3" | "err" => Severity::Err,
            "4" | "warning" => Severity::Warning,
            "5" | "notice" => Severity::Notice,
            "6" | "info" => Severity::Info,
            "7" | "debug" => Severity::Debug,
            _ => Severity::Notice,
        }
    }
}

/// The priority operand matched neither accepted shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidPriority {
    token: String,
}

impl InvalidPriority {
    fn new(token: &str) -> InvalidPriority {
        InvalidPriority {
            token: String::from(token),
        }
    }
}

impl fmt::Display for InvalidPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected priority value: {}", self.token)
    }
}

impl Error for InvalidPriority {}

/// Resolve a priority operand into a facility/severity pair.
///
/// Two shapes are accepted: a decimal code, decoded as `facility = code / 8`
/// and `severity = code % 8`, or `facility.severity` with both components
/// symbolic (e.g. `local3.info`). Anything else is an error.
///
/// Within an accepted shape, component lookup is deliberately permissive:
/// an unknown facility logs under `user` and an unknown severity logs at
/// `notice` rather than failing. This mirrors the historical tool and is
/// relied upon by callers; do not tighten it to a hard error.
pub fn parse_priority(token: &str) -> Result<(Facility, Severity), InvalidPriority> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        let code: u32 = token
            .parse()
            .map_err(|_| InvalidPriority::new(token))?;
        let facility = Facility::from_key(&(code / 8).to_string());
        let severity = Severity::from_key(&(code % 8).to_string());
        return Ok((facility, severity));
    }

    match token.split_once('.') {
        Some((facility, severity)) if !facility.is_empty() && !severity.is_empty() => Ok((
            Facility::from_key(facility),
            Severity::from_key(severity),
        )),
        _ => Err(InvalidPriority::new(token)),
    }
}
