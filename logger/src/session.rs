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
use std::io::{self, Write};

use syslog::{Formatter3164, Logger, LoggerBackend};

use crate::priority::{Facility, Severity};

#[derive(Debug)]
pub enum SessionError {
    /// The syslog transport could not be reached or written.
    Transport(String),
    /// Reading input or mirroring to the error stream failed.
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Transport(msg) => write!(f, "syslog: {}", msg),
            SessionError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Transport(_) => None,
            SessionError::Io(e) => Some(e),
        }
    }
}

/// Per-invocation logging options, fixed for the life of a session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub tag: String,
    pub include_pid: bool,
    pub mirror_stderr: bool,
    pub facility: Facility,
}

impl SessionOptions {
    /// openlog(3)-style option bitmask. LOG_ODELAY is always set: the
    /// transport connection waits for the first submitted record, so a
    /// session with no input never dials the log socket.
    pub fn log_flags(&self) -> libc::c_int {
        let mut flags = libc::LOG_ODELAY;
        if self.include_pid {
            flags |= libc::LOG_PID;
        }
        if self.mirror_stderr {
            flags |= libc::LOG_PERROR;
        }
        flags
    }
}

/// Destination for log records. The production sink talks to syslog; tests
/// substitute an in-memory implementation.
pub trait LogSink {
    fn open(&mut self, options: &SessionOptions) -> Result<(), SessionError>;
    fn submit(&mut self, severity: Severity, message: &str) -> Result<(), SessionError>;
    fn close(&mut self) -> Result<(), SessionError>;
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn open(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        (**self).open(options)
    }

    fn submit(&mut self, severity: Severity, message: &str) -> Result<(), SessionError> {
        (**self).submit(severity, message)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        (**self).close()
    }
}

fn transport_err(e: syslog::Error) -> SessionError {
    SessionError::Transport(e.to_string())
}

fn to_syslog_facility(facility: Facility) -> syslog::Facility {
    match facility {
        Facility::Kern => syslog::Facility::LOG_KERN,
        Facility::User => syslog::Facility::LOG_USER,
        Facility::Mail => syslog::Facility::LOG_MAIL,
        Facility::Daemon => syslog::Facility::LOG_DAEMON,
        Facility::Auth => syslog::Facility::LOG_AUTH,
        Facility::Syslog => syslog::Facility::LOG_SYSLOG,
        Facility::Lpr => syslog::Facility::LOG_LPR,
        Facility::News => syslog::Facility::LOG_NEWS,
        Facility::Uucp => syslog::Facility::LOG_UUCP,
        Facility::Cron => syslog::Facility::LOG_CRON,
        Facility::Authpriv => syslog::Facility::LOG_AUTHPRIV,
        Facility::Local0 => syslog::Facility::LOG_LOCAL0,
        Facility::Local1 => syslog::Facility::LOG_LOCAL1,
        Facility::Local2 => syslog::Facility::LOG_LOCAL2,
        Facility::Local3 => syslog::Facility::LOG_LOCAL3,
        Facility::Local4 => syslog::Facility::LOG_LOCAL4,
        Facility::Local5 => syslog::Facility::LOG_LOCAL5,
        Facility::Local6 => syslog::Facility::LOG_LOCAL6,
        Facility::Local7 => syslog::Facility::LOG_LOCAL7,
    }
}

/// Sink backed by the local syslog socket. `open` only records the
/// formatter; the connection itself is made on the first submit (ODELAY).
pub struct SyslogSink {
    formatter: Option<Formatter3164>,
    logger: Option<Logger<LoggerBackend, Formatter3164>>,
}

impl SyslogSink {
    pub fn new() -> SyslogSink {
        SyslogSink {
            formatter: None,
            logger: None,
        }
    }

    fn connection(&mut self) -> Result<&mut Logger<LoggerBackend, Formatter3164>, SessionError> {
        if self.logger.is_none() {
            let formatter = self
                .formatter
                .clone()
                .ok_or_else(|| SessionError::Transport(String::from("log transport is not open")))?;
            let logger = syslog::unix(formatter).map_err(transport_err)?;
            self.logger = Some(logger);
        }

        self.logger
            .as_mut()
            .ok_or_else(|| SessionError::Transport(String::from("log transport is not open")))
    }
}

impl LogSink for SyslogSink {
    fn open(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        let flags = options.log_flags();
        let pid = if flags & libc::LOG_PID != 0 {
            std::process::id()
        } else {
            0
        };

        self.formatter = Some(Formatter3164 {
            facility: to_syslog_facility(options.facility),
            hostname: None,
            process: options.tag.clone(),
            pid,
        });

        Ok(())
    }

    fn submit(&mut self, severity: Severity, message: &str) -> Result<(), SessionError> {
        let logger = self.connection()?;

        let res = match severity {
            Severity::Emerg => logger.emerg(message),
            Severity::Alert => logger.alert(message),
            Severity::Crit => logger.crit(message),
            Severity::Err => logger.err(message),
            Severity::Warning => logger.warning(message),
            Severity::Notice => logger.notice(message),
            Severity::Info => logger.info(message),
            Severity::Debug => logger.debug(message),
        };

        res.map_err(transport_err)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.logger = None;
        self.formatter = None;
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum State {
    Unopened,
    Opened,
    Closed,
}

/// One bounded logging session: open the sink once, submit each input line
/// as a record at a single fixed severity, close the sink once. A session
/// is single-use; `run` consumes it.
pub struct Session<S: LogSink, W: Write> {
    sink: S,
    mirror: W,
    options: SessionOptions,
    severity: Severity,
    state: State,
    submitted: u64,
}

impl<S: LogSink, W: Write> Session<S, W> {
    pub fn new(sink: S, mirror: W, options: SessionOptions, severity: Severity) -> Session<S, W> {
        Session {
            sink,
            mirror,
            options,
            severity,
            state: State::Unopened,
            submitted: 0,
        }
    }

    /// Drain `lines` into the sink, in input order, and return the number
    /// of records submitted. The sink is closed on every path out of the
    /// loop; when a submission fails mid-stream, that error wins over any
    /// error from closing.
    pub fn run<I>(mut self, lines: I) -> Result<u64, SessionError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        self.open()?;

        let mut failure = None;
        for line in lines {
            let res = match line {
                Ok(line) => self.submit(&line),
                Err(e) => Err(SessionError::Io(e)),
            };
            if let Err(e) = res {
                failure = Some(e);
                break;
            }
        }

        let closed = self.close();
        if let Some(e) = failure {
            return Err(e);
        }
        closed?;

        Ok(self.submitted)
    }

    fn open(&mut self) -> Result<(), SessionError> {
        debug_assert_eq!(self.state, State::Unopened);
        self.sink.open(&self.options)?;
        self.state = State::Opened;
        Ok(())
    }

    fn submit(&mut self, message: &str) -> Result<(), SessionError> {
        debug_assert_eq!(self.state, State::Opened);
        self.sink.submit(self.severity, message)?;
        if self.options.log_flags() & libc::LOG_PERROR != 0 {
            writeln!(self.mirror, "{}", message).map_err(SessionError::Io)?;
        }
        self.submitted += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        debug_assert_ne!(self.state, State::Closed);
        self.state = State::Closed;
        self.sink.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        opens: usize,
        closes: usize,
        records: Vec<(Severity, String)>,
        fail_on_record: Option<usize>,
    }

    impl LogSink for RecordingSink {
        fn open(&mut self, _options: &SessionOptions) -> Result<(), SessionError> {
            self.opens += 1;
            Ok(())
        }

        fn submit(&mut self, severity: Severity, message: &str) -> Result<(), SessionError> {
            if self.fail_on_record == Some(self.records.len()) {
                return Err(SessionError::Transport(String::from("sink failure")));
            }
            self.records.push((severity, String::from(message)));
            Ok(())
        }

        fn close(&mut self) -> Result<(), SessionError> {
            self.closes += 1;
            Ok(())
        }
    }

    fn options(facility: Facility) -> SessionOptions {
        SessionOptions {
            tag: String::new(),
            include_pid: false,
            mirror_stderr: false,
            facility,
        }
    }

    fn lines(input: &[&str]) -> Vec<io::Result<String>> {
        input.iter().map(|s| Ok(String::from(*s))).collect()
    }

    #[test]
    fn submits_lines_in_order_at_one_severity() {
        let mut sink = RecordingSink::default();
        let session = Session::new(
            &mut sink,
            io::sink(),
            options(Facility::Local3),
            Severity::Info,
        );
        let n = session.run(lines(&["one", "two", "three"])).unwrap();

        assert_eq!(n, 3);
        assert_eq!(sink.opens, 1);
        assert_eq!(sink.closes, 1);
        assert_eq!(
            sink.records,
            vec![
                (Severity::Info, String::from("one")),
                (Severity::Info, String::from("two")),
                (Severity::Info, String::from("three")),
            ]
        );
    }

    #[test]
    fn empty_input_still_opens_and_closes_once() {
        let mut sink = RecordingSink::default();
        let session = Session::new(
            &mut sink,
            io::sink(),
            options(Facility::User),
            Severity::Notice,
        );
        let n = session.run(lines(&[])).unwrap();

        assert_eq!(n, 0);
        assert_eq!(sink.opens, 1);
        assert_eq!(sink.closes, 1);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn empty_lines_are_submitted() {
        let mut sink = RecordingSink::default();
        let session = Session::new(
            &mut sink,
            io::sink(),
            options(Facility::User),
            Severity::Notice,
        );
        let n = session.run(lines(&["", "x", ""])).unwrap();

        assert_eq!(n, 3);
        assert_eq!(sink.records.len(), 3);
    }

    #[test]
    fn mirror_duplicates_records_in_order() {
        let mut sink = RecordingSink::default();
        let mut mirror = Vec::new();
        let mut opts = options(Facility::User);
        opts.mirror_stderr = true;

        let session = Session::new(&mut sink, &mut mirror, opts, Severity::Notice);
        session.run(lines(&["first", "second"])).unwrap();

        assert_eq!(mirror, b"first\nsecond\n");
        assert_eq!(sink.records.len(), 2);
    }

    #[test]
    fn no_mirror_without_stderr_option() {
        let mut sink = RecordingSink::default();
        let mut mirror = Vec::new();

        let session = Session::new(
            &mut sink,
            &mut mirror,
            options(Facility::User),
            Severity::Notice,
        );
        session.run(lines(&["quiet"])).unwrap();

        assert!(mirror.is_empty());
    }

    #[test]
    fn sink_is_closed_after_submit_failure() {
        let mut sink = RecordingSink {
            fail_on_record: Some(1),
            ..Default::default()
        };
        let session = Session::new(
            &mut sink,
            io::sink(),
            options(Facility::User),
            Severity::Notice,
        );
        let err = session.run(lines(&["ok", "boom", "never"])).unwrap_err();

        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn sink_is_closed_after_input_failure() {
        let mut sink = RecordingSink::default();
        let input: Vec<io::Result<String>> = vec![
            Ok(String::from("ok")),
            Err(io::Error::new(io::ErrorKind::Other, "bad read")),
        ];

        let session = Session::new(
            &mut sink,
            io::sink(),
            options(Facility::User),
            Severity::Notice,
        );
        let err = session.run(input).unwrap_err();

        assert!(matches!(err, SessionError::Io(_)));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn log_flags_always_include_odelay() {
        let opts = options(Facility::User);
        assert_eq!(opts.log_flags(), libc::LOG_ODELAY);
    }

    #[test]
    fn log_flags_reflect_pid_and_stderr_options() {
        let mut opts = options(Facility::User);
        opts.include_pid = true;
        opts.mirror_stderr = true;

        let flags = opts.log_flags();
        assert_ne!(flags & libc::LOG_ODELAY, 0);
        assert_ne!(flags & libc::LOG_PID, 0);
        assert_ne!(flags & libc::LOG_PERROR, 0);
    }
}
