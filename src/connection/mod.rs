// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_mock.
//
// smtp_mock is free software: you can redistribute it and/or modify it under the terms of the GNU
// Affero General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// smtp_mock is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with smtp_mock.
// If not, see <https://www.gnu.org/licenses/>.

//! Drives one client connection as an SMTP session.
//!
//! See [`Session`] and [`handle`].

mod command;
mod data;

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::error::Elapsed,
};

use crate::{
    error::{Error, Rejection},
    logging::Activity,
    str::{max_lengths, SmtpString},
    Configuration, Message,
};
use command::Verb;

/// Handle a TCP connection as an SMTP session.
///
/// Returns the [`Message`] the session collected once it closes for any reason other than a
/// transport failure.
///
/// # Errors
///
/// [`Error::Io`] if the peer address cannot be read or if reading from or writing to the client
/// fails. Protocol-level problems are answered in-band and never surface here.
pub async fn handle(stream: TcpStream, configuration: Arc<Configuration>) -> Result<Message, Error> {
    let client_socket = stream.peer_addr()?;

    let mut session = Session::new(stream, configuration);
    session.activity.opened(client_socket);

    match session.run().await {
        Ok(_) => Ok(session.into_message()),
        Err(err) => {
            session.activity.failed(&err);
            Err(err)
        }
    }
}

/// The position of a session in the required command sequence.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default)]
pub enum Stage {
    /// Nothing accepted yet; waiting for `HELO`.
    #[default]
    Init,
    HeloDone,
    MailfromDone,
    /// At least one recipient accepted. Re-entered by every further accepted recipient.
    RcpttoDone,
    DataDone,
    /// The session is over and reads nothing more.
    Closed,
}

/// Indicates if and why a session should be closed.
#[derive(PartialEq, Eq, Debug)]
pub enum ShouldClose {
    /// The session should be kept open.
    Keep,
    /// The session should be closed because [`CloseReason`].
    Close(CloseReason),
}

/// Indicates why a session was closed.
#[derive(PartialEq, Eq, Debug)]
pub enum CloseReason {
    /// The SMTP client requested to quit the session.
    Quit,
    /// A [`Rejection`] ended the session after its reply was written. Either a blacklist hit, or
    /// any invalid command under the fail-fast policy.
    Rejected(Rejection),
    /// More time [`Elapsed`] than [`Configuration::session_timeout`] allows. Nothing is written.
    TimedOut(Elapsed),
    /// The connection was closed by the client.
    ClosedByClient,
}

/// What waiting for the next line produced.
pub(crate) enum Incoming {
    /// The raw bytes of a line, line ending included.
    Line(Vec<u8>),
    /// The line went past the length it was read with. Its bytes were discarded up to and
    /// including its line ending.
    TooLong,
    Closed(CloseReason),
}

/// The line-oriented conversation with one client.
///
/// A session owns its connection and its [`Message`], and only reads the shared
/// [`Configuration`]. Every request is answered, and its effects committed, before the next one is
/// read.
#[derive(Debug)]
pub struct Session<S> {
    stream: BufReader<S>,
    configuration: Arc<Configuration>,
    message: Message,
    stage: Stage,
    activity: Activity,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Bind a new session to a connection. Nothing is written until [`Self::run`] or
    /// [`Self::greet`].
    pub fn new(stream: S, configuration: Arc<Configuration>) -> Self {
        let activity = Activity::new(configuration.log_server_activity());

        Self {
            stream: BufReader::new(stream),
            configuration,
            message: Message::default(),
            stage: Stage::Init,
            activity,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Give up the connection and keep what the session observed.
    #[must_use]
    pub fn into_message(self) -> Message {
        self.message
    }

    /// Greet the client, then answer its requests until the session closes.
    ///
    /// The stage is [`Stage::Closed`] afterwards, whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if reading from or writing to the client fails. No further write is attempted
    /// after a failure.
    pub async fn run(&mut self) -> Result<CloseReason, Error> {
        /// Read the next command line out of `$session` or break with [`CloseReason`].
        ///
        /// Evaluates to `None` if the line was longer than [`max_lengths::COMMAND_LINE`].
        /// Implicitly calls `.await`.
        ///
        /// # Errors
        ///
        /// - Any errors that could come out of [`Session::next_line`].
        macro_rules! read_line_or_break {
            ($session:expr) => {
                match $session.next_line(max_lengths::COMMAND_LINE).await? {
                    Incoming::Line(line) => Some(line),
                    Incoming::TooLong => None,
                    Incoming::Closed(reason) => break reason,
                }
            };
        }

        let result = async {
            self.greet().await?;

            let close_reason = loop {
                let should_close = match read_line_or_break!(self) {
                    Some(line) => self.handle_line(&String::from_utf8_lossy(&line)).await?,
                    None => self.unrecognized().await?,
                };

                match should_close {
                    ShouldClose::Close(reason) => break reason,
                    ShouldClose::Keep => (),
                }
            };

            Ok::<_, Error>(close_reason)
        }
        .await;

        self.stage = Stage::Closed;

        if let Ok(reason) = &result {
            self.activity.closed(reason);
        }

        result
    }

    /// Write the configured greeting. This is the only write that precedes any client input.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub async fn greet(&mut self) -> Result<(), Error> {
        self.reply(Configuration::msg_greeting, Duration::ZERO).await
    }

    /// Route one line to the handler of its verb and let it answer.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if reading from or writing to the client fails.
    pub async fn handle_line(&mut self, line: &str) -> Result<ShouldClose, Error> {
        self.activity.incoming(line);

        let Ok(command) = command::parse(line) else {
            return self.unrecognized().await;
        };

        match command.verb() {
            Verb::Helo | Verb::Ehlo => self.helo(&command).await,
            Verb::Mail => self.mailfrom(&command).await,
            Verb::Rcpt => self.rcptto(&command).await,
            Verb::Data => self.data(&command).await,
            Verb::Noop => self.noop(&command).await,
            Verb::Rset => self.rset(&command).await,
            Verb::Quit => self.quit(&command).await,
            Verb::Unknown => self.unrecognized().await,
        }
    }

    /// Wait for the next line of at most `limit` bytes.
    ///
    /// Every read waits for at most [`Configuration::session_timeout`]. A longer line is drained
    /// in pieces of `limit` bytes so that it never has to be held in memory.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for any read failure other than the client going away.
    pub(crate) async fn next_line(&mut self, limit: usize) -> Result<Incoming, Error> {
        let incoming = self.read_capped(limit).await?;

        if matches!(incoming, Incoming::TooLong) {
            loop {
                match self.read_capped(limit).await? {
                    Incoming::Line(_) => break,
                    Incoming::TooLong => (),
                    closed @ Incoming::Closed(_) => return Ok(closed),
                }
            }
        }

        Ok(incoming)
    }

    /// Read at most `limit` bytes up to and including the next `LF`.
    ///
    /// A final line the client closed without a line ending still counts as a line.
    async fn read_capped(&mut self, limit: usize) -> Result<Incoming, Error> {
        match tokio::time::timeout(
            self.configuration.session_timeout(),
            read_line!(self.stream, limit),
        )
        .await
        {
            Ok(Ok(line)) if line.is_empty() => Ok(Incoming::Closed(CloseReason::ClosedByClient)),
            Ok(Ok(line)) if line.len() >= limit && !line.ends_with(b"\n") => Ok(Incoming::TooLong),
            Ok(Ok(line)) => Ok(Incoming::Line(line)),
            Ok(Err(err)) => match err.kind() {
                io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset => {
                    Ok(Incoming::Closed(CloseReason::ClosedByClient))
                }
                _ => Err(err.into()),
            },
            Err(elapsed) => Ok(Incoming::Closed(CloseReason::TimedOut(elapsed))),
        }
    }

    /// Wait for `delay`, then write the reply selected from the configuration as one line.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn reply(
        &mut self,
        reply: fn(&Configuration) -> &SmtpString,
        delay: Duration,
    ) -> Result<(), Error> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = reply(&self.configuration);
        self.activity.outgoing(reply);
        let line = reply.to_line();

        self.stream.write_all(&line).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Answer with a negative reply, then close the session if `rejection` demands it.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn reject(
        &mut self,
        rejection: Rejection,
        reply: fn(&Configuration) -> &SmtpString,
        delay: Duration,
    ) -> Result<ShouldClose, Error> {
        self.activity.rejected(rejection);
        self.reply(reply, delay).await?;

        if rejection.ends_session(self.configuration.is_cmd_fail_fast()) {
            Ok(ShouldClose::Close(CloseReason::Rejected(rejection)))
        } else {
            Ok(ShouldClose::Keep)
        }
    }
}
