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

//! How long a session waits, both for its client and, artificially, before answering it.
//!
//! [RFC 5321 4.5.3.2](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.2) asks a server
//! to wait at least five minutes for the next command. A mock server is used from test suites, so
//! [`SESSION`] is much shorter by default and every session can override it through
//! [`crate::ConfigurationAttr::session_timeout`].
//!
//! The [`ResponseDelays`] are the opposite knob: they hold a reply back so that the timeout logic of
//! the client under test can be exercised.

use std::time::Duration;

/// The default time a session waits for the next line from its client before closing silently.
pub const SESSION: Duration = Duration::from_secs(30);

/// How long the accept loop pauses after [`tokio::net::TcpListener::accept`] fails, so that a
/// persistent failure such as running out of file descriptors does not spin.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Artificial delays applied before a reply is written, one per verb.
///
/// Every delay defaults to [`Duration::ZERO`]. A delay only ever suspends the session it belongs
/// to.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct ResponseDelays {
    /// Before any reply to `HELO`/`EHLO`.
    pub helo: Duration,
    /// Before any reply to `MAIL FROM:`.
    pub mailfrom: Duration,
    /// Before any reply to `RCPT TO:`.
    pub rcptto: Duration,
    /// Before any reply to `DATA` itself, including the intermediate `354` reply.
    pub data: Duration,
    /// Before the reply that follows the end of the message body.
    pub message: Duration,
    /// Before the reply to `NOOP`.
    pub noop: Duration,
    /// Before the reply to `RSET`.
    pub rset: Duration,
    /// Before the reply to `QUIT`.
    pub quit: Duration,
}
