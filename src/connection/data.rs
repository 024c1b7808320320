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

//! Collects the message body that follows an accepted `DATA`.
//!
//! [RFC 5321 section 4.1.1.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.4).

use tokio::io::{AsyncRead, AsyncWrite};

use super::{CloseReason, Incoming, Session};
use crate::{error::Error, str::max_lengths};

/// The shortest body line a read is capped to, so that the terminator always fits.
const TERMINATOR_LEN: usize = b".\r\n".len();

/// What reading a message body produced.
#[derive(PartialEq, Eq, Debug)]
pub(crate) enum Body {
    /// The body, dot-unstuffed, without the terminating line.
    Received(Vec<u8>),
    /// The body went past [`crate::Configuration::msg_size_limit`]. It was read to its end and
    /// dropped.
    TooBig,
    /// The session closed before the terminating line arrived.
    Closed(CloseReason),
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Read lines until the `.` terminator, each one under the session timeout.
    ///
    /// The size limit counts the bytes the client sent, after dot-unstuffing. No line is read
    /// further than the limit allows, and once it is exceeded the rest of the body is drained
    /// [`max_lengths::TEXT_LINE`] bytes at a time.
    ///
    /// # Errors
    ///
    /// Any errors that could come out of [`Session::next_line`].
    pub(crate) async fn read_body(&mut self) -> Result<Body, Error> {
        let limit = self.configuration.msg_size_limit();
        let mut body = Vec::new();
        let mut too_big = false;

        loop {
            let cap = if too_big {
                max_lengths::TEXT_LINE
            } else {
                line_cap(limit - body.len())
            };

            let line = match self.next_line(cap).await? {
                Incoming::Line(line) => line,
                Incoming::TooLong => {
                    too_big = true;
                    continue;
                }
                Incoming::Closed(reason) => return Ok(Body::Closed(reason)),
            };

            if is_terminator(&line) {
                break;
            }

            if too_big {
                continue;
            }

            let line = unstuff(&line);
            if body.len() + line.len() > limit {
                too_big = true;
                continue;
            }

            body.extend_from_slice(line);
        }

        self.activity.body(body.len(), too_big);

        Ok(if too_big {
            Body::TooBig
        } else {
            Body::Received(body)
        })
    }
}

/// How many bytes to read for the next line when `remaining` bytes of the limit are left.
///
/// One byte more than fits, to tell an exact fit from an overrun, and one for a stuffed dot.
fn line_cap(remaining: usize) -> usize {
    remaining.saturating_add(2).max(TERMINATOR_LEN)
}

/// Whether `line` is the lone `.` that ends a body. A final line without its line ending counts.
fn is_terminator(line: &[u8]) -> bool {
    matches!(line, b"." | b".\n" | b".\r\n")
}

/// Remove the dot a client adds in front of any body line that starts with one.
fn unstuff(line: &[u8]) -> &[u8] {
    line.strip_prefix(b".").unwrap_or(line)
}
