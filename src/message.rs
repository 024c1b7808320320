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

//! What a single session has observed from its client.

/// The protocol-observable facts of one session.
///
/// Only the handlers of the owning session mutate a [`Message`]. Callers get it back once the
/// session is over, through [`crate::Session::into_message`] or [`crate::Server::recv_message`].
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Message {
    helo: Option<String>,
    mailfrom: Option<String>,
    rcptto: Vec<String>,
    data: Option<Vec<u8>>,

    helo_count: usize,
    mailfrom_count: usize,
    rcptto_count: usize,
    data_count: usize,
    noop_count: usize,
    rset_count: usize,
    quit_count: usize,
}

impl Message {
    /// The argument of the accepted `HELO`/`EHLO`.
    #[must_use]
    pub fn helo(&self) -> Option<&str> {
        self.helo.as_deref()
    }

    /// The mailbox of the accepted `MAIL FROM:`, without its angle brackets.
    #[must_use]
    pub fn mailfrom(&self) -> Option<&str> {
        self.mailfrom.as_deref()
    }

    /// The mailboxes of every accepted `RCPT TO:`, in order.
    ///
    /// Recipients answered as blacklisted or not registered are not part of this list.
    #[must_use]
    pub fn rcptto(&self) -> &[String] {
        &self.rcptto
    }

    /// The accepted message body, dot-unstuffed, without the terminating `.` line.
    ///
    /// These are the bytes the client sent, line endings included. SMTP does not promise any text
    /// encoding for a body, so nothing is decoded.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// [`Self::data`] as text, if it is valid UTF-8.
    #[must_use]
    pub fn data_str(&self) -> Option<&str> {
        self.data().and_then(|data| std::str::from_utf8(data).ok())
    }

    /// How many well-formed `HELO`/`EHLO` requests were answered.
    #[must_use]
    pub const fn helo_count(&self) -> usize {
        self.helo_count
    }

    /// How many well-formed `MAIL FROM:` requests were answered.
    #[must_use]
    pub const fn mailfrom_count(&self) -> usize {
        self.mailfrom_count
    }

    /// How many well-formed `RCPT TO:` requests were answered.
    #[must_use]
    pub const fn rcptto_count(&self) -> usize {
        self.rcptto_count
    }

    /// How many well-formed `DATA` requests were answered.
    #[must_use]
    pub const fn data_count(&self) -> usize {
        self.data_count
    }

    /// How many well-formed `NOOP` requests were answered.
    #[must_use]
    pub const fn noop_count(&self) -> usize {
        self.noop_count
    }

    /// How many well-formed `RSET` requests were answered.
    #[must_use]
    pub const fn rset_count(&self) -> usize {
        self.rset_count
    }

    /// How many well-formed `QUIT` requests were answered.
    #[must_use]
    pub const fn quit_count(&self) -> usize {
        self.quit_count
    }

    pub(crate) fn set_helo(&mut self, domain: &str) {
        self.helo = Some(domain.to_string());
    }

    pub(crate) fn set_mailfrom(&mut self, mailbox: &str) {
        self.mailfrom = Some(mailbox.to_string());
    }

    pub(crate) fn push_rcptto(&mut self, mailbox: &str) {
        self.rcptto.push(mailbox.to_string());
    }

    pub(crate) fn set_data(&mut self, body: Vec<u8>) {
        self.data = Some(body);
    }

    pub(crate) fn count_helo(&mut self) {
        self.helo_count += 1;
    }

    pub(crate) fn count_mailfrom(&mut self) {
        self.mailfrom_count += 1;
    }

    pub(crate) fn count_rcptto(&mut self) {
        self.rcptto_count += 1;
    }

    pub(crate) fn count_data(&mut self) {
        self.data_count += 1;
    }

    pub(crate) fn count_noop(&mut self) {
        self.noop_count += 1;
    }

    pub(crate) fn count_rset(&mut self) {
        self.rset_count += 1;
    }

    pub(crate) fn count_quit(&mut self) {
        self.quit_count += 1;
    }
}
