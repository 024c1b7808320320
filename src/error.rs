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

//! Errors that leave the protocol, and the protocol outcomes that never do.

use std::io;

use ascii::AsAsciiStrError;
use thiserror::Error;

/// A failure that ends a session without any further reply.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading from or writing to the client failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// A [`crate::ConfigurationAttr`] that cannot become a [`crate::Configuration`].
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A reply template contains characters SMTP cannot carry.
    #[error("`{field}` is not a valid SMTP reply: {source}")]
    InvalidReply {
        field: &'static str,
        #[source]
        source: AsAsciiStrError,
    },
}

/// Why a handler answered a request negatively.
///
/// These are replies, not errors: each one is written to the client as the matching configured
/// reply, and only [`Rejection::ends_session`] decides what happens to the session afterwards.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Rejection {
    /// The command arrived out of order.
    InvalidSequence,
    /// The command argument does not have the required shape.
    InvalidArgument,
    /// A domain or address is on a configured deny list.
    Blacklisted,
    /// A recipient simulates a mailbox that does not exist.
    NotRegistered,
    /// The message body is larger than the configured limit.
    SizeExceeded,
    /// The verb is not one the server knows.
    UnknownCommand,
}

impl Rejection {
    /// Whether the session must close after replying.
    ///
    /// [`Self::Blacklisted`] always closes and [`Self::NotRegistered`] never does. Everything else
    /// closes only under the fail-fast policy.
    #[must_use]
    pub const fn ends_session(self, is_cmd_fail_fast: bool) -> bool {
        match self {
            Self::Blacklisted => true,
            Self::NotRegistered => false,
            Self::InvalidSequence
            | Self::InvalidArgument
            | Self::SizeExceeded
            | Self::UnknownCommand => is_cmd_fail_fast,
        }
    }
}
