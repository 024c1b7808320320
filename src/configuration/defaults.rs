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

//! The values every omitted [`super::ConfigurationAttr`] field falls back to.

/// Listen on all interfaces.
pub const HOST_ADDRESS: &str = "0.0.0.0";
/// Let the operating system pick a free port.
pub const PORT_NUMBER: u16 = 0;

pub const GREETING_MSG: &str = "220 Welcome";
pub const QUIT_MSG: &str = "221 Closing connection";
pub const RECEIVED_MSG: &str = "250 Received";
pub const READY_FOR_RECEIVE_MSG: &str =
    "354 Ready for receive message. End data with <CR><LF>.<CR><LF>";
pub const INVALID_CMD_MSG: &str = "502 Command unrecognized. Available commands: HELO, EHLO, MAIL \
                                   FROM:, RCPT TO:, DATA, NOOP, RSET, QUIT";

pub const INVALID_CMD_HELO_SEQUENCE_MSG: &str = "503 Bad sequence of commands";
pub const INVALID_CMD_HELO_ARG_MSG: &str = "501 HELO requires domain address";

pub const INVALID_CMD_MAILFROM_SEQUENCE_MSG: &str = "503 Bad sequence of commands";
pub const INVALID_CMD_MAILFROM_ARG_MSG: &str = "501 MAIL FROM requires valid email address";

pub const INVALID_CMD_RCPTTO_SEQUENCE_MSG: &str = "503 Bad sequence of commands";
pub const INVALID_CMD_RCPTTO_ARG_MSG: &str = "501 RCPT TO requires valid email address";
pub const NOT_REGISTERED_RCPTTO_EMAIL_MSG: &str = "550 User not found";

pub const INVALID_CMD_DATA_SEQUENCE_MSG: &str = "503 Bad sequence of commands";

/// Followed by `" <limit> bytes"` when the configuration is built.
pub const MSG_SIZE_IS_TOO_BIG_MSG: &str = "552 Message exceeded max size of";
/// 10 MiB.
pub const MESSAGE_SIZE_LIMIT: usize = 10_485_760;
