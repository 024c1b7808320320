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

//! The immutable settings every session of a server reads from.
//!
//! A [`Configuration`] is built once from a [`ConfigurationAttr`], in which every field is an
//! optional override. Omitted fields fall back to the constants in [`defaults`]. Once built, a
//! [`Configuration`] is never mutated and is shared between sessions behind an
//! [`std::sync::Arc`].

use std::{collections::HashSet, time::Duration};

use crate::{error::ConfigurationError, str::SmtpString, timeouts, timeouts::ResponseDelays};

pub mod defaults;

/// Optional overrides for every setting of a [`Configuration`].
///
/// Meant to be built with struct update syntax:
///
/// ```rust
/// # use smtp_mock::{Configuration, ConfigurationAttr};
/// # use std::error::Error;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let configuration = Configuration::new(ConfigurationAttr {
///     is_cmd_fail_fast: true,
///     blacklisted_helo_domains: vec!["spam.example".to_string()],
///     msg_size_limit: Some(1_024),
///     ..Default::default()
/// })?;
///
/// assert_eq!(configuration.msg_msg_size_is_too_big(), "552 Message exceeded max size of 1024 bytes");
/// #     Ok(())
/// # }
/// ```
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct ConfigurationAttr {
    pub host_address: Option<String>,
    pub port_number: Option<u16>,
    pub log_to_stdout: bool,
    pub log_server_activity: bool,
    pub is_cmd_fail_fast: bool,

    pub msg_greeting: Option<String>,
    pub msg_invalid_cmd: Option<String>,
    pub msg_quit_cmd: Option<String>,
    pub msg_noop_cmd: Option<String>,
    pub msg_rset_cmd: Option<String>,

    pub msg_invalid_cmd_helo_sequence: Option<String>,
    pub msg_invalid_cmd_helo_arg: Option<String>,
    pub msg_helo_blacklisted_domain: Option<String>,
    pub msg_helo_received: Option<String>,

    pub msg_invalid_cmd_mailfrom_sequence: Option<String>,
    pub msg_invalid_cmd_mailfrom_arg: Option<String>,
    pub msg_mailfrom_blacklisted_email: Option<String>,
    pub msg_mailfrom_received: Option<String>,

    pub msg_invalid_cmd_rcptto_sequence: Option<String>,
    pub msg_invalid_cmd_rcptto_arg: Option<String>,
    pub msg_rcptto_not_registered_email: Option<String>,
    pub msg_rcptto_blacklisted_email: Option<String>,
    pub msg_rcptto_received: Option<String>,

    pub msg_invalid_cmd_data_sequence: Option<String>,
    pub msg_data_received: Option<String>,
    /// Always followed by `" <limit> bytes"`.
    pub msg_msg_size_is_too_big: Option<String>,
    pub msg_msg_received: Option<String>,

    pub blacklisted_helo_domains: Vec<String>,
    pub blacklisted_mailfrom_emails: Vec<String>,
    pub blacklisted_rcptto_emails: Vec<String>,
    pub not_registered_emails: Vec<String>,

    /// In bytes.
    pub msg_size_limit: Option<usize>,
    pub session_timeout: Option<Duration>,
    pub response_delays: ResponseDelays,
}

/// Generate a `#[must_use]` getter returning a reference to each listed field.
macro_rules! getters {
    [$(
        $( #[$attr:meta] )*
        $field:ident: $type:ty
    ),+ ,] => {
        $(
            $( #[$attr] )*
            #[must_use]
            pub const fn $field(&self) -> &$type {
                &self.$field
            }
        )+
    };
}

/// Settings shared, read-only, by every session of a server.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Configuration {
    host_address: String,
    port_number: u16,
    log_to_stdout: bool,
    log_server_activity: bool,
    is_cmd_fail_fast: bool,

    msg_greeting: SmtpString,
    msg_invalid_cmd: SmtpString,
    msg_quit_cmd: SmtpString,
    msg_noop_cmd: SmtpString,
    msg_rset_cmd: SmtpString,

    msg_invalid_cmd_helo_sequence: SmtpString,
    msg_invalid_cmd_helo_arg: SmtpString,
    msg_helo_blacklisted_domain: SmtpString,
    msg_helo_received: SmtpString,

    msg_invalid_cmd_mailfrom_sequence: SmtpString,
    msg_invalid_cmd_mailfrom_arg: SmtpString,
    msg_mailfrom_blacklisted_email: SmtpString,
    msg_mailfrom_received: SmtpString,

    msg_invalid_cmd_rcptto_sequence: SmtpString,
    msg_invalid_cmd_rcptto_arg: SmtpString,
    msg_rcptto_not_registered_email: SmtpString,
    msg_rcptto_blacklisted_email: SmtpString,
    msg_rcptto_received: SmtpString,

    msg_invalid_cmd_data_sequence: SmtpString,
    msg_data_received: SmtpString,
    msg_msg_size_is_too_big: SmtpString,
    msg_msg_received: SmtpString,

    blacklisted_helo_domains: HashSet<String>,
    blacklisted_mailfrom_emails: HashSet<String>,
    blacklisted_rcptto_emails: HashSet<String>,
    not_registered_emails: HashSet<String>,

    msg_size_limit: usize,
    session_timeout: Duration,
    response_delays: ResponseDelays,
}

impl Configuration {
    /// Build a [`Self`], filling every omitted field from [`defaults`].
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidReply`] if any reply, overridden or not, is not US-ASCII.
    pub fn new(attr: ConfigurationAttr) -> Result<Self, ConfigurationError> {
        /// Resolve a reply field: the override if present, otherwise the default.
        macro_rules! reply {
            ($field:ident, $default:expr) => {
                reply(
                    stringify!($field),
                    attr.$field.as_deref().unwrap_or($default),
                )?
            };
        }

        fn reply(field: &'static str, text: &str) -> Result<SmtpString, ConfigurationError> {
            SmtpString::new(text).map_err(|source| ConfigurationError::InvalidReply { field, source })
        }

        let msg_size_limit = attr.msg_size_limit.unwrap_or(defaults::MESSAGE_SIZE_LIMIT);
        let msg_msg_size_is_too_big = reply(
            "msg_msg_size_is_too_big",
            &format!(
                "{} {msg_size_limit} bytes",
                attr.msg_msg_size_is_too_big
                    .as_deref()
                    .unwrap_or(defaults::MSG_SIZE_IS_TOO_BIG_MSG)
            ),
        )?;

        Ok(Self {
            host_address: attr
                .host_address
                .unwrap_or_else(|| defaults::HOST_ADDRESS.to_string()),
            port_number: attr.port_number.unwrap_or(defaults::PORT_NUMBER),
            log_to_stdout: attr.log_to_stdout,
            log_server_activity: attr.log_server_activity,
            is_cmd_fail_fast: attr.is_cmd_fail_fast,

            msg_greeting: reply!(msg_greeting, defaults::GREETING_MSG),
            msg_invalid_cmd: reply!(msg_invalid_cmd, defaults::INVALID_CMD_MSG),
            msg_quit_cmd: reply!(msg_quit_cmd, defaults::QUIT_MSG),
            msg_noop_cmd: reply!(msg_noop_cmd, defaults::RECEIVED_MSG),
            msg_rset_cmd: reply!(msg_rset_cmd, defaults::RECEIVED_MSG),

            msg_invalid_cmd_helo_sequence: reply!(
                msg_invalid_cmd_helo_sequence,
                defaults::INVALID_CMD_HELO_SEQUENCE_MSG
            ),
            msg_invalid_cmd_helo_arg: reply!(
                msg_invalid_cmd_helo_arg,
                defaults::INVALID_CMD_HELO_ARG_MSG
            ),
            msg_helo_blacklisted_domain: reply!(msg_helo_blacklisted_domain, defaults::QUIT_MSG),
            msg_helo_received: reply!(msg_helo_received, defaults::RECEIVED_MSG),

            msg_invalid_cmd_mailfrom_sequence: reply!(
                msg_invalid_cmd_mailfrom_sequence,
                defaults::INVALID_CMD_MAILFROM_SEQUENCE_MSG
            ),
            msg_invalid_cmd_mailfrom_arg: reply!(
                msg_invalid_cmd_mailfrom_arg,
                defaults::INVALID_CMD_MAILFROM_ARG_MSG
            ),
            msg_mailfrom_blacklisted_email: reply!(
                msg_mailfrom_blacklisted_email,
                defaults::QUIT_MSG
            ),
            msg_mailfrom_received: reply!(msg_mailfrom_received, defaults::RECEIVED_MSG),

            msg_invalid_cmd_rcptto_sequence: reply!(
                msg_invalid_cmd_rcptto_sequence,
                defaults::INVALID_CMD_RCPTTO_SEQUENCE_MSG
            ),
            msg_invalid_cmd_rcptto_arg: reply!(
                msg_invalid_cmd_rcptto_arg,
                defaults::INVALID_CMD_RCPTTO_ARG_MSG
            ),
            msg_rcptto_not_registered_email: reply!(
                msg_rcptto_not_registered_email,
                defaults::NOT_REGISTERED_RCPTTO_EMAIL_MSG
            ),
            msg_rcptto_blacklisted_email: reply!(msg_rcptto_blacklisted_email, defaults::QUIT_MSG),
            msg_rcptto_received: reply!(msg_rcptto_received, defaults::RECEIVED_MSG),

            msg_invalid_cmd_data_sequence: reply!(
                msg_invalid_cmd_data_sequence,
                defaults::INVALID_CMD_DATA_SEQUENCE_MSG
            ),
            msg_data_received: reply!(msg_data_received, defaults::READY_FOR_RECEIVE_MSG),
            msg_msg_size_is_too_big,
            msg_msg_received: reply!(msg_msg_received, defaults::RECEIVED_MSG),

            blacklisted_helo_domains: attr.blacklisted_helo_domains.into_iter().collect(),
            blacklisted_mailfrom_emails: attr.blacklisted_mailfrom_emails.into_iter().collect(),
            blacklisted_rcptto_emails: attr.blacklisted_rcptto_emails.into_iter().collect(),
            not_registered_emails: attr.not_registered_emails.into_iter().collect(),

            msg_size_limit,
            session_timeout: attr.session_timeout.unwrap_or(timeouts::SESSION),
            response_delays: attr.response_delays,
        })
    }

    /// The address `host_address:port_number` a listener should bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host_address, self.port_number)
    }

    #[must_use]
    pub const fn port_number(&self) -> u16 {
        self.port_number
    }

    #[must_use]
    pub const fn log_to_stdout(&self) -> bool {
        self.log_to_stdout
    }

    #[must_use]
    pub const fn log_server_activity(&self) -> bool {
        self.log_server_activity
    }

    /// Whether an invalid or unknown command closes the session instead of allowing a retry.
    #[must_use]
    pub const fn is_cmd_fail_fast(&self) -> bool {
        self.is_cmd_fail_fast
    }

    /// The largest accepted message body, in bytes.
    #[must_use]
    pub const fn msg_size_limit(&self) -> usize {
        self.msg_size_limit
    }

    /// How long a session waits for its next line.
    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    #[must_use]
    pub const fn response_delays(&self) -> ResponseDelays {
        self.response_delays
    }

    getters![
        host_address: String,

        /// Written once, before the first read of every session.
        msg_greeting: SmtpString,
        msg_invalid_cmd: SmtpString,
        msg_quit_cmd: SmtpString,
        msg_noop_cmd: SmtpString,
        msg_rset_cmd: SmtpString,

        msg_invalid_cmd_helo_sequence: SmtpString,
        msg_invalid_cmd_helo_arg: SmtpString,
        msg_helo_blacklisted_domain: SmtpString,
        msg_helo_received: SmtpString,

        msg_invalid_cmd_mailfrom_sequence: SmtpString,
        msg_invalid_cmd_mailfrom_arg: SmtpString,
        msg_mailfrom_blacklisted_email: SmtpString,
        msg_mailfrom_received: SmtpString,

        msg_invalid_cmd_rcptto_sequence: SmtpString,
        msg_invalid_cmd_rcptto_arg: SmtpString,
        msg_rcptto_not_registered_email: SmtpString,
        msg_rcptto_blacklisted_email: SmtpString,
        msg_rcptto_received: SmtpString,

        msg_invalid_cmd_data_sequence: SmtpString,
        /// The intermediate `354` reply to `DATA`.
        msg_data_received: SmtpString,
        /// Already formatted with [`Self::msg_size_limit`].
        msg_msg_size_is_too_big: SmtpString,
        /// The reply once a whole message body has been accepted.
        msg_msg_received: SmtpString,

        blacklisted_helo_domains: HashSet<String>,
        blacklisted_mailfrom_emails: HashSet<String>,
        blacklisted_rcptto_emails: HashSet<String>,
        not_registered_emails: HashSet<String>,
    ];
}
