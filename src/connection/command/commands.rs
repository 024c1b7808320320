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

//! Handles responding to particular commands from SMTP clients.
//!
//! Every handler runs the same checks in the same order: the shape of the request, the stage of
//! the session, the argument, and finally the configured deny lists. A request of the wrong shape
//! is dropped without a reply and without touching the [`crate::Message`].

use tokio::io::{AsyncRead, AsyncWrite};

use super::Command;
use crate::{
    connection::{data::Body, CloseReason, Session, ShouldClose, Stage},
    error::{Error, Rejection},
    Configuration,
};

#[cfg(test)]
mod test;

/// Return [`ShouldClose::Keep`] without replying if `$command` is a malformed instance of its
/// verb.
macro_rules! ignore_if_malformed {
    ($command:expr) => {
        if $command.is_invalid_request() {
            return Ok(ShouldClose::Keep);
        }
    };
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Reply to an unrecognized command from a client.
    ///
    /// [RFC 5321 section 4.2.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.2.4).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn unrecognized(&mut self) -> Result<ShouldClose, Error> {
        self.reject(
            Rejection::UnknownCommand,
            Configuration::msg_invalid_cmd,
            std::time::Duration::ZERO,
        )
        .await
    }

    /// Reply to the hello (`HELO` or `EHLO`) command from a client.
    ///
    /// [RFC 5321 section 4.1.1.1](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.1).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn helo(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        let delay = self.configuration.response_delays().helo;
        self.message.count_helo();

        if self.stage != Stage::Init {
            return self
                .reject(
                    Rejection::InvalidSequence,
                    Configuration::msg_invalid_cmd_helo_sequence,
                    delay,
                )
                .await;
        }

        let Some(domain) = command.helo_domain() else {
            return self
                .reject(
                    Rejection::InvalidArgument,
                    Configuration::msg_invalid_cmd_helo_arg,
                    delay,
                )
                .await;
        };

        if self.configuration.blacklisted_helo_domains().contains(domain) {
            return self
                .reject(
                    Rejection::Blacklisted,
                    Configuration::msg_helo_blacklisted_domain,
                    delay,
                )
                .await;
        }

        self.message.set_helo(domain);
        self.stage = Stage::HeloDone;
        self.reply(Configuration::msg_helo_received, delay).await?;

        Ok(ShouldClose::Keep)
    }

    /// Reply to the mail (`MAIL FROM:`) command from a client.
    ///
    /// [RFC 5321 section 4.1.1.2](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.2).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn mailfrom(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        let delay = self.configuration.response_delays().mailfrom;
        self.message.count_mailfrom();

        if self.stage != Stage::HeloDone {
            return self
                .reject(
                    Rejection::InvalidSequence,
                    Configuration::msg_invalid_cmd_mailfrom_sequence,
                    delay,
                )
                .await;
        }

        let Some(mailbox) = command.mailbox() else {
            return self
                .reject(
                    Rejection::InvalidArgument,
                    Configuration::msg_invalid_cmd_mailfrom_arg,
                    delay,
                )
                .await;
        };

        if self
            .configuration
            .blacklisted_mailfrom_emails()
            .contains(mailbox)
        {
            return self
                .reject(
                    Rejection::Blacklisted,
                    Configuration::msg_mailfrom_blacklisted_email,
                    delay,
                )
                .await;
        }

        self.message.set_mailfrom(mailbox);
        self.stage = Stage::MailfromDone;
        self.reply(Configuration::msg_mailfrom_received, delay)
            .await?;

        Ok(ShouldClose::Keep)
    }

    /// Reply to the recipient (`RCPT TO:`) command from a client. Repeatable.
    ///
    /// [RFC 5321 section 4.1.1.3](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.3).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn rcptto(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        let delay = self.configuration.response_delays().rcptto;
        self.message.count_rcptto();

        if !matches!(self.stage, Stage::MailfromDone | Stage::RcpttoDone) {
            return self
                .reject(
                    Rejection::InvalidSequence,
                    Configuration::msg_invalid_cmd_rcptto_sequence,
                    delay,
                )
                .await;
        }

        let Some(mailbox) = command.mailbox() else {
            return self
                .reject(
                    Rejection::InvalidArgument,
                    Configuration::msg_invalid_cmd_rcptto_arg,
                    delay,
                )
                .await;
        };

        if self
            .configuration
            .blacklisted_rcptto_emails()
            .contains(mailbox)
        {
            return self
                .reject(
                    Rejection::Blacklisted,
                    Configuration::msg_rcptto_blacklisted_email,
                    delay,
                )
                .await;
        }

        if self.configuration.not_registered_emails().contains(mailbox) {
            return self
                .reject(
                    Rejection::NotRegistered,
                    Configuration::msg_rcptto_not_registered_email,
                    delay,
                )
                .await;
        }

        self.message.push_rcptto(mailbox);
        self.stage = Stage::RcpttoDone;
        self.reply(Configuration::msg_rcptto_received, delay).await?;

        Ok(ShouldClose::Keep)
    }

    /// Reply to the data (`DATA`) command from a client, then collect and acknowledge the body.
    ///
    /// [RFC 5321 section 4.1.1.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.4).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if reading from or writing to the client fails.
    pub(crate) async fn data(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        let delays = self.configuration.response_delays();
        self.message.count_data();

        if self.stage != Stage::RcpttoDone {
            return self
                .reject(
                    Rejection::InvalidSequence,
                    Configuration::msg_invalid_cmd_data_sequence,
                    delays.data,
                )
                .await;
        }

        self.reply(Configuration::msg_data_received, delays.data)
            .await?;

        match self.read_body().await? {
            Body::Received(body) => {
                self.message.set_data(body);
                self.stage = Stage::DataDone;
                self.reply(Configuration::msg_msg_received, delays.message)
                    .await?;

                Ok(ShouldClose::Keep)
            }
            Body::TooBig => {
                self.reject(
                    Rejection::SizeExceeded,
                    Configuration::msg_msg_size_is_too_big,
                    delays.message,
                )
                .await
            }
            Body::Closed(reason) => Ok(ShouldClose::Close(reason)),
        }
    }

    /// Reply to the no-op (`NOOP`) command from a client.
    ///
    /// [RFC 5321 section 4.1.1.9](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.9).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn noop(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        self.message.count_noop();
        self.reply(
            Configuration::msg_noop_cmd,
            self.configuration.response_delays().noop,
        )
        .await?;

        Ok(ShouldClose::Keep)
    }

    /// Reply to the reset (`RSET`) command from a client. The stage is left as it is.
    ///
    /// [RFC 5321 section 4.1.1.5](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.5).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn rset(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        self.message.count_rset();
        self.reply(
            Configuration::msg_rset_cmd,
            self.configuration.response_delays().rset,
        )
        .await?;

        Ok(ShouldClose::Keep)
    }

    /// Reply to the quit (`QUIT`) command from a client.
    ///
    /// [RFC 5321 section 4.1.1.10](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.10).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if writing to the client fails.
    pub(crate) async fn quit(&mut self, command: &Command) -> Result<ShouldClose, Error> {
        ignore_if_malformed!(command);

        self.message.count_quit();
        self.reply(
            Configuration::msg_quit_cmd,
            self.configuration.response_delays().quit,
        )
        .await?;

        Ok(ShouldClose::Close(CloseReason::Quit))
    }
}
