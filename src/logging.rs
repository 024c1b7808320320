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

//! Session activity events and the subscriber that prints them.

use std::{net::SocketAddr, str::FromStr};

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::{
    connection::CloseReason,
    error::{Error, Rejection},
    str::SmtpString,
    Configuration,
};

/// Emit an event under the activity target, at `$level`.
macro_rules! activity {
    ($level:ident, $($arg:tt)+) => {
        tracing::event!(target: "smtp_mock::activity", tracing::Level::$level, $($arg)+)
    };
}

/// Install a subscriber printing to stdout, if the configuration asks for one.
///
/// The level comes from the `LOG_LEVEL` environment variable and defaults to `INFO`. Only events
/// from this crate are printed. Does nothing if a global subscriber is already installed, so
/// starting several servers in one process is fine.
pub fn init(configuration: &Configuration) {
    if !configuration.log_to_stdout() {
        return;
    }

    let default = LevelFilter::INFO;
    let level = std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(&level).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    });

    let _ = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("smtp_mock")
                })),
        )
        .try_init();
}

/// Records what a session does, when [`Configuration::log_server_activity`] is set.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) struct Activity {
    enabled: bool,
}

impl Activity {
    pub(crate) const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub(crate) fn opened(self, client: SocketAddr) {
        if self.enabled {
            activity!(INFO, %client, "session opened");
        }
    }

    pub(crate) fn incoming(self, line: &str) {
        if self.enabled {
            activity!(DEBUG, request = line.trim_end_matches(['\r', '\n']), "incoming");
        }
    }

    pub(crate) fn outgoing(self, reply: &SmtpString) {
        if self.enabled {
            activity!(DEBUG, %reply, "outgoing");
        }
    }

    pub(crate) fn body(self, bytes: usize, too_big: bool) {
        if self.enabled {
            activity!(DEBUG, bytes, too_big, "message body read");
        }
    }

    pub(crate) fn rejected(self, rejection: Rejection) {
        if self.enabled {
            activity!(INFO, ?rejection, "request rejected");
        }
    }

    pub(crate) fn closed(self, reason: &CloseReason) {
        if self.enabled {
            activity!(INFO, ?reason, "session closed");
        }
    }

    pub(crate) fn failed(self, err: &Error) {
        if self.enabled {
            activity!(WARN, %err, "session failed");
        }
    }
}
