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

//! Runs an `smtp_mock` server until interrupted.

#![warn(clippy::nursery, clippy::pedantic)]

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use smtp_mock::{Configuration, ConfigurationAttr, ResponseDelays, Server};

/// A programmable mock SMTP server for testing SMTP clients
#[derive(Parser, Debug)]
#[command(name = "smtp_mock_server")]
#[command(version, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    host_address: Option<String>,

    /// Port to listen on; 0 picks a free one
    #[arg(short, long)]
    port_number: Option<u16>,

    /// Print log events to stdout, filtered by the `LOG_LEVEL` environment variable
    #[arg(long)]
    log_to_stdout: bool,

    /// Log every request, reply and session change
    #[arg(long)]
    log_server_activity: bool,

    /// Close the session on the first invalid or unknown command
    #[arg(long)]
    fail_fast: bool,

    /// Largest accepted message body, in bytes
    #[arg(long)]
    msg_size_limit: Option<usize>,

    /// Seconds to wait for the next line before closing a session
    #[arg(long)]
    session_timeout: Option<u64>,

    /// HELO/EHLO domains that are answered as blacklisted (comma separated)
    #[arg(long, value_delimiter = ',')]
    blacklisted_helo_domains: Vec<String>,

    /// MAIL FROM addresses that are answered as blacklisted (comma separated)
    #[arg(long, value_delimiter = ',')]
    blacklisted_mailfrom_emails: Vec<String>,

    /// RCPT TO addresses that are answered as blacklisted (comma separated)
    #[arg(long, value_delimiter = ',')]
    blacklisted_rcptto_emails: Vec<String>,

    /// RCPT TO addresses that are answered as unknown mailboxes (comma separated)
    #[arg(long, value_delimiter = ',')]
    not_registered_emails: Vec<String>,

    #[command(flatten)]
    replies: Replies,

    #[command(flatten)]
    delays: Delays,
}

/// Reply overrides.
#[derive(clap::Args, Debug)]
#[command(next_help_heading = "Replies")]
struct Replies {
    #[arg(long)]
    msg_greeting: Option<String>,
    #[arg(long)]
    msg_invalid_cmd: Option<String>,
    #[arg(long)]
    msg_quit_cmd: Option<String>,
    #[arg(long)]
    msg_noop_cmd: Option<String>,
    #[arg(long)]
    msg_rset_cmd: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_helo_sequence: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_helo_arg: Option<String>,
    #[arg(long)]
    msg_helo_blacklisted_domain: Option<String>,
    #[arg(long)]
    msg_helo_received: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_mailfrom_sequence: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_mailfrom_arg: Option<String>,
    #[arg(long)]
    msg_mailfrom_blacklisted_email: Option<String>,
    #[arg(long)]
    msg_mailfrom_received: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_rcptto_sequence: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_rcptto_arg: Option<String>,
    #[arg(long)]
    msg_rcptto_not_registered_email: Option<String>,
    #[arg(long)]
    msg_rcptto_blacklisted_email: Option<String>,
    #[arg(long)]
    msg_rcptto_received: Option<String>,
    #[arg(long)]
    msg_invalid_cmd_data_sequence: Option<String>,
    #[arg(long)]
    msg_data_received: Option<String>,
    /// Followed by " <limit> bytes"
    #[arg(long)]
    msg_msg_size_is_too_big: Option<String>,
    #[arg(long)]
    msg_msg_received: Option<String>,
}

/// Artificial reply delays, in milliseconds.
#[derive(clap::Args, Debug)]
#[command(next_help_heading = "Delays (milliseconds)")]
struct Delays {
    #[arg(long, default_value_t = 0)]
    helo_delay: u64,
    #[arg(long, default_value_t = 0)]
    mailfrom_delay: u64,
    #[arg(long, default_value_t = 0)]
    rcptto_delay: u64,
    /// Before the intermediate reply to DATA
    #[arg(long, default_value_t = 0)]
    data_delay: u64,
    /// Before the reply to a complete message body
    #[arg(long, default_value_t = 0)]
    message_delay: u64,
    #[arg(long, default_value_t = 0)]
    noop_delay: u64,
    #[arg(long, default_value_t = 0)]
    rset_delay: u64,
    #[arg(long, default_value_t = 0)]
    quit_delay: u64,
}

impl From<Delays> for ResponseDelays {
    fn from(delays: Delays) -> Self {
        Self {
            helo: Duration::from_millis(delays.helo_delay),
            mailfrom: Duration::from_millis(delays.mailfrom_delay),
            rcptto: Duration::from_millis(delays.rcptto_delay),
            data: Duration::from_millis(delays.data_delay),
            message: Duration::from_millis(delays.message_delay),
            noop: Duration::from_millis(delays.noop_delay),
            rset: Duration::from_millis(delays.rset_delay),
            quit: Duration::from_millis(delays.quit_delay),
        }
    }
}

impl From<Cli> for ConfigurationAttr {
    fn from(cli: Cli) -> Self {
        let Replies {
            msg_greeting,
            msg_invalid_cmd,
            msg_quit_cmd,
            msg_noop_cmd,
            msg_rset_cmd,
            msg_invalid_cmd_helo_sequence,
            msg_invalid_cmd_helo_arg,
            msg_helo_blacklisted_domain,
            msg_helo_received,
            msg_invalid_cmd_mailfrom_sequence,
            msg_invalid_cmd_mailfrom_arg,
            msg_mailfrom_blacklisted_email,
            msg_mailfrom_received,
            msg_invalid_cmd_rcptto_sequence,
            msg_invalid_cmd_rcptto_arg,
            msg_rcptto_not_registered_email,
            msg_rcptto_blacklisted_email,
            msg_rcptto_received,
            msg_invalid_cmd_data_sequence,
            msg_data_received,
            msg_msg_size_is_too_big,
            msg_msg_received,
        } = cli.replies;

        Self {
            host_address: cli.host_address,
            port_number: cli.port_number,
            log_to_stdout: cli.log_to_stdout,
            log_server_activity: cli.log_server_activity,
            is_cmd_fail_fast: cli.fail_fast,
            msg_greeting,
            msg_invalid_cmd,
            msg_quit_cmd,
            msg_noop_cmd,
            msg_rset_cmd,
            msg_invalid_cmd_helo_sequence,
            msg_invalid_cmd_helo_arg,
            msg_helo_blacklisted_domain,
            msg_helo_received,
            msg_invalid_cmd_mailfrom_sequence,
            msg_invalid_cmd_mailfrom_arg,
            msg_mailfrom_blacklisted_email,
            msg_mailfrom_received,
            msg_invalid_cmd_rcptto_sequence,
            msg_invalid_cmd_rcptto_arg,
            msg_rcptto_not_registered_email,
            msg_rcptto_blacklisted_email,
            msg_rcptto_received,
            msg_invalid_cmd_data_sequence,
            msg_data_received,
            msg_msg_size_is_too_big,
            msg_msg_received,
            blacklisted_helo_domains: cli.blacklisted_helo_domains,
            blacklisted_mailfrom_emails: cli.blacklisted_mailfrom_emails,
            blacklisted_rcptto_emails: cli.blacklisted_rcptto_emails,
            not_registered_emails: cli.not_registered_emails,
            msg_size_limit: cli.msg_size_limit,
            session_timeout: cli.session_timeout.map(Duration::from_secs),
            response_delays: cli.delays.into(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new(Cli::parse().into()).context("invalid configuration")?;

    let mut server = Server::start(configuration)
        .await
        .context("failed to start the server")?;
    tracing::info!(port = server.port(), "mock SMTP server started");
    println!("listening on {}", server.local_addr());

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                break;
            }
            Some(message) = server.recv_message() => {
                tracing::info!(
                    helo = message.helo(),
                    mailfrom = message.mailfrom(),
                    rcptto = ?message.rcptto(),
                    bytes = message.data().map_or(0, <[u8]>::len),
                    "session finished",
                );
            }
        }
    }

    server.stop();
    tracing::info!("mock SMTP server stopped");

    Ok(())
}
