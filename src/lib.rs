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

//! A programmable mock SMTP server.
//!
//! Point an SMTP client at a [`Server`] to check how it behaves against a server that answers
//! every command with configurable replies. That includes the failures a real server would
//! produce: blacklisted domains and addresses, unknown recipients, oversized messages, commands
//! out of sequence, and slow replies.
//!
//! ```rust,no_run
//! # use smtp_mock::{Configuration, ConfigurationAttr, Server};
//! # use std::error::Error;
//! #
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn Error>> {
//! let configuration = Configuration::new(ConfigurationAttr {
//!     host_address: Some("127.0.0.1".to_string()),
//!     not_registered_emails: vec!["nobody@example.com".to_string()],
//!     ..Default::default()
//! })?;
//!
//! let mut server = Server::start(configuration).await?;
//! println!("listening on port {}", server.port());
//!
//! // Run the client under test, then look at what it sent.
//! if let Some(message) = server.recv_message().await {
//!     assert_eq!(message.helo(), Some("example.com"));
//! }
//!
//! server.stop();
//! #     Ok(())
//! # }
//! ```

#![warn(clippy::nursery, clippy::pedantic)]
#![cfg_attr(debug_assertions, allow(clippy::missing_errors_doc))]

/// Read one line out of `$reader`, a [`tokio::io::AsyncBufRead`], reading at most `$limit` bytes.
///
/// Produces a future resolving to [`std::io::Result<Vec<u8>>`] holding the raw bytes, line ending
/// included. An empty buffer means the reader is closed. A full buffer without a trailing `LF`
/// means the line is longer than `$limit`; the rest of it is left in the reader.
macro_rules! read_line {
    ($reader:expr, $limit:expr) => {
        async {
            let mut buf = Vec::new();
            let mut capped = tokio::io::AsyncReadExt::take(
                &mut $reader,
                u64::try_from($limit).unwrap_or(u64::MAX),
            );

            tokio::io::AsyncBufReadExt::read_until(&mut capped, b'\n', &mut buf)
                .await
                .map(|_| buf)
        }
    };
}

mod address;
pub mod configuration;
mod connection;
pub mod error;
mod logging;
mod message;
mod server;
mod str;
pub mod timeouts;

pub use configuration::{Configuration, ConfigurationAttr};
pub use connection::{handle, CloseReason, Session, ShouldClose, Stage};
pub use error::{ConfigurationError, Error, Rejection};
pub use message::Message;
pub use server::{listen, Server};
pub use str::SmtpString;
pub use timeouts::ResponseDelays;

#[cfg(test)]
mod test;
