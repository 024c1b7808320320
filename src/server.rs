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

//! Accepting connections and handing each one to its own session.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle};

use crate::{connection, error::Error, logging, timeouts, Configuration, Message};

/// Accept connections from `listener` forever, spawning a session for each one.
///
/// Every item is either the [`JoinHandle`] of a spawned session, resolving to the [`Message`] it
/// collected, or the error [`TcpListener::accept`] returned. An accept error does not end the
/// stream, but the next accept waits for [`timeouts::ACCEPT_BACKOFF`].
///
/// Sessions share nothing but `configuration`.
pub fn listen(
    listener: TcpListener,
    configuration: Arc<Configuration>,
) -> impl Stream<Item = io::Result<JoinHandle<Result<Message, Error>>>> {
    async_stream::stream! {
        let incoming = connections(|| listener.accept());
        pin_mut!(incoming);

        while let Some(accepted) = incoming.next().await {
            yield accepted.map(|(stream, _)| {
                tokio::spawn(connection::handle(stream, Arc::clone(&configuration)))
            });
        }
    }
}

/// Call `accept` forever, yielding what it returns and backing off after every error.
fn connections<T, F, Fut>(mut accept: F) -> impl Stream<Item = io::Result<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    async_stream::stream! {
        loop {
            match accept().await {
                Ok(accepted) => yield Ok(accepted),
                Err(err) => {
                    yield Err(err);
                    tokio::time::sleep(timeouts::ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// A running mock server.
///
/// Dropping it stops accepting connections, like [`Self::stop`].
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    messages: mpsc::Receiver<Message>,
    accept: JoinHandle<()>,
}

impl Server {
    /// How many finished sessions' [`Message`]s [`Self::start`] keeps until they are received.
    pub const MESSAGE_BACKLOG: usize = 1_024;

    /// Bind [`Configuration::bind_address`] and start accepting connections in the background.
    ///
    /// Installs the stdout subscriber first if [`Configuration::log_to_stdout`] is set.
    ///
    /// At most [`Self::MESSAGE_BACKLOG`] messages wait to be received. While the backlog is full,
    /// the messages of further sessions are dropped, so a caller that never receives them does
    /// not grow the server's memory.
    ///
    /// # Errors
    ///
    /// Any errors that could come out of [`TcpListener::bind`] or [`TcpListener::local_addr`].
    pub async fn start(configuration: Configuration) -> io::Result<Self> {
        Self::start_with_backlog(configuration, Self::MESSAGE_BACKLOG).await
    }

    /// [`Self::start`], keeping at most `backlog` messages instead of [`Self::MESSAGE_BACKLOG`].
    ///
    /// A `backlog` of `0` is treated as `1`.
    ///
    /// # Errors
    ///
    /// Any errors that could come out of [`TcpListener::bind`] or [`TcpListener::local_addr`].
    pub async fn start_with_backlog(
        configuration: Configuration,
        backlog: usize,
    ) -> io::Result<Self> {
        logging::init(&configuration);

        let listener = TcpListener::bind(configuration.bind_address()).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "listening");

        let (sender, messages) = mpsc::channel(backlog.max(1));
        let accept = tokio::spawn(accept(listener, Arc::new(configuration), sender));

        Ok(Self {
            local_addr,
            messages,
            accept,
        })
    }

    /// The address the server actually listens on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The port the server actually listens on. Differs from [`Configuration::port_number`] when
    /// that is `0`.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Wait for the next session to finish and return what it collected.
    ///
    /// Sessions that failed on their transport are skipped. Returns `None` once the server is
    /// stopped and every remaining session is over.
    pub async fn recv_message(&mut self) -> Option<Message> {
        self.messages.recv().await
    }

    /// Return the [`Message`] of a session that already finished, if there is one waiting.
    pub fn try_recv_message(&mut self) -> Option<Message> {
        self.messages.try_recv().ok()
    }

    /// Stop accepting connections. Sessions already running are left to end on their own.
    pub fn stop(&self) {
        self.accept.abort();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run [`listen`], forwarding the [`Message`] of every session that ends cleanly to `sender`.
async fn accept(
    listener: TcpListener,
    configuration: Arc<Configuration>,
    sender: mpsc::Sender<Message>,
) {
    let sessions = listen(listener, configuration);
    pin_mut!(sessions);

    while let Some(session) = sessions.next().await {
        let session = match session {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(%err, "failed to accept connection");
                continue;
            }
        };

        let sender = sender.clone();
        tokio::spawn(async move {
            match session.await {
                Ok(Ok(message)) => forward(&sender, message),
                Ok(Err(err)) => tracing::debug!(%err, "session ended with an error"),
                Err(err) => tracing::error!(%err, "session task failed"),
            }
        });
    }
}

/// Queue `message` for [`Server::recv_message`], or drop it if the backlog is full.
fn forward(sender: &mpsc::Sender<Message>, message: Message) {
    match sender.try_send(message) {
        Ok(()) => (),
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("message backlog is full, dropping the message of a finished session");
        }
        // The server is gone, so nobody receives messages anymore.
        Err(mpsc::error::TrySendError::Closed(_)) => (),
    }
}
