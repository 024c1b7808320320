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

//! Loopback tests of [`crate::listen`] and [`crate::Server`] with real TCP clients.

use std::{error::Error, net::SocketAddr, sync::Arc};

use futures_util::{pin_mut, StreamExt};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{ReadHalf, WriteHalf},
        TcpListener, TcpStream,
    },
};

use crate::{Configuration, ConfigurationAttr, Message, Server};


type Result<T = ()> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

/// Write `$line` into `$writer`, followed by `CRLF`.
///
/// Implicitly calls `.await`.
macro_rules! write_line {
    ($writer:expr, $line:expr) => {
        $writer.write_all(format!("{}\r\n", $line).as_bytes()).await
    };
}

/// Read one reply line out of `$reader`, an [`AsyncBufRead`](tokio::io::AsyncBufRead), as a
/// string with its line ending. An empty string means the server closed the connection.
///
/// Implicitly calls `.await`.
macro_rules! read_reply {
    ($reader:expr) => {{
        let mut line = String::new();
        $reader.read_line(&mut line).await.map(|_| line)
    }};
}

/// A server on a free loopback port.
async fn loopback(attr: ConfigurationAttr) -> Result<Server> {
    let configuration = Configuration::new(ConfigurationAttr {
        host_address: Some("127.0.0.1".to_string()),
        ..attr
    })?;

    Ok(Server::start(configuration).await?)
}

/// Send `line` and return the reply line.
async fn exchange(
    reader: &mut BufReader<ReadHalf<'_>>,
    writer: &mut WriteHalf<'_>,
    line: &str,
) -> Result<String> {
    write_line!(writer, line)?;

    Ok(read_reply!(reader)?)
}

/// Run a complete, successful mail transaction against `addr`.
async fn send_mail(addr: SocketAddr, from: &str, to: &[&str], body: &str) -> Result {
    let mut stream = TcpStream::connect(addr).await?;
    let (read_stream, mut write_stream) = stream.split();
    let mut reader = BufReader::new(read_stream);

    assert!(is_valid_response::server_greeting(
        &read_reply!(reader)?
    ));

    let reply = exchange(&mut reader, &mut write_stream, "EHLO client.example").await?;
    assert!(is_valid_response::completed(&reply));

    let reply = exchange(&mut reader, &mut write_stream, &format!("MAIL FROM:<{from}>")).await?;
    assert!(is_valid_response::completed(&reply));

    for to in to {
        let reply = exchange(&mut reader, &mut write_stream, &format!("RCPT TO:<{to}>")).await?;
        assert!(is_valid_response::completed(&reply));
    }

    let reply = exchange(&mut reader, &mut write_stream, "DATA").await?;
    assert!(is_valid_response::start_mail_input(&reply));

    write_stream.write_all(body.as_bytes()).await?;
    let reply = exchange(&mut reader, &mut write_stream, ".").await?;
    assert!(is_valid_response::completed(&reply));

    let reply = exchange(&mut reader, &mut write_stream, "QUIT").await?;
    assert!(is_valid_response::quit(&reply));

    // The server closes its side after `QUIT`.
    assert_eq!(read_reply!(reader)?, "");

    Ok(())
}

#[tokio::test]
async fn test_listen() -> Result {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let configuration = Arc::new(Configuration::new(ConfigurationAttr::default())?);

    let sessions = crate::listen(listener, configuration);
    let server = tokio::spawn(async move {
        pin_mut!(sessions);

        let session = sessions.next().await.ok_or("the stream never ends")??;
        let message: Message = session.await??;

        Ok::<_, Box<dyn Error + Send + Sync>>(message)
    });

    send_mail(
        addr,
        "sender@example.com",
        &["rcpt@example.com"],
        "Subject: test\r\n\r\nhello\r\n",
    )
    .await?;

    let message = server.await??;
    assert_eq!(message.helo(), Some("client.example"));
    assert_eq!(message.mailfrom(), Some("sender@example.com"));
    assert_eq!(message.rcptto(), ["rcpt@example.com"]);
    assert_eq!(message.data_str(), Some("Subject: test\r\n\r\nhello\r\n"));

    Ok(())
}

#[tokio::test]
async fn test_server_collects_messages() -> Result {
    let mut server = loopback(ConfigurationAttr::default()).await?;
    let addr = server.local_addr();
    assert_ne!(server.port(), 0);
    assert!(server.try_recv_message().is_none());

    send_mail(addr, "a@example.com", &["b@example.com", "c@example.com"], "one\r\n").await?;
    send_mail(addr, "d@example.com", &["e@example.com"], "two\r\n").await?;

    let first = server.recv_message().await.ok_or("no first message")?;
    let second = server.recv_message().await.ok_or("no second message")?;

    // Sessions finish independently, so the order is not guaranteed.
    let (first, second) = if first.mailfrom() == Some("a@example.com") {
        (first, second)
    } else {
        (second, first)
    };

    assert_eq!(first.rcptto(), ["b@example.com", "c@example.com"]);
    assert_eq!(first.data_str(), Some("one\r\n"));
    assert_eq!(second.mailfrom(), Some("d@example.com"));
    assert_eq!(second.data_str(), Some("two\r\n"));

    Ok(())
}

#[tokio::test]
async fn test_server_interleaved_sessions() -> Result {
    let mut server = loopback(ConfigurationAttr::default()).await?;

    let mut first = TcpStream::connect(server.local_addr()).await?;
    let mut second = TcpStream::connect(server.local_addr()).await?;
    let (first_read, mut first_write) = first.split();
    let (second_read, mut second_write) = second.split();
    let mut first_reader = BufReader::new(first_read);
    let mut second_reader = BufReader::new(second_read);

    assert!(is_valid_response::server_greeting(
        &read_reply!(first_reader)?
    ));
    assert!(is_valid_response::server_greeting(
        &read_reply!(second_reader)?
    ));

    // Each session keeps its own stage.
    let reply = exchange(&mut first_reader, &mut first_write, "HELO first.example").await?;
    assert!(is_valid_response::completed(&reply));
    let reply = exchange(&mut second_reader, &mut second_write, "MAIL FROM:<a@b.example>").await?;
    assert!(is_valid_response::reply(&reply, 503));
    let reply = exchange(&mut second_reader, &mut second_write, "HELO second.example").await?;
    assert!(is_valid_response::completed(&reply));

    let reply = exchange(&mut first_reader, &mut first_write, "QUIT").await?;
    assert!(is_valid_response::quit(&reply));
    let message = server.recv_message().await.ok_or("no first message")?;
    assert_eq!(message.helo(), Some("first.example"));

    let reply = exchange(&mut second_reader, &mut second_write, "QUIT").await?;
    assert!(is_valid_response::quit(&reply));
    let message = server.recv_message().await.ok_or("no second message")?;
    assert_eq!(message.helo(), Some("second.example"));
    assert_eq!(message.mailfrom_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_server_blacklist_closes_connection() -> Result {
    let mut server = loopback(ConfigurationAttr {
        blacklisted_mailfrom_emails: vec!["spammer@example.com".to_string()],
        ..Default::default()
    })
    .await?;

    let mut stream = TcpStream::connect(server.local_addr()).await?;
    let (read_stream, mut write_stream) = stream.split();
    let mut reader = BufReader::new(read_stream);

    read_reply!(reader)?;
    exchange(&mut reader, &mut write_stream, "HELO example.com").await?;

    let reply = exchange(&mut reader, &mut write_stream, "MAIL FROM:<spammer@example.com>").await?;
    assert!(is_valid_response::quit(&reply));
    assert_eq!(read_reply!(reader)?, "");

    let message = server.recv_message().await.ok_or("no message")?;
    assert_eq!(message.mailfrom(), None);
    assert_eq!(message.mailfrom_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_server_stop() -> Result {
    let mut server = loopback(ConfigurationAttr::default()).await?;
    let addr = server.local_addr();

    server.stop();

    // The channel only closes once the accept loop, and with it the listener, is gone.
    assert!(server.recv_message().await.is_none());
    assert!(TcpStream::connect(addr).await.is_err());

    Ok(())
}
