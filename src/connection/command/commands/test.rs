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

//! Tests for [`super`], calling one handler at a time on a session placed at a given stage.

use std::sync::Arc;

use tokio_test::io::{Builder, Mock};

use super::*;
use crate::ConfigurationAttr;

type Result = std::result::Result<(), Error>;

const RECEIVED: &[u8] = b"250 Received\r\n";
const READY: &[u8] = b"354 Ready for receive message. End data with <CR><LF>.<CR><LF>\r\n";
const QUIT: &[u8] = b"221 Closing connection\r\n";
const BAD_SEQUENCE: &[u8] = b"503 Bad sequence of commands\r\n";
const NOT_REGISTERED: &[u8] = b"550 User not found\r\n";

fn session(mock: Mock, attr: ConfigurationAttr, stage: Stage) -> Session<Mock> {
    let configuration = Configuration::new(attr).expect("configuration should be valid");

    let mut session = Session::new(mock, Arc::new(configuration));
    session.stage = stage;
    session
}

#[tokio::test]
async fn test_noop() -> Result {
    let mock = Builder::new()
        .write(RECEIVED)
        .write(RECEIVED)
        .write(RECEIVED)
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    for expected in 1..=3 {
        assert_eq!(session.handle_line("NOOP\r\n").await?, ShouldClose::Keep);
        assert_eq!(session.message().noop_count(), expected);
        assert_eq!(session.stage(), Stage::Init);
    }

    Ok(())
}

#[tokio::test]
async fn test_malformed_requests_are_ignored() -> Result {
    // Any write would fail the test, since nothing is scripted.
    let mock = Builder::new().build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    for line in [
        "NOOP \r\n",
        " NOOP\r\n",
        "NOOP now\r\n",
        "RSET \r\n",
        "QUIT please\r\n",
        "DATA \r\n",
        "HELO  example.com\r\n",
        "HELO example.com \r\n",
        "HELO\texample.com\r\n",
        "MAIL  FROM:<a@example.com>\r\n",
        "MAIL TO:<a@example.com>\r\n",
        "RCPT FROM:<a@example.com>\r\n",
        "RCPT TO:<a@example.com> \r\n",
    ] {
        assert_eq!(session.handle_line(line).await?, ShouldClose::Keep, "{line:?}");
    }

    assert_eq!(session.stage(), Stage::Init);
    assert_eq!(session.message(), &crate::Message::default());

    Ok(())
}

#[tokio::test]
async fn test_helo() -> Result {
    let mock = Builder::new().write(RECEIVED).write(BAD_SEQUENCE).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    assert_eq!(
        session.handle_line("helo example.com\r\n").await?,
        ShouldClose::Keep
    );
    assert_eq!(session.stage(), Stage::HeloDone);
    assert_eq!(session.message().helo(), Some("example.com"));

    // HELO is accepted only once.
    assert_eq!(
        session.handle_line("EHLO other.example\r\n").await?,
        ShouldClose::Keep
    );
    assert_eq!(session.stage(), Stage::HeloDone);
    assert_eq!(session.message().helo(), Some("example.com"));
    assert_eq!(session.message().helo_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_ehlo_address_literal() -> Result {
    let mock = Builder::new().write(RECEIVED).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    session.handle_line("EHLO [127.0.0.1]\r\n").await?;
    assert_eq!(session.message().helo(), Some("[127.0.0.1]"));

    Ok(())
}

#[tokio::test]
async fn test_helo_invalid_argument() -> Result {
    let mock = Builder::new()
        .write(b"501 HELO requires domain address\r\n")
        .write(b"501 HELO requires domain address\r\n")
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    for line in ["HELO\r\n", "HELO not_a_domain\r\n"] {
        assert_eq!(session.handle_line(line).await?, ShouldClose::Keep);
    }

    assert_eq!(session.stage(), Stage::Init);
    assert_eq!(session.message().helo(), None);
    assert_eq!(session.message().helo_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_helo_blacklisted() -> Result {
    let mock = Builder::new().write(QUIT).build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            blacklisted_helo_domains: vec!["spam.example".to_string()],
            ..Default::default()
        },
        Stage::Init,
    );

    assert_eq!(
        session.handle_line("HELO spam.example\r\n").await?,
        ShouldClose::Close(CloseReason::Rejected(Rejection::Blacklisted))
    );
    assert_eq!(session.stage(), Stage::Init);
    assert_eq!(session.message().helo(), None);

    Ok(())
}

#[tokio::test]
async fn test_mailfrom() -> Result {
    let mock = Builder::new().write(RECEIVED).write(BAD_SEQUENCE).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::HeloDone);

    assert_eq!(
        session.handle_line("mail from: <a@example.com>\r\n").await?,
        ShouldClose::Keep
    );
    assert_eq!(session.stage(), Stage::MailfromDone);
    assert_eq!(session.message().mailfrom(), Some("a@example.com"));

    session.handle_line("MAIL FROM:<b@example.com>\r\n").await?;
    assert_eq!(session.message().mailfrom(), Some("a@example.com"));
    assert_eq!(session.message().mailfrom_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_mailfrom_sequence() -> Result {
    let mock = Builder::new().write(BAD_SEQUENCE).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::Init);

    // The sequence is checked before the argument.
    assert_eq!(
        session.handle_line("MAIL FROM:nonsense\r\n").await?,
        ShouldClose::Keep
    );
    assert_eq!(session.stage(), Stage::Init);

    Ok(())
}

#[tokio::test]
async fn test_mailfrom_invalid_argument() -> Result {
    const INVALID: &[u8] = b"501 MAIL FROM requires valid email address\r\n";

    let mock = Builder::new()
        .write(INVALID)
        .write(INVALID)
        .write(INVALID)
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::HeloDone);

    for line in [
        "MAIL\r\n",
        "MAIL FROM:a@example.com\r\n",
        "MAIL FROM:<not an address>\r\n",
    ] {
        assert_eq!(session.handle_line(line).await?, ShouldClose::Keep);
    }

    assert_eq!(session.stage(), Stage::HeloDone);
    assert_eq!(session.message().mailfrom(), None);

    Ok(())
}

#[tokio::test]
async fn test_mailfrom_blacklisted() -> Result {
    let mock = Builder::new().write(b"550 Go away\r\n").build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            blacklisted_mailfrom_emails: vec!["spammer@example.com".to_string()],
            msg_mailfrom_blacklisted_email: Some("550 Go away".to_string()),
            ..Default::default()
        },
        Stage::HeloDone,
    );

    assert_eq!(
        session
            .handle_line("MAIL FROM:<spammer@example.com>\r\n")
            .await?,
        ShouldClose::Close(CloseReason::Rejected(Rejection::Blacklisted))
    );
    assert_eq!(session.message().mailfrom(), None);

    Ok(())
}

#[tokio::test]
async fn test_rcptto_is_repeatable() -> Result {
    let mock = Builder::new().write(RECEIVED).write(RECEIVED).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::MailfromDone);

    session.handle_line("RCPT TO:<a@example.com>\r\n").await?;
    assert_eq!(session.stage(), Stage::RcpttoDone);
    session.handle_line("rcpt to:<b@example.com>\r\n").await?;
    assert_eq!(session.stage(), Stage::RcpttoDone);

    assert_eq!(session.message().rcptto(), ["a@example.com", "b@example.com"]);
    assert_eq!(session.message().rcptto_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_rcptto_sequence() -> Result {
    let mock = Builder::new().write(BAD_SEQUENCE).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::HeloDone);

    session.handle_line("RCPT TO:<a@example.com>\r\n").await?;
    assert_eq!(session.stage(), Stage::HeloDone);
    assert!(session.message().rcptto().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rcptto_not_registered() -> Result {
    let mock = Builder::new()
        .write(NOT_REGISTERED)
        .write(NOT_REGISTERED)
        .build();

    // Not even fail-fast ends the session over an unknown recipient.
    let mut session = session(
        mock,
        ConfigurationAttr {
            not_registered_emails: vec!["nobody@example.com".to_string()],
            is_cmd_fail_fast: true,
            ..Default::default()
        },
        Stage::MailfromDone,
    );

    for _ in 0..2 {
        assert_eq!(
            session.handle_line("RCPT TO:<nobody@example.com>\r\n").await?,
            ShouldClose::Keep
        );
    }

    assert_eq!(session.stage(), Stage::MailfromDone);
    assert!(session.message().rcptto().is_empty());
    assert_eq!(session.message().rcptto_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_rcptto_blacklisted() -> Result {
    let mock = Builder::new().write(QUIT).build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            blacklisted_rcptto_emails: vec!["victim@example.com".to_string()],
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(
        session.handle_line("RCPT TO:<victim@example.com>\r\n").await?,
        ShouldClose::Close(CloseReason::Rejected(Rejection::Blacklisted))
    );

    Ok(())
}

#[tokio::test]
async fn test_data() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"Subject: hi\r\n\r\n..leading dot\r\nhello\n.\r\n")
        .write(RECEIVED)
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::RcpttoDone);

    assert_eq!(session.handle_line("DATA\r\n").await?, ShouldClose::Keep);
    assert_eq!(session.stage(), Stage::DataDone);
    assert_eq!(
        session.message().data_str(),
        Some("Subject: hi\r\n\r\n.leading dot\r\nhello\n")
    );
    assert_eq!(session.message().data_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_data_sequence() -> Result {
    let mock = Builder::new().write(BAD_SEQUENCE).write(BAD_SEQUENCE).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::MailfromDone);

    // Without a recipient, the body is never read.
    session.handle_line("DATA\r\n").await?;
    assert_eq!(session.stage(), Stage::MailfromDone);

    session.stage = Stage::DataDone;
    session.handle_line("DATA\r\n").await?;
    assert_eq!(session.message().data(), None);

    Ok(())
}

#[tokio::test]
async fn test_data_size_exceeded() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"0123456789\r\n")
        .read(b"more than allowed\r\n.\r\n")
        .write(b"552 Message exceeded max size of 16 bytes\r\n")
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(16),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(session.handle_line("DATA\r\n").await?, ShouldClose::Keep);
    assert_eq!(session.stage(), Stage::RcpttoDone);
    assert_eq!(session.message().data(), None);

    Ok(())
}

#[tokio::test]
async fn test_data_size_limit_is_inclusive() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"0123456789\r\n.\r\n")
        .write(RECEIVED)
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(12),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    session.handle_line("DATA\r\n").await?;
    assert_eq!(session.message().data_str(), Some("0123456789\r\n"));

    Ok(())
}

#[tokio::test]
async fn test_data_limit_counts_raw_bytes() -> Result {
    // Two bytes that are not UTF-8, plus `CRLF`: exactly the limit.
    let mock = Builder::new()
        .write(READY)
        .read(b"\xE9\xE9\r\n.\r\n")
        .write(RECEIVED)
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(4),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(session.handle_line("DATA\r\n").await?, ShouldClose::Keep);
    assert_eq!(session.stage(), Stage::DataDone);
    assert_eq!(session.message().data(), Some(&b"\xE9\xE9\r\n"[..]));
    assert_eq!(session.message().data_str(), None);

    Ok(())
}

#[tokio::test]
async fn test_data_stuffed_line_at_limit() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"..abc\r\n.\r\n")
        .write(RECEIVED)
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(6),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    session.handle_line("DATA\r\n").await?;
    assert_eq!(session.message().data_str(), Some(".abc\r\n"));

    Ok(())
}

#[tokio::test]
async fn test_data_unterminated_line_over_limit() -> Result {
    // The line is drained in pieces, never buffered whole.
    let mock = Builder::new()
        .write(READY)
        .read(&[b'x'; 4_096])
        .read(&[b'y'; 4_096])
        .read(b"\r\n.\r\n")
        .write(b"552 Message exceeded max size of 8 bytes\r\n")
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(8),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(session.handle_line("DATA\r\n").await?, ShouldClose::Keep);
    assert_eq!(session.stage(), Stage::RcpttoDone);
    assert_eq!(session.message().data(), None);

    Ok(())
}

#[tokio::test]
async fn test_data_unterminated_line_then_closed() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(&[b'x'; 4_096])
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(8),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(
        session.handle_line("DATA\r\n").await?,
        ShouldClose::Close(CloseReason::ClosedByClient)
    );

    Ok(())
}

#[tokio::test]
async fn test_data_size_exceeded_fail_fast() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"far too long\r\n.\r\n")
        .write(b"552 Too big 4 bytes\r\n")
        .build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_size_limit: Some(4),
            msg_msg_size_is_too_big: Some("552 Too big".to_string()),
            is_cmd_fail_fast: true,
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(
        session.handle_line("DATA\r\n").await?,
        ShouldClose::Close(CloseReason::Rejected(Rejection::SizeExceeded))
    );

    Ok(())
}

#[tokio::test]
async fn test_data_closed_mid_body() -> Result {
    let mock = Builder::new()
        .write(READY)
        .read(b"the client hangs up\r\n")
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::RcpttoDone);

    assert_eq!(
        session.handle_line("DATA\r\n").await?,
        ShouldClose::Close(CloseReason::ClosedByClient)
    );
    assert_eq!(session.message().data(), None);

    Ok(())
}

#[tokio::test]
async fn test_rset() -> Result {
    let mock = Builder::new().write(b"250 Reset\r\n").build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_rset_cmd: Some("250 Reset".to_string()),
            ..Default::default()
        },
        Stage::RcpttoDone,
    );

    assert_eq!(session.handle_line("RSET\r\n").await?, ShouldClose::Keep);
    assert_eq!(session.stage(), Stage::RcpttoDone);
    assert_eq!(session.message().rset_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_quit() -> Result {
    let mock = Builder::new().write(QUIT).build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::MailfromDone);

    assert_eq!(
        session.handle_line("quit\r\n").await?,
        ShouldClose::Close(CloseReason::Quit)
    );
    assert_eq!(session.message().quit_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unrecognized() -> Result {
    const INVALID: &[u8] = b"502 Command unrecognized. Available commands: HELO, EHLO, MAIL \
                             FROM:, RCPT TO:, DATA, NOOP, RSET, QUIT\r\n";

    let mock = Builder::new()
        .write(INVALID)
        .write(INVALID)
        .write(INVALID)
        .build();
    let mut session = session(mock, ConfigurationAttr::default(), Stage::HeloDone);

    for line in ["VRFY a@example.com\r\n", "MAILFROM:<a@example.com>\r\n", "\r\n"] {
        assert_eq!(session.handle_line(line).await?, ShouldClose::Keep);
    }
    assert_eq!(session.stage(), Stage::HeloDone);

    Ok(())
}

#[tokio::test]
async fn test_unrecognized_fail_fast() -> Result {
    let mock = Builder::new().write(b"500 No\r\n").build();
    let mut session = session(
        mock,
        ConfigurationAttr {
            msg_invalid_cmd: Some("500 No".to_string()),
            is_cmd_fail_fast: true,
            ..Default::default()
        },
        Stage::Init,
    );

    assert_eq!(
        session.handle_line("STARTTLS\r\n").await?,
        ShouldClose::Close(CloseReason::Rejected(Rejection::UnknownCommand))
    );

    Ok(())
}
