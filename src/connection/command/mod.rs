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

//! Parses a request line into a [`Command`] and checks its shape.
//!
//! See [`parse`].

use std::ops::Range;

use ascii::{AsAsciiStr, AsAsciiStrError, AsciiStr, AsciiString};

use crate::address;

pub(crate) mod commands;

/// The verbs the server routes to a handler.
///
/// The set is fixed by the protocol, so it is matched by token instead of being open to extension.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Verb {
    Helo,
    Ehlo,
    /// `MAIL FROM:`.
    Mail,
    /// `RCPT TO:`.
    Rcpt,
    Data,
    Noop,
    Rset,
    Quit,
    /// Anything else, including an empty request.
    Unknown,
}

impl Verb {
    const TOKENS: [(&'static str, Self); 8] = [
        ("HELO", Self::Helo),
        ("EHLO", Self::Ehlo),
        ("MAIL", Self::Mail),
        ("RCPT", Self::Rcpt),
        ("DATA", Self::Data),
        ("NOOP", Self::Noop),
        ("RSET", Self::Rset),
        ("QUIT", Self::Quit),
    ];

    /// Look up a verb token, ignoring case.
    fn from_token(token: &AsciiStr) -> Self {
        Self::TOKENS
            .iter()
            .find(|(name, _)| token.as_str().eq_ignore_ascii_case(name))
            .map_or(Self::Unknown, |&(_, verb)| verb)
    }

    /// The keyword that must follow the verb, if any.
    const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Mail => Some(" FROM:"),
            Self::Rcpt => Some(" TO:"),
            _ => None,
        }
    }
}

/// Parse a line read from a client as a command.
///
/// Only the trailing line ending is removed. Any other whitespace is kept, because it decides
/// whether a request is well-shaped.
///
/// # Errors
///
/// [`AsAsciiStrError`] if the line contains anything other than US-ASCII. Such a line cannot be
/// a known command.
pub fn parse(line: &str) -> Result<Command, AsAsciiStrError> {
    let request = line
        .strip_suffix('\n')
        .map_or(line, |line| line.strip_suffix('\r').unwrap_or(line));
    let request = request.as_ascii_str()?.to_ascii_string();

    let str = request.as_str();
    // The index of the first byte that isn't whitespace.
    let start = str
        .find(|c: char| !c.is_ascii_whitespace())
        .unwrap_or(str.len());
    // The index after the last byte of the first token.
    let end = str[start..]
        .find(|c: char| c.is_ascii_whitespace())
        .map_or(str.len(), |len| start + len);

    let verb = start..end;
    let kind = Verb::from_token(&request[verb.clone()]);

    Ok(Command {
        request,
        verb,
        kind,
    })
}

/// One request from an SMTP client.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Command {
    /// The entire request, unmodified except for its line ending being removed.
    request: AsciiString,
    /// The range over [`Self::request`] containing the verb token.
    verb: Range<usize>,
    /// What [`Self::verb`] names.
    kind: Verb,
}

impl Command {
    /// Get the entire request as a string slice.
    pub fn request(&self) -> &str {
        self.request.as_str()
    }

    /// Get the [`Verb`] the request was routed by.
    pub const fn verb(&self) -> Verb {
        self.kind
    }

    /// Get everything after the verb token.
    fn rest(&self) -> &str {
        &self.request()[self.verb.end..]
    }

    /// Whether the request is a malformed instance of its own verb.
    ///
    /// Such a request is dropped by its handler without any reply or mutation:
    ///
    /// - `DATA`, `NOOP`, `RSET` and `QUIT` must be the bare verb.
    /// - `HELO`/`EHLO` must have no surrounding whitespace and separate the argument by exactly
    ///   one space.
    /// - `MAIL`/`RCPT` must have no surrounding whitespace and be followed by ` FROM:`/` TO:`, or
    ///   by nothing at all.
    ///
    /// An unknown verb is never malformed; it gets the invalid command reply instead.
    pub fn is_invalid_request(&self) -> bool {
        let request = self.request();
        let surrounded_by_whitespace = request.trim() != request;

        match self.kind {
            Verb::Data | Verb::Noop | Verb::Rset | Verb::Quit => {
                self.verb != (0..self.request.len())
            }
            Verb::Helo | Verb::Ehlo => {
                surrounded_by_whitespace
                    || !(self.rest().is_empty()
                        || self
                            .rest()
                            .strip_prefix(' ')
                            .is_some_and(|argument| !argument.starts_with(char::is_whitespace)))
            }
            Verb::Mail | Verb::Rcpt => {
                surrounded_by_whitespace
                    || !(self.rest().is_empty() || self.keyword_argument().is_some())
            }
            Verb::Unknown => false,
        }
    }

    /// Get the domain of a `HELO`/`EHLO` request, if it is a valid one.
    pub fn helo_domain(&self) -> Option<&str> {
        let domain = self.rest().strip_prefix(' ')?;

        address::is_valid_helo_domain(domain).then_some(domain)
    }

    /// Get the mailbox of a `MAIL FROM:<...>`/`RCPT TO:<...>` request, if it is a valid one.
    ///
    /// A single space is allowed between the keyword and the path.
    pub fn mailbox(&self) -> Option<&str> {
        let path = self.keyword_argument()?;
        let path = path.strip_prefix(' ').unwrap_or(path);

        address::parse_path(path)
    }

    /// Get whatever follows the keyword of [`Verb::Mail`] or [`Verb::Rcpt`].
    ///
    /// Returns `None` for other verbs or if the keyword is missing.
    fn keyword_argument(&self) -> Option<&str> {
        let keyword = self.kind.keyword()?;
        let rest = self.rest();

        rest.get(..keyword.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
            .map(|_| &rest[keyword.len()..])
    }
}
