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

//! US-ASCII, `CRLF`-terminated text as SMTP puts it on the wire.

use std::{borrow::Cow, fmt::Display};

use ascii::{AsAsciiStr, AsAsciiStrError, AsciiChar, AsciiStr, AsciiString};

pub(crate) mod max_lengths;

pub const CRLF: &str = "\r\n";

/// A string guaranteed for usage with SMTP.
///
/// [RFC 5321](https://www.rfc-editor.org/rfc/rfc5321.html) requires that only US-ASCII character
/// encoding (sections 2.3.1 and 2.4) and `CRLF` line endings (section 2.3.8) are used.
///
/// Methods do not append a trailing line ending sequence. This creates strings, not necessarily
/// full lines. See [`SmtpString::to_line`] for the wire form of a reply.
#[repr(transparent)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Clone, Default)]
pub struct SmtpString {
    str: AsciiString,
}

impl SmtpString {
    /// Creates a new [`Self`] from a string containing ASCII characters and fixes non-[`CRLF`]
    /// line endings.
    ///
    /// Replaces:
    /// - Any [`AsciiChar::CarriageReturn`] not followed by [`AsciiChar::LineFeed`] with [`CRLF`].
    /// - Any [`AsciiChar::LineFeed`] not preceded by [`AsciiChar::CarriageReturn`] with [`CRLF`].
    ///
    /// Does not append a trailing line ending sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the input string contains invalid ASCII.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use smtp_mock::SmtpString;
    /// # use std::error::Error;
    /// #
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// let smtp = SmtpString::new("250-first\n250 second")?;
    ///
    /// assert_eq!(smtp.to_string(), "250-first\r\n250 second");
    /// #     Ok(())
    /// # }
    /// ```
    pub fn new(str: &str) -> Result<Self, AsAsciiStrError> {
        let str = str.as_ascii_str()?;
        let str = self::replace_endings_with_crlf(str).into_owned();

        Ok(Self { str })
    }

    /// Return the contents as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.str.as_str()
    }

    /// Return a reference to the contents as their raw byte representations.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.str.as_bytes()
    }

    /// Return the contents followed by a trailing [`CRLF`], ready to be written to a client.
    #[must_use]
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.str.len() + CRLF.len());
        line.extend_from_slice(self.as_bytes());
        line.extend_from_slice(CRLF.as_bytes());

        line
    }
}

impl Display for SmtpString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.str.fmt(f)
    }
}

impl PartialEq<str> for SmtpString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for SmtpString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Replaces all line endings in the given string with `CRLF`-style endings (`"\r\n"`).
///
/// This will preserve pre-existing `"\r\n"` characters while replacing the following cases:
/// - `'\r'` -> `"\r\n"`
/// - `'\n'` -> `"\r\n"`
/// - `"\n\r"` -> `"\r\n\r\n"`
///
/// If the original string does not need to be modified, this function will not allocate.
fn replace_endings_with_crlf(string: &AsciiStr) -> Cow<AsciiStr> {
    let mut output = Cow::Borrowed(string);
    let mut previous = None;

    #[expect(clippy::iter_skip_zero, reason = "Needed to preserve type integrity")]
    let mut iterator = output.chars().enumerate().skip(0).peekable();

    while let Some((index, character)) = iterator.next() {
        match character {
            // If the previous character is not a carriage return.
            AsciiChar::LineFeed if !matches!(previous, Some(AsciiChar::CarriageReturn)) => {
                // Insert one before this.
                output.to_mut().insert(index, AsciiChar::CarriageReturn);
            }
            // If the next character is not a line feed.
            AsciiChar::CarriageReturn
                if !matches!(iterator.peek(), Some((_, AsciiChar::LineFeed))) =>
            {
                // Insert one after this.
                output.to_mut().insert(index + 1, AsciiChar::LineFeed);
            }
            // Ignore any other characters.
            _ => {
                previous = Some(character);

                continue;
            }
        }

        // Skip over all previous characters *and* the added one.
        // This is needed to update the iterator after changing the string.
        iterator = output.chars().enumerate().skip(index + 2).peekable();
        // The previous character after modifications should always be a line feed.
        previous = Some(AsciiChar::LineFeed);
    }

    output
}
