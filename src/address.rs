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

//! Shape checks for the arguments of `HELO`, `MAIL FROM:` and `RCPT TO:`.
//!
//! These are deliberately narrower than the full RFC 5321 grammar: quoted local-parts, source
//! routes and ESMTP parameters are all rejected, so a client under test only passes when it sends
//! the plain form.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::str::max_lengths;

/// Characters allowed in a dot-atom local-part besides ASCII alphanumerics.
///
/// [RFC 5322 § 3.2.3](https://www.rfc-editor.org/rfc/rfc5322.html#section-3.2.3) `atext`.
const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

/// Whether `domain` is acceptable as the argument of `HELO`/`EHLO`.
///
/// Accepts `localhost`, a dotted domain name ending in an alphabetic top-level label, or an
/// address literal (`1.2.3.4`, `[1.2.3.4]` or `[IPv6:...]`).
#[must_use]
pub fn is_valid_helo_domain(domain: &str) -> bool {
    domain.eq_ignore_ascii_case("localhost") || is_address_literal(domain) || is_domain(domain)
}

/// Extract the mailbox from a path of the form `<local@domain>`.
///
/// Returns `None` if the brackets are missing or the mailbox inside them is not valid.
#[must_use]
pub fn parse_path(path: &str) -> Option<&str> {
    if path.len() > max_lengths::PATH {
        return None;
    }

    let mailbox = path.strip_prefix('<')?.strip_suffix('>')?;

    is_valid_mailbox(mailbox).then_some(mailbox)
}

/// Whether `mailbox` is a plain `local@domain` address.
#[must_use]
pub fn is_valid_mailbox(mailbox: &str) -> bool {
    let Some((local, domain)) = mailbox.rsplit_once('@') else {
        return false;
    };

    is_local_part(local)
        && (domain.eq_ignore_ascii_case("localhost")
            || is_address_literal(domain)
            || is_domain(domain))
}

/// A dot-atom local-part, at most [`max_lengths::LOCAL_PART`] bytes long.
fn is_local_part(local: &str) -> bool {
    !local.is_empty()
        && local.len() <= max_lengths::LOCAL_PART
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c))
        })
}

/// A dotted domain name of at least two labels whose last label is alphabetic.
fn is_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > max_lengths::DOMAIN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();

    let Some(top_level) = labels.last() else {
        return false;
    };

    labels.len() >= 2
        && labels.iter().all(|label| is_label(label))
        && top_level.len() >= 2
        && top_level.chars().all(|c| c.is_ascii_alphabetic())
}

/// A single LDH label: alphanumerics and hyphens, not starting or ending with a hyphen.
fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= max_lengths::LABEL
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// An IPv4 address, bare or bracketed, or a bracketed `IPv6:` literal.
///
/// [RFC 5321 § 4.1.3](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.3).
fn is_address_literal(literal: &str) -> bool {
    let inner = literal
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'));

    match inner {
        Some(inner) => match inner.get(..5) {
            Some(tag) if tag.eq_ignore_ascii_case("IPv6:") => {
                inner[5..].parse::<Ipv6Addr>().is_ok()
            }
            _ => inner.parse::<Ipv4Addr>().is_ok(),
        },
        None => literal.parse::<Ipv4Addr>().is_ok(),
    }
}
