// mailsig – DomainKeys and DKIM signing and verification
// Copyright © 2026 The mailsig developers
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! The `Authentication-Results` header and message re-emission.
//!
//! After verification the message is passed through unchanged except for a
//! single `Authentication-Results` header inserted at the top of the header
//! section. Pre-existing `Authentication-Results` and `DomainKey-Status`
//! headers bearing the verifier's own hostname are stripped, so that an
//! upstream party cannot forge a verdict.

use crate::{
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    signature::SignatureScheme,
    verifier::{Verdict, VerificationResults},
};
use std::io::{self, Write};

/// The address a message claims to originate from: the `Sender` header when
/// present, else `From`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageOrigin {
    Sender(String),
    From(String),
}

impl MessageOrigin {
    pub fn addr(&self) -> &str {
        match self {
            Self::Sender(a) | Self::From(a) => a,
        }
    }

    /// The domain part of the address, empty when there is none.
    pub fn domain(&self) -> &str {
        match self.addr().rsplit_once('@') {
            Some((_, domain)) => domain,
            None => "",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Sender(_) => "sender",
            Self::From(_) => "from",
        }
    }
}

/// Extracts the origin address of a message: `Sender` if present, else
/// `From`.
pub fn message_origin(headers: &HeaderFields) -> Option<MessageOrigin> {
    if let Some(addr) = headers.get("Sender").and_then(|b| extract_addr(b.as_ref())) {
        return Some(MessageOrigin::Sender(addr));
    }

    headers
        .get("From")
        .and_then(|b| extract_addr(b.as_ref()))
        .map(MessageOrigin::From)
}

// Modest addr-spec extraction: the content of the last angle-addr if there is
// one, the trimmed value otherwise.
fn extract_addr(value: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(value);

    let addr = match s.rfind('<') {
        Some(start) => {
            let rest = &s[(start + 1)..];
            let end = rest.find('>')?;
            &rest[..end]
        }
        None => s.as_ref(),
    };

    let addr = addr.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

    if addr.is_empty() {
        None
    } else {
        Some(addr.to_owned())
    }
}

/// The content of one `Authentication-Results` header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthenticationResults {
    hostname: String,
    origin: Option<MessageOrigin>,
    method: &'static str,
    result: Verdict,
    detail: Option<String>,
}

impl AuthenticationResults {
    /// Summarizes a verification into a result header for the given
    /// authserv-id.
    pub fn from_verification(
        hostname: &str,
        headers: &HeaderFields,
        results: &VerificationResults,
    ) -> Self {
        let origin = message_origin(headers);

        let (method, detail) = match results.signature() {
            Some(best) => {
                // the scheme is known from the header name even when the
                // signature value never parsed
                let method = match best.scheme {
                    SignatureScheme::Dkim => "dkim",
                    SignatureScheme::DomainKeys => "domainkeys",
                };
                (method, best.status.error().map(|e| e.to_string()))
            }
            None => ("domainkeys", None),
        };

        Self {
            hostname: hostname.to_owned(),
            origin,
            method,
            result: results.verdict(),
            detail,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn verdict(&self) -> Verdict {
        self.result
    }

    /// Renders the header value (everything after `Authentication-Results:`).
    pub fn header_value(&self) -> String {
        let mut value = self.hostname.clone();

        if let Some(origin) = &self.origin {
            value.push(' ');
            value.push_str(origin.label());
            value.push('=');
            value.push_str(origin.addr());
        }

        value.push_str("; ");
        value.push_str(self.method);
        value.push('=');
        value.push_str(&self.result.to_string());

        if let Some(detail) = &self.detail {
            value.push_str(" (");
            value.push_str(detail);
            value.push(')');
        }

        value
    }

    /// Writes the complete header line, CRLF-terminated.
    pub fn write_header(&self, mut writer: impl Write) -> io::Result<()> {
        writer.write_all(b"Authentication-Results: ")?;
        writer.write_all(self.header_value().as_bytes())?;
        writer.write_all(b"\r\n")
    }

    /// Re-emits a message with this result header on top.
    ///
    /// Header and body are passed through unchanged, except that pre-existing
    /// result headers bearing this verifier's hostname are stripped (their
    /// folded continuation lines go with them).
    pub fn write_message(
        &self,
        mut writer: impl Write,
        headers: &HeaderFields,
        body: &[u8],
    ) -> io::Result<()> {
        self.write_header(&mut writer)?;

        for (name, value) in headers.as_ref() {
            if is_own_results_header(name, value, &self.hostname) {
                continue;
            }
            write_header_field(&mut writer, name, value)?;
        }

        writer.write_all(b"\r\n")?;
        writer.write_all(body)
    }
}

/// Extracts the authserv-id from an `Authentication-Results` header value.
pub fn extract_authserv_id(value: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(value);

    let s = s.split(';').next()?;

    let id = s
        .trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .split(|c: char| c.is_ascii_whitespace())
        .next()?;

    if id.is_empty() {
        None
    } else {
        Some(id.to_owned())
    }
}

/// Whether a header is a result header carrying the given hostname.
pub fn is_own_results_header(name: &FieldName, value: &FieldBody, hostname: &str) -> bool {
    if *name == "Authentication-Results" {
        return matches!(extract_authserv_id(value.as_ref()),
            Some(id) if id.eq_ignore_ascii_case(hostname));
    }

    if *name == "DomainKey-Status" {
        let value = String::from_utf8_lossy(value.as_ref()).to_ascii_lowercase();
        return value.contains(&hostname.to_ascii_lowercase());
    }

    false
}

/// Re-emits a message with the given headers (typically freshly produced
/// signature headers) prepended, altering nothing else.
pub fn write_message(
    mut writer: impl Write,
    prepended: &[HeaderField],
    headers: &HeaderFields,
    body: &[u8],
) -> io::Result<()> {
    for (name, value) in prepended {
        write_header_field(&mut writer, name, value)?;
    }

    for (name, value) in headers.as_ref() {
        write_header_field(&mut writer, name, value)?;
    }

    writer.write_all(b"\r\n")?;
    writer.write_all(body)
}

fn write_header_field(
    writer: &mut impl Write,
    name: &FieldName,
    value: &FieldBody,
) -> io::Result<()> {
    writer.write_all(name.as_ref().as_bytes())?;
    writer.write_all(b":")?;
    writer.write_all(value.as_ref())?;
    writer.write_all(b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_origin_prefers_sender() {
        let headers: HeaderFields =
            "From: Jim <jim@example.com>\nSender: rockford@agency.example.com"
                .parse()
                .unwrap();

        let origin = message_origin(&headers).unwrap();

        assert_eq!(
            origin,
            MessageOrigin::Sender("rockford@agency.example.com".to_owned())
        );
        assert_eq!(origin.domain(), "agency.example.com");
        assert_eq!(origin.label(), "sender");
    }

    #[test]
    fn message_origin_angle_addr() {
        let headers: HeaderFields = "From: \"J. Rockford\" <jim@example.com>".parse().unwrap();

        let origin = message_origin(&headers).unwrap();

        assert_eq!(origin, MessageOrigin::From("jim@example.com".to_owned()));
    }

    #[test]
    fn extract_authserv_id_ok() {
        assert_eq!(
            extract_authserv_id(b" mx.example.com; dkim=pass"),
            Some("mx.example.com".to_owned())
        );
        assert_eq!(
            extract_authserv_id(b" mx.example.com 1; none"),
            Some("mx.example.com".to_owned())
        );
        assert_eq!(extract_authserv_id(b"  "), None);
    }

    #[test]
    fn strip_own_headers_on_reemission() {
        let headers: HeaderFields = "\
Authentication-Results: mx.example.com; dkim=pass
Authentication-Results: other.example.net;
\tdkim=fail
DomainKey-Status: good (mx.example.com)
From: jim@example.com
Subject: hello"
            .parse()
            .unwrap();

        let auth = AuthenticationResults {
            hostname: "mx.example.com".to_owned(),
            origin: message_origin(&headers),
            method: "domainkeys",
            result: Verdict::None,
            detail: None,
        };

        let mut out = vec![];
        auth.write_message(&mut out, &headers, b"body\r\n").unwrap();

        let out = String::from_utf8(out).unwrap();

        assert_eq!(
            out,
            "Authentication-Results: mx.example.com from=jim@example.com; domainkeys=none\r\n\
             Authentication-Results: other.example.net;\r\n\tdkim=fail\r\n\
             From: jim@example.com\r\n\
             Subject: hello\r\n\
             \r\n\
             body\r\n"
        );
    }

    #[test]
    fn header_value_with_detail() {
        let auth = AuthenticationResults {
            hostname: "mx.example.com".to_owned(),
            origin: Some(MessageOrigin::Sender("jim@example.com".to_owned())),
            method: "dkim",
            result: Verdict::Invalid,
            detail: Some("no key".to_owned()),
        };

        assert_eq!(
            auth.header_value(),
            "mx.example.com sender=jim@example.com; dkim=invalid (no key)"
        );
    }
}
