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

//! Streaming, line-oriented parsing of a message into header fields and body.
//!
//! [`MessageParser`] accepts the raw message bytes in chunks of arbitrary
//! size. It splits off the header section (unfolding continuation lines,
//! accepting bare LF line terminators and normalizing them to CR LF), detects
//! the empty line that separates header from body, and hands the body bytes
//! back to the caller untouched.

use crate::header::{FieldBody, FieldName, HeaderField, HeaderFields};
use std::fmt::{self, Display, Formatter};

/// An error describing structurally impossible message input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// A continuation line appeared before any header line.
    UnexpectedContinuationLine,
    /// A header line without a colon, or with an ill-formed name or body.
    InvalidHeaderField,
    /// The message contained no header fields at all.
    NoHeaderFields,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedContinuationLine => {
                write!(f, "continuation line without a preceding header line")
            }
            Self::InvalidHeaderField => write!(f, "invalid header field"),
            Self::NoHeaderFields => write!(f, "no header fields in message"),
        }
    }
}

impl std::error::Error for ParseError {}

enum Phase {
    Headers,
    Body,
}

/// A push parser splitting a message byte stream into headers and body.
///
/// Feed input with [`feed`][MessageParser::feed]; while the parser is in the
/// header section it consumes the bytes and returns `None`. The chunk that
/// contains the end of the header section (and every chunk thereafter) has its
/// body portion returned as a subslice, which the caller forwards to a
/// [`Verifier`][crate::verifier::Verifier] or
/// [`Signer`][crate::signer::Signer]. After end-of-input, call
/// [`finish`][MessageParser::finish] to obtain the accumulated header fields.
pub struct MessageParser {
    phase: Phase,
    line: Vec<u8>,
    current: Option<(FieldName, Vec<u8>)>,
    headers: Vec<HeaderField>,
}

impl MessageParser {
    pub fn new() -> Self {
        Self {
            phase: Phase::Headers,
            line: Vec::new(),
            current: None,
            headers: Vec::new(),
        }
    }

    /// Returns true once the end of the header section has been seen.
    pub fn in_body(&self) -> bool {
        matches!(self.phase, Phase::Body)
    }

    /// Processes a chunk of message input.
    ///
    /// Returns the trailing subslice of `chunk` that belongs to the message
    /// body, or `None` while the parser is still inside the header section.
    pub fn feed<'a>(&mut self, chunk: &'a [u8]) -> Result<Option<&'a [u8]>, ParseError> {
        if let Phase::Body = self.phase {
            return Ok(Some(chunk));
        }

        let mut rest = chunk;

        // Header lines are terminated by LF; a preceding CR is stripped, so
        // both CR LF and bare LF input arrive at the same header bytes.
        while let Some(i) = rest.iter().position(|&b| b == b'\n') {
            let (line_part, tail) = rest.split_at(i);
            rest = &tail[1..];

            self.line.extend_from_slice(line_part);
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }

            let line = std::mem::take(&mut self.line);

            if line.is_empty() {
                // end of headers
                self.flush_current()?;
                self.phase = Phase::Body;
                return Ok(Some(rest));
            }

            self.header_line(line)?;
        }

        self.line.extend_from_slice(rest);
        Ok(None)
    }

    fn header_line(&mut self, line: Vec<u8>) -> Result<(), ParseError> {
        if matches!(line.first(), Some(b' ') | Some(b'\t')) {
            // folded continuation of the previous header line
            let (_, value) = self
                .current
                .as_mut()
                .ok_or(ParseError::UnexpectedContinuationLine)?;
            value.extend_from_slice(b"\r\n");
            value.extend_from_slice(&line);
            return Ok(());
        }

        self.flush_current()?;

        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(ParseError::InvalidHeaderField)?;

        let name = std::str::from_utf8(&line[..colon]).map_err(|_| ParseError::InvalidHeaderField)?;
        let name = FieldName::new(name).map_err(|_| ParseError::InvalidHeaderField)?;

        self.current = Some((name, line[(colon + 1)..].to_vec()));

        Ok(())
    }

    fn flush_current(&mut self) -> Result<(), ParseError> {
        if let Some((name, value)) = self.current.take() {
            let body = FieldBody::new(value).map_err(|_| ParseError::InvalidHeaderField)?;
            self.headers.push((name, body));
        }
        Ok(())
    }

    /// Completes parsing and returns the header fields.
    ///
    /// May be called as soon as the header/body boundary has been seen, or at
    /// end-of-input for a message without a body.
    pub fn finish(mut self) -> Result<HeaderFields, ParseError> {
        if let Phase::Headers = self.phase {
            // message ended inside the header section: accept a final
            // unterminated line, then close the section
            if !self.line.is_empty() {
                if self.line.last() == Some(&b'\r') {
                    self.line.pop();
                }
                let line = std::mem::take(&mut self.line);
                self.header_line(line)?;
            }
            self.flush_current()?;
        }

        HeaderFields::new(self.headers).map_err(|_| ParseError::NoHeaderFields)
    }
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all<'a>(parser: &mut MessageParser, chunks: &[&'a [u8]]) -> Vec<u8> {
        let mut body = vec![];
        for chunk in chunks {
            if let Some(b) = parser.feed(chunk).unwrap() {
                body.extend_from_slice(b);
            }
        }
        body
    }

    #[test]
    fn split_message_ok() {
        let mut parser = MessageParser::new();

        let body = feed_all(
            &mut parser,
            &[b"From: me\r\nTo: you,\r\n\t him\r\n", b"\r\nbody\r\nmore\r\n"],
        );

        assert_eq!(body, b"body\r\nmore\r\n");

        let headers = parser.finish().unwrap();
        assert_eq!(headers.as_ref().len(), 2);
        assert_eq!(headers.get("To").unwrap().as_ref(), b" you,\r\n\t him");
    }

    #[test]
    fn boundary_straddles_chunks() {
        let mut parser = MessageParser::new();

        let body = feed_all(
            &mut parser,
            &[b"A: 1\r", b"\n\r", b"\nbo", b"dy"],
        );

        assert_eq!(body, b"body");
        assert!(parser.in_body());
    }

    #[test]
    fn bare_lf_normalized() {
        let mut parser = MessageParser::new();

        let _ = parser.feed(b"A: 1\nB: long\n\tvalue\n\n").unwrap();

        let headers = parser.finish().unwrap();
        assert_eq!(headers.get("B").unwrap().as_ref(), b" long\r\n\tvalue");
    }

    #[test]
    fn message_without_body() {
        let mut parser = MessageParser::new();

        assert_eq!(parser.feed(b"A: 1\r\nB: 2"), Ok(None));

        let headers = parser.finish().unwrap();
        assert_eq!(headers.as_ref().len(), 2);
        assert_eq!(headers.get("B").unwrap().as_ref(), b" 2");
    }

    #[test]
    fn leading_continuation_line_rejected() {
        let mut parser = MessageParser::new();

        assert_eq!(
            parser.feed(b" folded: no\r\n"),
            Err(ParseError::UnexpectedContinuationLine)
        );
    }

    #[test]
    fn header_line_without_colon_rejected() {
        let mut parser = MessageParser::new();

        assert_eq!(
            parser.feed(b"this is not a header\r\n"),
            Err(ParseError::InvalidHeaderField)
        );
    }
}
