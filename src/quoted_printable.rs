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

//! The restricted quoted-printable encoding used in tag values, for identity
//! local parts and key record notes.

use crate::parse::{is_hexdig, is_wsp, strip_fws, strip_suffix};
use std::{fmt::Write, str};

// no surrounding or repeated FWS allowed (guaranteed by the tag-value grammar)
pub fn dqp_decode(mut s: &str) -> Result<Vec<u8>, &'static str> {
    if s.is_empty() {
        return Ok(vec![]);
    }

    enum State { Fws, Char }

    let mut state = State::Fws;
    let mut result = Vec::with_capacity(s.len());

    loop {
        match state {
            State::Fws => {
                if let Some(snext) = s.strip_prefix('=') {
                    let (snextq, x) = parse_hex_octet(snext).ok_or("invalid hex octet")?;

                    result.push(x);

                    s = snextq;

                    state = State::Char;
                } else if let Some(snext) = s.strip_prefix(is_dqp_char) {
                    let x = strip_suffix(s, snext);
                    result.extend(x.as_bytes());
                    s = snext;
                    state = State::Char;
                } else {
                    break;
                }
            }
            State::Char => {
                if let Some(snext) = s.strip_prefix('=') {
                    let (snextq, x) = parse_hex_octet(snext).ok_or("invalid hex octet")?;

                    result.push(x);

                    s = snextq;
                } else if let Some(snext) = s.strip_prefix(is_dqp_char) {
                    let x = strip_suffix(s, snext);
                    result.extend(x.as_bytes());
                    s = snext;
                } else if let Some(snext) = strip_fws(s) {
                    s = snext;
                    state = State::Fws;
                } else {
                    break;
                }
            }
        }
    }

    Ok(result)
}

// qp-section := [*(ptext / SPACE / TAB) ptext]
// ptext := hex-octet / safe-char     [= is_dqp_char]
pub fn parse_qp_section(s: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(s.len());

    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '=' {
            let c1 = chars.next().filter(|&c| is_hexdig(c))?;
            let c2 = chars.next().filter(|&c| is_hexdig(c))?;
            let digs = [u8::try_from(c1).unwrap(), u8::try_from(c2).unwrap()];
            let digs = str::from_utf8(&digs).unwrap();
            let b = u8::from_str_radix(digs, 16).ok()?;
            result.push(b);
        } else if is_dqp_char(c) || is_wsp(c) {
            result.push(u8::try_from(c).ok()?);
        } else {
            return None;
        }
    }

    Some(result)
}

fn parse_hex_octet(s: &str) -> Option<(&str, u8)> {
    fn parse_hexdig(s: &str) -> Option<(&str, u8)> {
        let s = strip_fws(s).unwrap_or(s);
        let snext = s.strip_prefix(is_hexdig)?;
        let b = s.as_bytes()[0];
        Some((snext, b))
    }

    let (s, u1) = parse_hexdig(s)?;
    let (s, u2) = parse_hexdig(s)?;

    let digs = [u1, u2];
    let digs = str::from_utf8(&digs).unwrap();
    let b = u8::from_str_radix(digs, 16).ok()?;

    Some((s, b))
}

pub fn dqp_encode(mut bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());

    while !bytes.is_empty() {
        match bstr::decode_utf8(bytes) {
            (Some(c), len) if c.is_ascii() && is_dqp_char(c) => {
                result.push(c);
                bytes = &bytes[len..];
            }
            _ => {
                // Whitespace, control bytes, ;, = and non-ASCII need encoding.
                write!(result, "={:02X}", bytes[0]).unwrap();
                bytes = &bytes[1..];
            }
        }
    }

    result
}

pub fn is_dqp_char(c: char) -> bool {
    // printable ASCII without ; and = plus any non-ASCII UTF-8 sequence
    matches!(c, '!'..=':' | '<' | '>'..='~') || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BStr;

    #[test]
    fn parse_qp_section_ok() {
        let example = "wha ief o=92fj";
        assert_eq!(parse_qp_section(example), Some(b"wha ief o\x92fj".to_vec()));
    }

    #[test]
    fn dqp_decode_ok() {
        let example = "=20v=20 =3     D=20=FF1=\r\n\t3B=0D=0A=09a=3Drsa-sha1=3B=20s=3Dbrisbane=3B";
        assert_eq!(
            BStr::new(&dqp_decode(&example[..]).unwrap()),
            BStr::new(&b" v = \xff1;\r\n\ta=rsa-sha1; s=brisbane;"[..])
        );
    }

    #[test]
    fn dqp_encode_round_trip() {
        let example = b"jim.rockford=detective";
        let encoded = dqp_encode(example);
        assert_eq!(encoded, "jim.rockford=3Ddetective");
        assert_eq!(dqp_decode(&encoded).unwrap(), example);
    }
}
