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

//! Rendering of signature headers.
//!
//! The rendering is deterministic: tags appear in the fixed order
//! `v; a; c; d; h; i; l; q; s; t; x; bh; b`, folded at a fixed line width.
//! The same rendering (with an empty b= value) is the input to the data hash,
//! so signer and verifier must produce it byte for byte identically.

use crate::{
    header::FieldName,
    quoted_printable,
    signature::{Identity, Signature, SignatureScheme},
    util::{self, CanonicalStr},
};
use std::{fmt::Write, iter};

// Note: careful with offsets: formatting works with *characters*, not bytes.

pub(crate) const LINE_WIDTH: usize = 78;
const INDENT: &str = "\t";

/// Selects the tags present in the rendering of a signature, in emission
/// order.
fn compute_tag_names(sig: &Signature) -> Vec<&'static str> {
    let mut names = Vec::with_capacity(13);

    if let SignatureScheme::Dkim = sig.scheme {
        names.push("v");
    }
    names.push("a");
    names.push("c");
    names.push("d");
    names.push("h");
    if sig.identity.is_some() {
        names.push("i");
    }
    if sig.body_length.is_some() {
        names.push("l");
    }
    names.push("q");
    names.push("s");
    if sig.timestamp.is_some() {
        names.push("t");
    }
    if sig.expiration.is_some() {
        names.push("x");
    }
    if let SignatureScheme::Dkim = sig.scheme {
        names.push("bh");
    }
    names.push("b");

    names
}

// Ephemeral context holding current formatting options.
#[derive(Clone, Copy)]
struct Fmt {
    last: bool,
}

/// Returns the formatted header value without the b= tag value, and the index
/// where the b= value is to be inserted.
pub(crate) fn format_without_signature(sig: &Signature) -> (String, usize) {
    let tag_names = compute_tag_names(sig);
    let last_index = tag_names.len() - 1;

    // The starting point of cursor `i` is just past header name + ':'.
    let mut output = String::new();
    let mut i = sig.scheme.header_name().len() + 1;
    let mut insertion_i = 0;

    let out = &mut output;
    let i = &mut i;

    for (index, tag_name) in tag_names.into_iter().enumerate() {
        let fmt = Fmt { last: index == last_index };

        match tag_name {
            "v" => format_tag(out, i, fmt, "v", "1"),
            "a" => format_tag(out, i, fmt, "a", sig.algorithm.canonical_str()),
            "c" => format_tag_c(out, i, fmt, sig),
            "d" => format_tag(out, i, fmt, "d", sig.domain.as_ref()),
            "h" => format_tag_h(out, i, fmt, &sig.signed_headers),
            "i" => format_tag_i(out, i, fmt, sig.identity.as_ref().unwrap()),
            "l" => format_tag(out, i, fmt, "l", &sig.body_length.unwrap().to_string()),
            "q" => format_tag(out, i, fmt, "q", sig.scheme.query_protocol()),
            "s" => format_tag(out, i, fmt, "s", sig.selector.as_ref()),
            "t" => format_tag(out, i, fmt, "t", &sig.timestamp.unwrap().to_string()),
            "x" => format_tag(out, i, fmt, "x", &sig.expiration.unwrap().to_string()),
            "bh" => format_tag_bh(out, i, fmt, sig.body_hash.as_deref().unwrap()),
            "b" => format_tag_name_b(out, fmt, i, &mut insertion_i),
            _ => unreachable!(),
        }
    }

    (output, insertion_i)
}

fn format_tag_c(out: &mut String, i: &mut usize, fmt: Fmt, sig: &Signature) {
    let canon = match sig.scheme {
        // DomainKeys applies one algorithm to the whole message
        SignatureScheme::DomainKeys => sig.canonicalization.header.canonical_str().to_owned(),
        SignatureScheme::Dkim => format!(
            "{}/{}",
            sig.canonicalization.header.canonical_str(),
            sig.canonicalization.body.canonical_str()
        ),
    };

    format_tag(out, i, fmt, "c", &canon);
}

fn format_tag_i(out: &mut String, i: &mut usize, fmt: Fmt, identity: &Identity) {
    let identity = match &identity.local_part {
        Some(l) => format!(
            "{}@{}",
            quoted_printable::dqp_encode(l.as_bytes()),
            identity.domain_part
        ),
        None => format!("@{}", identity.domain_part),
    };

    format_tag(out, i, fmt, "i", &identity);
}

fn format_tag(out: &mut String, i: &mut usize, fmt: Fmt, name: &str, value: &str) {
    debug_assert!(name.is_ascii());

    let Fmt { last } = fmt;

    // name + '=' + val [+ ';']
    let taglen = name.len() + value.chars().count() + if last { 1 } else { 2 };

    advance_i_initial(out, i, taglen);
    write!(out, "{name}={value}").unwrap();

    if !last {
        out.push(';');
    }
}

fn format_tag_h(out: &mut String, i: &mut usize, fmt: Fmt, value: &[FieldName]) {
    debug_assert!(!value.is_empty());

    let Fmt { last } = fmt;

    let mut names = value.iter().map(|f| f.as_ref()).peekable();

    let first_name = names.next().unwrap();

    // "h=" + name [+ ';'/':']
    let taglen = first_name.chars().count() + if names.peek().is_none() && last { 2 } else { 3 };

    advance_i_initial(out, i, taglen);
    write!(out, "h={first_name}").unwrap();
    // the ;/: matching the current i is written right away below

    while let Some(name) = names.next() {
        out.push(':');

        // name [+ ';'/':']
        let len = name.chars().count() + if names.peek().is_none() && last { 0 } else { 1 };

        advance_i(out, i, len);
        write!(out, "{name}").unwrap();
    }

    if !last {
        out.push(';');
    }
}

fn format_tag_bh(out: &mut String, i: &mut usize, fmt: Fmt, value: &[u8]) {
    let Fmt { last } = fmt;

    let value = util::encode_base64(value);

    // "bh=" + 1 char (prefer at least one additional char behind =)
    let taglen = 4;

    advance_i_initial(out, i, taglen);
    *i -= 1; // backwards again before the ghost character
    out.push_str("bh=");

    format_chunks_into_string(out, i, &value);

    // if the final chunk makes the line exactly *width* chars long, the final
    // ; is appended nevertheless (giving width + 1; this is fine)
    if !last {
        out.push(';');
        *i += 1;
    }
}

fn format_tag_name_b(out: &mut String, fmt: Fmt, i: &mut usize, insertion_i: &mut usize) {
    debug_assert!(fmt.last);

    // "b=" + 1 char (prefer at least one additional char behind =)
    let taglen = 3;
    advance_i_initial(out, i, taglen);
    *i -= 1; // backwards again before the ghost character
    out.push_str("b=");

    *insertion_i = out.len();
}

/// Advances the cursor `i`, making space for an item of length `len`,
/// inserting line break and indentation if necessary.
fn advance_i(out: &mut String, i: &mut usize, len: usize) {
    if *i + len <= LINE_WIDTH {
        *i += len;
    } else {
        write!(out, "\r\n{INDENT}").unwrap();
        *i = INDENT.len() + len;
    }
}

fn advance_i_initial(out: &mut String, i: &mut usize, len: usize) {
    // + 1 for initial SP
    if *i + len + 1 <= LINE_WIDTH {
        out.push(' ');
        *i += len + 1;
    } else {
        write!(out, "\r\n{INDENT}").unwrap();
        *i = INDENT.len() + len;
    }
}

fn format_chunks_into_string(out: &mut String, i: &mut usize, mut s: &str) {
    let first_chunk_len = LINE_WIDTH.saturating_sub(*i);
    let first_chunk_len = first_chunk_len.min(s.chars().count());

    if first_chunk_len > 0 {
        let c = match s.char_indices().nth(first_chunk_len) {
            Some((c, _)) => c,
            None => s.len(),
        };
        let first_chunk;
        (first_chunk, s) = s.split_at(c);
        out.push_str(first_chunk);
        *i += first_chunk.chars().count();
    }

    let chunk_width = LINE_WIDTH.saturating_sub(INDENT.len()).max(1); // no empty chunks
    let chunks = iter::from_fn(|| {
        if s.is_empty() {
            None
        } else {
            let chunk;
            match s.char_indices().nth(chunk_width) {
                Some((c, _)) => {
                    (chunk, s) = s.split_at(c);
                    Some(chunk)
                }
                None => {
                    (chunk, s) = s.split_at(s.len());
                    Some(chunk)
                }
            }
        }
    });

    for chunk in chunks {
        write!(out, "\r\n{INDENT}{chunk}").unwrap();
        *i = chunk.chars().count() + INDENT.len();
    }
}

/// Inserts the Base64 signature bytes at the insertion index, continuing the
/// folding of the surrounding rendering.
pub(crate) fn insert_signature_data(
    formatted_header: &mut String,
    insertion_index: usize,
    header_name: &str,
    signature_data: &[u8],
) {
    debug_assert!(insertion_index <= formatted_header.len());

    let s = util::encode_base64(signature_data);
    // s contains only ASCII now

    let formatted_header_pre = &formatted_header[..insertion_index];

    let mut it = formatted_header_pre.rsplit("\r\n");
    let last_line = it.next().unwrap();
    let mut len = if it.next().is_some() {
        last_line.chars().count()
    } else {
        header_name.len() + last_line.chars().count() + 1
    };

    let mut result = String::with_capacity(s.len());
    format_chunks_into_string(&mut result, &mut len, &s);

    formatted_header.insert_str(insertion_index, &result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Selector, SignatureAlgorithm,
        DKIM_SIGNATURE_NAME,
    };

    fn sample_signature(scheme: SignatureScheme) -> Signature {
        Signature {
            scheme,
            algorithm: SignatureAlgorithm::RsaSha1,
            signature_data: Box::from(*b"0123456789abcdef0123456789abcdef"),
            body_hash: match scheme {
                SignatureScheme::Dkim => Some(Box::from(*b"0123456789abcdef0123")),
                SignatureScheme::DomainKeys => None,
            },
            canonicalization: Canonicalization {
                header: CanonicalizationAlgorithm::Simple,
                body: CanonicalizationAlgorithm::Simple,
            },
            domain: DomainName::new("example.com").unwrap(),
            signed_headers: [
                FieldName::new("from").unwrap(),
                FieldName::new("to").unwrap(),
                FieldName::new("subject").unwrap(),
                FieldName::new("date").unwrap(),
                FieldName::new("message-id").unwrap(),
            ]
            .into(),
            identity: Some(Identity::new("\"jim r\"@example.com").unwrap()),
            body_length: None,
            selector: Selector::new("sel").unwrap(),
            timestamp: Some(1117574938),
            expiration: Some(1118006938),
        }
    }

    #[test]
    fn format_round_trip() {
        for scheme in [SignatureScheme::Dkim, SignatureScheme::DomainKeys] {
            let sig = sample_signature(scheme);

            let (mut value, insertion_index) = sig.format_without_signature();

            insert_signature_data(
                &mut value,
                insertion_index,
                scheme.header_name(),
                &sig.signature_data,
            );

            let reparsed = Signature::from_header_value(scheme, &value).unwrap();

            assert_eq!(reparsed, sig);
        }
    }

    #[test]
    fn rendering_without_signature_is_prefix_of_final_header() {
        let sig = sample_signature(SignatureScheme::Dkim);

        let (value, insertion_index) = sig.format_without_signature();

        // b= is the last tag, so the hashed rendering is a prefix of the
        // final header value
        assert_eq!(insertion_index, value.len());
        assert!(value.ends_with("b="));
    }

    #[test]
    fn folded_lines_stay_within_width() {
        let sig = sample_signature(SignatureScheme::Dkim);

        let (mut value, insertion_index) = sig.format_without_signature();
        insert_signature_data(
            &mut value,
            insertion_index,
            DKIM_SIGNATURE_NAME,
            &sig.signature_data,
        );

        let full = format!("{DKIM_SIGNATURE_NAME}:{value}");
        for (n, line) in full.split("\r\n").enumerate() {
            // + 1 for a possible trailing ; at exactly the width limit
            assert!(
                line.chars().count() <= LINE_WIDTH + 1,
                "line {n} too long: {line:?}"
            );
        }
    }
}
