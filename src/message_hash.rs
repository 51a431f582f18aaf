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

//! Streaming computation of the message hashes.
//!
//! One message may carry several signatures, each with its own
//! canonicalization, hash algorithm, and declared body length. The body
//! hasher fans every body chunk out to at most one canonicalizer per
//! algorithm and to one counting hasher per distinct requirement, so the body
//! is traversed once and never buffered.
//!
//! A DKIM body hash depends only on `(length, hash, canonicalization)` and is
//! shared between signatures that agree on those. The single-stream
//! DomainKeys hash additionally covers the per-signature canonical header
//! bytes, which are digested as an uncounted prefix, so its registration is
//! keyed to one signature.

use crate::{
    canonicalize::{self, BodyCanonicalizer},
    crypto::{self, CountingHasher, HashAlgorithm, HashStatus, InsufficientInput},
    header::HeaderFields,
    signature::{CanonicalizationAlgorithm, Signature},
};
use std::collections::HashMap;

/// Produces the canonical header stream covered by a signature: the selected
/// headers, each terminated CRLF, followed by the signature header itself
/// rendered with an empty b= value and no trailing CRLF.
///
/// For DKIM this stream is the input to the data hash; for DomainKeys it is
/// the first section of the single hashed stream, with the canonical body
/// following directly (the header/body separator line is never hashed).
pub fn compute_header_stream(headers: &HeaderFields, sig: &Signature) -> Vec<u8> {
    let canon_alg = sig.canonicalization.header;

    let mut stream = canonicalize::canonicalize_headers(canon_alg, headers, &sig.signed_headers);

    let (formatted_value, _) = sig.format_without_signature();

    canonicalize::canonicalize_header(
        &mut stream,
        canon_alg,
        sig.scheme.header_name(),
        formatted_value.as_bytes(),
    );

    stream
}

/// Produces the data hash of a DKIM signature: the digest of the canonical
/// header stream.
pub fn compute_data_hash(headers: &HeaderFields, sig: &Signature) -> Box<[u8]> {
    let stream = compute_header_stream(headers, sig);
    crypto::digest_slices(sig.algorithm.hash_algorithm(), [stream])
}

/// The owner of a body hash registration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HasherScope {
    /// A plain body hash, shared between all signatures with the same
    /// requirement.
    Shared,
    /// A hash bound to the signature at the given header index, because it
    /// also covers that signature's header bytes.
    Task(usize),
}

pub type BodyHasherKey = (
    HasherScope,
    Option<usize>,
    HashAlgorithm,
    CanonicalizationAlgorithm,
);

/// Returns the shared body hash requirement of a DKIM signature.
pub fn body_hasher_key(sig: &Signature) -> BodyHasherKey {
    let body_len = sig
        .body_length
        .map(|len| len.try_into().unwrap_or(usize::MAX));
    let hash_alg = sig.algorithm.hash_algorithm();
    let canon_kind = sig.canonicalization.body;
    (HasherScope::Shared, body_len, hash_alg, canon_kind)
}

/// Returns the per-signature requirement of a DomainKeys signature.
pub fn single_stream_hasher_key(sig: &Signature, index: usize) -> BodyHasherKey {
    let (_, body_len, hash_alg, canon_kind) = body_hasher_key(sig);
    (HasherScope::Task(index), body_len, hash_alg, canon_kind)
}

/// The stance of the body hasher with regard to additional body content.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BodyHasherStance {
    /// More input is welcome, some hasher has not reached its limit.
    Interested,
    /// Every hasher has what it needs; remaining input may be skipped.
    Done,
}

pub struct BodyHasherBuilder {
    registrations: HashMap<BodyHasherKey, Option<Vec<u8>>>,
}

impl BodyHasherBuilder {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Registers a body hash requirement, optionally with uncounted prefix
    /// bytes digested before any body content.
    pub fn register(&mut self, key: BodyHasherKey, prefix: Option<Vec<u8>>) {
        self.registrations.entry(key).or_insert(prefix);
    }

    pub fn build(self) -> BodyHasher {
        let hashers = self
            .registrations
            .into_iter()
            .map(|(key @ (_, len, alg, _), prefix)| {
                let mut hasher = CountingHasher::new(alg, len);
                if let Some(prefix) = prefix {
                    hasher.update_prefix(&prefix);
                }
                (key, hasher)
            })
            .collect();

        BodyHasher {
            hashers,
            canonicalizer_simple: BodyCanonicalizer::simple(),
            canonicalizer_relaxed: BodyCanonicalizer::relaxed(),
            canonicalizer_nowsp: BodyCanonicalizer::nowsp(),
        }
    }
}

impl Default for BodyHasherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A producer of body hash results.
///
/// Canonicalizes and hashes chunks of the message body, until all registered
/// requirements can be answered.
pub struct BodyHasher {
    hashers: HashMap<BodyHasherKey, CountingHasher>,
    canonicalizer_simple: BodyCanonicalizer,
    canonicalizer_relaxed: BodyCanonicalizer,
    canonicalizer_nowsp: BodyCanonicalizer,
}

impl BodyHasher {
    pub fn hash_chunk(&mut self, chunk: &[u8]) -> BodyHasherStance {
        let mut canonicalized_chunk_simple = None;
        let mut canonicalized_chunk_relaxed = None;
        let mut canonicalized_chunk_nowsp = None;

        let mut all_done = true;

        let active_hashers = self.hashers.iter_mut().filter(|(_, hasher)| !hasher.is_done());

        for ((_, _, _, canon), hasher) in active_hashers {
            let canonicalized_chunk = match canon {
                CanonicalizationAlgorithm::Simple => canonicalized_chunk_simple
                    .get_or_insert_with(|| self.canonicalizer_simple.canon_chunk(chunk)),
                CanonicalizationAlgorithm::Relaxed => canonicalized_chunk_relaxed
                    .get_or_insert_with(|| self.canonicalizer_relaxed.canon_chunk(chunk)),
                CanonicalizationAlgorithm::Nowsp => canonicalized_chunk_nowsp
                    .get_or_insert_with(|| self.canonicalizer_nowsp.canon_chunk(chunk)),
            };

            match hasher.update(canonicalized_chunk) {
                HashStatus::AllConsumed => {
                    if !hasher.is_done() {
                        all_done = false;
                    }
                }
                HashStatus::Truncated => {}
            }
        }

        if all_done {
            BodyHasherStance::Done
        } else {
            BodyHasherStance::Interested
        }
    }

    pub fn finish(self) -> BodyHasherResults {
        let mut finish_canonicalization_simple =
            Some(|| self.canonicalizer_simple.finish_canon());
        let mut finish_canonicalization_relaxed =
            Some(|| self.canonicalizer_relaxed.finish_canon());
        let mut finish_canonicalization_nowsp = Some(|| self.canonicalizer_nowsp.finish_canon());
        let mut canonicalized_chunk_simple = None;
        let mut canonicalized_chunk_relaxed = None;
        let mut canonicalized_chunk_nowsp = None;

        let mut results = HashMap::new();

        for (key @ (_, _, _, canon), mut hasher) in self.hashers {
            if !hasher.is_done() {
                let canonicalized_chunk = match canon {
                    CanonicalizationAlgorithm::Simple => {
                        match finish_canonicalization_simple.take() {
                            Some(f) => canonicalized_chunk_simple.insert(f()),
                            None => canonicalized_chunk_simple.as_ref().unwrap(),
                        }
                    }
                    CanonicalizationAlgorithm::Relaxed => {
                        match finish_canonicalization_relaxed.take() {
                            Some(f) => canonicalized_chunk_relaxed.insert(f()),
                            None => canonicalized_chunk_relaxed.as_ref().unwrap(),
                        }
                    }
                    CanonicalizationAlgorithm::Nowsp => {
                        match finish_canonicalization_nowsp.take() {
                            Some(f) => canonicalized_chunk_nowsp.insert(f()),
                            None => canonicalized_chunk_nowsp.as_ref().unwrap(),
                        }
                    }
                };

                let _ = hasher.update(canonicalized_chunk);
            }

            let res = hasher.finish();

            results.insert(key, res);
        }

        BodyHasherResults { results }
    }
}

pub struct BodyHasherResults {
    results: HashMap<BodyHasherKey, Result<(Box<[u8]>, usize), InsufficientInput>>,
}

impl BodyHasherResults {
    pub fn get(&self, key: &BodyHasherKey) -> Option<&Result<(Box<[u8]>, usize), InsufficientInput>> {
        self.results.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::digest_slices,
        header::FieldName,
        signature::{DomainName, Selector, SignatureAlgorithm, SignatureScheme},
    };
    use base64ct::{Base64, Encoding};
    use bstr::BStr;

    #[test]
    fn header_stream_covers_rendered_signature_header() {
        let headers: HeaderFields = "From: me <me@example.com>\nTo: you\nSubject: hi"
            .parse()
            .unwrap();

        let sig = Signature {
            scheme: SignatureScheme::Dkim,
            algorithm: SignatureAlgorithm::RsaSha1,
            signature_data: Box::default(),
            body_hash: Some(Box::from(*b"01234567890123456789")),
            canonicalization: Default::default(),
            domain: DomainName::new("example.com").unwrap(),
            signed_headers: [
                FieldName::new("from").unwrap(),
                FieldName::new("subject").unwrap(),
            ]
            .into(),
            identity: None,
            body_length: None,
            selector: Selector::new("sel").unwrap(),
            timestamp: None,
            expiration: None,
        };

        let stream = compute_header_stream(&headers, &sig);
        let stream = BStr::new(&stream);

        let prefix = "From: me <me@example.com>\r\nSubject: hi\r\nDKIM-Signature:";
        assert!(
            stream.starts_with(prefix.as_bytes()),
            "unexpected stream start: {stream:?}"
        );
        // rendered with empty b= value, no trailing CRLF
        assert!(stream.ends_with(b"b="));
    }

    fn key_simple() -> BodyHasherKey {
        (
            HasherScope::Shared,
            None,
            HashAlgorithm::Sha256,
            CanonicalizationAlgorithm::Simple,
        )
    }

    fn limited_key_simple(n: usize) -> BodyHasherKey {
        (
            HasherScope::Shared,
            Some(n),
            HashAlgorithm::Sha256,
            CanonicalizationAlgorithm::Simple,
        )
    }

    fn key_relaxed() -> BodyHasherKey {
        (
            HasherScope::Shared,
            None,
            HashAlgorithm::Sha256,
            CanonicalizationAlgorithm::Relaxed,
        )
    }

    #[test]
    fn body_hasher_shared_canonicalizers() {
        let key1 = key_simple();
        let key2 = key_relaxed();

        let mut builder = BodyHasherBuilder::new();
        builder.register(key1, None);
        builder.register(key2, None);
        let mut hasher = builder.build();

        assert_eq!(hasher.hash_chunk(b"abc \r\n"), BodyHasherStance::Interested);

        let results = hasher.finish();

        let res1 = results.get(&key1).unwrap();
        assert_eq!(res1.as_ref().unwrap().1, 6);
        let res2 = results.get(&key2).unwrap();
        assert_eq!(res2.as_ref().unwrap().1, 5);
    }

    #[test]
    fn body_hasher_hash_with_length() {
        let key1 = limited_key_simple(27);

        let mut builder = BodyHasherBuilder::new();
        builder.register(key1, None);
        let mut hasher = builder.build();

        assert_eq!(
            hasher.hash_chunk(b"well  hello \r\n"),
            BodyHasherStance::Interested
        );
        assert_eq!(
            hasher.hash_chunk(b"\r\n what agi \r"),
            BodyHasherStance::Interested
        );
        assert_eq!(hasher.hash_chunk(b"\n\r\n"), BodyHasherStance::Done);

        let results = hasher.finish();

        let res1 = results.get(&key1).unwrap();
        assert_eq!(
            res1.as_ref().unwrap().0,
            digest_slices(HashAlgorithm::Sha256, [b"well  hello \r\n\r\n what agi \r"])
        );
    }

    #[test]
    fn body_hasher_insufficient_input() {
        let key1 = limited_key_simple(100);

        let mut builder = BodyHasherBuilder::new();
        builder.register(key1, None);
        let mut hasher = builder.build();

        let _ = hasher.hash_chunk(b"too short\r\n");

        let results = hasher.finish();

        assert_eq!(results.get(&key1).unwrap(), &Err(InsufficientInput));
    }

    #[test]
    fn body_hasher_task_scoped_prefix() {
        let shared = key_simple();
        let task = (
            HasherScope::Task(3),
            None,
            HashAlgorithm::Sha256,
            CanonicalizationAlgorithm::Simple,
        );

        let mut builder = BodyHasherBuilder::new();
        builder.register(shared, None);
        builder.register(task, Some(b"from:me\r\n".to_vec()));
        let mut hasher = builder.build();

        let _ = hasher.hash_chunk(b"body\r\n");

        let results = hasher.finish();

        assert_eq!(
            results.get(&shared).unwrap().as_ref().unwrap().0,
            digest_slices(HashAlgorithm::Sha256, [b"body\r\n"])
        );
        assert_eq!(
            results.get(&task).unwrap().as_ref().unwrap().0,
            digest_slices(HashAlgorithm::Sha256, [&b"from:me\r\n"[..], &b"body\r\n"[..]])
        );
    }

    #[test]
    fn body_hasher_known_hash_sample() {
        let key1 = key_relaxed();

        let mut builder = BodyHasherBuilder::new();
        builder.register(key1, None);
        let mut hasher = builder.build();

        let body = "Hello Proff,

Let’s try this again, with line
breaks and empty lines even.

Ciao, und bis bald


--
David
"
        .replace('\n', "\r\n");

        assert_eq!(
            hasher.hash_chunk(body.as_bytes()),
            BodyHasherStance::Interested
        );

        let results = hasher.finish();

        let res1 = results.get(&key1).unwrap();
        assert_eq!(
            Base64::encode_string(&res1.as_ref().unwrap().0),
            "RMSbeRTj/zCxWeWQXpEIbiqxH0Jqg5eYs4ORzOt3MT0="
        );
    }
}
