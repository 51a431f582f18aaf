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

//! Verifier and supporting types.

mod header;
mod lookup;
mod query;
mod verify;

pub use lookup::LookupTxt;

use crate::{
    crypto::InsufficientInput,
    header::HeaderFields,
    message_hash::{
        self, body_hasher_key, single_stream_hasher_key, BodyHasher, BodyHasherBuilder,
        BodyHasherKey, BodyHasherResults, BodyHasherStance,
    },
    record::KeyRecordError,
    signature::{Signature, SignatureError, SignatureScheme},
    verifier::{header::VerifyStatus, query::Queries},
};
use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};
use tracing::trace;

/// Verifier configuration.
pub struct Config {
    /// Timeout for a single key record lookup.
    pub lookup_timeout: Duration,
    /// At most this many signature headers are processed per message.
    pub max_signatures: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(10),
            max_signatures: 20,
        }
    }
}

/// An error that causes a signature to be rejected or to fail.
#[derive(Clone, Debug, PartialEq)]
pub enum VerifierError {
    SignatureFormat(SignatureError),
    SignatureExpired,
    Overflow,
    NoKey,
    KeyLookup,
    KeyLookupTimeout,
    InvalidKeyDomain,
    KeyRecordFormat(KeyRecordError),
    WrongKeyType,
    DisallowedHashAlgorithm,
    DisallowedServiceType,
    GranularityMismatch,
    DomainMismatch,
    BodyHashMismatch,
    InsufficientBodyLength,
    VerificationFailure,
    CryptoError(Box<str>),
}

impl VerifierError {
    /// True for errors where the cryptographic check itself failed (the
    /// signature is *bad*), as opposed to the signature being unusable.
    fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::BodyHashMismatch
                | Self::InsufficientBodyLength
                | Self::VerificationFailure
                | Self::CryptoError(_)
        )
    }
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureFormat(error) => error.kind.fmt(f),
            Self::SignatureExpired => write!(f, "signature expired"),
            Self::Overflow => write!(f, "integer too large"),
            Self::NoKey => write!(f, "no key"),
            Self::KeyLookup => write!(f, "no key (lookup failed)"),
            Self::KeyLookupTimeout => write!(f, "no key (lookup timed out)"),
            Self::InvalidKeyDomain => write!(f, "no key (invalid query name)"),
            Self::KeyRecordFormat(error) => error.fmt(f),
            Self::WrongKeyType => write!(f, "unsupported key type"),
            Self::DisallowedHashAlgorithm => write!(f, "hash algorithm not allowed by key"),
            Self::DisallowedServiceType => write!(f, "service type not allowed by key"),
            Self::GranularityMismatch => write!(f, "identity not allowed by key granularity"),
            Self::DomainMismatch => write!(f, "domain mismatch"),
            Self::BodyHashMismatch => write!(f, "body has been altered"),
            Self::InsufficientBodyLength => write!(f, "body shorter than declared length"),
            Self::VerificationFailure => write!(f, "signature does not verify"),
            Self::CryptoError(e) => write!(f, "crypto error: {e}"),
        }
    }
}

/// The verdict on one signature, or collated over a whole message.
///
/// Ordered worst to best: a message with one passing and one failing
/// signature passes overall.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Verdict {
    /// No signature headers were present at all.
    None,
    /// Signature headers existed but none were usable.
    Invalid,
    /// A usable signature did not verify.
    Fail,
    /// A signature verified.
    Pass,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Invalid => write!(f, "invalid"),
            Self::Fail => write!(f, "fail"),
            Self::Pass => write!(f, "pass"),
        }
    }
}

/// The result of verifying one signature.
#[derive(Debug, PartialEq)]
pub enum VerificationStatus {
    /// The signature verified.
    Pass,
    /// The signature was usable but did not verify.
    Fail(VerifierError),
    /// The signature could not be used.
    Invalid(VerifierError),
}

impl VerificationStatus {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Pass => Verdict::Pass,
            Self::Fail(_) => Verdict::Fail,
            Self::Invalid(_) => Verdict::Invalid,
        }
    }

    pub fn error(&self) -> Option<&VerifierError> {
        match self {
            Self::Pass => None,
            Self::Fail(e) | Self::Invalid(e) => Some(e),
        }
    }

    fn from_error(error: VerifierError) -> Self {
        if error.is_failure() {
            Self::Fail(error)
        } else {
            Self::Invalid(error)
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct VerificationResult {
    /// Index of the signature header in the message header.
    pub index: usize,
    /// The scheme of the signature header, known from the header name even
    /// when its value did not parse.
    pub scheme: SignatureScheme,
    /// The parsed signature record, where parsing got that far.
    pub signature: Option<Signature>,
    pub status: VerificationStatus,
    /// Whether the key record declares testing mode (t=y).
    pub testing: bool,
    /// Size in bits of the retrieved public key.
    pub key_size: Option<usize>,
}

/// The per-signature results of one message, with the collated verdict.
#[derive(Debug, Default, PartialEq)]
pub struct VerificationResults {
    results: Vec<VerificationResult>,
}

impl VerificationResults {
    /// The overall verdict: the best result across all signatures, or
    /// [`Verdict::None`] when no signature headers were present.
    pub fn verdict(&self) -> Verdict {
        self.results
            .iter()
            .map(|r| r.status.verdict())
            .max()
            .unwrap_or(Verdict::None)
    }

    /// Returns the result whose verdict is best, ties broken by order of
    /// appearance in the message.
    pub fn signature(&self) -> Option<&VerificationResult> {
        let best = self.verdict();
        self.results.iter().find(|r| r.status.verdict() == best)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl AsRef<[VerificationResult]> for VerificationResults {
    fn as_ref(&self) -> &[VerificationResult] {
        &self.results
    }
}

impl IntoIterator for VerificationResults {
    type Item = VerificationResult;
    type IntoIter = std::vec::IntoIter<VerificationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

struct SigTask {
    index: usize,
    scheme: SignatureScheme,
    signature: Option<Signature>,
    status: VerifyStatus,
    testing: bool,
    key_size: Option<usize>,
}

/// A verifier checking all signatures in a message.
///
/// The verifier proceeds in three stages:
///
/// 1. [`process_headers`][Verifier::process_headers] parses the signature
///    headers, fetches the public keys, and performs every check that does
///    not depend on the body;
/// 2. [`body_chunk`][Verifier::body_chunk] canonicalizes and hashes body
///    content as it arrives;
/// 3. [`finish`][Verifier::finish] closes the hashes and collates the
///    per-signature results.
pub struct Verifier {
    tasks: Vec<SigTask>,
    body_hasher: BodyHasher,
}

impl Verifier {
    /// Processes the message header and prepares for the body phase.
    ///
    /// All key record lookups are resolved before this returns, so the body
    /// phase is purely computational.
    pub async fn process_headers<T>(resolver: &T, headers: &HeaderFields, config: &Config) -> Self
    where
        T: LookupTxt + Clone + 'static,
    {
        let tasks = header::find_signatures(headers, config);

        let queries = Queries::spawn(&tasks, resolver, config);

        let tasks = header::verify_all(tasks, headers, queries).await;

        let mut final_tasks = vec![];
        let mut body_hasher = BodyHasherBuilder::new();

        for task in tasks {
            if let Some(sig) = &task.signature {
                match &task.status {
                    VerifyStatus::DataVerified => {
                        body_hasher.register(body_hasher_key(sig), None);
                    }
                    VerifyStatus::AwaitingBodyHash(_) => {
                        let stream = message_hash::compute_header_stream(headers, sig);
                        body_hasher
                            .register(single_stream_hasher_key(sig, task.index), Some(stream));
                    }
                    VerifyStatus::InProgress | VerifyStatus::Failed(_) => {}
                }
            }

            final_tasks.push(SigTask {
                index: task.index,
                scheme: task.scheme,
                signature: task.signature,
                status: task.status,
                testing: task.testing,
                key_size: task.key_size,
            });
        }

        Self {
            tasks: final_tasks,
            body_hasher: body_hasher.build(),
        }
    }

    /// Processes a chunk of the message body.
    ///
    /// The chunk is canonicalized and hashed but not otherwise retained. The
    /// returned stance tells the caller whether further input can still
    /// influence any signature.
    pub fn body_chunk(&mut self, chunk: &[u8]) -> BodyHasherStance {
        self.body_hasher.hash_chunk(chunk)
    }

    /// Closes the body hashes and returns the collated results.
    pub fn finish(self) -> VerificationResults {
        let mut results = vec![];

        let hasher_results = self.body_hasher.finish();

        for task in self.tasks {
            let status = match task.status {
                VerifyStatus::Failed(e) => VerificationStatus::from_error(e),
                VerifyStatus::InProgress => {
                    // a query that never resolved; treat like a lookup failure
                    VerificationStatus::Invalid(VerifierError::KeyLookup)
                }
                VerifyStatus::DataVerified => {
                    trace!("checking body hash for signature");

                    let sig = task
                        .signature
                        .as_ref()
                        .expect("verified signature must be present");

                    let key = body_hasher_key(sig);

                    check_body_hash(sig, &key, &hasher_results)
                }
                VerifyStatus::AwaitingBodyHash(public_key) => {
                    trace!("verifying single-stream signature");

                    let sig = task
                        .signature
                        .as_ref()
                        .expect("awaiting signature must be present");

                    let key = single_stream_hasher_key(sig, task.index);

                    match hasher_results.get(&key).and_then(|r| r.as_ref().ok()) {
                        Some((data_hash, _)) => {
                            match verify::verify_signature(&public_key, sig, data_hash) {
                                Ok(()) => VerificationStatus::Pass,
                                Err(e) => VerificationStatus::from_error(e),
                            }
                        }
                        None => VerificationStatus::Fail(VerifierError::InsufficientBodyLength),
                    }
                }
            };

            results.push(VerificationResult {
                index: task.index,
                scheme: task.scheme,
                signature: task.signature,
                status,
                testing: task.testing,
                key_size: task.key_size,
            });
        }

        VerificationResults { results }
    }
}

fn check_body_hash(
    sig: &Signature,
    key: &BodyHasherKey,
    hasher_results: &BodyHasherResults,
) -> VerificationStatus {
    let expected = sig
        .body_hash
        .as_deref()
        .expect("DKIM signature must carry a body hash");

    match hasher_results.get(key) {
        Some(Ok((h, _))) => {
            if h.as_ref() != expected {
                trace!("body hash mismatch");
                VerificationStatus::Fail(VerifierError::BodyHashMismatch)
            } else {
                trace!("body hash matched");
                VerificationStatus::Pass
            }
        }
        Some(Err(InsufficientInput)) | None => {
            VerificationStatus::Fail(VerifierError::InsufficientBodyLength)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, status: VerificationStatus) -> VerificationResult {
        VerificationResult {
            index,
            scheme: SignatureScheme::Dkim,
            signature: None,
            status,
            testing: false,
            key_size: None,
        }
    }

    #[test]
    fn verdict_ranking() {
        assert!(Verdict::Pass > Verdict::Fail);
        assert!(Verdict::Fail > Verdict::Invalid);
        assert!(Verdict::Invalid > Verdict::None);
    }

    #[test]
    fn collation_best_of() {
        let results = VerificationResults {
            results: vec![
                result(0, VerificationStatus::Invalid(VerifierError::NoKey)),
                result(2, VerificationStatus::Fail(VerifierError::BodyHashMismatch)),
                result(5, VerificationStatus::Pass),
                result(7, VerificationStatus::Pass),
            ],
        };

        assert_eq!(results.verdict(), Verdict::Pass);
        // ties broken by order of appearance
        assert_eq!(results.signature().unwrap().index, 5);
    }

    #[test]
    fn collation_none_and_invalid() {
        let results = VerificationResults { results: vec![] };
        assert_eq!(results.verdict(), Verdict::None);
        assert_eq!(results.signature(), None);

        let results = VerificationResults {
            results: vec![result(0, VerificationStatus::Invalid(VerifierError::NoKey))],
        };
        assert_eq!(results.verdict(), Verdict::Invalid);
        assert_eq!(results.signature().unwrap().index, 0);
    }

    #[test]
    fn error_classification() {
        assert!(VerifierError::BodyHashMismatch.is_failure());
        assert!(VerifierError::VerificationFailure.is_failure());
        assert!(VerifierError::CryptoError("signature length mismatch".into()).is_failure());
        assert!(!VerifierError::NoKey.is_failure());
        assert!(!VerifierError::SignatureExpired.is_failure());
    }

    #[test]
    fn error_details() {
        assert_eq!(VerifierError::NoKey.to_string(), "no key");
        assert_eq!(
            VerifierError::BodyHashMismatch.to_string(),
            "body has been altered"
        );
        assert_eq!(
            VerifierError::KeyRecordFormat(KeyRecordError::RevokedKey).to_string(),
            "key revoked"
        );
    }
}
