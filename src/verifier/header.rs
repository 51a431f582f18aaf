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

//! Discovery of signature headers and the per-signature header-phase work:
//! parsing, structural checks, key retrieval checks, and (for DKIM) the
//! signature verification itself.

use crate::{
    crypto::VerifyingKey,
    header::HeaderFields,
    message_hash,
    record::{KeyFlag, KeyRecord, KeyRecordError},
    signature::{Signature, SignatureError, SignatureErrorKind, SignatureScheme},
    verifier::{
        query::{Queries, QueryResult},
        verify, Config, VerifierError,
    },
};
use std::{
    io::ErrorKind,
    str::{self, FromStr},
    sync::Arc,
    time::SystemTime,
};
use tracing::trace;

/// Progress of one signature verification task through the header phase.
#[derive(Debug, PartialEq)]
pub enum VerifyStatus {
    /// Waiting for the key record.
    InProgress,
    /// Rejected; no body processing needed.
    Failed(VerifierError),
    /// DKIM: the data hash verified against the key; the body hash comparison
    /// is still outstanding.
    DataVerified,
    /// DomainKeys: key checks passed; the single-stream hash over headers and
    /// body completes at end of message, verified with the stored key.
    AwaitingBodyHash(VerifyingKey),
}

#[derive(Debug, PartialEq)]
pub struct VerifyTask {
    pub status: VerifyStatus,
    pub index: usize,
    /// The scheme, known from the header name even when the value does not
    /// parse.
    pub scheme: SignatureScheme,
    pub signature: Option<Signature>,
    pub testing: bool,
    pub key_size: Option<usize>,
}

impl VerifyTask {
    fn failed(index: usize, scheme: SignatureScheme, error: VerifierError) -> Self {
        Self {
            status: VerifyStatus::Failed(error),
            index,
            scheme,
            signature: None,
            testing: false,
            key_size: None,
        }
    }

    fn started(index: usize, scheme: SignatureScheme, sig: Signature) -> Self {
        Self {
            status: VerifyStatus::InProgress,
            index,
            scheme,
            signature: Some(sig),
            testing: false,
            key_size: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, VerifyStatus::InProgress)
    }
}

/// Finds the signature headers of both schemes and starts a verification task
/// for each, in order of appearance.
pub fn find_signatures(headers: &HeaderFields, config: &Config) -> Vec<VerifyTask> {
    let mut tasks = vec![];

    let signature_headers = headers
        .as_ref()
        .iter()
        .enumerate()
        .filter_map(|(index, (name, value))| {
            SignatureScheme::from_header_name(name).map(|scheme| (index, scheme, value))
        })
        .take(config.max_signatures);

    for (index, scheme, value) in signature_headers {
        let value = match str::from_utf8(value.as_ref()) {
            Ok(s) => s,
            Err(_) => {
                trace!(index, "invalid UTF-8 in signature header");
                let error = VerifierError::SignatureFormat(SignatureError::new(
                    SignatureErrorKind::Utf8Encoding,
                ));
                tasks.push(VerifyTask::failed(index, scheme, error));
                continue;
            }
        };

        let sig = match Signature::from_header_value(scheme, value) {
            Ok(sig) => sig,
            Err(e) => {
                trace!(index, "failed to parse signature header");
                let error = VerifierError::SignatureFormat(e);
                tasks.push(VerifyTask::failed(index, scheme, error));
                continue;
            }
        };

        if let Err(e) = check_signature(&sig) {
            let mut task = VerifyTask::failed(index, scheme, e);
            // record the signature, which did parse
            task.signature = Some(sig);
            tasks.push(task);
            continue;
        }

        trace!(index, "found {} header", scheme.header_name());
        tasks.push(VerifyTask::started(index, scheme, sig));
    }

    tasks
}

// Structural checks beyond what parsing already guarantees.
fn check_signature(sig: &Signature) -> Result<(), VerifierError> {
    if let Some(t) = sig.expiration {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |t| t.as_secs());
        if t < now {
            trace!("signature has expired");
            return Err(VerifierError::SignatureExpired);
        }
    }

    if let Some(len) = sig.body_length {
        if usize::try_from(len).is_err() {
            trace!("body length declared in signature too large");
            return Err(VerifierError::Overflow);
        }
    }

    Ok(())
}

/// Steps through the query results as they come in and performs the
/// header-phase verification for each signature awaiting that key.
pub async fn verify_all(
    mut tasks: Vec<VerifyTask>,
    headers: &HeaderFields,
    mut queries: Queries,
) -> Vec<VerifyTask> {
    while let Some(result) = queries.set.join_next().await {
        let (indexes, result) = match result {
            Ok(r) => r,
            Err(_join_error) => continue,
        };

        let mut records = map_lookup_result_to_key_records(result);

        // This repeated linear search is acceptable as there is always a
        // limited number of signatures to process.
        let selected_tasks = tasks
            .iter_mut()
            .filter(|t| t.is_in_progress() && indexes.contains(&t.index));

        for task in selected_tasks {
            verify_task(task, headers, &mut records);
        }
    }

    tasks
}

// This enum ensures that we parse a `KeyRecord` from an `io::Result<String>`
// at most once, even if it is used by multiple signatures.
enum CachedKeyRecord {
    Unparsed(std::io::Result<String>),
    Parsed(Result<Arc<KeyRecord>, KeyRecordError>),
}

impl CachedKeyRecord {
    fn parse_and_cache(&mut self) -> &Result<Arc<KeyRecord>, KeyRecordError> {
        if let Self::Unparsed(s) = self {
            let r = match s {
                Ok(s) => KeyRecord::from_str(s),
                Err(e) => {
                    // the per-record I/O error is only exposed in the trace log
                    trace!("cannot use DNS TXT record: {e}");
                    Err(KeyRecordError::TagListSyntax)
                }
            };
            *self = Self::Parsed(r.map(Arc::new));
        }

        match self {
            Self::Unparsed(_) => unreachable!(),
            Self::Parsed(r) => &*r,
        }
    }
}

fn map_lookup_result_to_key_records(
    lookup_result: QueryResult,
) -> Result<Vec<CachedKeyRecord>, VerifierError> {
    match lookup_result {
        Ok(txts) if txts.is_empty() => {
            trace!("query found no key records");
            Err(VerifierError::NoKey)
        }
        Ok(txts) => {
            let records = txts.into_iter().map(CachedKeyRecord::Unparsed).collect();
            Ok(records)
        }
        Err(e) => match e.kind() {
            ErrorKind::NotFound => {
                trace!("query found no key records");
                Err(VerifierError::NoKey)
            }
            ErrorKind::InvalidInput => {
                trace!("invalid key record domain name");
                Err(VerifierError::InvalidKeyDomain)
            }
            ErrorKind::TimedOut => {
                trace!("key record lookup timed out");
                Err(VerifierError::KeyLookupTimeout)
            }
            _ => {
                // other I/O errors are only exposed in the trace log
                trace!("could not look up key record: {e}");
                Err(VerifierError::KeyLookup)
            }
        },
    }
}

fn verify_task(
    task: &mut VerifyTask,
    headers: &HeaderFields,
    lookup_result: &mut Result<Vec<CachedKeyRecord>, VerifierError>,
) {
    let sig = match &task.signature {
        Some(sig) => sig,
        None => return,
    };

    let domain = &sig.domain;
    let selector = &sig.selector;

    trace!(%domain, %selector, "processing {} header", sig.scheme.header_name());

    let cached_records = match lookup_result {
        Ok(r) => r,
        Err(e) => {
            trace!("cannot evaluate signature without lookup result");
            task.status = VerifyStatus::Failed(e.clone());
            return;
        }
    };

    assert!(!cached_records.is_empty());

    // Step through all (usually only one, but more are possible) key records.
    // The first record that carries verification to completion wins; else the
    // last failure is reported.

    for (i, record) in cached_records.iter_mut().enumerate() {
        trace!("trying verification using key record {}", i + 1);

        let record = match record.parse_and_cache() {
            Ok(record) => Arc::clone(record),
            Err(e) => {
                trace!("unusable public key record: {e}");
                task.status = VerifyStatus::Failed(VerifierError::KeyRecordFormat(*e));
                continue;
            }
        };

        if let Err(e) = check_key_record(sig, &record) {
            task.status = VerifyStatus::Failed(e);
            continue;
        }

        let key = match VerifyingKey::from_key_data(sig.algorithm.key_type(), &record.key_data) {
            Ok(k) => k,
            Err(e) => {
                trace!("unusable key data in public key record: {e}");
                task.status = VerifyStatus::Failed(VerifierError::CryptoError(
                    e.to_string().into(),
                ));
                continue;
            }
        };

        task.testing = record.flags.contains(&KeyFlag::Testing);
        task.key_size = Some(key.key_size());

        match sig.scheme {
            SignatureScheme::Dkim => {
                // the data hash covers the header stream only and can be
                // checked before the body arrives
                let data_hash = message_hash::compute_data_hash(headers, sig);

                match verify::verify_signature(&key, sig, &data_hash) {
                    Ok(()) => {
                        task.status = VerifyStatus::DataVerified;
                        break;
                    }
                    Err(e) => {
                        task.status = VerifyStatus::Failed(e);
                    }
                }
            }
            SignatureScheme::DomainKeys => {
                // headers and body are hashed as one stream; verification
                // must wait for the end of the body
                task.status = VerifyStatus::AwaitingBodyHash(key);
                break;
            }
        }
    }
}

fn check_key_record(sig: &Signature, record: &KeyRecord) -> Result<(), VerifierError> {
    debug_assert!(!record.key_data.is_empty());

    if record.key_type != sig.algorithm.key_type() {
        trace!("wrong key type in public key record");
        return Err(VerifierError::WrongKeyType);
    }

    if !record
        .hash_algorithms
        .contains(&sig.algorithm.hash_algorithm())
    {
        trace!("hash algorithm not allowed by public key record");
        return Err(VerifierError::DisallowedHashAlgorithm);
    }

    if !record.allows_email() {
        trace!("service type not allowed by public key record");
        return Err(VerifierError::DisallowedServiceType);
    }

    let identity = sig.identity_or_default();

    if record.flags.contains(&KeyFlag::NoSubdomains) {
        // parsing already ensures the i= domain is a subdomain of d=; the
        // strict flag requires them to be identical
        if identity.domain_part.to_ascii() != sig.domain.to_ascii() {
            trace!("i= and d= domains not allowed to differ by public key record");
            return Err(VerifierError::DomainMismatch);
        }
    }

    let local_part = identity.local_part.as_deref().unwrap_or("");
    if !record.granularity_matches(sig.scheme, local_part) {
        trace!("identity local part not allowed by key granularity");
        return Err(VerifierError::GranularityMismatch);
    }

    Ok(())
}
