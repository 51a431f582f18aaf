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

use crate::{
    crypto::{self, HashAlgorithm, InsufficientInput, SigningKey},
    header::HeaderFields,
    message_hash::{self, BodyHasherResults},
    signature::{format, Signature},
    signer::{BodyLength, SignerError, SigningResult, SigningStatus, SigningTask, TaskState},
};
use std::time::SystemTime;
use tracing::trace;

pub(super) fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |t| t.as_secs())
}

pub(super) async fn perform_signing<T>(
    task: SigningTask<T>,
    headers: &HeaderFields,
    hasher_results: &BodyHasherResults,
) -> SigningResult
where
    T: AsRef<SigningKey>,
{
    let request = task.request;

    match task.state {
        TaskState::Skipped => SigningResult {
            status: SigningStatus::Skipped,
        },
        TaskState::Error(error) => SigningResult {
            status: SigningStatus::Error { error },
        },
        TaskState::Deferred {
            domain,
            signed_headers,
            timestamp,
            expiration,
            hasher_key,
        } => {
            let (body_hash, final_len) = match hasher_results.get(&hasher_key) {
                Some(Ok((h, final_len))) => (h.clone(), *final_len),
                _ => {
                    return SigningResult {
                        status: SigningStatus::Error {
                            error: SignerError::InsufficientBodyLength,
                        },
                    };
                }
            };

            let body_length = match request.body_length {
                BodyLength::All => None,
                BodyLength::Exact(n) => Some(n),
                BodyLength::MessageContent => match final_len.try_into() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        return SigningResult {
                            status: SigningStatus::Error {
                                error: SignerError::Overflow,
                            },
                        };
                    }
                },
            };

            let sig = Signature {
                scheme: request.scheme,
                algorithm: request.algorithm,
                signature_data: Box::default(),
                body_hash: Some(body_hash),
                canonicalization: request.canonicalization,
                domain,
                signed_headers: signed_headers.into(),
                identity: request.identity,
                body_length,
                selector: request.selector,
                timestamp,
                expiration,
            };

            let (formatted_value, insertion_index) = sig.format_without_signature();

            let data_hash = message_hash::compute_data_hash(headers, &sig);

            finalize(
                sig,
                formatted_value,
                insertion_index,
                request.signing_key.as_ref(),
                &data_hash,
            )
        }
        TaskState::SingleStream {
            sig,
            formatted_value,
            insertion_index,
            hasher_key,
        } => {
            // the accumulated digest covers header stream and body alike
            let data_hash = match hasher_results.get(&hasher_key) {
                Some(Ok((h, _))) => h.clone(),
                Some(Err(InsufficientInput)) | None => {
                    return SigningResult {
                        status: SigningStatus::Error {
                            error: SignerError::InsufficientBodyLength,
                        },
                    };
                }
            };

            finalize(
                sig,
                formatted_value,
                insertion_index,
                request.signing_key.as_ref(),
                &data_hash,
            )
        }
    }
}

fn finalize(
    mut sig: Signature,
    mut formatted_value: String,
    insertion_index: usize,
    signing_key: &SigningKey,
    data_hash: &[u8],
) -> SigningResult {
    let signature_data =
        match sign_hash(signing_key, sig.algorithm.hash_algorithm(), data_hash) {
            Ok(signature_data) => {
                trace!("successfully signed");
                signature_data.into_boxed_slice()
            }
            Err(_e) => {
                trace!("signing failed");
                return SigningResult {
                    status: SigningStatus::Error {
                        error: SignerError::SigningFailure,
                    },
                };
            }
        };

    let header_name = sig.scheme.header_name();

    format::insert_signature_data(
        &mut formatted_value,
        insertion_index,
        header_name,
        &signature_data,
    );

    sig.signature_data = signature_data;

    SigningResult {
        status: SigningStatus::Success {
            signature: Box::new(sig),
            header_name: header_name.into(),
            header_value: formatted_value,
        },
    }
}

fn sign_hash(
    signing_key: &SigningKey,
    hash_alg: HashAlgorithm,
    data_hash: &[u8],
) -> Result<Vec<u8>, SignerError> {
    match signing_key {
        SigningKey::Rsa(k) => match crypto::sign_rsa(hash_alg, k, data_hash) {
            Ok(s) => {
                trace!("RSA signing successful");
                Ok(s)
            }
            Err(e) => {
                trace!("RSA signing failed: {e}");
                Err(SignerError::SigningFailure)
            }
        },
    }
}
