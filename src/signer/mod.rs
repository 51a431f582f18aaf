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

//! Signer and supporting types.

mod request;
mod sign;

pub use request::{
    default_signed_headers, select_headers, BodyLength, HeaderSelection, SigningRequest,
    Timestamp,
};

use crate::{
    auth_results,
    crypto::SigningKey,
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    message_hash::{BodyHasher, BodyHasherBuilder, BodyHasherKey, BodyHasherStance, HasherScope},
    signature::{DomainName, Signature, SignatureScheme},
};
use std::fmt::{self, Display, Formatter};
use tracing::trace;

/// An error that occurs when using a [`Signer`].
#[derive(Debug, PartialEq, Eq)]
pub enum SignerError {
    TooManyRequests,
    EmptyRequests,
    MissingFromHeader,
    FromHeaderNotSigned,
    InvalidSignedFieldName,
    IncompatibleCanonicalization,
    IncompatibleBodyLength,
    ZeroExpirationDuration,
    BadIdentity,
    Overflow,
    InsufficientBodyLength,
    SigningFailure,
}

impl Display for SignerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyRequests => write!(f, "too many signing requests"),
            Self::EmptyRequests => write!(f, "no signing requests"),
            Self::MissingFromHeader => write!(f, "message has no From header"),
            Self::FromHeaderNotSigned => write!(f, "From header not signed"),
            Self::InvalidSignedFieldName => write!(f, "invalid signed header name"),
            Self::IncompatibleCanonicalization => {
                write!(f, "canonicalization not valid for scheme")
            }
            Self::IncompatibleBodyLength => write!(f, "body length mode not valid for scheme"),
            Self::ZeroExpirationDuration => write!(f, "zero expiration duration"),
            Self::BadIdentity => write!(f, "identity outside signing domain"),
            Self::Overflow => write!(f, "integer too large"),
            Self::InsufficientBodyLength => write!(f, "body shorter than declared length"),
            Self::SigningFailure => write!(f, "signing failure"),
        }
    }
}

impl std::error::Error for SignerError {}

/// The outcome of one signing request.
#[derive(Debug, PartialEq)]
pub enum SigningStatus {
    /// A signature was produced; prepend the header to the outgoing message.
    Success {
        signature: Box<Signature>,
        header_name: String,
        /// Continuation lines use CRLF line endings.
        header_value: String,
    },
    /// The message's sender/from domain is outside the signing domain; no
    /// signature was made.
    Skipped,
    /// The request could not be satisfied.
    Error { error: SignerError },
}

#[derive(Debug, PartialEq)]
pub struct SigningResult {
    pub status: SigningStatus,
}

impl SigningResult {
    /// Converts a successful result into a header field.
    pub fn to_header_field(&self) -> Option<HeaderField> {
        match &self.status {
            SigningStatus::Success {
                header_name,
                header_value,
                ..
            } => {
                let name = FieldName::new(header_name.as_str())
                    .expect("signer produced well-formed header name");
                let body = FieldBody::new(header_value.as_bytes())
                    .expect("signer produced well-formed header value");
                Some((name, body))
            }
            _ => None,
        }
    }

    /// Formats a successful result as `Name:value`, with no whitespace
    /// between name, colon, and value.
    pub fn format_header(&self) -> Option<String> {
        match &self.status {
            SigningStatus::Success {
                header_name,
                header_value,
                ..
            } => Some(format!("{header_name}:{header_value}")),
            _ => None,
        }
    }
}

// Per-request state after the header phase.
pub(super) enum TaskState {
    Skipped,
    Error(SignerError),
    /// DKIM: the header is rendered after the body hash is known.
    Deferred {
        domain: DomainName,
        signed_headers: Vec<FieldName>,
        timestamp: Option<u64>,
        expiration: Option<u64>,
        hasher_key: BodyHasherKey,
    },
    /// DomainKeys: the header was rendered up front and already digested as
    /// the hash prefix; only the signature bytes are outstanding.
    SingleStream {
        sig: Signature,
        formatted_value: String,
        insertion_index: usize,
        hasher_key: BodyHasherKey,
    },
}

pub(super) struct SigningTask<T> {
    pub(super) request: SigningRequest<T>,
    pub(super) state: TaskState,
}

/// A signer for an email message.
///
/// `Signer` implements the same staged design as
/// [`Verifier`][crate::verifier::Verifier]:
///
/// 1. [`prepare_signing`][Signer::prepare_signing] validates the requests
///    against the message header and sets up the hashing pipelines;
/// 2. [`body_chunk`][Signer::body_chunk] canonicalizes and hashes body
///    content as it arrives;
/// 3. [`sign`][Signer::sign] performs the signing and renders the headers.
pub struct Signer<T> {
    tasks: Vec<SigningTask<T>>, // non-empty
    headers: HeaderFields,
    body_hasher: BodyHasher,
}

impl<T> Signer<T>
where
    T: AsRef<SigningKey>,
{
    /// Prepares a message signing process.
    pub fn prepare_signing<I>(requests: I, headers: HeaderFields) -> Result<Self, SignerError>
    where
        I: IntoIterator<Item = SigningRequest<T>>,
    {
        if !headers.as_ref().iter().any(|(name, _)| *name == "From") {
            return Err(SignerError::MissingFromHeader);
        }

        let origin_domain = auth_results::message_origin(&headers)
            .map(|origin| origin.domain().to_ascii_lowercase());

        let mut tasks = vec![];
        let mut body_hasher = BodyHasherBuilder::new();

        for (index, request) in requests.into_iter().enumerate() {
            if index >= 10 {
                return Err(SignerError::TooManyRequests);
            }

            let state = prepare_task(&request, index, &headers, &origin_domain, &mut body_hasher);

            tasks.push(SigningTask { request, state });
        }

        if tasks.is_empty() {
            return Err(SignerError::EmptyRequests);
        }

        Ok(Self {
            tasks,
            headers,
            body_hasher: body_hasher.build(),
        })
    }

    /// Processes a chunk of the message body.
    ///
    /// The chunk is canonicalized and hashed but not otherwise retained.
    pub fn body_chunk(&mut self, chunk: &[u8]) -> BodyHasherStance {
        self.body_hasher.hash_chunk(chunk)
    }

    /// Performs the actual signing and returns the results, one per request
    /// in order.
    pub async fn sign(self) -> Vec<SigningResult> {
        let hasher_results = self.body_hasher.finish();

        let mut results = vec![];

        for task in self.tasks {
            // note artificial await point, yields to the runtime if there are
            // many signatures
            let result = sign::perform_signing(task, &self.headers, &hasher_results).await;

            results.push(result);
        }

        results
    }
}

fn lowercase_name(name: &FieldName) -> FieldName {
    FieldName::new(name.as_ref().to_ascii_lowercase())
        .expect("lowercased valid field name stays valid")
}

fn prepare_task<T>(
    request: &SigningRequest<T>,
    index: usize,
    headers: &HeaderFields,
    origin_domain: &Option<String>,
    body_hasher: &mut BodyHasherBuilder,
) -> TaskState {
    if let Err(error) = request::validate_request(request) {
        return TaskState::Error(error);
    }

    // A signer only speaks for mail inside its own domain; everything else
    // passes through unsigned.
    let signing_domain = request.domain.to_ascii().to_ascii_lowercase();
    let within_domain = matches!(origin_domain.as_deref(), Some(d)
        if d == signing_domain || d.ends_with(&format!(".{signing_domain}")));
    if !within_domain {
        trace!(index, "sender outside signing domain, skipping");
        return TaskState::Skipped;
    }

    // The wire form of a signature stores the h= names and the d= domain
    // lowercased, and the verifier hashes the re-rendered record; emit the
    // same normal form here so both sides hash identical bytes.
    let signed_headers: Vec<FieldName> = match &request.header_selection {
        HeaderSelection::Auto => {
            let def = default_signed_headers();
            select_headers(headers, move |name| def.contains(name))
                .map(lowercase_name)
                .collect()
        }
        HeaderSelection::Manual(signed) => signed.iter().map(lowercase_name).collect(),
    };

    let domain = DomainName::new(&request.domain.as_ref().to_ascii_lowercase())
        .expect("lowercased valid domain stays valid");

    let timestamp = request.timestamp.map(|timestamp| match timestamp {
        Timestamp::Now => sign::now_unix_secs(),
        Timestamp::Exact(t) => t,
    });

    let expiration = request.valid_duration.map(|duration| {
        timestamp
            .unwrap_or_else(sign::now_unix_secs)
            .saturating_add(duration.as_secs())
    });

    let hash_alg = request.algorithm.hash_algorithm();
    let body_canon = request.canonicalization.body;

    let length_limit = match request::convert_body_length(request.body_length) {
        Ok(limit) => limit,
        Err(_) => return TaskState::Error(SignerError::Overflow),
    };

    match request.scheme {
        SignatureScheme::Dkim => {
            let hasher_key = (HasherScope::Shared, length_limit, hash_alg, body_canon);
            body_hasher.register(hasher_key, None);

            TaskState::Deferred {
                domain,
                signed_headers,
                timestamp,
                expiration,
                hasher_key,
            }
        }
        SignatureScheme::DomainKeys => {
            let sig = Signature {
                scheme: request.scheme,
                algorithm: request.algorithm,
                signature_data: Box::default(),
                body_hash: None,
                canonicalization: request.canonicalization,
                domain,
                signed_headers: signed_headers.into(),
                identity: request.identity.clone(),
                body_length: match request.body_length {
                    BodyLength::Exact(n) => Some(n),
                    BodyLength::All | BodyLength::MessageContent => None,
                },
                selector: request.selector.clone(),
                timestamp,
                expiration,
            };

            let (formatted_value, insertion_index) = sig.format_without_signature();

            // headers and body are hashed as one stream; digest the header
            // section now, body octets follow with the l= limit applied
            let stream = crate::message_hash::compute_header_stream(headers, &sig);

            let hasher_key = (
                HasherScope::Task(index),
                length_limit,
                hash_alg,
                body_canon,
            );
            body_hasher.register(hasher_key, Some(stream));

            TaskState::SingleStream {
                sig,
                formatted_value,
                insertion_index,
                hasher_key,
            }
        }
    }
}
