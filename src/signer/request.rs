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
    header::{FieldName, HeaderFields},
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Identity, Selector,
        SignatureAlgorithm, SignatureScheme,
    },
    signer::SignerError,
};
use std::{num::TryFromIntError, time::Duration};

/// A generator for the body length limit tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BodyLength {
    /// Do not limit the body length: no l= tag.
    #[default]
    All,
    /// Sign only the body as presented: set l= to the actual body length.
    MessageContent,
    /// Sign exactly the given number of body octets: set l= to that value.
    Exact(u64),
}

pub(crate) fn convert_body_length(
    body_length: BodyLength,
) -> Result<Option<usize>, TryFromIntError> {
    match body_length {
        BodyLength::All | BodyLength::MessageContent => Ok(None),
        BodyLength::Exact(n) => n.try_into().map(Some),
    }
}

/// A generator for the timestamp tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Timestamp {
    #[default]
    Now,
    Exact(u64),
}

/// Selection of headers to include in the h= tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeaderSelection {
    /// Select every occurrence of the headers in the default set.
    Auto,
    /// Use exactly the headers given here as the contents of the h= tag.
    Manual(Vec<FieldName>),
}

/// Selects all headers matching the predicate, in reverse (evaluation) order.
pub fn select_headers<'a, 'b: 'a>(
    headers: &'a HeaderFields,
    mut pred: impl FnMut(&FieldName) -> bool + 'b,
) -> impl DoubleEndedIterator<Item = &'a FieldName> + 'a {
    headers
        .as_ref()
        .iter()
        .rev()
        .filter_map(move |(name, _)| if pred(name) { Some(name) } else { None })
}

/// Returns the default collection of headers to sign when they are present.
pub fn default_signed_headers() -> Vec<FieldName> {
    let names = [
        "From",
        "Reply-To",
        "Subject",
        "Date",
        "To",
        "Cc",
        "Resent-Date",
        "Resent-From",
        "Resent-To",
        "Resent-Cc",
        "In-Reply-To",
        "References",
        "List-Id",
        "List-Help",
        "List-Unsubscribe",
        "List-Subscribe",
        "List-Post",
        "List-Owner",
        "List-Archive",
        "Message-ID",
    ];

    names
        .into_iter()
        .map(|n| FieldName::new(n).unwrap())
        .collect()
}

/// A request for one signature to be added to a message.
pub struct SigningRequest<T> {
    pub signing_key: T,

    pub scheme: SignatureScheme,
    pub algorithm: SignatureAlgorithm,
    pub canonicalization: Canonicalization,
    pub header_selection: HeaderSelection,
    pub domain: DomainName,
    pub identity: Option<Identity>,
    pub selector: Selector,
    pub body_length: BodyLength,
    pub timestamp: Option<Timestamp>,
    pub valid_duration: Option<Duration>,
}

impl<T> SigningRequest<T> {
    pub fn new(
        scheme: SignatureScheme,
        domain: DomainName,
        selector: Selector,
        algorithm: SignatureAlgorithm,
        signing_key: T,
    ) -> Self {
        let canonicalization = match scheme {
            // simple/simple is the shared default; DomainKeys signers
            // traditionally published nowsp, but simple is valid for both
            SignatureScheme::DomainKeys | SignatureScheme::Dkim => Canonicalization {
                header: CanonicalizationAlgorithm::Simple,
                body: CanonicalizationAlgorithm::Simple,
            },
        };

        Self {
            signing_key,

            scheme,
            algorithm,
            canonicalization,
            header_selection: HeaderSelection::Auto,
            domain,
            identity: None,
            selector,
            body_length: BodyLength::All,
            timestamp: Some(Timestamp::Now),
            // five days, the traditional example duration
            valid_duration: Some(Duration::from_secs(60 * 60 * 24 * 5)),
        }
    }
}

pub(crate) fn validate_request<T>(request: &SigningRequest<T>) -> Result<(), SignerError> {
    let c = request.canonicalization;

    let scheme_allows = |alg| match request.scheme {
        SignatureScheme::DomainKeys => matches!(
            alg,
            CanonicalizationAlgorithm::Simple | CanonicalizationAlgorithm::Nowsp
        ),
        SignatureScheme::Dkim => matches!(
            alg,
            CanonicalizationAlgorithm::Simple | CanonicalizationAlgorithm::Relaxed
        ),
    };

    if !scheme_allows(c.header) || !scheme_allows(c.body) {
        return Err(SignerError::IncompatibleCanonicalization);
    }

    if let Some(identity) = &request.identity {
        if !identity.domain_part.eq_or_subdomain_of(&request.domain) {
            return Err(SignerError::BadIdentity);
        }
    }

    if let (SignatureScheme::DomainKeys, BodyLength::MessageContent) =
        (request.scheme, request.body_length)
    {
        // the DomainKeys header is hashed before the body length is known
        return Err(SignerError::IncompatibleBodyLength);
    }

    if request.valid_duration == Some(Duration::ZERO) {
        return Err(SignerError::ZeroExpirationDuration);
    }

    if let HeaderSelection::Manual(signed) = &request.header_selection {
        if !signed.iter().any(|name| *name == "From") {
            return Err(SignerError::FromHeaderNotSigned);
        }
        if signed.iter().any(|name| name.as_ref().contains(';')) {
            return Err(SignerError::InvalidSignedFieldName);
        }
    }

    Ok(())
}
