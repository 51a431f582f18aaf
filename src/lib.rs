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

//! A library for verifying and generating the two cryptographic signature
//! schemes carried in email messages: the historic *DomainKeys* scheme in the
//! `DomainKey-Signature` header, and *DKIM* in the `DKIM-Signature` header.
//!
//! Both schemes bind a selection of message headers plus the message body to a
//! public key published in DNS under a domain chosen by the signer. This
//! library implements the byte-level canonicalization rules of both schemes,
//! streaming hash computation, public key retrieval and checking, and best-of
//! collation over any number of signatures on one message.
//!
//! # Usage
//!
//! The types [`Verifier`] and [`Signer`] are the entry points. Both implement
//! a staged design that processes the message in chunks:
//!
//! 1. construction from the message header (for the verifier, this is where
//!    DNS lookups happen and is therefore async);
//! 2. any number of body chunks, canonicalized and hashed as they arrive but
//!    not otherwise retained;
//! 3. a finishing step producing per-signature results.
//!
//! [`MessageParser`] splits a raw message byte stream into the header fields
//! and body chunks these APIs consume, and [`auth_results`] renders the
//! `Authentication-Results` header summarizing a verification.
//!
//! # Cargo features
//!
//! The feature **`hickory-resolver`** makes an implementation of the trait
//! [`LookupTxt`][crate::verifier::LookupTxt] available for the Hickory DNS
//! resolver. `LookupTxt` is the abstraction used for key retrieval during
//! verification.
//!
//! # Trace logging
//!
//! This library uses the [tracing] crate for internal trace logging. For
//! insight into library operation, install a tracing subscriber and enable
//! logging at `trace` level.
//!
//! [tracing]: https://crates.io/crates/tracing

// Trace logging about internal operation via `tracing::trace!` is done only in
// the high-level modules `signer` and `verifier`.

pub mod auth_results;
pub mod canonicalize;
pub mod crypto;
pub mod header;
pub mod message;
pub mod message_hash;
mod parse;
pub mod quoted_printable;
pub mod record;
pub mod signature;
pub mod signer;
mod tag_list;
mod util;
pub mod verifier;

pub use crate::{
    crypto::SigningKey,
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    message::{MessageParser, ParseError},
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Identity, Selector, Signature,
        SignatureAlgorithm, SignatureScheme,
    },
    signer::{Signer, SignerError, SigningRequest, SigningResult, SigningStatus},
    util::{decode_base64, encode_base64, CanonicalStr},
    verifier::{
        Config, LookupTxt, VerificationResult, VerificationResults, VerificationStatus, Verdict,
        Verifier, VerifierError,
    },
};
