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

//! Cryptographic utilities.
//!
//! # Public key formats in DNS
//!
//! The standard says the `p=` tag contains an RSA public key in the bare
//! `RSAPublicKey` form, while the examples that implementers actually copied
//! install the slightly larger `SubjectPublicKeyInfo` form, which has become
//! the de facto standard. Key reading therefore tries `SubjectPublicKeyInfo`
//! first and falls back to `RSAPublicKey`.

mod hash;
mod rsa;

pub use self::rsa::{read_rsa_private_key, read_rsa_public_key, sign_rsa, verify_rsa};
pub use hash::{digest_slices, CountingHasher, HashStatus, InsufficientInput};

use crate::util::CanonicalStr;
use ::rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt::{self, Display, Formatter};

/// A private key used to produce signatures.
pub enum SigningKey {
    Rsa(RsaPrivateKey),
}

impl AsRef<SigningKey> for SigningKey {
    fn as_ref(&self) -> &SigningKey {
        self
    }
}

impl SigningKey {
    /// Reads a signing key from PEM-encoded data, in PKCS#8 or PKCS#1 form.
    pub fn from_pem(s: &str) -> Result<Self, KeyError> {
        rsa::read_rsa_private_key(s).map(Self::Rsa)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Rsa(_) => KeyType::Rsa,
        }
    }

    /// Returns the length in bytes of signatures made with this key.
    pub fn signature_length(&self) -> usize {
        match self {
            Self::Rsa(k) => ::rsa::PublicKeyParts::size(k),
        }
    }
}

/// A public key used to check signatures.
#[derive(Clone, Debug, PartialEq)]
pub enum VerifyingKey {
    Rsa(RsaPublicKey),
}

impl VerifyingKey {
    pub fn from_key_data(key_type: KeyType, key_data: &[u8]) -> Result<Self, VerificationError> {
        match key_type {
            KeyType::Rsa => rsa::read_rsa_public_key(key_data).map(Self::Rsa),
        }
    }

    /// Returns the key size in bits.
    pub fn key_size(&self) -> usize {
        match self {
            Self::Rsa(k) => ::rsa::PublicKeyParts::size(k) * 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
}

impl CanonicalStr for KeyType {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn all() -> Vec<Self> {
        vec![Self::Sha1, Self::Sha256]
    }
}

impl CanonicalStr for HashAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

/// An error that occurs when reading key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyError;

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "could not read key data")
    }
}

impl std::error::Error for KeyError {}

#[derive(Debug, PartialEq, Eq)]
pub enum VerificationError {
    InvalidKey,
    InvalidSignature,
    /// The signature did not match the data: the one ordinary failure.
    VerificationFailure,
    /// The crypto layer itself errored (malformed signature length, padding
    /// or decryption trouble), as opposed to a clean mismatch.
    Internal(Box<str>),
}

impl Display for VerificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid key"),
            Self::InvalidSignature => write!(f, "invalid signature data"),
            Self::VerificationFailure => write!(f, "verification failure"),
            Self::Internal(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SigningError {
    SigningFailure,
}

impl Display for SigningError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigningFailure => write!(f, "signing failure"),
        }
    }
}
