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

//! The public key record published in DNS.
//!
//! Key records are shared between the DomainKeys and DKIM schemes; the one
//! divergence (the meaning of an empty g= tag) is resolved by the scheme at
//! the point of use, see [`KeyRecord::granularity_matches`].

use crate::{
    crypto::{HashAlgorithm, KeyType},
    signature::SignatureScheme,
    tag_list::{
        parse_base64_tag_value, parse_colon_separated_tag_value, parse_qp_section_tag_value,
        TagList, TagSpec,
    },
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(Debug, PartialEq, Eq)]
pub enum ServiceType {
    Any,
    Email,
    Other(Box<str>),
}

#[derive(Debug, PartialEq, Eq)]
pub enum KeyFlag {
    Testing,
    NoSubdomains,
    Other(Box<str>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRecordError {
    TagListSyntax,
    UnsupportedVersion,
    MisplacedVersionTag,
    UnsupportedKeyType,
    NoSupportedHashAlgorithms,
    ValueSyntax,
    RevokedKey,
    MissingKeyTag,
    ServiceTypesEmpty,
}

impl Display for KeyRecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagListSyntax => write!(f, "invalid key record"),
            Self::UnsupportedVersion => write!(f, "unsupported key record version"),
            Self::MisplacedVersionTag => write!(f, "misplaced v= tag in key record"),
            Self::UnsupportedKeyType => write!(f, "unsupported key type"),
            Self::NoSupportedHashAlgorithms => write!(f, "unsupported hash"),
            Self::ValueSyntax => write!(f, "invalid key record"),
            Self::RevokedKey => write!(f, "key revoked"),
            Self::MissingKeyTag => write!(f, "no key data in key record"),
            Self::ServiceTypesEmpty => write!(f, "no service types in key record"),
        }
    }
}

/// A public key record, parsed from the TXT record at
/// `<selector>._domainkey.<domain>`.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyRecord {
    pub hash_algorithms: Box<[HashAlgorithm]>, // non-empty
    pub key_type: KeyType,
    pub notes: Option<Box<str>>,
    pub key_data: Box<[u8]>,
    /// The g= local-part pattern: `None` when the tag was absent (default
    /// `*`), `Some("")` when present and empty.
    pub granularity: Option<Box<str>>,
    pub service_types: Box<[ServiceType]>, // non-empty
    pub flags: Box<[KeyFlag]>,
}

impl FromStr for KeyRecord {
    type Err = KeyRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag_list = match TagList::from_str(s) {
            Ok(r) => r,
            Err(_e) => {
                return Err(KeyRecordError::TagListSyntax);
            }
        };

        Self::from_tag_list(&tag_list)
    }
}

impl KeyRecord {
    fn from_tag_list(tag_list: &TagList<'_>) -> Result<Self, KeyRecordError> {
        let mut hash_algorithms = HashAlgorithm::all();
        let key_type = KeyType::Rsa;
        let mut notes = None;
        let mut key_data = None;
        let mut granularity = None;
        let mut service_types = vec![ServiceType::Any];
        let mut flags = vec![];

        for (i, &TagSpec { name, value }) in tag_list.as_ref().iter().enumerate() {
            match name {
                "v" => {
                    if i != 0 {
                        return Err(KeyRecordError::MisplacedVersionTag);
                    }
                    if value != "DKIM1" {
                        return Err(KeyRecordError::UnsupportedVersion);
                    }
                }
                "g" => {
                    granularity = Some(value.into());
                }
                "h" => {
                    hash_algorithms.clear();
                    for v in parse_colon_separated_tag_value(value) {
                        if v.eq_ignore_ascii_case("sha1") {
                            hash_algorithms.push(HashAlgorithm::Sha1);
                        } else if v.eq_ignore_ascii_case("sha256") {
                            hash_algorithms.push(HashAlgorithm::Sha256);
                        }
                    }
                    if hash_algorithms.is_empty() {
                        return Err(KeyRecordError::NoSupportedHashAlgorithms);
                    }
                }
                "k" => {
                    if !value.eq_ignore_ascii_case("rsa") {
                        return Err(KeyRecordError::UnsupportedKeyType);
                    }
                }
                "n" => {
                    let v = parse_qp_section_tag_value(value)
                        .map_err(|_| KeyRecordError::ValueSyntax)?;
                    // only UTF-8 supported:
                    let val = String::from_utf8_lossy(&v);
                    notes = Some(val.into());
                }
                "p" => {
                    if value.is_empty() {
                        return Err(KeyRecordError::RevokedKey);
                    }
                    let v = parse_base64_tag_value(value)
                        .map_err(|_| KeyRecordError::ValueSyntax)?;
                    key_data = Some(v.into());
                }
                "s" => {
                    let mut st = vec![];
                    for v in parse_colon_separated_tag_value(value) {
                        if v == "*" {
                            st.push(ServiceType::Any);
                        } else if v.eq_ignore_ascii_case("email") {
                            st.push(ServiceType::Email);
                        } else {
                            st.push(ServiceType::Other(v.into()));
                        }
                    }
                    if st.is_empty() {
                        return Err(KeyRecordError::ServiceTypesEmpty);
                    }
                    service_types = st;
                }
                "t" => {
                    let mut fs = vec![];
                    for v in parse_colon_separated_tag_value(value) {
                        if v.eq_ignore_ascii_case("y") {
                            fs.push(KeyFlag::Testing);
                        } else if v.eq_ignore_ascii_case("s") {
                            fs.push(KeyFlag::NoSubdomains);
                        } else {
                            fs.push(KeyFlag::Other(v.into()));
                        }
                    }
                    flags = fs;
                }
                _ => {}
            }
        }

        let key_data = key_data.ok_or(KeyRecordError::MissingKeyTag)?;

        Ok(Self {
            hash_algorithms: hash_algorithms.into(),
            key_type,
            notes,
            key_data,
            granularity,
            service_types: service_types.into(),
            flags: flags.into(),
        })
    }

    /// Returns true iff this record may be used for mail.
    pub fn allows_email(&self) -> bool {
        self.service_types
            .iter()
            .any(|s| matches!(s, ServiceType::Any | ServiceType::Email))
    }

    /// Checks the identity's local part against the g= granularity pattern.
    ///
    /// An absent tag defaults to the wildcard. The schemes diverge on a
    /// present-but-empty tag: DomainKeys reads it as the wildcard, DKIM as
    /// matching nothing.
    pub fn granularity_matches(&self, scheme: SignatureScheme, local_part: &str) -> bool {
        let pattern = match self.granularity.as_deref() {
            None => "*",
            Some("") => match scheme {
                SignatureScheme::DomainKeys => "*",
                SignatureScheme::Dkim => return false,
            },
            Some(p) => p,
        };

        match pattern.split_once('*') {
            Some((prefix, suffix)) => {
                local_part.len() >= prefix.len() + suffix.len()
                    && local_part.starts_with(prefix)
                    && local_part.ends_with(suffix)
            }
            None => local_part == pattern,
        }
    }
}
