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

//! Signature records: the typed form of `DomainKey-Signature` and
//! `DKIM-Signature` header values.

pub(crate) mod format;
mod names;

pub use names::{DomainName, Identity, ParseDomainError, Selector};

use crate::{
    crypto::{HashAlgorithm, KeyType},
    header::FieldName,
    tag_list::{
        parse_base64_tag_value, parse_colon_separated_tag_value, parse_dqp_tag_value, TagList,
        TagSpec,
    },
    util::{encode_base64, CanonicalStr},
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub const DKIM_SIGNATURE_NAME: &str = "DKIM-Signature";
pub const DOMAINKEY_SIGNATURE_NAME: &str = "DomainKey-Signature";

/// The two signature schemes, distinguished by their header name.
///
/// The historic DomainKeys scheme and its successor DKIM share most of their
/// wire grammar and all of their key handling; the differences are captured by
/// this tag plus a handful of per-scheme rules in parsing and hashing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureScheme {
    DomainKeys,
    Dkim,
}

impl SignatureScheme {
    /// Returns the name of the header carrying signatures of this scheme.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::DomainKeys => DOMAINKEY_SIGNATURE_NAME,
            Self::Dkim => DKIM_SIGNATURE_NAME,
        }
    }

    /// Returns the scheme for a signature header field name, if it is one.
    pub fn from_header_name(name: &FieldName) -> Option<Self> {
        if *name == DKIM_SIGNATURE_NAME {
            Some(Self::Dkim)
        } else if *name == DOMAINKEY_SIGNATURE_NAME {
            Some(Self::DomainKeys)
        } else {
            None
        }
    }

    /// The query protocol written to the q= tag on emission.
    pub fn query_protocol(self) -> &'static str {
        match self {
            Self::DomainKeys => "dns",
            Self::Dkim => "dns/txt",
        }
    }

    fn allows_canonicalization(self, alg: CanonicalizationAlgorithm) -> bool {
        match self {
            Self::DomainKeys => matches!(
                alg,
                CanonicalizationAlgorithm::Simple | CanonicalizationAlgorithm::Nowsp
            ),
            Self::Dkim => matches!(
                alg,
                CanonicalizationAlgorithm::Simple | CanonicalizationAlgorithm::Relaxed
            ),
        }
    }
}

/// A signature algorithm: the hash and signature primitive pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    RsaSha1,
    RsaSha256,
}

impl SignatureAlgorithm {
    pub fn key_type(self) -> KeyType {
        match self {
            Self::RsaSha1 | Self::RsaSha256 => KeyType::Rsa,
        }
    }

    pub fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha1 => HashAlgorithm::Sha1,
            Self::RsaSha256 => HashAlgorithm::Sha256,
        }
    }
}

impl CanonicalStr for SignatureAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "rsa-sha1",
            Self::RsaSha256 => "rsa-sha256",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rsa-sha1") {
            Ok(Self::RsaSha1)
        } else if s.eq_ignore_ascii_case("rsa-sha256") {
            Ok(Self::RsaSha256)
        } else {
            Err("unknown signature algorithm")
        }
    }
}

/// A canonicalization algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CanonicalizationAlgorithm {
    #[default]
    Simple,
    Relaxed,
    Nowsp,
}

impl CanonicalStr for CanonicalizationAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
            Self::Nowsp => "nowsp",
        }
    }
}

impl Display for CanonicalizationAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for CanonicalizationAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("simple") {
            Ok(Self::Simple)
        } else if s.eq_ignore_ascii_case("relaxed") {
            Ok(Self::Relaxed)
        } else if s.eq_ignore_ascii_case("nowsp") {
            Ok(Self::Nowsp)
        } else {
            Err("unknown canonicalization algorithm")
        }
    }
}

/// A pair of header/body canonicalization algorithms.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Canonicalization {
    pub header: CanonicalizationAlgorithm,
    pub body: CanonicalizationAlgorithm,
}

impl Canonicalization {
    /// Parses a c= tag value in the context of a scheme.
    ///
    /// When the value names a single algorithm, DomainKeys applies it to both
    /// halves, while DKIM applies it to the header half only, with `simple`
    /// for the body.
    pub fn parse(scheme: SignatureScheme, s: &str) -> Result<Self, &'static str> {
        let c = if let Some((header, body)) = s.split_once('/') {
            Self {
                header: header.parse()?,
                body: body.parse()?,
            }
        } else {
            let alg = s.parse()?;
            match scheme {
                SignatureScheme::DomainKeys => Self { header: alg, body: alg },
                SignatureScheme::Dkim => Self { header: alg, body: Default::default() },
            }
        };

        if !scheme.allows_canonicalization(c.header) || !scheme.allows_canonicalization(c.body) {
            return Err("canonicalization algorithm not valid for scheme");
        }

        Ok(c)
    }
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.header, self.body)
    }
}

impl fmt::Debug for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", &self.header, &self.body)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureError {
    // circumstantial diagnostics:
    pub domain: Option<DomainName>, // header d= (a valid domain name)

    // error:
    pub kind: SignatureErrorKind,
}

impl SignatureError {
    pub fn new(kind: SignatureErrorKind) -> Self {
        Self { domain: None, kind }
    }
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureErrorKind {
    InvalidTagList,
    Utf8Encoding,
    VersionForbidden,
    MissingVersionTag,
    UnsupportedVersion,
    UnsupportedAlgorithm(Box<str>),
    MissingAlgorithmTag,
    MissingSignatureTag,
    MissingBodyHashTag,
    UnsupportedCanonicalization(Box<str>),
    InvalidDomain,
    MissingDomainTag,
    SignedHeadersEmpty,
    FromHeaderNotSigned,
    MissingSignedHeadersTag,
    InvalidBodyLength,
    UnsupportedQueryProtocol(Box<str>),
    InvalidSelector,
    MissingSelectorTag,
    InvalidTimestamp,
    InvalidExpiration,
    ExpirationNotAfterTimestamp,
    InvalidIdentity,
    BadIdentity,
    ValueSyntax,
}

impl Display for SignatureErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTagList => write!(f, "invalid tag list"),
            Self::Utf8Encoding => write!(f, "invalid encoding in header value"),
            Self::VersionForbidden => write!(f, "v= tag not allowed in DomainKey-Signature"),
            Self::MissingVersionTag => write!(f, "v= tag missing"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
            Self::UnsupportedAlgorithm(v) => write!(f, "unsupported algorithm {v}"),
            Self::MissingAlgorithmTag => write!(f, "a= tag missing"),
            Self::MissingSignatureTag => write!(f, "b= tag missing"),
            Self::MissingBodyHashTag => write!(f, "bh= tag missing"),
            Self::UnsupportedCanonicalization(v) => {
                write!(f, "unsupported canonicalization {v}")
            }
            Self::InvalidDomain => write!(f, "invalid domain"),
            Self::MissingDomainTag => write!(f, "d= tag missing"),
            Self::SignedHeadersEmpty => write!(f, "no signed headers"),
            Self::FromHeaderNotSigned => write!(f, "From header not signed"),
            Self::MissingSignedHeadersTag => write!(f, "h= tag missing"),
            Self::InvalidBodyLength => write!(f, "invalid body length"),
            Self::UnsupportedQueryProtocol(v) => write!(f, "unsupported protocol {v}"),
            Self::InvalidSelector => write!(f, "invalid selector"),
            Self::MissingSelectorTag => write!(f, "s= tag missing"),
            Self::InvalidTimestamp => write!(f, "invalid timestamp"),
            Self::InvalidExpiration => write!(f, "invalid expiration"),
            Self::ExpirationNotAfterTimestamp => write!(f, "expiration not after timestamp"),
            Self::InvalidIdentity => write!(f, "invalid identity"),
            Self::BadIdentity => write!(f, "bad identity"),
            Self::ValueSyntax => write!(f, "syntax error"),
        }
    }
}

/// A signature record, the typed form of one signature header.
#[derive(Clone, Eq, PartialEq)]
pub struct Signature {
    // The fields are strongly typed and have public visibility. This does
    // allow constructing an ‘incomplete’ `Signature` (eg with empty signature
    // data); the signer relies on exactly that before the signature bytes
    // exist.
    pub scheme: SignatureScheme,
    pub algorithm: SignatureAlgorithm,
    pub signature_data: Box<[u8]>,
    pub body_hash: Option<Box<[u8]>>, // required by DKIM, absent in DomainKeys
    pub canonicalization: Canonicalization,
    pub domain: DomainName,
    pub signed_headers: Box<[FieldName]>, // not empty, no names containing ;
    pub identity: Option<Identity>,
    pub body_length: Option<u64>,
    pub selector: Selector,
    pub timestamp: Option<u64>,
    pub expiration: Option<u64>,
}

impl Signature {
    /// Parses the value portion of a signature header.
    pub fn from_header_value(
        scheme: SignatureScheme,
        s: &str,
    ) -> Result<Self, SignatureError> {
        let tag_list = match TagList::from_str(s) {
            Ok(r) => r,
            Err(_e) => {
                return Err(SignatureError {
                    domain: None,
                    kind: SignatureErrorKind::InvalidTagList,
                });
            }
        };

        match Self::from_tag_list(scheme, &tag_list) {
            Ok(sig) => Ok(sig),
            Err(kind) => {
                // attempt to find _some_ info for diagnostics
                let domain = tag_list
                    .as_ref()
                    .iter()
                    .find(|spec| spec.name == "d")
                    .and_then(|spec| DomainName::new(spec.value).ok());
                Err(SignatureError { domain, kind })
            }
        }
    }

    fn from_tag_list(
        scheme: SignatureScheme,
        tag_list: &TagList<'_>,
    ) -> Result<Self, SignatureErrorKind> {
        let mut version_seen = false;
        let mut algorithm = None;
        let mut signature_data = None;
        let mut body_hash = None;
        let mut canonicalization = None;
        let mut domain = None;
        let mut signed_headers = None;
        let mut identity = None;
        let mut body_length = None;
        let mut selector = None;
        let mut timestamp = None;
        let mut expiration = None;

        for &TagSpec { name, value } in tag_list.as_ref() {
            match name {
                "v" => {
                    // DomainKeys predates the version tag and forbids it.
                    if let SignatureScheme::DomainKeys = scheme {
                        return Err(SignatureErrorKind::VersionForbidden);
                    }
                    if value != "1" {
                        return Err(SignatureErrorKind::UnsupportedVersion);
                    }
                    version_seen = true;
                }
                "a" => {
                    let value = value.parse().map_err(|_| {
                        SignatureErrorKind::UnsupportedAlgorithm(value.to_ascii_lowercase().into())
                    })?;
                    algorithm = Some(value);
                }
                "b" => {
                    let value = parse_base64_tag_value(value)
                        .map_err(|_| SignatureErrorKind::ValueSyntax)?;
                    signature_data = Some(value.into());
                }
                "bh" => {
                    if let SignatureScheme::Dkim = scheme {
                        let value = parse_base64_tag_value(value)
                            .map_err(|_| SignatureErrorKind::ValueSyntax)?;
                        body_hash = Some(value.into());
                    }
                    // DomainKeys has no body hash; a stray bh= is ignored
                    // like any unknown tag
                }
                "c" => {
                    let value =
                        Canonicalization::parse(scheme, &value.to_ascii_lowercase()).map_err(
                            |_| {
                                SignatureErrorKind::UnsupportedCanonicalization(
                                    value.to_ascii_lowercase().into(),
                                )
                            },
                        )?;
                    canonicalization = Some(value);
                }
                "d" => {
                    let value = DomainName::new(&value.to_ascii_lowercase())
                        .map_err(|_| SignatureErrorKind::InvalidDomain)?;
                    domain = Some(value);
                }
                "h" => {
                    let mut sh = vec![];
                    for v in parse_colon_separated_tag_value(value) {
                        let name = FieldName::new(v.to_ascii_lowercase())
                            .map_err(|_| SignatureErrorKind::ValueSyntax)?;
                        sh.push(name);
                    }
                    if sh.is_empty() {
                        return Err(SignatureErrorKind::SignedHeadersEmpty);
                    }
                    if !sh.iter().any(|h| *h == "From") {
                        return Err(SignatureErrorKind::FromHeaderNotSigned);
                    }
                    signed_headers = Some(sh.into());
                }
                "i" => {
                    let value = parse_dqp_tag_value(value)
                        .map_err(|_| SignatureErrorKind::InvalidIdentity)?;
                    let value = Identity::new(&value)
                        .map_err(|_| SignatureErrorKind::InvalidIdentity)?;
                    identity = Some(value);
                }
                "l" => {
                    let value = value
                        .parse()
                        .map_err(|_| SignatureErrorKind::InvalidBodyLength)?;
                    body_length = Some(value);
                }
                "q" => {
                    let mut dns_seen = false;
                    for v in parse_colon_separated_tag_value(value) {
                        if v.eq_ignore_ascii_case("dns") || v.eq_ignore_ascii_case("dns/txt") {
                            dns_seen = true;
                        }
                    }
                    if !dns_seen {
                        return Err(SignatureErrorKind::UnsupportedQueryProtocol(
                            value.to_ascii_lowercase().into(),
                        ));
                    }
                }
                "s" => {
                    let value = Selector::new(value)
                        .map_err(|_| SignatureErrorKind::InvalidSelector)?;
                    selector = Some(value);
                }
                "t" => {
                    let value = value
                        .parse()
                        .map_err(|_| SignatureErrorKind::InvalidTimestamp)?;
                    timestamp = Some(value);
                }
                "x" => {
                    let value = value
                        .parse()
                        .map_err(|_| SignatureErrorKind::InvalidExpiration)?;
                    expiration = Some(value);
                }
                _ => {}
            }
        }

        if let SignatureScheme::Dkim = scheme {
            if !version_seen {
                return Err(SignatureErrorKind::MissingVersionTag);
            }
        }

        let algorithm = algorithm.ok_or(SignatureErrorKind::MissingAlgorithmTag)?;
        let signature_data = signature_data.ok_or(SignatureErrorKind::MissingSignatureTag)?;
        let domain = domain.ok_or(SignatureErrorKind::MissingDomainTag)?;
        let signed_headers =
            signed_headers.ok_or(SignatureErrorKind::MissingSignedHeadersTag)?;
        let selector = selector.ok_or(SignatureErrorKind::MissingSelectorTag)?;

        if let SignatureScheme::Dkim = scheme {
            if body_hash.is_none() {
                return Err(SignatureErrorKind::MissingBodyHashTag);
            }
        }

        let identity = match identity {
            Some(i) => {
                // the identity must lie within the signer's declared domain
                if !i.domain_part.eq_or_subdomain_of(&domain) {
                    return Err(SignatureErrorKind::BadIdentity);
                }
                Some(i)
            }
            None => None,
        };

        if let (Some(timestamp), Some(expiration)) = (timestamp, expiration) {
            if expiration <= timestamp {
                return Err(SignatureErrorKind::ExpirationNotAfterTimestamp);
            }
        }

        let canonicalization = canonicalization.unwrap_or_default();

        Ok(Self {
            scheme,
            algorithm,
            signature_data,
            body_hash,
            canonicalization,
            domain,
            signed_headers,
            identity,
            body_length,
            selector,
            timestamp,
            expiration,
        })
    }

    /// Returns the i= identity, or the default identity `@d` when none was
    /// given.
    pub fn identity_or_default(&self) -> Identity {
        self.identity
            .clone()
            .unwrap_or_else(|| Identity::from_domain(self.domain.clone()))
    }

    /// Returns the canonical header rendering without the b= value, and the
    /// index where the b= value is to be inserted.
    ///
    /// This rendering is hashed on both the signing and the verifying side,
    /// and placed (with the signature bytes inserted) on outgoing mail.
    pub(crate) fn format_without_signature(&self) -> (String, usize) {
        format::format_without_signature(self)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("scheme", &self.scheme)
            .field("algorithm", &self.algorithm)
            .field("signature_data", &encode_base64(&self.signature_data))
            .field("body_hash", &self.body_hash.as_deref().map(encode_base64))
            .field("canonicalization", &self.canonicalization)
            .field("domain", &self.domain)
            .field("signed_headers", &self.signed_headers)
            .field("identity", &self.identity)
            .field("body_length", &self.body_length)
            .field("selector", &self.selector)
            .field("timestamp", &self.timestamp)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64, Encoding};

    #[test]
    fn example_dkim_signature() {
        let example = "v=1; a=rsa-sha1; d=example.net; s=brisbane;
  c=simple; q=dns/txt; i=@eng.example.net;
  t=1117574938; x=1118006938;
  h=from:to:subject:date;
  bh=MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=;
  b=dzdVyOfAKCdLXdJOc9G2q8LoXSlEniSbav+yuU4zGeeruD00lszZVoG4ZHRNiYzR";
        let example = example.replace('\n', "\r\n");

        let sig = Signature::from_header_value(SignatureScheme::Dkim, &example).unwrap();

        assert_eq!(
            sig,
            Signature {
                scheme: SignatureScheme::Dkim,
                algorithm: SignatureAlgorithm::RsaSha1,
                signature_data: Base64::decode_vec(
                        "dzdVyOfAKCdLXdJOc9G2q8LoXSlEniSbav+yuU4zGeeruD00lszZVoG4ZHRNiYzR"
                    ).unwrap().into(),
                body_hash: Some(
                    Base64::decode_vec("MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=")
                        .unwrap()
                        .into()
                ),
                canonicalization: Canonicalization {
                    header: CanonicalizationAlgorithm::Simple,
                    body: CanonicalizationAlgorithm::Simple,
                },
                domain: DomainName::new("example.net").unwrap(),
                signed_headers: [
                    FieldName::new("from").unwrap(),
                    FieldName::new("to").unwrap(),
                    FieldName::new("subject").unwrap(),
                    FieldName::new("date").unwrap(),
                ].into(),
                identity: Some(Identity::new("@eng.example.net").unwrap()),
                selector: Selector::new("brisbane").unwrap(),
                body_length: None,
                timestamp: Some(1117574938),
                expiration: Some(1118006938),
            }
        );
    }

    #[test]
    fn domainkeys_signature_ok() {
        let example = "a=rsa-sha1; q=dns; c=nowsp; s=mail; d=example.com;
  h=from:to:subject;
  b=ZGVmCg==";
        let example = example.replace('\n', "\r\n");

        let sig = Signature::from_header_value(SignatureScheme::DomainKeys, &example).unwrap();

        assert_eq!(sig.scheme, SignatureScheme::DomainKeys);
        assert_eq!(sig.body_hash, None);
        assert_eq!(
            sig.canonicalization,
            Canonicalization {
                header: CanonicalizationAlgorithm::Nowsp,
                body: CanonicalizationAlgorithm::Nowsp,
            }
        );
    }

    #[test]
    fn domainkeys_version_forbidden() {
        let example = "v=1; a=rsa-sha1; q=dns; s=mail; d=example.com; h=from; b=ZGVmCg==";

        let err =
            Signature::from_header_value(SignatureScheme::DomainKeys, example).unwrap_err();

        assert_eq!(err.kind, SignatureErrorKind::VersionForbidden);
    }

    #[test]
    fn unsupported_algorithm_detail() {
        let example = "v=1; a=rsa-md5; d=example.com; s=sel; h=from; b=ZGVmCg==; bh=ZGVmCg==";

        let err = Signature::from_header_value(SignatureScheme::Dkim, example).unwrap_err();

        assert_eq!(
            err.kind,
            SignatureErrorKind::UnsupportedAlgorithm("rsa-md5".into())
        );
        assert_eq!(err.kind.to_string(), "unsupported algorithm rsa-md5");
        assert_eq!(err.domain, Some(DomainName::new("example.com").unwrap()));
    }

    #[test]
    fn relaxed_not_valid_for_domainkeys() {
        let example = "a=rsa-sha1; c=relaxed; d=example.com; s=sel; h=from; b=ZGVmCg==";

        let err =
            Signature::from_header_value(SignatureScheme::DomainKeys, example).unwrap_err();

        assert_eq!(
            err.kind,
            SignatureErrorKind::UnsupportedCanonicalization("relaxed".into())
        );
    }

    #[test]
    fn dkim_single_canon_token_leaves_body_simple() {
        let example =
            "v=1; a=rsa-sha1; c=relaxed; d=example.com; s=sel; h=from; b=ZGVmCg==; bh=ZGVmCg==";

        let sig = Signature::from_header_value(SignatureScheme::Dkim, example).unwrap();

        assert_eq!(
            sig.canonicalization,
            Canonicalization {
                header: CanonicalizationAlgorithm::Relaxed,
                body: CanonicalizationAlgorithm::Simple,
            }
        );
    }

    #[test]
    fn identity_domain_mismatch() {
        let example = "v=1; a=rsa-sha1; d=example.org; s=sel; h=from; i=alice@other.org;
  b=ZGVmCg==; bh=ZGVmCg==";
        let example = example.replace('\n', "\r\n");

        let err = Signature::from_header_value(SignatureScheme::Dkim, &example).unwrap_err();

        assert_eq!(err.kind, SignatureErrorKind::BadIdentity);
        assert_eq!(err.kind.to_string(), "bad identity");
    }

    #[test]
    fn identity_subdomain_ok() {
        let example = "v=1; a=rsa-sha1; d=example.org; s=sel; h=from;
  i=alice@sub.example.org; b=ZGVmCg==; bh=ZGVmCg==";
        let example = example.replace('\n', "\r\n");

        let sig = Signature::from_header_value(SignatureScheme::Dkim, &example).unwrap();

        assert_eq!(
            sig.identity,
            Some(Identity::new("alice@sub.example.org").unwrap())
        );
    }

    #[test]
    fn from_header_must_be_signed() {
        let example = "v=1; a=rsa-sha1; d=example.com; s=sel; h=to:subject;
  b=ZGVmCg==; bh=ZGVmCg==";
        let example = example.replace('\n', "\r\n");

        let err = Signature::from_header_value(SignatureScheme::Dkim, &example).unwrap_err();

        assert_eq!(err.kind, SignatureErrorKind::FromHeaderNotSigned);
    }
}
