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

use crate::crypto::HashAlgorithm;
use sha1::Sha1;
use sha2::Sha256;

/// Produces the message digest of the concatenation of the given inputs.
pub fn digest_slices<I, T>(hash_alg: HashAlgorithm, inputs: I) -> Box<[u8]>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    use digest::Digest;

    match hash_alg {
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            for input in inputs {
                hasher.update(input.as_ref());
            }
            Box::from(&hasher.finalize()[..])
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            for input in inputs {
                hasher.update(input.as_ref());
            }
            Box::from(&hasher.finalize()[..])
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InsufficientInput;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashStatus {
    AllConsumed, // input was digested entirely
    Truncated,   // input was only partially digested, the rest was ignored
}

/// An incremental hasher that limits and counts the number of content bytes
/// digested.
///
/// The optional length limit implements the declared body length (`l=`): once
/// the limit is reached, further input is ignored. Bytes fed through
/// [`update_prefix`][CountingHasher::update_prefix] are digested without
/// counting toward the limit; the single-stream DomainKeys hash feeds the
/// canonical header bytes that way before any body content arrives.
pub struct CountingHasher {
    digest: Box<dyn digest::DynDigest + Send>,
    length: Option<usize>,
    bytes_written: usize,
}

impl CountingHasher {
    pub fn new(hash_alg: HashAlgorithm, length: Option<usize>) -> Self {
        let digest: Box<dyn digest::DynDigest + Send> = match hash_alg {
            HashAlgorithm::Sha1 => Box::new(Sha1::default()),
            HashAlgorithm::Sha256 => Box::new(Sha256::default()),
        };

        Self {
            length,
            digest,
            bytes_written: 0,
        }
    }

    /// Digests bytes that do not count toward the length limit. Must precede
    /// all counted updates.
    pub fn update_prefix(&mut self, bytes: &[u8]) {
        debug_assert!(self.bytes_written == 0);
        self.digest.update(bytes);
    }

    pub fn update(&mut self, bytes: &[u8]) -> HashStatus {
        match self.length {
            Some(len) => {
                let bytes_left_to_write = len - self.bytes_written;

                if bytes_left_to_write >= bytes.len() {
                    self.digest.update(bytes);
                    self.bytes_written += bytes.len();
                    HashStatus::AllConsumed
                } else {
                    let partial_bytes = &bytes[..bytes_left_to_write];
                    self.digest.update(partial_bytes);
                    self.bytes_written += partial_bytes.len();
                    HashStatus::Truncated
                }
            }
            None => {
                self.digest.update(bytes);
                self.bytes_written += bytes.len();
                HashStatus::AllConsumed
            }
        }
    }

    pub fn finish(self) -> Result<(Box<[u8]>, usize), InsufficientInput> {
        if self.length.is_some() && !self.is_done() {
            return Err(InsufficientInput);
        }

        let bytes = self.digest.finalize();

        Ok((bytes, self.bytes_written))
    }

    pub fn is_done(&self) -> bool {
        matches!(self.length, Some(len) if len == self.bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64, Encoding};

    #[test]
    fn counting_hasher_ok() {
        let mut hasher = CountingHasher::new(HashAlgorithm::Sha256, None);
        assert!(!hasher.is_done());
        assert_eq!(hasher.update(b"abc"), HashStatus::AllConsumed);
        assert!(!hasher.is_done());
        assert_eq!(hasher.update(b""), HashStatus::AllConsumed);
        assert!(!hasher.is_done());
        assert_eq!(hasher.finish().unwrap().1, 3);

        let mut hasher = CountingHasher::new(HashAlgorithm::Sha256, Some(3));
        assert!(!hasher.is_done());
        assert_eq!(hasher.update(b"ab"), HashStatus::AllConsumed);
        assert!(!hasher.is_done());
        assert_eq!(hasher.update(b"c"), HashStatus::AllConsumed);
        assert!(hasher.is_done());
        assert_eq!(hasher.update(b"de"), HashStatus::Truncated);
        assert_eq!(hasher.finish().unwrap().1, 3);

        let mut hasher = CountingHasher::new(HashAlgorithm::Sha256, Some(3));
        assert_eq!(hasher.update(b"ab"), HashStatus::AllConsumed);
        assert_eq!(hasher.finish(), Err(InsufficientInput));
    }

    #[test]
    fn counting_hasher_prefix_not_counted() {
        let mut hasher = CountingHasher::new(HashAlgorithm::Sha1, Some(3));
        hasher.update_prefix(b"header bytes");
        assert_eq!(hasher.update(b"abc"), HashStatus::AllConsumed);

        let (hash, len) = hasher.finish().unwrap();

        assert_eq!(len, 3);
        assert_eq!(
            hash,
            digest_slices(HashAlgorithm::Sha1, [&b"header bytes"[..], &b"abc"[..]])
        );
    }

    #[test]
    fn counting_hasher_crlf_body() {
        let mut hasher = CountingHasher::new(HashAlgorithm::Sha256, None);

        hasher.update(b"\r\n");

        let (hash, len) = hasher.finish().unwrap();

        assert_eq!(
            Base64::encode_string(&hash),
            "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY="
        );
        assert_eq!(len, 2);
    }

    #[test]
    fn counting_hasher_empty_body() {
        let hasher = CountingHasher::new(HashAlgorithm::Sha256, None);

        let (hash, len) = hasher.finish().unwrap();

        assert_eq!(
            Base64::encode_string(&hash),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        assert_eq!(len, 0);
    }
}
