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

//! The final cryptographic check of a signature.

use crate::{
    crypto::{self, VerifyingKey},
    signature::Signature,
    verifier::VerifierError,
};
use tracing::trace;

pub(crate) fn verify_signature(
    public_key: &VerifyingKey,
    sig: &Signature,
    data_hash: &[u8],
) -> Result<(), VerifierError> {
    let hash_alg = sig.algorithm.hash_algorithm();

    match public_key {
        VerifyingKey::Rsa(pk) => {
            match crypto::verify_rsa(hash_alg, pk, data_hash, &sig.signature_data) {
                Ok(()) => {
                    trace!("RSA signature verification successful");
                    Ok(())
                }
                Err(crypto::VerificationError::VerificationFailure) => {
                    trace!("RSA signature verification failed");
                    Err(VerifierError::VerificationFailure)
                }
                Err(e) => {
                    // an error inside the crypto layer is reported distinctly
                    // from an ordinary bad signature
                    trace!("RSA signature verification errored: {e}");
                    Err(VerifierError::CryptoError(e.to_string().into()))
                }
            }
        }
    }
}
