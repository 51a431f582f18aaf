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

use std::{future::Future, io};

/// A trait for retrieving TXT records from DNS.
///
/// This is the narrow interface the verifier requires of a resolver: fetch
/// the TXT record strings published at a name. Implementations map their
/// error conditions onto `io::Error` kinds: `NotFound` when the name does not
/// exist, `InvalidInput` for an unusable query name, `TimedOut` for resolver
/// timeouts.
pub trait LookupTxt: Send + Sync {
    type Answer: IntoIterator<Item = Result<Vec<u8>, io::Error>>;
    type Query<'a>: Future<Output = Result<Self::Answer, io::Error>> + Send + 'a
    where
        Self: 'a;

    fn lookup_txt(&self, domain: &str) -> Self::Query<'_>;
}

#[cfg(feature = "hickory-resolver")]
mod hickory {
    use super::LookupTxt;
    use hickory_resolver::{error::ResolveErrorKind, Name, TokioAsyncResolver};
    use std::{
        future::Future,
        io::{self, ErrorKind},
        pin::Pin,
    };

    impl LookupTxt for TokioAsyncResolver {
        type Answer = Box<dyn Iterator<Item = io::Result<Vec<u8>>>>;
        type Query<'a> = Pin<Box<dyn Future<Output = io::Result<Self::Answer>> + Send + 'a>>;

        fn lookup_txt(&self, domain: &str) -> Self::Query<'_> {
            let name = Name::from_ascii(domain);

            Box::pin(async move {
                let name = name.map_err(|_| ErrorKind::InvalidInput)?;

                // the resolver's own io::Error conversion keeps the error
                // classification, notably TimedOut for in-resolver timeouts
                let lookup = self.txt_lookup(name).await.map_err(|e| match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => {
                        io::Error::from(ErrorKind::NotFound)
                    }
                    _ => e.into(),
                })?;

                // multiple character-strings of one TXT record are
                // concatenated with no separator
                let txts = lookup.into_iter().map(|txt| Ok(txt.txt_data().concat()));

                let txts: Box<dyn Iterator<Item = _>> = Box::new(txts);

                Ok(txts)
            })
        }
    }
}
