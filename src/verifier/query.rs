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
    signature::{DomainName, Selector},
    verifier::{header::VerifyTask, Config, LookupTxt},
};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
};
use tokio::{task::JoinSet, time};

pub type QueryResult = io::Result<Vec<io::Result<String>>>;

struct QueriesBuilder {
    // A-label form (domain, selector), mapped to the signature header indexes
    // awaiting that key
    lookup_pairs: HashMap<(String, String), Vec<usize>>,
}

impl QueriesBuilder {
    fn new() -> Self {
        Self {
            lookup_pairs: HashMap::new(),
        }
    }

    fn add_lookup(&mut self, domain: &DomainName, selector: &Selector, index: usize) {
        let domain = domain.to_ascii();
        let selector = selector.to_ascii();

        self.lookup_pairs
            .entry((domain, selector))
            .or_insert(vec![])
            .push(index);
    }

    fn spawn_all<T>(self, resolver: &T, config: &Config) -> Queries
    where
        T: LookupTxt + Clone + 'static,
    {
        let mut set = JoinSet::new();

        for ((domain, selector), indexes) in self.lookup_pairs {
            let resolver = resolver.clone();

            let lookup_timeout = config.lookup_timeout;

            set.spawn(async move {
                let result = match time::timeout(
                    lookup_timeout,
                    look_up_records(&resolver, &domain, &selector),
                )
                .await
                {
                    Ok(r) => r,
                    Err(_elapsed) => Err(ErrorKind::TimedOut.into()),
                };

                (indexes, result)
            });
        }

        Queries { set }
    }
}

async fn look_up_records<T: LookupTxt + ?Sized>(
    resolver: &T,
    domain: &str,
    selector: &str,
) -> QueryResult {
    let dname = format!("{selector}._domainkey.{domain}.");

    let txts = resolver.lookup_txt(&dname).await?;

    // If the query returns multiple key records, the verifier may pick any of
    // them; we step through at most three.
    let result = txts
        .into_iter()
        .take(3)
        .map(|txt| {
            txt.and_then(|s| String::from_utf8(s).map_err(|_| ErrorKind::InvalidData.into()))
        })
        .collect();

    Ok(result)
}

pub struct Queries {
    pub set: JoinSet<(Vec<usize>, QueryResult)>,
}

impl Queries {
    pub fn spawn<T>(tasks: &[VerifyTask], resolver: &T, config: &Config) -> Self
    where
        T: LookupTxt + Clone + 'static,
    {
        let mut builder = QueriesBuilder::new();

        for task in tasks {
            if task.is_in_progress() {
                if let Some(sig) = &task.signature {
                    builder.add_lookup(&sig.domain, &sig.selector, task.index);
                }
            }
        }

        builder.spawn_all(resolver, config)
    }
}
