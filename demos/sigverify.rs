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

//! Reads a message on standard input, verifies its signatures against live
//! DNS, and re-emits the message with an `Authentication-Results` header on
//! top.
//!
//! Usage: `sigverify [hostname]`

use hickory_resolver::{config::ResolverConfig, TokioAsyncResolver};
use mailsig::{
    auth_results::AuthenticationResults,
    verifier::{Config, Verifier},
    MessageParser,
};
use std::{
    error::Error,
    io::{self, Read},
    process::ExitCode,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sigverify: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn Error>> {
    let hostname = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "localhost".to_owned());

    let mut input = vec![];
    io::stdin().lock().read_to_end(&mut input)?;

    let mut parser = MessageParser::new();
    let mut body = vec![];
    if let Some(chunk) = parser.feed(&input)? {
        body.extend_from_slice(chunk);
    }
    let headers = parser.finish()?;

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), Default::default());

    let config = Config::default();

    let mut verifier = Verifier::process_headers(&resolver, &headers, &config).await;

    let _ = verifier.body_chunk(&body);

    let results = verifier.finish();

    for result in results.iter() {
        let domain = result
            .signature
            .as_ref()
            .map(|sig| sig.domain.to_string())
            .unwrap_or_else(|| "-".to_owned());
        eprintln!(
            "signature {} d={domain}: {:?}",
            result.index,
            result.status.verdict()
        );
    }

    let auth = AuthenticationResults::from_verification(&hostname, &headers, &results);

    auth.write_message(io::stdout().lock(), &headers, &body)?;

    Ok(ExitCode::SUCCESS)
}
