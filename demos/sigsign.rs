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

//! Reads a message on standard input and re-emits it with a signature header
//! prepended.
//!
//! Usage: `sigsign <keyfile> <selector> <domain> [domainkeys|dkim]`

use mailsig::{
    auth_results,
    signer::{Signer, SigningRequest, SigningStatus},
    DomainName, MessageParser, Selector, SignatureAlgorithm, SignatureScheme, SigningKey,
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
            eprintln!("sigsign: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn Error>> {
    let mut args = std::env::args().skip(1);

    let (keyfile, selector, domain) = match (args.next(), args.next(), args.next()) {
        (Some(k), Some(s), Some(d)) => (k, s, d),
        _ => {
            eprintln!("usage: sigsign <keyfile> <selector> <domain> [domainkeys|dkim]");
            return Ok(ExitCode::FAILURE);
        }
    };

    let scheme = match args.next().as_deref() {
        None | Some("dkim") => SignatureScheme::Dkim,
        Some("domainkeys") => SignatureScheme::DomainKeys,
        Some(other) => {
            eprintln!("sigsign: unknown scheme {other}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let key_pem = std::fs::read_to_string(keyfile)?;
    let signing_key = SigningKey::from_pem(&key_pem)?;

    let mut input = vec![];
    io::stdin().lock().read_to_end(&mut input)?;

    let mut parser = MessageParser::new();
    let mut body = vec![];
    if let Some(chunk) = parser.feed(&input)? {
        body.extend_from_slice(chunk);
    }
    let headers = parser.finish()?;

    let request = SigningRequest::new(
        scheme,
        DomainName::new(&domain)?,
        Selector::new(&selector)?,
        SignatureAlgorithm::RsaSha1,
        signing_key,
    );

    let mut signer = Signer::prepare_signing([request], headers.clone())?;

    let _ = signer.body_chunk(&body);

    let results = signer.sign().await;

    let mut prepended = vec![];
    for result in &results {
        match &result.status {
            SigningStatus::Success { .. } => {
                prepended.extend(result.to_header_field());
            }
            SigningStatus::Skipped => {
                eprintln!("sigsign: sender outside signing domain, passing through unsigned");
            }
            SigningStatus::Error { error } => {
                eprintln!("sigsign: {error}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    auth_results::write_message(io::stdout().lock(), &prepended, &headers, &body)?;

    Ok(ExitCode::SUCCESS)
}
