pub mod common;

use common::MockLookup;
use mailsig::{
    auth_results::AuthenticationResults,
    header::{FieldBody, FieldName, HeaderFields},
    signer::{BodyLength, SigningRequest},
    verifier::{Config, VerificationStatus, Verdict, VerifierError},
    DomainName, Identity, Selector, SignatureAlgorithm, SignatureScheme,
};
use std::io::ErrorKind;

fn dkim_request(
    algorithm: SignatureAlgorithm,
) -> SigningRequest<mailsig::SigningKey> {
    SigningRequest::new(
        SignatureScheme::Dkim,
        DomainName::new("example.com").unwrap(),
        Selector::new("sel").unwrap(),
        algorithm,
        common::signing_key(),
    )
}

#[tokio::test]
async fn no_signature_headers_yields_none() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert!(results.is_empty());
    assert_eq!(results.verdict(), Verdict::None);
    assert_eq!(results.signature(), None);
}

#[tokio::test]
async fn unsupported_algorithm_is_invalid_with_detail() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();

    let sig_header = (
        FieldName::new("DKIM-Signature").unwrap(),
        FieldBody::new(
            &b" v=1; a=rsa-md5; c=simple/simple; d=example.com; s=sel;\r\n\
              \th=from:to:subject; bh=MTIzNDU2Nzg5MDEyMzQ1Njc4OTAx; b=ZGVmZGVm"[..],
        )
        .unwrap(),
    );

    let headers = common::prepend_header_field(sig_header, common::make_header_fields());
    let body = common::make_body();

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Invalid);

    let best = results.signature().unwrap();
    assert_eq!(best.scheme, SignatureScheme::Dkim);
    let error = best.status.error().unwrap();
    assert_eq!(error.to_string(), "unsupported algorithm rsa-md5");

    // the result header names the method by the header's scheme, even though
    // the signature value never parsed
    let auth = AuthenticationResults::from_verification("mx.example.com", &headers, &results);
    assert_eq!(
        auth.header_value(),
        "mx.example.com from=jim@example.com; dkim=invalid (unsupported algorithm rsa-md5)"
    );
}

#[tokio::test]
async fn sign_then_verify_passes() {
    let _ = tracing_subscriber::fmt::try_init();

    for algorithm in [SignatureAlgorithm::RsaSha1, SignatureAlgorithm::RsaSha256] {
        let resolver = common::standard_resolver();
        let headers = common::make_header_fields();
        let body = common::make_body();

        let results = common::sign(headers.clone(), &body, [dkim_request(algorithm)]).await;
        let signed = results.into_iter().next().unwrap();

        let headers =
            common::prepend_header_field(signed.to_header_field().unwrap(), headers);

        let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

        assert_eq!(results.verdict(), Verdict::Pass, "{algorithm:?}");
        assert!(!results.signature().unwrap().testing);
        assert_eq!(results.signature().unwrap().key_size, Some(2048));
    }
}

#[tokio::test]
async fn simple_body_trailing_empty_lines_pass() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = b"files enclosed\r\n".to_vec();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    // a relay appended trailing empty lines; simple canonicalization
    // trims them back to a single CRLF
    let mut relayed_body = body.clone();
    relayed_body.extend_from_slice(b"\r\n\r\n");

    let results = common::verify(&resolver, &headers, &relayed_body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn best_of_two_signatures() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    // a second signature whose key cannot be retrieved
    let bogus = (
        FieldName::new("DKIM-Signature").unwrap(),
        FieldBody::new(
            &b" v=1; a=rsa-sha1; c=simple/simple; d=bogus.example; s=sel;\r\n\
              \th=from:to:subject; bh=MTIzNDU2Nzg5MDEyMzQ1Njc4OTAx; b=ZGVmZGVm"[..],
        )
        .unwrap(),
    );

    let headers = common::prepend_header_field(
        bogus,
        Vec::from(common::prepend_header_field(
            signed.to_header_field().unwrap(),
            headers,
        )),
    );

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);

    // the collated best signature is the passing one
    let best = results.signature().unwrap();
    assert_eq!(best.status, VerificationStatus::Pass);
    assert_eq!(
        best.signature.as_ref().unwrap().domain,
        DomainName::new("example.com").unwrap()
    );

    // the unusable one is reported alongside with its reason
    let rejected = results
        .iter()
        .find(|r| r.status.verdict() == Verdict::Invalid)
        .unwrap();
    assert_eq!(
        rejected.status,
        VerificationStatus::Invalid(VerifierError::NoKey)
    );
    assert_eq!(rejected.status.error().unwrap().to_string(), "no key");
}

#[tokio::test]
async fn unsigned_header_mutation_passes() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    // a downstream hop adds a header that was not signed
    let queue_header = (
        FieldName::new("X-Queue-Id").unwrap(),
        FieldBody::new(&b" 4FD2Kq1Xz"[..]).unwrap(),
    );

    let headers = common::prepend_header_field(
        signed.to_header_field().unwrap(),
        Vec::from(common::prepend_header_field(queue_header, headers)),
    );

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn altered_signed_header_fails() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let mut fields: Vec<_> = headers.into();
    for (name, value) in fields.iter_mut() {
        if *name == "Subject" {
            *value = FieldBody::new(&b" entirely new subject"[..]).unwrap();
        }
    }

    let headers = common::prepend_header_field(
        signed.to_header_field().unwrap(),
        HeaderFields::new(fields).unwrap(),
    );

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Fail);
    assert_eq!(
        results.signature().unwrap().status,
        VerificationStatus::Fail(VerifierError::VerificationFailure)
    );
}

#[tokio::test]
async fn altered_body_fails_with_detail() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let mut altered_body = body.clone();
    altered_body[0] ^= 0x01;

    let results = common::verify(&resolver, &headers, &altered_body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Fail);

    let best = results.signature().unwrap();
    assert_eq!(
        best.status,
        VerificationStatus::Fail(VerifierError::BodyHashMismatch)
    );
    assert_eq!(
        best.status.error().unwrap().to_string(),
        "body has been altered"
    );
}

#[tokio::test]
async fn body_length_limit_ignores_appended_content() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();

    let mut body = vec![b'a'; 498];
    body.extend_from_slice(b"\r\n");

    let mut request = dkim_request(SignatureAlgorithm::RsaSha1);
    request.body_length = BodyLength::Exact(100);

    let results = common::sign(headers.clone(), &body, [request]).await;
    let signed = results.into_iter().next().unwrap();

    assert_eq!(
        signed.to_header_field().is_some(),
        true,
        "signing failed: {:?}",
        signed.status
    );

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    // alter everything beyond the declared length
    let mut altered_body = body.clone();
    for b in &mut altered_body[100..400] {
        *b = b'x';
    }

    let results = common::verify(&resolver, &headers, &altered_body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn revoked_key_is_invalid() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::resolver_with_record("k=rsa; p=".to_owned());
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Invalid);
    assert_eq!(
        results.signature().unwrap().status.error().unwrap().to_string(),
        "key revoked"
    );
}

#[tokio::test]
async fn testing_flag_reported() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::resolver_with_record(format!(
        "k=rsa; t=y; p={}",
        common::public_key_base64()
    ));
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
    assert!(results.signature().unwrap().testing);
}

#[tokio::test]
async fn granularity_restricts_identity() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::resolver_with_record(format!(
        "k=rsa; g=jim; p={}",
        common::public_key_base64()
    ));
    let headers = common::make_header_fields();
    let body = common::make_body();

    for (identity, expected) in [
        ("jim@example.com", Verdict::Pass),
        ("bob@example.com", Verdict::Invalid),
    ] {
        let mut request = dkim_request(SignatureAlgorithm::RsaSha1);
        request.identity = Some(Identity::new(identity).unwrap());

        let results = common::sign(headers.clone(), &body, [request]).await;
        let signed = results.into_iter().next().unwrap();

        let headers =
            common::prepend_header_field(signed.to_header_field().unwrap(), headers.clone());

        let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

        assert_eq!(results.verdict(), expected, "identity {identity}");
    }
}

#[tokio::test]
async fn resolver_timeout_counts_as_no_key() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = MockLookup::new(|_name| {
        Box::pin(async move { Err(ErrorKind::TimedOut.into()) })
    });

    let headers = common::make_header_fields();
    let body = common::make_body();

    let results =
        common::sign(headers.clone(), &body, [dkim_request(SignatureAlgorithm::RsaSha1)]).await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Invalid);
    assert_eq!(
        results.signature().unwrap().status,
        VerificationStatus::Invalid(VerifierError::KeyLookupTimeout)
    );
    assert!(results
        .signature()
        .unwrap()
        .status
        .error()
        .unwrap()
        .to_string()
        .starts_with("no key"));
}
