pub mod common;

use mailsig::{
    header::{FieldBody, FieldName},
    signer::{SigningRequest, SigningStatus},
    verifier::{Config, VerificationStatus, Verdict, VerifierError},
    Canonicalization, CanonicalizationAlgorithm, DomainName, Selector, SignatureAlgorithm,
    SignatureScheme,
};

fn domainkeys_request(
    canon: CanonicalizationAlgorithm,
) -> SigningRequest<mailsig::SigningKey> {
    let mut request = SigningRequest::new(
        SignatureScheme::DomainKeys,
        DomainName::new("example.com").unwrap(),
        Selector::new("sel").unwrap(),
        SignatureAlgorithm::RsaSha1,
        common::signing_key(),
    );
    request.canonicalization = Canonicalization {
        header: canon,
        body: canon,
    };
    request
}

#[tokio::test]
async fn domainkeys_sign_then_verify_passes() {
    let _ = tracing_subscriber::fmt::try_init();

    for canon in [
        CanonicalizationAlgorithm::Simple,
        CanonicalizationAlgorithm::Nowsp,
    ] {
        let resolver = common::standard_resolver();
        let headers = common::make_header_fields();
        let body = common::make_body();

        let results = common::sign(headers.clone(), &body, [domainkeys_request(canon)]).await;
        let signed = results.into_iter().next().unwrap();

        let SigningStatus::Success { header_name, .. } = &signed.status else {
            panic!("signing failed: {:?}", signed.status);
        };
        assert_eq!(header_name, "DomainKey-Signature");

        let headers =
            common::prepend_header_field(signed.to_header_field().unwrap(), headers);

        let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

        assert_eq!(results.verdict(), Verdict::Pass, "{canon:?}");

        let best = results.signature().unwrap();
        assert_eq!(
            best.signature.as_ref().unwrap().scheme,
            SignatureScheme::DomainKeys
        );
        assert_eq!(best.signature.as_ref().unwrap().body_hash, None);
    }
}

#[tokio::test]
async fn nowsp_survives_whitespace_mangling() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = b"files  enclosed\r\ncall me\r\n".to_vec();

    let results = common::sign(
        headers.clone(),
        &body,
        [domainkeys_request(CanonicalizationAlgorithm::Nowsp)],
    )
    .await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    // a relay reflowed whitespace; nowsp masks all of it
    let mangled_body = b"files enclosed\r\n   call  me \r\n\r\n".to_vec();

    let results = common::verify(&resolver, &headers, &mangled_body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn domainkeys_altered_body_fails() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let results = common::sign(
        headers.clone(),
        &body,
        [domainkeys_request(CanonicalizationAlgorithm::Simple)],
    )
    .await;
    let signed = results.into_iter().next().unwrap();

    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let mut altered_body = body.clone();
    altered_body[0] ^= 0x01;

    let results = common::verify(&resolver, &headers, &altered_body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Fail);
    assert_eq!(
        results.signature().unwrap().status,
        VerificationStatus::Fail(VerifierError::VerificationFailure)
    );
}

#[tokio::test]
async fn version_tag_is_forbidden_in_domainkeys() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();

    let sig_header = (
        FieldName::new("DomainKey-Signature").unwrap(),
        FieldBody::new(
            &b" v=1; a=rsa-sha1; c=simple; d=example.com; s=sel; q=dns;\r\n\
              \th=from:to:subject; b=ZGVmZGVm"[..],
        )
        .unwrap(),
    );

    let headers = common::prepend_header_field(sig_header, common::make_header_fields());
    let body = common::make_body();

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Invalid);
    assert_eq!(
        results.signature().unwrap().status.error().unwrap().to_string(),
        "v= tag not allowed in DomainKey-Signature"
    );
}

#[tokio::test]
async fn empty_granularity_diverges_between_schemes() {
    let _ = tracing_subscriber::fmt::try_init();

    // a key record with a present-but-empty g= tag
    let resolver = common::resolver_with_record(format!(
        "g=; k=rsa; p={}",
        common::public_key_base64()
    ));
    let body = common::make_body();

    // DomainKeys: empty g= is a wildcard, verification passes
    let headers = common::make_header_fields();
    let results = common::sign(
        headers.clone(),
        &body,
        [domainkeys_request(CanonicalizationAlgorithm::Simple)],
    )
    .await;
    let signed = results.into_iter().next().unwrap();
    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;
    assert_eq!(results.verdict(), Verdict::Pass);

    // DKIM: empty g= matches nothing, the signature is unusable
    let headers = common::make_header_fields();
    let dkim_request = SigningRequest::new(
        SignatureScheme::Dkim,
        DomainName::new("example.com").unwrap(),
        Selector::new("sel").unwrap(),
        SignatureAlgorithm::RsaSha1,
        common::signing_key(),
    );
    let results = common::sign(headers.clone(), &body, [dkim_request]).await;
    let signed = results.into_iter().next().unwrap();
    let headers = common::prepend_header_field(signed.to_header_field().unwrap(), headers);

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;
    assert_eq!(results.verdict(), Verdict::Invalid);
    assert_eq!(
        results.signature().unwrap().status,
        VerificationStatus::Invalid(VerifierError::GranularityMismatch)
    );
}

#[tokio::test]
async fn both_schemes_on_one_message() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = common::standard_resolver();
    let headers = common::make_header_fields();
    let body = common::make_body();

    let dkim_request = SigningRequest::new(
        SignatureScheme::Dkim,
        DomainName::new("example.com").unwrap(),
        Selector::new("sel").unwrap(),
        SignatureAlgorithm::RsaSha1,
        common::signing_key(),
    );

    let results = common::sign(
        headers.clone(),
        &body,
        [
            domainkeys_request(CanonicalizationAlgorithm::Nowsp),
            dkim_request,
        ],
    )
    .await;

    let mut headers = headers;
    for signed in results.iter().rev() {
        headers = common::prepend_header_field(
            signed.to_header_field().unwrap(),
            headers,
        );
    }

    let results = common::verify(&resolver, &headers, &body, &Config::default()).await;

    assert_eq!(results.verdict(), Verdict::Pass);
    assert_eq!(results.as_ref().len(), 2);
    for result in results.iter() {
        assert_eq!(result.status, VerificationStatus::Pass);
    }
}
