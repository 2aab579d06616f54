//! Chain walking with real Ed25519 signatures

mod common;

use common::{ed25519_verifier, init_tracing, name, TestKey};
use std::sync::Arc;
use vouch_core::{Data, JsonCodec, ManualTimeSource};
use vouch_policy::config::ConfigSection;
use vouch_policy::{
    AcceptAllPolicy, CommandPolicy, ConfigPolicy, MemoryFetcher, ReplayGuard, ReplayPolicyOptions,
    TrustAnchor, TrustAnchorSet, ValidationErrorKind, Validator,
};

struct Pki {
    root: TestKey,
    site: TestKey,
    author: TestKey,
    fetcher: Arc<MemoryFetcher>,
}

fn pki() -> Pki {
    init_tracing();
    let root = TestKey::new("/org/KEY/root", 1);
    let site = TestKey::new("/org/site/KEY/2", 2);
    let author = TestKey::new("/org/site/alice/KEY/3", 3);

    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.insert(root.certify(&site));
    fetcher.insert(site.certify(&author));
    Pki {
        root,
        site,
        author,
        fetcher,
    }
}

fn hierarchical_schema() -> ConfigSection {
    ConfigSection::new().section(
        "rule",
        ConfigSection::new()
            .leaf("id", "hierarchy")
            .leaf("for", "data")
            .section(
                "checker",
                ConfigSection::new()
                    .leaf("type", "hierarchical")
                    .leaf("sig-type", "ecdsa-sha256"),
            ),
    )
}

fn validator(pki: &Pki) -> Validator<ConfigPolicy> {
    let mut policy = ConfigPolicy::new();
    policy.load(&hierarchical_schema(), "schema.conf").unwrap();

    let mut anchors = TrustAnchorSet::new();
    anchors.insert(TrustAnchor::from_certificate(pki.root.self_signed()));
    Validator::new(policy, anchors, pki.fetcher.clone(), ed25519_verifier())
}

#[tokio::test]
async fn test_three_level_chain_validates() {
    let pki = pki();
    let validator = validator(&pki);
    let data = pki
        .author
        .sign_data(Data::new(name("/org/site/alice/blog/1"), b"hello".to_vec()));
    validator.validate_data(&data).await.unwrap();
}

#[tokio::test]
async fn test_schema_anchor_ends_chain() {
    let pki = pki();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("root.cert"),
        pki.root.self_signed().to_base64(&JsonCodec),
    )
    .unwrap();

    let schema = hierarchical_schema().section(
        "trust-anchor",
        ConfigSection::new()
            .leaf("type", "file")
            .leaf("file-name", "root.cert"),
    );
    let mut policy = ConfigPolicy::new();
    let filename = dir.path().join("schema.conf");
    policy.load(&schema, filename.to_str().unwrap()).unwrap();

    let mut validator =
        Validator::new(policy, TrustAnchorSet::new(), pki.fetcher.clone(), ed25519_verifier());
    assert!(validator.find_anchor(&pki.root.key_name).is_some());
    let data = pki
        .author
        .sign_data(Data::new(name("/org/site/alice/blog/1"), b"hello".to_vec()));
    validator.validate_data(&data).await.unwrap();

    // Replacing the anchor file and refreshing drops the root; the chain dead-ends.
    let other = TestKey::new("/elsewhere/KEY/1", 11);
    std::fs::write(
        dir.path().join("root.cert"),
        other.self_signed().to_base64(&JsonCodec),
    )
    .unwrap();
    assert_eq!(validator.policy_mut().refresh_anchors().unwrap(), 1);
    assert!(validator.find_anchor(&pki.root.key_name).is_none());
    let err = validator.validate_data(&data).await.unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::CannotRetrieveCertificate);
}

#[tokio::test]
async fn test_tampered_content_fails_signature() {
    let pki = pki();
    let validator = validator(&pki);
    let mut data = pki
        .author
        .sign_data(Data::new(name("/org/site/alice/blog/1"), b"hello".to_vec()));
    data.content = b"goodbye".to_vec();
    let err = validator.validate_data(&data).await.unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::InvalidSignature);
}

#[tokio::test]
async fn test_signer_outside_namespace_violates_policy() {
    let pki = pki();
    let validator = validator(&pki);
    let data = pki
        .author
        .sign_data(Data::new(name("/org/site/bob/blog/1"), b"hello".to_vec()));
    let err = validator.validate_data(&data).await.unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::PolicyViolation);
}

#[tokio::test]
async fn test_forged_intermediate_detected() {
    let pki = pki();
    // An impostor key claims the site name but is certified by nobody trusted.
    let impostor = TestKey::new("/org/site/KEY/2", 99);
    let forged_fetcher = Arc::new(MemoryFetcher::new());
    forged_fetcher.insert(pki.root.certify(&pki.site));
    forged_fetcher.insert(impostor.certify(&pki.author));

    let mut policy = ConfigPolicy::new();
    policy.load(&hierarchical_schema(), "schema.conf").unwrap();
    let mut anchors = TrustAnchorSet::new();
    anchors.insert(TrustAnchor::from_certificate(pki.root.self_signed()));
    let validator = Validator::new(policy, anchors, forged_fetcher, ed25519_verifier());

    let data = pki
        .author
        .sign_data(Data::new(name("/org/site/alice/blog/1"), b"hello".to_vec()));
    let err = validator.validate_data(&data).await.unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::InvalidSignature);
}

#[tokio::test]
async fn test_missing_intermediate() {
    let pki = pki();
    let sparse = Arc::new(MemoryFetcher::new());
    sparse.insert(pki.site.certify(&pki.author));

    let mut policy = ConfigPolicy::new();
    policy.load(&hierarchical_schema(), "schema.conf").unwrap();
    let validator = Validator::new(policy, TrustAnchorSet::new(), sparse, ed25519_verifier());

    let data = pki
        .author
        .sign_data(Data::new(name("/org/site/alice/blog/1"), vec![]));
    let err = validator.validate_data(&data).await.unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::CannotRetrieveCertificate);
}

#[tokio::test]
async fn test_signed_command_through_command_policy_and_replay_guard() {
    init_tracing();
    let admin = TestKey::new("/admin/KEY/1", 7);
    let now = 1_700_000_000_000;
    let clock = Arc::new(ManualTimeSource::new(now));

    let mut commands =
        CommandPolicy::with_effects(ed25519_verifier(), clock.clone(), Arc::new(JsonCodec));
    commands
        .add_interest_rule("^<localhost><nfd><>*$", &admin.self_signed())
        .unwrap();
    let guard = ReplayGuard::with_effects(
        commands,
        ReplayPolicyOptions::default(),
        clock,
        Arc::new(JsonCodec),
    )
    .unwrap();
    let validator = Validator::new(
        guard,
        TrustAnchorSet::new(),
        Arc::new(MemoryFetcher::new()),
        ed25519_verifier(),
    );

    let command = admin.sign_command("/localhost/nfd/faces/create", now, 1);
    validator.validate_interest(&command).await.unwrap();

    let replayed = validator.validate_interest(&command).await.unwrap_err();
    assert_eq!(replayed.kind, ValidationErrorKind::PolicyError);

    let next = admin.sign_command("/localhost/nfd/faces/create", now + 1, 2);
    validator.validate_interest(&next).await.unwrap();
}

#[tokio::test]
async fn test_accept_all_validator_skips_verification() {
    let validator = Validator::new(
        AcceptAllPolicy,
        TrustAnchorSet::new(),
        Arc::new(MemoryFetcher::new()),
        ed25519_verifier(),
    );
    let data = TestKey::new("/x/KEY/1", 5).sign_data(Data::new(name("/x/y"), vec![]));
    validator.validate_data(&data).await.unwrap();
}
