// Integration tests for the authentication ceremony
use passkey_core::testing::constants::{TEST_ORIGIN, TEST_RP_ID};
use passkey_core::testing::{client_data_json, AuthenticatorDataBuilder, TestAuthenticator, TestFixtures};
use passkey_core::webauthn::crypto::signed_message;
use passkey_core::webauthn::{AuthenticatorFlags, CeremonyState, WebAuthnError};

const CHALLENGE: &[u8] = b"authentication-challenge-bytes!!";

struct Assertion {
    authenticator_data: Vec<u8>,
    client_data: Vec<u8>,
    signature: Vec<u8>,
}

fn create_assertion(authenticator: &TestAuthenticator, sign_count: u32) -> Assertion {
    let authenticator_data = AuthenticatorDataBuilder::new(TEST_RP_ID)
        .with_flags(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED)
        .with_sign_count(sign_count)
        .build();
    let client_data = client_data_json("webauthn.get", CHALLENGE, TEST_ORIGIN);
    let signature = authenticator.sign(&signed_message(&authenticator_data, &client_data));
    Assertion {
        authenticator_data,
        client_data,
        signature,
    }
}

fn verify(stored_count: u32, reported_count: u32) -> Result<u32, WebAuthnError> {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, stored_count);
    let assertion = create_assertion(&authenticator, reported_count);

    TestFixtures::webauthn_service()
        .verify_authentication(
            &assertion.authenticator_data,
            &assertion.client_data,
            &assertion.signature,
            CHALLENGE,
            TEST_ORIGIN,
            &stored,
        )
        .map(|record| record.sign_count)
}

#[test]
fn test_counter_monotonicity() {
    assert_eq!(verify(0, 1), Ok(1));
    assert_eq!(verify(41, 42), Ok(42));
    assert_eq!(verify(41, 1000), Ok(1000));
    assert_eq!(verify(42, 42), Err(WebAuthnError::PossibleCloneDetected));
    assert_eq!(verify(42, 0), Err(WebAuthnError::PossibleCloneDetected));
}

#[test]
fn test_zero_counter_authenticators_are_tolerated() {
    assert_eq!(verify(0, 0), Ok(0));
}

#[test]
fn test_decreasing_counter_is_clone_warning_not_signature_failure() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 10);
    let assertion = create_assertion(&authenticator, 7);

    let verdict = TestFixtures::webauthn_service().authentication_verdict(
        &assertion.authenticator_data,
        &assertion.client_data,
        &assertion.signature,
        CHALLENGE,
        TEST_ORIGIN,
        &stored,
    );

    assert!(!verdict.verified);
    assert_eq!(verdict.reason, Some(WebAuthnError::PossibleCloneDetected));
    assert!(verdict.reason.as_ref().is_some_and(WebAuthnError::is_clone_warning));
    assert_eq!(
        verdict.state,
        CeremonyState::Failed(WebAuthnError::PossibleCloneDetected)
    );
    assert_eq!(verdict.last_step, CeremonyState::SignatureValidated);
}

#[test]
fn test_successful_verdict_carries_updated_record() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 3);
    let assertion = create_assertion(&authenticator, 4);

    let verdict = TestFixtures::webauthn_service().authentication_verdict(
        &assertion.authenticator_data,
        &assertion.client_data,
        &assertion.signature,
        CHALLENGE,
        TEST_ORIGIN,
        &stored,
    );

    assert!(verdict.verified);
    assert_eq!(verdict.state, CeremonyState::Verified);
    assert_eq!(verdict.last_step, CeremonyState::Verified);
    let updated = verdict.updated_credential.unwrap();
    assert_eq!(updated.sign_count, 4);
    assert!(updated.last_used.is_some());
    assert_eq!(updated.public_key, stored.public_key);
}

#[test]
fn test_signature_from_other_key_is_invalid() {
    let stored = TestFixtures::credential_record(&TestAuthenticator::new(), 0);
    let assertion = create_assertion(&TestAuthenticator::other(), 1);

    assert_eq!(
        TestFixtures::webauthn_service().verify_authentication(
            &assertion.authenticator_data,
            &assertion.client_data,
            &assertion.signature,
            CHALLENGE,
            TEST_ORIGIN,
            &stored,
        ),
        Err(WebAuthnError::SignatureInvalid)
    );
}

#[test]
fn test_signature_is_bound_to_client_data() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 0);
    let assertion = create_assertion(&authenticator, 1);
    // same challenge and origin, different bytes
    let reordered = format!(
        r#"{{"origin":"{TEST_ORIGIN}","type":"webauthn.get","challenge":"{}"}}"#,
        passkey_core::utils::encoding::encode(CHALLENGE)
    );

    assert_eq!(
        TestFixtures::webauthn_service().verify_authentication(
            &assertion.authenticator_data,
            reordered.as_bytes(),
            &assertion.signature,
            CHALLENGE,
            TEST_ORIGIN,
            &stored,
        ),
        Err(WebAuthnError::SignatureInvalid)
    );
}

#[test]
fn test_signature_verification_is_deterministic() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 0);
    let assertion = create_assertion(&authenticator, 0);
    let service = TestFixtures::webauthn_service();

    let first = service.verify_authentication(
        &assertion.authenticator_data,
        &assertion.client_data,
        &assertion.signature,
        CHALLENGE,
        TEST_ORIGIN,
        &stored,
    );
    let second = service.verify_authentication(
        &assertion.authenticator_data,
        &assertion.client_data,
        &assertion.signature,
        CHALLENGE,
        TEST_ORIGIN,
        &stored,
    );
    assert_eq!(first.map(|r| r.sign_count), second.map(|r| r.sign_count));
}

#[test]
fn test_registration_client_data_is_rejected_for_authentication() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 0);
    let assertion = create_assertion(&authenticator, 1);
    let create = client_data_json("webauthn.create", CHALLENGE, TEST_ORIGIN);

    assert_eq!(
        TestFixtures::webauthn_service().verify_authentication(
            &assertion.authenticator_data,
            &create,
            &assertion.signature,
            CHALLENGE,
            TEST_ORIGIN,
            &stored,
        ),
        Err(WebAuthnError::TypeMismatch)
    );
}

#[test]
fn test_truncated_authenticator_data() {
    let authenticator = TestAuthenticator::new();
    let stored = TestFixtures::credential_record(&authenticator, 0);
    let assertion = create_assertion(&authenticator, 1);

    assert_eq!(
        TestFixtures::webauthn_service().verify_authentication(
            &assertion.authenticator_data[..36],
            &assertion.client_data,
            &assertion.signature,
            CHALLENGE,
            TEST_ORIGIN,
            &stored,
        ),
        Err(WebAuthnError::TruncatedInput)
    );
}
