// End-to-end tests for the passkey service over in-memory stores
use passkey_core::passkey::{CredentialStore, PasskeyError, StoreError};
use passkey_core::testing::constants::{TEST_DISPLAY_NAME, TEST_ORIGIN, TEST_OWNER, TEST_RP_ID};
use passkey_core::testing::{
    client_data_json, AttestationObjectBuilder, AuthenticatorDataBuilder, TestAuthenticator,
    TestFixtures,
};
use passkey_core::utils::encoding;
use passkey_core::webauthn::crypto::signed_message;
use passkey_core::webauthn::transport::PUBLIC_KEY_TYPE;
use passkey_core::webauthn::{
    AssertionResponse, AttestationResponse, CredentialResponse, PublicKeyCredential, WebAuthnError,
};

fn registration_credential(authenticator: &TestAuthenticator, challenge: &str) -> PublicKeyCredential {
    let challenge = encoding::decode(challenge).unwrap();
    let client_data = client_data_json("webauthn.create", &challenge, TEST_ORIGIN);
    let attestation_object = AttestationObjectBuilder::packed_self(TEST_RP_ID, &client_data)
        .with_authenticator(TEST_RP_ID, authenticator)
        .build();

    PublicKeyCredential {
        id: encoding::encode(&authenticator.credential_id()),
        raw_id: authenticator.credential_id(),
        credential_type: PUBLIC_KEY_TYPE.to_string(),
        response: CredentialResponse::Attestation(AttestationResponse {
            client_data_json: client_data,
            attestation_object,
            transports: Some(vec!["internal".to_string()]),
            public_key: None,
            public_key_algorithm: None,
            authenticator_data: None,
        }),
        authenticator_attachment: Some("platform".to_string()),
        client_extension_results: None,
    }
}

fn assertion_credential(
    authenticator: &TestAuthenticator,
    challenge: &str,
    sign_count: u32,
) -> PublicKeyCredential {
    let challenge = encoding::decode(challenge).unwrap();
    let client_data = client_data_json("webauthn.get", &challenge, TEST_ORIGIN);
    let authenticator_data = AuthenticatorDataBuilder::new(TEST_RP_ID)
        .with_sign_count(sign_count)
        .build();
    let signature = authenticator.sign(&signed_message(&authenticator_data, &client_data));

    PublicKeyCredential {
        id: encoding::encode(&authenticator.credential_id()),
        raw_id: authenticator.credential_id(),
        credential_type: PUBLIC_KEY_TYPE.to_string(),
        response: CredentialResponse::Assertion(AssertionResponse {
            client_data_json: client_data,
            authenticator_data,
            signature,
            user_handle: None,
        }),
        authenticator_attachment: None,
        client_extension_results: None,
    }
}

#[test]
fn test_register_then_authenticate() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();

    let options = service
        .begin_registration("session-1", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    assert!(options.exclude_credentials.is_empty());
    let record = service
        .finish_registration("session-1", &registration_credential(&authenticator, &options.challenge))
        .unwrap();
    assert_eq!(record.owner, TEST_OWNER);
    assert_eq!(record.sign_count, 0);

    let options = service
        .begin_authentication("session-1", Some(TEST_OWNER))
        .unwrap();
    assert_eq!(options.allow_credentials.len(), 1);
    assert_eq!(options.allow_credentials[0].id, record.credential_id_b64());

    let updated = service
        .finish_authentication(
            "session-1",
            &assertion_credential(&authenticator, &options.challenge, 5),
        )
        .unwrap();
    assert_eq!(updated.sign_count, 5);

    let stored = service
        .credentials()
        .get(&authenticator.credential_id())
        .unwrap()
        .unwrap();
    assert_eq!(stored.sign_count, 5);
    assert!(stored.last_used.is_some());
}

#[test]
fn test_usernameless_authentication() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    service
        .finish_registration("s", &registration_credential(&authenticator, &options.challenge))
        .unwrap();

    let options = service.begin_authentication("s", None).unwrap();
    assert!(options.allow_credentials.is_empty());
    let updated = service
        .finish_authentication("s", &assertion_credential(&authenticator, &options.challenge, 1))
        .unwrap();
    assert_eq!(updated.sign_count, 1);
}

#[test]
fn test_challenge_is_single_use() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    service
        .finish_registration("s", &registration_credential(&authenticator, &options.challenge))
        .unwrap();

    let options = service.begin_authentication("s", Some(TEST_OWNER)).unwrap();
    let credential = assertion_credential(&authenticator, &options.challenge, 1);
    service.finish_authentication("s", &credential).unwrap();

    assert_eq!(
        service.finish_authentication("s", &credential),
        Err(PasskeyError::ChallengeNotFound)
    );
}

#[test]
fn test_unknown_session_and_wrong_ceremony() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();

    assert_eq!(
        service.finish_registration("missing", &registration_credential(&authenticator, "AAAA")),
        Err(PasskeyError::ChallengeNotFound)
    );

    // an authentication challenge cannot finish a registration
    let options = service.begin_authentication("s", None).unwrap();
    assert_eq!(
        service.finish_registration("s", &registration_credential(&authenticator, &options.challenge)),
        Err(PasskeyError::ChallengeNotFound)
    );
}

#[test]
fn test_replayed_counter_is_clone_warning() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    service
        .finish_registration("s", &registration_credential(&authenticator, &options.challenge))
        .unwrap();

    let options = service.begin_authentication("s", Some(TEST_OWNER)).unwrap();
    service
        .finish_authentication("s", &assertion_credential(&authenticator, &options.challenge, 3))
        .unwrap();

    let options = service.begin_authentication("s", Some(TEST_OWNER)).unwrap();
    let err = service
        .finish_authentication("s", &assertion_credential(&authenticator, &options.challenge, 3))
        .unwrap_err();
    assert_eq!(err.kind(), Some(&WebAuthnError::PossibleCloneDetected));

    // the stored counter is left untouched
    let stored = service
        .credentials()
        .get(&authenticator.credential_id())
        .unwrap()
        .unwrap();
    assert_eq!(stored.sign_count, 3);
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();

    for session in ["first", "second"] {
        let options = service
            .begin_registration(session, TEST_OWNER, TEST_DISPLAY_NAME)
            .unwrap();
        let result = service.finish_registration(
            session,
            &registration_credential(&authenticator, &options.challenge),
        );
        if session == "first" {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(PasskeyError::Store(StoreError::Duplicate(_)))
            ));
        }
    }

    let options = service
        .begin_registration("third", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    assert_eq!(options.exclude_credentials.len(), 1);
}

#[test]
fn test_unknown_credential() {
    let service = TestFixtures::passkey_service();
    let registered = TestAuthenticator::new();
    let stranger = TestAuthenticator::other();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    service
        .finish_registration("s", &registration_credential(&registered, &options.challenge))
        .unwrap();

    // not offered in allowCredentials
    let options = service.begin_authentication("s", Some(TEST_OWNER)).unwrap();
    let err = service
        .finish_authentication("s", &assertion_credential(&stranger, &options.challenge, 1))
        .unwrap_err();
    assert_eq!(err.kind(), Some(&WebAuthnError::UnknownCredential));

    // not on file at all
    let options = service.begin_authentication("s", None).unwrap();
    let err = service
        .finish_authentication("s", &assertion_credential(&stranger, &options.challenge, 1))
        .unwrap_err();
    assert_eq!(err.kind(), Some(&WebAuthnError::UnknownCredential));
}

#[test]
fn test_mismatched_raw_id_is_invalid_request() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();
    let mut credential = registration_credential(&authenticator, &options.challenge);
    credential.raw_id = b"some-other-id".to_vec();
    credential.id = encoding::encode(&credential.raw_id);

    assert!(matches!(
        service.finish_registration("s", &credential),
        Err(PasskeyError::InvalidRequest(_))
    ));
}

#[test]
fn test_assertion_posted_to_registration_is_invalid_request() {
    let service = TestFixtures::passkey_service();
    let authenticator = TestAuthenticator::new();
    let options = service
        .begin_registration("s", TEST_OWNER, TEST_DISPLAY_NAME)
        .unwrap();

    assert!(matches!(
        service.finish_registration("s", &assertion_credential(&authenticator, &options.challenge, 0)),
        Err(PasskeyError::InvalidRequest(_))
    ));
}
