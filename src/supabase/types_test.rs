use super::*;

#[test]
fn verify_type_parses_every_provider_kind() {
    for (raw, kind) in [
        ("signup", VerifyType::Signup),
        ("invite", VerifyType::Invite),
        ("magiclink", VerifyType::Magiclink),
        ("recovery", VerifyType::Recovery),
        ("email_change", VerifyType::EmailChange),
    ] {
        assert_eq!(raw.parse::<VerifyType>(), Ok(kind));
        assert_eq!(kind.as_str(), raw);
    }
}

#[test]
fn verify_type_rejects_unknown_kind() {
    let err = "sms".parse::<VerifyType>().unwrap_err();
    assert_eq!(err, "Unsupported verification type: sms");
}

#[test]
fn token_response_computes_missing_expires_at() {
    let body = serde_json::json!({
        "access_token": "at",
        "refresh_token": "rt",
        "expires_in": 3600,
        "user": { "id": "00000000-0000-0000-0000-000000000001", "email": "a@b.co" }
    });
    let resp: TokenResponse = serde_json::from_value(body).unwrap();
    let session = resp.into_session(1_000);
    assert_eq!(session.expires_at, 4_600);
    assert_eq!(session.token_type, "bearer");
    assert_eq!(session.user.email.as_deref(), Some("a@b.co"));
    assert!(session.user.user_metadata.is_null());
}

#[test]
fn token_response_keeps_provider_expires_at() {
    let body = serde_json::json!({
        "access_token": "at",
        "refresh_token": "rt",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 99,
        "user": { "id": "00000000-0000-0000-0000-000000000001" }
    });
    let resp: TokenResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.into_session(1_000).expires_at, 99);
}

#[test]
fn session_expiry_margin() {
    let body = serde_json::json!({
        "access_token": "at",
        "refresh_token": "rt",
        "expires_in": 3600,
        "expires_at": 1_000,
        "user": { "id": "00000000-0000-0000-0000-000000000001" }
    });
    let session = serde_json::from_value::<TokenResponse>(body).unwrap().into_session(0);
    assert!(session.expires_within(950, 90));
    assert!(!session.expires_within(800, 90));
}

#[test]
fn auth_error_displays_provider_message_verbatim() {
    let err = AuthError::Api { status: 400, code: Some("invalid_credentials".into()), message: "Invalid login credentials".into() };
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert_eq!(err.status(), Some(400));
    assert_eq!(AuthError::SessionMissing.status(), None);
}

#[test]
fn user_metadata_lookup() {
    let user: User = serde_json::from_value(serde_json::json!({
        "id": "00000000-0000-0000-0000-000000000001",
        "user_metadata": { "first_name": "Ada" }
    }))
    .unwrap();
    assert_eq!(user.metadata_str("first_name"), Some("Ada"));
    assert_eq!(user.metadata_str("last_name"), None);
}
