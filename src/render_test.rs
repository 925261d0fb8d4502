use super::*;
use crate::supabase::mock::test_user;

#[test]
fn escape_html_specials() {
    assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    assert_eq!(escape("{{EMAIL}}"), "&#123;&#123;EMAIL}}");
}

#[test]
fn every_placeholder_is_filled() {
    let pages = [
        home(None, Alert::None).0,
        home(Some(&test_user()), Alert::Error("x")).0,
        dashboard(&test_user()).0,
        login("", None, None, Alert::None).0,
        signup(&SignUpForm::default(), None, Alert::None).0,
        verify(None, 0, Alert::None).0,
        callback_shell().0,
        callback_result(Ok(())).0,
        callback_result(Err("nope")).0,
    ];
    for html in pages {
        assert!(!html.contains("{{"), "{html}");
    }
}

#[test]
fn home_offers_google_when_signed_out() {
    assert!(home(None, Alert::None).0.contains("/auth/google"));
    let signed_in = home(Some(&test_user()), Alert::None).0;
    assert!(signed_in.contains("ada@example.com"));
    assert!(signed_in.contains("/auth/logout"));
}

#[test]
fn home_shows_error_alert() {
    assert!(home(None, Alert::Error("Invalid Refresh Token")).0.contains("Invalid Refresh Token"));
}

#[test]
fn dashboard_greets_by_name() {
    assert!(dashboard(&test_user()).0.contains("Welcome, Ada Lovelace."));
}

#[test]
fn login_renders_errors_and_escapes_input() {
    let form = crate::forms::LoginForm::default();
    let errors = form.validate().unwrap_err();
    let html = login("<script>", Some("/dashboard/x"), Some(&errors), Alert::Error("Invalid login credentials")).0;
    assert!(html.contains("Password is required"));
    assert!(html.contains("Invalid login credentials"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains(r#"value="/dashboard/x""#));
}

#[test]
fn signup_never_echoes_password() {
    let form = SignUpForm { password: "Secret123".into(), confirm_password: "Secret123".into(), ..SignUpForm::default() };
    let html = signup(&form, None, Alert::Success(SIGN_UP_SUCCESS)).0;
    assert!(!html.contains("Secret123"));
    assert!(html.contains(SIGN_UP_SUCCESS));
}

#[test]
fn verify_shows_countdown_and_disables_resend() {
    let html = verify(Some("ada@example.com"), 299, Alert::None).0;
    assert!(html.contains("04:59"));
    assert!(html.contains("Resend available in 04:59"));
    assert!(html.contains(" disabled>"));

    let ready = verify(Some("ada@example.com"), 0, Alert::None).0;
    assert!(ready.contains("Resend email"));
    assert!(!ready.contains(" disabled>"));
}

#[test]
fn verify_without_email_uses_placeholder() {
    assert!(verify(None, 0, Alert::None).0.contains("We sent a verification link to your email."));
}

#[test]
fn callback_success_refreshes_to_dashboard() {
    let html = callback_result(Ok(())).0;
    assert!(html.contains(r#"content="0.5;url=/dashboard""#));
    assert!(html.contains("Authentication successful"));
}

#[test]
fn callback_failure_offers_back_to_login() {
    let html = callback_result(Err("Missing email for verification.")).0;
    assert!(html.contains("We couldn’t complete the sign-in. Missing email for verification."));
    assert!(html.contains("Back to login"));
    assert!(!html.contains("http-equiv"));
}

#[test]
fn callback_shell_posts_href() {
    let html = callback_shell().0;
    assert!(html.contains(r#"action="/auth/callback""#));
    assert!(html.contains("window.location.href"));
}
