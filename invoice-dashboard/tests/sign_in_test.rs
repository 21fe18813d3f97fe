mod common;

use axum::http::StatusCode;
use common::{body_text, location, StaticInvoiceSource, TestApp, GOOD_CODE};

fn app() -> TestApp {
    TestApp::new(StaticInvoiceSource::ok(Vec::new()))
}

#[tokio::test]
async fn test_login_redirects_to_provider_with_pkce() {
    let app = app();
    let response = app.post("/login", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = location(&response);
    assert!(common::query_param(&location, "state").is_some());
    assert!(common::query_param(&location, "code_challenge").is_some());
}

#[tokio::test]
async fn test_callback_with_mismatched_state_fails() {
    let app = app();
    let (cookie, _state) = app.begin_sign_in().await;

    let callback = format!("/auth/callback?code={}&state=forged", GOOD_CODE);
    let response = app.get(&callback, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=sign_in_failed");

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_cancelled_sign_in_returns_quietly_to_public_view() {
    let app = app();
    let (cookie, state) = app.begin_sign_in().await;

    let callback = format!(
        "/auth/callback?error=access_denied&error_description=user+cancelled&state={}",
        state
    );
    let response = app.get(&callback, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_callback_without_pending_sign_in_fails() {
    let app = app();
    let response = app
        .get("/auth/callback?code=good-code&state=anything", None)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=sign_in_failed");
}

#[tokio::test]
async fn test_callback_cannot_be_replayed() {
    let app = app();
    let (cookie, state) = app.begin_sign_in().await;
    let callback = format!("/auth/callback?code=bad-code&state={}", state);

    let first = app.get(&callback, Some(&cookie)).await;
    assert_eq!(location(&first), "/?error=sign_in_failed");

    // The pending sign-in was consumed, so a retry with the right code
    // still fails
    let callback = format!("/auth/callback?code={}&state={}", GOOD_CODE, state);
    let second = app.get(&callback, Some(&cookie)).await;
    assert_eq!(location(&second), "/?error=sign_in_failed");
}

#[tokio::test]
async fn test_successful_sign_in_grants_dashboard() {
    let app = app();
    let cookie = app.sign_in().await;

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No invoices found"));
}

#[tokio::test]
async fn test_public_view_shows_failure_notice_and_signed_in_state() {
    let app = app();

    let body = body_text(app.get("/?error=sign_in_failed", None).await).await;
    assert!(body.contains("Sign-in failed"));

    let body = body_text(app.get("/?error=%3Cscript%3E", None).await).await;
    assert!(!body.contains("Sign-in failed"));
    assert!(!body.contains("<script>"));

    let cookie = app.sign_in().await;
    let body = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(body.contains("Signed in as Ada Lovelace"));
    assert!(body.contains("href=\"/dashboard\""));
}
