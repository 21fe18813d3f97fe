mod common;

use axum::http::StatusCode;
use common::{body_text, sample_invoices, StaticInvoiceSource, TestApp};
use invoice_dashboard::services::FetchError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn position(body: &str, needle: &str) -> usize {
    body.find(needle)
        .unwrap_or_else(|| panic!("{} not rendered", needle))
}

#[tokio::test]
async fn test_dashboard_lists_newest_first_by_default() {
    let app = TestApp::new(StaticInvoiceSource::ok(sample_invoices()));
    let cookie = app.sign_in().await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;

    assert!(position(&body, "INV-2") < position(&body, "INV-3"));
    assert!(position(&body, "INV-3") < position(&body, "INV-1"));
    assert!(body.contains("250.50 RM"));
    assert!(body.contains("Unpaid"));
}

#[tokio::test]
async fn test_month_options_are_most_recent_first() {
    let app = TestApp::new(StaticInvoiceSource::ok(sample_invoices()));
    let cookie = app.sign_in().await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;

    assert!(body.contains("All Months"));
    assert!(position(&body, "value=\"2024-02\"") < position(&body, "value=\"2024-01\""));
}

#[tokio::test]
async fn test_criteria_change_rederives_without_refetch() {
    let source = StaticInvoiceSource::ok(sample_invoices());
    let app = TestApp::new(source.clone());
    let cookie = app.sign_in().await;

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(
        app.get("/dashboard/invoices?order=oldest", Some(&cookie))
            .await,
    )
    .await;
    assert!(position(&body, "INV-1") < position(&body, "INV-3"));
    assert!(position(&body, "INV-3") < position(&body, "INV-2"));

    let body = body_text(
        app.get("/dashboard/invoices?month=2024-01&status=Paid", Some(&cookie))
            .await,
    )
    .await;
    assert!(body.contains("INV-1"));
    assert!(!body.contains("INV-2"));
    assert!(!body.contains("INV-3"));

    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_remounting_dashboard_fetches_again() {
    let source = StaticInvoiceSource::ok(sample_invoices());
    let app = TestApp::new(source.clone());
    let cookie = app.sign_in().await;

    app.get("/dashboard", Some(&cookie)).await;
    app.get("/dashboard", Some(&cookie)).await;

    assert_eq!(source.calls(), 2);
    // The earlier view was unmounted when the new one replaced it
    assert_eq!(app.state.views.len(), 1);
}

#[tokio::test]
async fn test_empty_filter_result_shows_no_invoices_found() {
    let app = TestApp::new(StaticInvoiceSource::ok(sample_invoices()));
    let cookie = app.sign_in().await;
    app.get("/dashboard", Some(&cookie)).await;

    let body = body_text(
        app.get("/dashboard/invoices?status=Overdue", Some(&cookie))
            .await,
    )
    .await;

    assert!(body.contains("No invoices found"));
    assert!(!body.contains("<table"));
}

#[tokio::test]
async fn test_whatsapp_link_uses_phone_digits() {
    let app = TestApp::new(StaticInvoiceSource::ok(sample_invoices()));
    let cookie = app.sign_in().await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;

    assert!(body.contains("https://wa.me/60123456789"));
    assert!(body.contains("https://wa.me/0128881234"));
    // INV-3 has no phone digits, so only two invoices carry a link in
    // each of the table and the cards
    assert_eq!(body.matches("https://wa.me/").count(), 4);
}

#[tokio::test]
async fn test_fetch_failure_shows_message_instead_of_table() {
    let source = StaticInvoiceSource::failing(|| FetchError::PayloadNotArray);
    let app = TestApp::new(source.clone());
    let cookie = app.sign_in().await;

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Invalid API response format"));
    assert!(!body.contains("<table"));
    assert!(!body.contains("No invoices found"));

    // Failed is terminal: changing criteria does not retry
    let body = body_text(
        app.get("/dashboard/invoices?order=oldest", Some(&cookie))
            .await,
    )
    .await;
    assert!(body.contains("Invalid API response format"));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_transport_failure_message() {
    let source = StaticInvoiceSource::failing(|| {
        FetchError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY)
    });
    let app = TestApp::new(source);
    let cookie = app.sign_in().await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;
    assert!(body.contains("Failed to fetch invoice data"));
}

#[tokio::test]
async fn test_slow_fetch_renders_loading_then_ready() {
    let gate = Arc::new(Notify::new());
    let source = StaticInvoiceSource::gated(sample_invoices(), gate.clone());
    let app = TestApp::with_options(source.clone(), None, 0);
    let cookie = app.sign_in().await;

    let body = body_text(app.get("/dashboard?order=oldest", Some(&cookie)).await).await;
    assert!(body.contains("Loading..."));
    assert!(body.contains("http-equiv=\"refresh\""));
    assert!(!body.contains("INV-1"));

    gate.notify_one();

    let mut rendered = String::new();
    for _ in 0..50 {
        rendered = body_text(
            app.get("/dashboard/invoices?order=oldest", Some(&cookie))
                .await,
        )
        .await;
        if !rendered.contains("Loading...") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(position(&rendered, "INV-1") < position(&rendered, "INV-2"));
    assert_eq!(source.calls(), 1);
}
