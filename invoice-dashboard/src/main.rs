use dotenvy::dotenv;
use invoice_dashboard::config::get_configuration;
use invoice_dashboard::pipeline::views::spawn_idle_sweeper;
use invoice_dashboard::services::{InvoiceApiClient, OAuthIdentityClient};
use invoice_dashboard::startup::build_router;
use invoice_dashboard::AppState;
use service_core::observability::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let telemetry = &configuration.telemetry;
    init_tracing(
        &telemetry.service_name,
        &telemetry.log_level,
        telemetry.otlp_endpoint.as_deref(),
    )?;

    invoice_dashboard::services::metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    let identity = Arc::new(OAuthIdentityClient::new(configuration.identity.clone())?);
    let invoices = Arc::new(InvoiceApiClient::new(configuration.invoice_api.clone())?);
    info!(invoice_api = %invoices.url(), "Invoice API configured");

    let state = AppState::new(
        identity,
        invoices,
        configuration.identity.scopes.clone(),
        configuration.dashboard.clone(),
        configuration.server.clone(),
    );

    spawn_idle_sweeper(state.views.clone(), configuration.dashboard.view_idle());

    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting invoice-dashboard on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
