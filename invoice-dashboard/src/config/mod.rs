use secrecy::Secret;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub identity: IdentitySettings,
    pub invoice_api: InvoiceApiSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_session_inactivity_hours")]
    pub session_inactivity_hours: i64,
}

fn default_static_dir() -> String {
    "invoice-dashboard/static".to_string()
}

fn default_session_inactivity_hours() -> i64 {
    24
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: default_static_dir(),
            secure_cookie: false,
            session_inactivity_hours: default_session_inactivity_hours(),
        }
    }
}

/// OAuth 2.0 / OpenID Connect client registration at the identity provider.
#[derive(Deserialize, Clone)]
pub struct IdentitySettings {
    pub client_id: String,
    /// Tenant authority, e.g. `https://login.microsoftonline.com/<tenant-id>`.
    pub authority: String,
    /// Must match a redirect URI registered for the client; points at
    /// `/auth/callback`.
    pub redirect_uri: String,
    /// Only confidential clients have one.
    #[serde(default)]
    pub client_secret: Option<Secret<String>>,
    #[serde(default = "default_scopes")]
    pub scopes: BTreeSet<String>,
    /// Where the provider sends the browser after ending its session.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    #[serde(default = "default_identity_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scopes() -> BTreeSet<String> {
    BTreeSet::from(["User.Read".to_string()])
}

fn default_identity_timeout_secs() -> u64 {
    10
}

#[derive(Deserialize, Clone, Debug)]
pub struct InvoiceApiSettings {
    pub url: String,
    #[serde(default = "default_invoice_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_invoice_timeout_secs() -> u64 {
    10
}

impl InvoiceApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DashboardSettings {
    /// How long mounting waits for the fetch before rendering "Loading".
    #[serde(default = "default_first_paint_wait_ms")]
    pub first_paint_wait_ms: u64,
    /// Mounted views untouched for this long are discarded.
    #[serde(default = "default_view_idle_minutes")]
    pub view_idle_minutes: u64,
}

fn default_first_paint_wait_ms() -> u64 {
    1500
}

fn default_view_idle_minutes() -> u64 {
    60
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            first_paint_wait_ms: default_first_paint_wait_ms(),
            view_idle_minutes: default_view_idle_minutes(),
        }
    }
}

impl DashboardSettings {
    pub fn first_paint_wait(&self) -> Duration {
        Duration::from_millis(self.first_paint_wait_ms)
    }

    pub fn view_idle(&self) -> Duration {
        Duration::from_secs(self.view_idle_minutes * 60)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC collector. Spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_service_name() -> String {
    "invoice-dashboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

/// Deployment environment, selected with `APP_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;

    // Support running from the workspace root or from inside the crate
    let configuration_directory = if base_path.ends_with("invoice-dashboard") {
        base_path.join("config")
    } else {
        base_path.join("invoice-dashboard").join("config")
    };

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(true),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
