pub mod identity;
pub mod invoice_client;
pub mod metrics;

pub use identity::{IdentityProvider, OAuthIdentityClient};
pub use invoice_client::{FetchError, InvoiceApiClient, InvoiceSource};
