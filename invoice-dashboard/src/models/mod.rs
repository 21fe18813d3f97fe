pub mod account;
pub mod invoice;

pub use account::{CurrentAccount, SignedInAccount};
pub use invoice::{status_label, Invoice, InvoiceStatus};
