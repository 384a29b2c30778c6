// Library exports for billsweep crate
// This allows tests and the binary to use the modules

pub mod calendar;
pub mod config;
pub mod error;
pub mod gmail_client;
pub mod gmail_query;
pub mod mail_client;
pub mod orchestrator;

// Gmail label matching and attachment download
pub mod bill_email;

// PDF conversion pipeline
pub mod pdf;

pub use bill_email::{find_bill_emails, resolve_labels, Attachment, BillEmail, BillLabel, BillLabels};
pub use config::{BillConfig, Config, ConfigProvider};
pub use error::{BillError, Result};
pub use mail_client::MailClient;
pub use orchestrator::BillWriter;
pub use pdf::BillConverter;
