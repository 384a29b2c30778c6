pub mod labels;
pub mod matcher;

use chrono::Month;

// Re-export commonly used items
pub use labels::{resolve_labels, BillLabel, BillLabels};
pub use matcher::find_bill_emails;

/// PDF attachment pulled out of a bill email.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// One matched message for a bill in a given month.
#[derive(Debug, Clone)]
pub struct BillEmail {
    pub bill_name: String,
    pub label_name: String,
    pub message_id: String,
    pub year: i32,
    pub month: Month,
    pub attachment: Attachment,
}
