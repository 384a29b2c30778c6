use chrono::Month;
use log::{debug, error, info, warn};

use super::labels::{resolve_labels, BillLabels};
use super::{Attachment, BillEmail};
use crate::calendar::validate_year;
use crate::config::ConfigProvider;
use crate::error::{BillError, Result};
use crate::gmail_query::build_query;
use crate::mail_client::{MailClient, Message, MessagePart};

/// Find the bill emails of `year`/`month` for the requested bills and download
/// their PDF attachments.
///
/// Remote calls run one after the other. Any failure aborts the whole batch.
pub async fn find_bill_emails<M, C, S>(
    mail: &M,
    config: &C,
    bill_names: &[S],
    year: i32,
    month: Month,
) -> Result<Vec<BillEmail>>
where
    M: MailClient + ?Sized,
    C: ConfigProvider + ?Sized,
    S: AsRef<str>,
{
    validate_year(year)?;
    let bill_labels = resolve_labels(mail, config, bill_names).await?;
    if bill_labels.is_empty() {
        info!("No bills requested, nothing to search");
        return Ok(Vec::new());
    }

    let query = build_query(&bill_labels.label_names(), year, month)?;
    info!("Listing emails from Gmail with query: {}", query);
    let summaries = mail
        .search_messages(&query)
        .await
        .map_err(|e| BillError::transport("listing emails", None, e))?;
    debug!("Listed emails: {}", summaries.len());

    let mut result = Vec::with_capacity(summaries.len());
    info!("Fetching {} email(s) from Gmail", summaries.len());
    for summary in &summaries {
        debug!("Fetching email {}", summary.id);
        let message = mail
            .get_message(&summary.id)
            .await
            .map_err(|e| BillError::transport("fetching email", Some(&summary.id), e))?;

        let bill_email = match_message(mail, &bill_labels, message, year, month).await?;
        result.push(bill_email);
    }
    debug!("Fetched emails: {}", result.len());

    Ok(result)
}

async fn match_message<M>(
    mail: &M,
    bill_labels: &BillLabels,
    message: Message,
    year: i32,
    month: Month,
) -> Result<BillEmail>
where
    M: MailClient + ?Sized,
{
    debug!(
        "Determining bill label for email {} (labels: {:?})",
        message.id, message.label_ids
    );
    let matches = bill_labels.matching(&message.label_ids);
    let bill_label = match matches.as_slice() {
        [single] => *single,
        [] => {
            error!(
                "Unexpected email {} - labels {:?} contain none of the bill labels {:?} ({:?})",
                message.id,
                message.label_ids,
                bill_labels.label_ids(),
                bill_labels.label_names()
            );
            return Err(BillError::UnexpectedEmail(message.id));
        }
        several => {
            let bills: Vec<String> = several.iter().map(|l| l.bill_name.clone()).collect();
            error!("Email {} carries labels of several bills: {:?}", message.id, bills);
            return Err(BillError::AmbiguousEmail {
                message_id: message.id,
                bills,
            });
        }
    };

    let (attachment_id, filename) = find_pdf_part(&message)
        .ok_or_else(|| {
            error!("No attachment found in email {}", message.id);
            BillError::NoAttachmentFound(message.id.clone())
        })?;
    debug!(
        "Found pdf attachment {} ({}) in email {}",
        filename, attachment_id, message.id
    );

    let data = mail
        .get_attachment(&message.id, attachment_id)
        .await
        .map_err(|e| BillError::transport("fetching attachment", Some(&message.id), e))?;
    debug!("Attachment {} decoded: {} bytes", filename, data.len());

    Ok(BillEmail {
        bill_name: bill_label.bill_name.clone(),
        label_name: bill_label.label_name.clone(),
        message_id: message.id.clone(),
        year,
        month,
        attachment: Attachment {
            filename: filename.to_string(),
            data,
        },
    })
}

fn is_pdf_candidate(part: &MessagePart) -> bool {
    part.attachment_id.as_deref().is_some_and(|id| !id.is_empty())
        && part.filename.to_ascii_lowercase().ends_with(".pdf")
}

/// First PDF attachment of the message as `(attachment_id, filename)`.
fn find_pdf_part(message: &Message) -> Option<(&str, &str)> {
    let mut candidates = message.parts.iter().filter(|p| is_pdf_candidate(p));
    let first = candidates.next()?;

    let ignored: Vec<&str> = candidates.map(|p| p.filename.as_str()).collect();
    if !ignored.is_empty() {
        warn!(
            "Email {} has several pdf attachments, using {} and ignoring {:?}",
            message.id, first.filename, ignored
        );
    }

    let attachment_id = first.attachment_id.as_deref()?;
    Some((attachment_id, first.filename.as_str()))
}
