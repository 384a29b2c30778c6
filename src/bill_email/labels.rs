use std::collections::HashMap;

use log::{debug, info};

use crate::config::ConfigProvider;
use crate::error::{BillError, Result};
use crate::mail_client::{Label, MailClient};

/// A configured bill tied to the Gmail label its emails carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLabel {
    pub bill_name: String,
    pub label_id: String,
    pub label_name: String,
}

/// Resolved labels in request order, one per bill.
#[derive(Debug, Clone, Default)]
pub struct BillLabels(Vec<BillLabel>);

impl BillLabels {
    pub fn label_names(&self) -> Vec<&str> {
        self.0.iter().map(|l| l.label_name.as_str()).collect()
    }

    pub fn label_ids(&self) -> Vec<&str> {
        self.0.iter().map(|l| l.label_id.as_str()).collect()
    }

    pub fn find_by_id(&self, label_id: &str) -> Option<&BillLabel> {
        self.0.iter().find(|l| l.label_id == label_id)
    }

    pub fn get(&self, bill_name: &str) -> Option<&BillLabel> {
        self.0.iter().find(|l| l.bill_name == bill_name)
    }

    /// Every bill whose label is among a message's label ids, without duplicates.
    pub fn matching<'a, S: AsRef<str>>(&'a self, label_ids: &[S]) -> Vec<&'a BillLabel> {
        let mut found: Vec<&BillLabel> = Vec::new();
        for id in label_ids {
            for label in self.0.iter().filter(|l| l.label_id == id.as_ref()) {
                if !found.iter().any(|f| f.bill_name == label.bill_name) {
                    found.push(label);
                }
            }
        }
        found
    }

    pub fn iter(&self) -> impl Iterator<Item = &BillLabel> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Map each requested bill to its Gmail label.
///
/// The label catalog is listed once. Either every bill resolves or the call
/// fails with no partial result.
pub async fn resolve_labels<M, C, S>(mail: &M, config: &C, bill_names: &[S]) -> Result<BillLabels>
where
    M: MailClient + ?Sized,
    C: ConfigProvider + ?Sized,
    S: AsRef<str>,
{
    // Configuration problems surface before any remote call
    let mut wanted: Vec<(String, String)> = Vec::with_capacity(bill_names.len());
    for requested in bill_names {
        let (name, bill) = config.bill_config(requested.as_ref())?;
        if wanted.iter().any(|(seen, _)| seen == name) {
            debug!("Bill {} requested more than once", name);
            continue;
        }
        debug!("Label identified for {}: {}", name, bill.label);
        wanted.push((name.to_string(), bill.label.clone()));
    }

    info!("Listing labels from Gmail");
    let catalog = mail
        .list_labels()
        .await
        .map_err(|e| BillError::transport("listing labels", None, e))?;
    debug!("Listed labels: {}", catalog.len());

    let by_name: HashMap<&str, &Label> = catalog.iter().map(|l| (l.name.as_str(), l)).collect();

    let mut resolved: Vec<BillLabel> = Vec::with_capacity(wanted.len());
    for (bill_name, label_name) in wanted {
        let label = by_name
            .get(label_name.as_str())
            .copied()
            .or_else(|| catalog.iter().find(|l| l.name.eq_ignore_ascii_case(&label_name)))
            .ok_or_else(|| BillError::LabelNotFound(label_name.clone()))?;

        // A shared label could not tell the bills' emails apart
        if let Some(other) = resolved.iter().find(|r| r.label_id == label.id) {
            return Err(BillError::InvalidConfig {
                bill: bill_name,
                reason: format!("label {:?} is also used by bill {}", label.name, other.bill_name),
            });
        }

        resolved.push(BillLabel {
            bill_name,
            label_id: label.id.clone(),
            label_name: label.name.clone(),
        });
    }
    debug!("Filtered labels: {}", resolved.len());

    Ok(BillLabels(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BillConfig, Config};
    use crate::mail_client::InMemoryMailClient;

    fn config() -> Config {
        let bill = |label: &str| BillConfig {
            label: label.to_string(),
            ..BillConfig::default()
        };
        Config::from_bills(
            "/tmp/bills",
            [("airtel", bill("Postpaid Bill / Airtel")), ("jio", bill("Jio"))],
        )
        .unwrap()
    }

    fn mailbox() -> InMemoryMailClient {
        InMemoryMailClient::new()
            .with_label("INBOX", "INBOX")
            .with_label("Label_1", "Postpaid Bill / Airtel")
            .with_label("Label_2", "jio")
    }

    #[tokio::test]
    async fn test_resolve_labels_keeps_request_order() {
        let mail = mailbox();
        let labels = resolve_labels(&mail, &config(), &["Jio", "AIRTEL"]).await.unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels.label_names(), vec!["jio", "Postpaid Bill / Airtel"]);
        assert_eq!(labels.label_ids(), vec!["Label_2", "Label_1"]);
        assert_eq!(labels.find_by_id("Label_1").unwrap().bill_name, "airtel");
        assert_eq!(mail.label_list_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_label_fails_whole_resolution() {
        let mail = InMemoryMailClient::new().with_label("Label_2", "Jio");
        let err = resolve_labels(&mail, &config(), &["jio", "airtel"]).await.unwrap_err();

        assert!(matches!(err, BillError::LabelNotFound(name) if name == "Postpaid Bill / Airtel"));
    }

    #[tokio::test]
    async fn test_unknown_bill_fails_before_remote_call() {
        let mail = mailbox();
        let err = resolve_labels(&mail, &config(), &["airtel", "bsnl"]).await.unwrap_err();

        assert!(matches!(err, BillError::BillNotConfigured(name) if name == "bsnl"));
        assert_eq!(mail.label_list_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_bills_collapse() {
        let mail = mailbox();
        let labels = resolve_labels(&mail, &config(), &["airtel", "Airtel"]).await.unwrap();
        assert_eq!(labels.len(), 1);
    }

    #[tokio::test]
    async fn test_bills_sharing_a_label_are_rejected() {
        let bill = |password: &str| BillConfig {
            label: "Telecom".to_string(),
            password: password.to_string(),
            ..BillConfig::default()
        };
        let config =
            Config::from_bills("/tmp/bills", [("airtel", bill("a")), ("jio", bill("j"))]).unwrap();
        let mail = InMemoryMailClient::new().with_label("L1", "Telecom");

        let err = resolve_labels(&mail, &config, &["airtel", "jio"]).await.unwrap_err();
        match err {
            BillError::InvalidConfig { bill, reason } => {
                assert_eq!(bill, "jio");
                assert!(reason.contains("airtel"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Either bill alone is fine
        let labels = resolve_labels(&mail, &config, &["jio"]).await.unwrap();
        assert_eq!(labels.label_ids(), vec!["L1"]);
    }

    #[test]
    fn test_matching_labels() {
        let labels = BillLabels(vec![
            BillLabel {
                bill_name: "airtel".into(),
                label_id: "Label_1".into(),
                label_name: "Airtel".into(),
            },
            BillLabel {
                bill_name: "jio".into(),
                label_id: "Label_2".into(),
                label_name: "Jio".into(),
            },
        ]);

        assert!(labels.matching(&["INBOX", "UNREAD"]).is_empty());
        assert_eq!(labels.matching(&["INBOX", "Label_2"])[0].bill_name, "jio");
        assert_eq!(labels.matching(&["Label_1", "Label_2"]).len(), 2);

        let shared = BillLabels(vec![
            BillLabel {
                bill_name: "airtel".into(),
                label_id: "L1".into(),
                label_name: "Telecom".into(),
            },
            BillLabel {
                bill_name: "jio".into(),
                label_id: "L1".into(),
                label_name: "Telecom".into(),
            },
        ]);
        let bills: Vec<&str> = shared.matching(&["L1"]).iter().map(|l| l.bill_name.as_str()).collect();
        assert_eq!(bills, vec!["airtel", "jio"]);
    }
}
