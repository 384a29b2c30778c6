//! Bill conversion pipeline: decrypt, optional watermark, page trim, emit.

pub mod document;
pub mod watermark;

use std::io::{Read, Write};

use log::{debug, info};
use lopdf::Document;

use crate::config::{BillConfig, ConfigProvider};
use crate::error::{BillError, Result};

/// In-document transformation applied after decryption, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Watermark { text: String },
    TrimPages { keep: u32 },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Watermark { .. } => "watermark",
            Step::TrimPages { .. } => "trim pages",
        }
    }
}

/// Conversion recipe of one bill.
///
/// Watermarking runs before trimming so page 1 is the first page of the decrypted input.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub bill_name: String,
    pub password: String,
    pub steps: Vec<Step>,
}

impl ConversionPlan {
    pub fn for_bill(bill_name: &str, bill: &BillConfig) -> Result<Self> {
        let mut steps = Vec::new();

        if let Some(text) = bill.watermark.as_deref().filter(|t| !t.trim().is_empty()) {
            steps.push(Step::Watermark {
                text: text.to_string(),
            });
        }

        match bill.keep_pages {
            Some(0) => {
                return Err(BillError::InvalidPageRange {
                    bill: bill_name.to_string(),
                    reason: "keep_pages is 0, which would remove every page".to_string(),
                })
            }
            Some(keep) => steps.push(Step::TrimPages { keep }),
            None => {}
        }

        Ok(ConversionPlan {
            bill_name: bill_name.to_string(),
            password: bill.password.clone(),
            steps,
        })
    }

    /// Stage names in execution order, including decrypt and emit.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = vec!["decrypt"];
        names.extend(self.steps.iter().map(Step::name));
        names.push("emit");
        names
    }

    /// Run the plan on `input`. The input is never modified and nothing is
    /// returned unless every stage succeeded.
    pub fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        info!("Removing password from bill {}", self.bill_name);
        let mut doc = document::load_decrypted(input, &self.password).map_err(|e| {
            BillError::DecryptionFailed {
                bill: self.bill_name.clone(),
                source: e.into(),
            }
        })?;

        let pages = document::page_count(&doc);
        if pages == 0 {
            return Err(BillError::InvalidPageRange {
                bill: self.bill_name.clone(),
                reason: "document has no pages".to_string(),
            });
        }
        debug!("Decrypted bill {} has {} page(s)", self.bill_name, pages);

        for step in &self.steps {
            doc = self.apply(step, doc)?;
        }

        info!("Writing bill output for {}", self.bill_name);
        document::save_to_vec(&mut doc).map_err(|e| self.stage_error("emit", e))
    }

    fn apply(&self, step: &Step, mut doc: Document) -> Result<Document> {
        match step {
            Step::Watermark { text } => {
                info!("Writing additional text in bill {}", self.bill_name);
                watermark::stamp_first_page(&mut doc, text)
                    .map_err(|e| self.stage_error(step.name(), e))?;
            }
            Step::TrimPages { keep } => {
                info!("Removing unnecessary pages from bill {}", self.bill_name);
                let removed = document::trim_pages(&mut doc, *keep);
                debug!("Removed {} page(s) from bill {}", removed, self.bill_name);
            }
        }
        Ok(doc)
    }

    fn stage_error(&self, stage: &'static str, source: anyhow::Error) -> BillError {
        BillError::Pdf {
            bill: self.bill_name.clone(),
            stage,
            source: source.into(),
        }
    }
}

/// Converts downloaded bills according to their configuration.
pub struct BillConverter<'a, C: ConfigProvider + ?Sized> {
    config: &'a C,
}

impl<'a, C: ConfigProvider + ?Sized> BillConverter<'a, C> {
    pub fn new(config: &'a C) -> Self {
        BillConverter { config }
    }

    pub fn plan(&self, bill_name: &str) -> Result<ConversionPlan> {
        let (name, bill) = self.config.bill_config(bill_name)?;
        ConversionPlan::for_bill(name, bill)
    }

    pub fn convert_bytes(&self, bill_name: &str, input: &[u8]) -> Result<Vec<u8>> {
        self.plan(bill_name)?.run(input)
    }

    /// Read the whole input, convert it, then write the result to `output`.
    ///
    /// Nothing reaches `output` when a stage fails.
    pub fn convert<R: Read, W: Write>(&self, bill_name: &str, mut input: R, mut output: W) -> Result<()> {
        let plan = self.plan(bill_name)?;

        let mut buffer = Vec::new();
        input
            .read_to_end(&mut buffer)
            .map_err(|e| plan.stage_error("read", e.into()))?;

        let converted = plan.run(&buffer)?;
        output
            .write_all(&converted)
            .and_then(|_| output.flush())
            .map_err(|e| plan.stage_error("emit", e.into()))
    }
}
