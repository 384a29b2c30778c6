//! Single-purpose operations on a loaded PDF document.

use anyhow::{anyhow, Context, Result};
use log::debug;
use lopdf::Document;

/// Load `input` and remove its password protection.
///
/// An unprotected document loads as is, whatever the password. A document
/// with only an owner password opens with the empty password.
pub fn load_decrypted(input: &[u8], password: &str) -> Result<Document> {
    // lopdf only loads the objects of an encrypted file when it can authenticate
    let mut doc = Document::load_mem_with_password(input, password).map_err(|e| match e {
        lopdf::Error::InvalidPassword => anyhow!("Invalid password for PDF"),
        other => anyhow::Error::new(other).context("Unable to parse PDF"),
    })?;

    if doc.was_encrypted() {
        debug!("Document was encrypted, objects decrypted while loading");
    }
    // Output must never carry an encryption dictionary
    doc.trailer.remove(b"Encrypt");
    doc.encryption_state = None;

    Ok(doc)
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Remove every page after the first `keep` pages. Returns the removed count.
///
/// Keeping at least as many pages as the document has is a no-op.
pub fn trim_pages(doc: &mut Document, keep: u32) -> usize {
    let total = page_count(doc) as u32;
    if keep >= total {
        debug!("Keeping all {} page(s)", total);
        return 0;
    }

    let doomed: Vec<u32> = (keep + 1..=total).collect();
    debug!("Deleting pages {:?}", doomed);
    doc.delete_pages(&doomed);
    doc.prune_objects();
    doomed.len()
}

pub fn save_to_vec(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).context("Unable to serialize PDF")?;
    Ok(buffer)
}
