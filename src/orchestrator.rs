use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Month;
use log::{debug, info};

use crate::bill_email::BillEmail;
use crate::config::ConfigProvider;
use crate::error::{BillError, Result};
use crate::pdf::BillConverter;

/// Keep only the final component of an attachment or input file name.
fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("bill.pdf")
}

/// `<download_dir>/<bill>/<bill>_<Month>_<year>--<filename>`
pub fn output_path(download_dir: &Path, bill_name: &str, year: i32, month: Month, filename: &str) -> PathBuf {
    let file = format!("{}_{}_{}--{}", bill_name, month.name(), year, base_name(filename));
    download_dir.join(bill_name).join(file)
}

/// `<download_dir>/<bill>/<bill>--<input file name>`
pub fn single_output_path(download_dir: &Path, bill_name: &str, input: &Path) -> PathBuf {
    let input_name = input.to_string_lossy();
    let file = format!("{}--{}", bill_name, base_name(&input_name));
    download_dir.join(bill_name).join(file)
}

/// Create parent directories and write `data` to `path`.
///
/// The bytes go to a temporary file in the same directory which is renamed
/// over `path` once complete, so `path` never holds a partial bill.
fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| BillError::io(parent, e))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".billsweep-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| BillError::io(parent, e))?;
    staged
        .write_all(data)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| BillError::io(path, e))?;

    staged
        .persist(path)
        .map_err(|e| BillError::io(path, e.error))?;
    debug!("Output file {} complete ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Writes converted bills under the configured download directory.
pub struct BillWriter<'a, C: ConfigProvider + ?Sized> {
    config: &'a C,
    converter: BillConverter<'a, C>,
}

impl<'a, C: ConfigProvider + ?Sized> BillWriter<'a, C> {
    pub fn new(config: &'a C) -> Self {
        BillWriter {
            config,
            converter: BillConverter::new(config),
        }
    }

    pub fn output_path_for(&self, email: &BillEmail) -> PathBuf {
        output_path(
            self.config.download_dir(),
            &email.bill_name,
            email.year,
            email.month,
            &email.attachment.filename,
        )
    }

    /// Convert every email in order, stopping at the first failure.
    ///
    /// Files already written for earlier entries are kept.
    pub fn write_all(&self, emails: &[BillEmail]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(emails.len());

        for email in emails {
            info!(
                "Converting {} for bill {}",
                email.attachment.filename, email.bill_name
            );
            let output = self.output_path_for(email);

            self.converter
                .convert_bytes(&email.bill_name, &email.attachment.data)
                .and_then(|data| {
                    info!("Creating output file {}", output.display());
                    write_output(&output, &data)
                })
                .map_err(|e| BillError::Conversion {
                    bill: email.bill_name.clone(),
                    filename: email.attachment.filename.clone(),
                    source: Box::new(e),
                })?;
            debug!("Bill from email {} written to {}", email.message_id, output.display());

            written.push(output);
        }

        Ok(written)
    }

    /// Convert a local file for `bill_name`.
    pub fn convert_file(&self, bill_name: &str, input: &Path) -> Result<PathBuf> {
        let (name, _) = self.config.bill_config(bill_name)?;

        info!("Opening input bill {}", input.display());
        let data = fs::read(input).map_err(|e| BillError::io(input, e))?;
        let converted = self.converter.convert_bytes(name, &data)?;

        let output = single_output_path(self.config.download_dir(), name, input);
        info!("Creating output file {}", output.display());
        write_output(&output, &converted)?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/bills"), "airtel", 2022, Month::April, "Bill-123.pdf");
        assert_eq!(path, PathBuf::from("/bills/airtel/airtel_April_2022--Bill-123.pdf"));
    }

    #[test]
    fn test_output_path_strips_directories() {
        let path = output_path(Path::new("/bills"), "jio", 2020, Month::February, "../../etc/x.pdf");
        assert_eq!(path, PathBuf::from("/bills/jio/jio_February_2020--x.pdf"));
    }

    #[test]
    fn test_single_output_path() {
        let path = single_output_path(Path::new("/bills"), "jio", Path::new("/home/me/Downloads/jio.pdf"));
        assert_eq!(path, PathBuf::from("/bills/jio/jio--jio.pdf"));
    }

    #[test]
    fn test_write_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.pdf");
        write_output(&path, b"%PDF").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"%PDF");
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_output_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        write_output(&path, b"first version, longer").unwrap();
        write_output(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(entries(dir.path()), vec!["out.pdf"]);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail
        let path = dir.path().join("out.pdf");
        fs::create_dir(&path).unwrap();

        let err = write_output(&path, b"%PDF").unwrap_err();

        assert!(matches!(err, BillError::Io { .. }));
        assert!(path.is_dir());
        assert_eq!(entries(dir.path()), vec!["out.pdf"]);
    }
}
