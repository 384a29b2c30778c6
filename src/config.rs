use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ::config::{Environment, File, FileFormat};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::{BillError, Result};

/// Directory holding the config file and the OAuth token cache, relative to home.
pub const APP_CONFIG_DIR: &str = ".config/billsweep";
const CONFIG_FILE_NAME: &str = "config.yaml";
const TOKEN_FILE_NAME: &str = "token.json";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub download_dir: PathBuf,
    #[serde(default)]
    pub bills: BTreeMap<String, BillConfig>,
    #[serde(skip)]
    pub gmail: GmailConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BillConfig {
    /// Gmail label carrying this bill's emails.
    pub label: String,
    #[serde(default)]
    pub password: String,
    /// Leading pages to retain. `None` keeps the whole document.
    #[serde(default)]
    pub keep_pages: Option<u32>,
    #[serde(default, alias = "additional_text")]
    pub watermark: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GmailConfig {
    pub credentials_path: Option<String>,
    /// Base64 encoded OAuth client secret JSON, an alternative to `credentials_path`.
    pub credentials_base64: Option<String>,
    pub token_cache_path: String,
}

/// Read access to bill settings, implemented by [`Config`].
pub trait ConfigProvider {
    /// Case-insensitive lookup returning the canonical bill name with its settings.
    fn bill_config(&self, bill_name: &str) -> Result<(&str, &BillConfig)>;

    /// Configured bill names, sorted.
    fn bill_names(&self) -> Vec<String>;

    fn download_dir(&self) -> &Path;
}

impl ConfigProvider for Config {
    fn bill_config(&self, bill_name: &str) -> Result<(&str, &BillConfig)> {
        if let Some((name, bill)) = self.bills.get_key_value(bill_name) {
            return Ok((name.as_str(), bill));
        }
        self.bills
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(bill_name))
            .map(|(name, bill)| (name.as_str(), bill))
            .ok_or_else(|| BillError::BillNotConfigured(bill_name.to_string()))
    }

    fn bill_names(&self) -> Vec<String> {
        self.bills.keys().cloned().collect()
    }

    fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

impl Config {
    /// Load the YAML file at `path` (or the default location), layered with
    /// `BILLSWEEP__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        debug!("Loading configuration from {}", path.display());

        let mut config: Config = ::config::Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Yaml).required(true))
            .add_source(Environment::with_prefix("BILLSWEEP").prefix_separator("__").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| BillError::Config(format!("{}: {}", path.display(), e)))?;

        config.download_dir = expand_home(&config.download_dir);
        config.gmail = GmailConfig::from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Build a configuration in memory, without touching files or Gmail settings.
    pub fn from_bills<I, S>(download_dir: impl Into<PathBuf>, bills: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, BillConfig)>,
        S: Into<String>,
    {
        let config = Config {
            download_dir: download_dir.into(),
            bills: bills.into_iter().map(|(name, bill)| (name.into(), bill)).collect(),
            gmail: GmailConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bills.is_empty() {
            warn!("No bills configured");
        }
        for (name, bill) in &self.bills {
            if bill.label.trim().is_empty() {
                return Err(BillError::InvalidConfig {
                    bill: name.clone(),
                    reason: "label must not be empty".to_string(),
                });
            }
            if bill.keep_pages == Some(0) {
                return Err(BillError::InvalidConfig {
                    bill: name.clone(),
                    reason: "keep_pages must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Gmail label of a bill, looked up case-insensitively by bill name.
    pub fn label(&self, bill_name: &str) -> Result<&str> {
        let (_, bill) = self.bill_config(bill_name)?;
        debug!("Label identified: {}", bill.label);
        Ok(&bill.label)
    }

    /// Human readable dump with passwords masked.
    pub fn describe(&self) -> String {
        let mut out = format!("download_dir: {}\nbills:\n", self.download_dir.display());
        for (name, bill) in &self.bills {
            out.push_str(&format!("  {}:\n", name));
            out.push_str(&format!("    label: {:?}\n", bill.label));
            let password = if bill.password.is_empty() { "" } else { "********" };
            out.push_str(&format!("    password: {:?}\n", password));
            match bill.keep_pages {
                Some(keep) => out.push_str(&format!("    keep_pages: {}\n", keep)),
                None => out.push_str("    keep_pages: all\n"),
            }
            if let Some(text) = &bill.watermark {
                out.push_str(&format!("    watermark: {:?}\n", text));
            }
        }
        out
    }
}

impl GmailConfig {
    pub fn from_env() -> Result<Self> {
        let token_cache_path = match std::env::var("GMAIL_TOKEN_CACHE_PATH") {
            Ok(path) => path,
            Err(_) => app_dir()?.join(TOKEN_FILE_NAME).to_string_lossy().into_owned(),
        };

        Ok(GmailConfig {
            credentials_path: std::env::var("GMAIL_CREDENTIALS_PATH").ok(),
            credentials_base64: std::env::var("GOOGLE_API_CREDENTIALS").ok(),
            token_cache_path,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials_path.is_some() || self.credentials_base64.is_some()
    }
}

fn app_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(APP_CONFIG_DIR))
        .ok_or_else(|| BillError::Config("unable to identify the home directory".to_string()))
}

/// `$BILLSWEEP_CONFIG` if set, `~/.config/billsweep/config.yaml` otherwise.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("BILLSWEEP_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
