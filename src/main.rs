use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, LevelFilter};

use billsweep::calendar::{current_year_month, parse_month_name, validate_year};
use billsweep::gmail_client::GmailClient;
use billsweep::mail_client::MailClient;
use billsweep::{find_bill_emails, BillWriter, Config, ConfigProvider};

#[derive(Parser)]
#[command(name = "billsweep")]
#[command(about = "Download bills from Gmail and convert them for uploading")]
#[command(version = "0.1.0")]
struct Args {
    /// Log level (RUST_LOG takes precedence when set)
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Configuration file (default: ~/.config/billsweep/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Convert a local bill file
    #[command(name = "bill-convert", visible_alias = "bc")]
    BillConvert {
        /// Bill name as configured
        #[arg(short, long)]
        name: String,

        /// Path to the bill PDF
        input: PathBuf,
    },

    /// Download bills from Gmail and convert them
    #[command(name = "bill-download", visible_alias = "bd")]
    BillDownload {
        /// Year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Case-insensitive short or long month name (default: current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Comma separated bill names (default: all configured bills)
        #[arg(short, long, value_delimiter = ',')]
        names: Vec<String>,

        /// List matching emails and target files without converting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List Gmail labels with their IDs
    Labels,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View configuration
    View,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load the .env file if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.into())
        .parse_default_env()
        .init();

    let config = Config::load(args.config.as_deref()).context("Unable to load configuration")?;

    let result = run(args.command, &config).await;
    if let Err(e) = &result {
        error!("❌ {:#}", e);
    }
    result
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Config {
            action: ConfigAction::View,
        } => {
            print!("{}", config.describe());
            Ok(())
        }
        Command::BillConvert { name, input } => {
            let output = BillWriter::new(config).convert_file(&name, &input)?;
            info!("✅ Bill written to {}", output.display());
            Ok(())
        }
        Command::BillDownload {
            year,
            month,
            names,
            dry_run,
        } => {
            let (current_year, current_month) = current_year_month();
            let year = validate_year(year.unwrap_or(current_year))?;
            let month = match month {
                Some(name) => parse_month_name(&name)?,
                None => current_month,
            };
            let names = if names.is_empty() {
                config.bill_names()
            } else {
                names
            };

            // Unknown bills fail here, before connecting to Gmail
            for name in &names {
                config.bill_config(name)?;
            }

            info!(
                "🚀 Downloading bills {:?} for {} {}",
                names,
                month.name(),
                year
            );
            let gmail = connect(config).await?;
            let emails = find_bill_emails(&gmail, config, &names, year, month).await?;

            if emails.is_empty() {
                info!("No bill emails found for {} {}", month.name(), year);
                return Ok(());
            }

            let writer = BillWriter::new(config);
            if dry_run {
                println!("🧪 {} bill email(s) found:", emails.len());
                for email in &emails {
                    println!(
                        "  {} [{}] {} ({} bytes) -> {}",
                        email.bill_name,
                        email.message_id,
                        email.attachment.filename,
                        email.attachment.data.len(),
                        writer.output_path_for(email).display()
                    );
                }
                return Ok(());
            }

            let written = writer.write_all(&emails)?;
            info!("✅ {} bill(s) converted", written.len());
            Ok(())
        }
        Command::Labels => {
            let gmail = connect(config).await?;
            let mut labels = gmail.list_labels().await?;
            labels.sort_by(|a, b| a.name.cmp(&b.name));

            println!("{:<50} {:<30}", "Label Name", "Label ID");
            println!("{}", "=".repeat(80));
            for label in labels {
                println!("{:<50} {:<30}", label.name, label.id);
            }
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<GmailClient> {
    if !config.gmail.has_credentials() {
        anyhow::bail!(
            "Missing Gmail credentials\n\
             \n\
             💡 Set one of:\n\
                export GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                export GOOGLE_API_CREDENTIALS=<base64 of the same file>\n\
             Optionally: export GMAIL_TOKEN_CACHE_PATH=~/.config/billsweep/token.json"
        );
    }
    GmailClient::new(&config.gmail)
        .await
        .context("Unable to connect to Gmail API")
}
