use aibox::api::samples::{SAMPLE_INVOICES, SAMPLE_STOCK};
use aibox::client::{ApiClient, ImpactEstimate, LocalPreview, DEFAULT_HOURLY_RATE};
use aibox::core::invoice::InvoiceOptions;
use aibox::core::stock::StockOptions;
use aibox::domain::model::{DatasetKind, ExportFormat, IssuesSummary, Preview, Upload};
use aibox::utils::{logger, validation::Validate};
use aibox::{ClientConfig, CleanError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "aibox-client")]
#[command(version, about = "Terminal client for the AI-in-a-Box cleaning API")]
struct Cli {
    /// Base URL of the API
    #[arg(long, env = "API_URL", default_value = aibox::config::client::DEFAULT_API_URL)]
    api_url: String,

    /// Browser-reachable base used for share links
    #[arg(long, env = "PUBLIC_BACKEND_BASE")]
    public_backend_base: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the API is online
    Health,
    /// Clean an invoice sheet
    Invoices(InvoiceCmd),
    /// Clean a stock sheet
    Stock(StockCmd),
    /// Fetch a sample CSV from the API
    Sample {
        #[arg(value_enum)]
        kind: SampleKind,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SampleKind {
    Invoice,
    Stock,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Csv,
    Xlsx,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Csv => ExportFormat::Csv,
            Format::Xlsx => ExportFormat::Xlsx,
        }
    }
}

#[derive(Args)]
struct UploadArgs {
    /// CSV or XLSX file to clean
    #[arg(required_unless_present = "sample")]
    file: Option<PathBuf>,

    /// Use the built-in sample file instead
    #[arg(long, conflicts_with = "file")]
    sample: bool,

    #[arg(long, value_enum, default_value = "csv")]
    fmt: Format,

    /// Save the cleaned file here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InvoiceCmd {
    #[command(flatten)]
    upload: UploadArgs,

    /// Fuzzy match threshold (0-100)
    #[arg(long, default_value_t = 90)]
    fuzzy: u8,

    /// Keep duplicate invoices
    #[arg(long)]
    keep_dupes: bool,

    #[arg(long)]
    drop_negative_qty: bool,

    /// Don't flag due dates before the issue date
    #[arg(long)]
    no_flag_due: bool,

    #[arg(long, default_value_t = DEFAULT_HOURLY_RATE)]
    hourly_rate: f64,
}

#[derive(Args)]
struct StockCmd {
    #[command(flatten)]
    upload: UploadArgs,

    /// Expiring soon window in days
    #[arg(long, default_value_t = 30)]
    days_expiring: u32,

    #[arg(long)]
    drop_negative_qty: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    let config = ClientConfig::new(cli.api_url.clone(), cli.public_backend_base.clone());
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }
    let client = ApiClient::new(config);

    if let Err(e) = run(&client, cli.command).await {
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        let code = if e.is_input_error() { 2 } else { 1 };
        std::process::exit(code);
    }
}

async fn run(client: &ApiClient, command: Command) -> Result<(), CleanError> {
    match command {
        Command::Health => {
            let url = &client.config().api_url;
            if client.health().await {
                let version = client.version().await.unwrap_or_default();
                println!("API: ONLINE ✅ → {} (v{})", url, version);
                Ok(())
            } else {
                println!("API: OFFLINE ❌ → {}", url);
                std::process::exit(1);
            }
        }
        Command::Sample { kind, output } => {
            let kind = match kind {
                SampleKind::Invoice => DatasetKind::Invoices,
                SampleKind::Stock => DatasetKind::Stock,
            };
            let body = client.sample(kind).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, body).await?;
                    println!("📁 Sample saved to: {}", path.display());
                }
                None => print!("{}", body),
            }
            Ok(())
        }
        Command::Invoices(cmd) => {
            let options = InvoiceOptions {
                fuzzy_threshold: cmd.fuzzy,
                drop_duplicates: !cmd.keep_dupes,
                drop_negative_qty: cmd.drop_negative_qty,
                flag_due_before_issue: !cmd.no_flag_due,
            };
            options.validate()?;
            let format = ExportFormat::from(cmd.upload.fmt);
            let upload = load_upload(&cmd.upload, DatasetKind::Invoices).await?;
            if let Some(preview) = client.offline_preview(&upload).await? {
                print_local_preview(&client.config().api_url, &preview);
                return Ok(());
            }

            let response = client.clean_invoices(upload, &options, format).await?;
            if cmd.upload.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("✅ Invoices cleaned");
                println!("{}", ImpactEstimate::from_profile(&response.report.profile, cmd.hourly_rate));
                if let Some(currency) = &response.report.profile.currency_detected {
                    println!("Currency detected: {}", currency);
                }
                print_preview(&response.report.preview);

                if !response.report.header_map.is_empty() {
                    println!("\nHeader mapping (original → canonical)");
                    let mut pairs: Vec<_> = response.report.header_map.iter().collect();
                    pairs.sort();
                    for (original, canonical) in pairs {
                        println!("  {} → {}", original, canonical);
                    }
                }
                print_issues(&response.report.issues_summary);
                print_notes(&response.report.ai_feedback);
                println!("\n🔗 Share: {}", client.config().public_link(&response.share_url));
            }
            save_download(client, &response.download_token, format, cmd.upload.output.as_deref()).await
        }
        Command::Stock(cmd) => {
            let options = StockOptions {
                days_expiring: cmd.days_expiring,
                drop_negative_qty: cmd.drop_negative_qty,
                ..Default::default()
            };
            let format = ExportFormat::from(cmd.upload.fmt);
            let upload = load_upload(&cmd.upload, DatasetKind::Stock).await?;
            if let Some(preview) = client.offline_preview(&upload).await? {
                print_local_preview(&client.config().api_url, &preview);
                return Ok(());
            }

            let response = client.clean_stock(upload, &options, format).await?;
            if cmd.upload.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                let profile = &response.report.profile;
                println!("✅ Stock cleaned");
                println!(
                    "Rows in: {} | Rows out: {} | Low stock: {} | Expiring soon: {} | Expired: {}",
                    profile.rows_in,
                    profile.rows_out,
                    profile.low_stock,
                    profile.expiring_soon,
                    profile.expired
                );
                print_preview(&response.report.preview);
                print_issues(&response.report.issues_summary);
                print_notes(&response.report.ai_feedback);
                println!("\n🔗 Share: {}", client.config().public_link(&response.share_url));
            }
            save_download(client, &response.download_token, format, cmd.upload.output.as_deref()).await
        }
    }
}

async fn load_upload(args: &UploadArgs, kind: DatasetKind) -> Result<Upload, CleanError> {
    if args.sample {
        let (file_name, body) = match kind {
            DatasetKind::Invoices => ("demo_invoices.csv", SAMPLE_INVOICES),
            DatasetKind::Stock => ("demo_stock.csv", SAMPLE_STOCK),
        };
        return Ok(Upload {
            file_name: file_name.to_string(),
            bytes: body.as_bytes().to_vec(),
        });
    }

    let path = args.file.as_ref().ok_or_else(|| CleanError::MissingConfigError {
        field: "file".to_string(),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = tokio::fs::read(path).await?;
    Ok(Upload { file_name, bytes })
}

async fn save_download(
    client: &ApiClient,
    token: &str,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<(), CleanError> {
    let Some(path) = output else {
        return Ok(());
    };
    let data = client.download(token, format).await?;
    tokio::fs::write(path, &data).await?;
    println!("📁 Cleaned file saved to: {}", path.display());
    Ok(())
}

fn print_preview(preview: &Preview) {
    println!("\nBefore (sample)");
    for row in &preview.before {
        println!("  {}", row.join(" | "));
    }
    println!("\nAfter (sample)");
    for row in &preview.after {
        println!("  {}", row.join(" | "));
    }
}

fn print_local_preview(api_url: &str, preview: &LocalPreview) {
    println!("⚠️ API offline → {}. Nothing was cleaned; showing a local preview.", api_url);
    println!("\nUploaded (first {} rows)", preview.rows.len());
    println!("  {}", preview.columns.join(" | "));
    for row in &preview.rows {
        println!("  {}", row.join(" | "));
    }
}

fn print_issues(issues: &IssuesSummary) {
    if issues.is_empty() {
        return;
    }
    println!("\nIssues (summary)");
    let mut counts: Vec<_> = issues.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (issue, count) in counts {
        println!("  {:<24} {}", issue, count);
    }
}

fn print_notes(notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    println!("\nAI notes");
    for note in notes {
        println!("  - {}", note);
    }
}
