//! `booking` CLI: list free slots, validate fields, and book a visit from
//! the terminal.
//!
//! ## Usage
//!
//! ```sh
//! # Free slots for the next two weeks, given a busy-interval snapshot
//! booking slots --busy busy.json
//!
//! # Pin "today" and shorten the horizon
//! booking slots --busy busy.json --from 2026-03-01 --days 3
//!
//! # Normalize a single field
//! booking validate vin 1hgcm82633a004352
//!
//! # Walk through a booking conversation; ledger rows go to stdout
//! booking chat --busy busy.json --locale en
//!
//! # Append ledger rows to a TSV file instead
//! booking chat --busy busy.json --ledger bookings.tsv
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use booking_engine::busy::{normalize_intervals, BusySource};
use booking_engine::memory::InMemoryCalendar;
use booking_engine::request::LEDGER_HEADER;
use booking_engine::slots::MAX_HORIZON_DAYS;
use booking_engine::{
    generate_slots, validate, BookingConfig, BookingFlow, Clock, CollaboratorError, Conversation,
    FixedClock, Ledger, Locale, MessageBundle, Negotiator, Notifier, RawBusyInterval, Reply,
    SlotOption, SlotWindow, SystemClock, ValidationError,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "booking",
    version,
    about = "Garage appointment booking from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print free slots as JSON, computed from a busy-interval file
    Slots {
        /// JSON array of `{"start": ..., "end": ...}` busy ranges
        #[arg(long)]
        busy: PathBuf,
        /// Date to count from; slots start the day after (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Horizon in days (overrides the configuration)
        #[arg(long)]
        days: Option<u32>,
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate one booking field and print its normalized value
    Validate {
        #[arg(value_enum)]
        field: Field,
        value: String,
    },
    /// Book a visit through a conversation on stdin/stdout
    Chat {
        /// JSON array of busy ranges seeding the in-memory calendar
        #[arg(long)]
        busy: Option<PathBuf>,
        /// TSV file to append ledger rows to (writes to stdout if omitted)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Conversation language: ru, pl or en (default from configuration)
        #[arg(long)]
        locale: Option<Locale>,
        /// Freeze the clock at noon of this date
        #[arg(long)]
        from: Option<NaiveDate>,
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Field {
    Vehicle,
    Year,
    Vin,
    Phone,
    Issue,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Slots {
            busy,
            from,
            days,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut policy = config
                .schedule()
                .context("Invalid schedule configuration")?;
            if let Some(days) = days {
                if days > MAX_HORIZON_DAYS {
                    anyhow::bail!("--days must be at most {}", MAX_HORIZON_DAYS);
                }
                policy.horizon_days = days;
            }

            let raw = read_busy(&busy)?;
            let intervals = normalize_intervals(&raw, policy.timezone);
            let today = from.unwrap_or_else(|| today_in(policy.timezone));
            let window =
                SlotWindow::starting_tomorrow(today, policy.horizon_days, policy.timezone);

            let slots: Vec<serde_json::Value> = generate_slots(&intervals, &window, &policy)
                .iter()
                .map(|slot| {
                    serde_json::json!({
                        "id": slot.id(),
                        "label": slot.label(),
                        "start": slot.start.to_rfc3339(),
                        "end": slot.end.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        Commands::Validate { field, value } => {
            let normalized = validate_field(field, &value)
                .map_err(|e| anyhow::anyhow!("Invalid {}: {}", field.name(), e))?;
            println!("{}", normalized);
        }
        Commands::Chat {
            busy,
            ledger,
            locale,
            from,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let locale = locale.unwrap_or(config.default_locale);
            let raw = match busy {
                Some(path) => read_busy(&path)?,
                None => Vec::new(),
            };
            let ledger = Arc::new(TsvLedger::open(ledger).await?);
            run_chat(&config, raw, ledger, locale, from).await?;
        }
    }

    Ok(())
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Vehicle => "vehicle",
            Field::Year => "year",
            Field::Vin => "VIN",
            Field::Phone => "phone",
            Field::Issue => "issue",
        }
    }
}

fn validate_field(field: Field, value: &str) -> Result<String, ValidationError> {
    Ok(match field {
        Field::Vehicle => validate::parse_vehicle(value)?.to_string(),
        Field::Year => validate::parse_year(value)?.to_string(),
        Field::Vin => validate::parse_vin(value)?.to_string(),
        Field::Phone => validate::parse_phone(value)?,
        Field::Issue => validate::parse_issue(value)?,
    })
}

async fn run_chat(
    config: &BookingConfig,
    busy: Vec<RawBusyInterval>,
    ledger: Arc<TsvLedger>,
    locale: Locale,
    from: Option<NaiveDate>,
) -> Result<()> {
    let policy = config
        .schedule()
        .context("Invalid schedule configuration")?;
    let clock: Arc<dyn Clock> = match from {
        Some(date) => Arc::new(FixedClock(noon_utc(date, policy.timezone)?)),
        None => Arc::new(SystemClock),
    };

    let calendar = Arc::new(InMemoryCalendar::with_busy(busy));
    let source = BusySource::new(
        calendar,
        config.calendar_id.clone(),
        policy.timezone,
        config.upstream_timeout(),
    );
    let negotiator = Negotiator::new(
        source.clone(),
        ledger,
        Arc::new(LogNotifier),
        clock.clone(),
        config.negotiator_settings(),
    );
    let flow = BookingFlow::new(source, negotiator, policy, clock, MessageBundle::default());

    let mut conversation = Conversation::new(locale);
    print_reply(&flow.start(&conversation));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut options: Vec<SlotOption> = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        let input = resolve_choice(&line, &options);
        let reply = flow.handle(&mut conversation, &input).await;
        print_reply(&reply);
        options = reply.options;
    }
    Ok(())
}

/// A bare number picks the n-th listed option (1-based); anything else is
/// passed through.
fn resolve_choice(line: &str, options: &[SlotOption]) -> String {
    match line.trim().parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].id.clone(),
        _ => line.to_string(),
    }
}

fn print_reply(reply: &Reply) {
    println!("{}", reply.text);
    for (i, option) in reply.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option.label);
    }
}

fn load_config(path: Option<&Path>) -> Result<BookingConfig> {
    let mut config = match path {
        Some(path) => BookingConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => BookingConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid configuration override in environment")?;
    Ok(config)
}

fn read_busy(path: &Path) -> Result<Vec<RawBusyInterval>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse busy intervals: {}", path.display()))
}

fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

fn noon_utc(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    use chrono::TimeZone;

    let noon = date
        .and_hms_opt(12, 0, 0)
        .context("Invalid --from date")?;
    let local = tz
        .from_local_datetime(&noon)
        .earliest()
        .with_context(|| format!("{} does not exist in {}", noon, tz.name()))?;
    Ok(local.with_timezone(&Utc))
}

/// Ledger writing tab-separated rows to a file, or to stdout.
struct TsvLedger {
    path: Option<PathBuf>,
    rows: Mutex<usize>,
}

impl TsvLedger {
    /// Open `path`, writing the header when the file is new. Without a path
    /// rows are printed and the header is implied.
    async fn open(path: Option<PathBuf>) -> Result<Self> {
        let rows = match &path {
            Some(path) if fs::try_exists(path).await.unwrap_or(false) => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read ledger: {}", path.display()))?
                .lines()
                .count(),
            Some(path) => {
                fs::write(path, format!("{}\n", LEDGER_HEADER.join("\t")))
                    .await
                    .with_context(|| format!("Failed to create ledger: {}", path.display()))?;
                1
            }
            None => 1,
        };
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        match &self.path {
            Some(path) => {
                let mut file = fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(path)
                    .await?;
                file.write_all(line.as_bytes()).await?;
                file.flush().await
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(line.as_bytes()).await?;
                stdout.flush().await
            }
        }
    }
}

#[async_trait]
impl Ledger for TsvLedger {
    async fn row_count(&self) -> Result<usize, CollaboratorError> {
        Ok(*self.rows.lock().await)
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), CollaboratorError> {
        let mut rows = self.rows.lock().await;
        let mut line = row
            .iter()
            .map(|field| field.replace(['\t', '\n'], " "))
            .collect::<Vec<_>>()
            .join("\t");
        line.push('\n');

        self.write_line(&line)
            .await
            .map_err(|e| CollaboratorError::new(e.to_string()))?;
        *rows += 1;
        Ok(())
    }
}

/// Operator notifications end up in the log.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel: &str, text: &str) -> Result<(), CollaboratorError> {
        tracing::info!(channel, "operator notification:\n{}", text);
        Ok(())
    }
}
