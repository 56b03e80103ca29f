//! Flockbook - congregation analytics, calendar and outreach
//!
//! A CLI tool that expands recurring church calendar events, builds
//! period dashboards over giving, attendance and care records, evaluates
//! reminder rules and sends SMS announcements through a Twilio-compatible
//! provider.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing data, bad config, provider failure, etc.)

mod analysis;
mod calendar;
mod cli;
mod config;
mod data;
mod models;
mod reminders;
mod report;
mod sms;
mod store;

use analysis::{dashboard, DashboardOptions, Period};
use anyhow::{Context, Result};
use chrono::{Duration, Local, Months, NaiveDate, NaiveDateTime};
use cli::{Args, Command, OutputArgs, OutputFormat, PrefsCommand, SmsCommand};
use config::{Config, CONFIG_FILE};
use data::Dataset;
use models::EventCategory;
use reminders::ReminderRule;
use sms::{SmsAction, SmsClient, SmsClientConfig};
use std::io::Read;
use std::path::Path;
use store::{FileStore, Preferences, SavedFilter};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("Flockbook v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_source);
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .flockbook.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the data path, report defaults and SMS credentials.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` overrides the level derived from flags and config.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected subcommand. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let Some(command) = args.command.clone() else {
        return Ok(0);
    };

    match command {
        Command::Events {
            from,
            to,
            months,
            output,
        } => run_events(&config, from, to, months, &output),
        Command::Report {
            period,
            months,
            from,
            to,
            date,
            output,
        } => {
            let range = from.zip(to);
            run_report(&config, period, range, months, date, &output)
        }
        Command::Reminders { date, output } => run_reminders(&config, date, &output),
        Command::Prefs { action } => run_prefs(&config, action),
        Command::Sms { action } => run_sms(&config, action, args.show_progress()).await,
    }
}

/// Current local time, or the given day at the current time of day.
fn now_on(date: Option<NaiveDate>) -> NaiveDateTime {
    let now = Local::now().naive_local();
    match date {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

fn load_dataset(config: &Config) -> Result<Dataset> {
    let path = Path::new(&config.general.data_path);
    info!("Loading data from: {}", path.display());
    Dataset::load(path)
}

fn open_preferences(config: &Config) -> Result<Preferences<FileStore>> {
    let store = FileStore::open(&config.general.store_path).with_context(|| {
        format!(
            "Failed to open preferences store: {}",
            config.general.store_path
        )
    })?;
    debug!("Preferences store: {}", store.path().display());
    Ok(Preferences::new(store))
}

/// List event occurrences in the requested window.
fn run_events(
    config: &Config,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    months: Option<u32>,
    output: &OutputArgs,
) -> Result<i32> {
    let dataset = load_dataset(config)?;

    let now = now_on(None);
    let from = from.unwrap_or_else(|| now.date());
    let to = match to {
        Some(to) => to,
        None => {
            let months = months.unwrap_or(config.calendar.lookahead_months);
            from.checked_add_months(Months::new(months))
                .unwrap_or(NaiveDate::MAX)
        }
    };

    let instances = calendar::expand_all(&dataset.events, from, to);
    info!("{} occurrences between {} and {}", instances.len(), from, to);

    let content = match output.format {
        OutputFormat::Json => report::generate_json(&instances)?,
        OutputFormat::Markdown => report::generate_markdown_events(&instances, from, to, now),
    };
    emit(output, &content)?;

    Ok(0)
}

/// Build and render the dashboard.
fn run_report(
    config: &Config,
    period: Option<Period>,
    range: Option<(NaiveDate, NaiveDate)>,
    months: Option<u32>,
    date: Option<NaiveDate>,
    output: &OutputArgs,
) -> Result<i32> {
    let period = match period {
        Some(period) => period,
        None => resolve_default_period(config),
    };
    let now = now_on(date);
    match range {
        Some((from, to)) => info!("Building dashboard: {} to {} as of {}", from, to, now.date()),
        None => info!("Building dashboard: {} as of {}", period, now.date()),
    }

    let dataset = load_dataset(config)?;
    let options = DashboardOptions {
        period,
        trailing_months: months.unwrap_or(config.report.trailing_months),
        giving_months: config.report.giving_months,
        lookahead_months: config.calendar.lookahead_months,
        range,
    };
    let dashboard = dashboard::build(&dataset, &options, now);

    let content = match output.format {
        OutputFormat::Json => report::generate_json(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_dashboard(&dashboard),
    };
    emit(output, &content)?;

    Ok(0)
}

/// Stored view preference first, then the config file default.
fn resolve_default_period(config: &Config) -> Period {
    match open_preferences(config).map(|prefs| prefs.stored_view_preferences()) {
        Ok(Ok(Some(view))) => return view.default_period,
        Ok(Ok(None)) => {}
        Ok(Err(e)) => warn!("Ignoring stored view preferences: {}", e),
        Err(e) => warn!("{:#}", e),
    }

    Period::parse(&config.report.default_period).unwrap_or_else(|| {
        warn!(
            "Unknown default_period '{}' in config, using {}",
            config.report.default_period,
            Period::default()
        );
        Period::default()
    })
}

/// Show the reminders firing on a day.
fn run_reminders(config: &Config, date: Option<NaiveDate>, output: &OutputArgs) -> Result<i32> {
    let today = now_on(date).date();

    let prefs = open_preferences(config)?;
    let rules = prefs
        .reminder_rules()
        .context("Failed to read reminder rules")?;

    if rules.is_empty() {
        warn!("No reminder rules configured (see `flockbook prefs add-reminder`)");
    }

    let dataset = load_dataset(config)?;
    let horizon = rules
        .iter()
        .filter(|r| r.enabled)
        .map(|r| r.days_before)
        .max()
        .unwrap_or(0);
    let until = today
        .checked_add_signed(Duration::days(horizon as i64))
        .unwrap_or(NaiveDate::MAX);
    let instances = calendar::expand_all(&dataset.events, today, until);

    let due = reminders::due_reminders(&instances, &rules, today);
    info!("{} reminders due on {}", due.len(), today);

    let content = match output.format {
        OutputFormat::Json => report::generate_json(&due)?,
        OutputFormat::Markdown => report::generate_markdown_reminders(&due, today),
    };
    emit(output, &content)?;

    Ok(0)
}

/// Inspect or change stored preferences.
fn run_prefs(config: &Config, action: PrefsCommand) -> Result<i32> {
    let mut prefs = open_preferences(config)?;

    match action {
        PrefsCommand::Show => {
            let all = serde_json::json!({
                "reminder_rules": prefs.reminder_rules()?,
                "view_preferences": prefs.view_preferences()?,
                "saved_filters": prefs.saved_filters()?,
            });
            println!("{}", report::generate_json(&all)?);
        }
        PrefsCommand::SetPeriod { period } => {
            let mut view = prefs.view_preferences()?;
            view.default_period = period;
            prefs.set_view_preferences(&view)?;
            println!("✅ Default period set to {}", period);
        }
        PrefsCommand::SetView { view: layout } => {
            let mut view = prefs.view_preferences()?;
            view.calendar_view = layout;
            prefs.set_view_preferences(&view)?;
            println!("✅ Calendar view set to {:?}", layout);
        }
        PrefsCommand::AddReminder {
            name,
            days_before,
            channel,
            categories,
        } => {
            let rule = ReminderRule {
                id: reminders::rule_id(&name),
                name,
                days_before,
                channel,
                enabled: true,
                categories: categories
                    .iter()
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| EventCategory::parse(c))
                    .collect(),
            };
            let summary = format!(
                "'{}' ({} day(s) before, {})",
                rule.name, rule.days_before, rule.channel
            );
            prefs.add_reminder_rule(rule)?;
            println!("✅ Saved reminder {}", summary);
        }
        PrefsCommand::SaveFilter { name, query } => {
            prefs.save_filter(SavedFilter {
                name: name.clone(),
                query,
            })?;
            println!("✅ Saved filter '{}'", name);
        }
        PrefsCommand::Reset => {
            prefs.reset()?;
            println!("✅ Cleared stored preferences");
        }
    }

    Ok(0)
}

/// Send messages or look up their status.
async fn run_sms(config: &Config, action: SmsCommand, show_progress: bool) -> Result<i32> {
    let client = SmsClient::new(SmsClientConfig::from(&config.sms.clone().with_env()))?;

    let action = match action {
        SmsCommand::Send { to, message } => SmsAction::Send { to, message },
        SmsCommand::Bulk { to, message } => SmsAction::Bulk {
            recipients: to,
            message,
        },
        SmsCommand::Status { sids } => return print_statuses(&client, &sids).await,
        SmsCommand::Request { file } => read_request(&file)?,
    };

    match sms::dispatch(&client, action, show_progress).await {
        Ok(body) => {
            println!("{}", report::generate_json(&body)?);
            Ok(0)
        }
        Err(e) => {
            error!("SMS request failed ({}): {}", e.http_status(), e);
            println!("{}", report::generate_json(&e.to_response())?);
            Ok(1)
        }
    }
}

async fn print_statuses(client: &SmsClient, sids: &[String]) -> Result<i32> {
    let mut failed = 0;

    for (sid, result) in sids.iter().zip(client.statuses(sids).await) {
        match result {
            Ok(receipt) => println!(
                "📨 {}: {}{}",
                receipt.sid,
                receipt.status,
                receipt
                    .error_message
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("❌ {}: {}", sid, e);
            }
        }
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

/// Parse a JSON request body from a file, or stdin for `-`.
fn read_request(file: &Path) -> Result<SmsAction> {
    let content = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read request file: {}", file.display()))?
    };

    serde_json::from_str(&content).context("Invalid SMS request body")
}

/// Write rendered output to the requested file or stdout.
fn emit(output: &OutputArgs, content: &str) -> Result<()> {
    match output.output {
        Some(ref path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            println!("✅ Saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it returns a description of where the
/// configuration came from instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let args = Args::try_parse_from([
            "flockbook",
            "--config",
            path.to_str().unwrap(),
            "report",
        ])
        .unwrap();
        let (config, source) = load_config(&args).unwrap();

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
        assert_eq!(source, path.display().to_string());
    }

    #[test]
    fn test_now_on_keeps_requested_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(now_on(Some(day)).date(), day);
    }

    #[test]
    fn test_default_period_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.store_path = dir.path().join("store.json").display().to_string();
        config.report.default_period = "90d".to_string();

        assert_eq!(resolve_default_period(&config), Period::Quarter);

        config.report.default_period = "fortnight".to_string();
        assert_eq!(resolve_default_period(&config), Period::Month);
    }

    #[test]
    fn test_stored_period_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.store_path = dir.path().join("store.json").display().to_string();
        config.report.default_period = "90d".to_string();

        let mut prefs = open_preferences(&config).unwrap();
        let mut view = prefs.view_preferences().unwrap();
        view.default_period = Period::Week;
        prefs.set_view_preferences(&view).unwrap();

        assert_eq!(resolve_default_period(&config), Period::Week);
    }
}
