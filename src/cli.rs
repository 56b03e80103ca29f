//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Period;
use crate::reminders::ReminderChannel;
use crate::store::preferences::CalendarView;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flockbook - congregation analytics, calendar and outreach
///
/// Expands recurring events, summarizes giving, attendance and care
/// activity, evaluates reminder rules and sends SMS announcements.
///
/// Examples:
///   flockbook events --months 2
///   flockbook report --period 90d --format json
///   flockbook reminders --date 2024-06-01
///   flockbook prefs add-reminder --name "Day before" --days-before 1
///   flockbook sms bulk --to +15551230001,+15551230002 --message "Service at 10am"
///   flockbook --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .flockbook.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Data file or directory of JSON files
    #[arg(short, long, global = true, value_name = "PATH", env = "FLOCKBOOK_DATA")]
    pub data: Option<PathBuf>,

    /// Preferences store file
    #[arg(long, global = true, value_name = "FILE", env = "FLOCKBOOK_STORE")]
    pub store: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .flockbook.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List event occurrences in a date window
    Events {
        /// First day of the window [default: today]
        #[arg(long, value_name = "DATE")]
        from: Option<NaiveDate>,

        /// Last day of the window [default: from + lookahead months]
        #[arg(long, value_name = "DATE")]
        to: Option<NaiveDate>,

        /// Window length in months when --to is not given
        #[arg(long, value_name = "N")]
        months: Option<u32>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build the dashboard report
    Report {
        /// Reporting period (7d, 30d, 90d, 365d, all)
        #[arg(short, long, value_name = "PERIOD")]
        period: Option<Period>,

        /// Months on the attendance chart [default: from config]
        #[arg(long, value_name = "N")]
        months: Option<u32>,

        /// First day of an explicit reporting range (replaces --period)
        #[arg(long, value_name = "DATE", requires = "to", conflicts_with = "period")]
        from: Option<NaiveDate>,

        /// Last day of an explicit reporting range
        #[arg(long, value_name = "DATE", requires = "from")]
        to: Option<NaiveDate>,

        /// Report as of this date [default: today]
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show reminders that fire on a date
    Reminders {
        /// Day to evaluate [default: today]
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect or change stored preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsCommand,
    },

    /// Send SMS messages or look up their status
    Sms {
        #[command(subcommand)]
        action: SmsCommand,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    /// Print all stored preferences
    Show,

    /// Set the default reporting period
    SetPeriod {
        #[arg(value_name = "PERIOD")]
        period: Period,
    },

    /// Set the default calendar layout
    SetView {
        #[arg(value_name = "VIEW")]
        view: CalendarView,
    },

    /// Add or replace a reminder rule
    AddReminder {
        /// Rule name
        #[arg(long)]
        name: String,

        /// Days before the event the reminder fires
        #[arg(long, value_name = "DAYS")]
        days_before: u32,

        /// Delivery channel
        #[arg(long, default_value = "sms")]
        channel: ReminderChannel,

        /// Restrict to event categories (comma-separated)
        #[arg(long, value_name = "CATEGORIES", value_delimiter = ',')]
        categories: Vec<String>,
    },

    /// Save a named member filter
    SaveFilter {
        #[arg(long)]
        name: String,

        #[arg(long)]
        query: String,
    },

    /// Remove all stored preferences
    Reset,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SmsCommand {
    /// Send one message
    Send {
        /// Recipient phone number
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(short, long)]
        message: String,
    },

    /// Send one message to up to 50 recipients
    Bulk {
        /// Recipient phone numbers (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<String>,

        /// Message text
        #[arg(short, long)]
        message: String,
    },

    /// Look up delivery status by message id
    Status {
        #[arg(required = true, value_name = "SID")]
        sids: Vec<String>,
    },

    /// Execute a JSON request body ({"action": "send" | "bulk" | "status", ...})
    Request {
        /// Request file, or - for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Skip further validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required (try --help)".to_string());
        };

        match command {
            Command::Events {
                from, to, months, ..
            } => {
                if let (Some(from), Some(to)) = (from, to) {
                    if from > to {
                        return Err(format!("--from ({}) is after --to ({})", from, to));
                    }
                }
                if *months == Some(0) {
                    return Err("Months must be at least 1".to_string());
                }
            }
            Command::Report {
                months, from, to, ..
            } => {
                if *months == Some(0) {
                    return Err("Months must be at least 1".to_string());
                }
                if let (Some(from), Some(to)) = (from, to) {
                    if from > to {
                        return Err(format!("--from ({}) is after --to ({})", from, to));
                    }
                }
            }
            Command::Prefs {
                action: PrefsCommand::AddReminder { name, .. },
            } => {
                if crate::reminders::rule_id(name).is_empty() {
                    return Err(format!(
                        "Reminder name '{}' needs at least one letter or digit",
                        name
                    ));
                }
            }
            Command::Sms {
                action: SmsCommand::Bulk { to, .. },
            } => {
                if to.len() > crate::sms::MAX_BULK_RECIPIENTS {
                    return Err(format!(
                        "Bulk send supports at most {} recipients, got {}",
                        crate::sms::MAX_BULK_RECIPIENTS,
                        to.len()
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins
    /// over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Whether progress bars should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_events() {
        let args = parse(&["flockbook", "events", "--from", "2024-01-01", "--months", "2"]);
        match args.command {
            Some(Command::Events { from, months, .. }) => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(months, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_report_period() {
        let args = parse(&["flockbook", "report", "--period", "90d", "--format", "json"]);
        match args.command {
            Some(Command::Report { period, output, .. }) => {
                assert_eq!(period, Some(Period::Quarter));
                assert_eq!(output.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(Args::try_parse_from(["flockbook", "report", "--period", "6d"]).is_err());
    }

    #[test]
    fn test_bulk_recipients_split() {
        let args = parse(&["flockbook", "sms", "bulk", "--to", "+1555,+1666", "-m", "Hi"]);
        match args.command {
            Some(Command::Sms {
                action: SmsCommand::Bulk { to, message },
            }) => {
                assert_eq!(to, vec!["+1555", "+1666"]);
                assert_eq!(message, "Hi");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_inverted_window() {
        let args = parse(&[
            "flockbook",
            "events",
            "--from",
            "2024-02-01",
            "--to",
            "2024-01-01",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_command() {
        let args = parse(&["flockbook"]);
        assert!(args.validate().is_err());

        let args = parse(&["flockbook", "--init-config"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["flockbook", "-v", "-q", "report"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["flockbook", "report"]);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_report_range() {
        let args = parse(&[
            "flockbook", "report", "--from", "2024-01-01", "--to", "2024-03-31",
        ]);
        match args.command {
            Some(Command::Report { from, to, period, .. }) => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 3, 31));
                assert_eq!(period, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(args.validate().is_ok());

        assert!(Args::try_parse_from(["flockbook", "report", "--from", "2024-01-01"]).is_err());
        assert!(Args::try_parse_from([
            "flockbook", "report", "--period", "7d", "--from", "2024-01-01", "--to", "2024-01-02",
        ])
        .is_err());

        let args = parse(&[
            "flockbook", "report", "--from", "2024-04-01", "--to", "2024-03-31",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unnamed_reminder() {
        let args = parse(&[
            "flockbook", "prefs", "add-reminder", "--name", "!!!", "--days-before", "1",
        ]);
        assert!(args.validate().is_err());

        let args = parse(&[
            "flockbook", "prefs", "add-reminder", "--name", "Day before", "--days-before", "1",
        ]);
        assert!(args.validate().is_ok());
    }
}
