//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Fanout - bounded concurrent task fan-out
#[derive(Debug, Parser)]
#[command(
    name = "fo",
    about = "Run a keyed set of delay tasks all at once or under a concurrency limit",
    version,
    after_help = "Logs are written to: ~/.local/share/fanout/logs/fanout.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one delay task per value; each sleeps `value * unit` and yields `value * 2`
    Run {
        /// Task values, in admission order
        #[arg(value_name = "VALUES", required = true)]
        values: Vec<u64>,

        /// Maximum tasks in flight (omit to run everything at once)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Comma separated keys; turns the input into a mapping
        #[arg(short, long, value_delimiter = ',')]
        keys: Option<Vec<String>>,

        /// Splice a failing task in at this position
        #[arg(long)]
        fail_at: Option<usize>,

        /// Append a task yielding the pair (V, V) after V units
        #[arg(long, value_name = "V")]
        tuple: Option<u64>,

        /// Milliseconds per unit of delay (overrides config)
        #[arg(long)]
        unit_ms: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Print run events to stderr as JSON lines
        #[arg(long)]
        events: bool,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for run results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Path of the log file written by `fo`
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fanout")
        .join("logs")
        .join("fanout.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["fo", "run", "1", "3", "2"]).unwrap();
        match cli.command {
            Command::Run {
                values,
                limit,
                keys,
                fail_at,
                tuple,
                unit_ms,
                format,
                events,
            } => {
                assert_eq!(values, vec![1, 3, 2]);
                assert_eq!(limit, None);
                assert_eq!(keys, None);
                assert_eq!(fail_at, None);
                assert_eq!(tuple, None);
                assert_eq!(unit_ms, None);
                assert_eq!(format, OutputFormat::Text);
                assert!(!events);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_all_options() {
        let cli = Cli::try_parse_from([
            "fo",
            "--log-level",
            "debug",
            "run",
            "4",
            "2",
            "--limit",
            "2",
            "--keys",
            "a,b,c",
            "--fail-at",
            "1",
            "--tuple",
            "5",
            "--unit-ms",
            "1",
            "--format",
            "json",
            "--events",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Run {
                values,
                limit,
                keys,
                fail_at,
                tuple,
                unit_ms,
                format,
                events,
            } => {
                assert_eq!(values, vec![4, 2]);
                assert_eq!(limit, Some(2));
                assert_eq!(keys, Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
                assert_eq!(fail_at, Some(1));
                assert_eq!(tuple, Some(5));
                assert_eq!(unit_ms, Some(1));
                assert_eq!(format, OutputFormat::Json);
                assert!(events);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_values() {
        assert!(Cli::try_parse_from(["fo", "run"]).is_err());
    }

    #[test]
    fn test_config_with_global_path() {
        let cli = Cli::try_parse_from(["fo", "config", "--config", "/tmp/fanout.yml"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fanout.yml")));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("plain".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_path_ends_with_file_name() {
        assert!(get_log_path().ends_with("fanout/logs/fanout.log"));
    }
}
