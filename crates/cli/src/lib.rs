use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "volx")]
#[command(about = "Volx - a leveraged volatility-index pool")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Override the log format from the configuration file
    #[arg(long, value_enum, global = true, env = "VOLX_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "volx.yaml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "master_config/volx.yaml")]
        config: PathBuf,
    },

    /// Replay a scenario of pool operations and print the final state as JSON
    Simulate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "master_config/volx.yaml")]
        config: PathBuf,

        /// Scenario file (YAML list of steps)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Expose Prometheus metrics on this port while the scenario runs
        #[arg(long)]
        metrics_port: Option<u16>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "volx",
            "simulate",
            "--scenario",
            "demos/basic.yaml",
            "--metrics-port",
            "9100",
        ])
        .unwrap();

        match cli.command {
            Commands::Simulate {
                config,
                scenario,
                metrics_port,
            } => {
                assert_eq!(config, PathBuf::from("master_config/volx.yaml"));
                assert_eq!(scenario, PathBuf::from("demos/basic.yaml"));
                assert_eq!(metrics_port, Some(9100));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_log_format() {
        let cli = Cli::try_parse_from(["volx", "validate", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format.map(|f| f.as_str()), Some("json"));
    }

    #[test]
    fn test_simulate_requires_scenario() {
        assert!(Cli::try_parse_from(["volx", "simulate"]).is_err());
    }
}
