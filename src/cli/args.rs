//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `run`: Build a tree from a plan file and drive it to completion
//! - `show`: Build a tree from a plan file and print its outline
//! - `show-config`: Show configuration discovery information

use super::config::RunnerConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Run(RunOptions),
    Show { plan: PathBuf, json: bool },
    ShowConfig { config_override: Option<PathBuf> },
}

/// Options of `tasktree run`; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub plan: PathBuf,
    pub config_override: Option<PathBuf>,
    pub tick_seconds: Option<f64>,
    pub max_ticks: Option<u64>,
    pub realtime: bool,
    pub verbose: bool,
    pub json: bool,
}

impl RunOptions {
    /// Layer command line overrides on top of the discovered config
    pub fn apply(&self, mut config: RunnerConfig) -> RunnerConfig {
        if let Some(tick) = self.tick_seconds {
            config.tick_seconds = tick;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        if self.realtime {
            config.realtime = true;
        }
        config
    }
}

#[derive(Debug, Parser)]
#[command(name = "tasktree")]
#[command(author = "Tasktree Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive a cooperative, tick-based task tree described by a TOML plan")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a tree from a plan and tick it until it finishes
    Run {
        /// Path to the TOML plan
        plan: PathBuf,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Seconds per tick
        #[arg(short = 't', long = "tick", value_name = "SECONDS")]
        tick: Option<f64>,
        /// Stop after this many ticks
        #[arg(short = 'm', long = "max-ticks")]
        max_ticks: Option<u64>,
        /// Pace ticks with the wall clock
        #[arg(short = 'r', long = "realtime")]
        realtime: bool,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
        /// Print the run report and final snapshot as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Build a tree from a plan and print it without ticking
    Show {
        /// Path to the TOML plan
        plan: PathBuf,
        /// Print a JSON snapshot instead of the outline
        #[arg(long = "json")]
        json: bool,
    },
    /// Show configuration discovery information
    ShowConfig {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Run {
                plan,
                config,
                tick,
                max_ticks,
                realtime,
                verbose,
                json,
            }) => {
                if let Some(tick) = tick
                    && (!tick.is_finite() || *tick <= 0.0)
                {
                    return Err(format!("--tick must be a positive number of seconds, got {tick}"));
                }
                Ok(ExecutionMode::Run(RunOptions {
                    plan: plan.clone(),
                    config_override: config.clone(),
                    tick_seconds: *tick,
                    max_ticks: *max_ticks,
                    realtime: *realtime,
                    verbose: *verbose,
                    json: *json,
                }))
            }
            Some(Commands::Show { plan, json }) => Ok(ExecutionMode::Show {
                plan: plan.clone(),
                json: *json,
            }),
            Some(Commands::ShowConfig { config }) => Ok(ExecutionMode::ShowConfig {
                config_override: config.clone(),
            }),
            None => Err(
                "No command specified. Use 'tasktree --help' to see available commands.".to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_parses_overrides() {
        let args = Args::try_parse_from([
            "tasktree", "run", "level.toml", "--tick", "0.5", "--max-ticks", "20", "--realtime",
            "-v",
        ])
        .unwrap();
        let mode = args.mode().unwrap();

        if let ExecutionMode::Run(options) = mode {
            assert_eq!(options.plan, PathBuf::from("level.toml"));
            assert_eq!(options.tick_seconds, Some(0.5));
            assert_eq!(options.max_ticks, Some(20));
            assert!(options.realtime);
            assert!(options.verbose);
            assert!(!options.json);
        } else {
            panic!("Expected Run mode");
        }
    }

    #[test]
    fn test_overrides_layer_on_config() {
        let options = RunOptions {
            tick_seconds: Some(0.1),
            ..RunOptions::default()
        };
        let base = RunnerConfig {
            max_ticks: 50,
            ..RunnerConfig::default()
        };

        let config = options.apply(base);
        assert_eq!(config.tick_seconds, 0.1);
        assert_eq!(config.max_ticks, 50);
        assert!(!config.realtime);
    }

    #[test]
    fn test_non_positive_tick_rejected() {
        let args = Args::try_parse_from(["tasktree", "run", "plan.toml", "--tick", "0"]).unwrap();
        assert!(args.mode().is_err());
    }

    #[test]
    fn test_show_and_show_config() {
        let args = Args::try_parse_from(["tasktree", "show", "plan.toml", "--json"]).unwrap();
        assert!(matches!(args.mode().unwrap(), ExecutionMode::Show { json: true, .. }));

        let args = Args::try_parse_from(["tasktree", "show-config"]).unwrap();
        assert!(matches!(
            args.mode().unwrap(),
            ExecutionMode::ShowConfig {
                config_override: None
            }
        ));
    }

    #[test]
    fn test_no_command_error() {
        let args = Args { command: None };
        assert!(args.mode().is_err());
    }
}
