//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::MatchConfig;
use crate::corner::Corner;

/// Bout - two-thread boxing match
#[derive(Parser, Debug)]
#[command(
    name = "bout",
    version,
    about = "Two boxers on two threads, one ring, strictly alternating strikes",
    after_help = "Logs are written to: ~/.local/share/bout/logs/bout.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `fight`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one bout
    Fight(FightArgs),

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for a single bout; anything unset comes from the config file
#[derive(Args, Debug, Default, Clone)]
pub struct FightArgs {
    /// Name of the red corner
    #[arg(long)]
    pub red: Option<String>,

    /// Name of the blue corner
    #[arg(long)]
    pub blue: Option<String>,

    /// Strikes needed to win
    #[arg(short, long)]
    pub threshold: Option<u32>,

    /// Corner holding the first turn
    #[arg(long, value_enum)]
    pub first: Option<Corner>,

    /// Seed for both participants' dice
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability that a strike knocks the opponent down
    #[arg(long)]
    pub knockdown_chance: Option<f64>,

    /// Longest knockdown in milliseconds
    #[arg(long)]
    pub max_recovery_ms: Option<u64>,

    /// Longest pause after a strike in milliseconds
    #[arg(long)]
    pub max_pace_ms: Option<u64>,

    /// Cancel the match if it runs longer than this
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Only print the result, not the play-by-play
    #[arg(short, long)]
    pub quiet: bool,
}

impl FightArgs {
    /// Layer these overrides on top of file configuration
    pub fn apply(&self, config: &mut MatchConfig) {
        if let Some(red) = &self.red {
            config.red = red.clone();
        }
        if let Some(blue) = &self.blue {
            config.blue = blue.clone();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(first) = self.first {
            config.first = first;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(chance) = self.knockdown_chance {
            config.knockdown.chance = chance;
        }
        if let Some(ms) = self.max_recovery_ms {
            config.knockdown.max_recovery_ms = ms;
        }
        if let Some(ms) = self.max_pace_ms {
            config.max_pace_ms = ms;
        }
        if let Some(ms) = self.deadline_ms {
            config.deadline_ms = Some(ms);
        }
    }
}

/// Output format for the match report
#[derive(Clone, Debug, Default, PartialEq, Eq)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["bout"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_fight_overrides_apply() {
        let cli = Cli::try_parse_from([
            "bout",
            "fight",
            "--red",
            "Frazier",
            "--threshold",
            "5",
            "--first",
            "blue",
            "--knockdown-chance",
            "0",
            "--seed",
            "9",
            "--format",
            "json",
        ])
        .unwrap();

        let Some(Command::Fight(args)) = cli.command else {
            panic!("expected fight");
        };
        assert_eq!(args.format, OutputFormat::Json);

        let mut config = MatchConfig::default();
        args.apply(&mut config);
        assert_eq!(config.red, "Frazier");
        assert_eq!(config.blue, "Tyson");
        assert_eq!(config.threshold, 5);
        assert_eq!(config.first, Corner::Blue);
        assert_eq!(config.knockdown.chance, 0.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_pace_ms, 500);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(Cli::try_parse_from(["bout", "fight", "--threshold", "-3"]).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["bout", "config", "--log-level", "debug"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config)));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
