//! Bout - CLI entry point for running a boxing match

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use bout::cli::{Cli, Command, FightArgs, OutputFormat};
use bout::config::{Config, MatchConfig};
use bout::events::{EventBus, MatchEvent, spawn_event_listener};
use bout::{Bout, MatchOutcome, MatchReport};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bout")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("bout.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Fight(args)) => cmd_fight(config.bout, &args),
        Some(Command::Config) => cmd_config(&config),
        None => {
            debug!("main: no command, defaulting to fight");
            cmd_fight(config.bout, &FightArgs::default())
        }
    }
}

fn cmd_fight(mut match_config: MatchConfig, args: &FightArgs) -> Result<()> {
    args.apply(&mut match_config);
    debug!(?match_config, "cmd_fight: called");

    let text = args.format == OutputFormat::Text;
    let bus = EventBus::for_threshold(match_config.threshold);
    let printer = if text && !args.quiet {
        println!("{}", "🏆 BOXING MATCH 🏆".bold().yellow());
        Some(spawn_event_listener(bus.subscribe(), print_event))
    } else {
        None
    };

    let bout = Bout::with_events(match_config, bus.emitter()).context("Failed to set up the bout")?;
    let report = bout.run().context("Bout failed")?;

    // Closing every sender ends the printer thread
    drop(bout);
    drop(bus);
    if let Some(printer) = printer {
        match printer.join() {
            Ok(summary) if !summary.is_lossless() => {
                warn!(?summary, "cmd_fight: play-by-play dropped events");
                eprintln!(
                    "{} play-by-play fell behind and dropped {} events; use --format json for the full transcript",
                    "Warning:".yellow(),
                    summary.skipped
                );
            }
            Ok(_) => {}
            Err(_) => warn!("cmd_fight: event printer panicked"),
        }
    }

    match args.format {
        OutputFormat::Text => print_summary(&report, args.quiet),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    if !report.is_complete() {
        return Err(eyre::eyre!("Match did not complete: {:?}", report.outcome));
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

fn print_event(event: &MatchEvent) {
    let line = event.to_string();
    match event {
        MatchEvent::BoutStarted { .. } => println!("{}", line.dimmed()),
        MatchEvent::Strike { .. } => println!("{}", line),
        MatchEvent::Knockdown { .. } => println!("{}", line.red().bold()),
        MatchEvent::Stunned { .. } | MatchEvent::Recovered { .. } => println!("{}", line.dimmed()),
        MatchEvent::Winner { .. } => println!("🎉 {}", line.green().bold()),
        MatchEvent::Withdrawn { .. } | MatchEvent::Cancelled { .. } => println!("{}", line.yellow()),
    }
}

fn print_summary(report: &MatchReport, quiet: bool) {
    match &report.outcome {
        MatchOutcome::Decided { name, strikes, .. } if quiet => {
            println!("{} {} wins with {} strikes", "✓".green(), name.cyan(), strikes);
        }
        MatchOutcome::Decided { .. } => {}
        MatchOutcome::Abandoned { reason, .. } => {
            println!("{} Match abandoned: {}", "✗".red(), reason);
        }
    }
    for corner in [&report.red, &report.blue] {
        println!(
            "  {} {:<12} strikes: {:>3}  knockdowns: {:>2}",
            format!("{:<5}", corner.corner).dimmed(),
            corner.name,
            corner.strikes,
            corner.knockdowns
        );
    }
    if !quiet {
        println!("Match finished.");
    }
}
