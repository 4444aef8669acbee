//! `studio-panel` binary

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::time::Duration;
use studio_cli::{replay, ReplayReport, Script};
use studio_draft::EngineConfig;
use studio_entities::{TaskKind, TeamKind};
use tracing_subscriber::EnvFilter;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Engine configuration (TOML)")
}

fn load_config(args: &ArgMatches) -> anyhow::Result<EngineConfig> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default().with_env_overrides()?,
    };
    Ok(config)
}

fn print_report(report: &ReplayReport) {
    println!("Replay Report:");
    println!("  Entity: {}", report.entity);
    match report.id {
        Some(id) => println!("  Id: {}", id),
        None => println!("  Id: (never created)"),
    }
    println!("  Updates: {}", report.updates);
    println!("  Relations: {}", report.relations.len());
    for link in &report.relations {
        println!("    {} -> {}", link.domain_type, link.related_id);
    }
    println!("  Deleted: {}", report.deleted);
    println!("  Statuses:");
    for status in &report.statuses {
        println!("    {}", status);
    }
    if let Some(stored) = &report.stored {
        println!("  Stored: {}", stored);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("studio-panel")
        .version(studio_cli::VERSION)
        .about("Replay entity panel sessions against the draft engine")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("replay")
                .about("Run a session script and report what was persisted")
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .default_value("task")
                        .value_parser(["task", "team"])
                        .help("Entity type the script edits"),
                )
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Session script (JSON)"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .value_parser(value_parser!(u64))
                        .help("Artificial backend latency per call"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("show-config")
                .about("Print the effective engine configuration")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("replay", args)) => {
            let config = load_config(args)?;
            let script_path = args
                .get_one::<PathBuf>("script")
                .context("--script is required")?;
            let latency = args
                .get_one::<u64>("latency-ms")
                .map(|ms| Duration::from_millis(*ms));

            tracing::info!(
                "replaying {} (debounce {}ms)",
                script_path.display(),
                config.debounce_ms
            );
            let report = match args.get_one::<String>("entity").map(String::as_str) {
                Some("team") => replay(Script::<TeamKind>::load(script_path)?, config, latency).await?,
                _ => replay(Script::<TaskKind>::load(script_path)?, config, latency).await?,
            };

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Some(("show-config", args)) => {
            let config = load_config(args)?;
            print!("{}", toml::to_string(&config)?);
        }
        _ => {}
    }
    Ok(())
}
