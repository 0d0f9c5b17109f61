// scoutlens: filter, rank, compare and shortlist players from the processed
// scouting dataset.

mod commands;
mod render;

use anyhow::Context;
use clap::{Arg, ArgAction, Command, ValueHint};
use scoutlens_engine::error::{EngineError, ErrorKind};
use std::path::PathBuf;
use tracing::{error, info};

/// Default `RUST_LOG` directive when none is set.
const DEFAULT_LOG_FILTER: &str = "scoutlens_core=info,scoutlens_engine=info,scoutlens_cli=info,warn";

fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    // Global flags given after the subcommand are only visible on its matches.
    let (command, sub_matches) = matches
        .subcommand()
        .context("a subcommand is required")?;

    init_tracing(sub_matches.get_one::<PathBuf>("log_file"))?;
    info!("scoutlens starting up");

    match commands::run(command, sub_matches) {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<EngineError>() {
            Some(engine_err) => {
                error!("{:#}", err);
                eprintln!("error: {err:#}");
                eprintln!("hint: {}", guidance(engine_err.kind()));
                std::process::exit(2)
            }
            None => Err(err),
        },
    }
}

/// What the analyst should change after an engine failure.
fn guidance(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InputShape => {
            "adjust the metric selection or widen the filters so the pool is not empty"
        }
        ErrorKind::ReferenceNotFound => {
            "check the player name and make sure the filters keep that player in the pool"
        }
        ErrorKind::DegenerateWeight => "give at least one selected metric a weight above zero",
    }
}

// ---------------------------------------------------------------------------
// Command tree
// ---------------------------------------------------------------------------

fn metrics_arg() -> Arg {
    Arg::new("metrics")
        .short('m')
        .long("metrics")
        .help("Comma-separated metric keys (see `scoutlens catalog`)")
        .value_delimiter(',')
        .action(ArgAction::Append)
        .value_hint(ValueHint::Other)
}

fn preset_arg() -> Arg {
    Arg::new("preset")
        .long("preset")
        .help("Use a role preset's metrics instead of --metrics")
        .conflicts_with("metrics")
        .value_hint(ValueHint::Other)
}

fn weight_arg() -> Arg {
    Arg::new("weight")
        .short('w')
        .long("weight")
        .help("Metric weight as KEY=VALUE; repeatable. Unset metrics use the configured default")
        .action(ArgAction::Append)
        .value_hint(ValueHint::Other)
}

fn top_arg(default: &'static str) -> Arg {
    Arg::new("top")
        .short('n')
        .long("top")
        .help("Number of rows to show")
        .value_parser(clap::value_parser!(usize))
        .default_value(default)
}

fn filter_args() -> Vec<Arg> {
    let list = |id: &'static str, long: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .help(help)
            .value_delimiter(',')
            .action(ArgAction::Append)
            .global(true)
    };
    let number = |id: &'static str, long: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .help(help)
            .value_parser(clap::value_parser!(f64))
            .global(true)
    };
    vec![
        list("league", "league", "Keep only these leagues"),
        list("season", "season", "Keep only these seasons"),
        list("team", "team", "Keep only these squads"),
        list("role", "role", "Keep only these tactical roles"),
        number("min_age", "min-age", "Minimum age (inclusive)"),
        number("max_age", "max-age", "Maximum age (inclusive)"),
        number("min_minutes", "min-minutes", "Minimum minutes played (inclusive)"),
        number("max_minutes", "max-minutes", "Maximum minutes played (inclusive)"),
        Arg::new("age_cap")
            .long("age-cap")
            .help("Quick age cap")
            .value_parser(["u22", "u28"])
            .global(true),
    ]
}

fn build_cli() -> Command {
    Command::new("scoutlens")
        .version(clap::crate_version!())
        .about("Scouting analytics: rankings, similarity search and player comparison")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("base_dir")
                .long("base-dir")
                .help("Directory holding config/ and defaults/ (default: current directory)")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath)
                .global(true),
        )
        .arg(
            Arg::new("data_dir")
                .long("data-dir")
                .help("Dataset directory. Overrides dataset.dir from the configuration")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath)
                .global(true),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("Output format")
                .value_parser(["table", "json"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::new("log_file")
                .long("log-file")
                .help("Write logs to this file instead of stderr")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .args(filter_args())
        .subcommand(
            Command::new("catalog")
                .about("List the dataset's metrics, pools and role presets")
                .arg(
                    Arg::new("pool")
                        .long("pool")
                        .help("Only list metrics of this pool")
                        .value_parser(["per90", "rate", "ranking", "profile"]),
                ),
        )
        .subcommand(
            Command::new("rank")
                .about("Rank the filtered pool by one metric or a weighted composite")
                .arg(
                    Arg::new("metric")
                        .long("metric")
                        .help("Rank by a single metric's raw value")
                        .conflicts_with_all(["metrics", "preset"])
                        .value_hint(ValueHint::Other),
                )
                .arg(metrics_arg())
                .arg(preset_arg())
                .arg(weight_arg())
                .arg(
                    Arg::new("ascending")
                        .long("ascending")
                        .help("Lowest values first (single-metric ranking only)")
                        .requires("metric")
                        .action(ArgAction::SetTrue),
                )
                .arg(top_arg("25")),
        )
        .subcommand(
            Command::new("similar")
                .about("Find the players whose metric profile is closest to a reference player")
                .arg(Arg::new("player").help("Reference player").required(true))
                .arg(metrics_arg())
                .arg(preset_arg())
                .arg(weight_arg())
                .arg(
                    Arg::new("top")
                        .short('n')
                        .long("top")
                        .help("Number of neighbours (default: similarity.top_k)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("normalize_over")
                        .long("normalize-over")
                        .help("Min-max population (default: similarity.normalize_over)")
                        .value_parser(["global", "filtered"]),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare up to three players on a radar profile")
                .arg(
                    Arg::new("players")
                        .help("Players to compare; the first is the reference unless --reference is given")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("reference")
                        .long("reference")
                        .help("Reference player for deltas"),
                )
                .arg(metrics_arg())
                .arg(preset_arg())
                .arg(
                    Arg::new("context")
                        .long("context")
                        .help("Comparison group")
                        .value_parser(["filtered", "same-role", "same-league"])
                        .default_value("filtered"),
                ),
        )
        .subcommand(
            Command::new("strengths")
                .about("Show a player's strongest and weakest metrics within the filtered pool")
                .arg(Arg::new("player").help("Player").required(true))
                .arg(metrics_arg())
                .arg(preset_arg())
                .arg(top_arg("5")),
        )
        .subcommand(
            Command::new("teams")
                .about("Average up to three metrics per squad and rank the squads")
                .arg(metrics_arg().required(true))
                .arg(top_arg("10")),
        )
        .subcommand(
            Command::new("overview")
                .about("Maturity curve, role mix per league and, with --metrics, squad evolution by season")
                .arg(metrics_arg())
                .arg(preset_arg())
                .arg(top_arg("3")),
        )
        .subcommand(
            Command::new("shortlist")
                .about("Build a session shortlist from player names and print it")
                .arg(
                    Arg::new("players")
                        .help("Players to add")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .help("Workflow status")
                        .value_parser(["observed", "tracking", "candidate", "rejected"])
                        .default_value("observed"),
                )
                .arg(
                    Arg::new("priority")
                        .long("priority")
                        .help("Priority")
                        .value_parser(["A", "B", "C"])
                        .default_value("B"),
                )
                .arg(
                    Arg::new("tags")
                        .long("tags")
                        .help("Comma-separated tags"),
                )
                .arg(Arg::new("notes").long("notes").help("Free-text notes"))
                .arg(
                    Arg::new("next_action")
                        .long("next-action")
                        .help("Next action date (YYYY-MM-DD)"),
                )
                .arg(
                    Arg::new("fee")
                        .long("fee")
                        .help("Estimated fee"),
                ),
        )
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// results, or to `log_file` when given.
fn init_tracing(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .with_line_number(true);

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let subscriber = builder.with_writer(file).with_ansi(false).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}
