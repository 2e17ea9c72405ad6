use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

fn cli() -> Command {
    let before = Arg::new("before")
        .long("before")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Previous version of the document");
    let after = Arg::new("after")
        .long("after")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Current version of the document");

    Command::new("redraft")
        .version(redraft_core::VERSION)
        .about("Inspect paragraph diffs and differential analysis plans")
        .subcommand_required(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML engine configuration"),
        )
        .subcommand(
            Command::new("diff")
                .about("Print paragraph changes between two versions")
                .arg(before.clone())
                .arg(after.clone()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the analysis decision and context window for an edit")
                .arg(before)
                .arg(after)
                .arg(
                    Arg::new("consecutive")
                        .long("consecutive")
                        .default_value("0")
                        .value_parser(value_parser!(u32))
                        .help("Differential analyses already run in a row"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("--{name} is required"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let config = commands::load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("diff", args)) => {
            let before = commands::read_text(path(args, "before")?)?;
            let after = commands::read_text(path(args, "after")?)?;
            let report = commands::diff(&before, &after);
            info!(changes = report.changes.len(), "diff complete");
            print_json(&report)
        }
        Some(("plan", args)) => {
            let before = commands::read_text(path(args, "before")?)?;
            let after = commands::read_text(path(args, "after")?)?;
            let consecutive = args.get_one::<u32>("consecutive").copied().unwrap_or(0);
            let report = commands::plan(&before, &after, &config, consecutive);
            info!(
                decision = ?report.verdict.decision,
                entries = report.window.entries.len(),
                saved_tokens = report.window.savings.saved_tokens,
                "plan complete"
            );
            print_json(&report)
        }
        Some(("config", _)) => {
            print!("{}", commands::render_config(&config)?);
            Ok(())
        }
        _ => unreachable!("subcommand_required"),
    }
}
