mod images;

use std::str::FromStr;

use clap::{Arg, ArgMatches, Command};
use geogallery::{config, Config};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cmd().get_matches();

    let mut config: Config = match matches.get_one::<String>("config") {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };
    apply_verbosity(&mut config, &matches)?;

    match matches.subcommand() {
        Some(("serve", _)) => geogallery::axum::start(config).await?,
        Some(("images", m)) => images::run(m, config).await?,
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

/// Command line verbosity takes precedence over the configured log level.
fn apply_verbosity(config: &mut Config, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(level) = matches.get_one::<String>("verbosity") {
        config.tracing.level = geogallery::tracing::Level::from_str(level)?;
        config.tracing.enabled = level != "none";
    }
    Ok(())
}

pub fn cmd() -> Command {
    Command::new("geogallery")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .infer_subcommands(true)
        .version(VERSION)
        .about("Geo-tagged image gallery backend")
        .subcommand(Command::new("serve").about("Starts the http server"))
        .subcommand(images::cmd())
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .global(true)
                .help("Path to the config file"),
        )
        .arg(
            Arg::new("verbosity")
                .long("verbosity")
                .short('v')
                .display_order(100)
                .value_name("level")
                .value_parser(["trace", "debug", "info", "warn", "error", "none"])
                .global(true)
                .help("Set the verbosity of the log output"),
        )
}
