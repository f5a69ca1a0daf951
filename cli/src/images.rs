use anyhow::Result;
use clap::{arg, value_parser, Arg, ArgMatches};

use geogallery::api::ImageEntry;
use geogallery::gallery::{self, DEFAULT_LIMIT};
use geogallery::geo::DEFAULT_MAX_DISTANCE_KM;
use geogallery::{Config, Database, ImageRecord, Store};

pub fn cmd() -> clap::Command {
    clap::Command::new("images")
        .subcommand_required(true)
        .display_order(10)
        .about("Inspect and manipulate stored images")
        .subcommand(
            clap::Command::new("list")
                .about("Lists images, newest first")
                .arg(
                    Arg::new("skip")
                        .long("skip")
                        .value_parser(value_parser!(usize))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .default_value(DEFAULT_LIMIT.to_string()),
                ),
        )
        .subcommand(
            clap::Command::new("nearby")
                .arg_required_else_help(true)
                .about("Lists images within a distance of the given point")
                .arg(
                    arg!(<latitude> "Latitude in degrees")
                        .value_parser(value_parser!(f64))
                        .allow_negative_numbers(true),
                )
                .arg(
                    arg!(<longitude> "Longitude in degrees")
                        .value_parser(value_parser!(f64))
                        .allow_negative_numbers(true),
                )
                .arg(
                    Arg::new("distance")
                        .long("distance")
                        .short('d')
                        .help("Search distance in kilometers")
                        .value_parser(value_parser!(f64))
                        .default_value(DEFAULT_MAX_DISTANCE_KM.to_string()),
                ),
        )
        .subcommand(
            clap::Command::new("delete")
                .arg_required_else_help(true)
                .about("Deletes an image together with its metadata")
                .arg(arg!(<filename> "Stored filename of the image")),
        )
}

pub async fn run(matches: &ArgMatches, config: Config) -> Result<()> {
    geogallery::tracing::init(&config)?;
    config.validate()?;
    let db = Database::open(&config.database_url)?;

    match matches.subcommand() {
        Some(("list", m)) => {
            // Defaults are always present.
            let skip = m.get_one::<usize>("skip").copied().unwrap_or(0);
            let limit = m.get_one::<usize>("limit").copied().unwrap_or(DEFAULT_LIMIT);
            print(gallery::list(&db, skip, limit)?)?;
        }
        Some(("nearby", m)) => {
            let latitude = m.get_one::<f64>("latitude").copied().unwrap_or_default();
            let longitude = m.get_one::<f64>("longitude").copied().unwrap_or_default();
            let distance = m
                .get_one::<f64>("distance")
                .copied()
                .unwrap_or(DEFAULT_MAX_DISTANCE_KM);
            print(gallery::nearby(&db, latitude, longitude, distance)?)?;
        }
        Some(("delete", m)) => {
            let filename = m.get_one::<String>("filename").cloned().unwrap_or_default();
            gallery::delete(&filename, &config, &db).await?;
            println!("Deleted {filename}");
        }
        _ => unreachable!("subcommand is required"),
    }

    db.flush()?;
    Ok(())
}

fn print(records: Vec<ImageRecord>) -> Result<()> {
    let entries: Vec<ImageEntry> = records.into_iter().map(ImageEntry::from).collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
