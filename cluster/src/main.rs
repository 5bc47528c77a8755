use anyhow::Context;
use clap::{Arg, ArgMatches, Command, value_parser};
use cluster::api::{ApiResponse, ClusterQuery, PropertyQuery};
use common::config::Settings;
use common::logging::init_logging;
use serde::Serialize;
use std::process;

fn bounds_args(command: Command) -> Command {
    ["min-lat", "max-lat", "min-lng", "max-lng"]
        .into_iter()
        .fold(command, |command, name| {
            command.arg(
                Arg::new(name)
                    .long(name)
                    .value_name("DEGREES")
                    .allow_negative_numbers(true)
                    .value_parser(value_parser!(f64)),
            )
        })
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

#[tokio::main]
async fn main() {
    let matches = Command::new("Listing Map Queries")
        .version("1.0")
        .about("Clusters and lists stored real-estate listings for a map viewport")
        .subcommand(
            bounds_args(Command::new("clusters").about("Cluster the listings in a viewport"))
                .arg(config_arg())
                .arg(
                    Arg::new("zoom")
                        .short('z')
                        .long("zoom")
                        .value_name("LEVEL")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            bounds_args(Command::new("properties").about("List the listings in a viewport"))
                .arg(config_arg())
                .arg(
                    Arg::new("limit")
                        .short('l')
                        .long("limit")
                        .value_name("N")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("clusters", sub)) => run_clusters(sub).await,
        Some(("properties", sub)) => run_properties(sub).await,
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        let body = ApiResponse::<()>::error(format!("{e:#}"));
        if let Ok(json) = serde_json::to_string(&body) {
            println!("{json}");
        }
        process::exit(1);
    }
}

fn load_settings(matches: &ArgMatches) -> anyhow::Result<Settings> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/app.toml");
    let settings = Settings::new(config_path)
        .with_context(|| format!("failed to load settings from {config_path}"))?;
    init_logging(&settings.log);
    Ok(settings)
}

/// Absent flags read as zero, which the cluster query treats as missing.
fn degrees(matches: &ArgMatches, name: &str) -> f64 {
    matches.get_one::<f64>(name).copied().unwrap_or_default()
}

fn print_success<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ApiResponse::success(data))?);
    Ok(())
}

async fn run_clusters(matches: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(matches)?;
    let service = cluster::open_cluster_service(&settings).context("opening listing store")?;

    let query = ClusterQuery {
        min_lat: degrees(matches, "min-lat"),
        max_lat: degrees(matches, "max-lat"),
        min_lng: degrees(matches, "min-lng"),
        max_lng: degrees(matches, "max-lng"),
        zoom: matches.get_one::<u32>("zoom").copied().unwrap_or_default(),
    };
    print_success(service.clusters(&query).await?)
}

async fn run_properties(matches: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(matches)?;
    let service = cluster::open_cluster_service(&settings).context("opening listing store")?;

    let query = PropertyQuery {
        min_lat: degrees(matches, "min-lat"),
        max_lat: degrees(matches, "max-lat"),
        min_lng: degrees(matches, "min-lng"),
        max_lng: degrees(matches, "max-lng"),
        limit: matches.get_one::<usize>("limit").copied(),
    };
    print_success(service.properties(&query).await?)
}
