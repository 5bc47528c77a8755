use anyhow::Context;
use clap::{Arg, Command, value_parser};
use common::config::Settings;
use common::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("Listing Loader")
        .version("1.0")
        .about("Loads real-estate listings from a delimited file into the store")
        .subcommand(
            Command::new("load")
                .about("Clear the store and load the input file")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Overrides ingest.input_path"),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .help("Overrides ingest.workers"),
                )
                .arg(
                    Arg::new("batch-size")
                        .short('b')
                        .long("batch-size")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .help("Overrides ingest.batch_size"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("load", load_matches)) => {
            let config_path = load_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/app.toml");

            if let Err(e) = run(config_path, load_matches).await {
                eprintln!("Load failed: {e:#}");
                process::exit(1);
            }
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}

async fn run(config_path: &str, matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let mut settings = Settings::new(config_path)
        .with_context(|| format!("failed to load settings from {config_path}"))?;

    if let Some(input) = matches.get_one::<String>("input") {
        settings.ingest.input_path = input.clone();
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        settings.ingest.workers = *workers;
    }
    if let Some(batch_size) = matches.get_one::<usize>("batch-size") {
        settings.ingest.batch_size = *batch_size;
    }

    init_logging(&settings.log);

    let report = ingest::run_load_pipeline(&settings)
        .await
        .with_context(|| format!("loading {}", settings.ingest.input_path))?;

    println!("{report}");
    Ok(())
}
