use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use llm_file_renamer::{rename_all, ChatClient, Config, RenamePolicy};
use std::path::PathBuf;
use tracing::{error, info, warn};

fn cli() -> Command {
    Command::new("lfs")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Rename files with titles suggested by an LLM")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to config.toml in the installation root)")
                .global(true)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("change_filenames")
                .about("Rename every file under a directory")
                .arg(
                    Arg::new("directory")
                        .value_name("DIRECTORY")
                        .help("Directory to process")
                        .required(true)
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .help("Continue with the remaining files when one fails")
                        .action(clap::ArgAction::SetTrue)
                )
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let default_filter = if matches.get_flag("verbose") {
        "lfs=debug,llm_file_renamer=debug,warn"
    } else {
        "lfs=info,llm_file_renamer=info,warn"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match matches.subcommand() {
        Some(("change_filenames", sub_matches)) => change_filenames(sub_matches).await,
        _ => {
            println!("Hello from lfs!");
            Ok(())
        }
    }
}

async fn change_filenames(sub_matches: &ArgMatches) -> Result<()> {
    // Config problems are fatal before any request is made
    let config = match sub_matches.get_one::<String>("config") {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let mut policy = RenamePolicy::from(&config.rename);
    if sub_matches.get_flag("keep-going") {
        policy.stop_on_first_error = false;
    }

    let directory = match sub_matches.get_one::<String>("directory") {
        Some(directory) => PathBuf::from(directory),
        None => anyhow::bail!("A directory is required"),
    };

    let client = ChatClient::new(&config)?;

    info!("📁 Directory: {}", directory.display());
    info!("🤖 Model: {}", client.model());

    let summary = match rename_all(&directory, &client, &policy).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Error: {}", e);
            error!("Aborted renaming; no further file names were changed");
            std::process::exit(1);
        }
    };

    info!("✅ Renamed: {}", summary.renamed.len());
    if summary.has_failures() {
        warn!("❌ Failed: {}", summary.failed.len());
        for failed in &summary.failed {
            warn!("   {}: {}", failed.path.display(), failed.error);
        }
        std::process::exit(1);
    }

    Ok(())
}
