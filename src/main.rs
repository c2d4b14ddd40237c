//! repoman CLI - update repository publisher command line interface

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repoman::ops::{create_channel, publish, set_channel, PublishOptions};
use repoman::types::ChannelChange;
use repoman::Repo;

#[derive(Parser)]
#[command(name = "repoman")]
#[command(about = "publish versioned, deduplicated update repositories")]
#[command(version)]
struct Cli {
    /// increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// create a new, empty repository
    Init {
        /// repository directory; must not exist yet
        repo: PathBuf,
    },

    /// create a release channel with no current version
    Mkchan {
        /// repository directory
        repo: PathBuf,

        /// unique channel id
        channel: String,
    },

    /// set a channel's current version, or remove it if no version is given
    Setchan {
        /// repository directory
        repo: PathBuf,

        /// channel id
        channel: String,

        /// version id; omit or pass a negative value to remove an existing channel
        /// (a missing channel is created unpinned)
        #[arg(allow_negative_numbers = true)]
        version: Option<i64>,
    },

    /// publish a directory as a new version
    #[command(alias = "update")]
    Publish {
        /// repository directory
        repo: PathBuf,

        /// directory where blobs are stored
        storage: PathBuf,

        /// base URL the storage directory is served from
        url_base: String,

        /// directory holding the new version's files
        source: PathBuf,

        /// version name (e.g. 4.3.0.42)
        version_name: String,

        /// integer version id
        version_id: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("REPOMAN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("repoman={}", default)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> repoman::Result<()> {
    match command {
        Commands::Init { repo } => {
            Repo::init(&repo)?;
            println!("initialized repository at {}", repo.display());
        }

        Commands::Mkchan { repo, channel } => {
            let repo = Repo::open(&repo)?;
            create_channel(&repo, &channel)?;
            println!("created channel {}", channel);
        }

        Commands::Setchan {
            repo,
            channel,
            version,
        } => {
            let repo = Repo::open(&repo)?;
            let change = set_channel(&repo, &channel, version)?;
            match (change, version.filter(|v| *v >= 0)) {
                (ChannelChange::Removed, _) => println!("removed channel {}", channel),
                (_, Some(v)) => println!("channel {} -> version {}", channel, v),
                (_, None) => println!("created channel {} with no current version", channel),
            }
        }

        Commands::Publish {
            repo,
            storage,
            url_base,
            source,
            version_name,
            version_id,
        } => {
            let repo = Repo::open(&repo)?;
            let options = PublishOptions {
                storage: &storage,
                url_base: &url_base,
                source: &source,
                version_name: &version_name,
                version_id,
            };
            let report = publish(&repo, &options)?;

            println!(
                "published version {} ({}): {} files, {} reused, {} added, {} bytes copied",
                report.version.id,
                report.version.name,
                report.version.files.len(),
                report.reused,
                report.added,
                report.bytes_copied
            );
        }
    }

    Ok(())
}
