//! Vortex installer CLI - download a Vortex project into a directory

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use installer_core::{Artifact, DownloadOutcome, ProductConfig, RepositoryDownloader};
use std::path::{Path, PathBuf};

/// Vortex product configuration
#[derive(Clone)]
pub struct VortexConfig;

impl ProductConfig for VortexConfig {
    fn name(&self) -> &'static str {
        "vortex-installer"
    }

    fn display_name(&self) -> &'static str {
        "Vortex"
    }

    fn source_env(&self) -> &'static str {
        "VORTEX_INSTALLER_REPO"
    }

    fn docs_url(&self) -> &'static str {
        "https://www.vortextemplate.com/docs"
    }
}

#[derive(Parser, Debug)]
#[command(name = "vortex-installer")]
#[command(about = "Download a Vortex project template")]
#[command(version)]
pub struct Args {
    /// Source to install from: a repository URL or local path, optionally
    /// followed by `#ref` (a tag, branch, commit, `stable` or `HEAD`)
    pub uri: Option<String>,

    /// Directory to extract the project into
    #[arg(short, long, default_value = ".")]
    pub destination: PathBuf,

    /// Only consider releases whose tag starts with this prefix
    #[arg(long = "release-prefix")]
    pub release_prefix: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Temporary files are not cleaned up on interrupt
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    logging::init_logging(args.verbose, args.quiet)?;

    let config = VortexConfig;
    let artifact = config
        .artifact(args.uri.as_deref())
        .context("Failed to parse the installation source")?;
    tracing::debug!(%artifact, default = artifact.is_default(), "Resolved installation source");

    std::fs::create_dir_all(&args.destination).with_context(|| {
        format!(
            "Failed to create destination directory: {}",
            args.destination.display()
        )
    })?;

    let downloader =
        RepositoryDownloader::from_config(&config).with_release_prefix(args.release_prefix);

    let result = run(&config, &downloader, &artifact, &args.destination).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    let outcome = result?;
    print_summary(&artifact, &outcome, &args.destination);
    Ok(())
}

#[cfg(feature = "tui")]
async fn run<C: ProductConfig>(
    config: &C,
    downloader: &RepositoryDownloader,
    artifact: &Artifact,
    destination: &Path,
) -> Result<DownloadOutcome> {
    cliclack::intro(config.display_name())?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Downloading {}", artifact));

    match downloader.download(artifact, destination).await {
        Ok(outcome) => {
            spinner.stop(format!("Downloaded {}", outcome.version));
            cliclack::outro(format!("Docs: {}", config.docs_url()))?;
            Ok(outcome)
        }
        Err(e) => {
            spinner.error("Download failed");
            Err(e).with_context(|| format!("Failed to download {}", artifact))
        }
    }
}

#[cfg(not(feature = "tui"))]
async fn run<C: ProductConfig>(
    config: &C,
    downloader: &RepositoryDownloader,
    artifact: &Artifact,
    destination: &Path,
) -> Result<DownloadOutcome> {
    println!(
        "{} {} from {}",
        "Installing".cyan().bold(),
        config.display_name(),
        artifact
    );

    downloader
        .download(artifact, destination)
        .await
        .with_context(|| format!("Failed to download {}", artifact))
}

fn print_summary(artifact: &Artifact, outcome: &DownloadOutcome, destination: &Path) {
    println!();
    println!(
        "{} {} ({}) into {}",
        "Installed".green().bold(),
        outcome.version,
        artifact.normalized_repo_url().dimmed(),
        destination.display()
    );
    if outcome.git_ref != outcome.version {
        println!("  {} {}", "ref:".dimmed(), outcome.git_ref);
    }
}
