pub mod archive;
pub mod clone;
pub mod config;
pub mod git;
pub mod pack;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILENAME;
use crate::git::GitCli;
use crate::pack::{PackError, PackOutcome, Packer};

#[derive(Parser)]
#[command(
    name = "gitpacker",
    about = "Clone a list of git repositories into one tree and optionally zip it"
)]
struct Cli {
    /// Pack config to load
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => {
            report_error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<PackOutcome, PackError> {
    let config = config::load(&cli.config)?;
    println!(
        "Loaded pack config from {}: {} repos into {}",
        cli.config.display(),
        config.repos.len(),
        if config.root_clone_directory.is_empty() {
            "."
        } else {
            config.root_clone_directory.as_str()
        }
    );
    log::debug!("{:#?}", config);

    if !GitCli::new().is_available() {
        log::warn!("git binary not found on PATH; every clone will fail");
    }

    Packer::new(".").run(&config)
}

fn print_outcome(outcome: &PackOutcome) {
    for cloned in &outcome.report.cloned {
        let pinned = match (&cloned.head, &cloned.checked_out) {
            (Some(head), Some(commit)) => {
                format!(" at {} (tip was {})", short_sha(commit), short_sha(head))
            }
            _ => String::new(),
        };
        let stripped = if cloned.stripped { " (history removed)" } else { "" };
        println!("Cloned {}{}{}", cloned.path.display(), pinned, stripped);
    }

    match &outcome.archive {
        Some(summary) => println!(
            "Wrote {} ({} files, {} bytes)",
            summary.path.display(),
            summary.files,
            summary.bytes
        ),
        None => println!("Archiving disabled"),
    }
}

fn report_error(e: &PackError) {
    match e {
        PackError::CloneFailures(report) => {
            for failure in &report.failures {
                println!(
                    "Cloning error in {}: {}",
                    failure.clone_directory, failure.error
                );
            }
            println!("Error: {}; skipping archive", e);
        }
        PackError::Config(err) => {
            println!("Error loading pack config: {}", err);
        }
        PackError::Archive(err) => {
            println!("Error building archive: {}", err);
        }
    }
}

fn short_sha(commit: &str) -> &str {
    if commit.len() > 12 {
        &commit[..12]
    } else {
        commit
    }
}
