//! License resolver CLI.
//!
//! Runs a resolution policy (`policy.toml`) against an offer sheet
//! (`offers.json`) so policies can be checked without a live license source.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resolver::core::source::resolve_source;
use resolver::core::summary::{KNOWN_FEATURES, feature_matrix};
use resolver::exit_codes;
use resolver::io::offers::OfferSheetProvider;
use resolver::io::policy_file::load_policy;
use resolver::logging;

#[derive(Parser)]
#[command(
    name = "resolver",
    version,
    about = "License resolution and acquisition engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one license from an offer sheet using a policy file.
    Resolve {
        /// Resolver policy (TOML).
        #[arg(long)]
        policy: PathBuf,
        /// Offer sheet (JSON) standing in for the license provider.
        #[arg(long)]
        offers: PathBuf,
        /// Also print the feature matrix of the acquired license.
        #[arg(long)]
        show_features: bool,
    },
    /// Print the provider options and registry endpoint a policy would use.
    Plan {
        #[arg(long)]
        policy: PathBuf,
    },
    /// List known license feature names.
    Features,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Resolve {
            policy,
            offers,
            show_features,
        } => cmd_resolve(&policy, &offers, show_features),
        Command::Plan { policy } => cmd_plan(&policy),
        Command::Features => {
            for feature in KNOWN_FEATURES {
                println!("{feature}");
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_resolve(policy_path: &Path, offers_path: &Path, show_features: bool) -> Result<i32> {
    let resolver = load_policy(policy_path)?.to_resolver()?;
    let mut provider = OfferSheetProvider::load(offers_path)?;
    let resolution = resolver
        .resolve(&mut provider)
        .with_context(|| format!("resolve license with {resolver}"))?;

    for rejected in &resolution.rejected {
        eprintln!("skipped {}: {}", rejected.short_name, rejected.rejection);
    }
    match &resolution.acquired {
        Some(acquired) => {
            println!("acquired {} ({})", acquired.short_name, acquired.plan);
            println!("{}", acquired.summary);
            if show_features {
                println!("{}", feature_matrix(&acquired.details));
            }
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!(
                "no license matched the policy ({} inspected, {} rejected)",
                resolution.inspected,
                resolution.rejected.len()
            );
            Ok(exit_codes::NOT_FOUND)
        }
    }
}

fn cmd_plan(policy_path: &Path) -> Result<i32> {
    let resolver = load_policy(policy_path)?.to_resolver()?;
    let source = resolve_source(resolver.source())?;
    let options = serde_json::to_string(&source.options).context("serialize options")?;
    println!("resolver: {resolver}");
    println!("options: {options}");
    println!("endpoint: {}", source.endpoint.as_deref().unwrap_or("none"));
    Ok(exit_codes::OK)
}
