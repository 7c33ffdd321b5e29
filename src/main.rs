//! `themis` - completion proxy and terminal client for a legal-advice
//! AI assistant
//!
//! `serve` runs the stateless HTTP proxy in front of the SiliconFlow
//! completion API; `chat` connects to a running proxy from the terminal;
//! `roles` lists the consultation personas.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use themis_core::{list_roles, Config};

mod chat;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(Path::new(path))
                .with_context(|| format!("failed to load configuration from {}", path))?;
            config.apply_env_overrides();
            config
        }
        None => Config::load().context("failed to load configuration")?,
    };

    match cli.command {
        Commands::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.server.bind.clone());
            themis_core::server::run(config, &bind_addr).await
        }
        Commands::Chat { url, role } => chat::run_chat(&url, &role).await,
        Commands::Roles => {
            print_roles();
            Ok(())
        }
    }
}

fn print_roles() {
    let name_style = Style::new().cyan().bold();
    let dim = Style::new().dim();

    for role in list_roles() {
        println!(
            "{} {} {}",
            role.avatar,
            name_style.apply_to(&role.display_name),
            dim.apply_to(format!("({})", role.id))
        );
        println!("   {} — {}", role.title, role.description);
        println!("   {}", dim.apply_to(role.specialties.join(" · ")));
    }
}
