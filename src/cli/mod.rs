//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};

/// Themis - legal-advice completion proxy and terminal chat client
///
/// Runs the stateless proxy in front of an OpenAI-compatible completion
/// endpoint (SiliconFlow), or connects to a running proxy as a terminal
/// chat client.
#[derive(Parser, Debug)]
#[command(name = "themis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a configuration file (defaults to the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the completion proxy server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Interactive terminal chat against a running proxy
    Chat {
        /// Chat endpoint of the proxy
        #[arg(short, long, default_value = "http://127.0.0.1:8080/chat")]
        url: String,

        /// Role to consult
        #[arg(short, long, default_value = "general")]
        role: String,
    },

    /// List the available consultation roles
    Roles,
}
