//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// Cinearr - self-hosted movie catalog and streaming server
#[derive(Parser)]
#[command(name = "cinearr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// List the movie catalog
    #[command(alias = "ls")]
    Movies,

    /// Grant the admin role to an account
    Promote {
        /// Account email
        email: String,
    },

    /// Revoke the admin role from an account
    Demote {
        /// Account email
        email: String,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::{cmd_list_movies, cmd_set_role};
