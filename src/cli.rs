// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fsearch",
    about = "AI web search with grounded citations",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// The search query.  When a conversation is already saved for this exact
    /// query, its latest answer is shown instead of searching again.
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Ask a follow-up within the saved conversation for QUERY
    #[arg(long, short = 'f', value_name = "QUESTION")]
    pub follow: Option<String>,

    /// Start a new conversation even when one is saved for this query
    #[arg(long)]
    pub fresh: bool,

    /// Gemini API key (overrides config file and environment)
    #[arg(long, env = "FSEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of a running fsearch server to query instead of calling the
    /// model in-process, e.g. http://127.0.0.1:3017
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Explicit config file path
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, e.g. 127.0.0.1:3017 (defaults to [server] listen)
        #[arg(long)]
        listen: Option<String>,
    },
    /// List saved conversations, most recent first
    Chats {
        /// Show at most N conversations
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Clear saved conversation state
    Clear {
        /// Query whose conversation should be cleared
        query: Option<String>,
        /// Clear all saved conversations
        #[arg(long)]
        all: bool,
    },
    /// Print the merged configuration
    ShowConfig,
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
