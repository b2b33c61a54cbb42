//! CLI for the knet-server binary.
//!
//! Uses clap for argument parsing; flags override environment-derived
//! configuration.

use clap::Parser;

/// KNet - Knowledge Network research server
///
/// Automated multi-step deep research: expands a tree of search queries for
/// a topic, retrieves and summarizes content for each, and synthesizes a
/// structured report with deduplicated media and a provenance tree.
#[derive(Parser, Debug)]
#[command(
    name = "knet-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "KNet - Knowledge Network research server",
    long_about = "Automated multi-step deep research over the web.\n\n\
                  Given a topic, KNet iteratively expands a tree of search queries,\n\
                  retrieves and summarizes content for each, and synthesizes a\n\
                  structured report streamed live over SSE.",
    after_help = "EXAMPLES:\n    \
                  knet-server                      # Start with env configuration\n    \
                  knet-server --port 8080          # Override the bind port\n    \
                  knet-server -v                   # Verbose logging"
)]
pub struct Cli {
    /// Host address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
