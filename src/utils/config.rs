//! Environment-driven configuration.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Top-level server configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bind address.
    pub server: ServerConfig,
    /// Generation service settings.
    pub llm: LLMConfig,
    /// Research run defaults.
    pub research: ResearchConfig,
}

/// HTTP bind settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Generation service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// Gemini API key.
    pub google_api_key: String,
    /// Gemini model identifier.
    pub model: String,
}

/// Defaults for research runs; request parameters override per session.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    /// Depth bound for branch exploration.
    pub max_depth: usize,
    /// Pages requested per search query.
    pub num_sites_per_query: usize,
    /// Maximum child queries per branch decision.
    pub breadth_limit: usize,
    /// Directory for persisted report artifacts.
    pub artifact_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// `GOOGLE_API_KEY` is required; everything else has defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()?,
            },
            llm: LLMConfig {
                google_api_key: env::var("GOOGLE_API_KEY")?,
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            },
            research: ResearchConfig {
                max_depth: env::var("RESEARCH_MAX_DEPTH")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
                num_sites_per_query: env::var("RESEARCH_SITES_PER_QUERY")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                breadth_limit: env::var("RESEARCH_BREADTH_LIMIT")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                artifact_dir: env::var("RESEARCH_ARTIFACT_DIR")
                    .unwrap_or_else(|_| "reports".to_string())
                    .into(),
            },
        })
    }
}
