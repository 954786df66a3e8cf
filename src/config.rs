// src/config.rs
use crate::catalog::CacheOptions;
use crate::constants::{DEFAULT_DEBOUNCE_MS, DEFAULT_RETRY_BUDGET, DEFAULT_RETRY_DELAY_MS};
use crate::error::AppError;
use crate::types::{Query, ValidationError};
use clap::Parser;
use std::time::Duration;
use url::Url;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Base URL of the catalog service (e.g., "http://localhost:3000/api")
    #[arg(long, env = "BOOKSHELF_API_URL")]
    pub base_url: Option<String>,

    /// Language/region code for generated books
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Seed for the book generator
    #[arg(short, long, default_value_t = 553218.0)]
    pub seed: f64,

    /// Average likes per book
    #[arg(long, default_value_t = 5.0)]
    pub likes: f64,

    /// Average reviews per book
    #[arg(long, default_value_t = 3.0)]
    pub reviews: f64,

    /// Maximum number of pages to load by scrolling (0 = until exhausted)
    #[arg(short, long, default_value_t = 3)]
    pub pages: usize,

    /// Quiet period in milliseconds before a filter edit is applied
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Delay in milliseconds before retrying a failed page
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    /// Show ISBN, cover image and reviews under each book
    #[arg(short, long, default_value_t = false)]
    pub expand: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved configuration, validated and ready to mount a catalog session.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub query: Query,
    pub max_pages: Option<usize>,
    pub debounce: Duration,
    pub cache: CacheOptions,
    pub expand: bool,
    pub verbose: bool,
}

impl CatalogConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let raw_url = cli.base_url.ok_or_else(|| {
            AppError::MissingConfiguration(
                "catalog base URL not set (use --base-url or BOOKSHELF_API_URL)".to_string(),
            )
        })?;
        let base_url = parse_base_url(&raw_url)?;
        let query = Query::new(cli.language, cli.seed, cli.likes, cli.reviews)?;

        Ok(CatalogConfig {
            base_url,
            query,
            max_pages: (cli.pages > 0).then_some(cli.pages),
            debounce: Duration::from_millis(cli.debounce_ms),
            cache: CacheOptions {
                retry_budget: DEFAULT_RETRY_BUDGET,
                retry_delay: Duration::from_millis(cli.retry_delay_ms),
            },
            expand: cli.expand,
            verbose: cli.verbose,
        })
    }

    /// Whether another page may be loaded after `loaded` pages.
    pub fn allows_page(&self, loaded: usize) -> bool {
        self.max_pages.map_or(true, |max| loaded < max)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: "only http and https are supported".to_string(),
        }
        .into());
    }
    Ok(url)
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:3000/api")
                .expect("Default base URL should be valid"),
            query: Query::new("en", 553218.0, 5.0, 3.0)
                .expect("Default query should be valid"),
            max_pages: Some(3),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            cache: CacheOptions::default(),
            expand: false,
            verbose: false,
        }
    }
}
