// src/main.rs

use bookshelf::{listing, AppError, BookHttpClient, CatalogConfig, CatalogSession, CommandLineInput};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("bookshelf.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    // Logs go to stderr so the listing on stdout stays pipeable.
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads the first page, then keeps scrolling the sentinel into view until
/// the result set or the page allowance runs out.
async fn browse_catalog(config: &CatalogConfig) -> Result<(), AppError> {
    let client = BookHttpClient::new(&config.base_url)?;
    log::info!("Browsing {} for {}", client.books_url()?, config.query.key());

    let session = CatalogSession::new(
        client,
        config.query.clone(),
        config.debounce,
        config.cache.clone(),
    );

    let mut view = session.wait_for_idle().await;
    let mut printed = 0;

    loop {
        if let Some(failure) = view.failure() {
            session.teardown();
            return Err(failure);
        }

        let fresh = view.items.get(printed..).unwrap_or_default();
        print!("{}", listing::render(fresh, printed + 1, config.expand));
        printed = view.items.len();

        if !view.has_more || !config.allows_page(view.pages_loaded) {
            break;
        }

        if let Some(Err(e)) = session.scroll_to_end().await {
            session.teardown();
            return Err(e);
        }
        view = session.wait_for_idle().await;
    }

    if view.items.is_empty() {
        println!("No books match these filters.");
    } else if view.has_more {
        println!(
            "-- {} books in {} page(s), more available --",
            view.items.len(),
            view.pages_loaded
        );
    } else {
        println!("-- {} books, end of catalog --", view.items.len());
    }

    session.teardown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = CatalogConfig::resolve(cli)?;

    browse_catalog(&config).await?;

    Ok(())
}
