//! Glossary CLI - SLB Oilfield Glossary scraper
//!
//! Lists topics, searches terms and exports definitions to xlsx, csv, json or txt.

mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use glossary_core::{chrome, Glossary, Language, SearchResult};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "glossary")]
#[command(author, version, about = "Search the SLB Oilfield Glossary from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Glossary language: en or es
    #[arg(short, long, global = true)]
    language: Option<Language>,

    /// Browser to drive: chrome or edge
    #[arg(long, global = true)]
    browser: Option<String>,

    /// Path to the browser executable
    #[arg(long, global = true)]
    browser_path: Option<PathBuf>,

    /// Show the browser window while scraping
    #[arg(long, global = true)]
    open_browser: bool,

    /// Page load timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the glossary topics and their term counts
    Topics {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the glossary
    Search {
        /// Search query
        query: String,

        /// Only keep definitions under these topics (comma separated)
        #[arg(short, long)]
        topic: Option<String>,

        /// Only terms starting with this letter
        #[arg(short, long)]
        start_letter: Option<char>,

        /// Maximum number of terms (defaults to the configured max_results)
        #[arg(short, long, conflicts_with = "all")]
        max: Option<usize>,

        /// Return every matching term
        #[arg(long)]
        all: bool,

        /// Save results to this file (.xlsx, .csv, .json or .txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format when printing: text, json
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Get the terms filed under a topic
    Terms {
        /// Topic(s), comma separated
        topic: String,

        /// Maximum number of terms
        #[arg(short, long)]
        max: Option<usize>,

        /// Save results to this file (.xlsx, .csv, .json or .txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format when printing: text, json
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the configuration file location
    Path,
}

#[derive(Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stdout is reserved for results
    let filter = if cli.verbose {
        Some(EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().ok()
    };
    if let Some(filter) = filter {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let mut config = Config::load()?;
    apply_overrides(&cli, &mut config)?;
    debug!(
        "Using {} ({}), language {}",
        config.browser.kind,
        if config.browser.open_browser { "windowed" } else { "headless" },
        config.general.language
    );

    match cli.command {
        Commands::Topics { json } => run_topics(&config, json).await?,
        Commands::Search {
            query,
            topic,
            start_letter,
            max,
            all,
            output,
            format,
        } => {
            let max = if all {
                None
            } else {
                Some(max.unwrap_or(config.general.max_results))
            };
            run_search(&config, &query, topic.as_deref(), start_letter, max, output, format).await?
        }
        Commands::Terms {
            topic,
            max,
            output,
            format,
        } => run_terms(&config, &topic, max, output, format).await?,
        Commands::Config { action } => run_config(action, &config)?,
    }

    Ok(())
}

/// Command line flags win over the configuration file
fn apply_overrides(cli: &Cli, config: &mut Config) -> Result<()> {
    if let Some(language) = cli.language {
        config.general.language = language;
    }
    if let Some(ref browser) = cli.browser {
        config.browser.kind = browser.parse()?;
    }
    if let Some(ref path) = cli.browser_path {
        let mut browser = config.to_glossary_config().browser;
        chrome::register_executable(&mut browser, path)?;
        config.browser.path = browser.executable;
    }
    if cli.open_browser {
        config.browser.open_browser = true;
    }
    if let Some(timeout) = cli.timeout {
        config.browser.page_load_timeout_secs = Some(timeout);
    }
    Ok(())
}

async fn run_topics(config: &Config, json: bool) -> Result<()> {
    let mut glossary = Glossary::open(config.to_glossary_config()).await?;

    if json {
        let out = serde_json::json!({
            "size": glossary.size(),
            "topics": glossary.topics(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for topic in glossary.topics() {
            println!("{} ({})", topic.name, topic.count);
        }
        println!("\nTotal terms: {}", glossary.size());
    }

    glossary.close().await?;
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    topic: Option<&str>,
    start_letter: Option<char>,
    max: Option<usize>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut glossary = Glossary::open(config.to_glossary_config()).await?;
    let found = glossary.search(query, topic, start_letter, max).await;
    glossary.close().await?;

    emit(&glossary, topic.unwrap_or(query), &found?, output, format)
}

async fn run_terms(
    config: &Config,
    topic: &str,
    max: Option<usize>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut glossary = Glossary::open(config.to_glossary_config()).await?;
    let found = glossary.terms_on(topic, max).await;
    glossary.close().await?;

    emit(&glossary, topic, &found?, output, format)
}

/// Save results to a file, or print them
fn emit(
    glossary: &Glossary,
    topic: &str,
    results: &[SearchResult],
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(path) = output {
        let written = glossary.save(topic, results, Some(&path))?;
        eprintln!("Saved {} results to {}", results.len(), written.display());
        return Ok(());
    }

    match format {
        OutputFormat::Text => print!("{}", format_text(results)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
    }
    Ok(())
}

fn format_text(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.\n".to_string();
    }

    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let tags: Vec<&str> = [result.grammatical_label.as_deref(), result.topic.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        out.push_str(&format!("({}). {}", i + 1, result.term));
        if !tags.is_empty() {
            out.push_str(&format!(" [{}]", tags.join(", ")));
        }
        out.push('\n');
        out.push_str(result.definition.as_deref().unwrap_or("(no definition)"));
        out.push_str("\n\n");
    }
    out
}

fn run_config(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Set { key, value } => {
            // Persist on top of the file, not the flag overrides
            let mut stored = Config::load()?;
            stored.set(&key, &value)?;
            stored.save()?;
            println!("{} = {}", key, value);
        }
        ConfigAction::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No configuration directory available"),
        },
    }
    Ok(())
}
