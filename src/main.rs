use anyhow::{Context, Result};
use catalog_search::api::{ItemParams, LibraryApi, Representation, SearchParams};
use catalog_search::config::{find_config_file, load_config, Config, LoggingConfig};
use catalog_search::service::LibrarySearchService;
use catalog_search::transport::transport_from_config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Catalog Search - Query a library catalogue and inspect its records
#[derive(Parser, Debug)]
#[command(name = "catalog-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search a library catalogue with live availability", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output representation
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve queries from this record dump (overrides catalog.dump_path)
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Bypass the result-set cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output representation
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Plain JSON
    Json,
    /// HAL JSON with links
    Hal,
}

impl From<OutputFormat> for Representation {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Representation::Json,
            OutputFormat::Hal => Representation::HalJson,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalogue
    #[command(alias = "s")]
    Search {
        /// Title words
        #[arg(long, short)]
        title: Option<String>,

        /// Author words
        #[arg(long, short)]
        author: Option<String>,

        /// ISBN (cannot be combined with title or author)
        #[arg(long)]
        isbn: Option<String>,

        /// ISSN (cannot be combined with title or author)
        #[arg(long)]
        issn: Option<String>,

        /// Annotate results with live availability
        #[arg(long, default_value_t = false)]
        availability: bool,

        /// Index of the first result
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Page size (defaults to api.default_count)
        #[arg(long, short)]
        count: Option<usize>,
    },

    /// Show one record by control number
    #[command(alias = "i")]
    Item {
        /// Control number
        id: String,

        /// Skip live availability
        #[arg(long, default_value_t = false)]
        no_availability: bool,
    },

    /// Show the effective configuration
    Config {
        /// Only print the config file in use
        #[arg(long, default_value_t = false)]
        path: bool,
    },
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("catalog_search={level}")));

    let json = logging.format.as_deref() == Some("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config: Config = load_config(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&cli, &config.logging);

    if let Some(records) = &cli.records {
        config.catalog.dump_path = Some(records.clone());
    }
    if config.cache.enabled && config.cache.directory.is_none() {
        config.cache.directory = Some(catalog_search::config::default_cache_dir());
    }

    let representation = Representation::from(cli.format);

    match cli.command {
        Commands::Config { path } => {
            if path {
                match cli.config.clone().or_else(find_config_file) {
                    Some(path) => println!("{}", path.display()),
                    None => println!("(no config file; using defaults)"),
                }
            } else {
                print!("{}", config.to_toml()?);
            }
        }

        Commands::Search {
            title,
            author,
            isbn,
            issn,
            availability,
            start,
            count,
        } => {
            let api = build_api(&config)?;
            let params = SearchParams {
                title,
                author,
                isbn,
                issn,
                availability,
                start,
                count: count.unwrap_or(config.api.default_count).max(1),
                no_cache: cli.no_cache,
            };
            let body = api.search(representation, &params).await?;
            print_json(&body)?;
        }

        Commands::Item {
            id,
            no_availability,
        } => {
            let api = build_api(&config)?;
            let params = ItemParams {
                availability: !no_availability,
            };
            let body = api.item(representation, &id, params).await?;
            print_json(&body)?;
        }
    }

    Ok(())
}

fn build_api(config: &Config) -> Result<LibraryApi> {
    let transport = transport_from_config(&config.catalog)?;
    let service = LibrarySearchService::from_config(config, transport)?;
    if !service.has_availability() {
        tracing::debug!("Availability feed not configured");
    }
    Ok(LibraryApi::new(service, &config.api))
}
