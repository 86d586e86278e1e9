use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use curio_cli::output::{self, OutputFormat};
use curio_cli::registry;
use curio_fetch_core::config::ConfigManager;
use curio_fetch_core::event::{FetchEvent, FetchResult, Severity, channel};
use curio_fetch_core::{CollectionKind, FetchKey, FetchRequest};
use is_terminal::IsTerminal;

#[derive(Parser)]
#[command(name = "curio")]
#[command(author, version, about = "Metadata fetcher for the curio collection cataloger", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the registered sources
    Search {
        /// Collection type to search for
        #[arg(value_enum)]
        collection: CollectionArg,

        /// Search term
        query: String,

        /// Search key
        #[arg(short, long, value_enum, default_value = "title")]
        key: KeyArg,

        /// Query a single source instead of all capable ones
        #[arg(short, long)]
        source: Option<String>,

        /// Fetch the full entry for every result
        #[arg(long)]
        hydrate: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the registered sources and their capabilities
    Sources,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Print the resolved configuration
    Show,
    /// Write a configuration file with the default settings
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CollectionArg {
    Book,
    Video,
    Music,
    Game,
    Boardgame,
    Comic,
}

impl From<CollectionArg> for CollectionKind {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Book => CollectionKind::Book,
            CollectionArg::Video => CollectionKind::Video,
            CollectionArg::Music => CollectionKind::Music,
            CollectionArg::Game => CollectionKind::Game,
            CollectionArg::Boardgame => CollectionKind::BoardGame,
            CollectionArg::Comic => CollectionKind::Comic,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyArg {
    Title,
    Person,
    Keyword,
    Isbn,
    Upc,
    Raw,
}

impl From<KeyArg> for FetchKey {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::Title => FetchKey::Title,
            KeyArg::Person => FetchKey::Person,
            KeyArg::Keyword => FetchKey::Keyword,
            KeyArg::Isbn => FetchKey::Isbn,
            KeyArg::Upc => FetchKey::Upc,
            KeyArg::Raw => FetchKey::Raw,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    match cli.command {
        Commands::Search {
            collection,
            query,
            key,
            source,
            hydrate,
            format,
        } => {
            run_search(
                collection.into(),
                key.into(),
                &query,
                source.as_deref(),
                hydrate,
                format,
            )
            .await
        }
        Commands::Sources => list_sources().await,
        Commands::Config { command } => run_config(command),
    }
}

async fn run_search(
    collection: CollectionKind,
    key: FetchKey,
    query: &str,
    source: Option<&str>,
    hydrate: bool,
    format: OutputFormat,
) -> Result<()> {
    let config_manager = ConfigManager::new();
    let config = config_manager.load().context("could not load configuration")?;

    let (tx, mut rx) = channel();
    let manager = registry::build_manager(&config, tx, config_manager).await?;
    let use_color = std::io::stdout().is_terminal();

    let request = FetchRequest::new(collection, key, query);
    let started = match source {
        Some(name) => {
            let Some(fetcher) = manager.get(name) else {
                bail!("unknown source {name:?}");
            };
            if !fetcher.can_fetch(collection) || !fetcher.can_search(key) {
                bail!("{} cannot search {collection} collections by {key}", fetcher.source());
            }
            let request = request.clone();
            tokio::spawn(async move {
                let _ = fetcher.search(request).await;
            });
            1
        }
        None => manager.start_search(&request),
    };

    if started == 0 {
        bail!("no registered source can search {collection} collections by {key}");
    }

    let mut results: Vec<FetchResult> = Vec::new();
    let mut done = 0;
    while done < started {
        let Some(event) = rx.recv().await else { break };
        match event {
            FetchEvent::ResultFound(result) => {
                if format == OutputFormat::Text {
                    println!("{}", output::format_result(&result, use_color));
                }
                results.push(result);
            }
            FetchEvent::Message {
                source,
                severity,
                text,
            } => {
                let label = match severity {
                    Severity::Error => "error".red().to_string(),
                    Severity::Warning => "warning".yellow().to_string(),
                    Severity::Info => "info".to_string(),
                };
                eprintln!("{label}: [{source}] {text}");
            }
            FetchEvent::Done { .. } => done += 1,
        }
    }

    if results.is_empty() {
        eprintln!("no results for {query:?}");
        return Ok(());
    }

    if hydrate {
        let mut entries = Vec::new();
        for result in &results {
            let entry = manager.fetch_entry(&result.source, result.uid).await?;
            if format == OutputFormat::Text {
                println!();
                print!("{}", output::format_entry(&entry, use_color));
            }
            entries.push(output::entry_to_json(&entry));
        }
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    } else if format == OutputFormat::Json {
        let listed: Vec<_> = results.iter().map(output::result_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
    }

    Ok(())
}

async fn list_sources() -> Result<()> {
    let config_manager = ConfigManager::new();
    let config = config_manager.load().context("could not load configuration")?;

    let (tx, _rx) = channel();
    let manager = registry::build_manager(&config, tx, config_manager).await?;

    let kinds = [
        CollectionKind::Book,
        CollectionKind::Video,
        CollectionKind::Music,
        CollectionKind::Game,
        CollectionKind::BoardGame,
        CollectionKind::Comic,
    ];
    for source in manager.sources() {
        let fetcher = manager.get(source).expect("listed source");
        let serves: Vec<String> = kinds
            .iter()
            .filter(|kind| fetcher.can_fetch(**kind))
            .map(|kind| kind.to_string())
            .collect();
        println!("{source}: {}", serves.join(", "));
    }
    Ok(())
}

fn run_config(command: ConfigCommand) -> Result<()> {
    let manager = ConfigManager::new();
    match command {
        ConfigCommand::Path => {
            println!("{}", manager.config_path().display());
        }
        ConfigCommand::Show => {
            let config = manager.load().context("could not load configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Init => {
            let path = manager.config_path();
            if path.exists() {
                bail!("configuration already exists at {}", path.display());
            }
            let config = manager.load()?;
            manager.save(&config)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
