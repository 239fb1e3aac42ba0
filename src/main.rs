//! CLI entry point for the debate search store.
//!
//! Provides commands for managing debates and images and for searching them.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use debate_search::display::{
    THEME, create_debate_detail_table, create_debate_results_table, create_debates_table,
    create_image_hits_table, create_stats_table,
};
use debate_search::io::ExitCode;
use debate_search::logging::init_logging;
use debate_search::vector::LazyFastEmbedder;
use debate_search::{
    DebateId, HybridSearchEngine, ProvidedDescriber, Settings, StoreError, StorePaths,
    StoreResult, VectorDimension, VectorStore,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Debate store with hybrid semantic search
#[derive(Parser)]
#[command(
    name = "debate-search",
    version = env!("CARGO_PKG_VERSION"),
    about = "Store debates and images, search them by meaning and by text",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Set up .debate-search directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Create, inspect and delete debates
    Debate {
        #[command(subcommand)]
        action: DebateAction,
    },

    /// Add images to debates
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Image-level search by text
    Search {
        query: String,

        /// Number of results (defaults to search.default_k)
        #[arg(short, long)]
        k: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Rank debates for a query
    #[command(
        after_help = "Examples:\n  debate-search search-debates \"cats\"\n  debate-search search-debates \"cats\" --include-all --json"
    )]
    SearchDebates {
        query: String,

        /// Debates must score strictly above this value
        #[arg(long)]
        minimum_score: Option<f32>,

        /// Return all debates with their scores
        #[arg(long)]
        include_all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show store sizes
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Delete the database and the index snapshot
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DebateAction {
    /// Create a debate
    Add {
        tldr: String,
        #[arg(short, long, default_value = "")]
        summary: String,
    },

    /// Replace a debate's title and summary
    Update {
        id: u32,
        tldr: String,
        #[arg(short, long, default_value = "")]
        summary: String,
    },

    /// Show a debate with its images
    Show {
        id: u32,
        #[arg(long)]
        json: bool,
    },

    /// List debates, most recently updated first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete a debate, its images and their files
    Delete { id: u32 },
}

#[derive(Subcommand)]
enum ImageAction {
    /// Add an image; without a description it is stored without a vector
    Add {
        /// Debate id; 0 or unknown ids attach to the latest debate
        debate_id: u32,

        /// Image path relative to the media root
        path: String,

        /// Text description that gets embedded
        #[arg(short, long)]
        description: Option<String>,

        /// Extracted terms stored with the image
        #[arg(short, long, num_args = 1..)]
        terms: Vec<String>,
    },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("{}", THEME.warning_with_icon(&warning));
            eprintln!("Using default configuration for now.");
        }
    }

    let settings = if let Some(config_path) = &cli.config {
        match Settings::load_from(config_path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!(
                    "Configuration error loading from {}: {e}",
                    config_path.display()
                );
                return ExitCode::ConfigError.into();
            }
        }
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };

    init_logging(&settings.logging, settings.debug);

    match run(cli.command, &settings) {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&e.to_string()));
            for suggestion in e.recovery_suggestions() {
                eprintln!("  {suggestion}");
            }
            ExitCode::from_error(&e).into()
        }
    }
}

fn run(command: Commands, settings: &Settings) -> StoreResult<ExitCode> {
    match command {
        Commands::Init { force } => {
            match Settings::init_config_file(force) {
                Ok(path) => {
                    println!("Created configuration file at: {}", path.display());
                    println!("Edit this file to customize your settings.");
                    Ok(ExitCode::Success)
                }
                Err(e) => Err(StoreError::Config {
                    reason: e.to_string(),
                }),
            }
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            let toml_str = toml::to_string_pretty(settings).map_err(|e| StoreError::Config {
                reason: e.to_string(),
            })?;
            println!("{toml_str}");
            Ok(ExitCode::Success)
        }

        Commands::Debate { action } => run_debate(action, settings),

        Commands::Image {
            action:
                ImageAction::Add {
                    debate_id,
                    path,
                    description,
                    terms,
                },
        } => {
            let describer = match description {
                Some(description) => ProvidedDescriber::with_image(description, terms),
                None => ProvidedDescriber::new(),
            };
            let store = open_store(settings, describer)?;
            let image_id = store.process_and_add_image(DebateId::new(debate_id), &path)?;
            let image = store.get_image(image_id)?;
            store.close()?;

            let linked = image
                .debate_id
                .map_or_else(|| "no debate".to_string(), |id| format!("debate {id}"));
            let message = format!("Added image {image_id} to {linked}: {}", image.image_path);
            if image.has_vector {
                println!("{}", THEME.success_with_icon(&message));
            } else {
                println!("{}", THEME.warning_with_icon(&format!("{message} (no vector)")));
            }
            Ok(ExitCode::Success)
        }

        Commands::Search { query, k, json } => {
            let store = open_store(settings, ProvidedDescriber::new())?;
            let k = k.unwrap_or(settings.search.default_k);
            let results = store.search_by_text(&query, k)?;
            store.close()?;

            if json {
                print_json(&results)?;
            } else if results.hits.is_empty() {
                println!("No images found for '{query}'");
            } else {
                println!("{}", create_image_hits_table(&results.hits));
            }
            Ok(ExitCode::Success)
        }

        Commands::SearchDebates {
            query,
            minimum_score,
            include_all,
            json,
        } => {
            let store = open_store(settings, ProvidedDescriber::new())?;
            let engine = HybridSearchEngine::new(&store).with_vector_k(settings.search.vector_k);
            let results = engine.search_detailed(
                &query,
                minimum_score.unwrap_or(settings.search.minimum_score),
                include_all || settings.search.include_all,
            )?;
            store.close()?;

            if json {
                print_json(&results)?;
            } else if results.debates.is_empty() {
                println!("No debates found for '{query}'");
            } else {
                println!("{}", create_debate_results_table(&results.debates));
            }
            Ok(ExitCode::Success)
        }

        Commands::Stats { json } => {
            let store = open_store(settings, ProvidedDescriber::new())?;
            let stats = store.stats()?;
            store.close()?;

            if json {
                print_json(&stats)?;
            } else {
                println!("{}", create_stats_table(&stats));
            }
            Ok(ExitCode::Success)
        }

        Commands::Reset { yes } => {
            if !yes {
                eprintln!(
                    "{}",
                    THEME.warning_with_icon("This deletes all debates, images and vectors. Re-run with --yes")
                );
                return Ok(ExitCode::GeneralError);
            }
            let removed = VectorStore::reset(&StorePaths::from_settings(settings))?;
            for path in &removed {
                println!("Removed {}", path.display());
            }
            println!("{}", THEME.success_with_icon("Vector store reset"));
            Ok(ExitCode::Success)
        }
    }
}

fn run_debate(action: DebateAction, settings: &Settings) -> StoreResult<ExitCode> {
    let store = open_store(settings, ProvidedDescriber::new())?;

    let code = match action {
        DebateAction::Add { tldr, summary } => {
            let id = store.add_debate(&tldr, &summary)?;
            println!("{}", THEME.success_with_icon(&format!("Created debate {id}")));
            ExitCode::Success
        }
        DebateAction::Update { id, tldr, summary } => {
            store.update_debate(parse_debate_id(id)?, &tldr, &summary)?;
            println!("{}", THEME.success_with_icon(&format!("Updated debate {id}")));
            ExitCode::Success
        }
        DebateAction::Show { id, json } => {
            let detail = store.debate_detail(parse_debate_id(id)?)?;
            if json {
                print_json(&detail)?;
            } else {
                println!("{}", create_debate_detail_table(&detail));
            }
            ExitCode::Success
        }
        DebateAction::List { json } => {
            let debates = store.list_debates()?;
            if json {
                print_json(&debates)?;
            } else if debates.is_empty() {
                println!("No debates yet. Create one with 'debate-search debate add <tldr>'");
            } else {
                println!("{}", create_debates_table(&debates));
            }
            ExitCode::Success
        }
        DebateAction::Delete { id } => {
            let deletion = store.delete_debate(parse_debate_id(id)?)?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Deleted debate {id}: {} images, {} vectors, {} files",
                    deletion.images, deletion.vectors, deletion.files
                ))
            );
            ExitCode::Success
        }
    };

    store.close()?;
    Ok(code)
}

fn open_store(settings: &Settings, describer: ProvidedDescriber) -> StoreResult<VectorStore> {
    let dimension = VectorDimension::new(settings.store.dimension).map_err(|e| {
        StoreError::Config {
            reason: e.to_string(),
        }
    })?;
    let embedder = LazyFastEmbedder::new(
        &settings.embedding.model,
        settings.embedding.cache_dir.clone(),
        dimension,
    )
    .map_err(|e| StoreError::Config {
        reason: e.to_string(),
    })?;

    VectorStore::open(settings, Arc::new(embedder), Arc::new(describer))
}

fn parse_debate_id(id: u32) -> StoreResult<DebateId> {
    DebateId::new(id).ok_or(StoreError::NotFound { entity: "Debate", id })
}

fn print_json<T: Serialize>(value: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::InvalidInput {
        field: "output",
        reason: e.to_string(),
    })?;
    println!("{json}");
    Ok(())
}
