pub mod archive;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod corpus;
pub mod credentials;
pub mod error;
pub mod nai_api;
pub mod registry;
pub mod search;
pub mod worker;

mod commands;

use clap::{Parser, Subcommand};
use commands::TagSearchArgs;
use config::{StudioConfig, CONFIG_FILE};
use std::path::PathBuf;

pub use error::{Result, StudioError};

/// Tag browser, prompt finder and image generation cache
#[derive(Parser)]
#[command(name = "nai-prompt-studio", version, about)]
struct Cli {
    /// Path to the studio config file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the tag catalog
    Tags {
        /// Case-insensitive substring of the tag name
        #[arg(short, long, default_value = "")]
        keyword: String,
        /// Category name, or ALL
        #[arg(long, default_value = search::WILDCARD)]
        category: String,
        /// D-group label, or ALL
        #[arg(long, default_value = search::WILDCARD)]
        d_group: String,
        /// Artist name (an optional "[power]" suffix is ignored), or ALL
        #[arg(long, default_value = search::WILDCARD)]
        artist: String,
        #[arg(long, default_value_t = 0)]
        min_power: u64,
        #[arg(long, default_value_t = 10_000)]
        max_power: u64,
    },
    /// List artists by descending power
    Artists {
        /// Only show the first N artists
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List every d-group label
    Groups,
    /// Search the prompt corpus; keywords are comma-separated
    Prompts {
        #[arg(default_value = "")]
        keywords: String,
        /// Seed for sampling when there are more matches than the cap
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Append tags to a prompt without duplicating existing ones
    Compose {
        prompt: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Print the cached image path for a prompt
    Show { prompt: String },
    /// Generate images for prompts that have none yet
    Generate {
        #[arg(required = true)]
        prompts: Vec<String>,
        /// Generate again even when an image is cached
        #[arg(long)]
        force: bool,
    },
    /// List cached prompt images
    Gallery,
    /// Manage the API token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Save a new token
    Set { token: String },
    /// Show whether a token is configured
    Show,
    /// Remove the saved token
    Clear,
}

/// Entry point: parses the command line and runs one command.
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = StudioConfig::load(&cli.config);
    log::debug!("Using config {:?}", config);

    match cli.command {
        Command::Tags {
            keyword,
            category,
            d_group,
            artist,
            min_power,
            max_power,
        } => commands::search_tag_catalog(
            &config,
            &TagSearchArgs {
                keyword,
                category,
                d_group,
                artist,
                min_power,
                max_power,
            },
        ),
        Command::Artists { limit } => commands::list_artists(&config, limit),
        Command::Groups => commands::list_d_groups(&config),
        Command::Prompts { keywords, seed } => {
            commands::search_prompt_corpus(&config, &keywords, seed)
        }
        Command::Compose { prompt, tags } => commands::compose_prompt(&prompt, &tags),
        Command::Show { prompt } => commands::show_image(&config, &prompt),
        Command::Generate { prompts, force } => commands::generate_images(&config, &prompts, force),
        Command::Gallery => commands::gallery(&config),
        Command::Token { action } => match action {
            TokenAction::Set { token } => commands::set_token(&config, &token),
            TokenAction::Show => commands::show_token(&config),
            TokenAction::Clear => commands::clear_token(&config),
        },
        Command::InitConfig => {
            config.save(&cli.config)?;
            println!("Wrote {}", cli.config.display());
            Ok(())
        }
    }
}
