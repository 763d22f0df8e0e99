//! AnimeStream command-line front end.

mod app;
mod session_file;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use shared::{Config, LogConfig};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Language for generated titles and messages (ar, en)
    #[arg(long)]
    locale: Option<shared::Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Currently airing anime
    Latest {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Most popular anime
    Popular {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Top rated anime
    Trending {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Browsable genres
    Categories,
    /// Search by title
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Full details of one anime
    Details { anime_id: u32 },
    /// Episode list of one anime
    Episodes { anime_id: u32 },
    /// Resolve playable sources for an episode
    Sources {
        anime_id: u32,
        #[arg(default_value_t = 1)]
        episode: u32,
    },
    /// Play an episode with the configured player
    Play {
        anime_id: u32,
        #[arg(default_value_t = 1)]
        episode: u32,
        /// Keep playing following episodes
        #[arg(long)]
        continuous: bool,
        /// Print the player command instead of running it
        #[arg(long)]
        dry_run: bool,
    },
    /// Create an account
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Sign in with email and password, or with an external id token
    Login {
        #[arg(required_unless_present = "google_token")]
        email: Option<String>,
        #[arg(required_unless_present = "google_token")]
        password: Option<String>,
        /// Google id token for external sign-in
        #[arg(long, conflicts_with_all = ["email", "password"])]
        google_token: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in profile
    Profile,
    /// Add or remove a favorite
    Favorite { anime_id: u32 },
    /// Add or remove an anime from the watch list
    Watchlist { anime_id: u32 },
    /// Show the watch history
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(locale) = args.locale {
        config.ui.locale = locale;
    }

    shared::logging::init(LogConfig::from_config(&config, "anime-cli", args.verbose))?;

    debug!(config_file = %args.config.display(), "Loaded configuration");

    let app = App::new(config).context("Failed to initialize services")?;

    match args.command {
        Command::Latest { limit } => app.latest(limit).await,
        Command::Popular { limit } => app.popular(limit).await,
        Command::Trending { limit } => app.trending(limit).await,
        Command::Categories => {
            app.categories();
            Ok(())
        }
        Command::Search { query, limit } => app.search(&query, limit).await,
        Command::Details { anime_id } => app.details(anime_id).await,
        Command::Episodes { anime_id } => app.episodes(anime_id).await,
        Command::Sources { anime_id, episode } => app.sources(anime_id, episode).await,
        Command::Play {
            anime_id,
            episode,
            continuous,
            dry_run,
        } => app.play(anime_id, episode, continuous, dry_run).await,
        Command::Register {
            username,
            email,
            password,
        } => app.register(&username, &email, &password).await,
        Command::Login {
            email,
            password,
            google_token,
        } => match google_token {
            Some(token) => app.login_external(&token).await,
            None => {
                app.login(
                    email.as_deref().unwrap_or_default(),
                    password.as_deref().unwrap_or_default(),
                )
                .await
            }
        },
        Command::Logout => app.logout().await,
        Command::Profile => app.profile().await,
        Command::Favorite { anime_id } => app.toggle_favorite(anime_id).await,
        Command::Watchlist { anime_id } => app.toggle_watch_list(anime_id).await,
        Command::History => app.history().await,
    }?;

    debug!("Command finished");
    Ok(())
}
