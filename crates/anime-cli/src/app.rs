//! Wiring of catalog, streaming and account services for the CLI.

use crate::session_file;
use accounts::{
    AccountError, DocumentStore, ExternalCredential, FirebaseAuth, FirestoreStore, MemoryStore,
    ProfileStore, Session, SessionManager, SqliteStore,
};
use anyhow::{anyhow, bail, Context, Result};
use catalog::api::AnimeSummary;
use catalog::{categories, CatalogService, JikanClient, TtlCache};
use shared::config::StoreBackend;
use shared::{Config, Locale, VideoSource};
use std::path::PathBuf;
use std::sync::Arc;
use streaming::{PlaybackController, PlaybackEvent, PlaybackState, ProcessPlayer, SourceResolver};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

pub struct App {
    config: Config,
    catalog: CatalogService,
    sessions: SessionManager,
    profiles: ProfileStore,
    session_path: PathBuf,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(
            JikanClient::from_config(&config.catalog).context("Failed to create Jikan client")?,
        );
        let cache = TtlCache::from_config(&config.catalog.cache);
        let catalog = CatalogService::new(api, cache, config.ui.locale);

        let store = build_store(&config)?;
        let identity = Arc::new(
            FirebaseAuth::from_config(&config.identity)
                .context("Failed to create identity client")?,
        );
        let sessions = SessionManager::new(identity, Arc::clone(&store));
        let profiles = ProfileStore::new(store);

        let session_path = config.session_path();
        if let Some(session) = session_file::load(&session_path)? {
            sessions.restore(session);
        }

        Ok(Self {
            config,
            catalog,
            sessions,
            profiles,
            session_path,
        })
    }

    fn locale(&self) -> Locale {
        self.config.ui.locale
    }

    fn default_limit(&self, limit: Option<u32>) -> u32 {
        limit.unwrap_or(self.config.catalog.default_limit)
    }

    pub async fn latest(&self, limit: Option<u32>) -> Result<()> {
        let anime = self
            .catalog
            .latest(self.default_limit(limit))
            .await
            .context("Failed to load latest anime")?;
        print_list(&anime);
        Ok(())
    }

    pub async fn popular(&self, limit: Option<u32>) -> Result<()> {
        let anime = self
            .catalog
            .popular(self.default_limit(limit))
            .await
            .context("Failed to load popular anime")?;
        print_list(&anime);
        Ok(())
    }

    pub async fn trending(&self, limit: Option<u32>) -> Result<()> {
        let anime = self
            .catalog
            .trending(self.default_limit(limit))
            .await
            .context("Failed to load top rated anime")?;
        print_list(&anime);
        Ok(())
    }

    pub fn categories(&self) {
        for category in categories() {
            let name = match self.locale() {
                Locale::Arabic => category.name_localized,
                Locale::English => category.name,
            };
            println!("{:>4}  {:<12} {}", category.id, name, category.description);
        }
    }

    pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<()> {
        let limit = limit.unwrap_or(self.config.catalog.search_limit);
        let results = self.catalog.search(query, limit).await;
        if results.is_empty() {
            println!("No results for \"{}\"", query);
        }
        print_list(&results);
        Ok(())
    }

    pub async fn details(&self, anime_id: u32) -> Result<()> {
        let details = self
            .catalog
            .details(anime_id)
            .await
            .with_context(|| format!("Failed to load anime {}", anime_id))?;

        println!("{} [{}]", details.title, details.mal_id);
        if let Some(english) = &details.title_english {
            println!("  English:  {}", english);
        }
        if let Some(episodes) = details.episodes {
            println!("  Episodes: {}", episodes);
        }
        if let Some(score) = details.score {
            println!("  Score:    {:.2}", score);
        }
        if let Some(status) = &details.status {
            println!("  Status:   {}", status);
        }
        if !details.genres.is_empty() {
            let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
            println!("  Genres:   {}", genres.join(", "));
        }
        if let Some(synopsis) = &details.synopsis {
            println!();
            println!("{}", synopsis);
        }
        Ok(())
    }

    pub async fn episodes(&self, anime_id: u32) -> Result<()> {
        let episodes = self.catalog.episodes(anime_id).await;
        for episode in episodes.iter() {
            let mut flags = Vec::new();
            if episode.is_filler {
                flags.push("filler");
            }
            if episode.is_recap {
                flags.push("recap");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            println!("{:>4}  {}{}", episode.id, episode.title_localized, flags);
        }
        Ok(())
    }

    pub async fn sources(&self, anime_id: u32, episode: u32) -> Result<()> {
        let resolver = SourceResolver::from_config(&self.config.streaming)?;
        let sources = resolver.resolve(anime_id, episode).await;
        for (index, source) in sources.iter().enumerate() {
            print_source(index, source);
        }
        Ok(())
    }

    /// Play an episode, optionally continuing through the following ones
    ///
    /// Works without a session. Watch history is only recorded when signed in.
    pub async fn play(
        &self,
        anime_id: u32,
        episode: u32,
        continuous: bool,
        dry_run: bool,
    ) -> Result<()> {
        let resolver = Arc::new(SourceResolver::from_config(&self.config.streaming)?);
        let player = ProcessPlayer::from_config(&self.config.streaming).dry_run(dry_run);
        let (mut controller, mut events) =
            PlaybackController::new(player, resolver, self.catalog.episode_directory());

        let mut state = controller.open(anime_id, episode).await;
        loop {
            drain_events(&mut events);

            if state == PlaybackState::Playing {
                self.record_watch(anime_id, controller.episode()).await;
            }

            let has_next = (controller.episode() as usize) < controller.episode_count();
            if !continuous || state != PlaybackState::Playing || !has_next {
                break;
            }
            state = controller.next_episode().await;
        }

        let final_state = state;
        controller.close().await;
        drain_events(&mut events);

        if final_state == PlaybackState::Error {
            bail!("No playable source for episode {}", controller.episode());
        }
        Ok(())
    }

    async fn record_watch(&self, anime_id: u32, episode: u32) {
        let Some(session) = self.sessions.current() else {
            return;
        };

        let title = self
            .catalog
            .details(anime_id)
            .await
            .map(|details| details.title)
            .unwrap_or_default();

        if let Err(e) = self
            .profiles
            .record_watch(&session.user_id, anime_id, episode, &title)
            .await
        {
            warn!(error = %e, "Failed to record watch history");
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        let session = self
            .sessions
            .register(username, email, password)
            .await
            .map_err(|e| self.account_error(e))?;
        self.signed_in(&session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let session = self
            .sessions
            .login(email, password)
            .await
            .map_err(|e| self.account_error(e))?;
        self.signed_in(&session)
    }

    pub async fn login_external(&self, id_token: &str) -> Result<()> {
        let session = self
            .sessions
            .login_with_external_provider(&ExternalCredential::google(id_token))
            .await
            .map_err(|e| self.account_error(e))?;
        self.signed_in(&session)
    }

    pub async fn logout(&self) -> Result<()> {
        self.sessions
            .logout()
            .await
            .map_err(|e| self.account_error(e))?;
        session_file::clear(&self.session_path)?;
        println!("Signed out");
        Ok(())
    }

    pub async fn profile(&self) -> Result<()> {
        let session = self.require_session()?;
        let profile = self
            .profiles
            .load(&session.user_id)
            .await
            .map_err(|e| self.account_error(e))?
            .ok_or_else(|| anyhow!("No profile stored for {}", session.email))?;

        println!(
            "{} <{}> ({})",
            profile.display_name.as_deref().unwrap_or(&profile.username),
            profile.email,
            profile.role
        );
        println!("  Favorites:  {}", profile.favorites.len());
        println!("  Watch list: {}", profile.watch_list.len());
        println!("  Watched:    {}", profile.watch_history.len());
        if let Some(created_at) = profile.created_at {
            println!("  Member since {}", created_at.format("%Y-%m-%d"));
        }
        Ok(())
    }

    pub async fn toggle_favorite(&self, anime_id: u32) -> Result<()> {
        let session = self.require_session()?;
        let added = self
            .profiles
            .toggle_favorite(&session.user_id, anime_id)
            .await
            .map_err(|e| self.account_error(e))?;
        println!(
            "{} {} favorites",
            if added { "Added to" } else { "Removed from" },
            anime_id
        );
        Ok(())
    }

    pub async fn toggle_watch_list(&self, anime_id: u32) -> Result<()> {
        let session = self.require_session()?;
        let added = self
            .profiles
            .toggle_watch_list(&session.user_id, anime_id)
            .await
            .map_err(|e| self.account_error(e))?;
        println!(
            "{} {} watch list",
            if added { "Added to" } else { "Removed from" },
            anime_id
        );
        Ok(())
    }

    pub async fn history(&self) -> Result<()> {
        let session = self.require_session()?;
        let profile = self
            .profiles
            .load(&session.user_id)
            .await
            .map_err(|e| self.account_error(e))?
            .unwrap_or_default();

        for entry in &profile.watch_history {
            println!(
                "{}  {:>6}  {:<40} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.anime_id,
                entry.title,
                self.locale().episode_title(entry.episode_number)
            );
        }
        Ok(())
    }

    fn signed_in(&self, session: &Session) -> Result<()> {
        session_file::save(&self.session_path, session)?;
        info!(user_id = %session.user_id, "Session saved");
        println!(
            "Signed in as {}",
            session.display_name.as_deref().unwrap_or(&session.email)
        );
        Ok(())
    }

    fn require_session(&self) -> Result<Session> {
        self.sessions
            .current()
            .ok_or_else(|| self.account_error(AccountError::NotSignedIn))
    }

    /// Localized message for the user, with the underlying cause attached
    fn account_error(&self, error: AccountError) -> anyhow::Error {
        let message = error.user_message(self.locale());
        anyhow::Error::new(error).context(message)
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.identity.store {
        StoreBackend::Firestore => Arc::new(
            FirestoreStore::from_config(&config.identity)
                .context("Failed to create Firestore client")?,
        ),
        StoreBackend::Sqlite => {
            let path = config.sqlite_path();
            info!(path = %path.display(), "Opening profile database");
            Arc::new(SqliteStore::open(&path).context("Failed to open profile database")?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory profile store, nothing will be persisted");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

fn print_list(anime: &[AnimeSummary]) {
    for entry in anime {
        let score = entry
            .score
            .map(|score| format!("{:.2}", score))
            .unwrap_or_else(|| "-".to_string());
        println!("{:>6}  {:>5}  {}", entry.mal_id, score, entry.title);
    }
}

fn print_source(index: usize, source: &VideoSource) {
    println!(
        "{}. {} [{}] {} {}",
        index + 1,
        source.server_name,
        source.quality,
        source.mime_type,
        source.url
    );
}

fn drain_events(events: &mut UnboundedReceiver<PlaybackEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            PlaybackEvent::Loading { anime_id, episode } => {
                println!("Loading {} episode {}", anime_id, episode)
            }
            PlaybackEvent::Playing { source, index } => {
                print!("Playing ");
                print_source(index, &source);
            }
            PlaybackEvent::SourceFailed { source, error } => {
                println!("{} failed: {}", source.server_name, error)
            }
            PlaybackEvent::Exhausted { anime_id, episode } => {
                println!("No source could play {} episode {}", anime_id, episode)
            }
            PlaybackEvent::Closed => println!("Player closed"),
        }
    }
}
