//! Playback controller.
//!
//! Owns the player backend, the episode being watched and the ordered list
//! of sources resolved for it. A playback error moves on to the next source;
//! once every source has failed a single `Exhausted` event is emitted and
//! the controller stays in `Error`.

use crate::resolver::SourceResolver;
use async_trait::async_trait;
use catalog::EpisodeDirectory;
use shared::VideoSource;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Failure reported by a player backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("player could not be started: {0}")]
    Launch(String),

    #[error("player failed on {server}: {message}")]
    Player { server: String, message: String },
}

/// Something that can play a video source
#[async_trait]
pub trait PlayerBackend: Send {
    /// Load and start a source; an error means this source cannot be played
    async fn play(&mut self, source: &VideoSource) -> Result<(), PlaybackError>;

    async fn pause(&mut self);
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Error,
    Closed,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Error => write!(f, "error"),
            PlaybackState::Closed => write!(f, "closed"),
        }
    }
}

/// Notifications emitted to the front end
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Loading { anime_id: u32, episode: u32 },
    Playing { source: VideoSource, index: usize },
    SourceFailed { source: VideoSource, error: PlaybackError },
    /// Every source of the episode failed
    Exhausted { anime_id: u32, episode: u32 },
    Closed,
}

/// Drives a [`PlayerBackend`] through an episode's sources
pub struct PlaybackController<B: PlayerBackend> {
    backend: B,
    resolver: Arc<SourceResolver>,
    episodes: Arc<EpisodeDirectory>,
    events: UnboundedSender<PlaybackEvent>,
    state: PlaybackState,
    anime_id: Option<u32>,
    episode: u32,
    episode_count: usize,
    sources: Vec<VideoSource>,
    source_index: usize,
}

impl<B: PlayerBackend> PlaybackController<B> {
    /// Create an idle controller and the receiving end of its notifications
    pub fn new(
        backend: B,
        resolver: Arc<SourceResolver>,
        episodes: Arc<EpisodeDirectory>,
    ) -> (Self, UnboundedReceiver<PlaybackEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            resolver,
            episodes,
            events,
            state: PlaybackState::Idle,
            anime_id: None,
            episode: 1,
            episode_count: 0,
            sources: Vec::new(),
            source_index: 0,
        };
        (controller, receiver)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn anime_id(&self) -> Option<u32> {
        self.anime_id
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Number of episodes in the open anime's directory
    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    /// Sources resolved for the current episode, in priority order
    pub fn sources(&self) -> &[VideoSource] {
        &self.sources
    }

    /// Source currently loaded in the player
    pub fn current_source(&self) -> Option<&VideoSource> {
        self.sources.get(self.source_index)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open an anime at the given episode and start playing
    pub async fn open(&mut self, anime_id: u32, episode: u32) -> PlaybackState {
        info!(anime_id = anime_id, episode = episode, "Opening player");

        self.anime_id = Some(anime_id);
        self.episode_count = self.episodes.episodes_for(anime_id).await.len();

        self.load_episode(episode).await
    }

    /// Switch to another episode of the open anime
    ///
    /// The previous source list and position are discarded.
    pub async fn switch_episode(&mut self, episode: u32) -> PlaybackState {
        if self.anime_id.is_none() {
            warn!(episode = episode, "No anime open, ignoring episode switch");
            return self.state;
        }
        self.load_episode(episode).await
    }

    /// Move to the next episode, if there is one
    pub async fn next_episode(&mut self) -> PlaybackState {
        if (self.episode as usize) < self.episode_count {
            self.switch_episode(self.episode + 1).await
        } else {
            debug!(episode = self.episode, "Already at the last episode");
            self.state
        }
    }

    /// Move to the previous episode, if there is one
    pub async fn previous_episode(&mut self) -> PlaybackState {
        if self.episode > 1 {
            self.switch_episode(self.episode - 1).await
        } else {
            debug!("Already at the first episode");
            self.state
        }
    }

    /// Play a specific source of the current episode
    ///
    /// Ignored until an anime is opened and after the controller is closed.
    pub async fn select_source(&mut self, index: usize) -> PlaybackState {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Closed) {
            debug!(state = %self.state, index = index, "Ignoring source selection");
            return self.state;
        }
        if index >= self.sources.len() {
            warn!(index = index, available = self.sources.len(), "No such source");
            return self.state;
        }
        self.source_index = index;
        self.state = PlaybackState::Loading;
        self.start_from_current().await
    }

    /// Handle an error reported by the player while a source was playing
    pub async fn report_error(&mut self, error: PlaybackError) -> PlaybackState {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Loading) {
            debug!(state = %self.state, error = %error, "Ignoring player error");
            return self.state;
        }
        if self.advance_after(error) {
            self.start_from_current().await
        } else {
            self.state
        }
    }

    /// Pause the player and close the controller
    ///
    /// Resolution already in flight is not cancelled.
    pub async fn close(&mut self) -> PlaybackState {
        self.backend.pause().await;
        self.state = PlaybackState::Closed;
        self.emit(PlaybackEvent::Closed);
        info!(anime_id = ?self.anime_id, episode = self.episode, "Player closed");
        self.state
    }

    async fn load_episode(&mut self, episode: u32) -> PlaybackState {
        let Some(anime_id) = self.anime_id else {
            return self.state;
        };

        self.episode = episode;
        self.sources.clear();
        self.source_index = 0;
        self.state = PlaybackState::Loading;
        self.emit(PlaybackEvent::Loading { anime_id, episode });

        if let Some(descriptor) = self.episodes.find(anime_id, episode).await {
            debug!(anime_id = anime_id, episode = episode, title = %descriptor.title_localized, "Loading episode");
        }

        self.sources = self.resolver.resolve(anime_id, episode).await;
        self.start_from_current().await
    }

    /// Try sources from the current index until one plays or none are left
    async fn start_from_current(&mut self) -> PlaybackState {
        loop {
            let Some(source) = self.sources.get(self.source_index).cloned() else {
                return self.state;
            };

            debug!(
                server = %source.server_name,
                quality = %source.quality,
                index = self.source_index,
                "Starting source"
            );

            match self.backend.play(&source).await {
                Ok(()) => {
                    self.state = PlaybackState::Playing;
                    info!(server = %source.server_name, quality = %source.quality, "Playing");
                    self.emit(PlaybackEvent::Playing {
                        source,
                        index: self.source_index,
                    });
                    return self.state;
                }
                Err(e) => {
                    if !self.advance_after(e) {
                        return self.state;
                    }
                }
            }
        }
    }

    /// Record a failure of the current source and move to the next one
    ///
    /// Returns false once the list is exhausted.
    fn advance_after(&mut self, error: PlaybackError) -> bool {
        self.state = PlaybackState::Error;

        if let Some(source) = self.sources.get(self.source_index).cloned() {
            warn!(server = %source.server_name, error = %error, "Source failed");
            self.emit(PlaybackEvent::SourceFailed { source, error });
        }

        self.source_index += 1;
        if self.source_index < self.sources.len() {
            self.state = PlaybackState::Loading;
            true
        } else {
            error!(
                anime_id = ?self.anime_id,
                episode = self.episode,
                "All sources failed"
            );
            self.emit(PlaybackEvent::Exhausted {
                anime_id: self.anime_id.unwrap_or_default(),
                episode: self.episode,
            });
            false
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VideoProvider;
    use catalog::EpisodeSource;
    use shared::config::ResolveMode;
    use shared::{EpisodeDescriptor, FetchError, Locale};
    use std::collections::HashSet;

    /// Backend that fails for a fixed set of URLs
    #[derive(Default)]
    struct FakeBackend {
        failing: HashSet<String>,
        played: Vec<String>,
        paused: bool,
    }

    #[async_trait]
    impl PlayerBackend for FakeBackend {
        async fn play(&mut self, source: &VideoSource) -> Result<(), PlaybackError> {
            self.played.push(source.url.clone());
            if self.failing.contains(&source.url) {
                Err(PlaybackError::Player {
                    server: source.server_name.clone(),
                    message: "decode error".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn pause(&mut self) {
            self.paused = true;
        }
    }

    /// Provider answering with `{server}/{anime}/{episode}` URLs
    struct EchoProvider(&'static str);

    #[async_trait]
    impl VideoProvider for EchoProvider {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch_source(&self, anime_id: u32, episode: u32) -> Result<VideoSource, FetchError> {
            Ok(VideoSource {
                server_name: self.0.to_string(),
                url: format!("http://{}/{}/{}", self.0, anime_id, episode),
                quality: "720p".to_string(),
                mime_type: "mp4".to_string(),
            })
        }
    }

    struct ThreeEpisodes;

    #[async_trait]
    impl EpisodeSource for ThreeEpisodes {
        async fn fetch_episodes(&self, _anime_id: u32) -> Result<Vec<EpisodeDescriptor>, FetchError> {
            Ok((1..=3).map(|n| EpisodeDescriptor::synthetic(n, Locale::English)).collect())
        }
    }

    fn controller(
        failing: &[&str],
    ) -> (PlaybackController<FakeBackend>, UnboundedReceiver<PlaybackEvent>) {
        let providers: Vec<Box<dyn VideoProvider>> = vec![
            Box::new(EchoProvider("a")),
            Box::new(EchoProvider("b")),
            Box::new(EchoProvider("c")),
        ];
        let resolver = Arc::new(SourceResolver::new(providers, ResolveMode::Sequential));
        let episodes = Arc::new(EpisodeDirectory::new(Arc::new(ThreeEpisodes), Locale::English));
        let backend = FakeBackend {
            failing: failing.iter().map(|url| url.to_string()).collect(),
            ..Default::default()
        };
        PlaybackController::new(backend, resolver, episodes)
    }

    fn drain(receiver: &mut UnboundedReceiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn exhausted_count(events: &[PlaybackEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, PlaybackEvent::Exhausted { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_open_plays_first_source() {
        let (mut player, mut events) = controller(&[]);

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.open(10, 1).await, PlaybackState::Playing);
        assert_eq!(player.current_source().unwrap().server_name, "a");
        assert_eq!(player.episode_count(), 3);

        let events = drain(&mut events);
        assert_eq!(events[0], PlaybackEvent::Loading { anime_id: 10, episode: 1 });
        assert!(matches!(events[1], PlaybackEvent::Playing { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_falls_back_to_third_source() {
        let (mut player, mut events) = controller(&["http://a/10/1", "http://b/10/1"]);

        assert_eq!(player.open(10, 1).await, PlaybackState::Playing);
        assert_eq!(
            player.backend().played,
            vec!["http://a/10/1", "http://b/10/1", "http://c/10/1"]
        );
        assert_eq!(player.current_source().unwrap().server_name, "c");
        assert_eq!(exhausted_count(&drain(&mut events)), 0);
    }

    #[tokio::test]
    async fn test_all_sources_fail_emits_one_notification() {
        let (mut player, mut events) =
            controller(&["http://a/10/1", "http://b/10/1", "http://c/10/1"]);

        assert_eq!(player.open(10, 1).await, PlaybackState::Error);
        assert_eq!(player.backend().played.len(), 3);

        // A late player error after exhaustion changes nothing
        let late = PlaybackError::Launch("late".to_string());
        assert_eq!(player.report_error(late).await, PlaybackState::Error);

        let events = drain(&mut events);
        assert_eq!(exhausted_count(&events), 1);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, PlaybackEvent::SourceFailed { .. }))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn test_reported_error_advances_to_next_source() {
        let (mut player, mut events) = controller(&[]);
        player.open(10, 2).await;

        let error = PlaybackError::Player {
            server: "a".to_string(),
            message: "stalled".to_string(),
        };
        assert_eq!(player.report_error(error.clone()).await, PlaybackState::Playing);
        assert_eq!(player.current_source().unwrap().server_name, "b");

        player.report_error(error.clone()).await;
        assert_eq!(player.report_error(error).await, PlaybackState::Error);
        assert_eq!(exhausted_count(&drain(&mut events)), 1);
    }

    #[tokio::test]
    async fn test_switch_episode_discards_previous_sources() {
        let (mut player, _events) = controller(&["http://a/10/1"]);
        player.open(10, 1).await;
        assert_eq!(player.current_source().unwrap().server_name, "b");

        assert_eq!(player.switch_episode(2).await, PlaybackState::Playing);
        assert_eq!(player.episode(), 2);
        assert_eq!(player.current_source().unwrap().url, "http://a/10/2");
        assert_eq!(player.sources().len(), 3);
    }

    #[tokio::test]
    async fn test_episode_navigation_is_bounded() {
        let (mut player, _events) = controller(&[]);
        player.open(10, 3).await;

        player.next_episode().await;
        assert_eq!(player.episode(), 3);

        player.previous_episode().await;
        player.previous_episode().await;
        player.previous_episode().await;
        assert_eq!(player.episode(), 1);
    }

    #[tokio::test]
    async fn test_select_source_and_close() {
        let (mut player, mut events) = controller(&[]);
        player.open(10, 1).await;

        assert_eq!(player.select_source(2).await, PlaybackState::Playing);
        assert_eq!(player.current_source().unwrap().server_name, "c");
        assert_eq!(player.select_source(9).await, PlaybackState::Playing);

        assert_eq!(player.close().await, PlaybackState::Closed);
        assert!(player.backend().paused);
        assert_eq!(drain(&mut events).last(), Some(&PlaybackEvent::Closed));
    }

    #[tokio::test]
    async fn test_select_source_needs_open_controller() {
        let (mut player, mut events) = controller(&[]);
        assert_eq!(player.select_source(0).await, PlaybackState::Idle);
        assert!(player.backend().played.is_empty());
        assert!(drain(&mut events).is_empty());

        player.open(10, 1).await;
        player.close().await;
        let played = player.backend().played.len();
        drain(&mut events);

        assert_eq!(player.select_source(1).await, PlaybackState::Closed);
        assert_eq!(player.backend().played.len(), played);
        assert_eq!(player.current_source().unwrap().server_name, "a");
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_switch_without_open_is_ignored() {
        let (mut player, mut events) = controller(&[]);
        assert_eq!(player.switch_episode(4).await, PlaybackState::Idle);
        assert!(drain(&mut events).is_empty());
    }
}
