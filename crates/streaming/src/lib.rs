//! Video source resolution and playback for AnimeStream.
//!
//! Sources come from several upstream providers queried in a fixed order;
//! the playback controller walks that order when the player fails.

pub mod backend;
pub mod fallback;
pub mod player;
pub mod provider;
pub mod proxy;
pub mod resolver;

pub use backend::ProcessPlayer;
pub use player::{PlaybackController, PlaybackError, PlaybackEvent, PlaybackState, PlayerBackend};
pub use provider::{ConsumetProvider, HttpTransport, ProviderRoute, SourceTransport, VideoProvider};
pub use proxy::CorsProxy;
pub use resolver::SourceResolver;
