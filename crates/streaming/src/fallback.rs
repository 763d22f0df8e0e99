//! Known-good demo streams used when every provider comes back empty.

use rand::seq::SliceRandom;
use shared::VideoSource;

/// Server name attached to demo sources
pub const DEMO_SERVER_NAME: &str = "Demo Stream";

/// Quality label attached to demo sources
pub const DEMO_QUALITY: &str = "1080p";

/// MIME type of the demo manifests
pub const DASH_MIME_TYPE: &str = "application/dash+xml";

/// Public DASH manifests
pub const DEMO_STREAMS: [&str; 3] = [
    "https://storage.googleapis.com/shaka-demo-assets/angel-one/dash.mpd",
    "https://dash.akamaized.net/akamai/bbb_30fps/bbb_30fps.mpd",
    "https://bitdash-a.akamaihd.net/s/content/media/Manifest.mpd",
];

/// One demo source picked at random from [`DEMO_STREAMS`]
pub fn demo_source() -> VideoSource {
    let url = DEMO_STREAMS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEMO_STREAMS[0]);

    VideoSource {
        server_name: DEMO_SERVER_NAME.to_string(),
        url: url.to_string(),
        quality: DEMO_QUALITY.to_string(),
        mime_type: DASH_MIME_TYPE.to_string(),
    }
}

/// Whether a source came from the demo pool
pub fn is_demo(source: &VideoSource) -> bool {
    source.server_name == DEMO_SERVER_NAME && DEMO_STREAMS.contains(&source.url.as_str())
}
