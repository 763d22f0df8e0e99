//! Player backend that hands streams to an external program.
//!
//! The player runs in the foreground; a non-zero exit status counts as a
//! playback error so the controller moves on to the next source.

use crate::player::{PlaybackError, PlayerBackend};
use async_trait::async_trait;
use shared::config::StreamingConfig;
use shared::VideoSource;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Spawns an external player (mpv by default) for each source
#[derive(Debug, Clone)]
pub struct ProcessPlayer {
    command: String,
    args: Vec<String>,
    dry_run: bool,
}

impl ProcessPlayer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            dry_run: false,
        }
    }

    pub fn from_config(config: &StreamingConfig) -> Self {
        Self::new(config.player_command.clone(), config.player_args.clone())
    }

    /// Log the command instead of running it
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Full argument list for a source
    fn arguments(&self, source: &VideoSource) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(source.url.clone());
        args
    }
}

#[async_trait]
impl PlayerBackend for ProcessPlayer {
    async fn play(&mut self, source: &VideoSource) -> Result<(), PlaybackError> {
        let args = self.arguments(source);

        if self.dry_run {
            info!(command = %self.command, args = ?args, "Dry run, not starting player");
            return Ok(());
        }

        debug!(command = %self.command, url = %source.url, "Starting player");

        let status = Command::new(&self.command)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PlaybackError::Launch(format!("{}: {}", self.command, e)))?;

        if status.success() {
            Ok(())
        } else {
            warn!(command = %self.command, status = %status, "Player exited with failure");
            Err(PlaybackError::Player {
                server: source.server_name.clone(),
                message: format!("{} exited with {}", self.command, status),
            })
        }
    }

    async fn pause(&mut self) {
        // The player process owns playback once started; it has already exited here
        debug!(command = %self.command, "Pause requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> VideoSource {
        VideoSource {
            server_name: "GogoAnime".to_string(),
            url: "http://x/a.mp4".to_string(),
            quality: "720p".to_string(),
            mime_type: "mp4".to_string(),
        }
    }

    #[test]
    fn test_arguments_end_with_url() {
        let player = ProcessPlayer::new("mpv", vec!["--really-quiet".to_string()]);
        let args = player.arguments(&source());

        assert_eq!(args.first().map(String::as_str), Some("--really-quiet"));
        assert_eq!(args.last().map(String::as_str), Some("http://x/a.mp4"));
    }

    #[tokio::test]
    async fn test_dry_run_succeeds() {
        let mut player = ProcessPlayer::new("definitely-not-a-player", Vec::new()).dry_run(true);
        assert!(player.play(&source()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let mut player = ProcessPlayer::new("definitely-not-a-player", Vec::new());
        let err = player.play(&source()).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Launch(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_maps_to_result() {
        let mut ok = ProcessPlayer::new("true", Vec::new());
        assert!(ok.play(&source()).await.is_ok());

        let mut failing = ProcessPlayer::new("false", Vec::new());
        let err = failing.play(&source()).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Player { .. }));
    }
}
