//! Session persistence between CLI invocations.

use accounts::Session;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a saved session; a missing file means signed out
pub fn load(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;
    let session = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
    Ok(Some(session))
}

pub fn save(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write session file: {}", path.display()))?;

    debug!(path = %path.display(), "Saved session");
    Ok(())
}

pub fn clear(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session file: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("state").join("session.json");

        assert!(load(&path)?.is_none());

        let session = Session {
            user_id: "u1".to_string(),
            email: "a@b.c".to_string(),
            id_token: "token".to_string(),
            ..Default::default()
        };
        save(&path, &session)?;
        assert_eq!(load(&path)?, Some(session));

        clear(&path)?;
        assert!(load(&path)?.is_none());
        clear(&path)?;
        Ok(())
    }
}
