//! Identity provider abstraction.

use crate::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Bearer token for the document store
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// "password" or the external provider id ("google.com")
    #[serde(default)]
    pub provider_id: String,
    /// Whether the provider created the account during this sign-in
    #[serde(default, skip_serializing)]
    pub is_new_user: bool,
}

impl Session {
    /// Name to store in a new profile: display name, else the email local part
    pub fn preferred_username(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}

/// Credential obtained from an external provider's own sign-in flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCredential {
    /// Provider id, e.g. "google.com"
    pub provider_id: String,
    /// OpenID Connect id token issued by that provider
    pub id_token: String,
}

impl ExternalCredential {
    pub fn google(id_token: impl Into<String>) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            id_token: id_token.into(),
        }
    }
}

/// Account operations delegated to an external identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_in_external(&self, credential: &ExternalCredential)
        -> Result<Session, AuthError>;

    /// Set the display name on the provider's account record
    async fn update_display_name(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<Session, AuthError>;

    /// Token-based providers have no server-side session to end
    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_username() {
        let mut session = Session {
            email: "sakura@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(session.preferred_username(), "sakura");

        session.display_name = Some("Sakura".to_string());
        assert_eq!(session.preferred_username(), "Sakura");
    }

    #[test]
    fn test_new_user_flag_is_not_persisted() {
        let session = Session {
            user_id: "u1".to_string(),
            is_new_user: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("is_new_user").is_none());

        let restored: Session = serde_json::from_value(json).unwrap();
        assert!(!restored.is_new_user);
        assert_eq!(restored.user_id, "u1");
    }
}
