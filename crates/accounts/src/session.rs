//! Sign-in state and the profile bootstrap that accompanies it.
//!
//! Observers subscribe to a `watch` channel that always holds the current
//! session (`None` when signed out).

use crate::error::{AccountError, StoreError};
use crate::identity::{ExternalCredential, IdentityProvider, Session};
use crate::store::{DocumentStore, DocumentWrite};
use shared::UserProfile;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Collection holding one profile document per user id
pub const USERS_COLLECTION: &str = "users";

/// Registration, sign-in and sign-out
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    state: watch::Sender<Option<Session>>,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            identity,
            store,
            state,
        }
    }

    /// Session-change notifications
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Adopt a previously saved session without contacting the provider
    pub fn restore(&self, session: Session) {
        debug!(user_id = %session.user_id, "Restoring session");
        self.publish(Some(session));
    }

    /// Create an account and its profile document
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        let session = self.identity.create_account(email, password).await?;
        self.store.set_auth_token(Some(&session.id_token));

        let mut session = self.identity.update_display_name(&session, username).await?;
        session.is_new_user = true;
        self.store.set_auth_token(Some(&session.id_token));

        let mut profile = UserProfile::new(username, email);
        profile.display_name = Some(username.to_string());
        self.create_profile(&session.user_id, &profile).await?;

        info!(user_id = %session.user_id, "Registered new user");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Email and password sign-in
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let session = self.identity.sign_in(email, password).await?;
        self.store.set_auth_token(Some(&session.id_token));

        match self.touch_last_login(&session.user_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                warn!(user_id = %session.user_id, "Profile missing, creating it");
                let profile = profile_from_session(&session);
                self.create_profile(&session.user_id, &profile).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %session.user_id, "Signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Sign in with a credential from an external provider
    ///
    /// The first sign-in creates the profile document.
    pub async fn login_with_external_provider(
        &self,
        credential: &ExternalCredential,
    ) -> Result<Session, AccountError> {
        let session = self.identity.sign_in_external(credential).await?;
        self.store.set_auth_token(Some(&session.id_token));

        let existing = self.store.get(USERS_COLLECTION, &session.user_id).await?;
        if existing.is_none() {
            let profile = profile_from_session(&session);
            self.create_profile(&session.user_id, &profile).await?;
            info!(user_id = %session.user_id, provider = %credential.provider_id, "Created profile for external sign-in");
        } else {
            self.touch_last_login(&session.user_id).await?;
        }

        info!(user_id = %session.user_id, provider = %credential.provider_id, "Signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Sign out and notify observers
    pub async fn logout(&self) -> Result<(), AccountError> {
        if let Some(session) = self.current() {
            self.identity.sign_out(&session).await?;
            info!(user_id = %session.user_id, "Signed out");
        }
        self.publish(None);
        Ok(())
    }

    async fn create_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let write = DocumentWrite::from_serializable(profile)?
            .server_timestamp("createdAt")
            .server_timestamp("lastLogin");
        self.store.set_merge(USERS_COLLECTION, user_id, write).await
    }

    async fn touch_last_login(&self, user_id: &str) -> Result<(), StoreError> {
        self.store
            .update(
                USERS_COLLECTION,
                user_id,
                DocumentWrite::new().server_timestamp("lastLogin"),
            )
            .await
    }

    fn publish(&self, session: Option<Session>) {
        let token = session.as_ref().map(|s| s.id_token.as_str());
        self.store.set_auth_token(token);
        self.state.send_replace(session);
    }
}

/// Initial profile for a user who has none yet
fn profile_from_session(session: &Session) -> UserProfile {
    let mut profile = UserProfile::new(session.preferred_username(), session.email.clone());
    profile.display_name = session.display_name.clone();
    profile.profile_image = session.photo_url.clone().unwrap_or_default();
    profile
}
