//! User accounts for AnimeStream.
//!
//! Sign-up and sign-in are delegated to an external identity provider;
//! per-user state (favorites, watch history, watch list) lives in a
//! document store keyed by user id.

pub mod error;
pub mod firebase;
pub mod identity;
pub mod profile;
pub mod session;
pub mod store;

pub use error::{AccountError, AuthError, AuthErrorCode, StoreError};
pub use firebase::FirebaseAuth;
pub use identity::{ExternalCredential, IdentityProvider, Session};
pub use profile::ProfileStore;
pub use session::{SessionManager, USERS_COLLECTION};
pub use store::{DocumentStore, DocumentWrite, FirestoreStore, MemoryStore, SqliteStore};
