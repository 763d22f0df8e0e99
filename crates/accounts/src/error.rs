//! Account error types and the localized auth message table.

use shared::{FetchError, Locale};
use thiserror::Error;

/// Code, Arabic message, English message
const AUTH_MESSAGES: &[(&str, &str, &str)] = &[
    (
        "auth/email-already-in-use",
        "البريد الإلكتروني مستخدم بالفعل",
        "This email is already in use",
    ),
    (
        "auth/invalid-email",
        "البريد الإلكتروني غير صالح",
        "The email address is invalid",
    ),
    (
        "auth/weak-password",
        "كلمة المرور ضعيفة جداً",
        "The password is too weak",
    ),
    (
        "auth/user-not-found",
        "البريد الإلكتروني غير مسجل",
        "No account is registered with this email",
    ),
    (
        "auth/wrong-password",
        "كلمة المرور غير صحيحة",
        "The password is incorrect",
    ),
    (
        "auth/too-many-requests",
        "تم تجاوز عدد المحاولات، حاول لاحقاً",
        "Too many attempts, try again later",
    ),
    (
        "auth/network-request-failed",
        "خطأ في الاتصال بالشبكة",
        "Network connection error",
    ),
];

/// Message for any code missing from the table
const UNKNOWN_MESSAGE: (&str, &str) = ("حدث خطأ غير معروف", "An unknown error occurred");

/// Localized message for an identity provider error code
///
/// Unmapped codes get the generic unknown-error message.
pub fn localized_message(code: &str, locale: Locale) -> &'static str {
    let (arabic, english) = AUTH_MESSAGES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, arabic, english)| (*arabic, *english))
        .unwrap_or(UNKNOWN_MESSAGE);

    match locale {
        Locale::Arabic => arabic,
        Locale::English => english,
    }
}

/// Identity provider error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    TooManyRequests,
    NetworkRequestFailed,
    Other(String),
}

impl AuthErrorCode {
    /// Parse either an `auth/...` code or an identity REST error message
    ///
    /// REST messages may carry a detail suffix (`WEAK_PASSWORD : ...`).
    pub fn from_code(code: &str) -> Self {
        let code = code.split(':').next().unwrap_or_default().trim();
        match code {
            "auth/email-already-in-use" | "EMAIL_EXISTS" => AuthErrorCode::EmailAlreadyInUse,
            "auth/invalid-email" | "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorCode::InvalidEmail,
            "auth/weak-password" | "WEAK_PASSWORD" => AuthErrorCode::WeakPassword,
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => AuthErrorCode::UserNotFound,
            "auth/wrong-password" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthErrorCode::WrongPassword
            }
            "auth/too-many-requests" | "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorCode::TooManyRequests,
            "auth/network-request-failed" => AuthErrorCode::NetworkRequestFailed,
            other => AuthErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
            AuthErrorCode::NetworkRequestFailed => "auth/network-request-failed",
            AuthErrorCode::Other(code) => code,
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error reported by the identity provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub detail: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Build from a raw provider code or REST message
    pub fn from_code(code: &str) -> Self {
        Self::new(AuthErrorCode::from_code(code), code)
    }

    /// Message to show the user
    pub fn message(&self, locale: Locale) -> &'static str {
        localized_message(self.code.as_str(), locale)
    }
}

impl From<FetchError> for AuthError {
    fn from(e: FetchError) -> Self {
        let code = match &e {
            FetchError::Network { .. } => AuthErrorCode::NetworkRequestFailed,
            FetchError::Status { status: 429, .. } => AuthErrorCode::TooManyRequests,
            _ => AuthErrorCode::Other("auth/internal-error".to_string()),
        };
        Self::new(code, e.to_string())
    }
}

/// Document store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("document {0} does not exist")]
    NotFound(String),

    #[error("document store is not authorized")]
    Unauthorized,

    #[error("invalid document {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Anything that can go wrong in an account operation
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no user is signed in")]
    NotSignedIn,
}

impl AccountError {
    /// Message to show the user
    pub fn user_message(&self, locale: Locale) -> &'static str {
        match self {
            AccountError::Auth(e) => e.message(locale),
            AccountError::Store(StoreError::Fetch(FetchError::Network { .. })) => {
                localized_message("auth/network-request-failed", locale)
            }
            AccountError::Store(_) | AccountError::NotSignedIn => {
                localized_message("", locale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_a_message() {
        let codes = [
            AuthErrorCode::EmailAlreadyInUse,
            AuthErrorCode::InvalidEmail,
            AuthErrorCode::WeakPassword,
            AuthErrorCode::UserNotFound,
            AuthErrorCode::WrongPassword,
            AuthErrorCode::TooManyRequests,
            AuthErrorCode::NetworkRequestFailed,
        ];
        for code in codes {
            assert_ne!(localized_message(code.as_str(), Locale::English), UNKNOWN_MESSAGE.1);
            assert_ne!(localized_message(code.as_str(), Locale::Arabic), UNKNOWN_MESSAGE.0);
        }
    }

    #[test]
    fn test_unmapped_code_is_unknown_error() {
        let error = AuthError::from_code("auth/operation-not-allowed");
        assert_eq!(
            error.code,
            AuthErrorCode::Other("auth/operation-not-allowed".to_string())
        );
        assert_eq!(error.message(Locale::Arabic), "حدث خطأ غير معروف");
        assert_eq!(error.message(Locale::English), "An unknown error occurred");
    }

    #[test]
    fn test_rest_messages_are_normalized() {
        assert_eq!(AuthErrorCode::from_code("EMAIL_EXISTS"), AuthErrorCode::EmailAlreadyInUse);
        assert_eq!(
            AuthErrorCode::from_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthErrorCode::WeakPassword
        );
        assert_eq!(
            AuthErrorCode::from_code("INVALID_LOGIN_CREDENTIALS"),
            AuthErrorCode::WrongPassword
        );
        assert_eq!(
            AuthError::from_code("EMAIL_NOT_FOUND").message(Locale::Arabic),
            "البريد الإلكتروني غير مسجل"
        );
    }

    #[test]
    fn test_auth_code_passthrough() {
        assert_eq!(
            AuthErrorCode::from_code("auth/wrong-password").as_str(),
            "auth/wrong-password"
        );
    }

    #[test]
    fn test_fetch_errors_map_to_auth_codes() {
        let error: AuthError = FetchError::Status {
            url: "http://id".to_string(),
            status: 429,
        }
        .into();
        assert_eq!(error.code, AuthErrorCode::TooManyRequests);
    }

    #[test]
    fn test_store_errors_show_generic_message() {
        let error = AccountError::Store(StoreError::NotFound("users/1".to_string()));
        assert_eq!(error.user_message(Locale::English), "An unknown error occurred");
    }
}
