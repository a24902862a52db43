use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use plotter_shared::ValidatedUser;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};

/// An authenticated user. Created at start-up or login and passed explicitly to every
/// call that needs the token; dropped on logout or when the backend rejects the token.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    user: ValidatedUser,
    validated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: ValidatedUser) -> Self {
        Self {
            token: token.into(),
            user,
            validated_at: Utc::now(),
        }
    }

    /// Ask the backend who `token` belongs to.
    pub async fn validate(api: &ApiClient, token: &str) -> Result<Self, ApiError> {
        let user = api.validate(token).await?;
        Ok(Self::new(token, user))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &ValidatedUser {
        &self.user
    }

    pub fn battletag(&self) -> &str {
        &self.user.battletag
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }

    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// No token is stored; the user has to log in.
    NotLoggedIn,
    /// The stored token was rejected and has been removed.
    Expired(String),
    Api(ApiError),
    Storage(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "not logged in"),
            Self::Expired(message) => {
                write!(f, "session expired ({message}), please log in again")
            }
            Self::Api(e) => write!(f, "session validation failed: {e}"),
            Self::Storage(e) => write!(f, "session storage error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        Self::Storage(e)
    }
}

impl From<ApiError> for SessionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(message) => Self::Expired(message),
            other => Self::Api(other),
        }
    }
}

/// File holding the session token between runs.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        std::fs::write(&self.path, token.trim())
    }

    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Restore the stored session at start-up. A rejected token is removed from the store.
pub async fn init(api: &ApiClient, store: &SessionStore) -> Result<Session, SessionError> {
    let Some(token) = store.load()? else {
        return Err(SessionError::NotLoggedIn);
    };

    match Session::validate(api, &token).await {
        Ok(session) => {
            info!(battletag = session.battletag(), "session restored");
            Ok(session)
        }
        Err(e) if e.is_unauthorized() => {
            warn!(error = %e, "stored session token rejected, clearing it");
            store.clear()?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate a fresh token and persist it.
pub async fn login(
    api: &ApiClient,
    store: &SessionStore,
    token: &str,
) -> Result<Session, SessionError> {
    let session = Session::validate(api, token.trim()).await?;
    store.save(session.token())?;
    info!(battletag = session.battletag(), "logged in");
    Ok(session)
}

/// End the session and forget its token.
pub fn logout(session: Session, store: &SessionStore) -> Result<(), SessionError> {
    store.clear()?;
    info!(battletag = session.battletag(), "logged out");
    Ok(())
}
