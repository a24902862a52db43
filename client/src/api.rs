use std::fmt;

use plotter_shared::{
    Assignment, AssignmentUpload, CommunityRankRequest, CommunitySettings, Member, MemberUpdate,
    OverwriteAssignment, Roster, ValidatedUser,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ClientConfig, SESSION_HEADER, USER_AGENT};
use crate::session::Session;

#[derive(Debug)]
pub enum ApiError {
    /// The session token is missing, expired or unknown (HTTP 401).
    Unauthorized(String),
    /// The session is valid but lacks the rights for this call (HTTP 403).
    Forbidden(String),
    /// Any other non-success status. `message` is the plain-text error body.
    Status { status: StatusCode, message: String },
    /// The request never produced a response.
    Transport(reqwest::Error),
    /// The response body was not the expected JSON.
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::Status { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Transport(e) => write!(f, "fetch error: {e}"),
            Self::Decode(message) => write!(f, "parse error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Thin wrapper over the plot backend's JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self::with_client(http, &config.api_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, token)
    }

    /// Send a request and decode its JSON body. Empty bodies (204, zero length) yield `None`.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = request.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.bytes().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            let message = error_message(status, &body);
            warn!(%status, path = %url, "API request failed: {message}");
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::FORBIDDEN => ApiError::Forbidden(message),
                _ => ApiError::Status { status, message },
            });
        }

        debug!(%status, path = %url, bytes = body.len(), "API request succeeded");

        if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<Option<T>, ApiError> {
        self.execute(self.request(Method::GET, path, token)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError> {
        let mut request = self.request(Method::POST, path, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    /// `GET /user/validate`: resolve a raw token into the user it belongs to.
    pub async fn validate(&self, token: &str) -> Result<ValidatedUser, ApiError> {
        required(self.get("/user/validate", token).await?, "/user/validate")
    }

    /// `GET /community`: the full roster with every member's ranking.
    pub async fn community(&self, session: &Session) -> Result<Vec<Member>, ApiError> {
        let roster: Roster = required(self.get("/community", session.token()).await?, "/community")?;
        Ok(roster.members)
    }

    /// `POST /user/update`: store the caller's note and ranking; returns the new roster.
    pub async fn update_member(
        &self,
        session: &Session,
        update: &MemberUpdate,
    ) -> Result<Vec<Member>, ApiError> {
        let roster: Option<Roster> = self
            .post("/user/update", session.token(), Some(update))
            .await?;
        Ok(roster.unwrap_or_default().members)
    }

    /// `GET /community/optimize`: optimizer output without committing it.
    pub async fn optimize(&self, session: &Session) -> Result<Vec<Assignment>, ApiError> {
        Ok(self
            .get("/community/optimize", session.token())
            .await?
            .unwrap_or_default())
    }

    /// `POST /community/lock`: toggles the lock. Locking runs and commits the optimizer and
    /// returns its assignments; unlocking returns nothing.
    pub async fn toggle_lock(&self, session: &Session) -> Result<Vec<Assignment>, ApiError> {
        Ok(self
            .post::<(), _>("/community/lock", session.token(), None)
            .await?
            .unwrap_or_default())
    }

    /// `GET /community/assignments`: committed assignments of a locked community.
    pub async fn assignments(&self, session: &Session) -> Result<Vec<Assignment>, ApiError> {
        Ok(self
            .get("/community/assignments", session.token())
            .await?
            .unwrap_or_default())
    }

    /// `POST /community/assignments`: admin overwrite of a single plot.
    pub async fn overwrite_assignment(
        &self,
        session: &Session,
        body: &OverwriteAssignment,
    ) -> Result<Option<Assignment>, ApiError> {
        self.post("/community/assignments", session.token(), Some(body))
            .await
    }

    /// `POST /community/finalize`.
    pub async fn finalize(&self, session: &Session) -> Result<(), ApiError> {
        self.post::<(), serde_json::Value>("/community/finalize", session.token(), None)
            .await?;
        Ok(())
    }

    /// `GET /community/config`.
    pub async fn settings(&self, session: &Session) -> Result<CommunitySettings, ApiError> {
        required(
            self.get("/community/config", session.token()).await?,
            "/community/config",
        )
    }

    /// `POST /community/config`. Sent as a [`CommunityRankRequest`], which names the officer
    /// threshold `adminRank`.
    pub async fn update_settings(
        &self,
        session: &Session,
        settings: &CommunitySettings,
    ) -> Result<(), ApiError> {
        let body = CommunityRankRequest::from(*settings);
        self.post::<_, serde_json::Value>("/community/config", session.token(), Some(&body))
            .await?;
        Ok(())
    }

    /// `GET /community/download`: full community export as raw JSON.
    pub async fn download(&self, session: &Session) -> Result<serde_json::Value, ApiError> {
        required(
            self.get("/community/download", session.token()).await?,
            "/community/download",
        )
    }

    /// `POST /community/upload`: replace all assignments; returns the stored set.
    pub async fn upload(
        &self,
        session: &Session,
        upload: &AssignmentUpload,
    ) -> Result<Vec<Assignment>, ApiError> {
        Ok(self
            .post("/community/upload", session.token(), Some(upload))
            .await?
            .unwrap_or_default())
    }

    /// `POST /community/join/{id}`.
    pub async fn join(&self, session: &Session, community_id: &str) -> Result<(), ApiError> {
        let path = format!("/community/join/{}", community_id.trim());
        self.post::<(), serde_json::Value>(&path, session.token(), None)
            .await?;
        Ok(())
    }
}

fn required<T>(value: Option<T>, path: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Decode(format!("empty response body from {path}")))
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}
