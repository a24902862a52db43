use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_FILE: &str = ".plotter_session";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const USER_AGENT: &str = "plotter-client/0.1";

/// Header carrying the session token on every API request.
pub const SESSION_HEADER: &str = "X-Token";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_file: PathBuf,
    pub http_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: api_url(),
            session_file: session_file(),
            http_timeout: http_timeout(),
            connect_timeout: connect_timeout(),
        }
    }
}

pub fn api_url() -> String {
    std::env::var("PLOTTER_API_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

pub fn session_file() -> PathBuf {
    std::env::var("PLOTTER_SESSION_FILE")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
}

pub fn http_timeout() -> Duration {
    std::env::var("PLOTTER_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    std::env::var("PLOTTER_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
}
