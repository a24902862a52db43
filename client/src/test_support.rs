//! In-process stand-in for the plot backend, served by axum on an ephemeral port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use plotter_shared::{
    Assignment, AssignmentUpload, Community, CommunityRankRequest, CommunitySettings, Member,
    MemberUpdate, OverwriteAssignment, PlotData, PlotId, Priority, Roster, ValidatedUser,
};

use crate::api::ApiClient;
use crate::config::SESSION_HEADER;
use crate::session::Session;

pub const TEST_TOKEN: &str = "test-session-token";

pub fn test_user() -> ValidatedUser {
    ValidatedUser {
        battletag: "Anna#1234".to_string(),
        char: "Annabel".to_string(),
        note: String::new(),
        is_admin: true,
        community: Community {
            id: "guild-1".to_string(),
            name: "Lakeside".to_string(),
            realm: "Aether".to_string(),
            locked: false,
            finalized: false,
        },
    }
}

pub fn assignment(btag: &str, plot: u32, score: u32) -> Assignment {
    Assignment {
        btag: btag.to_string(),
        char: String::new(),
        plot: PlotId::new(plot).expect("valid plot"),
        score,
    }
}

pub fn member(battletag: &str, char: &str, ranking: &[(u32, u32)]) -> Member {
    let plot_data: PlotData = ranking
        .iter()
        .map(|&(plot, priority)| {
            (
                PlotId::new(plot).expect("valid plot"),
                Priority::new(priority).expect("valid priority"),
            )
        })
        .collect();
    Member {
        battletag: battletag.to_string(),
        char: char.to_string(),
        note: String::new(),
        plot_data,
    }
}

/// Session for the default test user without asking any backend.
pub fn offline_session() -> Session {
    Session::new(TEST_TOKEN, test_user())
}

pub async fn session_for(stub: &StubBackend) -> Session {
    Session::validate(&stub.api(), TEST_TOKEN)
        .await
        .expect("validate test session")
}

#[derive(Debug)]
pub struct StubState {
    pub token: String,
    pub user: ValidatedUser,
    pub roster: Vec<Member>,
    /// Served verbatim by `GET /community` instead of `roster` when set.
    pub roster_json: Option<serde_json::Value>,
    pub optimized: Vec<Assignment>,
    pub assignments: Vec<Assignment>,
    pub settings: CommunitySettings,
    /// Raw JSON of the last `POST /community/config`.
    pub settings_body: Option<serde_json::Value>,
    pub fail_optimize: bool,
    pub fail_lock: bool,
    pub fail_update: bool,
    pub requests: Vec<String>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            token: TEST_TOKEN.to_string(),
            user: test_user(),
            roster: Vec::new(),
            roster_json: None,
            optimized: Vec::new(),
            assignments: Vec::new(),
            settings: CommunitySettings::default(),
            settings_body: None,
            fail_optimize: false,
            fail_lock: false,
            fail_update: false,
            requests: Vec::new(),
        }
    }
}

type SharedState = Arc<Mutex<StubState>>;

pub struct StubBackend {
    addr: SocketAddr,
    state: SharedState,
    handle: tokio::task::JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state = SharedState::default();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub backend");
        });
        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::with_client(reqwest::Client::new(), &format!("http://{}", self.addr))
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut StubState) -> R) -> R {
        let mut state = self.state.lock().expect("stub state lock");
        f(&mut state)
    }

    /// `"<METHOD> <path>"` of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.with_state(|state| state.requests.clone())
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/user/validate", get(validate))
        .route("/user/update", post(update_member))
        .route("/community", get(community))
        .route("/community/optimize", get(optimize))
        .route("/community/lock", post(toggle_lock))
        .route(
            "/community/assignments",
            get(assignments).post(overwrite_assignment),
        )
        .route("/community/finalize", post(finalize))
        .route("/community/config", get(settings).post(update_settings))
        .route("/community/download", get(download))
        .route("/community/upload", post(upload))
        .route("/community/join/{id}", post(join))
        .with_state(state)
}

/// Record the request, then check the session header and, for admin routes, the role.
fn authorize<'a>(
    state: &'a SharedState,
    headers: &HeaderMap,
    request: &str,
    admin: bool,
) -> Result<MutexGuard<'a, StubState>, Response> {
    let mut guard = state.lock().expect("stub state lock");
    guard.requests.push(request.to_string());

    let token = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok());
    if token != Some(guard.token.as_str()) {
        return Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response());
    }
    if admin && !guard.user.is_admin {
        return Err((StatusCode::FORBIDDEN, "admin rights required").into_response());
    }
    Ok(guard)
}

fn fail(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

async fn validate(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers, "GET /user/validate", false) {
        Ok(guard) => Json(guard.user.clone()).into_response(),
        Err(response) => response,
    }
}

async fn community(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let guard = match authorize(&state, &headers, "GET /community", false) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    match &guard.roster_json {
        Some(raw) => Json(raw.clone()).into_response(),
        None => Json(Roster {
            members: guard.roster.clone(),
        })
        .into_response(),
    }
}

async fn update_member(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(update): Json<MemberUpdate>,
) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /user/update", false) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.fail_update {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update member");
    }

    let user = guard.user.clone();
    let existing = guard
        .roster
        .iter()
        .position(|member| member.battletag == user.battletag);
    match existing {
        Some(idx) => {
            guard.roster[idx].note = update.note;
            guard.roster[idx].plot_data = update.plot_data;
        }
        None => guard.roster.push(Member {
            battletag: user.battletag,
            char: user.char,
            note: update.note,
            plot_data: update.plot_data,
        }),
    }
    Json(Roster {
        members: guard.roster.clone(),
    })
    .into_response()
}

async fn optimize(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let guard = match authorize(&state, &headers, "GET /community/optimize", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.fail_optimize {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to run optimizer");
    }
    Json(guard.optimized.clone()).into_response()
}

async fn toggle_lock(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /community/lock", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.fail_lock {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to toggle lock");
    }
    if guard.user.community.finalized {
        return fail(StatusCode::BAD_REQUEST, "community is finalized");
    }

    if guard.user.community.locked {
        guard.user.community.locked = false;
        guard.assignments.clear();
        StatusCode::OK.into_response()
    } else {
        guard.user.community.locked = true;
        guard.assignments = guard.optimized.clone();
        Json(guard.assignments.clone()).into_response()
    }
}

async fn assignments(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers, "GET /community/assignments", false) {
        Ok(guard) => Json(guard.assignments.clone()).into_response(),
        Err(response) => response,
    }
}

async fn overwrite_assignment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<OverwriteAssignment>,
) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /community/assignments", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if !guard.user.community.locked {
        return fail(StatusCode::BAD_REQUEST, "community is not locked");
    }
    guard
        .assignments
        .retain(|existing| existing.plot != body.plot && existing.btag != body.btag);
    guard.assignments.push(body.into_assignment());
    StatusCode::OK.into_response()
}

async fn finalize(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /community/finalize", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if !guard.user.community.locked {
        return fail(StatusCode::BAD_REQUEST, "community is not locked");
    }
    guard.user.community.finalized = true;
    StatusCode::OK.into_response()
}

async fn settings(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers, "GET /community/config", true) {
        Ok(guard) => Json(guard.settings).into_response(),
        Err(response) => response,
    }
}

async fn update_settings(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /community/config", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let request: CommunityRankRequest = match serde_json::from_value(body.clone()) {
        Ok(request) => request,
        Err(_) => return fail(StatusCode::BAD_REQUEST, "Invalid request body"),
    };
    guard.settings = request.into();
    guard.settings_body = Some(body);
    StatusCode::OK.into_response()
}

async fn download(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers, "GET /community/download", true) {
        Ok(guard) => Json(serde_json::json!({ "members": guard.roster })).into_response(),
        Err(response) => response,
    }
}

async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(upload): Json<AssignmentUpload>,
) -> Response {
    let mut guard = match authorize(&state, &headers, "POST /community/upload", true) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard.assignments = upload.assignments().cloned().collect();
    Json(guard.assignments.clone()).into_response()
}

async fn join(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match authorize(&state, &headers, "POST /community/join", false) {
        Ok(mut guard) => {
            guard.user.community.id = id;
            StatusCode::OK.into_response()
        }
        Err(response) => response,
    }
}
