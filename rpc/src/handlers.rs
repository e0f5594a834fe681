//! RPC request handlers and their request/response bodies.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use ballot_registry::{SessionInfo, SessionSummary};
use ballot_types::{SessionId, VoterId};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::extract::{ApiJson, ApiQuery};
use crate::pagination::{next_cursor, PaginationMeta, PaginationParams};
use crate::server::{RpcState, VOTER_ID_HEADER};

// ── Sessions ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: String,
    pub candidates: Vec<String>,
    pub duration_secs: i64,
}

#[derive(Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Serialize, Deserialize)]
pub struct SessionCountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    #[serde(flatten)]
    pub pagination: PaginationMeta,
}

#[derive(Serialize, Deserialize)]
pub struct TallyResponse {
    pub session_id: SessionId,
    pub tally: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct WinnersResponse {
    pub session_id: SessionId,
    pub winners: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct HasVotedResponse {
    pub session_id: SessionId,
    pub voter: String,
    pub has_voted: bool,
}

// ── Voting ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub candidate_index: usize,
}

#[derive(Serialize, Deserialize)]
pub struct CastVoteResponse {
    pub session_id: SessionId,
    pub candidate_index: usize,
    pub accepted: bool,
}

// ── Telemetry ────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub session_count: u64,
    pub uptime_secs: u64,
}

fn parse_session_id(raw: &str) -> Result<SessionId, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidRequest(format!("invalid session id {raw:?}")))
}

fn voter_from_headers(headers: &HeaderMap) -> Result<VoterId, RpcError> {
    let raw = headers
        .get(VOTER_ID_HEADER)
        .ok_or(RpcError::MissingIdentity)?
        .to_str()
        .map_err(|_| RpcError::MissingIdentity)?;
    VoterId::new(raw).map_err(|_| RpcError::MissingIdentity)
}

pub async fn create_session(
    State(state): State<Arc<RpcState>>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), RpcError> {
    let session_id = state
        .registry
        .create(req.title, req.candidates, req.duration_secs)?;
    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
}

pub async fn list_sessions(
    State(state): State<Arc<RpcState>>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<SessionListResponse>, RpcError> {
    let offset = params
        .offset()
        .ok_or_else(|| RpcError::InvalidRequest("malformed cursor".into()))?;
    let sessions = state
        .registry
        .list_sessions(offset, params.effective_count() as usize);
    let cursor = next_cursor(offset, sessions.len(), state.registry.session_count());
    Ok(Json(SessionListResponse {
        sessions,
        pagination: PaginationMeta { cursor },
    }))
}

pub async fn session_count(State(state): State<Arc<RpcState>>) -> Json<SessionCountResponse> {
    Json(SessionCountResponse {
        count: state.registry.session_count(),
    })
}

pub async fn session_info(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, RpcError> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(state.registry.session_info(session_id)?))
}

pub async fn tally(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<TallyResponse>, RpcError> {
    let session_id = parse_session_id(&id)?;
    let tally = state.registry.tally(session_id)?;
    Ok(Json(TallyResponse { session_id, tally }))
}

pub async fn winners(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<WinnersResponse>, RpcError> {
    let session_id = parse_session_id(&id)?;
    let winners = state.registry.winners(session_id)?;
    Ok(Json(WinnersResponse {
        session_id,
        winners,
    }))
}

pub async fn has_voted(
    State(state): State<Arc<RpcState>>,
    Path((id, voter)): Path<(String, String)>,
) -> Result<Json<HasVotedResponse>, RpcError> {
    let session_id = parse_session_id(&id)?;
    let voter = VoterId::new(voter)
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let has_voted = state.registry.has_voted(session_id, &voter)?;
    Ok(Json(HasVotedResponse {
        session_id,
        voter: voter.to_string(),
        has_voted,
    }))
}

pub async fn cast_vote(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CastVoteRequest>,
) -> Result<Json<CastVoteResponse>, RpcError> {
    let session_id = parse_session_id(&id)?;
    let voter = voter_from_headers(&headers)?;
    state
        .registry
        .vote(session_id, req.candidate_index, &voter)?;
    Ok(Json(CastVoteResponse {
        session_id,
        candidate_index: req.candidate_index,
        accepted: true,
    }))
}

pub async fn finalize(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<TallyResponse>, RpcError> {
    let session_id = parse_session_id(&id)?;
    state.registry.finalize(session_id)?;
    let tally = state.registry.tally(session_id)?;
    Ok(Json(TallyResponse { session_id, tally }))
}

pub async fn health(State(state): State<Arc<RpcState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        session_count: state.registry.session_count(),
        uptime_secs: ballot_types::Timestamp::new(state.started_at)
            .elapsed_since(ballot_types::Timestamp::now()),
    })
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<String, RpcError> {
    use prometheus::Encoder;

    let registry = state
        .metrics_registry
        .as_ref()
        .ok_or(RpcError::MetricsDisabled)?;
    let mut buf = Vec::new();
    prometheus::TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| RpcError::Server(e.to_string()))
}
