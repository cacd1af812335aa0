//! Read-only REST endpoints. Every handler re-reads from disk.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use crewview_teams::{
    AgentOutput, ArchiveEntry, ArchiveRecord, HistoryEntry, InboxMessage, ProjectSummary, Team,
    TeamStats, archive, compute_stats, inbox, outputs, projects, scanner,
};
use serde::Serialize;

use crate::engine::{Health, SyncEngine};
use crate::errors::ServerError;
use crate::ws;

type ApiResult<T> = Result<Json<T>, ServerError>;

#[derive(Debug, Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<Team>,
    pub stats: TeamStats,
}

pub fn router(engine: Arc<SyncEngine>) -> Router {
    Router::new()
        .route("/api/teams", get(list_teams))
        .route("/api/teams/:team", get(get_team))
        .route("/api/teams/:team/inboxes", get(team_inboxes))
        .route("/api/teams/:team/inboxes/:agent", get(agent_inbox))
        .route("/api/archive", get(list_archive))
        .route("/api/archive/:filename", get(get_archive))
        .route("/api/history", get(history))
        .route("/api/agent-outputs", get(list_outputs))
        .route("/api/agent-outputs/:id", get(get_output))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/:project", get(get_project))
        .route("/api/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .with_state(engine)
}

async fn list_teams(State(engine): State<Arc<SyncEngine>>) -> Json<TeamsResponse> {
    let teams = scanner::get_active_teams(engine.roots()).await;
    let stats = compute_stats(&teams);
    Json(TeamsResponse { teams, stats })
}

async fn get_team(
    State(engine): State<Arc<SyncEngine>>,
    Path(team): Path<String>,
) -> ApiResult<Team> {
    scanner::read_team(engine.roots(), &team)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("team '{team}'")))
}

async fn team_inboxes(
    State(engine): State<Arc<SyncEngine>>,
    Path(team): Path<String>,
) -> ApiResult<BTreeMap<String, Vec<InboxMessage>>> {
    Ok(Json(inbox::read_team_inboxes(engine.roots(), &team).await?))
}

async fn agent_inbox(
    State(engine): State<Arc<SyncEngine>>,
    Path((team, agent)): Path<(String, String)>,
) -> ApiResult<Vec<InboxMessage>> {
    inbox::read_agent_inbox(engine.roots(), &team, &agent)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("inbox '{agent}' in team '{team}'")))
}

async fn list_archive(State(engine): State<Arc<SyncEngine>>) -> Json<Vec<ArchiveEntry>> {
    Json(archive::list_archives(engine.roots()).await)
}

async fn get_archive(
    State(engine): State<Arc<SyncEngine>>,
    Path(filename): Path<String>,
) -> ApiResult<ArchiveRecord> {
    archive::read_archive(engine.roots(), &filename)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("archive '{filename}'")))
}

async fn history(State(engine): State<Arc<SyncEngine>>) -> Json<Vec<HistoryEntry>> {
    Json(scanner::get_team_history(engine.roots()).await)
}

async fn list_outputs(State(engine): State<Arc<SyncEngine>>) -> Json<Vec<AgentOutput>> {
    Json(outputs::get_agent_outputs(engine.roots()).await)
}

async fn get_output(
    State(engine): State<Arc<SyncEngine>>,
    Path(id): Path<String>,
) -> ApiResult<AgentOutput> {
    outputs::read_agent_output(engine.roots(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("output '{id}'")))
}

async fn list_projects(State(engine): State<Arc<SyncEngine>>) -> Json<Vec<ProjectSummary>> {
    Json(projects::list_projects(engine.roots()).await)
}

async fn get_project(
    State(engine): State<Arc<SyncEngine>>,
    Path(project): Path<String>,
) -> ApiResult<ProjectSummary> {
    projects::read_project(engine.roots(), &project)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("project '{project}'")))
}

async fn health(State(engine): State<Arc<SyncEngine>>) -> Json<Health> {
    Json(engine.health().await)
}
