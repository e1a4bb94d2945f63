use std::collections::HashMap;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::extractors::{JsonBody, QueryParams};
use crate::response::{created, ok, AppError};
use crate::services::experience::experience_for_user;
use crate::state::AppState;
use crate::store::operations::learning_history::{InteractionKind, LearningHistoryRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/history",
            post(record_interaction)
                .get(list_history)
                .delete(reset_history),
        )
        .route("/history/count", get(count_history))
        .route("/experience", get(experience))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInteractionRequest {
    user_id: Option<String>,
    word_id: String,
    interaction_kind: InteractionKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordInteractionResponse {
    created: bool,
    records: Vec<LearningHistoryRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    user_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserScopeQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDetail {
    id: String,
    user_id: String,
    word_id: String,
    interaction_kind: InteractionKind,
    word_prompt: String,
    word_answers: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetResult {
    success: bool,
    message: String,
    count: usize,
}

const UNKNOWN_WORD_PROMPT: &str = "(unknown)";

/// Records one interaction and answers with the user's full history.
/// Repeating an interaction is absorbed and reported as `created: false`.
async fn record_interaction(
    user: CurrentUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecordInteractionRequest>,
) -> Result<Response, AppError> {
    let user_id = req.user_id.unwrap_or(user.user_id);
    if state.repos().words.get_word(&req.word_id)?.is_none() {
        return Err(AppError::bad_request(
            "LEARNING_UNKNOWN_WORD",
            "Word does not exist",
        ));
    }

    let record = LearningHistoryRecord::new(&user_id, &req.word_id, req.interaction_kind);
    let was_created = state.repos().history.create_history(&record)?;
    if was_created {
        tracing::info!(
            user_id = %user_id,
            word_id = %req.word_id,
            kind = %req.interaction_kind,
            "Interaction recorded"
        );
    }

    let payload = RecordInteractionResponse {
        created: was_created,
        records: state.repos().history.list_history_by_user(&user_id)?,
    };
    Ok(if was_created {
        created(payload).into_response()
    } else {
        ok(payload).into_response()
    })
}

async fn list_history(
    _user: CurrentUser,
    QueryParams(query): QueryParams<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let history = &state.repos().history;
    let mut records = match query.user_id.as_deref() {
        Some(user_id) => history.list_history_by_user(user_id)?,
        None => history.list_history()?,
    };
    // `limit=0` means no limit.
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        records.truncate(limit);
    }

    let words: HashMap<String, _> = state
        .repos()
        .words
        .list_words()?
        .into_iter()
        .map(|w| (w.id.clone(), w))
        .collect();

    let details: Vec<HistoryDetail> = records
        .into_iter()
        .map(|r| {
            let word = words.get(&r.word_id);
            HistoryDetail {
                word_prompt: word
                    .map(|w| w.prompt.clone())
                    .unwrap_or_else(|| UNKNOWN_WORD_PROMPT.to_string()),
                word_answers: word.map(|w| w.answers.clone()).unwrap_or_default(),
                id: r.id,
                user_id: r.user_id,
                word_id: r.word_id,
                interaction_kind: r.interaction_kind,
            }
        })
        .collect();
    Ok(ok(details))
}

/// Counts one user's records, or every record when no user is given.
async fn count_history(
    _user: CurrentUser,
    QueryParams(query): QueryParams<UserScopeQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let count = match query.user_id.as_deref() {
        Some(user_id) => state.repos().history.count_history_by_user(user_id)?,
        None => state.repos().history.count_history()?,
    };
    Ok(ok(serde_json::json!({ "count": count })))
}

async fn reset_history(
    user: CurrentUser,
    QueryParams(query): QueryParams<UserScopeQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let result = match query.user_id {
        Some(user_id) => {
            let count = state.repos().history.delete_history_by_user(&user_id)?;
            ResetResult {
                success: true,
                message: format!("Learning history of user {user_id} was reset"),
                count,
            }
        }
        None => {
            let count = state.repos().history.delete_all_history()?;
            ResetResult {
                success: true,
                message: "All learning history was reset".to_string(),
                count,
            }
        }
    };
    tracing::warn!(requested_by = %user.user_id, count = result.count, "Learning history reset");
    Ok(ok(result))
}

async fn experience(
    user: CurrentUser,
    QueryParams(query): QueryParams<UserScopeQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query.user_id.unwrap_or(user.user_id);
    Ok(ok(experience_for_user(state.repos().history.as_ref(), &user_id)?))
}
