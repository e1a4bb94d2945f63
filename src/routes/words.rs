use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::constants::DEFAULT_STUDY_LIMIT;
use crate::extractors::{JsonBody, QueryParams};
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::words::Word;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words).post(create_word))
        .route("/study", get(study_words))
        .route("/:id", get(get_word).put(update_word))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListWordsQuery {
    difficulty: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudyQuery {
    user_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordPayload {
    id: Option<String>,
    prompt: String,
    answers: Vec<String>,
    difficulty: u8,
    frequency: u8,
    #[serde(default)]
    situation: String,
}

impl WordPayload {
    fn into_word(self, id: String) -> Word {
        Word {
            id,
            prompt: self.prompt.trim().to_string(),
            answers: self.answers.into_iter().map(|a| a.trim().to_string()).collect(),
            difficulty: self.difficulty,
            frequency: self.frequency,
            situation: self.situation.trim().to_string(),
        }
    }
}

async fn list_words(
    _user: CurrentUser,
    QueryParams(query): QueryParams<ListWordsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let words = match query.difficulty {
        Some(difficulty) => state.repos().words.words_by_difficulty(difficulty)?,
        None => state.repos().words.list_words()?,
    };
    Ok(ok(words))
}

/// Creating with an existing id replaces that word.
async fn create_word(
    _user: CurrentUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<WordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let id = payload
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let word = payload.into_word(id);
    state.repos().words.create_word(&word)?;
    tracing::info!(word_id = %word.id, "Word saved");
    Ok(created(word))
}

/// A missing word is `data: null`, not a 404.
async fn get_word(
    _user: CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.repos().words.get_word(&id)?))
}

async fn update_word(
    _user: CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<WordPayload>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(body_id) = payload.id.as_deref() {
        if body_id != id {
            return Err(AppError::bad_request(
                "WORD_ID_MISMATCH",
                "Body id does not match the path",
            ));
        }
    }
    let word = payload.into_word(id);
    state.repos().words.update_word(&word)?;
    Ok(ok(word))
}

async fn study_words(
    user: CurrentUser,
    QueryParams(query): QueryParams<StudyQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query.user_id.unwrap_or(user.user_id);
    let limit = query.limit.unwrap_or(DEFAULT_STUDY_LIMIT);
    Ok(ok(state.study().select(&user_id, limit)?))
}
