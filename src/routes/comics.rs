use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::aggregator::{ComicSelector, NEWEST_ARRIVALS_LIMIT};
use crate::error::{AppError, parse_id};
use crate::models::{ComicPatch, ComicView, RawId, SubscribeRequest};
use crate::routes::auth::{extract_admin_user, extract_current_user};
use crate::state::AppState;

const MAX_NEWEST_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
struct NewestQuery {
    limit: Option<i64>,
}

pub fn comics_routes() -> Router<AppState> {
    Router::new()
        .route("/{comic_id}", get(get_comic).put(update_comic))
        .route("/listchapter/{comic_id}", get(list_chapters))
        .route("/get/all", get(list_all))
        .route("/get/trending", get(trending))
        .route("/get/newarrvals", get(new_arrivals))
        .route("/get/topseries", get(top_series))
        .route("/get/getsub", get(list_subscriptions))
        .route("/search/genre", get(list_all))
        .route("/search/genre/{genre}", get(search_by_genre))
        .route("/search/param", get(list_all))
        .route("/search/param/{name}", get(search_by_name))
        .route("/subscribe", post(toggle_subscribe))
}

async fn list_with(
    state: &AppState,
    selector: ComicSelector,
) -> Result<Json<Vec<ComicView>>, AppError> {
    let comics = state.aggregator.list_comics(&selector).await?;
    Ok(Json(comics))
}

// ============================
// Single comic
// ============================

async fn get_comic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comic_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let current_user = extract_current_user(&state, &headers).await?;
    let comic_id = parse_id(&comic_id, "comic")?;

    let detail = state
        .aggregator
        .get_comic_detail(comic_id, current_user.id)
        .await?;
    Ok(Json(detail))
}

async fn list_chapters(
    State(state): State<AppState>,
    Path(comic_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comic_id = parse_id(&comic_id, "comic")?;
    let chapters = state.aggregator.list_chapters(comic_id).await?;
    Ok(Json(chapters))
}

async fn update_comic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comic_id): Path<String>,
    payload: Result<Json<ComicPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let _admin = extract_admin_user(&state, &headers).await?;
    let comic_id = parse_id(&comic_id, "comic")?;
    let Json(patch) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    if patch.is_empty() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }
    if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()));
    }

    let comic = state.aggregator.update_comic(comic_id, patch).await?;
    Ok(Json(comic))
}

// ============================
// Listings
// ============================

async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ComicSelector::All).await
}

async fn search_by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ComicSelector::ByGenre(genre)).await
}

async fn search_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ComicSelector::ByName(name)).await
}

async fn trending(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ComicSelector::Trending).await
}

async fn new_arrivals(
    State(state): State<AppState>,
    query: Result<Query<NewestQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let limit = query.limit.unwrap_or(NEWEST_ARRIVALS_LIMIT);
    if !(1..=MAX_NEWEST_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "Limit must be between 1 and {}",
            MAX_NEWEST_LIMIT
        )));
    }
    list_with(&state, ComicSelector::Newest(limit)).await
}

async fn top_series(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ComicSelector::TopRated).await
}

// ============================
// Subscriptions
// ============================

fn comic_id_from(raw: &RawId) -> Result<i64, AppError> {
    match raw {
        RawId::Number(id) if *id > 0 => Ok(*id),
        RawId::Number(id) => Err(AppError::InvalidInput(format!("Invalid comic id: {}", id))),
        RawId::Text(text) => parse_id(text, "comic"),
    }
}

async fn toggle_subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let current_user = extract_current_user(&state, &headers).await?;
    let Json(input) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let comic_id = comic_id_from(&input.comic_id)?;

    let toggle = state
        .subscriptions
        .toggle_subscribe(current_user.id, comic_id)
        .await?;
    Ok(Json(toggle))
}

async fn list_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let current_user = extract_current_user(&state, &headers).await?;
    let entries = state
        .subscriptions
        .list_subscriptions(current_user.id)
        .await?;
    Ok(Json(serde_json::json!({ "listSub": entries })))
}
