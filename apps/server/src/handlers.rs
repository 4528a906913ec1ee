use crate::error::ApiError;
use crate::extract::{DeclaredSize, UrlPrefix, View};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use stash_kernel::generate_id;
use stash_storage::{Identifier, Item};
use std::io;
use tracing::debug;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const NOT_FOUND: &str = "404 Not Found.\n";
const TEXT_PLAIN: &str = "text/plain";

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn upload(body: Body, declared: DeclaredSize) -> Item {
    Item::from_stream(body.into_data_stream().map_err(io::Error::other), declared.0)
}

async fn store_upload(
    state: &AppState,
    id: &Identifier,
    body: Body,
    declared: DeclaredSize,
) -> Result<(), ApiError> {
    state.store.put(id, upload(body, declared)).await?;
    debug!(%id, declared = declared.0, "Upload stored");
    Ok(())
}

fn fresh_id() -> Result<Identifier, ApiError> {
    Ok(Identifier::try_from(generate_id())?)
}

/// `GET /`: usage for terminals, an upload page for browsers.
pub(crate) async fn usage(
    State(state): State<AppState>,
    view: View,
    prefix: UrlPrefix,
) -> Response {
    let last_modified = http_date(state.started);
    let etag = format!("W/\"{}\"", state.started.timestamp_millis());

    match view {
        View::Html => (
            [(CONTENT_TYPE, "text/html".to_owned()), (LAST_MODIFIED, last_modified), (ETAG, etag)],
            INDEX_HTML,
        )
            .into_response(),
        View::Text => (
            [(CONTENT_TYPE, TEXT_PLAIN.to_owned()), (LAST_MODIFIED, last_modified), (ETAG, etag)],
            format!("curl {} --data-binary '@FILE.txt'\n", prefix.0),
        )
            .into_response(),
    }
}

/// `GET /{id}`: streams the blob.
pub(crate) async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = Identifier::try_from(id)?;
    let item = state.store.get(&id).await?;

    let metadata = *item.metadata();
    let Some(stream) = item.into_stream() else {
        return Ok((StatusCode::NOT_FOUND, NOT_FOUND).into_response());
    };

    Ok((
        [
            (CONTENT_TYPE, TEXT_PLAIN.to_owned()),
            (CONTENT_LENGTH, metadata.size.to_string()),
            (LAST_MODIFIED, http_date(metadata.mtime)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `PUT /{id}`: stores or replaces.
pub(crate) async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    prefix: UrlPrefix,
    declared: DeclaredSize,
    body: Body,
) -> Result<Response, ApiError> {
    let id = Identifier::try_from(id)?;
    store_upload(&state, &id, body, declared).await?;
    Ok((StatusCode::OK, prefix.link(id.as_str())).into_response())
}

/// `POST /{id}`: stores only when the id is free.
///
/// The existence check and the write are not atomic; two racing creators
/// may both succeed, the later one winning.
pub(crate) async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    prefix: UrlPrefix,
    declared: DeclaredSize,
    body: Body,
) -> Result<Response, ApiError> {
    let id = Identifier::try_from(id)?;
    if state.store.exists(&id).await? {
        return Ok((StatusCode::CONFLICT, format!("Conflict: {id} already exists")).into_response());
    }

    store_upload(&state, &id, body, declared).await?;
    Ok((StatusCode::CREATED, prefix.link(id.as_str())).into_response())
}

/// `POST /`: stores under a generated id.
pub(crate) async fn create_generated(
    State(state): State<AppState>,
    prefix: UrlPrefix,
    declared: DeclaredSize,
    body: Body,
) -> Result<Response, ApiError> {
    let id = fresh_id()?;
    store_upload(&state, &id, body, declared).await?;
    Ok((StatusCode::CREATED, prefix.link(id.as_str())).into_response())
}

/// `PUT /`: same as `POST /` but answers 200.
pub(crate) async fn replace_generated(
    State(state): State<AppState>,
    prefix: UrlPrefix,
    declared: DeclaredSize,
    body: Body,
) -> Result<Response, ApiError> {
    let id = fresh_id()?;
    store_upload(&state, &id, body, declared).await?;
    Ok((StatusCode::OK, prefix.link(id.as_str())).into_response())
}

/// `DELETE /{id}`
pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = Identifier::try_from(id)?;
    state.store.delete(&id).await?;
    Ok((StatusCode::OK, "deleted").into_response())
}
