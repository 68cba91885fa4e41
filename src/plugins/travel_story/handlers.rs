use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value;

use crate::http_error::AppError;
use crate::plugins::auth::AuthUser;
use crate::plugins::travel_story::models::{
    DateRangeQuery, FavoriteRequest, ImageQuery, ImageUploadResponse, MessageResponse, SearchQuery, StoriesResponse,
    StoryDraft, StoryResponse,
};
use crate::plugins::travel_story::origin::RequestOrigin;
use crate::plugins::travel_story::service::{ImageUpload, StoryService};

pub async fn add_story(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    payload: Result<Json<StoryDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<StoryResponse>), AppError> {
    let Json(draft) = payload?;
    let story = service.add(draft, &auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(StoryResponse { story, message: "Your story is added successfully!" })))
}

pub async fn list_stories(Extension(service): Extension<Arc<StoryService>>, auth: AuthUser) -> Result<Json<StoriesResponse>, AppError> {
    let stories = service.list(&auth.user_id).await?;
    Ok(Json(StoriesResponse { stories }))
}

pub async fn upload_image(
    Extension(service): Extension<Arc<StoryService>>,
    origin: RequestOrigin,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ImageUploadResponse>), AppError> {
    let upload = first_file(multipart?).await?;
    let image_url = service.upload_image(upload, origin.as_str()).await?;
    Ok((StatusCode::CREATED, Json(ImageUploadResponse { image_url })))
}

/// First part that carries a filename; plain form fields are skipped.
async fn first_file(mut multipart: Multipart) -> Result<Option<ImageUpload>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let data = field.bytes().await?;
            return Ok(Some(ImageUpload { file_name: Some(file_name), data: data.to_vec() }));
        }
    }
    Ok(None)
}

pub async fn delete_image(
    Extension(service): Extension<Arc<StoryService>>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(q) = query?;
    service.delete_image(q.image_url.as_deref()).await?;
    Ok(Json(MessageResponse { message: "Image deleted successfully!" }))
}

pub async fn edit_story(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    origin: RequestOrigin,
    Path(id): Path<String>,
    payload: Result<Json<StoryDraft>, JsonRejection>,
) -> Result<Json<StoryResponse>, AppError> {
    let Json(draft) = payload?;
    let story = service.edit(&id, draft, origin.as_str(), &auth.user_id).await?;
    Ok(Json(StoryResponse { story, message: "Travel story updated successfully!" }))
}

pub async fn delete_story(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    origin: RequestOrigin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    service.delete(&id, origin.as_str(), &auth.user_id).await?;
    Ok(Json(MessageResponse { message: "Travel story deleted successfully!" }))
}

pub async fn update_favorite(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> Result<Json<StoryResponse>, AppError> {
    let Json(body) = payload?;
    let is_favorite = match body.is_favorite {
        Some(Value::Bool(b)) => b,
        _ => return Err(AppError::bad_request("isFavorite must be a boolean")),
    };
    let story = service.set_favorite(&id, is_favorite, &auth.user_id).await?;
    Ok(Json(StoryResponse { story, message: "Updated successfully!" }))
}

pub async fn search_stories(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<StoriesResponse>, AppError> {
    let Query(q) = query?;
    let stories = service.search(q.query.as_deref(), &auth.user_id).await?;
    Ok(Json(StoriesResponse { stories }))
}

pub async fn filter_stories(
    Extension(service): Extension<Arc<StoryService>>,
    auth: AuthUser,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<Json<StoriesResponse>, AppError> {
    let Query(q) = query?;
    let start = parse_millis(q.start_date.as_deref(), "startDate")?;
    let end = parse_millis(q.end_date.as_deref(), "endDate")?;
    let stories = service.filter_by_date_range(start, end, &auth.user_id).await?;
    Ok(Json(StoriesResponse { stories }))
}

fn parse_millis(raw: Option<&str>, name: &str) -> Result<i64, AppError> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::bad_request(format!("{name} must be epoch milliseconds")))
}
