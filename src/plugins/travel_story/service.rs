use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::plugins::travel_story::error::StoryError;
use crate::plugins::travel_story::files::{filename_from_url, FileStore};
use crate::plugins::travel_story::models::{millis_from_value, NewStory, StoryChanges, StoryDraft, StoryFilter, TravelStory};
use crate::plugins::travel_story::repo::DynStoryRepository;

pub const PLACEHOLDER_IMAGE_PATH: &str = "/assets/placeholderImage.png";
pub const UPLOADS_PATH: &str = "/uploads";

const ALL_FIELDS_REQUIRED: &str = "All fields are required";
const INVALID_ID: &str = "Invalid ID format";
const STORY_NOT_FOUND: &str = "Travel story not found!";

/// Placeholder image as served by the host the request came in on.
pub fn placeholder_url(origin: &str) -> String {
    format!("{origin}{PLACEHOLDER_IMAGE_PATH}")
}

/// Either the exact placeholder for this origin, or any URL whose path is
/// the placeholder path (stories created through another host name).
pub fn is_placeholder(image_url: &str, origin: &str) -> bool {
    if image_url == placeholder_url(origin) {
        return true;
    }
    let path = image_url.split(['?', '#']).next().unwrap_or(image_url);
    path.ends_with(PLACEHOLDER_IMAGE_PATH)
}

/// A file pulled out of a multipart request.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

pub struct StoryService {
    repo: DynStoryRepository,
    files: FileStore,
}

impl StoryService {
    pub fn new(repo: DynStoryRepository, files: FileStore) -> Self {
        Self { repo, files }
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub async fn add(&self, draft: StoryDraft, user_id: &str) -> Result<TravelStory, StoryError> {
        let title = required(draft.title);
        let story = required(draft.story);
        let visited_location = required(draft.visited_location);
        let image_url = required(draft.image_url);
        let (Some(title), Some(story), Some(visited_location), Some(image_url), Some(raw_date)) =
            (title, story, visited_location, image_url, present(draft.visited_date))
        else {
            return Err(StoryError::validation(ALL_FIELDS_REQUIRED));
        };
        let visited_date = visited_date(&raw_date)?;

        let created = self
            .repo
            .insert(NewStory { user_id: user_id.to_string(), title, story, visited_location, image_url, visited_date })
            .await?;
        info!(story_id = %created.id, user_id, "travel story added");
        Ok(created)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<TravelStory>, StoryError> {
        self.repo.find(user_id, &StoryFilter::All).await
    }

    pub async fn search(&self, query: Option<&str>, user_id: &str) -> Result<Vec<TravelStory>, StoryError> {
        let term = match query {
            Some(q) if !q.is_empty() => q,
            _ => return Err(StoryError::QueryRequired),
        };
        self.repo.find(user_id, &StoryFilter::Text(term.to_string())).await
    }

    /// Inclusive range; an inverted range is not an error, it just matches nothing.
    pub async fn filter_by_date_range(&self, start_ms: i64, end_ms: i64, user_id: &str) -> Result<Vec<TravelStory>, StoryError> {
        let start = from_millis(start_ms, "startDate")?;
        let end = from_millis(end_ms, "endDate")?;
        if start > end {
            return Ok(Vec::new());
        }
        self.repo.find(user_id, &StoryFilter::VisitedBetween { start, end }).await
    }

    /// Replaces the editable fields. A missing image falls back to the
    /// placeholder served from `origin`.
    pub async fn edit(&self, id: &str, draft: StoryDraft, origin: &str, user_id: &str) -> Result<TravelStory, StoryError> {
        let (Some(title), Some(story), Some(visited_location), Some(raw_date)) = (
            required(draft.title),
            required(draft.story),
            required(draft.visited_location),
            present(draft.visited_date),
        ) else {
            return Err(StoryError::validation(ALL_FIELDS_REQUIRED));
        };
        let id = parse_id(id)?;
        let visited_date = visited_date(&raw_date)?;
        let image_url = required(draft.image_url).unwrap_or_else(|| placeholder_url(origin));

        let changes = StoryChanges { title, story, visited_location, image_url, visited_date };
        self.repo
            .update_owned(id, user_id, changes)
            .await?
            .ok_or_else(|| StoryError::not_found(STORY_NOT_FOUND))
    }

    pub async fn set_favorite(&self, id: &str, is_favorite: bool, user_id: &str) -> Result<TravelStory, StoryError> {
        let id = parse_id(id)?;
        self.repo
            .set_favorite(id, user_id, is_favorite)
            .await?
            .ok_or_else(|| StoryError::not_found(STORY_NOT_FOUND))
    }

    /// Removes the story, then its uploaded image unless it is the
    /// placeholder. The document is gone before the file is touched, so a
    /// failed unlink leaves an orphan file and is only logged.
    pub async fn delete(&self, id: &str, origin: &str, user_id: &str) -> Result<TravelStory, StoryError> {
        let id = parse_id(id)?;
        let removed = self
            .repo
            .delete_owned(id, user_id)
            .await?
            .ok_or_else(|| StoryError::not_found(STORY_NOT_FOUND))?;
        info!(story_id = %removed.id, user_id, "travel story deleted");

        if !removed.image_url.is_empty() && !is_placeholder(&removed.image_url, origin) {
            if let Some(filename) = filename_from_url(&removed.image_url) {
                if let Err(e) = self.remove_if_present(&filename).await {
                    warn!(story_id = %removed.id, %filename, error = %e, "failed to remove image of deleted story");
                }
            }
        }
        Ok(removed)
    }

    /// Stores the image and returns its public URL under `origin`.
    pub async fn upload_image(&self, upload: Option<ImageUpload>, origin: &str) -> Result<String, StoryError> {
        let upload = upload.ok_or_else(|| StoryError::validation("No image uploaded"))?;
        let filename = self.files.save_upload(upload.file_name.as_deref(), &upload.data).await?;
        Ok(format!("{origin}{UPLOADS_PATH}/{filename}"))
    }

    pub async fn delete_image(&self, image_url: Option<&str>) -> Result<(), StoryError> {
        let image_url = image_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StoryError::validation("imageUrl parameter is required!"))?;
        let filename = filename_from_url(image_url).ok_or_else(|| StoryError::not_found("Image not found!"))?;
        if !self.files.exists(&filename).await? {
            return Err(StoryError::not_found("Image not found!"));
        }
        self.files.remove(&filename).await?;
        Ok(())
    }

    async fn remove_if_present(&self, filename: &str) -> std::io::Result<()> {
        if self.files.exists(filename).await? {
            self.files.remove(filename).await?;
        }
        Ok(())
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Blank strings, `null`, `false` and a numeric zero all count as absent.
fn present(value: Option<serde_json::Value>) -> Option<serde_json::Value> {
    use serde_json::Value;
    value.filter(|v| match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    })
}

fn parse_id(id: &str) -> Result<Uuid, StoryError> {
    Uuid::parse_str(id).map_err(|_| StoryError::validation(INVALID_ID))
}

fn visited_date(raw: &serde_json::Value) -> Result<DateTime<Utc>, StoryError> {
    let ms = millis_from_value(raw).ok_or_else(|| StoryError::validation("visitedDate must be epoch milliseconds"))?;
    from_millis(ms, "visitedDate")
}

fn from_millis(ms: i64, field: &str) -> Result<DateTime<Utc>, StoryError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoryError::validation(format!("{field} is out of range")))
}
