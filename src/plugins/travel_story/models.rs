use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TravelStory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub story: String,
    pub visited_location: String,
    pub image_url: String,
    pub visited_date: DateTime<Utc>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of add and edit requests, exactly as the client sent it. Nothing
/// here is trusted until the service validates it.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    pub title: Option<String>,
    pub story: Option<String>,
    pub visited_location: Option<String>,
    pub image_url: Option<String>,
    /// Epoch milliseconds, as a JSON number or a numeric string.
    pub visited_date: Option<Value>,
}

/// A validated story about to be persisted.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub user_id: String,
    pub title: String,
    pub story: String,
    pub visited_location: String,
    pub image_url: String,
    pub visited_date: DateTime<Utc>,
}

/// Full replacement of the editable fields of a story.
#[derive(Debug, Clone)]
pub struct StoryChanges {
    pub title: String,
    pub story: String,
    pub visited_location: String,
    pub image_url: String,
    pub visited_date: DateTime<Utc>,
}

/// Which of a user's stories to return. Results are always favorites first.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryFilter {
    All,
    /// Case-insensitive substring of title, story or visited location.
    Text(String),
    /// Inclusive on both ends.
    VisitedBetween { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl StoryFilter {
    pub fn matches(&self, story: &TravelStory) -> bool {
        match self {
            StoryFilter::All => true,
            StoryFilter::Text(term) => {
                let needle = term.to_lowercase();
                [&story.title, &story.story, &story.visited_location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            StoryFilter::VisitedBetween { start, end } => {
                story.visited_date >= *start && story.visited_date <= *end
            }
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub is_favorite: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageQuery {
    pub image_url: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct StoryResponse {
    pub story: TravelStory,
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
pub struct StoriesResponse {
    pub stories: Vec<TravelStory>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_url: String,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Reads an epoch-millisecond value the way clients send it: a JSON
/// integer, a float, or a string holding an integer.
pub fn millis_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
