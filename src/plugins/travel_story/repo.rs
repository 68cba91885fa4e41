use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::plugins::travel_story::error::StoryError;
use crate::plugins::travel_story::models::{NewStory, StoryChanges, StoryFilter, TravelStory};

/// Story documents. Every method except `insert` is scoped to `user_id`; a
/// story owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait StoryRepository: Send + Sync + 'static {
    async fn insert(&self, story: NewStory) -> Result<TravelStory, StoryError>;
    /// Favorites first, then oldest first.
    async fn find(&self, user_id: &str, filter: &StoryFilter) -> Result<Vec<TravelStory>, StoryError>;
    async fn update_owned(&self, id: Uuid, user_id: &str, changes: StoryChanges) -> Result<Option<TravelStory>, StoryError>;
    async fn set_favorite(&self, id: Uuid, user_id: &str, is_favorite: bool) -> Result<Option<TravelStory>, StoryError>;
    /// Returns the removed story.
    async fn delete_owned(&self, id: Uuid, user_id: &str) -> Result<Option<TravelStory>, StoryError>;
    async fn ping(&self) -> Result<(), StoryError>;
    fn backend(&self) -> &'static str;
}

pub type DynStoryRepository = Arc<dyn StoryRepository>;

mod postgres {
    use super::*;
    use sqlx::PgPool;

    const COLUMNS: &str = "id, user_id, title, story, visited_location, image_url, visited_date, is_favorite, created_at, updated_at";
    const ORDER: &str = "is_favorite DESC, created_at ASC, id ASC";

    pub struct PgStoryRepository {
        pool: PgPool,
    }

    impl PgStoryRepository {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        pub fn into_arc(self) -> DynStoryRepository {
            Arc::new(self)
        }
    }

    /// `%term%` with LIKE metacharacters escaped so the term matches literally.
    pub(super) fn like_pattern(term: &str) -> String {
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }

    #[async_trait]
    impl StoryRepository for PgStoryRepository {
        async fn insert(&self, story: NewStory) -> Result<TravelStory, StoryError> {
            let row = sqlx::query_as::<_, TravelStory>(&format!("INSERT INTO travel_stories (user_id, title, story, visited_location, image_url, visited_date) VALUES ($1,$2,$3,$4,$5,$6) RETURNING {COLUMNS}"))
                .bind(&story.user_id)
                .bind(&story.title)
                .bind(&story.story)
                .bind(&story.visited_location)
                .bind(&story.image_url)
                .bind(story.visited_date)
                .fetch_one(&self.pool)
                .await?;
            Ok(row)
        }

        async fn find(&self, user_id: &str, filter: &StoryFilter) -> Result<Vec<TravelStory>, StoryError> {
            let rows = match filter {
                StoryFilter::All => {
                    sqlx::query_as::<_, TravelStory>(&format!("SELECT {COLUMNS} FROM travel_stories WHERE user_id = $1 ORDER BY {ORDER}"))
                        .bind(user_id)
                        .fetch_all(&self.pool)
                        .await?
                }
                StoryFilter::Text(term) => {
                    sqlx::query_as::<_, TravelStory>(&format!("SELECT {COLUMNS} FROM travel_stories WHERE user_id = $1 AND (title ILIKE $2 ESCAPE '\\' OR story ILIKE $2 ESCAPE '\\' OR visited_location ILIKE $2 ESCAPE '\\') ORDER BY {ORDER}"))
                        .bind(user_id)
                        .bind(like_pattern(term))
                        .fetch_all(&self.pool)
                        .await?
                }
                StoryFilter::VisitedBetween { start, end } => {
                    sqlx::query_as::<_, TravelStory>(&format!("SELECT {COLUMNS} FROM travel_stories WHERE user_id = $1 AND visited_date >= $2 AND visited_date <= $3 ORDER BY {ORDER}"))
                        .bind(user_id)
                        .bind(start)
                        .bind(end)
                        .fetch_all(&self.pool)
                        .await?
                }
            };
            Ok(rows)
        }

        async fn update_owned(&self, id: Uuid, user_id: &str, changes: StoryChanges) -> Result<Option<TravelStory>, StoryError> {
            let row = sqlx::query_as::<_, TravelStory>(&format!("UPDATE travel_stories SET title = $3, story = $4, visited_location = $5, image_url = $6, visited_date = $7, updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"))
                .bind(id)
                .bind(user_id)
                .bind(changes.title)
                .bind(changes.story)
                .bind(changes.visited_location)
                .bind(changes.image_url)
                .bind(changes.visited_date)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn set_favorite(&self, id: Uuid, user_id: &str, is_favorite: bool) -> Result<Option<TravelStory>, StoryError> {
            let row = sqlx::query_as::<_, TravelStory>(&format!("UPDATE travel_stories SET is_favorite = $3, updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"))
                .bind(id)
                .bind(user_id)
                .bind(is_favorite)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn delete_owned(&self, id: Uuid, user_id: &str) -> Result<Option<TravelStory>, StoryError> {
            let row = sqlx::query_as::<_, TravelStory>(&format!("DELETE FROM travel_stories WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"))
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn ping(&self) -> Result<(), StoryError> {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "postgres"
        }
    }
}

pub use postgres::PgStoryRepository;

mod inmem {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;

    /// Insertion-ordered story list behind a lock. Same ordering and
    /// ownership rules as the Postgres repository.
    #[derive(Default)]
    pub struct InMemoryStoryRepository {
        inner: Mutex<Vec<TravelStory>>,
    }

    impl InMemoryStoryRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn into_arc(self) -> DynStoryRepository {
            Arc::new(self)
        }

        fn modify_owned<F>(&self, id: Uuid, user_id: &str, f: F) -> Option<TravelStory>
        where
            F: FnOnce(&mut TravelStory),
        {
            let mut guard = self.inner.lock();
            let story = guard.iter_mut().find(|s| s.id == id && s.user_id == user_id)?;
            f(story);
            story.updated_at = Utc::now();
            Some(story.clone())
        }
    }

    #[async_trait]
    impl StoryRepository for InMemoryStoryRepository {
        async fn insert(&self, story: NewStory) -> Result<TravelStory, StoryError> {
            let now = Utc::now();
            let row = TravelStory {
                id: Uuid::new_v4(),
                user_id: story.user_id,
                title: story.title,
                story: story.story,
                visited_location: story.visited_location,
                image_url: story.image_url,
                visited_date: story.visited_date,
                is_favorite: false,
                created_at: now,
                updated_at: now,
            };
            self.inner.lock().push(row.clone());
            Ok(row)
        }

        async fn find(&self, user_id: &str, filter: &StoryFilter) -> Result<Vec<TravelStory>, StoryError> {
            let mut rows: Vec<TravelStory> = self
                .inner
                .lock()
                .iter()
                .filter(|s| s.user_id == user_id && filter.matches(s))
                .cloned()
                .collect();
            // stable: ties keep insertion order
            rows.sort_by_key(|s| !s.is_favorite);
            Ok(rows)
        }

        async fn update_owned(&self, id: Uuid, user_id: &str, changes: StoryChanges) -> Result<Option<TravelStory>, StoryError> {
            Ok(self.modify_owned(id, user_id, |s| {
                s.title = changes.title;
                s.story = changes.story;
                s.visited_location = changes.visited_location;
                s.image_url = changes.image_url;
                s.visited_date = changes.visited_date;
            }))
        }

        async fn set_favorite(&self, id: Uuid, user_id: &str, is_favorite: bool) -> Result<Option<TravelStory>, StoryError> {
            Ok(self.modify_owned(id, user_id, |s| s.is_favorite = is_favorite))
        }

        async fn delete_owned(&self, id: Uuid, user_id: &str) -> Result<Option<TravelStory>, StoryError> {
            let mut guard = self.inner.lock();
            let idx = guard.iter().position(|s| s.id == id && s.user_id == user_id);
            Ok(idx.map(|i| guard.remove(i)))
        }

        async fn ping(&self) -> Result<(), StoryError> {
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "memory"
        }
    }
}

pub use inmem::InMemoryStoryRepository;

#[cfg(test)]
mod tests {
    use super::postgres::like_pattern;
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_story(user_id: &str, title: &str) -> NewStory {
        NewStory {
            user_id: user_id.into(),
            title: title.into(),
            story: "a story".into(),
            visited_location: "Somewhere".into(),
            image_url: "http://localhost:3000/uploads/x.png".into(),
            visited_date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("venice"), "%venice%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[tokio::test]
    async fn in_memory_orders_favorites_first_keeping_insertion_order() -> anyhow::Result<()> {
        let repo = InMemoryStoryRepository::new();
        repo.insert(new_story("u1", "a")).await?;
        repo.insert(new_story("u1", "b")).await?;
        let c = repo.insert(new_story("u1", "c")).await?;
        repo.insert(new_story("u2", "d")).await?;
        repo.set_favorite(c.id, "u1", true).await?;

        let titles: Vec<String> = repo.find("u1", &StoryFilter::All).await?.into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn in_memory_scopes_writes_to_owner() -> anyhow::Result<()> {
        let repo = InMemoryStoryRepository::new();
        let a = repo.insert(new_story("u1", "a")).await?;

        assert!(repo.set_favorite(a.id, "u2", true).await?.is_none());
        assert!(repo.delete_owned(a.id, "u2").await?.is_none());
        assert_eq!(repo.find("u1", &StoryFilter::All).await?.len(), 1);
        assert!(repo.find("u2", &StoryFilter::All).await?.is_empty());

        let removed = repo.delete_owned(a.id, "u1").await?;
        assert_eq!(removed.map(|s| s.id), Some(a.id));
        assert!(repo.find("u1", &StoryFilter::All).await?.is_empty());
        Ok(())
    }
}
