use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, routing::delete, routing::get, routing::post, routing::put, Extension, Router};

use crate::kernel::Plugin;
use crate::plugins::auth::{require_auth, JwtVerifier};
use crate::plugins::travel_story::handlers::*;
use crate::plugins::travel_story::service::StoryService;

pub struct TravelStoryPlugin {
    service: Arc<StoryService>,
    verifier: Arc<JwtVerifier>,
    max_upload_bytes: usize,
}

impl TravelStoryPlugin {
    pub fn new(service: Arc<StoryService>, verifier: Arc<JwtVerifier>, max_upload_bytes: usize) -> Self {
        Self { service, verifier, max_upload_bytes }
    }
}

#[async_trait::async_trait]
impl Plugin for TravelStoryPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", post(add_story).get(list_stories))
            .route("/image-upload", post(upload_image).layer(DefaultBodyLimit::max(self.max_upload_bytes)))
            .route("/image", delete(delete_image))
            .route("/search", get(search_stories))
            .route("/filter", get(filter_stories))
            .route("/:id", put(edit_story).delete(delete_story))
            .route("/:id/favorite", put(update_favorite))
            .route_layer(middleware::from_fn_with_state(self.verifier.clone(), require_auth))
            .layer(Extension(self.service.clone()))
    }

    fn name(&self) -> &'static str { "travel-story" }

    async fn on_start(&self) {
        if let Err(e) = self.service.files().ensure_dir().await {
            tracing::warn!(dir = %self.service.files().dir().display(), error = %e, "cannot create uploads directory");
        }
    }
}
