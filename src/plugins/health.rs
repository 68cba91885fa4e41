use crate::kernel::Plugin;
use crate::plugins::travel_story::DynStoryRepository;
use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    storage: &'static str,
}

pub struct HealthPlugin {
    repo: DynStoryRepository,
}

impl HealthPlugin {
    pub fn new(repo: DynStoryRepository) -> Self {
        Self { repo }
    }
}

async fn health_handler(Extension(repo): Extension<DynStoryRepository>) -> (StatusCode, Json<Health>) {
    match repo.ping().await {
        Ok(()) => (StatusCode::OK, Json(Health { status: "ok", storage: repo.backend() })),
        Err(e) => {
            tracing::warn!(error = %e, "storage ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(Health { status: "degraded", storage: repo.backend() }))
        }
    }
}

#[async_trait::async_trait]
impl Plugin for HealthPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", get(health_handler))
            .layer(Extension(self.repo.clone()))
    }

    fn name(&self) -> &'static str {
        "health"
    }

    async fn on_start(&self) {
        tracing::info!(storage = self.repo.backend(), "health plugin started");
    }
}
