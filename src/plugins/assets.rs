use std::path::PathBuf;

use axum::Router;
use tower_http::services::ServeDir;

use crate::kernel::Plugin;

/// Serves a directory read-only under `/{name}`.
pub struct StaticDirPlugin {
    name: &'static str,
    dir: PathBuf,
}

impl StaticDirPlugin {
    pub fn new(name: &'static str, dir: impl Into<PathBuf>) -> Self {
        Self { name, dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl Plugin for StaticDirPlugin {
    async fn router(&self) -> Router {
        Router::new().route_service("/*path", ServeDir::new(&self.dir))
    }

    fn name(&self) -> &'static str {
        self.name
    }

    async fn on_start(&self) {
        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "static directory for /{} does not exist", self.name);
        }
    }
}
