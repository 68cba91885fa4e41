use std::sync::Arc;

use axum::Router;
use tracing::warn;

use crate::config::AppConfig;
use crate::db;
use crate::kernel::{build_app, cors_layer, Plugin};
use crate::plugins::assets::StaticDirPlugin;
use crate::plugins::auth::JwtVerifier;
use crate::plugins::health::HealthPlugin;
use crate::plugins::metrics::MetricsPlugin;
use crate::plugins::travel_story::{DynStoryRepository, FileStore, InMemoryStoryRepository, PgStoryRepository, StoryService, TravelStoryPlugin};

/// Postgres unless `DATABASE_URL=memory`.
pub async fn connect_repository(config: &AppConfig) -> anyhow::Result<DynStoryRepository> {
    if config.uses_memory_store() {
        warn!("using in-memory story repository; data is lost on restart");
        return Ok(InMemoryStoryRepository::new().into_arc());
    }
    let pool = db::init_db(&config.database_url, config.database_max_connections).await?;
    Ok(PgStoryRepository::new(pool).into_arc())
}

pub fn plugins(config: &AppConfig, repo: DynStoryRepository) -> Vec<Box<dyn Plugin>> {
    let service = Arc::new(StoryService::new(repo.clone(), FileStore::new(&config.uploads_dir)));
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));
    vec![
        Box::new(HealthPlugin::new(repo)),
        Box::new(TravelStoryPlugin::new(service, verifier, config.max_upload_bytes)),
        Box::new(StaticDirPlugin::new("uploads", &config.uploads_dir)),
        Box::new(StaticDirPlugin::new("assets", &config.assets_dir)),
    ]
}

/// Mounts every plugin, instruments it, and exposes `/metrics`. The plugins
/// are handed back so their shutdown hooks can run.
pub async fn build_router(config: &AppConfig, repo: DynStoryRepository) -> anyhow::Result<(Router, Vec<Box<dyn Plugin>>)> {
    let metrics = MetricsPlugin::new()?;
    let plugins = plugins(config, repo);

    let plugin_names: Vec<&'static str> = plugins.iter().map(|p| p.name()).collect();
    tracing::info!("mounting plugins: {:?}", plugin_names);

    let app = build_app(&plugins, Some(metrics.clone()))
        .await
        // not instrumented to avoid double-counting
        .nest("/metrics", metrics.router())
        .layer(cors_layer(config.cors_origin.as_deref()));
    Ok((app, plugins))
}
