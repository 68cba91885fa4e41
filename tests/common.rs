#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tokio::net::TcpListener;
use traveltales_api_kernel::config::{AppConfig, MEMORY_DATABASE_URL};
use traveltales_api_kernel::plugins::travel_story::DynStoryRepository;
use traveltales_api_kernel::startup;

pub const JWT_SECRET_CONST: &str = "traveltales-test-secret";

pub struct TestDbGuard {
    maintenance_url: String,
    unique_db: String,
}

impl TestDbGuard {
    pub fn new(maintenance_url: String, unique_db: String) -> Self {
        Self { maintenance_url, unique_db }
    }
}

impl Drop for TestDbGuard {
    fn drop(&mut self) {
        let _ = Command::new("psql")
            .arg(&self.maintenance_url)
            .arg("-c")
            .arg(format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}' AND pid <> pg_backend_pid();",
                self.unique_db
            ))
            .status();
        let _ = Command::new("psql")
            .arg(&self.maintenance_url)
            .arg("-c")
            .arg(format!("DROP DATABASE IF EXISTS \"{}\"", self.unique_db))
            .status();
    }
}

pub struct TestApp {
    pub base: String,
    pub server_handle: tokio::task::JoinHandle<()>,
    pub uploads_dir: PathBuf,
    pub assets_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    pub async fn shutdown(self) {
        self.server_handle.abort();
        let _ = self.server_handle.await;
    }
}

pub fn test_config(tmp: &tempfile::TempDir, database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        database_max_connections: 2,
        port: 0,
        uploads_dir: tmp.path().join("uploads"),
        assets_dir: tmp.path().join("assets"),
        cors_origin: None,
        max_upload_bytes: 1024 * 1024,
        jwt_secret: JWT_SECRET_CONST.to_string(),
    }
}

pub fn token_for(user_id: &str) -> String {
    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: usize,
    }
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    encode(&Header::default(), &Claims { sub: user_id, exp }, &EncodingKey::from_secret(JWT_SECRET_CONST.as_bytes()))
        .expect("encode token")
}

/// Full app on an ephemeral port, backed by the in-memory repository.
pub async fn spawn_memory_app() -> anyhow::Result<TestApp> {
    let tmp = tempfile::tempdir()?;
    let config = test_config(&tmp, MEMORY_DATABASE_URL);
    let repo = startup::connect_repository(&config).await?;
    spawn_with(tmp, config, repo).await
}

pub async fn spawn_with(tmp: tempfile::TempDir, config: AppConfig, repo: DynStoryRepository) -> anyhow::Result<TestApp> {
    std::fs::create_dir_all(&config.assets_dir)?;
    let (app, _plugins) = startup::build_router(&config, repo).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    Ok(TestApp {
        base: format!("http://{}", addr),
        server_handle,
        uploads_dir: config.uploads_dir.clone(),
        assets_dir: config.assets_dir.clone(),
        _tmp: tmp,
    })
}

/// Creates a throwaway database next to `test_db` and returns its URL.
pub fn create_unique_db(test_db: &str) -> (String, TestDbGuard) {
    let mut maintenance_url = test_db.to_string();
    if let Some(idx) = maintenance_url.rfind('/') {
        maintenance_url.replace_range(idx + 1.., "postgres");
    }
    let base_db_name = test_db.rsplit('/').next().unwrap().split('?').next().unwrap();
    let unique_db = format!("{}_{}", base_db_name, uuid::Uuid::new_v4().to_string().replace('-', ""));
    let mut unique_db_url = test_db.to_string();
    if let Some(idx) = unique_db_url.rfind('/') {
        unique_db_url.replace_range(idx + 1.., &unique_db);
    }
    let _ = Command::new("psql").arg(&maintenance_url).arg("-c").arg(format!("DROP DATABASE IF EXISTS \"{}\"", unique_db)).status();
    let _ = Command::new("psql").arg(&maintenance_url).arg("-c").arg(format!("CREATE DATABASE \"{}\"", unique_db)).status();
    let _ = Command::new("psql").arg(&unique_db_url).arg("-c").arg("CREATE EXTENSION IF NOT EXISTS pgcrypto;").status();
    let guard = TestDbGuard::new(maintenance_url, unique_db);
    (unique_db_url, guard)
}
