pub mod error;
pub mod files;
pub mod handlers;
pub mod models;
pub mod origin;
pub mod plugin;
pub mod repo;
pub mod service;

pub use error::StoryError;
pub use files::FileStore;
pub use plugin::TravelStoryPlugin;
pub use repo::{DynStoryRepository, InMemoryStoryRepository, PgStoryRepository, StoryRepository};
pub use service::StoryService;
