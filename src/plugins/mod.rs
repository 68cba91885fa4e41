pub mod assets;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod travel_story;
