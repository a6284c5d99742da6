pub mod api;
pub mod broadcast;
pub mod config;
pub mod fake_feed;
pub mod feed;
pub mod overlay;
pub mod payload;
pub mod persist;
pub mod scoring;
pub mod session;
pub mod state;
pub mod wire;
