pub mod app;
pub mod config;
pub mod error;
pub mod media;
pub mod state;
pub mod storage;
pub mod users;
