pub mod api_client;
pub mod auth;
pub mod cache;
pub mod database;
pub mod domain;
pub mod encryption;
pub mod error;
pub mod net;
pub mod retry;
pub mod settings;
pub mod sync;
pub mod uploader;
pub mod utils;
