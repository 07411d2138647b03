pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod utils;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::SqlitePool;

use config::Config;
use utils::image::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub images: ImageStore,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let secret = config.jwt_secret.as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            images: ImageStore::new(&config.media_root),
            config: Arc::new(config),
            pool,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for EncodingKey {
    fn from_ref(app_state: &AppState) -> EncodingKey {
        app_state.encoding_key.clone()
    }
}

impl FromRef<AppState> for DecodingKey {
    fn from_ref(app_state: &AppState) -> DecodingKey {
        app_state.decoding_key.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(app_state: &AppState) -> Arc<Config> {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ImageStore {
    fn from_ref(app_state: &AppState) -> ImageStore {
        app_state.images.clone()
    }
}
